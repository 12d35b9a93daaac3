//! `POST /api`: JSON GraphQL endpoint with plain status codes
//!
//! Unlike `/graphql`, failures are reported through the HTTP status: 400 with
//! `{"errors": [...]}` for bad requests and execution errors, 404 with an empty
//! body when the first top-level field resolves to null.

use async_graphql::{Request, Value, Variables};
use axum::{
    body::Bytes,
    extract::State,
    http::{header::CONTENT_TYPE, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;

use crate::error::ApiErrors;
use crate::state::GraphqlState;

#[derive(Debug, Deserialize)]
struct ApiRequest {
    query: Option<String>,
    #[serde(default)]
    variables: Option<serde_json::Value>,
}

/// Media type check ignoring case and parameters such as `charset`
fn is_json_content_type(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(';').next())
        .map(|media_type| media_type.trim().eq_ignore_ascii_case("application/json"))
        .unwrap_or(false)
}

fn first_field_is_null(data: &Value) -> bool {
    match data {
        Value::Object(fields) => fields
            .values()
            .next()
            .map_or(true, |value| matches!(value, Value::Null)),
        _ => true,
    }
}

pub async fn api(
    State(graphql): State<GraphqlState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if !is_json_content_type(&headers) {
        return ApiErrors::single("Only accepts Content-Type: application/json").bad_request();
    }

    let payload: ApiRequest = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(e) => {
            tracing::debug!(error = %e, "Rejected /api body");
            return ApiErrors::single(format!("Invalid JSON body: {}", e)).bad_request();
        }
    };

    let query = match payload.query {
        Some(query) if !query.trim().is_empty() => query,
        _ => return ApiErrors::single("query field is missing").bad_request(),
    };

    let mut request = Request::new(query);
    match payload.variables {
        None | Some(serde_json::Value::Null) => {}
        Some(variables @ serde_json::Value::Object(_)) => {
            request = request.variables(Variables::from_json(variables));
        }
        Some(_) => {
            return ApiErrors::single("variables field must be an object").bad_request();
        }
    }

    let response = graphql.schema.execute(request).await;
    if !response.errors.is_empty() {
        let errors = response.errors.into_iter().map(|e| e.message).collect();
        return ApiErrors::new(errors).bad_request();
    }

    if first_field_is_null(&response.data) {
        return StatusCode::NOT_FOUND.into_response();
    }

    (StatusCode::OK, Json(response.data)).into_response()
}
