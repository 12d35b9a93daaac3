//! `/graphql`: GraphiQL on GET, GraphQL-over-HTTP on POST

use async_graphql::http::GraphiQLSource;
use axum::{extract::State, response::Html, Json};

use crate::error::ValidatedJson;
use crate::state::GraphqlState;

pub async fn graphiql() -> Html<String> {
    Html(GraphiQLSource::build().endpoint("/graphql").finish())
}

pub async fn graphql(
    State(graphql): State<GraphqlState>,
    ValidatedJson(request): ValidatedJson<async_graphql::Request>,
) -> Json<async_graphql::Response> {
    Json(graphql.schema.execute(request).await)
}
