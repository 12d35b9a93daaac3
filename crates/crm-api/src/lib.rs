//! CRM API Library
//!
//! This crate provides the HTTP handlers, the GraphQL schema, and application setup.

pub mod error;
pub mod graphql;
mod handlers;
pub mod setup;
pub mod state;
mod telemetry;

pub use error::{ApiErrors, ErrorResponse, HttpAppError};
pub use graphql::{build_schema, CrmSchema};
