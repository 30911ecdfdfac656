//! HTTP surface for the scribe service.
//!
//! A thin axum adapter translating requests into dispatcher and registry
//! calls. All domain behavior lives below this layer.

pub mod error;
pub mod handlers;
pub mod models;
pub mod routes;

pub use error::{ApiError, ApiResult};
pub use routes::{create_router, AppState};
