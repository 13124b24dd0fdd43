pub mod health;
pub mod submissions;

use std::any::Any;

use axum::response::{IntoResponse, Response};
use axum::Router;
use tower_http::catch_panic::CatchPanicLayer;

use crate::error::AppError;
use crate::state::AppState;

/// Create the API router with all routes
pub fn create_router(state: AppState) -> Router {
    with_boundaries(
        Router::new()
            .merge(health::health_routes())
            .merge(submissions::submission_routes())
            .with_state(state),
    )
}

/// JSON 404 for unknown routes and a JSON 500 for panics
fn with_boundaries(router: Router) -> Router {
    router
        .fallback(not_found)
        .layer(CatchPanicLayer::custom(handle_panic))
}

pub(crate) async fn not_found() -> AppError {
    AppError::NotFound
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };

    tracing::error!(panic = %detail, "Request handler panicked");

    AppError::Internal.into_response()
}
