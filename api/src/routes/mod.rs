//! HTTP route entry point for `/api/...`.
//!
//! Route groups:
//! - `/health` → liveness check
//! - `/feedback` → feedback generation for one submission, rate limited per client IP

use crate::rate_limit::enforce_rate_limit;
use crate::routes::{feedback::feedback_routes, health::health_routes};
use crate::state::AppState;
use axum::{Router, middleware::from_fn_with_state};

pub mod feedback;
pub mod health;

/// Builds the `/api` router with its state applied.
pub fn routes(app_state: AppState) -> Router {
    Router::new()
        .nest("/health", health_routes())
        .nest(
            "/feedback",
            feedback_routes()
                .route_layer(from_fn_with_state(app_state.clone(), enforce_rate_limit)),
        )
        .with_state(app_state)
}
