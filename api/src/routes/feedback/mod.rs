//! Feedback routes.
//!
//! - `POST /feedback` → run every feedback category against one submission ([`post::generate_feedback`])

use crate::state::AppState;
use axum::{Router, routing::post};

pub mod common;
pub mod post;

pub fn feedback_routes() -> Router<AppState> {
    Router::new().route("/", post(post::generate_feedback))
}
