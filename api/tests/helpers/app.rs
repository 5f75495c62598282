use ai::{ProviderKind, ProviderRegistry};
use api::{middleware::log_request, routes::routes, state::AppState};
use axum::{
    Router, body::Body, extract::DefaultBodyLimit, http::Request, middleware::from_fn,
    response::Response,
};
use marker::traits::provider::ChatProvider;
use std::convert::Infallible;
use std::sync::Arc;
use tower::ServiceExt;
use tower::util::BoxCloneService;
use util::config;

/// Builds the full `/api` service with `provider` registered as the OpenAI backend.
pub fn make_test_app(
    provider: Arc<dyn ChatProvider>,
) -> BoxCloneService<Request<Body>, Response, Infallible> {
    let registry = ProviderRegistry::new().with_provider(ProviderKind::OpenAi, provider);
    let router = Router::new()
        .nest("/api", routes(AppState::new(registry)))
        .layer(DefaultBodyLimit::max(config::max_upload_bytes()))
        .layer(from_fn(log_request));

    router.into_service().boxed_clone()
}
