//! Per-client request limiting for the feedback route.
//!
//! Each client IP gets a sliding one-minute window. Requests over the limit are
//! answered with `429 Too Many Requests` and a `Retry-After` header.

use crate::response::ApiResponse;
use crate::state::AppState;
use axum::{
    Json,
    body::Body,
    extract::{ConnectInfo, State},
    http::{HeaderValue, Request, StatusCode, header::RETRY_AFTER},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::collections::{HashMap, VecDeque};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::warn;

const WINDOW: Duration = Duration::from_secs(60);

/// Sweep idle clients once the table grows past this many entries.
const SWEEP_THRESHOLD: usize = 1024;

/// Sliding-window limiter shared by every clone of the application state.
#[derive(Clone)]
pub struct RateLimiter {
    /// Requests allowed per client per minute; `0` disables limiting.
    limit_per_minute: u32,
    /// Start times of the requests still inside each client's window.
    clients: Arc<Mutex<HashMap<IpAddr, VecDeque<Instant>>>>,
}

impl RateLimiter {
    pub fn new(limit_per_minute: u32) -> Self {
        Self {
            limit_per_minute,
            clients: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn limit_per_minute(&self) -> u32 {
        self.limit_per_minute
    }

    /// Records a request from `ip` at `now`. Rejected requests are not recorded.
    ///
    /// # Arguments
    ///
    /// * `ip` - The client address the window belongs to.
    /// * `now` - The time of the request.
    ///
    /// # Returns
    ///
    /// * `Ok(())` - If the request fits in the client's window.
    /// * `Err(Duration)` - The wait until the oldest request leaves the window.
    pub async fn check_at(&self, ip: IpAddr, now: Instant) -> Result<(), Duration> {
        if self.limit_per_minute == 0 {
            return Ok(());
        }

        let mut clients = self.clients.lock().await;
        if clients.len() > SWEEP_THRESHOLD {
            clients.retain(|_, window| {
                window
                    .back()
                    .is_some_and(|last| now.duration_since(*last) < WINDOW)
            });
        }

        let window = clients.entry(ip).or_default();
        while let Some(front) = window.front() {
            if now.duration_since(*front) >= WINDOW {
                window.pop_front();
            } else {
                break;
            }
        }

        if window.len() as u32 >= self.limit_per_minute {
            let wait = window
                .front()
                .and_then(|oldest| WINDOW.checked_sub(now.duration_since(*oldest)))
                .unwrap_or_default();
            return Err(wait);
        }

        window.push_back(now);
        Ok(())
    }

    pub async fn check(&self, ip: IpAddr) -> Result<(), Duration> {
        self.check_at(ip, Instant::now()).await
    }
}

/// Rejects a request with `429` once its client IP has used up the window.
///
/// The client IP comes from `ConnectInfo`; requests without it share one bucket.
pub async fn enforce_rate_limit(
    State(app_state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let ip = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED));

    let limiter = app_state.rate_limiter();
    match limiter.check(ip).await {
        Ok(()) => next.run(req).await,
        Err(wait) => {
            let retry_after = wait.as_secs().max(1);
            warn!(%ip, retry_after, "rate limit exceeded");
            let mut response = (
                StatusCode::TOO_MANY_REQUESTS,
                Json(ApiResponse::<()>::error(format!(
                    "Rate limit exceeded: {} requests per minute. Retry in {retry_after} seconds",
                    limiter.limit_per_minute()
                ))),
            )
                .into_response();
            if let Ok(value) = HeaderValue::from_str(&retry_after.to_string()) {
                response.headers_mut().insert(RETRY_AFTER, value);
            }
            response
        }
    }
}
