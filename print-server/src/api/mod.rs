//! HTTP API
//!
//! | Path | Method | Gated | Module |
//! |------|--------|-------|--------|
//! | /printers/{printer_id}/job | POST | yes | [`cloudprnt`] (phase A) |
//! | /printers/{printer_id}/job | GET | yes | [`cloudprnt`] (phase B) |
//! | /print-jobs | POST | yes | [`print_jobs`] |
//! | /print-jobs | GET | yes | [`print_jobs`] |
//! | /print-jobs/receipt | POST | yes | [`print_jobs`] |
//! | /health | GET | no | [`health`] |
//!
//! Gated routes answer a bare 404 while print dispatch is disabled.

pub mod cloudprnt;
pub mod health;
pub mod print_jobs;

use std::time::Instant;

use axum::{
    Router,
    extract::{Request, State},
    middleware::{self, Next},
    response::Response,
};
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};

use crate::core::ServerState;
use crate::utils::{AppError, ErrorCode};

/// HTTP access log
async fn log_request(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let started = Instant::now();

    let response = next.run(request).await;

    tracing::info!(
        target: "http_access",
        "{} {} {} latency_ms={}",
        method,
        uri,
        response.status(),
        started.elapsed().as_millis()
    );

    response
}

/// Runtime switch of the dispatch endpoints
async fn require_dispatch_enabled(
    State(state): State<ServerState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    if !state.dispatch_enabled() {
        return Err(AppError::new(ErrorCode::PrintDispatchDisabled));
    }
    Ok(next.run(request).await)
}

/// Routes behind the dispatch switch
fn dispatch_routes(state: ServerState) -> Router<ServerState> {
    Router::new()
        .merge(cloudprnt::router())
        .merge(print_jobs::router())
        .route_layer(middleware::from_fn_with_state(state, require_dispatch_enabled))
}

/// Build the full application with state and middleware
pub fn build_app(state: ServerState) -> Router {
    Router::<ServerState>::new()
        .merge(health::router())
        .merge(dispatch_routes(state.clone()))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(CorsLayer::permissive()),
        )
        .layer(middleware::from_fn(log_request))
}
