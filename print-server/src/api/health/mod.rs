//! Health check
//!
//! | Path | Method | Gated |
//! |------|--------|-------|
//! | /health | GET | no |
//!
//! ```json
//! { "status": "ok", "version": "0.1.0", "print_dispatch_enabled": true }
//! ```

use axum::{Json, Router, extract::State, routing::get};
use serde::Serialize;

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().route("/health", get(health))
}

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    version: &'static str,
    print_dispatch_enabled: bool,
}

async fn health(State(state): State<ServerState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        print_dispatch_enabled: state.dispatch_enabled(),
    })
}
