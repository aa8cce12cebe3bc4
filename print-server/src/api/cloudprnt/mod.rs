//! CloudPRNT printer endpoints
//!
//! Both phases share one path; the printer POSTs its status to ask for work
//! and GETs the job content.

mod handler;

use axum::{Router, routing::post};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().route(
        "/printers/{printer_id}/job",
        post(handler::check_availability).get(handler::fetch),
    )
}
