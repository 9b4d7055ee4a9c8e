use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::get,
    serve, Router,
};
use serde::Deserialize;
use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info};

use crate::error::LeaseError;
use crate::lease::LeaseStore;
use crate::status::{format_grant, format_hms};

pub struct AppState {
    pub lease: LeaseStore,
}

#[derive(Deserialize)]
pub struct StayQuery {
    /// Raw so a non-numeric value is our 400, not a deserialization reject.
    s: Option<String>,
}

pub fn create_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/stay", get(stay))
        .route("/status", get(status))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

async fn stay(
    Query(query): Query<StayQuery>,
    State(state): State<Arc<AppState>>,
) -> (StatusCode, String) {
    let raw = match query.s {
        Some(raw) => raw,
        None => {
            return (
                StatusCode::BAD_REQUEST,
                "missing parameter: s (seconds)".to_string(),
            )
        }
    };
    let seconds = match raw.parse::<i64>() {
        Ok(seconds) => seconds,
        Err(_) => {
            return (
                StatusCode::BAD_REQUEST,
                format!("invalid seconds parameter: {:?}", raw),
            )
        }
    };
    match state.lease.grant(seconds) {
        Ok(effective) => {
            info!("stay-awake activated for {} seconds", effective);
            (
                StatusCode::OK,
                format!(
                    "stay-awake activated for {} seconds ({})",
                    effective,
                    format_grant(effective)
                ),
            )
        }
        Err(LeaseError::InvalidDuration(s)) => (
            StatusCode::BAD_REQUEST,
            format!("seconds must be positive, got {}", s),
        ),
        Err(LeaseError::Io(e)) => {
            error!("failed to write stay-awake lease: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "failed to persist stay-awake lease".to_string(),
            )
        }
    }
}

async fn status(State(state): State<Arc<AppState>>) -> String {
    // single non-reaping read: expired leases are reaped by the monitor and
    // the reporter, never by the service that creates them
    let remaining = state.lease.remaining();
    if remaining > 0 {
        format!("stay-awake: active\nremaining: {}", format_hms(remaining))
    } else {
        "stay-awake: inactive".to_string()
    }
}

async fn health() -> &'static str {
    "OK"
}

pub struct Server {
    lease: LeaseStore,
    addr: SocketAddr,
}

impl Server {
    pub fn new(lease: LeaseStore, addr: SocketAddr) -> Self {
        Server { lease, addr }
    }

    pub async fn start(self) -> std::io::Result<()> {
        let app_state = Arc::new(AppState { lease: self.lease });
        let app = create_router().with_state(app_state);

        info!("starting stay-awake server on {}", self.addr);

        serve(
            TcpListener::bind(self.addr).await?,
            app.into_make_service(),
        )
        .await
    }
}
