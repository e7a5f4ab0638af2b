pub mod auth;
pub mod checkout;
pub mod events;
pub mod me;
pub mod tickets;

use axum::extract::State;
use axum::response::Response;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::error;

use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response::success;

#[derive(Serialize)]
struct HealthPayload {
    status: &'static str,
    service: &'static str,
    ts: DateTime<Utc>,
}

pub async fn health_check(State(state): State<AppState>) -> Result<Response, AppError> {
    state.store.ping().await.map_err(|e| {
        error!(error = %e, "Health check could not reach the datastore");
        AppError::ExternalServiceError("Datastore unavailable".to_string())
    })?;

    let payload = HealthPayload {
        status: "ok",
        service: "ticketa-api",
        ts: Utc::now(),
    };

    Ok(success(payload, "Health check successful"))
}
