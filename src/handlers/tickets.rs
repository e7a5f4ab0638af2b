use axum::extract::State;
use axum::response::Response;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::extract::AppJson;
use crate::utils::response::success;

#[derive(Debug, Deserialize)]
pub struct ValidateTicketRequest {
    pub qr_code: String,
}

#[derive(Serialize)]
struct Redemption {
    valid: bool,
    ticket_id: Uuid,
}

pub async fn validate_ticket(
    State(state): State<AppState>,
    AppJson(body): AppJson<ValidateTicketRequest>,
) -> Result<Response, AppError> {
    let ticket = state.tickets.redeem(&body.qr_code).await?;
    let payload = Redemption {
        valid: true,
        ticket_id: ticket.id,
    };
    Ok(success(payload, "Ticket redeemed"))
}
