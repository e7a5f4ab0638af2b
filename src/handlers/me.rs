use axum::extract::State;
use axum::response::Response;
use serde::{Deserialize, Serialize};

use crate::middleware::AuthContext;
use crate::models::PublicUser;
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::extract::AppJson;
use crate::utils::response::success;

#[derive(Debug, Deserialize)]
pub struct BecomeOrganizerRequest {
    pub company_name: String,
    pub cnpj: String,
}

#[derive(Serialize)]
struct Profile {
    user: PublicUser,
}

pub async fn profile(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Response, AppError> {
    let user = state.auth.me(auth.user_id).await?;
    Ok(success(Profile { user }, "Profile retrieved"))
}

pub async fn orders(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Response, AppError> {
    let orders = state.checkout.orders_for_user(auth.user_id).await?;
    Ok(success(orders, "Orders retrieved"))
}

pub async fn become_organizer(
    State(state): State<AppState>,
    auth: AuthContext,
    AppJson(body): AppJson<BecomeOrganizerRequest>,
) -> Result<Response, AppError> {
    let session = state
        .auth
        .become_organizer(auth.user_id, &body.company_name, &body.cnpj)
        .await?;
    Ok(success(session, "Account upgraded to organizer"))
}
