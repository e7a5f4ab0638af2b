use axum::extract::State;
use axum::response::Response;

use crate::middleware::AuthContext;
use crate::services::PurchaseInput;
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::extract::AppJson;
use crate::utils::response::created;

pub async fn mock_checkout(
    State(state): State<AppState>,
    auth: AuthContext,
    AppJson(input): AppJson<PurchaseInput>,
) -> Result<Response, AppError> {
    let purchase = state.checkout.purchase(auth.user_id, input).await?;
    Ok(created(purchase, "Order paid"))
}
