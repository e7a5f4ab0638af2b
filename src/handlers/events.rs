use axum::extract::State;
use axum::response::Response;
use serde::Serialize;
use uuid::Uuid;

use crate::middleware::AuthContext;
use crate::services::CreateEventInput;
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::extract::{AppJson, AppPath};
use crate::utils::response::{created, success};

#[derive(Serialize)]
struct CreatedEvent {
    id: Uuid,
}

pub async fn list_events(State(state): State<AppState>) -> Result<Response, AppError> {
    let events = state.events.list_events().await?;
    Ok(success(events, "Events retrieved"))
}

pub async fn get_event(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
) -> Result<Response, AppError> {
    let event = state.events.get_event(id).await?;
    Ok(success(event, "Event retrieved"))
}

pub async fn create_event(
    State(state): State<AppState>,
    auth: AuthContext,
    AppJson(input): AppJson<CreateEventInput>,
) -> Result<Response, AppError> {
    let id = state.events.create_event(auth.user_id, input).await?;
    Ok(created(CreatedEvent { id }, "Event created"))
}
