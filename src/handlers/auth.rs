use axum::extract::State;
use axum::response::Response;
use serde::{Deserialize, Serialize};

use crate::services::{DemoCode, SignupInput, SignupOutcome};
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::extract::AppJson;
use crate::utils::response::{created, success};

#[derive(Debug, Deserialize)]
pub struct VerifyEmailRequest {
    pub email: String,
    pub code: String,
}

#[derive(Debug, Deserialize)]
pub struct ResendCodeRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize)]
struct ResendPayload {
    message: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    demo: Option<DemoCode>,
}

pub async fn signup(
    State(state): State<AppState>,
    AppJson(input): AppJson<SignupInput>,
) -> Result<Response, AppError> {
    let outcome = state.auth.signup(input).await?;
    let message = match &outcome {
        SignupOutcome::VerificationSent { .. } => "Verification code sent",
        SignupOutcome::AutoVerified { .. } => "Account created and verified",
    };
    Ok(created(outcome, message))
}

pub async fn verify_email(
    State(state): State<AppState>,
    AppJson(body): AppJson<VerifyEmailRequest>,
) -> Result<Response, AppError> {
    let session = state.auth.verify_email(&body.email, &body.code).await?;
    Ok(success(session, "Email verified"))
}

pub async fn resend_code(
    State(state): State<AppState>,
    AppJson(body): AppJson<ResendCodeRequest>,
) -> Result<Response, AppError> {
    let demo = state.auth.resend_code(&body.email).await?;
    let payload = ResendPayload {
        message: "verification_resent",
        demo,
    };
    Ok(success(payload, "Verification code resent"))
}

pub async fn login(
    State(state): State<AppState>,
    AppJson(body): AppJson<LoginRequest>,
) -> Result<Response, AppError> {
    let session = state.auth.login(&body.email, &body.password).await?;
    Ok(success(session, "Login successful"))
}
