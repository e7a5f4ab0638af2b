//! Entry validation: a ticket code can be redeemed once.

use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tracing::{info, warn};

use crate::models::Ticket;
use crate::store::{Store, StoreError};
use crate::utils::error::AppError;
use crate::utils::validation::{ValidationIssues, Validator};

const MIN_CODE_LEN: usize = 6;

#[derive(Debug, Error)]
pub enum RedeemError {
    #[error(transparent)]
    Invalid(#[from] ValidationIssues),

    #[error("ticket not found")]
    NotFound,

    #[error("ticket has already been used")]
    AlreadyUsed,

    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for RedeemError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => RedeemError::NotFound,
            StoreError::AlreadyRedeemed => RedeemError::AlreadyUsed,
            other => RedeemError::Store(other),
        }
    }
}

impl From<RedeemError> for AppError {
    fn from(err: RedeemError) -> Self {
        match err {
            RedeemError::Invalid(issues) => issues.into(),
            RedeemError::NotFound => AppError::NotFound(err.to_string()),
            RedeemError::AlreadyUsed => AppError::conflict("ALREADY_USED", err.to_string()),
            RedeemError::Store(e) => e.into(),
        }
    }
}

#[derive(Clone)]
pub struct TicketService {
    store: Arc<dyn Store>,
}

impl TicketService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Flips a ticket from unused to used. Every later attempt fails with
    /// `AlreadyUsed`.
    pub async fn redeem(&self, qr_code: &str) -> Result<Ticket, RedeemError> {
        let qr_code = qr_code.trim();
        Validator::new()
            .min_chars("qr_code", qr_code, MIN_CODE_LEN)
            .finish()?;

        match self.store.redeem_ticket(qr_code, Utc::now()).await {
            Ok(ticket) => {
                info!(ticket_id = %ticket.id, "Ticket redeemed");
                Ok(ticket)
            }
            Err(StoreError::AlreadyRedeemed) => {
                warn!("Rejected reuse of a redeemed ticket");
                Err(RedeemError::AlreadyUsed)
            }
            Err(err) => Err(err.into()),
        }
    }
}
