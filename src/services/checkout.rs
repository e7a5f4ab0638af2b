//! Mock checkout: every order is paid on creation.

use std::sync::Arc;

use chrono::Utc;
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::models::{InventoryError, OrderWithTickets};
use crate::store::{PurchaseRequest, Store, StoreError, TICKETS_QR_CODE_KEY};
use crate::utils::error::AppError;

pub const MAX_TICKETS_PER_ORDER: i64 = 10;
pub const MOCK_PROVIDER: &str = "mock";
const REDEMPTION_CODE_PREFIX: &str = "TCK-";
const REDEMPTION_CODE_LEN: usize = 24;

#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("quantity must be between 1 and 10")]
    InvalidQuantity,

    #[error(transparent)]
    Inventory(#[from] InventoryError),

    #[error("redemption code collision")]
    CodeCollision,

    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for CheckoutError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Inventory(e) => CheckoutError::Inventory(e),
            StoreError::UniqueViolation(c) if c == TICKETS_QR_CODE_KEY => {
                CheckoutError::CodeCollision
            }
            other => CheckoutError::Store(other),
        }
    }
}

impl From<CheckoutError> for AppError {
    fn from(err: CheckoutError) -> Self {
        match err {
            CheckoutError::InvalidQuantity => {
                AppError::bad_request("INVALID_QUANTITY", err.to_string())
            }
            CheckoutError::Inventory(e) => e.into(),
            CheckoutError::CodeCollision => AppError::InternalServerError(err.to_string()),
            CheckoutError::Store(e) => e.into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PurchaseInput {
    pub event_id: Uuid,
    pub ticket_type_id: Uuid,
    pub quantity: i64,
    #[serde(default)]
    pub coupon_code: Option<String>,
}

#[derive(Clone)]
pub struct CheckoutService {
    store: Arc<dyn Store>,
}

impl CheckoutService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Buys `quantity` tickets of one type. Stock check, order, tickets and
    /// stock increment are committed together or not at all.
    pub async fn purchase(
        &self,
        user_id: Uuid,
        input: PurchaseInput,
    ) -> Result<OrderWithTickets, CheckoutError> {
        if !(1..=MAX_TICKETS_PER_ORDER).contains(&input.quantity) {
            return Err(CheckoutError::InvalidQuantity);
        }
        let quantity = input.quantity as i32;

        if let Some(coupon) = &input.coupon_code {
            debug!(coupon = %coupon, "Coupon codes are not applied by mock checkout");
        }

        let request = PurchaseRequest {
            user_id,
            event_id: input.event_id,
            ticket_type_id: input.ticket_type_id,
            quantity,
            provider: MOCK_PROVIDER.to_string(),
            provider_ref: format!("mock-{}", random_token(8)),
            qr_codes: (0..quantity).map(|_| redemption_code()).collect(),
            at: Utc::now(),
        };

        match self.store.purchase(request).await {
            Ok(purchase) => {
                info!(
                    order_id = %purchase.order.id,
                    user_id = %user_id,
                    ticket_type_id = %input.ticket_type_id,
                    quantity,
                    amount_cents = purchase.order.amount_cents,
                    "Order paid (mock)"
                );
                Ok(purchase)
            }
            Err(err) => {
                let err = CheckoutError::from(err);
                if let CheckoutError::Inventory(reason) = &err {
                    warn!(ticket_type_id = %input.ticket_type_id, %reason, "Purchase rejected");
                }
                Err(err)
            }
        }
    }

    pub async fn orders_for_user(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<OrderWithTickets>, CheckoutError> {
        Ok(self.store.orders_for_user(user_id).await?)
    }
}

/// Unguessable ticket code (~143 bits of entropy).
pub fn redemption_code() -> String {
    format!("{REDEMPTION_CODE_PREFIX}{}", random_token(REDEMPTION_CODE_LEN))
}

fn random_token(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}
