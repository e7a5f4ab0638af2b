//! Persistence boundary.
//!
//! Every operation that has to be atomic (event creation, purchase,
//! redemption) is a single trait method so each backend can wrap it in its
//! own transaction.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::models::{
    Event, EventDetail, InventoryError, Order, OrderStatus, OrderWithTickets, Quote, Ticket,
    TicketType, User,
};

pub use memory::MemoryStore;
pub use postgres::PgStore;

pub const USERS_EMAIL_KEY: &str = "users_email_key";
pub const USERS_ORG_CNPJ_KEY: &str = "users_org_cnpj_key";
pub const TICKETS_QR_CODE_KEY: &str = "tickets_qr_code_key";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("unique constraint violated: {0}")]
    UniqueViolation(String),

    #[error("record not found")]
    NotFound,

    #[error("ticket already redeemed")]
    AlreadyRedeemed,

    #[error(transparent)]
    Inventory(#[from] InventoryError),

    #[error("database error: {0}")]
    Database(#[source] sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation() {
                let constraint = db_err.constraint().unwrap_or_default().to_string();
                return StoreError::UniqueViolation(constraint);
            }
        }
        StoreError::Database(err)
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Everything needed to record one mock-paid purchase.
#[derive(Debug, Clone)]
pub struct PurchaseRequest {
    pub user_id: Uuid,
    pub event_id: Uuid,
    pub ticket_type_id: Uuid,
    pub quantity: i32,
    pub provider: String,
    pub provider_ref: String,
    /// One pre-generated redemption code per ticket.
    pub qr_codes: Vec<String>,
    pub at: DateTime<Utc>,
}

impl PurchaseRequest {
    /// Builds the order and ticket rows once the quote has been accepted.
    pub fn into_rows(self, quote: &Quote) -> OrderWithTickets {
        let order = Order {
            id: Uuid::new_v4(),
            user_id: self.user_id,
            event_id: self.event_id,
            amount_cents: quote.amount_cents,
            status: OrderStatus::Paid,
            provider: Some(self.provider),
            provider_ref: Some(self.provider_ref),
            created_at: self.at,
            updated_at: self.at,
        };
        let tickets = self
            .qr_codes
            .into_iter()
            .map(|qr_code| Ticket {
                id: Uuid::new_v4(),
                order_id: order.id,
                ticket_type_id: self.ticket_type_id,
                qr_code,
                used_at: None,
                created_at: self.at,
            })
            .collect();
        OrderWithTickets { order, tickets }
    }
}

#[async_trait]
pub trait Store: Send + Sync {
    async fn ping(&self) -> StoreResult<()>;

    async fn find_user_by_id(&self, id: Uuid) -> StoreResult<Option<User>>;
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;
    async fn find_user_by_tax_id(&self, cnpj: &str) -> StoreResult<Option<User>>;
    async fn insert_user(&self, user: &User) -> StoreResult<()>;
    /// Overwrites every mutable column of an existing user.
    async fn update_user(&self, user: &User) -> StoreResult<()>;

    /// Inserts an event and its ticket types atomically.
    async fn create_event(&self, event: &Event, ticket_types: &[TicketType]) -> StoreResult<()>;
    async fn find_event(&self, id: Uuid) -> StoreResult<Option<EventDetail>>;
    async fn list_published_events(&self) -> StoreResult<Vec<EventDetail>>;

    /// Locks the ticket type, checks stock, then records the order, its
    /// tickets and the stock increment as one unit.
    async fn purchase(&self, request: PurchaseRequest) -> StoreResult<OrderWithTickets>;
    async fn orders_for_user(&self, user_id: Uuid) -> StoreResult<Vec<OrderWithTickets>>;

    /// Marks the ticket used if and only if it is still unused.
    async fn redeem_ticket(&self, qr_code: &str, at: DateTime<Utc>) -> StoreResult<Ticket>;
}
