use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "event_status", rename_all = "lowercase")]
pub enum EventStatus {
    Draft,
    Published,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Event {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub venue: String,
    pub banner_url: Option<String>,
    pub date_start: DateTime<Utc>,
    pub date_end: DateTime<Utc>,
    pub status: EventStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TicketType {
    pub id: Uuid,
    pub event_id: Uuid,
    pub name: String,
    pub price_cents: i64,
    pub qty_total: i32,
    pub qty_sold: i32,
    pub sales_start: Option<DateTime<Utc>>,
    pub sales_end: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Reasons a ticket type cannot satisfy a purchase.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InventoryError {
    #[error("ticket type does not exist for this event")]
    InvalidTicketType,

    #[error("ticket type is not on sale")]
    SalesClosed,

    #[error("not enough tickets left ({remaining} remaining)")]
    InsufficientStock { remaining: i32 },

    #[error("order amount overflows")]
    AmountOverflow,
}

/// Priced reservation of `quantity` tickets, computed under the stock lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quote {
    pub unit_price_cents: i64,
    pub quantity: i32,
    pub amount_cents: i64,
}

impl TicketType {
    pub fn remaining(&self) -> i32 {
        self.qty_total - self.qty_sold
    }

    pub fn on_sale_at(&self, now: DateTime<Utc>) -> bool {
        self.sales_start.map_or(true, |start| now >= start)
            && self.sales_end.map_or(true, |end| now <= end)
    }

    /// Checks ownership, sales window and stock, then prices the request.
    ///
    /// Callers must hold the row lock for this ticket type until the
    /// resulting sale has been recorded.
    pub fn quote(
        &self,
        event_id: Uuid,
        quantity: i32,
        now: DateTime<Utc>,
    ) -> Result<Quote, InventoryError> {
        if self.event_id != event_id {
            return Err(InventoryError::InvalidTicketType);
        }
        if !self.on_sale_at(now) {
            return Err(InventoryError::SalesClosed);
        }

        let remaining = self.remaining();
        if remaining < quantity {
            return Err(InventoryError::InsufficientStock { remaining });
        }

        let amount_cents = self
            .price_cents
            .checked_mul(i64::from(quantity))
            .ok_or(InventoryError::AmountOverflow)?;

        Ok(Quote {
            unit_price_cents: self.price_cents,
            quantity,
            amount_cents,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TicketTypeView {
    #[serde(flatten)]
    pub ticket_type: TicketType,
    pub remaining: i32,
}

impl From<TicketType> for TicketTypeView {
    fn from(ticket_type: TicketType) -> Self {
        let remaining = ticket_type.remaining();
        Self {
            ticket_type,
            remaining,
        }
    }
}

/// Event together with its ticket types.
#[derive(Debug, Clone, Serialize)]
pub struct EventDetail {
    #[serde(flatten)]
    pub event: Event,
    pub ticket_types: Vec<TicketTypeView>,
}

impl EventDetail {
    pub fn new(event: Event, ticket_types: Vec<TicketType>) -> Self {
        Self {
            event,
            ticket_types: ticket_types.into_iter().map(TicketTypeView::from).collect(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewTicketType {
    pub name: String,
    pub price_cents: i64,
    pub qty_total: i32,
    pub sales_start: Option<DateTime<Utc>>,
    pub sales_end: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct NewEvent {
    pub owner_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub venue: String,
    pub banner_url: Option<String>,
    pub date_start: DateTime<Utc>,
    pub date_end: DateTime<Utc>,
    pub status: EventStatus,
    pub ticket_types: Vec<NewTicketType>,
}

impl NewEvent {
    /// Materializes rows for insertion, assigning fresh ids.
    pub fn into_rows(self, now: DateTime<Utc>) -> (Event, Vec<TicketType>) {
        let event = Event {
            id: Uuid::new_v4(),
            owner_id: self.owner_id,
            title: self.title,
            description: self.description,
            venue: self.venue,
            banner_url: self.banner_url,
            date_start: self.date_start,
            date_end: self.date_end,
            status: self.status,
            created_at: now,
            updated_at: now,
        };
        let ticket_types = self
            .ticket_types
            .into_iter()
            .map(|tt| TicketType {
                id: Uuid::new_v4(),
                event_id: event.id,
                name: tt.name,
                price_cents: tt.price_cents,
                qty_total: tt.qty_total,
                qty_sold: 0,
                sales_start: tt.sales_start,
                sales_end: tt.sales_end,
                created_at: now,
                updated_at: now,
            })
            .collect();
        (event, ticket_types)
    }
}
