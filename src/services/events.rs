use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::models::{EventDetail, EventStatus, NewEvent, NewTicketType};
use crate::store::{Store, StoreError};
use crate::utils::error::AppError;
use crate::utils::validation::{ValidationIssues, Validator};

#[derive(Debug, Error)]
pub enum EventError {
    #[error(transparent)]
    Invalid(#[from] ValidationIssues),

    #[error("event not found")]
    NotFound,

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<EventError> for AppError {
    fn from(err: EventError) -> Self {
        match err {
            EventError::Invalid(issues) => issues.into(),
            EventError::NotFound => AppError::NotFound(err.to_string()),
            EventError::Store(e) => e.into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TicketTypeInput {
    pub name: String,
    /// Major currency units, e.g. `"20.00"` or `20`.
    pub price: Decimal,
    pub quantity: i64,
    #[serde(default)]
    pub sales_start: Option<DateTime<Utc>>,
    #[serde(default)]
    pub sales_end: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateEventInput {
    pub title: String,
    pub venue: String,
    pub date_start: DateTime<Utc>,
    pub date_end: DateTime<Utc>,
    #[serde(default)]
    pub banner_url: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    pub ticket_types: Vec<TicketTypeInput>,
}

/// Converts a major-unit price to cents, refusing sub-cent precision.
pub fn price_to_cents(price: Decimal) -> Option<i64> {
    if price.is_sign_negative() && !price.is_zero() {
        return None;
    }
    let cents = price.checked_mul(Decimal::ONE_HUNDRED)?;
    if !cents.fract().is_zero() {
        return None;
    }
    cents.to_i64()
}

#[derive(Clone)]
pub struct EventService {
    store: Arc<dyn Store>,
}

impl EventService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Creates a published event owned by `owner_id`, with its ticket types.
    pub async fn create_event(
        &self,
        owner_id: Uuid,
        input: CreateEventInput,
    ) -> Result<Uuid, EventError> {
        let mut validator = Validator::new();
        validator
            .min_chars("title", &input.title, 3)
            .min_chars("venue", &input.venue, 1)
            .check(
                input.date_end >= input.date_start,
                "date_end",
                "must not be before date_start",
            )
            .check(
                !input.ticket_types.is_empty(),
                "ticket_types",
                "must contain at least one ticket type",
            );

        let mut ticket_types = Vec::with_capacity(input.ticket_types.len());
        for (i, tt) in input.ticket_types.into_iter().enumerate() {
            let price_cents = price_to_cents(tt.price);
            let quantity = i32::try_from(tt.quantity).ok().filter(|q| *q >= 1);
            let window_ok = match (tt.sales_start, tt.sales_end) {
                (Some(start), Some(end)) => end >= start,
                _ => true,
            };

            validator
                .min_chars(&format!("ticket_types.{i}.name"), &tt.name, 1)
                .check(
                    price_cents.is_some(),
                    &format!("ticket_types.{i}.price"),
                    "must be a non-negative amount with at most 2 decimals",
                )
                .check(
                    quantity.is_some(),
                    &format!("ticket_types.{i}.quantity"),
                    "must be a positive integer",
                )
                .check(
                    window_ok,
                    &format!("ticket_types.{i}.sales_end"),
                    "must not be before sales_start",
                );

            if let (Some(price_cents), Some(qty_total)) = (price_cents, quantity) {
                ticket_types.push(NewTicketType {
                    name: tt.name.trim().to_string(),
                    price_cents,
                    qty_total,
                    sales_start: tt.sales_start,
                    sales_end: tt.sales_end,
                });
            }
        }
        validator.finish()?;

        let new_event = NewEvent {
            owner_id,
            title: input.title.trim().to_string(),
            description: input.description,
            venue: input.venue.trim().to_string(),
            banner_url: input.banner_url,
            date_start: input.date_start,
            date_end: input.date_end,
            status: EventStatus::Published,
            ticket_types,
        };
        let (event, ticket_types) = new_event.into_rows(Utc::now());

        self.store.create_event(&event, &ticket_types).await?;
        info!(
            event_id = %event.id,
            owner_id = %owner_id,
            ticket_types = ticket_types.len(),
            "Event created"
        );

        Ok(event.id)
    }

    pub async fn get_event(&self, id: Uuid) -> Result<EventDetail, EventError> {
        self.store.find_event(id).await?.ok_or(EventError::NotFound)
    }

    pub async fn list_events(&self) -> Result<Vec<EventDetail>, EventError> {
        Ok(self.store.list_published_events().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_price_to_cents_is_exact() {
        assert_eq!(price_to_cents(Decimal::new(2000, 2)), Some(2000));
        assert_eq!(price_to_cents(Decimal::new(1999, 2)), Some(1999));
        assert_eq!(price_to_cents(Decimal::from(0)), Some(0));
    }

    #[test]
    fn test_price_to_cents_rejects_fractions_of_cents_and_negatives() {
        assert_eq!(price_to_cents(Decimal::from_str("19.995").unwrap()), None);
        assert_eq!(price_to_cents(Decimal::from_str("-1").unwrap()), None);
    }
}
