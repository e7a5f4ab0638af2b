use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

use super::{PurchaseRequest, Store, StoreError, StoreResult};
use crate::models::{
    Event, EventDetail, EventStatus, InventoryError, Order, OrderWithTickets, Ticket, TicketType,
    User,
};

const USER_COLUMNS: &str = "id, name, email, password_hash, role, email_verified_at, \
     verify_code_hash, verify_code_expires_at, org_name, org_cnpj, created_at, updated_at";

const EVENT_COLUMNS: &str = "id, owner_id, title, description, venue, banner_url, date_start, \
     date_end, status, created_at, updated_at";

const TICKET_TYPE_COLUMNS: &str = "id, event_id, name, price_cents, qty_total, qty_sold, \
     sales_start, sales_end, created_at, updated_at";

const ORDER_COLUMNS: &str =
    "id, user_id, event_id, amount_cents, status, provider, provider_ref, created_at, updated_at";

const TICKET_COLUMNS: &str = "id, order_id, ticket_type_id, qr_code, used_at, created_at";

/// Postgres-backed store. The pool is created once at startup and shared.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn ticket_types_for(
        &self,
        event_ids: &[Uuid],
    ) -> StoreResult<HashMap<Uuid, Vec<TicketType>>> {
        let rows = sqlx::query_as::<_, TicketType>(&format!(
            "SELECT {TICKET_TYPE_COLUMNS} FROM ticket_types \
             WHERE event_id = ANY($1) ORDER BY created_at, name"
        ))
        .bind(event_ids)
        .fetch_all(&self.pool)
        .await?;

        let mut grouped: HashMap<Uuid, Vec<TicketType>> = HashMap::new();
        for row in rows {
            grouped.entry(row.event_id).or_default().push(row);
        }
        Ok(grouped)
    }
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn find_user_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn find_user_by_tax_id(&self, cnpj: &str) -> StoreResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE org_cnpj = $1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(cnpj)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn insert_user(&self, user: &User) -> StoreResult<()> {
        sqlx::query(&format!(
            "INSERT INTO users ({USER_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)"
        ))
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role)
        .bind(user.email_verified_at)
        .bind(&user.verify_code_hash)
        .bind(user.verify_code_expires_at)
        .bind(&user.org_name)
        .bind(&user.org_cnpj)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_user(&self, user: &User) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET name = $2,
                password_hash = $3,
                role = $4,
                email_verified_at = $5,
                verify_code_hash = $6,
                verify_code_expires_at = $7,
                org_name = $8,
                org_cnpj = $9,
                updated_at = $10
            WHERE id = $1
            "#,
        )
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.password_hash)
        .bind(user.role)
        .bind(user.email_verified_at)
        .bind(&user.verify_code_hash)
        .bind(user.verify_code_expires_at)
        .bind(&user.org_name)
        .bind(&user.org_cnpj)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn create_event(&self, event: &Event, ticket_types: &[TicketType]) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(&format!(
            "INSERT INTO events ({EVENT_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)"
        ))
        .bind(event.id)
        .bind(event.owner_id)
        .bind(&event.title)
        .bind(&event.description)
        .bind(&event.venue)
        .bind(&event.banner_url)
        .bind(event.date_start)
        .bind(event.date_end)
        .bind(event.status)
        .bind(event.created_at)
        .bind(event.updated_at)
        .execute(&mut *tx)
        .await?;

        for tt in ticket_types {
            sqlx::query(&format!(
                "INSERT INTO ticket_types ({TICKET_TYPE_COLUMNS}) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)"
            ))
            .bind(tt.id)
            .bind(tt.event_id)
            .bind(&tt.name)
            .bind(tt.price_cents)
            .bind(tt.qty_total)
            .bind(tt.qty_sold)
            .bind(tt.sales_start)
            .bind(tt.sales_end)
            .bind(tt.created_at)
            .bind(tt.updated_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn find_event(&self, id: Uuid) -> StoreResult<Option<EventDetail>> {
        let Some(event) =
            sqlx::query_as::<_, Event>(&format!("SELECT {EVENT_COLUMNS} FROM events WHERE id = $1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?
        else {
            return Ok(None);
        };

        let mut ticket_types = self.ticket_types_for(&[event.id]).await?;
        let ticket_types = ticket_types.remove(&event.id).unwrap_or_default();
        Ok(Some(EventDetail::new(event, ticket_types)))
    }

    async fn list_published_events(&self) -> StoreResult<Vec<EventDetail>> {
        let events = sqlx::query_as::<_, Event>(&format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE status = $1 ORDER BY date_start"
        ))
        .bind(EventStatus::Published)
        .fetch_all(&self.pool)
        .await?;

        let ids: Vec<Uuid> = events.iter().map(|e| e.id).collect();
        let mut ticket_types = self.ticket_types_for(&ids).await?;

        Ok(events
            .into_iter()
            .map(|event| {
                let types = ticket_types.remove(&event.id).unwrap_or_default();
                EventDetail::new(event, types)
            })
            .collect())
    }

    async fn purchase(&self, request: PurchaseRequest) -> StoreResult<OrderWithTickets> {
        let mut tx = self.pool.begin().await?;

        // Row lock serializes concurrent buyers of the same ticket type until commit.
        let ticket_type = sqlx::query_as::<_, TicketType>(&format!(
            "SELECT {TICKET_TYPE_COLUMNS} FROM ticket_types WHERE id = $1 FOR UPDATE"
        ))
        .bind(request.ticket_type_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(InventoryError::InvalidTicketType)?;

        let quote = ticket_type.quote(request.event_id, request.quantity, request.at)?;
        let at = request.at;
        let purchase = request.into_rows(&quote);
        let order = &purchase.order;

        sqlx::query(&format!(
            "INSERT INTO orders ({ORDER_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)"
        ))
        .bind(order.id)
        .bind(order.user_id)
        .bind(order.event_id)
        .bind(order.amount_cents)
        .bind(order.status)
        .bind(&order.provider)
        .bind(&order.provider_ref)
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&mut *tx)
        .await?;

        for ticket in &purchase.tickets {
            sqlx::query(&format!(
                "INSERT INTO tickets ({TICKET_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6)"
            ))
            .bind(ticket.id)
            .bind(ticket.order_id)
            .bind(ticket.ticket_type_id)
            .bind(&ticket.qr_code)
            .bind(ticket.used_at)
            .bind(ticket.created_at)
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query(
            "UPDATE ticket_types SET qty_sold = qty_sold + $2, updated_at = $3 WHERE id = $1",
        )
        .bind(ticket_type.id)
        .bind(quote.quantity)
        .bind(at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        debug!(order_id = %order.id, ticket_type_id = %ticket_type.id, "Purchase committed");
        Ok(purchase)
    }

    async fn orders_for_user(&self, user_id: Uuid) -> StoreResult<Vec<OrderWithTickets>> {
        let orders = sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE user_id = $1 ORDER BY created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        let ids: Vec<Uuid> = orders.iter().map(|o| o.id).collect();
        let tickets = sqlx::query_as::<_, Ticket>(&format!(
            "SELECT {TICKET_COLUMNS} FROM tickets WHERE order_id = ANY($1) ORDER BY created_at, id"
        ))
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let mut grouped: HashMap<Uuid, Vec<Ticket>> = HashMap::new();
        for ticket in tickets {
            grouped.entry(ticket.order_id).or_default().push(ticket);
        }

        Ok(orders
            .into_iter()
            .map(|order| {
                let tickets = grouped.remove(&order.id).unwrap_or_default();
                OrderWithTickets { order, tickets }
            })
            .collect())
    }

    async fn redeem_ticket(&self, qr_code: &str, at: DateTime<Utc>) -> StoreResult<Ticket> {
        let redeemed = sqlx::query_as::<_, Ticket>(&format!(
            "UPDATE tickets SET used_at = $2 WHERE qr_code = $1 AND used_at IS NULL \
             RETURNING {TICKET_COLUMNS}"
        ))
        .bind(qr_code)
        .bind(at)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(ticket) = redeemed {
            return Ok(ticket);
        }

        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM tickets WHERE qr_code = $1)")
                .bind(qr_code)
                .fetch_one(&self.pool)
                .await?;

        if exists {
            Err(StoreError::AlreadyRedeemed)
        } else {
            Err(StoreError::NotFound)
        }
    }
}
