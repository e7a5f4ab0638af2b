use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{
    PurchaseRequest, Store, StoreError, StoreResult, TICKETS_QR_CODE_KEY, USERS_EMAIL_KEY,
    USERS_ORG_CNPJ_KEY,
};
use crate::models::{
    Event, EventDetail, EventStatus, InventoryError, Order, OrderWithTickets, Ticket, TicketType,
    User,
};

#[derive(Default)]
struct State {
    users: HashMap<Uuid, User>,
    events: Vec<Event>,
    ticket_types: Vec<TicketType>,
    orders: Vec<Order>,
    tickets: Vec<Ticket>,
    qr_codes: HashSet<String>,
}

impl State {
    fn check_user_uniqueness(&self, user: &User) -> StoreResult<()> {
        for other in self.users.values().filter(|u| u.id != user.id) {
            if other.email == user.email {
                return Err(StoreError::UniqueViolation(USERS_EMAIL_KEY.to_string()));
            }
            if user.org_cnpj.is_some() && other.org_cnpj == user.org_cnpj {
                return Err(StoreError::UniqueViolation(USERS_ORG_CNPJ_KEY.to_string()));
            }
        }
        Ok(())
    }

    fn detail(&self, event: &Event) -> EventDetail {
        let types = self
            .ticket_types
            .iter()
            .filter(|tt| tt.event_id == event.id)
            .cloned()
            .collect();
        EventDetail::new(event.clone(), types)
    }
}

/// In-process store with the same constraints as the Postgres schema.
///
/// A single lock guards all state, so every trait method is atomic.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn ticket_type(&self, id: Uuid) -> Option<TicketType> {
        let state = self.state.lock().await;
        state.ticket_types.iter().find(|tt| tt.id == id).cloned()
    }

    pub async fn ticket_count(&self) -> usize {
        self.state.lock().await.tickets.len()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }

    async fn find_user_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(self.state.lock().await.users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let state = self.state.lock().await;
        Ok(state.users.values().find(|u| u.email == email).cloned())
    }

    async fn find_user_by_tax_id(&self, cnpj: &str) -> StoreResult<Option<User>> {
        let state = self.state.lock().await;
        Ok(state
            .users
            .values()
            .find(|u| u.org_cnpj.as_deref() == Some(cnpj))
            .cloned())
    }

    async fn insert_user(&self, user: &User) -> StoreResult<()> {
        let mut state = self.state.lock().await;
        if state.users.contains_key(&user.id) {
            return Err(StoreError::UniqueViolation("users_pkey".to_string()));
        }
        state.check_user_uniqueness(user)?;
        state.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn update_user(&self, user: &User) -> StoreResult<()> {
        let mut state = self.state.lock().await;
        if !state.users.contains_key(&user.id) {
            return Err(StoreError::NotFound);
        }
        state.check_user_uniqueness(user)?;
        state.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn create_event(&self, event: &Event, ticket_types: &[TicketType]) -> StoreResult<()> {
        let mut state = self.state.lock().await;
        state.events.push(event.clone());
        state.ticket_types.extend_from_slice(ticket_types);
        Ok(())
    }

    async fn find_event(&self, id: Uuid) -> StoreResult<Option<EventDetail>> {
        let state = self.state.lock().await;
        Ok(state
            .events
            .iter()
            .find(|e| e.id == id)
            .map(|event| state.detail(event)))
    }

    async fn list_published_events(&self) -> StoreResult<Vec<EventDetail>> {
        let state = self.state.lock().await;
        let mut events: Vec<&Event> = state
            .events
            .iter()
            .filter(|e| e.status == EventStatus::Published)
            .collect();
        events.sort_by_key(|e| e.date_start);
        Ok(events.into_iter().map(|e| state.detail(e)).collect())
    }

    async fn purchase(&self, request: PurchaseRequest) -> StoreResult<OrderWithTickets> {
        let mut state = self.state.lock().await;

        let index = state
            .ticket_types
            .iter()
            .position(|tt| tt.id == request.ticket_type_id)
            .ok_or(InventoryError::InvalidTicketType)?;

        let tt = &state.ticket_types[index];
        let quote = tt.quote(request.event_id, request.quantity, request.at)?;

        let mut fresh = HashSet::new();
        for code in &request.qr_codes {
            if state.qr_codes.contains(code) || !fresh.insert(code.as_str()) {
                return Err(StoreError::UniqueViolation(TICKETS_QR_CODE_KEY.to_string()));
            }
        }

        let at = request.at;
        let purchase = request.into_rows(&quote);

        let ticket_type = &mut state.ticket_types[index];
        ticket_type.qty_sold += quote.quantity;
        ticket_type.updated_at = at;

        state.orders.push(purchase.order.clone());
        for ticket in &purchase.tickets {
            state.qr_codes.insert(ticket.qr_code.clone());
            state.tickets.push(ticket.clone());
        }

        Ok(purchase)
    }

    async fn orders_for_user(&self, user_id: Uuid) -> StoreResult<Vec<OrderWithTickets>> {
        let state = self.state.lock().await;
        Ok(state
            .orders
            .iter()
            .rev()
            .filter(|o| o.user_id == user_id)
            .map(|order| OrderWithTickets {
                order: order.clone(),
                tickets: state
                    .tickets
                    .iter()
                    .filter(|t| t.order_id == order.id)
                    .cloned()
                    .collect(),
            })
            .collect())
    }

    async fn redeem_ticket(&self, qr_code: &str, at: DateTime<Utc>) -> StoreResult<Ticket> {
        let mut state = self.state.lock().await;
        let ticket = state
            .tickets
            .iter_mut()
            .find(|t| t.qr_code == qr_code)
            .ok_or(StoreError::NotFound)?;

        if ticket.is_used() {
            return Err(StoreError::AlreadyRedeemed);
        }
        ticket.used_at = Some(at);
        Ok(ticket.clone())
    }
}
