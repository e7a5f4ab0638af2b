// Shared fixtures for integration tests
#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use ticketa_server::auth::CodeGenerator;
use ticketa_server::config::{Config, VerificationMode};
use ticketa_server::mail::{MailError, Mailer};
use ticketa_server::models::{EventStatus, NewEvent, NewTicketType};
use ticketa_server::state::AppState;
use ticketa_server::store::{MemoryStore, Store};

pub const TEST_CODE: &str = "123456";

/// Always hands out the same verification code.
pub struct FixedCode(pub &'static str);

impl CodeGenerator for FixedCode {
    fn generate(&self) -> String {
        self.0.to_string()
    }
}

#[derive(Debug, Clone)]
pub struct SentMail {
    pub to: String,
    pub subject: String,
    pub html: String,
}

#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<SentMail>>,
}

impl RecordingMailer {
    pub fn sent(&self) -> Vec<SentMail> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, to: &str, subject: &str, html: &str) -> Result<(), MailError> {
        self.sent.lock().unwrap().push(SentMail {
            to: to.to_string(),
            subject: subject.to_string(),
            html: html.to_string(),
        });
        Ok(())
    }
}

pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub mailer: Arc<RecordingMailer>,
    pub state: AppState,
}

pub fn harness(mode: VerificationMode) -> Harness {
    let store = Arc::new(MemoryStore::new());
    let mailer = Arc::new(RecordingMailer::default());
    let config = Config {
        verification_mode: mode,
        ..Config::default()
    };
    let state = AppState::with_code_generator(
        config,
        store.clone(),
        mailer.clone(),
        Arc::new(FixedCode(TEST_CODE)),
    );

    Harness {
        store,
        mailer,
        state,
    }
}

pub struct SeededEvent {
    pub event_id: Uuid,
    pub ticket_type_id: Uuid,
}

/// Inserts a published event with a single ticket type straight into the store.
pub async fn seed_event(store: &MemoryStore, price_cents: i64, qty_total: i32) -> SeededEvent {
    seed_event_with_window(store, price_cents, qty_total, None, None).await
}

pub async fn seed_event_with_window(
    store: &MemoryStore,
    price_cents: i64,
    qty_total: i32,
    sales_start: Option<DateTime<Utc>>,
    sales_end: Option<DateTime<Utc>>,
) -> SeededEvent {
    let now = Utc::now();
    let (event, ticket_types) = NewEvent {
        owner_id: Uuid::new_v4(),
        title: "Rust Meetup".to_string(),
        description: None,
        venue: "Main Hall".to_string(),
        banner_url: None,
        date_start: now + Duration::days(30),
        date_end: now + Duration::days(30) + Duration::hours(4),
        status: EventStatus::Published,
        ticket_types: vec![NewTicketType {
            name: "General".to_string(),
            price_cents,
            qty_total,
            sales_start,
            sales_end,
        }],
    }
    .into_rows(now);

    store.create_event(&event, &ticket_types).await.unwrap();

    SeededEvent {
        event_id: event.id,
        ticket_type_id: ticket_types[0].id,
    }
}
