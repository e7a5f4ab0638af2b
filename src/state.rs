use std::sync::Arc;

use crate::auth::{CodeGenerator, JwtService, RandomCodeGenerator};
use crate::config::Config;
use crate::mail::Mailer;
use crate::services::{AuthService, CheckoutService, EventService, TicketService};
use crate::store::Store;

const TOKEN_ISSUER: &str = "ticketa";

/// Process-wide dependencies, built once at startup and cloned into handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<dyn Store>,
    pub tokens: Arc<JwtService>,
    pub auth: AuthService,
    pub checkout: CheckoutService,
    pub events: EventService,
    pub tickets: TicketService,
}

impl AppState {
    pub fn new(config: Config, store: Arc<dyn Store>, mailer: Arc<dyn Mailer>) -> Self {
        Self::with_code_generator(config, store, mailer, Arc::new(RandomCodeGenerator))
    }

    pub fn with_code_generator(
        config: Config,
        store: Arc<dyn Store>,
        mailer: Arc<dyn Mailer>,
        codes: Arc<dyn CodeGenerator>,
    ) -> Self {
        let tokens = Arc::new(JwtService::new(&config.jwt_secret, TOKEN_ISSUER));
        let auth = AuthService::new(
            store.clone(),
            mailer,
            tokens.clone(),
            codes,
            config.verification_mode,
        );

        Self {
            config: Arc::new(config),
            checkout: CheckoutService::new(store.clone()),
            events: EventService::new(store.clone()),
            tickets: TicketService::new(store.clone()),
            store,
            tokens,
            auth,
        }
    }
}
