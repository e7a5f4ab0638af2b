use std::sync::Arc;

use axum::middleware::{from_fn, from_fn_with_state};
use axum::routing::{get, post};
use axum::Router;
use tower_governor::governor::GovernorConfigBuilder;
use tower_governor::GovernorLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::config::{create_cors_layer, create_security_headers_layer};
use crate::handlers::{auth, checkout, events, health_check, me, tickets};
use crate::middleware::{authenticate, authorize, envelope_errors, ANY_ROLE, ORGANIZERS};
use crate::state::AppState;

pub fn create_routes(state: AppState) -> Router {
    let config = state.config.clone();

    let public = Router::new()
        .route("/healthz", get(health_check))
        .route("/events/:id", get(events::get_event));

    // Per-client limit on code guessing and code mailing, keyed on
    // `X-Forwarded-For`, `X-Real-IP` or `Forwarded` before the peer address.
    let auth_limit = GovernorConfigBuilder::default()
        .per_millisecond(config.auth_rate_limit.replenish_ms)
        .burst_size(config.auth_rate_limit.burst_size)
        .use_headers()
        .finish()
        .expect("Rate limit values are checked to be non-zero when config loads");

    let auth_routes = Router::new()
        .route("/auth/signup", post(auth::signup))
        .route("/auth/verify-email", post(auth::verify_email))
        .route("/auth/resend-code", post(auth::resend_code))
        .route("/auth/login", post(auth::login))
        .layer(GovernorLayer {
            config: Arc::new(auth_limit),
        });

    // Listing is public, creation needs an organizer session.
    let catalogue = Router::new().route(
        "/events",
        get(events::list_events).merge(
            post(events::create_event)
                .route_layer(from_fn_with_state(ORGANIZERS, authorize))
                .route_layer(from_fn_with_state(state.clone(), authenticate)),
        ),
    );

    let signed_in = Router::new()
        .route("/checkout/mock", post(checkout::mock_checkout))
        .route("/tickets/validate", post(tickets::validate_ticket))
        .route("/me", get(me::profile))
        .route("/me/orders", get(me::orders))
        .route("/me/become-organizer", post(me::become_organizer))
        .route_layer(from_fn_with_state(ANY_ROLE, authorize))
        .route_layer(from_fn_with_state(state.clone(), authenticate));

    Router::new()
        .merge(public)
        .merge(auth_routes)
        .merge(catalogue)
        .merge(signed_in)
        .layer(TimeoutLayer::new(config.request_timeout))
        .layer(TraceLayer::new_for_http())
        .layer(create_security_headers_layer(&config))
        .layer(create_cors_layer(&config.cors_allowed_origins))
        .layer(from_fn(envelope_errors))
        .with_state(state)
}
