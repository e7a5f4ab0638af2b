pub mod auth;
pub mod checkout;
pub mod events;
pub mod tickets;

pub use auth::{AuthFlowError, AuthService, DemoCode, Session, SignupInput, SignupOutcome};
pub use checkout::{CheckoutError, CheckoutService, PurchaseInput};
pub use events::{CreateEventInput, EventError, EventService, TicketTypeInput};
pub use tickets::{RedeemError, TicketService};
