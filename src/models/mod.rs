pub mod coupon;
pub mod event;
pub mod order;
pub mod user;

pub use coupon::Coupon;
pub use event::{
    Event, EventDetail, EventStatus, InventoryError, NewEvent, NewTicketType, Quote, TicketType,
};
pub use order::{Order, OrderStatus, OrderWithTickets, Ticket};
pub use user::{PublicUser, Role, User};
