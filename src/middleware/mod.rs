pub mod auth;
pub mod envelope;

pub use auth::{authenticate, authorize, AllowedRoles, AuthContext, ANY_ROLE, ORGANIZERS};
pub use envelope::envelope_errors;
