//! Credential primitives: password hashing, one-time codes, session tokens
//! and tax-id validation.

pub mod otp;
pub mod password;
pub mod tax_id;
pub mod token;

use thiserror::Error;

pub use otp::{CodeGenerator, RandomCodeGenerator, VerificationCode};
pub use token::{Claims, JwtService, TokenError};

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("hashing failed: {0}")]
    Hash(String),

    #[error("stored hash is malformed: {0}")]
    MalformedHash(String),
}
