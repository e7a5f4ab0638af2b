//! Six-digit email verification codes.

use chrono::{DateTime, Duration, Utc};
use rand::Rng;

use super::password::{hash_password, verify_password};
use super::CryptoError;

pub const CODE_LENGTH: usize = 6;
pub const CODE_TTL_MINUTES: i64 = 15;

/// A new code is only handed out once the previous one is this close to expiry.
pub const RESEND_WINDOW_MINUTES: i64 = 1;

pub fn code_ttl() -> Duration {
    Duration::minutes(CODE_TTL_MINUTES)
}

/// Source of fresh verification codes.
pub trait CodeGenerator: Send + Sync {
    fn generate(&self) -> String;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RandomCodeGenerator;

impl CodeGenerator for RandomCodeGenerator {
    fn generate(&self) -> String {
        rand::thread_rng().gen_range(100_000..1_000_000).to_string()
    }
}

/// A freshly issued code. Only `hash` and `expires_at` are persisted.
#[derive(Debug, Clone)]
pub struct VerificationCode {
    pub code: String,
    pub hash: String,
    pub expires_at: DateTime<Utc>,
}

impl VerificationCode {
    pub fn issue(generator: &dyn CodeGenerator, now: DateTime<Utc>) -> Result<Self, CryptoError> {
        let code = generator.generate();
        let hash = hash_password(&code)?;
        Ok(Self {
            code,
            hash,
            expires_at: now + code_ttl(),
        })
    }
}

pub fn is_well_formed(code: &str) -> bool {
    code.len() == CODE_LENGTH && code.bytes().all(|b| b.is_ascii_digit())
}

pub fn matches(code: &str, hash: &str) -> Result<bool, CryptoError> {
    verify_password(code, hash)
}

/// True while the previous code still has more than the resend window left.
pub fn resend_too_soon(previous_expiry: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    let window = Duration::minutes(RESEND_WINDOW_MINUTES);
    previous_expiry.is_some_and(|exp| exp - now > window)
}
