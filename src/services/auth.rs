//! Signup, email verification, login and organizer promotion.
//!
//! Account states: unverified (code pending) -> verified. Login is only
//! possible from the verified state.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::auth::otp::{self, CODE_TTL_MINUTES};
use crate::auth::{
    password, tax_id, CodeGenerator, CryptoError, JwtService, TokenError, VerificationCode,
};
use crate::config::VerificationMode;
use crate::mail::{self, MailError, Mailer};
use crate::models::{PublicUser, Role, User};
use crate::store::{Store, StoreError, USERS_EMAIL_KEY, USERS_ORG_CNPJ_KEY};
use crate::utils::error::AppError;
use crate::utils::validation::{normalize_email, ValidationIssues, Validator};

#[derive(Debug, Error)]
pub enum AuthFlowError {
    #[error(transparent)]
    Invalid(#[from] ValidationIssues),

    #[error("email is already in use")]
    EmailInUse,

    #[error("user not found")]
    NotFound,

    #[error("no verification is pending for this account")]
    NoPendingVerification,

    #[error("verification code has expired")]
    CodeExpired,

    #[error("verification code is invalid")]
    InvalidCode,

    #[error("email is already verified")]
    AlreadyVerified,

    #[error("a code was sent recently, try again later")]
    TooSoon,

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("email verification required")]
    VerificationRequired,

    #[error("tax id is not valid")]
    InvalidTaxId,

    #[error("account is already an organizer")]
    AlreadyOrganizer,

    #[error("tax id is already registered")]
    TaxIdInUse,

    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error(transparent)]
    Token(#[from] TokenError),

    #[error(transparent)]
    Mail(#[from] MailError),

    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for AuthFlowError {
    fn from(err: StoreError) -> Self {
        match &err {
            StoreError::UniqueViolation(c) if c == USERS_EMAIL_KEY => AuthFlowError::EmailInUse,
            StoreError::UniqueViolation(c) if c == USERS_ORG_CNPJ_KEY => AuthFlowError::TaxIdInUse,
            StoreError::NotFound => AuthFlowError::NotFound,
            _ => AuthFlowError::Store(err),
        }
    }
}

impl From<AuthFlowError> for AppError {
    fn from(err: AuthFlowError) -> Self {
        let message = err.to_string();
        match err {
            AuthFlowError::Invalid(issues) => issues.into(),
            AuthFlowError::EmailInUse => AppError::conflict("EMAIL_IN_USE", message),
            AuthFlowError::NotFound => AppError::NotFound(message),
            AuthFlowError::NoPendingVerification => {
                AppError::bad_request("NO_PENDING_VERIFICATION", message)
            }
            AuthFlowError::CodeExpired => AppError::bad_request("CODE_EXPIRED", message),
            AuthFlowError::InvalidCode => AppError::bad_request("INVALID_CODE", message),
            AuthFlowError::AlreadyVerified => AppError::bad_request("ALREADY_VERIFIED", message),
            AuthFlowError::TooSoon => AppError::RateLimited {
                code: "TOO_SOON",
                message,
            },
            AuthFlowError::InvalidCredentials => AppError::AuthError {
                code: "INVALID_CREDENTIALS",
                message,
            },
            AuthFlowError::VerificationRequired => AppError::Forbidden {
                code: "VERIFICATION_REQUIRED",
                message,
            },
            AuthFlowError::InvalidTaxId => AppError::bad_request("INVALID_TAX_ID", message),
            AuthFlowError::AlreadyOrganizer => AppError::conflict("ALREADY_ORGANIZER", message),
            AuthFlowError::TaxIdInUse => AppError::conflict("TAX_ID_IN_USE", message),
            AuthFlowError::Crypto(e) => AppError::InternalServerError(e.to_string()),
            AuthFlowError::Token(e) => AppError::InternalServerError(e.to_string()),
            AuthFlowError::Mail(e) => {
                error!(error = %e, "Verification email could not be delivered");
                AppError::ExternalServiceError("Email delivery failed".to_string())
            }
            AuthFlowError::Store(e) => e.into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SignupInput {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub role: Option<Role>,
    #[serde(default)]
    pub company_name: Option<String>,
    #[serde(default)]
    pub cnpj: Option<String>,
}

/// Session handed out after a successful verification or login.
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub token: String,
    pub user: PublicUser,
}

/// Code echoed back to the client in demo deployments.
#[derive(Debug, Clone, Serialize)]
pub struct DemoCode {
    pub code: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "message", rename_all = "snake_case")]
pub enum SignupOutcome {
    VerificationSent {
        email: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        demo: Option<DemoCode>,
    },
    AutoVerified {
        token: String,
        user: PublicUser,
    },
}

#[derive(Clone)]
pub struct AuthService {
    store: Arc<dyn Store>,
    mailer: Arc<dyn Mailer>,
    tokens: Arc<JwtService>,
    codes: Arc<dyn CodeGenerator>,
    mode: VerificationMode,
}

impl AuthService {
    pub fn new(
        store: Arc<dyn Store>,
        mailer: Arc<dyn Mailer>,
        tokens: Arc<JwtService>,
        codes: Arc<dyn CodeGenerator>,
        mode: VerificationMode,
    ) -> Self {
        Self {
            store,
            mailer,
            tokens,
            codes,
            mode,
        }
    }

    pub async fn signup(&self, input: SignupInput) -> Result<SignupOutcome, AuthFlowError> {
        let email = normalize_email(&input.email);
        let role = input.role.unwrap_or(Role::Attendee);
        let company_name = input
            .company_name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());
        let cnpj = input
            .cnpj
            .as_deref()
            .map(tax_id::normalize)
            .filter(|c| !c.is_empty());

        Validator::new()
            .min_chars("name", &input.name, 3)
            .email("email", &email)
            .min_chars("password", &input.password, 6)
            .check(role != Role::Admin, "role", "must be attendee or organizer")
            .check(
                cnpj.as_deref().map_or(true, tax_id::is_valid_cnpj),
                "cnpj",
                "is not a valid CNPJ",
            )
            .finish()?;

        let existing = self.store.find_user_by_email(&email).await?;
        if existing.as_ref().is_some_and(User::is_verified) {
            return Err(AuthFlowError::EmailInUse);
        }

        // Repeating an unverified signup re-mails a code, so it shares the
        // resend cooldown.
        let now = Utc::now();
        if self.mode == VerificationMode::Email
            && existing
                .as_ref()
                .is_some_and(|u| otp::resend_too_soon(u.verify_code_expires_at, now))
        {
            return Err(AuthFlowError::TooSoon);
        }

        let password_hash = hash_secret(input.password).await?;
        let is_new = existing.is_none();

        let mut user = match existing {
            Some(mut user) => {
                user.password_hash = password_hash;
                user.role = role;
                user
            }
            None => User::new(String::new(), email.clone(), password_hash, role),
        };
        user.name = input.name.trim().to_string();
        user.org_name = company_name.or(user.org_name.take());
        user.org_cnpj = cnpj.or(user.org_cnpj.take());
        user.updated_at = now;

        if self.mode == VerificationMode::DemoAutoVerify {
            user.mark_verified(now);
            self.save(&user, is_new).await?;
            info!(user_id = %user.id, "Account auto-verified at signup");

            let session = self.session_for(&user)?;
            return Ok(SignupOutcome::AutoVerified {
                token: session.token,
                user: session.user,
            });
        }

        let issued = VerificationCode::issue(self.codes.as_ref(), now)?;
        user.verify_code_hash = Some(issued.hash.clone());
        user.verify_code_expires_at = Some(issued.expires_at);
        self.save(&user, is_new).await?;

        let demo = self
            .deliver_code(&user.email, &issued, "Confirm your email")
            .await?;
        info!(user_id = %user.id, new_account = is_new, "Verification code issued");

        Ok(SignupOutcome::VerificationSent { email, demo })
    }

    pub async fn verify_email(&self, email: &str, code: &str) -> Result<Session, AuthFlowError> {
        let email = normalize_email(email);
        Validator::new()
            .email("email", &email)
            .check(
                otp::is_well_formed(code),
                "code",
                "must be exactly 6 digits",
            )
            .finish()?;

        let mut user = self
            .store
            .find_user_by_email(&email)
            .await?
            .ok_or(AuthFlowError::NotFound)?;

        let pending = (user.verify_code_hash.clone(), user.verify_code_expires_at);
        let (Some(hash), Some(expires_at)) = pending else {
            return Err(AuthFlowError::NoPendingVerification);
        };

        let now = Utc::now();
        if expires_at < now {
            return Err(AuthFlowError::CodeExpired);
        }
        if !check_code(code.to_string(), hash).await? {
            warn!(user_id = %user.id, "Invalid verification code");
            return Err(AuthFlowError::InvalidCode);
        }

        user.mark_verified(now);
        self.store.update_user(&user).await?;
        info!(user_id = %user.id, "Email verified");

        self.session_for(&user)
    }

    /// Issues a replacement code. Returns the code itself only in demo modes.
    pub async fn resend_code(&self, email: &str) -> Result<Option<DemoCode>, AuthFlowError> {
        let email = normalize_email(email);
        Validator::new().email("email", &email).finish()?;

        let mut user = self
            .store
            .find_user_by_email(&email)
            .await?
            .ok_or(AuthFlowError::NotFound)?;

        if user.is_verified() {
            return Err(AuthFlowError::AlreadyVerified);
        }

        let now = Utc::now();
        if self.mode == VerificationMode::Email
            && otp::resend_too_soon(user.verify_code_expires_at, now)
        {
            return Err(AuthFlowError::TooSoon);
        }

        let issued = VerificationCode::issue(self.codes.as_ref(), now)?;
        user.verify_code_hash = Some(issued.hash.clone());
        user.verify_code_expires_at = Some(issued.expires_at);
        user.updated_at = now;
        self.store.update_user(&user).await?;

        let demo = self
            .deliver_code(&user.email, &issued, "Your new Ticketa code")
            .await?;
        info!(user_id = %user.id, "Verification code re-issued");
        Ok(demo)
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<Session, AuthFlowError> {
        let email = normalize_email(email);
        Validator::new()
            .email("email", &email)
            .min_chars("password", password, 1)
            .finish()?;

        let Some(user) = self.store.find_user_by_email(&email).await? else {
            let password = password.to_string();
            let _ = tokio::task::spawn_blocking(move || password::verify_against_dummy(&password))
                .await;
            return Err(AuthFlowError::InvalidCredentials);
        };

        if !verify_secret(password.to_string(), user.password_hash.clone()).await? {
            return Err(AuthFlowError::InvalidCredentials);
        }
        if !user.is_verified() {
            return Err(AuthFlowError::VerificationRequired);
        }

        info!(user_id = %user.id, "User logged in");
        self.session_for(&user)
    }

    /// Promotes an attendee to organizer. The returned session carries the
    /// new role so the client does not have to log in again.
    pub async fn become_organizer(
        &self,
        user_id: Uuid,
        company_name: &str,
        cnpj: &str,
    ) -> Result<Session, AuthFlowError> {
        let company_name = company_name.trim();
        let cnpj = tax_id::normalize(cnpj);

        Validator::new()
            .min_chars("company_name", company_name, 2)
            .finish()?;
        if !tax_id::is_valid_cnpj(&cnpj) {
            return Err(AuthFlowError::InvalidTaxId);
        }

        let mut user = self
            .store
            .find_user_by_id(user_id)
            .await?
            .ok_or(AuthFlowError::NotFound)?;

        if user.role.can_organize() {
            return Err(AuthFlowError::AlreadyOrganizer);
        }
        if let Some(holder) = self.store.find_user_by_tax_id(&cnpj).await? {
            if holder.id != user.id {
                return Err(AuthFlowError::TaxIdInUse);
            }
        }

        user.role = Role::Organizer;
        user.org_name = Some(company_name.to_string());
        user.org_cnpj = Some(cnpj);
        user.updated_at = Utc::now();
        self.store.update_user(&user).await?;
        info!(user_id = %user.id, "User promoted to organizer");

        self.session_for(&user)
    }

    pub async fn me(&self, user_id: Uuid) -> Result<PublicUser, AuthFlowError> {
        let user = self
            .store
            .find_user_by_id(user_id)
            .await?
            .ok_or(AuthFlowError::NotFound)?;
        Ok(PublicUser::from(&user))
    }

    async fn save(&self, user: &User, is_new: bool) -> Result<(), AuthFlowError> {
        if is_new {
            self.store.insert_user(user).await?;
        } else {
            self.store.update_user(user).await?;
        }
        Ok(())
    }

    async fn deliver_code(
        &self,
        to: &str,
        issued: &VerificationCode,
        subject: &str,
    ) -> Result<Option<DemoCode>, AuthFlowError> {
        match self.mode {
            VerificationMode::Email => {
                let html = mail::verification_email(&issued.code, CODE_TTL_MINUTES);
                self.mailer.send(to, subject, &html).await?;
                Ok(None)
            }
            VerificationMode::DemoExposeCode | VerificationMode::DemoAutoVerify => {
                Ok(Some(DemoCode {
                    code: issued.code.clone(),
                    expires_at: issued.expires_at,
                }))
            }
        }
    }

    fn session_for(&self, user: &User) -> Result<Session, AuthFlowError> {
        Ok(Session {
            token: self.tokens.create_token(user.id, user.role)?,
            user: PublicUser::from(user),
        })
    }
}

async fn hash_secret(secret: String) -> Result<String, AuthFlowError> {
    tokio::task::spawn_blocking(move || password::hash_password(&secret))
        .await
        .map_err(|e| CryptoError::Hash(e.to_string()))?
        .map_err(Into::into)
}

async fn verify_secret(secret: String, hash: String) -> Result<bool, AuthFlowError> {
    tokio::task::spawn_blocking(move || password::verify_password(&secret, &hash))
        .await
        .map_err(|e| CryptoError::Hash(e.to_string()))?
        .map_err(Into::into)
}

async fn check_code(code: String, hash: String) -> Result<bool, AuthFlowError> {
    tokio::task::spawn_blocking(move || otp::matches(&code, &hash))
        .await
        .map_err(|e| CryptoError::Hash(e.to_string()))?
        .map_err(Into::into)
}
