use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
pub enum Role {
    Attendee,
    Organizer,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Attendee => "attendee",
            Role::Organizer => "organizer",
            Role::Admin => "admin",
        }
    }

    /// Organizers and admins may run events.
    pub fn can_organize(&self) -> bool {
        matches!(self, Role::Organizer | Role::Admin)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub email_verified_at: Option<DateTime<Utc>>,
    pub verify_code_hash: Option<String>,
    pub verify_code_expires_at: Option<DateTime<Utc>>,
    pub org_name: Option<String>,
    pub org_cnpj: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn new(name: String, email: String, password_hash: String, role: Role) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name,
            email,
            password_hash,
            role,
            email_verified_at: None,
            verify_code_hash: None,
            verify_code_expires_at: None,
            org_name: None,
            org_cnpj: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_verified(&self) -> bool {
        self.email_verified_at.is_some()
    }

    /// Marks the email verified and drops any pending code.
    pub fn mark_verified(&mut self, at: DateTime<Utc>) {
        self.email_verified_at = Some(at);
        self.verify_code_hash = None;
        self.verify_code_expires_at = None;
        self.updated_at = at;
    }
}

/// User as exposed over the API. Never carries credential material.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublicUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub email_verified_at: Option<DateTime<Utc>>,
    pub org_name: Option<String>,
    pub org_cnpj: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for PublicUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role,
            email_verified_at: user.email_verified_at,
            org_name: user.org_name.clone(),
            org_cnpj: user.org_cnpj.clone(),
            created_at: user.created_at,
        }
    }
}
