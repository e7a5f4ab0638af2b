//! Field-level input checks that collect every problem before failing.

use thiserror::Error;

use super::error::{AppError, FieldIssue};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid input ({} issue(s))", .0.len())]
pub struct ValidationIssues(pub Vec<FieldIssue>);

impl From<ValidationIssues> for AppError {
    fn from(issues: ValidationIssues) -> Self {
        AppError::invalid_fields(issues.0)
    }
}

#[derive(Debug, Default)]
pub struct Validator {
    issues: Vec<FieldIssue>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn check(&mut self, ok: bool, field: &str, message: &str) -> &mut Self {
        if !ok {
            self.issues.push(FieldIssue {
                field: field.to_string(),
                message: message.to_string(),
            });
        }
        self
    }

    pub fn min_chars(&mut self, field: &str, value: &str, min: usize) -> &mut Self {
        let ok = value.trim().chars().count() >= min;
        self.check(ok, field, &format!("must be at least {min} characters"))
    }

    pub fn email(&mut self, field: &str, value: &str) -> &mut Self {
        self.check(
            is_plausible_email(value),
            field,
            "must be a valid email address",
        )
    }

    pub fn finish(&mut self) -> Result<(), ValidationIssues> {
        if self.issues.is_empty() {
            Ok(())
        } else {
            Err(ValidationIssues(std::mem::take(&mut self.issues)))
        }
    }
}

/// Cheap syntactic check: one `@`, a non-empty local part and a dotted domain.
pub fn is_plausible_email(value: &str) -> bool {
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && !value.chars().any(char::is_whitespace)
        && domain.contains('.')
        && domain.split('.').all(|part| !part.is_empty())
}

pub fn normalize_email(value: &str) -> String {
    value.trim().to_lowercase()
}
