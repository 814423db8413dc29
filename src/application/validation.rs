use super::{AppError, FieldError};

/// Collects field errors so a request reports all of its problems at once.
#[derive(Debug, Default)]
pub struct Validator {
    errors: Vec<FieldError>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn check(&mut self, ok: bool, field: &str, message: &str) -> &mut Self {
        if !ok {
            self.errors.push(FieldError::new(field, message));
        }
        self
    }

    /// Unwrap a parsed value, recording `message` against `field` when absent.
    pub fn require<T>(&mut self, value: Option<T>, field: &str, message: &str) -> Option<T> {
        if value.is_none() {
            self.errors.push(FieldError::new(field, message));
        }
        value
    }

    pub fn finish(self) -> Result<(), AppError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(self.errors))
        }
    }

    /// Finish validation, yielding `value` when every check passed.
    ///
    /// `value` is expected to come from [`Validator::require`], which already
    /// recorded an error for a missing value.
    pub fn finish_with<T>(self, value: Option<T>) -> Result<T, AppError> {
        self.finish()?;
        value.ok_or(AppError::Validation(Vec::new()))
    }
}

/// Exactly ten ASCII digits.
pub fn is_valid_phone(phone: &str) -> bool {
    phone.len() == 10 && phone.bytes().all(|b| b.is_ascii_digit())
}

/// Loose `local@domain.tld` shape check; deliverability is not our concern.
pub fn is_valid_email(email: &str) -> bool {
    let email = email.trim();
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !email.contains(char::is_whitespace)
        && !domain.contains('@')
        && domain
            .split_once('.')
            .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty() && !tld.ends_with('.'))
}

pub const MIN_PASSWORD_LEN: usize = 6;
