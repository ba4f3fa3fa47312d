use lazy_static::lazy_static;
use regex::Regex;

use crate::error::{AppError, AppResult};

pub const MIN_PASSWORD_CHARS: usize = 8;
/// Upper bound carried over from bcrypt-era clients.
pub const MAX_PASSWORD_BYTES: usize = 72;

// Local part: dot-separated non-empty atoms. Domain: two or more labels,
// none empty and none starting or ending with '-'.
pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(
            r"^[^@\s.]+(\.[^@\s.]+)*@([^@\s.\-]([^@\s.]*[^@\s.\-])?\.)+[^@\s.\-]([^@\s.]*[^@\s.\-])?$"
        )
        .unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Trims surrounding whitespace, checks the address shape and lowercases the
/// domain. The local part keeps its case.
pub fn normalize_email(raw: &str) -> AppResult<String> {
    let email = raw.trim();
    let parts = email.rsplit_once('@').filter(|_| is_valid_email(email));
    let Some((local, domain)) = parts else {
        return Err(AppError::validation(
            "email",
            "value is not a valid email address",
        ));
    };
    Ok(format!("{}@{}", local, domain.to_lowercase()))
}

pub fn validate_password(password: &str) -> AppResult<()> {
    if password.chars().count() < MIN_PASSWORD_CHARS {
        return Err(AppError::validation(
            "password",
            format!("Password must be at least {} characters long", MIN_PASSWORD_CHARS),
        ));
    }
    if password.len() > MAX_PASSWORD_BYTES {
        return Err(AppError::validation(
            "password",
            format!("Password is too long (max {} bytes)", MAX_PASSWORD_BYTES),
        ));
    }
    Ok(())
}

pub fn validate_page(skip: i64, limit: i64) -> AppResult<()> {
    if skip < 0 {
        return Err(AppError::validation("skip", "must be greater than or equal to 0"));
    }
    if limit < 0 {
        return Err(AppError::validation("limit", "must be greater than or equal to 0"));
    }
    Ok(())
}
