/// Input validators for signup and messaging payloads.
///
/// Every validator trims its input and returns the cleaned value, so callers
/// store exactly what was checked.

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::ValidationError;

const MAX_EMAIL_LENGTH: usize = 254; // RFC 5321
const MAX_USERNAME_LENGTH: usize = 32;
/// bcrypt only looks at the first 72 bytes of its input
const MAX_PASSWORD_BYTES: usize = 72;
const MAX_BIO_LENGTH: usize = 500;
const MAX_MESSAGE_LENGTH: usize = 4096;

lazy_static! {
    // RFC 5322 simplified email regex (practical validation)
    static ref EMAIL_REGEX: Regex = Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)+$"
    ).unwrap();

    static ref USERNAME_REGEX: Regex = Regex::new(r"^[A-Za-z0-9_.-]+$").unwrap();
}

/// Unwrap a required field, treating absent and blank the same way.
pub fn required<'a>(value: Option<&'a str>, field: &str) -> Result<&'a str, ValidationError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ValidationError::EmptyField(field.to_string())),
    }
}

/// Like `required`, but only an empty string counts as blank. For secrets
/// such as passwords, where spaces are significant.
pub fn required_secret<'a>(
    value: Option<&'a str>,
    field: &str,
) -> Result<&'a str, ValidationError> {
    match value {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(ValidationError::EmptyField(field.to_string())),
    }
}

pub fn is_valid_email(email: &str) -> Result<String, ValidationError> {
    let trimmed = email.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::EmptyField("email".to_string()));
    }

    if trimmed.len() > MAX_EMAIL_LENGTH {
        return Err(ValidationError::TooLong("email".to_string(), MAX_EMAIL_LENGTH));
    }

    if !EMAIL_REGEX.is_match(trimmed) {
        return Err(ValidationError::InvalidFormat("email".to_string()));
    }

    // local part is capped at 64 octets
    if let Some(at_pos) = trimmed.find('@') {
        if at_pos > 64 {
            return Err(ValidationError::InvalidFormat("email".to_string()));
        }
    }

    Ok(trimmed.to_string())
}

pub fn is_valid_username(username: &str) -> Result<String, ValidationError> {
    let trimmed = username.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::EmptyField("username".to_string()));
    }

    if trimmed.chars().count() > MAX_USERNAME_LENGTH {
        return Err(ValidationError::TooLong(
            "username".to_string(),
            MAX_USERNAME_LENGTH,
        ));
    }

    if !USERNAME_REGEX.is_match(trimmed) {
        return Err(ValidationError::InvalidFormat("username".to_string()));
    }

    Ok(trimmed.to_string())
}

/// Passwords are not trimmed: whitespace is part of the secret.
pub fn is_valid_password(password: &str) -> Result<&str, ValidationError> {
    if password.is_empty() {
        return Err(ValidationError::EmptyField("password".to_string()));
    }

    if password.len() > MAX_PASSWORD_BYTES {
        return Err(ValidationError::TooLong(
            "password".to_string(),
            MAX_PASSWORD_BYTES,
        ));
    }

    Ok(password)
}

/// Empty bios are stored as absent.
pub fn is_valid_bio(bio: Option<&str>) -> Result<Option<String>, ValidationError> {
    let Some(trimmed) = bio.map(str::trim).filter(|b| !b.is_empty()) else {
        return Ok(None);
    };

    if trimmed.chars().count() > MAX_BIO_LENGTH {
        return Err(ValidationError::TooLong("bio".to_string(), MAX_BIO_LENGTH));
    }

    Ok(Some(trimmed.to_string()))
}

pub fn is_valid_message_body(body: &str) -> Result<String, ValidationError> {
    let trimmed = body.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::EmptyField("body".to_string()));
    }

    if trimmed.chars().count() > MAX_MESSAGE_LENGTH {
        return Err(ValidationError::TooLong("body".to_string(), MAX_MESSAGE_LENGTH));
    }

    Ok(trimmed.to_string())
}
