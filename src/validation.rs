//! Stateless request checks run before any persistence work.

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::{Map, Value};

pub const PASSWORD_MIN_LEN: usize = 8;
pub const PASSWORD_MAX_LEN: usize = 128;
pub const NAME_MAX_LEN: usize = 50;
pub const EMAIL_MAX_LEN: usize = 254;

/// Fields only the server may set. Rejected on create.
pub const SERVER_FIELDS: &[&str] = &[
    "id",
    "accountCreated",
    "accountUpdated",
    "account_created",
    "account_updated",
    "token",
    "tokenExpiry",
    "isVerified",
    "verificationToken",
    "verificationTokenExpiry",
];

/// Fields that may never change after creation.
pub const IMMUTABLE_ON_UPDATE: &[&str] = &[
    "accountCreated",
    "accountUpdated",
    "account_created",
    "account_updated",
    "email",
];

pub const UPDATABLE_FIELDS: &[&str] = &["firstName", "lastName", "password"];

/// First violated password rule, or `Ok(())`.
pub fn validate_password(raw: &str) -> Result<(), String> {
    if raw.trim().is_empty() {
        return Err("Password cannot be empty.".into());
    }

    let len = raw.chars().count();
    if !(PASSWORD_MIN_LEN..=PASSWORD_MAX_LEN).contains(&len) {
        return Err(format!(
            "Password must be between {PASSWORD_MIN_LEN} and {PASSWORD_MAX_LEN} characters."
        ));
    }
    if !raw.chars().any(char::is_uppercase) {
        return Err("Password must contain at least one uppercase letter.".into());
    }
    if !raw.chars().any(char::is_lowercase) {
        return Err("Password must contain at least one lowercase letter.".into());
    }
    if !raw.chars().any(|c| c.is_ascii_digit()) {
        return Err("Password must contain at least one number.".into());
    }
    if !raw.chars().any(|c| !c.is_alphanumeric()) {
        return Err("Password must contain at least one special character.".into());
    }
    Ok(())
}

/// Fails naming every key of `payload` found in `protected`.
pub fn check_immutable(payload: &Map<String, Value>, protected: &[&str]) -> Result<(), String> {
    let offending: Vec<&str> = payload
        .keys()
        .map(String::as_str)
        .filter(|k| protected.contains(k))
        .collect();
    if offending.is_empty() {
        Ok(())
    } else {
        Err(format!(
            "The following fields cannot be set: {}",
            offending.join(", ")
        ))
    }
}

/// Fails naming every key of `payload` not found in `allowed`.
pub fn check_allowed(payload: &Map<String, Value>, allowed: &[&str]) -> Result<(), String> {
    let offending: Vec<&str> = payload
        .keys()
        .map(String::as_str)
        .filter(|k| !allowed.contains(k))
        .collect();
    if offending.is_empty() {
        Ok(())
    } else {
        Err(format!(
            "Only {} can be updated; rejected: {}",
            allowed.join(", "),
            offending.join(", ")
        ))
    }
}

/// Fails naming every key of `payload` whose value is not a JSON string.
pub fn check_string_values(payload: &Map<String, Value>) -> Result<(), String> {
    let offending: Vec<&str> = payload
        .iter()
        .filter(|(_, v)| !v.is_string())
        .map(|(k, _)| k.as_str())
        .collect();
    if offending.is_empty() {
        Ok(())
    } else {
        Err(format!("Values must be strings: {}", offending.join(", ")))
    }
}

pub fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    email.len() <= EMAIL_MAX_LEN && EMAIL_RE.is_match(email)
}

/// `field` is the public name used in the message.
pub fn validate_name(field: &str, value: &str) -> Result<(), String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(format!("{field} cannot be empty."));
    }
    if trimmed.chars().count() > NAME_MAX_LEN {
        return Err(format!("{field} must be at most {NAME_MAX_LEN} characters."));
    }
    if !trimmed
        .chars()
        .all(|c| c.is_alphabetic() || matches!(c, ' ' | '-' | '\'' | '.'))
    {
        return Err(format!(
            "{field} may only contain letters, spaces, hyphens, apostrophes and periods."
        ));
    }
    Ok(())
}
