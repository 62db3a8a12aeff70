//! Input validation utilities.
//!
//! Request bodies arrive as loosely-typed strings; these helpers turn them into domain types
//! and report failures against the request field that carried the bad value.

use crate::constants::MIN_PASSWORD_LEN;
use crate::{EmailAddress, HospitalError, HospitalResult, NonEmptyText, RecordId};
use chrono::{NaiveDate, NaiveTime};
use std::str::FromStr;

/// Requires a non-blank value.
pub fn required_text(field: &str, value: &str) -> HospitalResult<NonEmptyText> {
    NonEmptyText::new(value).map_err(|_| HospitalError::validation(field, format!("{field} is required")))
}

/// Trims an optional value, treating blank as absent.
pub fn optional_text(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub fn email(field: &str, value: &str) -> HospitalResult<EmailAddress> {
    if value.trim().is_empty() {
        return Err(HospitalError::validation(field, format!("{field} is required")));
    }
    EmailAddress::parse(value)
        .map_err(|_| HospitalError::validation(field, "Please provide a valid email address"))
}

pub fn record_id(field: &str, value: &str) -> HospitalResult<RecordId> {
    if value.trim().is_empty() {
        return Err(HospitalError::validation(field, format!("{field} is required")));
    }
    RecordId::parse(value.trim())
        .map_err(|_| HospitalError::validation(field, format!("{field} is not a valid id")))
}

/// Parses a `YYYY-MM-DD` calendar date.
pub fn date(field: &str, value: &str) -> HospitalResult<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| HospitalError::validation(field, format!("{field} must be a YYYY-MM-DD date")))
}

/// Parses an `HH:MM` 24-hour slot and returns it normalised to two-digit form.
pub fn time_slot(field: &str, value: &str) -> HospitalResult<(NaiveTime, String)> {
    let time = NaiveTime::parse_from_str(value.trim(), "%H:%M")
        .map_err(|_| HospitalError::validation(field, format!("{field} must be an HH:MM time")))?;
    Ok((time, time.format("%H:%M").to_string()))
}

/// Parses an enum-like field through its `FromStr` implementation.
pub fn choice<T: FromStr>(field: &str, value: &str) -> HospitalResult<T> {
    value
        .trim()
        .parse::<T>()
        .map_err(|_| HospitalError::validation(field, format!("{field} has an unsupported value: {}", value.trim())))
}

pub fn password(field: &str, value: &str) -> HospitalResult<()> {
    if value.chars().count() < MIN_PASSWORD_LEN {
        return Err(HospitalError::validation(
            field,
            format!("Password must be at least {MIN_PASSWORD_LEN} characters"),
        ));
    }
    Ok(())
}

/// Accepts digits with an optional leading `+` and spaces, dashes or parentheses.
pub fn phone(field: &str, value: Option<String>) -> HospitalResult<Option<String>> {
    let Some(value) = optional_text(value) else {
        return Ok(None);
    };

    let digits = value.chars().filter(char::is_ascii_digit).count();
    let allowed = value.chars().enumerate().all(|(i, c)| {
        c.is_ascii_digit() || matches!(c, ' ' | '-' | '(' | ')') || (c == '+' && i == 0)
    });

    if !allowed || !(7..=15).contains(&digits) {
        return Err(HospitalError::validation(
            field,
            "Please provide a valid phone number",
        ));
    }
    Ok(Some(value))
}
