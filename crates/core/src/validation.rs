//! Input validation utilities.
//!
//! This module contains functions for validating user inputs to ensure they meet
//! safety and correctness requirements before being used in operations.

use crate::{CoreError, CoreResult};

/// Oldest age accepted on a clinical form.
pub const MAX_AGE_YEARS: u32 = 130;

/// Longest chest-pain duration accepted on a clinical form (one week, in minutes).
pub const MAX_CHEST_PAIN_MINUTES: u32 = 7 * 24 * 60;

/// Highest troponin value accepted on a clinical form, in ng/mL.
pub const MAX_TROPONIN_NG_ML: f64 = 1_000.0;

/// Validates that a backend base URL is usable for building request URLs.
///
/// # Errors
///
/// Returns a `CoreError::InvalidInput` if the URL is empty, does not use an `http`/`https`
/// scheme, or contains whitespace.
pub fn validate_backend_url(url: &str) -> CoreResult<()> {
    if url.trim().is_empty() {
        return Err(CoreError::InvalidInput("backend URL cannot be empty".into()));
    }

    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(CoreError::InvalidInput(format!(
            "backend URL must start with http:// or https:// (got '{url}')"
        )));
    }

    if url.chars().any(char::is_whitespace) {
        return Err(CoreError::InvalidInput(
            "backend URL must not contain whitespace".into(),
        ));
    }

    Ok(())
}

/// Validates the numeric ranges of a clinical form.
pub fn validate_clinical_ranges(
    age: u32,
    chest_pain_duration: u32,
    troponin_level: f64,
) -> CoreResult<()> {
    if age > MAX_AGE_YEARS {
        return Err(CoreError::InvalidInput(format!(
            "age must be at most {MAX_AGE_YEARS} years"
        )));
    }

    if chest_pain_duration > MAX_CHEST_PAIN_MINUTES {
        return Err(CoreError::InvalidInput(format!(
            "chest pain duration must be at most {MAX_CHEST_PAIN_MINUTES} minutes"
        )));
    }

    if !troponin_level.is_finite() || !(0.0..=MAX_TROPONIN_NG_ML).contains(&troponin_level) {
        return Err(CoreError::InvalidInput(format!(
            "troponin level must be between 0 and {MAX_TROPONIN_NG_ML} ng/mL"
        )));
    }

    Ok(())
}

/// Normalises a risk-factor tag: trimmed, lowercase, spaces and hyphens as underscores.
pub fn normalise_risk_factor(tag: &str) -> Option<String> {
    let tag = tag.trim();
    if tag.is_empty() {
        return None;
    }
    Some(
        tag.to_ascii_lowercase()
            .chars()
            .map(|c| if c == ' ' || c == '-' { '_' } else { c })
            .collect(),
    )
}
