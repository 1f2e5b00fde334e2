//! Input validation shared by the catalog and account services

use once_cell::sync::Lazy;
use regex::Regex;

use crate::db::DELETED_USERNAME_PREFIX;
use crate::error::{AppError, AppResult};

static USERNAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_.\-]{3,32}$").expect("valid username regex"));

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex")
});

pub const MIN_PASSWORD_LEN: usize = 8;

/// Trim a required text field, rejecting blanks
pub fn required_text(field: &str, value: &str) -> AppResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::InvalidInput(format!("{} is required", field)));
    }
    Ok(trimmed.to_string())
}

/// Trim an optional text field; blank becomes `None`
pub fn optional_text(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub fn rating(value: Option<f64>) -> AppResult<Option<f64>> {
    match value {
        Some(r) if !r.is_finite() || !(0.0..=10.0).contains(&r) => Err(AppError::InvalidInput(
            "rating must be between 0 and 10".to_string(),
        )),
        other => Ok(other),
    }
}

pub fn runtime(value: Option<i32>) -> AppResult<Option<i32>> {
    match value {
        Some(r) if r <= 0 => Err(AppError::InvalidInput(
            "runtime must be a positive number of minutes".to_string(),
        )),
        other => Ok(other),
    }
}

/// Trim genres, drop blanks and case-insensitive duplicates, keep order
pub fn genres(values: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    values
        .into_iter()
        .map(|g| g.trim().to_string())
        .filter(|g| !g.is_empty() && seen.insert(g.to_lowercase()))
        .collect()
}

pub fn username(value: &str) -> AppResult<String> {
    let value = value.trim();
    if !USERNAME_RE.is_match(value) {
        return Err(AppError::InvalidInput(
            "username must be 3-32 characters of letters, digits, '_', '.' or '-'".to_string(),
        ));
    }
    if value.to_lowercase().starts_with(DELETED_USERNAME_PREFIX) {
        return Err(AppError::InvalidInput(format!(
            "usernames starting with '{}' are reserved",
            DELETED_USERNAME_PREFIX
        )));
    }
    Ok(value.to_string())
}

pub fn email(value: &str) -> AppResult<String> {
    let value = value.trim();
    if !EMAIL_RE.is_match(value) {
        return Err(AppError::InvalidInput("email address is invalid".to_string()));
    }
    Ok(value.to_string())
}

pub fn password(value: &str) -> AppResult<()> {
    if value.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::InvalidInput(format!(
            "password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_username_rules() {
        assert_eq!(username("  walter.white ").unwrap(), "walter.white");
        assert!(username("ab").is_err());
        assert!(username("has space").is_err());
        assert!(username(&"x".repeat(33)).is_err());
        assert!(username("heisenberg_99-x").is_ok());
    }

    #[test]
    fn test_deleted_prefix_is_reserved() {
        assert_matches!(username("deleted-1a2b3c4d"), Err(AppError::InvalidInput(_)));
        assert_matches!(username("Deleted-someone"), Err(AppError::InvalidInput(_)));
        assert!(username("deleted_scenes").is_ok());
    }

    #[test]
    fn test_email_rules() {
        assert!(email("jesse@example.com").is_ok());
        assert_matches!(email("jesse@"), Err(AppError::InvalidInput(_)));
        assert!(email("no at sign.com").is_err());
    }

    #[test]
    fn test_rating_and_runtime_bounds() {
        assert_eq!(rating(Some(10.0)).unwrap(), Some(10.0));
        assert!(rating(Some(10.1)).is_err());
        assert!(rating(Some(f64::NAN)).is_err());
        assert_eq!(rating(None).unwrap(), None);
        assert!(runtime(Some(0)).is_err());
        assert_eq!(runtime(Some(45)).unwrap(), Some(45));
    }

    #[test]
    fn test_genres_are_normalized() {
        let cleaned = genres(vec![
            " Drama".to_string(),
            "drama".to_string(),
            "".to_string(),
            "Crime ".to_string(),
        ]);
        assert_eq!(cleaned, vec!["Drama", "Crime"]);
    }

    #[test]
    fn test_password_length() {
        assert!(password("short").is_err());
        assert!(password("longenough").is_ok());
    }
}
