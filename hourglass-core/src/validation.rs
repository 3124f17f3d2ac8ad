use crate::error::ValidationError;
use regex::Regex;
use std::sync::LazyLock;

/// Lazy-loaded email validation regex
///
/// A practical subset of RFC 5322, applied after normalization so only
/// lower-case input reaches it in practice.
static EMAIL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
        .expect("Invalid email regex pattern")
});

/// Canonical form of an email address: surrounding whitespace removed and
/// lower-cased.
///
/// Every entry point normalizes before storing or looking up, so `Alice@X.io`
/// and `alice@x.io ` resolve to the same account.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Validates an email address
///
/// # Examples
///
/// ```rust
/// use hourglass_core::validation::validate_email;
///
/// assert!(validate_email("user@example.com").is_ok());
/// assert!(validate_email("invalid-email").is_err());
/// ```
pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    if email.is_empty() {
        return Err(ValidationError::MissingField(
            "Email is required".to_string(),
        ));
    }

    if email.len() > 254 {
        return Err(ValidationError::InvalidEmail(
            "Email is too long".to_string(),
        ));
    }

    if EMAIL_REGEX.is_match(email) {
        Ok(())
    } else {
        Err(ValidationError::InvalidEmail(email.to_string()))
    }
}

/// Validates a password according to security requirements
///
/// - Minimum 8 characters
/// - Maximum 128 characters
/// - Cannot be empty or whitespace only
pub fn validate_password(password: &str) -> Result<(), ValidationError> {
    if password.is_empty() {
        return Err(ValidationError::MissingField(
            "Password is required".to_string(),
        ));
    }

    if password.trim().is_empty() {
        return Err(ValidationError::InvalidPassword(
            "Password cannot be only whitespace".to_string(),
        ));
    }

    let length = password.chars().count();

    if length < 8 {
        return Err(ValidationError::InvalidPassword(
            "Password must be at least 8 characters long".to_string(),
        ));
    }

    if length > 128 {
        return Err(ValidationError::InvalidPassword(
            "Password must be no more than 128 characters long".to_string(),
        ));
    }

    Ok(())
}

/// Validates an optional display name
///
/// If provided it cannot be blank and is limited to 100 characters.
pub fn validate_name(name: Option<&str>) -> Result<(), ValidationError> {
    if let Some(name) = name {
        if name.trim().is_empty() {
            return Err(ValidationError::InvalidName(
                "Name cannot be empty or whitespace only".to_string(),
            ));
        }

        if name.chars().count() > 100 {
            return Err(ValidationError::InvalidName(
                "Name must be no more than 100 characters long".to_string(),
            ));
        }
    }

    Ok(())
}

/// Validates leaderboard paging parameters (`page >= 1`, `1 <= per_page <= 100`)
pub fn validate_pagination(page: u32, per_page: u32) -> Result<(), ValidationError> {
    if page == 0 {
        return Err(ValidationError::InvalidField(
            "page must be at least 1".to_string(),
        ));
    }

    if !(1..=100).contains(&per_page) {
        return Err(ValidationError::InvalidField(
            "per_page must be between 1 and 100".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  Alice@Example.COM "), "alice@example.com");
        assert_eq!(normalize_email("bob@example.com"), "bob@example.com");
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email("user@example.com").is_ok());
        assert!(validate_email("first.last+tag@sub.example.org").is_ok());

        assert!(matches!(
            validate_email(""),
            Err(ValidationError::MissingField(_))
        ));
        assert!(matches!(
            validate_email("invalid-email"),
            Err(ValidationError::InvalidEmail(_))
        ));
        assert!(validate_email("user@").is_err());
        assert!(validate_email("@example.com").is_err());

        let long = format!("{}@example.com", "a".repeat(250));
        assert!(validate_email(&long).is_err());
    }

    #[test]
    fn test_validate_password() {
        assert!(validate_password("securepassword123").is_ok());
        assert!(validate_password("12345678").is_ok());

        assert!(matches!(
            validate_password(""),
            Err(ValidationError::MissingField(_))
        ));
        assert!(validate_password("        ").is_err());
        assert!(validate_password("short").is_err());
        assert!(validate_password(&"a".repeat(129)).is_err());
        assert!(validate_password(&"a".repeat(128)).is_ok());
    }

    #[test]
    fn test_validate_name() {
        assert!(validate_name(None).is_ok());
        assert!(validate_name(Some("Ada Lovelace")).is_ok());
        assert!(validate_name(Some("   ")).is_err());
        assert!(validate_name(Some(&"x".repeat(101))).is_err());
    }

    #[test]
    fn test_validate_pagination() {
        assert!(validate_pagination(1, 10).is_ok());
        assert!(validate_pagination(5, 100).is_ok());
        assert!(validate_pagination(0, 10).is_err());
        assert!(validate_pagination(1, 0).is_err());
        assert!(validate_pagination(1, 101).is_err());
    }
}
