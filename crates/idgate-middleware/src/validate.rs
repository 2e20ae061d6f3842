//! Field rules for user-mutation bodies.
//!
//! Wire `email` is the login "username" and wire `username` is the display
//! "name"; messages use the product labels. Lengths count Unicode scalar
//! values.

use idgate_core::{GatewayError, GatewayResult};

/// Shortest accepted login username.
pub const USERNAME_MIN_LEN: usize = 3;
/// Longest accepted login username.
pub const USERNAME_MAX_LEN: usize = 100;
/// Shortest accepted password.
pub const PASSWORD_MIN_LEN: usize = 8;
/// Longest accepted password.
pub const PASSWORD_MAX_LEN: usize = 64;
/// Longest accepted display name.
pub const NAME_MAX_LEN: usize = 100;

/// Checks a login username (wire `email`).
pub fn validate_username(value: &str) -> GatewayResult<()> {
    if value.chars().any(char::is_whitespace) {
        return Err(GatewayError::validation("username cannot contain white spaces"));
    }
    check_length("username", value, USERNAME_MIN_LEN, USERNAME_MAX_LEN)
}

/// Checks a plaintext password (wire `hash` / `newHash`).
pub fn validate_password(value: &str) -> GatewayResult<()> {
    if value.chars().any(char::is_whitespace) {
        return Err(GatewayError::validation("password cannot contain white spaces"));
    }
    check_length("password", value, PASSWORD_MIN_LEN, PASSWORD_MAX_LEN)
}

/// Checks a display name (wire `username` / `newUsername`).
pub fn validate_name(value: &str) -> GatewayResult<()> {
    check_length("name", value, 0, NAME_MAX_LEN)
}

fn check_length(label: &str, value: &str, min: usize, max: usize) -> GatewayResult<()> {
    let len = value.chars().count();
    if len < min {
        return Err(GatewayError::validation(format!(
            "invalid {label}, must be at least {min} characters"
        )));
    }
    if len > max {
        return Err(GatewayError::validation(format!(
            "invalid {label}, must be at most {max} characters"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn message(result: GatewayResult<()>) -> String {
        match result {
            Err(GatewayError::Validation { message }) => message,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_username_rules() {
        assert!(validate_username("bob").is_ok());
        assert!(validate_username(&"a".repeat(100)).is_ok());
        assert_eq!(
            message(validate_username("ab")),
            "invalid username, must be at least 3 characters"
        );
        assert_eq!(
            message(validate_username(&"a".repeat(101))),
            "invalid username, must be at most 100 characters"
        );
        assert_eq!(
            message(validate_username("bob smith")),
            "username cannot contain white spaces"
        );
    }

    #[test]
    fn test_password_rules() {
        assert!(validate_password("12345678").is_ok());
        assert!(validate_password(&"p".repeat(64)).is_ok());
        assert_eq!(
            message(validate_password("short")),
            "invalid password, must be at least 8 characters"
        );
        assert_eq!(
            message(validate_password(&"p".repeat(65))),
            "invalid password, must be at most 64 characters"
        );
        assert_eq!(
            message(validate_password("pass\tword")),
            "password cannot contain white spaces"
        );
    }

    #[test]
    fn test_whitespace_checked_before_length() {
        assert_eq!(
            message(validate_password("a b")),
            "password cannot contain white spaces"
        );
    }

    #[test]
    fn test_name_rules() {
        assert!(validate_name("").is_ok());
        assert!(validate_name("Alice Smith").is_ok());
        assert_eq!(
            message(validate_name(&"n".repeat(101))),
            "invalid name, must be at most 100 characters"
        );
    }

    #[test]
    fn test_lengths_count_characters() {
        // 8 characters, 16 bytes
        assert!(validate_password("éééééééé").is_ok());
        // 3 characters, 9 bytes
        assert!(validate_username("日本語").is_ok());
        assert!(validate_password(&"é".repeat(65)).is_err());
    }

    proptest! {
        #[test]
        fn prop_password_length_bounds(password in "[!-~]{0,80}") {
            let len = password.chars().count();
            let accepted = validate_password(&password).is_ok();
            prop_assert_eq!(accepted, (PASSWORD_MIN_LEN..=PASSWORD_MAX_LEN).contains(&len));
        }

        #[test]
        fn prop_whitespace_always_rejected(
            head in "[a-z]{4,20}",
            ws in prop::sample::select(vec![' ', '\t', '\n', '\u{a0}']),
            tail in "[a-z]{4,20}",
        ) {
            let value = format!("{head}{ws}{tail}");
            prop_assert!(validate_password(&value).is_err());
            prop_assert!(validate_username(&value).is_err());
        }
    }
}
