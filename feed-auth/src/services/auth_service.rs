use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

use feed_shared::errors::{AppError, ErrorCode};

pub const USERNAME_MAX_LEN: usize = 150;
pub const PASSWORD_MIN_LEN: usize = 8;

pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| AppError::internal(format!("password hashing failed: {e}")))
}

pub fn verify_password(password: &str, hash: &str) -> Result<bool, AppError> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|e| AppError::internal(format!("invalid password hash: {e}")))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

/// Usernames are stored lowercased; allowed characters are letters, digits and `@.+-_`.
pub fn normalize_username(raw: &str) -> Result<String, AppError> {
    let username = raw.trim().to_lowercase();
    if username.is_empty() {
        return Err(AppError::new(ErrorCode::InvalidUsername, "username is required"));
    }
    if username.chars().count() > USERNAME_MAX_LEN {
        return Err(AppError::new(
            ErrorCode::InvalidUsername,
            format!("username must be at most {USERNAME_MAX_LEN} characters"),
        ));
    }
    if !username
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_'))
    {
        return Err(AppError::new(
            ErrorCode::InvalidUsername,
            "username may contain only letters, numbers, and @/./+/-/_ characters",
        ));
    }
    Ok(username)
}

pub fn validate_password(password: &str, username: &str) -> Result<(), AppError> {
    if password.chars().count() < PASSWORD_MIN_LEN {
        return Err(AppError::new(ErrorCode::PasswordTooWeak, "password must be at least 8 characters"));
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(AppError::new(ErrorCode::PasswordTooWeak, "password must contain at least one number"));
    }
    if !password.chars().any(|c| c.is_alphabetic()) {
        return Err(AppError::new(ErrorCode::PasswordTooWeak, "password must contain at least one letter"));
    }
    if !username.is_empty() && password.to_lowercase().contains(username) {
        return Err(AppError::new(ErrorCode::PasswordTooWeak, "password is too similar to the username"));
    }
    Ok(())
}

pub fn confirm_password(password: &str, confirmation: &str) -> Result<(), AppError> {
    if password != confirmation {
        return Err(AppError::new(ErrorCode::PasswordMismatch, "the two password fields didn't match"));
    }
    Ok(())
}

/// Redis key counting login attempts for a username.
pub fn login_attempts_key(username: &str) -> String {
    format!("login_attempts:{username}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify() {
        let hash = hash_password("hunter2hunter").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("hunter2hunter", &hash).unwrap());
        assert!(!verify_password("hunter3hunter", &hash).unwrap());
    }

    #[test]
    fn garbage_hash_is_internal_error() {
        let err = verify_password("whatever1", "not-a-phc-string").unwrap_err();
        assert_eq!(err.error_code(), ErrorCode::InternalError);
    }

    #[test]
    fn username_is_trimmed_and_lowercased() {
        assert_eq!(normalize_username("  Alice.B+feed ").unwrap(), "alice.b+feed");
    }

    #[test]
    fn username_rejects_spaces_and_symbols() {
        assert!(normalize_username("alice bob").is_err());
        assert!(normalize_username("alice!").is_err());
        assert!(normalize_username("   ").is_err());
        assert!(normalize_username(&"a".repeat(151)).is_err());
        assert!(normalize_username(&"a".repeat(150)).is_ok());
    }

    #[test]
    fn password_policy() {
        assert!(validate_password("short1", "alice").is_err());
        assert!(validate_password("12345678", "alice").is_err());
        assert!(validate_password("abcdefgh", "alice").is_err());
        assert!(validate_password("xxalice123", "alice").is_err());
        assert!(validate_password("correct horse 7", "alice").is_ok());
    }

    #[test]
    fn confirmation_must_match() {
        assert!(confirm_password("secret123", "secret123").is_ok());
        let err = confirm_password("secret123", "secret124").unwrap_err();
        assert_eq!(err.error_code(), ErrorCode::PasswordMismatch);
    }
}
