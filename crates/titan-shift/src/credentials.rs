//! # Manager PIN Credentials
//!
//! Staff PINs are stored as argon2 PHC strings (`$argon2id$v=19$...`).
//! Verification never reveals whether the staff member has a PIN at all.

use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use titan_core::validation::validate_pin;

use crate::error::{ShiftError, ShiftResult};

/// Hashes a PIN for storage on a staff record.
pub fn hash_pin(pin: &str) -> ShiftResult<String> {
    validate_pin(pin)?;

    // 16 random bytes from a v4 UUID
    let salt = SaltString::encode_b64(uuid::Uuid::new_v4().as_bytes())
        .map_err(|e| ShiftError::Validation(format!("PIN salt: {}", e)))?;

    let hash = Argon2::default()
        .hash_password(pin.as_bytes(), &salt)
        .map_err(|e| ShiftError::Validation(format!("PIN hash: {}", e)))?;

    Ok(hash.to_string())
}

/// Checks a PIN against a stored hash. A malformed hash never verifies.
pub fn verify_pin(pin_hash: &str, pin: &str) -> bool {
    match PasswordHash::new(pin_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(pin.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            tracing::warn!("Stored PIN hash is malformed: {}", e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_pin("4321").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_pin(&hash, "4321"));
        assert!(!verify_pin(&hash, "1234"));
    }

    #[test]
    fn test_bad_pin_format_rejected() {
        assert!(matches!(hash_pin("12a4"), Err(ShiftError::Validation(_))));
        assert!(!verify_pin("not-a-phc-string", "1234"));
    }
}
