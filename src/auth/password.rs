/// Password hashing and verification with bcrypt.

use bcrypt::{hash, verify, DEFAULT_COST};
use lazy_static::lazy_static;

use crate::error::AppError;

/// Hash a password with bcrypt at the library's default cost.
///
/// Input validation happens before this point; see `validators`.
pub fn hash_password(password: &str) -> Result<String, AppError> {
    hash(password, DEFAULT_COST)
        .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))
}

/// Verify a password against its hash.
///
/// A mismatch is `Ok(false)`. An error means the stored hash itself is
/// unusable.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, AppError> {
    verify(password, hash)
        .map_err(|e| AppError::Internal(format!("Password verification failed: {}", e)))
}

lazy_static! {
    // Hashed once, at the same cost as real accounts.
    static ref DUMMY_HASH: Option<String> = hash("tchat-no-such-user", DEFAULT_COST).ok();
}

/// Run a full bcrypt verification whose result is thrown away.
///
/// Login calls this for unknown usernames so the miss costs as much as a
/// wrong password.
pub fn verify_against_dummy(password: &str) {
    if let Some(dummy) = DUMMY_HASH.as_deref() {
        let _ = verify(password, dummy);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_password() {
        let password = "secret123";
        let hash = hash_password(password).expect("Failed to hash password");

        assert_ne!(password, hash);
        assert!(hash.starts_with("$2"));
    }

    #[test]
    fn test_hashes_are_salted() {
        let first = hash_password("secret123").unwrap();
        let second = hash_password("secret123").unwrap();

        assert_ne!(first, second);
    }

    #[test]
    fn test_verify_password() {
        let hash = hash_password("secret123").unwrap();

        assert!(verify_password("secret123", &hash).unwrap());
        assert!(!verify_password("wrong", &hash).unwrap());
    }

    #[test]
    fn test_dummy_hash_matches_real_cost() {
        let dummy = DUMMY_HASH.as_deref().expect("dummy hash should be computed");
        let real = hash_password("secret123").unwrap();

        // "$2b$12$": same version and cost, so the same work per verify
        assert_eq!(dummy[..7], real[..7]);
        assert!(!verify_password("secret123", dummy).unwrap());

        verify_against_dummy("secret123");
    }

    #[test]
    fn test_corrupt_hash_is_an_error() {
        assert!(verify_password("secret123", "not-a-bcrypt-hash").is_err());
    }
}
