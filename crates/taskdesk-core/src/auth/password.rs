use bcrypt::BcryptError;
use once_cell::sync::Lazy;

use crate::error::{DeskError, Result};

/// Work factor for stored password hashes.
pub const HASH_COST: u32 = 10;

pub fn hash_password(password: &str) -> Result<String> {
    bcrypt::hash(password, HASH_COST)
        .map_err(|e: BcryptError| DeskError::Internal(format!("Failed to hash password: {}", e)))
}

/// Check a password against a stored hash. A malformed hash never matches.
pub fn verify_password(password: &str, hash: &str) -> bool {
    match bcrypt::verify(password, hash) {
        Ok(matches) => matches,
        Err(e) => {
            tracing::warn!(error = %e, "Stored password hash is unreadable");
            false
        }
    }
}

/// Hash checked when a login names no account, so both failures cost one
/// bcrypt verification.
static ABSENT_ACCOUNT_HASH: Lazy<Option<String>> =
    Lazy::new(|| hash_password("absent-account-placeholder").ok());

/// Spend the same work as [`verify_password`] without a stored hash.
/// Always `false`.
pub fn verify_absent_account(password: &str) -> bool {
    if let Some(hash) = ABSENT_ACCOUNT_HASH.as_deref() {
        let _ = verify_password(password, hash);
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_then_verify() {
        let hash = hash_password("correct horse").unwrap();
        assert_ne!(hash, "correct horse");
        assert!(verify_password("correct horse", &hash));
        assert!(!verify_password("battery staple", &hash));
    }

    #[test]
    fn test_garbage_hash_rejects() {
        assert!(!verify_password("anything", "not-a-bcrypt-hash"));
    }

    #[test]
    fn test_absent_account_check_runs_real_verification() {
        let hash = ABSENT_ACCOUNT_HASH.as_deref().unwrap();
        assert!(hash.starts_with("$2"));
        assert!(bcrypt::verify("absent-account-placeholder", hash).unwrap());
        assert!(!verify_absent_account("absent-account-placeholder"));
        assert!(!verify_absent_account("anything"));
    }
}
