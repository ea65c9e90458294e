//! Password hashing via bcrypt.
//!
//! bcrypt is deliberately slow, so both operations run on the blocking pool
//! instead of stalling the async executor.

use tokio::sync::OnceCell;
use tokio::task;

use super::AuthError;

/// Default bcrypt cost factor.
pub const DEFAULT_BCRYPT_COST: u32 = 10;

/// Hash a password with bcrypt at the given cost.
pub async fn hash_password(password: &str, cost: u32) -> Result<String, AuthError> {
    let password = password.to_owned();
    task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .map_err(|e| AuthError::Internal(format!("bcrypt task: {e}")))?
        .map_err(|e| AuthError::Internal(format!("bcrypt hash: {e}")))
}

/// Verify a password against a bcrypt hash.
pub async fn verify_password(password: &str, hash: &str) -> Result<bool, AuthError> {
    let password = password.to_owned();
    let hash = hash.to_owned();
    task::spawn_blocking(move || bcrypt::verify(password, &hash))
        .await
        .map_err(|e| AuthError::Internal(format!("bcrypt task: {e}")))?
        .map_err(|e| AuthError::Internal(format!("bcrypt verify: {e}")))
}

/// A throwaway hash checked when a login has no stored hash to verify, so
/// that unknown and password-less accounts cost the same bcrypt work as a
/// wrong password.
pub struct DecoyHash {
    cost: u32,
    hash: OnceCell<String>,
}

impl DecoyHash {
    pub fn new(cost: u32) -> Self {
        Self {
            cost,
            hash: OnceCell::new(),
        }
    }

    /// Whether the decoy hash has been computed yet.
    pub fn is_built(&self) -> bool {
        self.hash.initialized()
    }

    /// Run one verification against the decoy. The outcome is discarded.
    pub async fn verify(&self, password: &str) -> Result<(), AuthError> {
        let hash = self
            .hash
            .get_or_try_init(|| hash_password("decoy-password", self.cost))
            .await?;
        verify_password(password, hash).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn hash_then_verify() {
        let hash = hash_password("pw123456", 4).await.unwrap();
        assert_ne!(hash, "pw123456");
        assert!(verify_password("pw123456", &hash).await.unwrap());
        assert!(!verify_password("wrong", &hash).await.unwrap());
    }

    #[tokio::test]
    async fn malformed_hash_is_an_error() {
        assert!(verify_password("pw", "not-a-bcrypt-hash").await.is_err());
    }

    #[tokio::test]
    async fn decoy_hash_is_built_once() {
        let decoy = DecoyHash::new(4);
        assert!(!decoy.is_built());
        decoy.verify("anything").await.unwrap();
        let first = decoy.hash.get().cloned().unwrap();
        decoy.verify("something else").await.unwrap();
        assert_eq!(decoy.hash.get(), Some(&first));
        assert!(first.starts_with("$2"));
    }
}
