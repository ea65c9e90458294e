//! Refresh-token session registry.
//!
//! Every outstanding refresh token is recorded (as a SHA-256 digest) in the
//! owning user's record. A token is single-use: consuming it removes it. A
//! signature-valid token that is no longer recorded means it was already
//! used, possibly by someone else, so every session the user holds is wiped.

use sha2::{Digest, Sha256};
use tracing::warn;
use uuid::Uuid;

use super::AuthError;
use super::token::TokenService;
use crate::models::auth::{TokenKind, TokenPair};
use crate::store::UserStore;

/// SHA-256 hex digest of a refresh token, as stored.
pub fn token_digest(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Record a newly issued refresh token against its user.
pub async fn record_issued_refresh_token<S>(
    store: &S,
    user_id: Uuid,
    token: &str,
) -> Result<(), AuthError>
where
    S: UserStore + ?Sized,
{
    store.push_refresh_token(user_id, &token_digest(token)).await?;
    Ok(())
}

/// Consume a refresh token.
///
/// Succeeds at most once per token. When the token is not recorded the
/// user's whole list is cleared before [`AuthError::RefreshTokenReuseDetected`]
/// is returned.
pub async fn consume_refresh_token<S>(
    store: &S,
    user_id: Uuid,
    token: &str,
) -> Result<(), AuthError>
where
    S: UserStore + ?Sized,
{
    if store.take_refresh_token(user_id, &token_digest(token)).await? {
        return Ok(());
    }
    store.clear_refresh_tokens(user_id).await?;
    warn!(%user_id, "refresh token reuse detected; all sessions revoked");
    Err(AuthError::RefreshTokenReuseDetected(user_id))
}

/// Issue an access/refresh pair and record the refresh token.
pub async fn issue_session<S>(
    store: &S,
    tokens: &TokenService,
    user_id: Uuid,
) -> Result<TokenPair, AuthError>
where
    S: UserStore + ?Sized,
{
    let access_token = tokens.issue_token(user_id, TokenKind::Access)?;
    let refresh_token = tokens.issue_token(user_id, TokenKind::Refresh)?;
    record_issued_refresh_token(store, user_id, &refresh_token).await?;
    Ok(TokenPair {
        access_token,
        refresh_token,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::token::TokenConfig;
    use crate::models::auth::NewUser;
    use crate::store::MemoryStore;

    async fn setup() -> (MemoryStore, TokenService, Uuid) {
        let store = MemoryStore::new();
        let user = store
            .create_user(NewUser {
                email: "a@x.com".into(),
                full_name: "A".into(),
                avatar: "uploads/a.png".into(),
                password_hash: None,
            })
            .await
            .unwrap();
        let tokens = TokenService::new(TokenConfig::new("session-secret")).unwrap();
        (store, tokens, user.id)
    }

    #[test]
    fn digest_is_stable_hex() {
        let d = token_digest("abc");
        assert_eq!(d.len(), 64);
        assert_eq!(d, token_digest("abc"));
        assert_ne!(d, token_digest("abd"));
    }

    #[tokio::test]
    async fn issued_refresh_token_is_recorded() {
        let (store, tokens, user_id) = setup().await;
        let pair = issue_session(&store, &tokens, user_id).await.unwrap();
        assert_eq!(
            store.refresh_token_digests(user_id),
            vec![token_digest(&pair.refresh_token)]
        );
        assert!(
            !store
                .refresh_token_digests(user_id)
                .contains(&token_digest(&pair.access_token))
        );
    }

    #[tokio::test]
    async fn consume_is_single_use() {
        let (store, tokens, user_id) = setup().await;
        let pair = issue_session(&store, &tokens, user_id).await.unwrap();

        consume_refresh_token(&store, user_id, &pair.refresh_token)
            .await
            .unwrap();
        let err = consume_refresh_token(&store, user_id, &pair.refresh_token)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::RefreshTokenReuseDetected(id) if id == user_id));
    }

    #[tokio::test]
    async fn reuse_wipes_every_session() {
        let (store, tokens, user_id) = setup().await;
        let first = issue_session(&store, &tokens, user_id).await.unwrap();
        let second = issue_session(&store, &tokens, user_id).await.unwrap();
        assert_eq!(store.refresh_token_digests(user_id).len(), 2);

        consume_refresh_token(&store, user_id, &first.refresh_token)
            .await
            .unwrap();
        assert!(
            consume_refresh_token(&store, user_id, &first.refresh_token)
                .await
                .is_err()
        );

        assert!(store.refresh_token_digests(user_id).is_empty());
        assert!(
            consume_refresh_token(&store, user_id, &second.refresh_token)
                .await
                .is_err()
        );
    }
}
