//! Federated identity verification (Google Sign-In).
//!
//! The verifier takes the opaque ID-token credential posted by the client and
//! returns the verified email, display name and picture URL, or an error.

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

/// Google's token introspection endpoint. It checks signature and expiry.
pub const GOOGLE_TOKENINFO_URL: &str = "https://oauth2.googleapis.com/tokeninfo";

/// Issuers Google uses for ID tokens.
const GOOGLE_ISSUERS: [&str; 2] = ["accounts.google.com", "https://accounts.google.com"];

/// Federated verification errors.
#[derive(Debug, Error)]
pub enum FederatedError {
    #[error("Credential rejected: {0}")]
    Rejected(String),

    #[error("Identity provider unreachable: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Identity asserted by a trusted provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FederatedIdentity {
    pub email: String,
    pub name: Option<String>,
    pub picture: Option<String>,
}

/// Verifies a third-party identity assertion for an expected audience.
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    async fn verify(
        &self,
        credential: &str,
        audience: &str,
    ) -> Result<FederatedIdentity, FederatedError>;
}

/// Subset of the tokeninfo response we rely on.
#[derive(Debug, Deserialize)]
struct TokenInfo {
    iss: Option<String>,
    aud: Option<String>,
    email: Option<String>,
    /// Google returns this as the string `"true"`; accept a bool too.
    #[serde(default)]
    email_verified: Option<serde_json::Value>,
    name: Option<String>,
    picture: Option<String>,
}

impl TokenInfo {
    fn email_is_verified(&self) -> bool {
        match &self.email_verified {
            Some(serde_json::Value::Bool(b)) => *b,
            Some(serde_json::Value::String(s)) => s == "true",
            _ => false,
        }
    }

    fn into_identity(self, audience: &str) -> Result<FederatedIdentity, FederatedError> {
        if self.aud.as_deref() != Some(audience) {
            return Err(FederatedError::Rejected("audience mismatch".into()));
        }
        if !self
            .iss
            .as_deref()
            .is_some_and(|iss| GOOGLE_ISSUERS.contains(&iss))
        {
            return Err(FederatedError::Rejected("unexpected issuer".into()));
        }
        if !self.email_is_verified() {
            return Err(FederatedError::Rejected("email not verified".into()));
        }
        let email = self
            .email
            .filter(|e| !e.is_empty())
            .ok_or_else(|| FederatedError::Rejected("no email in credential".into()))?;
        Ok(FederatedIdentity {
            email,
            name: self.name,
            picture: self.picture,
        })
    }
}

/// Verifies Google ID tokens through the tokeninfo endpoint.
#[derive(Debug, Clone)]
pub struct GoogleIdentityVerifier {
    client: reqwest::Client,
    tokeninfo_url: String,
}

impl GoogleIdentityVerifier {
    pub fn new(client: reqwest::Client) -> Self {
        Self::with_endpoint(client, GOOGLE_TOKENINFO_URL)
    }

    /// Use a different tokeninfo endpoint (e.g. a local mock).
    pub fn with_endpoint(client: reqwest::Client, tokeninfo_url: impl Into<String>) -> Self {
        Self {
            client,
            tokeninfo_url: tokeninfo_url.into(),
        }
    }
}

#[async_trait]
impl IdentityVerifier for GoogleIdentityVerifier {
    async fn verify(
        &self,
        credential: &str,
        audience: &str,
    ) -> Result<FederatedIdentity, FederatedError> {
        if credential.is_empty() {
            return Err(FederatedError::Rejected("empty credential".into()));
        }
        let resp = self
            .client
            .get(&self.tokeninfo_url)
            .query(&[("id_token", credential)])
            .send()
            .await?;
        if !resp.status().is_success() {
            debug!(status = %resp.status(), "tokeninfo rejected credential");
            return Err(FederatedError::Rejected(format!(
                "provider returned {}",
                resp.status()
            )));
        }
        let info: TokenInfo = resp.json().await?;
        info.into_identity(audience)
    }
}
