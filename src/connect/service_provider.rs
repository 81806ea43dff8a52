//! Service provider abstractions and the credentials they hand out.

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;
use crate::oauth1::{OAuth1Credentials, OAuth1RequestSigner};

/// OAuth1 access token and its secret.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuthToken {
    pub value: String,
    pub secret: String,
}

impl OAuthToken {
    pub fn new(value: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            secret: secret.into(),
        }
    }
}

impl std::fmt::Debug for OAuthToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthToken").finish_non_exhaustive()
    }
}

/// OAuth2 access grant as returned by a token endpoint.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessGrant {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Epoch milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expire_time: Option<i64>,
}

impl AccessGrant {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            scope: None,
            refresh_token: None,
            expire_time: None,
        }
    }

    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    pub fn with_refresh_token(mut self, refresh_token: impl Into<String>) -> Self {
        self.refresh_token = Some(refresh_token.into());
        self
    }

    /// Sets the expiry `seconds` from now.
    pub fn with_expires_in(mut self, seconds: i64) -> Self {
        let now = Utc::now().timestamp_millis();
        self.expire_time = Some(now.saturating_add(seconds.saturating_mul(1000)));
        self
    }
}

impl std::fmt::Debug for AccessGrant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessGrant")
            .field("scope", &self.scope)
            .field("has_refresh_token", &self.refresh_token.is_some())
            .field("expire_time", &self.expire_time)
            .finish_non_exhaustive()
    }
}

/// Token endpoint operations an OAuth2 provider exposes.
#[async_trait]
pub trait OAuth2Operations: Send + Sync {
    async fn refresh_access(&self, refresh_token: &str) -> Result<AccessGrant, ProviderError>;
}

/// A provider authenticating with OAuth 1.0a.
pub trait OAuth1ServiceProvider: Send + Sync + 'static {
    type Api: Send + Sync + 'static;

    fn consumer_key(&self) -> &str;

    fn consumer_secret(&self) -> &str;

    /// Builds an API client bound to one user's access token.
    fn get_api(&self, access_token: &str, secret: &str) -> Self::Api;

    /// Signer an API client can use to authorize its requests.
    fn request_signer(&self, access_token: &str, secret: &str) -> OAuth1RequestSigner {
        OAuth1RequestSigner::new(
            OAuth1Credentials::consumer(self.consumer_key(), self.consumer_secret())
                .with_token(access_token, secret),
        )
    }
}

/// A provider authenticating with OAuth 2.
pub trait OAuth2ServiceProvider: Send + Sync + 'static {
    type Api: Send + Sync + 'static;

    fn oauth_operations(&self) -> &dyn OAuth2Operations;

    fn get_api(&self, access_token: &str) -> Self::Api;
}
