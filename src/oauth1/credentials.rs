//! Consumer and token credentials used to sign a single request.

use super::signing::SigningError;

/// Consumer key/secret plus the optional access token pair.
///
/// Only the access token and its secret outlive a request; they are persisted
/// (encrypted) as part of a connection, never in this form.
#[derive(Clone, PartialEq, Eq)]
pub struct OAuth1Credentials {
    pub consumer_key: String,
    pub consumer_secret: String,
    pub access_token: Option<String>,
    pub token_secret: Option<String>,
}

impl OAuth1Credentials {
    /// Credentials for requests made on behalf of the application only.
    pub fn consumer(consumer_key: impl Into<String>, consumer_secret: impl Into<String>) -> Self {
        Self {
            consumer_key: consumer_key.into(),
            consumer_secret: consumer_secret.into(),
            access_token: None,
            token_secret: None,
        }
    }

    /// Credentials for requests made on behalf of a user.
    pub fn with_token(
        mut self,
        access_token: impl Into<String>,
        token_secret: impl Into<String>,
    ) -> Self {
        self.access_token = Some(access_token.into());
        self.token_secret = Some(token_secret.into());
        self
    }

    /// Fails when the consumer half is missing.
    pub fn validate(&self) -> Result<(), SigningError> {
        if self.consumer_key.is_empty() {
            return Err(SigningError::InvalidCredentials {
                reason: "consumer key is empty",
            });
        }
        if self.consumer_secret.is_empty() {
            return Err(SigningError::InvalidCredentials {
                reason: "consumer secret is empty",
            });
        }
        Ok(())
    }
}

impl std::fmt::Debug for OAuth1Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuth1Credentials")
            .field("consumer_key", &self.consumer_key)
            .field("consumer_secret", &"[REDACTED]")
            .field("access_token", &self.access_token)
            .field("token_secret", &self.token_secret.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}
