//! Live connections to a provider account.

use std::any::{Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;

use super::data::{ConnectionData, ConnectionValues, UserProfile};
use super::key::ConnectionKey;
use super::service_provider::AccessGrant;
use crate::error::ProviderError;

/// Static tag naming the API client type a connection wraps.
#[derive(Clone, Copy)]
pub struct ApiType {
    id: TypeId,
    name: &'static str,
}

impl ApiType {
    pub fn of<A: 'static>() -> Self {
        Self {
            id: TypeId::of::<A>(),
            name: std::any::type_name::<A>(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for ApiType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ApiType {}

impl Hash for ApiType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for ApiType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ApiType").field(&self.name).finish()
    }
}

impl fmt::Display for ApiType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Client and token state produced by a successful refresh.
pub struct RefreshedBinding {
    pub grant: AccessGrant,
    pub binding: Arc<dyn ApiBinding>,
}

/// Type-erased API client plus the adapter that understands it.
///
/// Implemented by the connection factories; a [`Connection`] only ever talks
/// to its client through this trait.
#[async_trait]
pub trait ApiBinding: Send + Sync {
    fn api_type(&self) -> ApiType;

    fn api(&self) -> &(dyn Any + Send + Sync);

    async fn test(&self) -> bool;

    async fn connection_values(&self) -> Result<ConnectionValues, ProviderError>;

    async fn fetch_user_profile(&self) -> Result<UserProfile, ProviderError>;

    async fn update_status(&self, message: &str) -> Result<(), ProviderError>;

    /// Exchanges `refresh_token` for a new grant. `Ok(None)` means the
    /// provider's protocol has no refresh.
    async fn refresh(&self, refresh_token: &str)
    -> Result<Option<RefreshedBinding>, ProviderError>;
}

/// A user's link to one provider account, with a live API client.
#[derive(Clone)]
pub struct Connection {
    key: ConnectionKey,
    display_name: Option<String>,
    profile_url: Option<String>,
    image_url: Option<String>,
    access_token: String,
    secret: Option<String>,
    refresh_token: Option<String>,
    expire_time: Option<i64>,
    binding: Arc<dyn ApiBinding>,
}

impl Connection {
    pub fn new(data: ConnectionData, binding: Arc<dyn ApiBinding>) -> Self {
        Self {
            key: ConnectionKey::new(data.provider_id, data.provider_user_id),
            display_name: data.display_name,
            profile_url: data.profile_url,
            image_url: data.image_url,
            access_token: data.access_token,
            secret: data.secret,
            refresh_token: data.refresh_token,
            expire_time: data.expire_time,
            binding,
        }
    }

    pub fn key(&self) -> &ConnectionKey {
        &self.key
    }

    pub fn display_name(&self) -> Option<&str> {
        self.display_name.as_deref()
    }

    pub fn profile_url(&self) -> Option<&str> {
        self.profile_url.as_deref()
    }

    pub fn image_url(&self) -> Option<&str> {
        self.image_url.as_deref()
    }

    pub fn expire_time(&self) -> Option<i64> {
        self.expire_time
    }

    pub fn api_type(&self) -> ApiType {
        self.binding.api_type()
    }

    /// The live API client, if it is of type `A`.
    pub fn api<A: 'static>(&self) -> Option<&A> {
        self.binding.api().downcast_ref::<A>()
    }

    pub fn has_expired(&self) -> bool {
        self.expire_time
            .is_some_and(|expire_time| expire_time <= Utc::now().timestamp_millis())
    }

    pub async fn test(&self) -> bool {
        self.binding.test().await
    }

    /// Trades the refresh token for new credentials and rebuilds the client.
    ///
    /// State is only replaced once the provider has answered.
    pub async fn refresh(&mut self) -> Result<(), ProviderError> {
        let not_supported = || ProviderError::RefreshNotSupported {
            provider_id: self.key.provider_id().to_string(),
        };
        let Some(refresh_token) = self.refresh_token.as_deref() else {
            return Err(not_supported());
        };
        let Some(RefreshedBinding { grant, binding }) =
            self.binding.refresh(refresh_token).await?
        else {
            return Err(not_supported());
        };

        self.access_token = grant.access_token;
        if let Some(refresh_token) = grant.refresh_token {
            self.refresh_token = Some(refresh_token);
        }
        self.expire_time = grant.expire_time;
        self.binding = binding;

        tracing::debug!(
            provider_id = %self.key.provider_id(),
            provider_user_id = %self.key.provider_user_id(),
            expire_time = ?self.expire_time,
            "Refreshed connection credentials"
        );
        Ok(())
    }

    /// Re-reads display name and URLs from the provider.
    pub async fn sync(&mut self) -> Result<(), ProviderError> {
        let values = self.binding.connection_values().await?;
        self.display_name = values.display_name;
        self.profile_url = values.profile_url;
        self.image_url = values.image_url;
        Ok(())
    }

    pub async fn fetch_user_profile(&self) -> Result<UserProfile, ProviderError> {
        self.binding.fetch_user_profile().await
    }

    pub async fn update_status(&self, message: &str) -> Result<(), ProviderError> {
        self.binding.update_status(message).await
    }

    pub fn create_data(&self) -> ConnectionData {
        ConnectionData {
            provider_id: self.key.provider_id().to_string(),
            provider_user_id: self.key.provider_user_id().to_string(),
            display_name: self.display_name.clone(),
            profile_url: self.profile_url.clone(),
            image_url: self.image_url.clone(),
            access_token: self.access_token.clone(),
            secret: self.secret.clone(),
            refresh_token: self.refresh_token.clone(),
            expire_time: self.expire_time,
        }
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("key", &self.key)
            .field("api_type", &self.binding.api_type())
            .field("display_name", &self.display_name)
            .field("expire_time", &self.expire_time)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Client(&'static str);

    struct StaticBinding {
        client: Client,
        values: ConnectionValues,
    }

    #[async_trait]
    impl ApiBinding for StaticBinding {
        fn api_type(&self) -> ApiType {
            ApiType::of::<Client>()
        }

        fn api(&self) -> &(dyn Any + Send + Sync) {
            &self.client
        }

        async fn test(&self) -> bool {
            true
        }

        async fn connection_values(&self) -> Result<ConnectionValues, ProviderError> {
            Ok(self.values.clone())
        }

        async fn fetch_user_profile(&self) -> Result<UserProfile, ProviderError> {
            Err(ProviderError::api("profile unavailable"))
        }

        async fn update_status(&self, _message: &str) -> Result<(), ProviderError> {
            Ok(())
        }

        async fn refresh(
            &self,
            _refresh_token: &str,
        ) -> Result<Option<RefreshedBinding>, ProviderError> {
            Ok(None)
        }
    }

    fn data(expire_time: Option<i64>) -> ConnectionData {
        ConnectionData {
            provider_id: "twitter".into(),
            provider_user_id: "1".into(),
            display_name: Some("old".into()),
            profile_url: None,
            image_url: None,
            access_token: "token".into(),
            secret: Some("secret".into()),
            refresh_token: Some("refresh".into()),
            expire_time,
        }
    }

    fn connection(expire_time: Option<i64>) -> Connection {
        let binding = StaticBinding {
            client: Client("v1"),
            values: ConnectionValues {
                provider_user_id: Some("1".into()),
                display_name: Some("new".into()),
                profile_url: Some("https://example.test/1".into()),
                image_url: None,
            },
        };
        Connection::new(data(expire_time), Arc::new(binding))
    }

    #[test]
    fn api_type_equality_follows_type() {
        assert_eq!(ApiType::of::<Client>(), ApiType::of::<Client>());
        assert_ne!(ApiType::of::<Client>(), ApiType::of::<String>());
        assert!(ApiType::of::<Client>().name().ends_with("Client"));
    }

    #[test]
    fn api_downcasts_to_client_type() {
        let connection = connection(None);
        assert_eq!(connection.api::<Client>().map(|c| c.0), Some("v1"));
        assert!(connection.api::<String>().is_none());
    }

    #[test]
    fn expiry_compares_against_now() {
        assert!(!connection(None).has_expired());
        assert!(connection(Some(0)).has_expired());
        let future = Utc::now().timestamp_millis() + 60_000;
        assert!(!connection(Some(future)).has_expired());
    }

    #[test]
    fn create_data_round_trips_snapshot() {
        assert_eq!(connection(Some(5)).create_data(), data(Some(5)));
    }

    #[tokio::test]
    async fn sync_updates_profile_values_only() {
        let mut connection = connection(None);
        connection.sync().await.unwrap();

        assert_eq!(connection.display_name(), Some("new"));
        assert_eq!(connection.profile_url(), Some("https://example.test/1"));
        assert_eq!(connection.key(), &ConnectionKey::new("twitter", "1"));
        assert_eq!(connection.create_data().access_token, "token");
    }

    #[tokio::test]
    async fn refresh_without_protocol_support_fails() {
        let mut connection = connection(None);
        let err = connection.refresh().await.unwrap_err();
        assert_eq!(
            err,
            ProviderError::RefreshNotSupported {
                provider_id: "twitter".into()
            }
        );
        assert_eq!(connection.create_data(), data(None));
    }

    #[tokio::test]
    async fn adapter_errors_propagate() {
        let connection = connection(None);
        assert!(connection.test().await);
        assert!(matches!(
            connection.fetch_user_profile().await,
            Err(ProviderError::Api { .. })
        ));
    }
}
