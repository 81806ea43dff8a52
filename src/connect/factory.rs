//! Connection factories for OAuth1 and OAuth2 providers.

use std::any::Any;
use std::sync::Arc;

use async_trait::async_trait;

use super::adapter::ApiAdapter;
use super::connection::{ApiBinding, ApiType, Connection, RefreshedBinding};
use super::data::{ConnectionData, ConnectionValues, UserProfile};
use super::service_provider::{AccessGrant, OAuth1ServiceProvider, OAuth2ServiceProvider, OAuthToken};
use crate::error::ProviderError;

/// Rebuilds live connections for one provider.
pub trait ConnectionFactory: Send + Sync {
    fn provider_id(&self) -> &str;

    fn api_type(&self) -> ApiType;

    /// Restores a connection from a stored snapshot.
    fn create_connection(&self, data: ConnectionData) -> Connection;
}

async fn fetch_values<A, D>(adapter: &D, api: &A) -> Result<ConnectionValues, ProviderError>
where
    A: Send + Sync + 'static,
    D: ApiAdapter<A>,
{
    let mut values = ConnectionValues::default();
    adapter.set_connection_values(api, &mut values).await?;
    Ok(values)
}

fn new_connection_data(
    provider_id: &str,
    values: ConnectionValues,
    access_token: String,
) -> Result<ConnectionData, ProviderError> {
    let provider_user_id = values
        .provider_user_id
        .filter(|id| !id.is_empty())
        .ok_or(ProviderError::MissingProviderUserId)?;
    Ok(ConnectionData {
        provider_id: provider_id.to_string(),
        provider_user_id,
        display_name: values.display_name,
        profile_url: values.profile_url,
        image_url: values.image_url,
        access_token,
        secret: None,
        refresh_token: None,
        expire_time: None,
    })
}

struct AdapterBinding<A, D> {
    api: A,
    adapter: Arc<D>,
}

impl<A, D> AdapterBinding<A, D>
where
    A: Send + Sync + 'static,
    D: ApiAdapter<A>,
{
    async fn values(&self) -> Result<ConnectionValues, ProviderError> {
        fetch_values(self.adapter.as_ref(), &self.api).await
    }
}

struct OAuth1Binding<A, D> {
    inner: AdapterBinding<A, D>,
}

#[async_trait]
impl<A, D> ApiBinding for OAuth1Binding<A, D>
where
    A: Send + Sync + 'static,
    D: ApiAdapter<A>,
{
    fn api_type(&self) -> ApiType {
        ApiType::of::<A>()
    }

    fn api(&self) -> &(dyn Any + Send + Sync) {
        &self.inner.api
    }

    async fn test(&self) -> bool {
        self.inner.adapter.test(&self.inner.api).await
    }

    async fn connection_values(&self) -> Result<ConnectionValues, ProviderError> {
        self.inner.values().await
    }

    async fn fetch_user_profile(&self) -> Result<UserProfile, ProviderError> {
        self.inner.adapter.fetch_user_profile(&self.inner.api).await
    }

    async fn update_status(&self, message: &str) -> Result<(), ProviderError> {
        self.inner.adapter.update_status(&self.inner.api, message).await
    }

    async fn refresh(
        &self,
        _refresh_token: &str,
    ) -> Result<Option<RefreshedBinding>, ProviderError> {
        Ok(None)
    }
}

/// Factory for providers speaking OAuth 1.0a.
pub struct OAuth1ConnectionFactory<S, D> {
    provider_id: String,
    service_provider: Arc<S>,
    api_adapter: Arc<D>,
}

impl<S, D> OAuth1ConnectionFactory<S, D>
where
    S: OAuth1ServiceProvider,
    D: ApiAdapter<S::Api>,
{
    pub fn new(provider_id: impl Into<String>, service_provider: S, api_adapter: D) -> Self {
        Self {
            provider_id: provider_id.into(),
            service_provider: Arc::new(service_provider),
            api_adapter: Arc::new(api_adapter),
        }
    }

    pub fn service_provider(&self) -> &S {
        &self.service_provider
    }

    fn bind(&self, access_token: &str, secret: &str) -> OAuth1Binding<S::Api, D> {
        OAuth1Binding {
            inner: AdapterBinding {
                api: self.service_provider.get_api(access_token, secret),
                adapter: Arc::clone(&self.api_adapter),
            },
        }
    }

    /// Creates a new connection once the OAuth1 dance has produced a token.
    pub async fn create_connection_from_token(
        &self,
        token: &OAuthToken,
    ) -> Result<Connection, ProviderError> {
        let binding = self.bind(&token.value, &token.secret);
        let values = binding.inner.values().await?;
        let mut data = new_connection_data(&self.provider_id, values, token.value.clone())?;
        data.secret = Some(token.secret.clone());

        tracing::debug!(
            provider_id = %self.provider_id,
            provider_user_id = %data.provider_user_id,
            "Created OAuth1 connection"
        );
        Ok(Connection::new(data, Arc::new(binding)))
    }
}

impl<S, D> ConnectionFactory for OAuth1ConnectionFactory<S, D>
where
    S: OAuth1ServiceProvider,
    D: ApiAdapter<S::Api>,
{
    fn provider_id(&self) -> &str {
        &self.provider_id
    }

    fn api_type(&self) -> ApiType {
        ApiType::of::<S::Api>()
    }

    fn create_connection(&self, data: ConnectionData) -> Connection {
        let binding = self.bind(&data.access_token, data.secret.as_deref().unwrap_or_default());
        Connection::new(data, Arc::new(binding))
    }
}

struct OAuth2Binding<S: OAuth2ServiceProvider, D> {
    inner: AdapterBinding<S::Api, D>,
    service_provider: Arc<S>,
}

impl<S, D> OAuth2Binding<S, D>
where
    S: OAuth2ServiceProvider,
    D: ApiAdapter<S::Api>,
{
    fn new(service_provider: &Arc<S>, adapter: &Arc<D>, access_token: &str) -> Self {
        Self {
            inner: AdapterBinding {
                api: service_provider.get_api(access_token),
                adapter: Arc::clone(adapter),
            },
            service_provider: Arc::clone(service_provider),
        }
    }
}

#[async_trait]
impl<S, D> ApiBinding for OAuth2Binding<S, D>
where
    S: OAuth2ServiceProvider,
    D: ApiAdapter<S::Api>,
{
    fn api_type(&self) -> ApiType {
        ApiType::of::<S::Api>()
    }

    fn api(&self) -> &(dyn Any + Send + Sync) {
        &self.inner.api
    }

    async fn test(&self) -> bool {
        self.inner.adapter.test(&self.inner.api).await
    }

    async fn connection_values(&self) -> Result<ConnectionValues, ProviderError> {
        self.inner.values().await
    }

    async fn fetch_user_profile(&self) -> Result<UserProfile, ProviderError> {
        self.inner.adapter.fetch_user_profile(&self.inner.api).await
    }

    async fn update_status(&self, message: &str) -> Result<(), ProviderError> {
        self.inner.adapter.update_status(&self.inner.api, message).await
    }

    async fn refresh(
        &self,
        refresh_token: &str,
    ) -> Result<Option<RefreshedBinding>, ProviderError> {
        let grant = self
            .service_provider
            .oauth_operations()
            .refresh_access(refresh_token)
            .await?;
        let binding = Self::new(
            &self.service_provider,
            &self.inner.adapter,
            &grant.access_token,
        );
        Ok(Some(RefreshedBinding {
            grant,
            binding: Arc::new(binding),
        }))
    }
}

/// Factory for providers speaking OAuth 2.
pub struct OAuth2ConnectionFactory<S, D> {
    provider_id: String,
    service_provider: Arc<S>,
    api_adapter: Arc<D>,
}

impl<S, D> OAuth2ConnectionFactory<S, D>
where
    S: OAuth2ServiceProvider,
    D: ApiAdapter<S::Api>,
{
    pub fn new(provider_id: impl Into<String>, service_provider: S, api_adapter: D) -> Self {
        Self {
            provider_id: provider_id.into(),
            service_provider: Arc::new(service_provider),
            api_adapter: Arc::new(api_adapter),
        }
    }

    pub fn service_provider(&self) -> &S {
        &self.service_provider
    }

    /// Creates a new connection from a freshly issued grant.
    pub async fn create_connection_from_grant(
        &self,
        grant: &AccessGrant,
    ) -> Result<Connection, ProviderError> {
        let binding =
            OAuth2Binding::new(&self.service_provider, &self.api_adapter, &grant.access_token);
        let values = binding.inner.values().await?;
        let mut data =
            new_connection_data(&self.provider_id, values, grant.access_token.clone())?;
        data.refresh_token = grant.refresh_token.clone();
        data.expire_time = grant.expire_time;

        tracing::debug!(
            provider_id = %self.provider_id,
            provider_user_id = %data.provider_user_id,
            "Created OAuth2 connection"
        );
        Ok(Connection::new(data, Arc::new(binding)))
    }
}

impl<S, D> ConnectionFactory for OAuth2ConnectionFactory<S, D>
where
    S: OAuth2ServiceProvider,
    D: ApiAdapter<S::Api>,
{
    fn provider_id(&self) -> &str {
        &self.provider_id
    }

    fn api_type(&self) -> ApiType {
        ApiType::of::<S::Api>()
    }

    fn create_connection(&self, data: ConnectionData) -> Connection {
        let binding =
            OAuth2Binding::new(&self.service_provider, &self.api_adapter, &data.access_token);
        Connection::new(data, Arc::new(binding))
    }
}
