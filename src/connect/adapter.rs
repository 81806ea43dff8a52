//! Bridges a provider-specific API client to the generic connection model.

use async_trait::async_trait;

use super::data::{ConnectionValues, UserProfile};
use crate::error::ProviderError;

/// Provider-specific knowledge about an API client of type `A`.
#[async_trait]
pub trait ApiAdapter<A>: Send + Sync + 'static
where
    A: Send + Sync + 'static,
{
    /// Whether the client's credentials are currently accepted. Never fails.
    async fn test(&self, api: &A) -> bool;

    /// Fills in the account id and display values for a connection.
    async fn set_connection_values(
        &self,
        api: &A,
        values: &mut ConnectionValues,
    ) -> Result<(), ProviderError>;

    async fn fetch_user_profile(&self, api: &A) -> Result<UserProfile, ProviderError>;

    async fn update_status(&self, api: &A, message: &str) -> Result<(), ProviderError>;
}
