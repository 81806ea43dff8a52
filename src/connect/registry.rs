//! Factory registry
//!
//! Looks up connection factories by provider id or by the API type they build.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

use super::connection::ApiType;
use super::factory::ConnectionFactory;

/// What a registry lookup was keyed on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FactoryLookup {
    ProviderId(String),
    ApiType(ApiType),
}

impl fmt::Display for FactoryLookup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ProviderId(provider_id) => write!(f, "provider '{provider_id}'"),
            Self::ApiType(api_type) => write!(f, "API type '{api_type}'"),
        }
    }
}

/// Error type for registry operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("no connection factory registered for {0}")]
    NoSuchConnectionFactory(FactoryLookup),
    #[error("a connection factory is already registered for {0}")]
    DuplicateConnectionFactory(FactoryLookup),
}

/// Connection factories keyed by provider id and API type.
///
/// Populated at startup and shared read-only behind an `Arc` afterwards.
#[derive(Clone, Default)]
pub struct ConnectionFactoryRegistry {
    by_provider_id: HashMap<String, Arc<dyn ConnectionFactory>>,
    by_api_type: HashMap<ApiType, Arc<dyn ConnectionFactory>>,
}

impl ConnectionFactoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_connection_factory(
        &mut self,
        factory: Arc<dyn ConnectionFactory>,
    ) -> Result<(), RegistryError> {
        let provider_id = factory.provider_id().to_string();
        let api_type = factory.api_type();

        if self.by_provider_id.contains_key(&provider_id) {
            return Err(RegistryError::DuplicateConnectionFactory(
                FactoryLookup::ProviderId(provider_id),
            ));
        }
        if self.by_api_type.contains_key(&api_type) {
            return Err(RegistryError::DuplicateConnectionFactory(
                FactoryLookup::ApiType(api_type),
            ));
        }

        tracing::debug!(provider_id = %provider_id, api_type = %api_type, "Registered connection factory");
        self.by_api_type.insert(api_type, Arc::clone(&factory));
        self.by_provider_id.insert(provider_id, factory);
        Ok(())
    }

    pub fn get_connection_factory(
        &self,
        provider_id: &str,
    ) -> Result<Arc<dyn ConnectionFactory>, RegistryError> {
        self.by_provider_id.get(provider_id).cloned().ok_or_else(|| {
            RegistryError::NoSuchConnectionFactory(FactoryLookup::ProviderId(
                provider_id.to_string(),
            ))
        })
    }

    pub fn get_connection_factory_by_api(
        &self,
        api_type: ApiType,
    ) -> Result<Arc<dyn ConnectionFactory>, RegistryError> {
        self.by_api_type
            .get(&api_type)
            .cloned()
            .ok_or(RegistryError::NoSuchConnectionFactory(
                FactoryLookup::ApiType(api_type),
            ))
    }

    pub fn get_connection_factory_for<A: 'static>(
        &self,
    ) -> Result<Arc<dyn ConnectionFactory>, RegistryError> {
        self.get_connection_factory_by_api(ApiType::of::<A>())
    }

    /// Registered provider ids in sorted order.
    pub fn registered_provider_ids(&self) -> BTreeSet<String> {
        self.by_provider_id.keys().cloned().collect()
    }
}
