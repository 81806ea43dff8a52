//! Connection model
//!
//! - [`key`] / [`data`]: identity and snapshots of a provider account link
//! - [`connection`]: live connection wrapping a type-erased API client
//! - [`adapter`] / [`service_provider`]: provider integration points
//! - [`factory`] / [`registry`]: building connections and looking factories up

pub mod adapter;
pub mod connection;
pub mod data;
pub mod factory;
pub mod key;
pub mod registry;
pub mod service_provider;

pub use adapter::ApiAdapter;
pub use connection::{ApiBinding, ApiType, Connection, RefreshedBinding};
pub use data::{ConnectionData, ConnectionValues, UserProfile};
pub use factory::{ConnectionFactory, OAuth1ConnectionFactory, OAuth2ConnectionFactory};
pub use key::ConnectionKey;
pub use registry::{ConnectionFactoryRegistry, FactoryLookup, RegistryError};
pub use service_provider::{
    AccessGrant, OAuth1ServiceProvider, OAuth2Operations, OAuth2ServiceProvider, OAuthToken,
};
