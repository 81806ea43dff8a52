//! Test utilities for database testing.
//!
//! In-memory SQLite with migrations applied, plus stub Twitter (OAuth1) and
//! Facebook (OAuth2) providers registered in a factory registry.

#![allow(dead_code)]

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};

use social_connect::connect::{
    AccessGrant, ApiAdapter, ConnectionData, ConnectionFactoryRegistry, ConnectionValues,
    OAuth1ConnectionFactory, OAuth1ServiceProvider, OAuth2ConnectionFactory, OAuth2Operations,
    OAuth2ServiceProvider, UserProfile,
};
use social_connect::crypto::{TextEncryptor, encryptor};
use social_connect::error::ProviderError;
use social_connect::repositories::{ConnectionRepository, UsersConnectionRepository};

pub const PASSWORD: &str = "password";
pub const SALT: &str = "5c0744940b5c369b";

/// Sets up an in-memory SQLite database with all migrations applied.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = Database::connect("sqlite::memory:").await?;
    Migrator::up(&db, None).await?;
    Ok(db)
}

/// Sets up a file-backed SQLite database in `dir` behind a pool of
/// `max_connections`, for tests that need real concurrent writers.
pub async fn setup_file_db(dir: &std::path::Path, max_connections: u32) -> Result<DatabaseConnection> {
    let url = format!("sqlite://{}?mode=rwc", dir.join("connections.db").display());
    let mut options = ConnectOptions::new(url);
    options.max_connections(max_connections);
    let db = Database::connect(options).await?;
    Migrator::up(&db, None).await?;
    Ok(db)
}

pub async fn setup_test_db_arc() -> Result<Arc<DatabaseConnection>> {
    Ok(Arc::new(setup_test_db().await?))
}

pub fn text_encryptor() -> Arc<dyn TextEncryptor> {
    Arc::new(encryptor::text(PASSWORD, SALT).expect("valid test password and salt"))
}

#[derive(Debug)]
pub struct TwitterApi {
    pub access_token: String,
    pub secret: String,
}

pub struct TwitterProvider;

impl OAuth1ServiceProvider for TwitterProvider {
    type Api = TwitterApi;

    fn consumer_key(&self) -> &str {
        "twitter-consumer"
    }

    fn consumer_secret(&self) -> &str {
        "twitter-consumer-secret"
    }

    fn get_api(&self, access_token: &str, secret: &str) -> TwitterApi {
        TwitterApi {
            access_token: access_token.to_string(),
            secret: secret.to_string(),
        }
    }
}

pub struct TwitterAdapter;

#[async_trait]
impl ApiAdapter<TwitterApi> for TwitterAdapter {
    async fn test(&self, _api: &TwitterApi) -> bool {
        true
    }

    async fn set_connection_values(
        &self,
        api: &TwitterApi,
        values: &mut ConnectionValues,
    ) -> Result<(), ProviderError> {
        values.provider_user_id = Some(api.access_token.clone());
        values.display_name = Some(format!("@{}", api.access_token));
        Ok(())
    }

    async fn fetch_user_profile(&self, api: &TwitterApi) -> Result<UserProfile, ProviderError> {
        Ok(UserProfile {
            username: Some(api.access_token.clone()),
            ..UserProfile::default()
        })
    }

    async fn update_status(&self, _api: &TwitterApi, _message: &str) -> Result<(), ProviderError> {
        Ok(())
    }
}

#[derive(Debug)]
pub struct FacebookApi {
    pub access_token: String,
}

pub struct FacebookOperations;

#[async_trait]
impl OAuth2Operations for FacebookOperations {
    async fn refresh_access(&self, _refresh_token: &str) -> Result<AccessGrant, ProviderError> {
        Ok(AccessGrant::new("renewed-token")
            .with_refresh_token("renewed-refresh")
            .with_expires_in(3600))
    }
}

pub struct FacebookProvider {
    operations: FacebookOperations,
}

impl OAuth2ServiceProvider for FacebookProvider {
    type Api = FacebookApi;

    fn oauth_operations(&self) -> &dyn OAuth2Operations {
        &self.operations
    }

    fn get_api(&self, access_token: &str) -> FacebookApi {
        FacebookApi {
            access_token: access_token.to_string(),
        }
    }
}

pub struct FacebookAdapter;

#[async_trait]
impl ApiAdapter<FacebookApi> for FacebookAdapter {
    async fn test(&self, _api: &FacebookApi) -> bool {
        true
    }

    async fn set_connection_values(
        &self,
        _api: &FacebookApi,
        values: &mut ConnectionValues,
    ) -> Result<(), ProviderError> {
        values.provider_user_id = Some("9".to_string());
        values.display_name = Some("Keith Donald".to_string());
        values.profile_url = Some("https://www.facebook.com/profile.php?id=9".to_string());
        Ok(())
    }

    async fn fetch_user_profile(&self, _api: &FacebookApi) -> Result<UserProfile, ProviderError> {
        Ok(UserProfile::default())
    }

    async fn update_status(&self, _api: &FacebookApi, _message: &str) -> Result<(), ProviderError> {
        Ok(())
    }
}

/// Type with no registered factory.
pub struct LinkedInApi;

pub fn twitter_factory() -> OAuth1ConnectionFactory<TwitterProvider, TwitterAdapter> {
    OAuth1ConnectionFactory::new("twitter", TwitterProvider, TwitterAdapter)
}

pub fn facebook_factory() -> OAuth2ConnectionFactory<FacebookProvider, FacebookAdapter> {
    OAuth2ConnectionFactory::new(
        "facebook",
        FacebookProvider {
            operations: FacebookOperations,
        },
        FacebookAdapter,
    )
}

pub fn registry() -> Arc<ConnectionFactoryRegistry> {
    let mut registry = ConnectionFactoryRegistry::new();
    registry
        .add_connection_factory(Arc::new(twitter_factory()))
        .expect("twitter registers");
    registry
        .add_connection_factory(Arc::new(facebook_factory()))
        .expect("facebook registers");
    Arc::new(registry)
}

pub async fn users_repository() -> Result<UsersConnectionRepository> {
    Ok(UsersConnectionRepository::new(
        setup_test_db_arc().await?,
        registry(),
        text_encryptor(),
    ))
}

pub async fn user_repository(user_id: &str) -> Result<(Arc<DatabaseConnection>, ConnectionRepository)> {
    let db = setup_test_db_arc().await?;
    let repository = ConnectionRepository::new(user_id, Arc::clone(&db), registry(), text_encryptor())?;
    Ok((db, repository))
}

pub fn twitter_data(provider_user_id: &str) -> ConnectionData {
    ConnectionData {
        provider_id: "twitter".to_string(),
        provider_user_id: provider_user_id.to_string(),
        display_name: Some(format!("@{provider_user_id}")),
        profile_url: Some(format!("https://twitter.com/{provider_user_id}")),
        image_url: None,
        access_token: format!("{provider_user_id}-access"),
        secret: Some(format!("{provider_user_id}-secret")),
        refresh_token: None,
        expire_time: None,
    }
}

pub fn facebook_data(provider_user_id: &str) -> ConnectionData {
    ConnectionData {
        provider_id: "facebook".to_string(),
        provider_user_id: provider_user_id.to_string(),
        display_name: Some("Keith Donald".to_string()),
        profile_url: None,
        image_url: Some("https://graph.facebook.com/9/picture".to_string()),
        access_token: "fb-access".to_string(),
        secret: None,
        refresh_token: Some("fb-refresh".to_string()),
        expire_time: Some(4_102_444_800_000),
    }
}
