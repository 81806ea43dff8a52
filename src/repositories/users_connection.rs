//! Cross-user connection lookups
//!
//! Answers "which local users are linked to this provider account", e.g. while
//! completing a provider sign-in, and hands out per-user repositories.

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, QuerySelect};

use super::connection::ConnectionRepository;
use crate::connect::{Connection, ConnectionFactoryRegistry};
use crate::crypto::TextEncryptor;
use crate::error::ConnectError;
use crate::models::user_connection::{self, Entity as UserConnection};

/// Creates a local user for a provider account nobody is linked to yet.
#[async_trait]
pub trait ConnectionSignUp: Send + Sync {
    /// The new local user id, or `None` to decline the sign-up.
    async fn execute(&self, connection: &Connection) -> Option<String>;
}

/// Repository spanning all users' connections
#[derive(Clone)]
pub struct UsersConnectionRepository {
    db: Arc<DatabaseConnection>,
    registry: Arc<ConnectionFactoryRegistry>,
    encryptor: Arc<dyn TextEncryptor>,
    connection_sign_up: Option<Arc<dyn ConnectionSignUp>>,
}

impl UsersConnectionRepository {
    pub fn new(
        db: Arc<DatabaseConnection>,
        registry: Arc<ConnectionFactoryRegistry>,
        encryptor: Arc<dyn TextEncryptor>,
    ) -> Self {
        Self {
            db,
            registry,
            encryptor,
            connection_sign_up: None,
        }
    }

    pub fn with_connection_sign_up(mut self, connection_sign_up: Arc<dyn ConnectionSignUp>) -> Self {
        self.connection_sign_up = Some(connection_sign_up);
        self
    }

    pub fn registry(&self) -> &Arc<ConnectionFactoryRegistry> {
        &self.registry
    }

    /// Local users linked to the connection's provider account, ascending.
    ///
    /// When nobody is linked and a sign-up hook is configured, the hook may
    /// create a user; the connection is then stored for that user.
    pub async fn find_user_ids_with_connection(
        &self,
        connection: &Connection,
    ) -> Result<Vec<String>, ConnectError> {
        let key = connection.key();
        let user_ids: Vec<String> = UserConnection::find()
            .select_only()
            .column(user_connection::Column::UserId)
            .filter(user_connection::Column::ProviderId.eq(key.provider_id()))
            .filter(user_connection::Column::ProviderUserId.eq(key.provider_user_id()))
            .order_by_asc(user_connection::Column::UserId)
            .into_tuple()
            .all(&*self.db)
            .await?;

        if !user_ids.is_empty() {
            return Ok(user_ids);
        }

        let Some(sign_up) = &self.connection_sign_up else {
            return Ok(user_ids);
        };
        let Some(new_user_id) = sign_up.execute(connection).await else {
            tracing::debug!(
                provider_id = %key.provider_id(),
                "Connection sign-up declined"
            );
            return Ok(user_ids);
        };

        self.create_connection_repository(&new_user_id)?
            .add_connection(connection)
            .await?;
        tracing::info!(
            user_id = %new_user_id,
            provider_id = %key.provider_id(),
            "Signed up new user from connection"
        );
        Ok(vec![new_user_id])
    }

    /// Local users connected to any of `provider_user_ids` at `provider_id`.
    pub async fn find_user_ids_connected_to(
        &self,
        provider_id: &str,
        provider_user_ids: &HashSet<String>,
    ) -> Result<BTreeSet<String>, ConnectError> {
        if provider_user_ids.is_empty() {
            return Ok(BTreeSet::new());
        }

        let user_ids: Vec<String> = UserConnection::find()
            .select_only()
            .column(user_connection::Column::UserId)
            .distinct()
            .filter(user_connection::Column::ProviderId.eq(provider_id))
            .filter(user_connection::Column::ProviderUserId.is_in(provider_user_ids.iter().cloned()))
            .into_tuple()
            .all(&*self.db)
            .await?;

        Ok(user_ids.into_iter().collect())
    }

    pub fn create_connection_repository(
        &self,
        user_id: &str,
    ) -> Result<ConnectionRepository, ConnectError> {
        ConnectionRepository::new(
            user_id,
            Arc::clone(&self.db),
            Arc::clone(&self.registry),
            Arc::clone(&self.encryptor),
        )
    }
}
