//! Connection repository for database operations
//!
//! [`ConnectionRepository`] is scoped to one local user. Credentials are
//! encrypted before they reach the `user_connection` table and decrypted row by
//! row as connections are rebuilt through the factory registry.

use std::collections::BTreeMap;
use std::sync::Arc;

use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};

use crate::connect::{ApiType, Connection, ConnectionData, ConnectionFactoryRegistry, ConnectionKey};
use crate::crypto::TextEncryptor;
use crate::error::{ConnectError, is_unique_violation};
use crate::models::user_connection::{self, Entity as UserConnection};

const MAX_ADD_ATTEMPTS: u32 = 5;

/// Repository for one user's provider connections
#[derive(Clone)]
pub struct ConnectionRepository {
    user_id: String,
    db: Arc<DatabaseConnection>,
    registry: Arc<ConnectionFactoryRegistry>,
    encryptor: Arc<dyn TextEncryptor>,
}

impl ConnectionRepository {
    /// Fails with `IllegalArgument` when `user_id` is empty.
    pub fn new(
        user_id: impl Into<String>,
        db: Arc<DatabaseConnection>,
        registry: Arc<ConnectionFactoryRegistry>,
        encryptor: Arc<dyn TextEncryptor>,
    ) -> Result<Self, ConnectError> {
        let user_id = user_id.into();
        if user_id.is_empty() {
            return Err(ConnectError::illegal_argument("user id must not be empty"));
        }
        Ok(Self {
            user_id,
            db,
            registry,
            encryptor,
        })
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Every registered provider mapped to this user's connections, rank ascending.
    pub async fn find_all_connections(
        &self,
    ) -> Result<BTreeMap<String, Vec<Connection>>, ConnectError> {
        let rows = UserConnection::find()
            .filter(user_connection::Column::UserId.eq(self.user_id.as_str()))
            .order_by_asc(user_connection::Column::ProviderId)
            .order_by_asc(user_connection::Column::Rank)
            .all(&*self.db)
            .await?;

        let mut connections: BTreeMap<String, Vec<Connection>> = self
            .registry
            .registered_provider_ids()
            .into_iter()
            .map(|provider_id| (provider_id, Vec::new()))
            .collect();

        for row in rows {
            let Some(bucket) = connections.get_mut(&row.provider_id) else {
                return Err(ConnectError::illegal_argument(format!(
                    "no connection factory registered for stored provider '{}'",
                    row.provider_id
                )));
            };
            bucket.push(self.map_row(row)?);
        }

        Ok(connections)
    }

    pub async fn find_connections(&self, provider_id: &str) -> Result<Vec<Connection>, ConnectError> {
        let rows = UserConnection::find()
            .filter(user_connection::Column::UserId.eq(self.user_id.as_str()))
            .filter(user_connection::Column::ProviderId.eq(provider_id))
            .order_by_asc(user_connection::Column::Rank)
            .all(&*self.db)
            .await?;

        rows.into_iter().map(|row| self.map_row(row)).collect()
    }

    pub async fn find_connections_by_api(
        &self,
        api_type: ApiType,
    ) -> Result<Vec<Connection>, ConnectError> {
        let provider_id = self.provider_id_for(api_type)?;
        self.find_connections(&provider_id).await
    }

    pub async fn find_connections_for<A: 'static>(&self) -> Result<Vec<Connection>, ConnectError> {
        self.find_connections_by_api(ApiType::of::<A>()).await
    }

    /// Looks up connections to specific provider accounts.
    ///
    /// Each provider that matched at least one account maps to a vector aligned
    /// with the requested ids, holding `None` where this user is not connected.
    pub async fn find_connections_to_users(
        &self,
        provider_users: &BTreeMap<String, Vec<String>>,
    ) -> Result<BTreeMap<String, Vec<Option<Connection>>>, ConnectError> {
        if provider_users.values().all(|ids| ids.is_empty()) {
            return Err(ConnectError::illegal_argument(
                "unable to execute find: no provider users provided",
            ));
        }

        let mut any_provider = Condition::any();
        for (provider_id, provider_user_ids) in provider_users {
            if provider_user_ids.is_empty() {
                continue;
            }
            any_provider = any_provider.add(
                Condition::all()
                    .add(user_connection::Column::ProviderId.eq(provider_id.as_str()))
                    .add(user_connection::Column::ProviderUserId.is_in(provider_user_ids.iter().cloned())),
            );
        }

        let rows = UserConnection::find()
            .filter(user_connection::Column::UserId.eq(self.user_id.as_str()))
            .filter(any_provider)
            .order_by_asc(user_connection::Column::ProviderId)
            .order_by_asc(user_connection::Column::Rank)
            .all(&*self.db)
            .await?;

        let mut result: BTreeMap<String, Vec<Option<Connection>>> = BTreeMap::new();
        for row in rows {
            let Some(requested) = provider_users.get(&row.provider_id) else {
                continue;
            };
            let indices: Vec<usize> = requested
                .iter()
                .enumerate()
                .filter(|(_, id)| **id == row.provider_user_id)
                .map(|(index, _)| index)
                .collect();
            if indices.is_empty() {
                continue;
            }
            let provider_id = row.provider_id.clone();
            let connection = self.map_row(row)?;
            let slots = result
                .entry(provider_id)
                .or_insert_with(|| vec![None; requested.len()]);
            for index in indices {
                slots[index] = Some(connection.clone());
            }
        }

        Ok(result)
    }

    pub async fn get_connection(&self, key: &ConnectionKey) -> Result<Connection, ConnectError> {
        let row = UserConnection::find_by_id(self.primary_key(key))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ConnectError::NoSuchConnection(key.clone()))?;
        self.map_row(row)
    }

    /// Fails with `NotConnected` when the user has no connection to the
    /// provider at all, `NoSuchConnection` when only this account is missing.
    pub async fn get_connection_by_api(
        &self,
        api_type: ApiType,
        provider_user_id: &str,
    ) -> Result<Connection, ConnectError> {
        let provider_id = self.provider_id_for(api_type)?;
        let key = ConnectionKey::new(&provider_id, provider_user_id);
        match self.get_connection(&key).await {
            Err(ConnectError::NoSuchConnection(key)) => {
                if self.has_connections(&provider_id).await? {
                    Err(ConnectError::NoSuchConnection(key))
                } else {
                    Err(ConnectError::NotConnected(provider_id))
                }
            }
            other => other,
        }
    }

    pub async fn get_connection_for<A: 'static>(
        &self,
        provider_user_id: &str,
    ) -> Result<Connection, ConnectError> {
        self.get_connection_by_api(ApiType::of::<A>(), provider_user_id)
            .await
    }

    /// The lowest-ranked connection to the provider serving `api_type`.
    pub async fn get_primary_connection(&self, api_type: ApiType) -> Result<Connection, ConnectError> {
        let provider_id = self.provider_id_for(api_type)?;
        self.primary_connection(&provider_id)
            .await?
            .ok_or(ConnectError::NotConnected(provider_id))
    }

    pub async fn get_primary_connection_for<A: 'static>(&self) -> Result<Connection, ConnectError> {
        self.get_primary_connection(ApiType::of::<A>()).await
    }

    pub async fn find_primary_connection(
        &self,
        api_type: ApiType,
    ) -> Result<Option<Connection>, ConnectError> {
        let provider_id = self.provider_id_for(api_type)?;
        self.primary_connection(&provider_id).await
    }

    /// Stores a new connection ranked after the user's existing ones for the
    /// same provider.
    ///
    /// The rank is computed under the write lock of the insert transaction. A
    /// rank taken by a concurrent writer is retried; only an existing row with
    /// the same key is reported as a duplicate.
    pub async fn add_connection(&self, connection: &Connection) -> Result<(), ConnectError> {
        let data = connection.create_data();
        let key = connection.key().clone();
        let encrypted = self.encrypt_credentials(&data)?;

        for attempt in 1..=MAX_ADD_ATTEMPTS {
            match self.insert_ranked(&key, &data, &encrypted).await? {
                InsertOutcome::Inserted { rank } => {
                    tracing::debug!(
                        user_id = %self.user_id,
                        provider_id = %key.provider_id(),
                        provider_user_id = %key.provider_user_id(),
                        rank,
                        attempt,
                        "Added connection"
                    );
                    return Ok(());
                }
                InsertOutcome::Duplicate => return Err(ConnectError::DuplicateConnection(key)),
                InsertOutcome::RankTaken => {
                    tracing::warn!(
                        user_id = %self.user_id,
                        provider_id = %key.provider_id(),
                        attempt,
                        "Connection rank taken by a concurrent insert, retrying"
                    );
                }
            }
        }

        Err(ConnectError::RankConflict(key))
    }

    async fn insert_ranked(
        &self,
        key: &ConnectionKey,
        data: &ConnectionData,
        encrypted: &EncryptedCredentials,
    ) -> Result<InsertOutcome, ConnectError> {
        let txn = self.db.begin().await?;

        // Writing first takes SQLite's reserved lock up front and row-locks the
        // provider's existing connections on Postgres.
        UserConnection::update_many()
            .col_expr(
                user_connection::Column::Rank,
                Expr::col(user_connection::Column::Rank).into(),
            )
            .filter(user_connection::Column::UserId.eq(self.user_id.as_str()))
            .filter(user_connection::Column::ProviderId.eq(key.provider_id()))
            .exec(&txn)
            .await?;

        let existing = UserConnection::find_by_id(self.primary_key(key))
            .one(&txn)
            .await?;
        if existing.is_some() {
            txn.rollback().await?;
            return Ok(InsertOutcome::Duplicate);
        }

        let max_rank = UserConnection::find()
            .select_only()
            .column_as(user_connection::Column::Rank.max(), "max_rank")
            .filter(user_connection::Column::UserId.eq(self.user_id.as_str()))
            .filter(user_connection::Column::ProviderId.eq(key.provider_id()))
            .into_tuple::<Option<i32>>()
            .one(&txn)
            .await?
            .flatten();
        let rank = max_rank.unwrap_or(0) + 1;

        let model = user_connection::ActiveModel {
            user_id: Set(self.user_id.clone()),
            provider_id: Set(data.provider_id.clone()),
            provider_user_id: Set(data.provider_user_id.clone()),
            rank: Set(rank),
            display_name: Set(data.display_name.clone()),
            profile_url: Set(data.profile_url.clone()),
            image_url: Set(data.image_url.clone()),
            access_token: Set(encrypted.access_token.clone()),
            secret: Set(encrypted.secret.clone()),
            refresh_token: Set(encrypted.refresh_token.clone()),
            expire_time: Set(data.expire_time),
        };

        if let Err(err) = UserConnection::insert(model)
            .exec_without_returning(&txn)
            .await
        {
            if !is_unique_violation(&err) {
                return Err(err.into());
            }
            txn.rollback().await?;
            // The primary key and the rank index are both unique; only the
            // former means the connection already exists.
            let stored = UserConnection::find_by_id(self.primary_key(key))
                .one(&*self.db)
                .await?;
            return Ok(if stored.is_some() {
                InsertOutcome::Duplicate
            } else {
                InsertOutcome::RankTaken
            });
        }

        txn.commit().await?;
        Ok(InsertOutcome::Inserted { rank })
    }

    /// Overwrites profile values and credentials; key and rank stay as stored.
    pub async fn update_connection(&self, connection: &Connection) -> Result<(), ConnectError> {
        let data = connection.create_data();
        let key = connection.key();
        let encrypted = self.encrypt_credentials(&data)?;

        let existing = UserConnection::find_by_id(self.primary_key(key))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ConnectError::NoSuchConnection(key.clone()))?;

        let mut model: user_connection::ActiveModel = existing.into();
        model.display_name = Set(data.display_name);
        model.profile_url = Set(data.profile_url);
        model.image_url = Set(data.image_url);
        model.access_token = Set(encrypted.access_token);
        model.secret = Set(encrypted.secret);
        model.refresh_token = Set(encrypted.refresh_token);
        model.expire_time = Set(data.expire_time);
        model.update(&*self.db).await?;

        tracing::debug!(
            user_id = %self.user_id,
            provider_id = %key.provider_id(),
            provider_user_id = %key.provider_user_id(),
            "Updated connection"
        );
        Ok(())
    }

    pub async fn remove_connections(&self, provider_id: &str) -> Result<(), ConnectError> {
        let result = UserConnection::delete_many()
            .filter(user_connection::Column::UserId.eq(self.user_id.as_str()))
            .filter(user_connection::Column::ProviderId.eq(provider_id))
            .exec(&*self.db)
            .await?;

        tracing::debug!(
            user_id = %self.user_id,
            provider_id = %provider_id,
            removed = result.rows_affected,
            "Removed connections"
        );
        Ok(())
    }

    pub async fn remove_connection(&self, key: &ConnectionKey) -> Result<(), ConnectError> {
        let result = UserConnection::delete_by_id(self.primary_key(key))
            .exec(&*self.db)
            .await?;

        tracing::debug!(
            user_id = %self.user_id,
            provider_id = %key.provider_id(),
            provider_user_id = %key.provider_user_id(),
            removed = result.rows_affected,
            "Removed connection"
        );
        Ok(())
    }

    async fn primary_connection(&self, provider_id: &str) -> Result<Option<Connection>, ConnectError> {
        UserConnection::find()
            .filter(user_connection::Column::UserId.eq(self.user_id.as_str()))
            .filter(user_connection::Column::ProviderId.eq(provider_id))
            .order_by_asc(user_connection::Column::Rank)
            .one(&*self.db)
            .await?
            .map(|row| self.map_row(row))
            .transpose()
    }

    async fn has_connections(&self, provider_id: &str) -> Result<bool, ConnectError> {
        let row = UserConnection::find()
            .filter(user_connection::Column::UserId.eq(self.user_id.as_str()))
            .filter(user_connection::Column::ProviderId.eq(provider_id))
            .one(&*self.db)
            .await?;
        Ok(row.is_some())
    }

    fn provider_id_for(&self, api_type: ApiType) -> Result<String, ConnectError> {
        let factory = self.registry.get_connection_factory_by_api(api_type)?;
        Ok(factory.provider_id().to_string())
    }

    fn primary_key(&self, key: &ConnectionKey) -> (String, String, String) {
        (
            self.user_id.clone(),
            key.provider_id().to_string(),
            key.provider_user_id().to_string(),
        )
    }

    fn encrypt_credentials(&self, data: &ConnectionData) -> Result<EncryptedCredentials, ConnectError> {
        Ok(EncryptedCredentials {
            access_token: self.encryptor.encrypt(&data.access_token)?,
            secret: self.encrypt_optional(data.secret.as_deref())?,
            refresh_token: self.encrypt_optional(data.refresh_token.as_deref())?,
        })
    }

    fn encrypt_optional(&self, value: Option<&str>) -> Result<Option<String>, ConnectError> {
        Ok(value.map(|value| self.encryptor.encrypt(value)).transpose()?)
    }

    fn decrypt_optional(&self, value: Option<&str>) -> Result<Option<String>, ConnectError> {
        Ok(value.map(|value| self.encryptor.decrypt(value)).transpose()?)
    }

    fn map_row(&self, row: user_connection::Model) -> Result<Connection, ConnectError> {
        let factory = self.registry.get_connection_factory(&row.provider_id)?;

        let access_token = self.encryptor.decrypt(&row.access_token).map_err(|err| {
            tracing::error!(
                user_id = %row.user_id,
                provider_id = %row.provider_id,
                provider_user_id = %row.provider_user_id,
                "Token decryption failed"
            );
            err
        })?;
        let data = ConnectionData {
            access_token,
            secret: self.decrypt_optional(row.secret.as_deref())?,
            refresh_token: self.decrypt_optional(row.refresh_token.as_deref())?,
            provider_id: row.provider_id,
            provider_user_id: row.provider_user_id,
            display_name: row.display_name,
            profile_url: row.profile_url,
            image_url: row.image_url,
            expire_time: row.expire_time,
        };

        Ok(factory.create_connection(data))
    }
}

enum InsertOutcome {
    Inserted { rank: i32 },
    Duplicate,
    RankTaken,
}

struct EncryptedCredentials {
    access_token: String,
    secret: Option<String>,
    refresh_token: Option<String>,
}
