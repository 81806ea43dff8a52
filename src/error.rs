//! Error taxonomy for connection storage and provider calls.

use thiserror::Error;

use crate::connect::key::ConnectionKey;
use crate::connect::registry::RegistryError;
use crate::crypto::CryptoError;

/// Failure reported by a service provider or its API adapter.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProviderError {
    #[error("connection to '{provider_id}' cannot be refreshed")]
    RefreshNotSupported { provider_id: String },
    #[error("provider API call failed: {message}")]
    Api { message: String },
    #[error("provider did not report a user id for the connection")]
    MissingProviderUserId,
}

impl ProviderError {
    pub fn api<S: Into<String>>(message: S) -> Self {
        Self::Api {
            message: message.into(),
        }
    }
}

/// Errors raised by the connection repositories and the factory registry.
#[derive(Debug, Error)]
pub enum ConnectError {
    #[error("connection {0} already exists")]
    DuplicateConnection(ConnectionKey),
    #[error("no connection {0}")]
    NoSuchConnection(ConnectionKey),
    #[error("could not assign a rank to connection {0}: concurrent inserts kept taking it")]
    RankConflict(ConnectionKey),
    #[error("not connected to provider '{0}'")]
    NotConnected(String),
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error("illegal argument: {0}")]
    IllegalArgument(String),
    #[error("credential encryption failed: {0}")]
    Crypto(#[from] CryptoError),
    #[error("database error: {0}")]
    Database(#[from] sea_orm::DbErr),
}

impl ConnectError {
    pub fn illegal_argument<S: Into<String>>(message: S) -> Self {
        Self::IllegalArgument(message.into())
    }

    pub fn is_no_such_connection_factory(&self) -> bool {
        matches!(
            self,
            Self::Registry(RegistryError::NoSuchConnectionFactory(_))
        )
    }

    pub fn is_duplicate_connection_factory(&self) -> bool {
        matches!(
            self,
            Self::Registry(RegistryError::DuplicateConnectionFactory(_))
        )
    }
}

/// Returns true when the database rejected a write because of a unique or
/// primary-key constraint.
pub(crate) fn is_unique_violation(error: &sea_orm::DbErr) -> bool {
    use sea_orm::RuntimeErr;

    const PG_UNIQUE: &str = "23505";
    const MYSQL_DUPLICATE_CODES: &[&str] = &["1022", "1062", "1169", "1586"];
    const SQLITE_DUPLICATE_CODES: &[&str] = &["1555", "2067"];

    let runtime_err = match error {
        sea_orm::DbErr::Query(RuntimeErr::SqlxError(sqlx_err))
        | sea_orm::DbErr::Exec(RuntimeErr::SqlxError(sqlx_err)) => sqlx_err,
        _ => return false,
    };

    let Some(db_error) = runtime_err.as_database_error() else {
        return false;
    };

    if db_error.is_unique_violation() {
        return true;
    }

    db_error.code().is_some_and(|code| {
        let code: &str = code.as_ref();
        code == PG_UNIQUE
            || MYSQL_DUPLICATE_CODES.contains(&code)
            || SQLITE_DUPLICATE_CODES.contains(&code)
    })
}
