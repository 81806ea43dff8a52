//! # Repository Layer
//!
//! SeaORM-backed storage of provider connections: [`ConnectionRepository`]
//! for one user, [`UsersConnectionRepository`] for lookups across users.

pub mod connection;
pub mod users_connection;

pub use connection::ConnectionRepository;
pub use users_connection::{ConnectionSignUp, UsersConnectionRepository};
