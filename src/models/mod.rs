//! # Data Models
//!
//! SeaORM entities backing the connection repositories.

pub mod user_connection;

pub use user_connection::Entity as UserConnection;
