//! # Social Connect Library
//!
//! OAuth 1.0a request signing plus an encrypted, multi-provider store of the
//! connections between local users and their external accounts.

pub mod config;
pub mod connect;
pub mod crypto;
pub mod db;
pub mod error;
pub mod models;
pub mod oauth1;
pub mod repositories;
pub mod telemetry;
pub use migration;
