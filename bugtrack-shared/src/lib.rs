//! # Bugtrack Shared Library
//!
//! This crate contains the domain types, authorization rules, and data-access
//! services used by the Bugtrack API server.
//!
//! ## Module Organization
//!
//! - `models`: Users, projects, and bugs with their ownership rules
//! - `auth`: Credential verification, identity resolution, and authorization policy
//! - `store`: Persistence traits with PostgreSQL and in-memory backends
//! - `service`: The resource access service consumed by HTTP handlers
//! - `db`: PostgreSQL connection pool and migrations
//! - `error`: Service-level error taxonomy

pub mod auth;
pub mod db;
pub mod error;
pub mod models;
pub mod service;
pub mod store;

/// Current version of the Bugtrack shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
