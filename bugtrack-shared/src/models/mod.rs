/// Database models for Bugtrack
///
/// This module contains the three tracked entities, the rules that govern
/// their fields, and their PostgreSQL CRUD operations.
///
/// # Models
///
/// - `user`: Accounts created from federated identities, with roles
/// - `project`: Collaboration units with a creator and a member set
/// - `bug`: Units of work with creator/assignee relations, comments, and attachments
///
/// # Example
///
/// ```no_run
/// use bugtrack_shared::models::user::{CreateUser, User, UserRole};
/// use bugtrack_shared::db::pool::{create_pool, DatabaseConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
///
/// let user = User::upsert_by_external_id(&pool, CreateUser {
///     external_id: "firebase|abc123".to_string(),
///     email: "dev@example.com".to_string(),
///     name: "dev".to_string(),
///     role: UserRole::Developer,
/// }).await?;
/// # Ok(())
/// # }
/// ```

pub mod bug;
pub mod project;
pub mod user;

use std::str::FromStr;

use serde::{Deserialize, Deserializer};

use crate::error::FieldError;

/// Deserializes a field that distinguishes "absent" from "explicit null"
///
/// Used with `#[serde(default, deserialize_with = "double_option")]`:
/// a missing field stays `None`, `null` becomes `Some(None)`, and a value
/// becomes `Some(Some(value))`.
pub(crate) fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Error returned when a string does not name a variant of a closed vocabulary
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("'{value}' is not one of: {allowed}")]
pub struct UnknownVariant {
    /// The rejected input
    pub value: String,

    /// Comma-separated list of accepted values
    pub allowed: &'static str,
}

/// Parses a closed-vocabulary string field, naming the field on failure
pub(crate) fn parse_variant<T>(field: &str, value: &str) -> Result<T, FieldError>
where
    T: FromStr<Err = UnknownVariant>,
{
    value
        .parse::<T>()
        .map_err(|e| FieldError::new(field, e.to_string()))
}

/// Trims a free-text field, turning blank input into `None`
pub(crate) fn trimmed(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
