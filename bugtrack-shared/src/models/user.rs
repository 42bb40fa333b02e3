/// User model and database operations
///
/// Users are never registered directly. A record is created the first time
/// a federated identity (for example a Firebase subject) authenticates, and
/// looked up by that external subject id on every later request.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE user_role AS ENUM ('developer', 'tester', 'project-manager');
///
/// CREATE TABLE users (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     external_id VARCHAR(255) NOT NULL UNIQUE,
///     email VARCHAR(255) NOT NULL UNIQUE,
///     name VARCHAR(50) NOT NULL,
///     role user_role NOT NULL DEFAULT 'developer',
///     avatar VARCHAR(512) NOT NULL DEFAULT 'default.jpg',
///     is_active BOOLEAN NOT NULL DEFAULT TRUE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// # Roles
///
/// - **developer**: Default role for new accounts
/// - **tester**: Same rights as developer
/// - **project-manager**: Privileged; may update or delete any bug

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use super::UnknownVariant;

/// Maximum length of a user's display name
pub const MAX_NAME_LEN: usize = 50;

/// Roles a user can hold
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum UserRole {
    /// Default role for new accounts
    #[default]
    Developer,

    /// Quality assurance
    Tester,

    /// Privileged role with mutation rights over every bug
    ProjectManager,
}

impl UserRole {
    /// The single role that grants mutation rights over any bug
    pub const PRIVILEGED: UserRole = UserRole::ProjectManager;

    /// Converts role to its wire representation
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Developer => "developer",
            UserRole::Tester => "tester",
            UserRole::ProjectManager => "project-manager",
        }
    }

    /// Whether this role bypasses creator checks on bugs
    pub fn is_privileged(&self) -> bool {
        *self == Self::PRIVILEGED
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserRole {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "developer" => Ok(UserRole::Developer),
            "tester" => Ok(UserRole::Tester),
            "project-manager" => Ok(UserRole::ProjectManager),
            other => Err(UnknownVariant {
                value: other.to_string(),
                allowed: "developer, tester, project-manager",
            }),
        }
    }
}

/// User model representing an account resolved from a federated identity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow, Validate)]
pub struct User {
    /// Unique user ID (UUID v4)
    pub id: Uuid,

    /// Subject id assigned by the external identity provider
    ///
    /// Unique across all users; the lookup key for identity resolution.
    #[serde(skip_serializing, default)]
    pub external_id: String,

    /// Display name
    #[validate(length(min = 1, max = 50, message = "Name must be 1-50 characters"))]
    pub name: String,

    /// Email address (stored lowercase, unique)
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    /// Role governing privileged operations
    pub role: UserRole,

    /// Avatar image reference
    #[validate(length(min = 1, max = 512, message = "Avatar must be 1-512 characters"))]
    pub avatar: String,

    /// Disabled accounts cannot authenticate
    pub is_active: bool,

    /// When the account was created
    pub created_at: DateTime<Utc>,

    /// When the account was last updated
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a user on first login
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateUser {
    /// External subject id
    #[validate(length(min = 1, max = 255, message = "External id must be 1-255 characters"))]
    pub external_id: String,

    /// Email address (lowercased before storage)
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    /// Display name
    #[validate(length(min = 1, max = 50, message = "Name must be 1-50 characters"))]
    pub name: String,

    /// Initial role
    #[serde(default)]
    pub role: UserRole,
}

/// Profile fields a user may change on their own account
///
/// Role, email, and the active flag are not user-editable and are rejected
/// as unknown fields.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateUser {
    pub name: Option<String>,
    pub avatar: Option<String>,
}

impl User {
    /// Builds a new in-memory user record from creation data
    ///
    /// Used by stores that do not generate ids and timestamps themselves.
    pub fn from_create(data: CreateUser) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            external_id: data.external_id,
            name: data.name,
            email: data.email.to_lowercase(),
            role: data.role,
            avatar: "default.jpg".to_string(),
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether this user holds the privileged role
    pub fn is_privileged(&self) -> bool {
        self.role.is_privileged()
    }

    /// Merges a profile patch; blank values are kept so validation rejects them
    pub fn apply(&mut self, changes: UpdateUser) {
        if let Some(name) = changes.name {
            self.name = name.trim().to_string();
        }
        if let Some(avatar) = changes.avatar {
            self.avatar = avatar.trim().to_string();
        }
        self.updated_at = Utc::now();
    }

    /// Inserts a user, or returns the existing one with the same external id
    ///
    /// The conflict arm rewrites `external_id` with its own value so that
    /// `RETURNING` yields the stored row without changing any column.
    /// Concurrent first logins for the same subject therefore converge on a
    /// single record.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The email already belongs to a different external id (unique violation)
    /// - Database connection fails
    pub async fn upsert_by_external_id(pool: &PgPool, data: CreateUser) -> Result<Self, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (external_id, email, name, role)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (external_id) DO UPDATE SET external_id = EXCLUDED.external_id
            RETURNING id, external_id, name, email, role, avatar, is_active,
                      created_at, updated_at
            "#,
        )
        .bind(data.external_id)
        .bind(data.email.to_lowercase())
        .bind(data.name)
        .bind(data.role)
        .fetch_one(pool)
        .await?;

        Ok(user)
    }

    /// Finds a user by ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, external_id, name, email, role, avatar, is_active,
                   created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(user)
    }

    /// Lists all users ordered by name
    pub async fn list(pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT id, external_id, name, email, role, avatar, is_active,
                   created_at, updated_at
            FROM users
            ORDER BY name ASC, created_at ASC
            "#,
        )
        .fetch_all(pool)
        .await?;

        Ok(users)
    }

    /// Writes the profile fields of an existing user
    ///
    /// Only `name`, `avatar`, and `updated_at` are written. Returns `None` if
    /// no user has this id.
    pub async fn update_profile(pool: &PgPool, user: &User) -> Result<Option<Self>, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET name = $2, avatar = $3, updated_at = $4
            WHERE id = $1
            RETURNING id, external_id, name, email, role, avatar, is_active,
                      created_at, updated_at
            "#,
        )
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.avatar)
        .bind(user.updated_at)
        .fetch_optional(pool)
        .await?;

        Ok(user)
    }

    /// Checks whether a user with the given id exists
    pub async fn exists(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE id = $1)")
            .bind(id)
            .fetch_one(pool)
            .await?;

        Ok(exists)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_user() -> CreateUser {
        CreateUser {
            external_id: "subject-1".to_string(),
            email: "Dev@Example.com".to_string(),
            name: "Dev".to_string(),
            role: UserRole::default(),
        }
    }

    #[test]
    fn test_role_wire_format() {
        assert_eq!(
            serde_json::to_string(&UserRole::ProjectManager).unwrap(),
            "\"project-manager\""
        );
        assert_eq!("tester".parse::<UserRole>().unwrap(), UserRole::Tester);
        assert!("Admin".parse::<UserRole>().is_err());
    }

    #[test]
    fn test_only_project_manager_is_privileged() {
        assert!(UserRole::ProjectManager.is_privileged());
        assert!(!UserRole::Developer.is_privileged());
        assert!(!UserRole::Tester.is_privileged());
    }

    #[test]
    fn test_from_create_defaults() {
        let user = User::from_create(create_user());

        assert_eq!(user.role, UserRole::Developer);
        assert_eq!(user.email, "dev@example.com");
        assert_eq!(user.avatar, "default.jpg");
        assert!(user.is_active);
        assert!(user.validate().is_ok());
    }

    #[test]
    fn test_create_user_validation() {
        let mut data = create_user();
        assert!(data.validate().is_ok());

        data.email = "not-an-email".to_string();
        let errors = data.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("email"));

        let mut data = create_user();
        data.name = "x".repeat(MAX_NAME_LEN + 1);
        assert!(data.validate().is_err());
    }

    #[test]
    fn test_update_user_rejects_protected_fields() {
        let patch: UpdateUser = serde_json::from_str(r#"{"name": " Ada "}"#).unwrap();
        let mut user = User::from_create(create_user());
        user.apply(patch);
        assert_eq!(user.name, "Ada");

        for body in [r#"{"role": "project-manager"}"#, r#"{"is_active": false}"#, r#"{"email": "x@example.com"}"#] {
            assert!(serde_json::from_str::<UpdateUser>(body).is_err(), "{}", body);
        }
    }

    #[test]
    fn test_external_id_not_serialized() {
        let user = User::from_create(create_user());
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("external_id").is_none());
        assert_eq!(json["role"], "developer");
    }
}
