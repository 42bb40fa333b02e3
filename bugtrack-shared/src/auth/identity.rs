/// Identity resolution
///
/// Maps an external credential to exactly one stored [`User`], creating the
/// record on the subject's first successful login. Creation is an upsert on
/// the unique external id, so concurrent first logins converge on one record.

use std::sync::Arc;

use tracing::{debug, info, warn};
use validator::ValidateEmail;

use super::verifier::CredentialVerifier;
use crate::error::{ServiceError, ServiceResult};
use crate::models::user::{CreateUser, User, UserRole, MAX_NAME_LEN};
use crate::store::Store;

/// Resolves bearer credentials to users
#[derive(Clone)]
pub struct IdentityResolver {
    verifier: Arc<dyn CredentialVerifier>,
    store: Arc<dyn Store>,
}

impl IdentityResolver {
    pub fn new(verifier: Arc<dyn CredentialVerifier>, store: Arc<dyn Store>) -> Self {
        Self { verifier, store }
    }

    /// Verifies `token` and returns the user it belongs to
    ///
    /// An existing user is returned unchanged; profile fields from the token
    /// are only used when the record is first created.
    ///
    /// # Errors
    ///
    /// - `Authentication` if the token fails verification, carries a blank
    ///   subject or no usable email, or belongs to a disabled account
    /// - `Store` if the lookup or insert fails
    pub async fn resolve(&self, token: &str) -> ServiceResult<User> {
        let identity = self
            .verifier
            .verify(token)
            .await
            .map_err(|e| ServiceError::Authentication(e.to_string()))?;

        let subject = identity.subject.trim();
        if subject.is_empty() {
            return Err(ServiceError::Authentication(
                "identity has no subject".to_string(),
            ));
        }

        let email = identity
            .email
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .ok_or_else(|| ServiceError::Authentication("identity has no email".to_string()))?;

        if !email.validate_email() {
            return Err(ServiceError::Authentication(
                "identity email is malformed".to_string(),
            ));
        }

        let user = self
            .store
            .upsert_user(CreateUser {
                external_id: subject.to_string(),
                email: email.to_lowercase(),
                name: display_name(identity.display_name.as_deref(), email),
                role: UserRole::default(),
            })
            .await?;

        if !user.is_active {
            warn!(user_id = %user.id, "Rejected login for disabled account");
            return Err(ServiceError::Authentication("account is disabled".to_string()));
        }

        debug!(user_id = %user.id, subject = %subject, "Resolved identity");
        Ok(user)
    }
}

impl std::fmt::Debug for IdentityResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityResolver").finish_non_exhaustive()
    }
}

/// Display name if present and non-blank, otherwise the email local part
fn display_name(name: Option<&str>, email: &str) -> String {
    let name = name
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| email.split('@').next().unwrap_or(email));

    let truncated: String = name.chars().take(MAX_NAME_LEN).collect();
    if truncated.len() < name.len() {
        info!(max = MAX_NAME_LEN, "Truncated display name");
    }
    truncated
}
