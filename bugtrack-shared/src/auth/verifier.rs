/// Credential verification seam
///
/// The identity resolver depends on [`CredentialVerifier`] rather than on a
/// concrete provider, so a hosted identity service can replace the bundled
/// [`JwtVerifier`] without touching the authorization core.

use async_trait::async_trait;

use super::jwt::{validate_token, JwtError};
use super::middleware::AuthError;

/// Identity asserted by a verified credential
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedIdentity {
    /// Provider-assigned subject id
    pub subject: String,

    /// Email address, if the provider supplied one
    pub email: Option<String>,

    /// Display name, if the provider supplied one
    pub display_name: Option<String>,
}

/// Verifies an opaque credential and returns the identity it asserts
#[async_trait]
pub trait CredentialVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<VerifiedIdentity, AuthError>;
}

/// Verifier for HS256 tokens signed with a shared secret
#[derive(Clone)]
pub struct JwtVerifier {
    secret: String,
    issuer: String,
}

impl JwtVerifier {
    pub fn new(secret: impl Into<String>, issuer: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            issuer: issuer.into(),
        }
    }
}

impl std::fmt::Debug for JwtVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtVerifier")
            .field("issuer", &self.issuer)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl CredentialVerifier for JwtVerifier {
    async fn verify(&self, token: &str) -> Result<VerifiedIdentity, AuthError> {
        let claims = validate_token(token, &self.secret, &self.issuer).map_err(|e| match e {
            JwtError::Expired => AuthError::InvalidToken("Token expired".to_string()),
            JwtError::InvalidIssuer { .. } => AuthError::InvalidToken("Invalid issuer".to_string()),
            _ => AuthError::InvalidToken("Invalid token".to_string()),
        })?;

        Ok(VerifiedIdentity {
            subject: claims.sub,
            email: claims.email,
            display_name: claims.name,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::{create_token, IdentityClaims};

    const SECRET: &str = "test-secret-key-at-least-32-bytes-long";

    #[tokio::test]
    async fn test_jwt_verifier_maps_claims() {
        let verifier = JwtVerifier::new(SECRET, "bugtrack-identity");
        let claims = IdentityClaims::new("subject-1", "bugtrack-identity").with_email("a@example.com");
        let token = create_token(&claims, SECRET).unwrap();

        let identity = verifier.verify(&token).await.unwrap();
        assert_eq!(identity.subject, "subject-1");
        assert_eq!(identity.email.as_deref(), Some("a@example.com"));
        assert!(identity.display_name.is_none());
    }

    #[tokio::test]
    async fn test_jwt_verifier_rejects_bad_token() {
        let verifier = JwtVerifier::new(SECRET, "bugtrack-identity");
        let result = verifier.verify("garbage").await;
        assert!(matches!(result, Err(AuthError::InvalidToken(_))));
    }

    #[test]
    fn test_debug_hides_secret() {
        let verifier = JwtVerifier::new(SECRET, "bugtrack-identity");
        assert!(!format!("{:?}", verifier).contains(SECRET));
    }
}
