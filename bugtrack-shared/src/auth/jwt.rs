/// JWT identity token generation and validation
///
/// Tokens are issued by the external identity provider and carry the
/// federated subject id plus the profile fields used to provision a user
/// on first login.
///
/// # Security
///
/// - **Algorithm**: HS256 (HMAC with SHA-256)
/// - **Validation**: Signature, expiration, not-before, and issuer checks
/// - **Secret Management**: Secrets should be at least 32 bytes (256 bits)
///
/// # Example
///
/// ```
/// use bugtrack_shared::auth::jwt::{create_token, validate_token, IdentityClaims};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let secret = "test-secret-key-at-least-32-bytes-long";
/// let claims = IdentityClaims::new("firebase|abc123", "bugtrack-identity")
///     .with_email("dev@example.com")
///     .with_name("Dev");
///
/// let token = create_token(&claims, secret)?;
/// let validated = validate_token(&token, secret, "bugtrack-identity")?;
/// assert_eq!(validated.sub, "firebase|abc123");
/// # Ok(())
/// # }
/// ```

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// Default lifetime of an identity token
pub const DEFAULT_EXPIRATION_HOURS: i64 = 1;

/// Error type for JWT operations
#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    /// Failed to create token
    #[error("Failed to create token: {0}")]
    CreateError(String),

    /// Failed to validate token
    #[error("Failed to validate token: {0}")]
    ValidationError(String),

    /// Token has expired
    #[error("Token has expired")]
    Expired,

    /// Token was issued by someone else
    #[error("Invalid issuer: expected {expected}")]
    InvalidIssuer { expected: String },
}

/// Claims carried by an identity token
///
/// # Standard Claims
///
/// - `sub`: Federated subject id
/// - `iss`: Identity provider
/// - `iat`, `exp`, `nbf`: Unix timestamps
///
/// # Profile Claims
///
/// - `email`: Account email, required to provision a user
/// - `name`: Optional display name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentityClaims {
    /// Subject - external user id
    pub sub: String,

    /// Email address reported by the provider
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    /// Display name reported by the provider
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Issuer
    pub iss: String,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration time (Unix timestamp)
    pub exp: i64,

    /// Not before (Unix timestamp)
    pub nbf: i64,
}

impl IdentityClaims {
    /// Creates claims with the default expiration
    pub fn new(subject: impl Into<String>, issuer: impl Into<String>) -> Self {
        Self::with_expiration(subject, issuer, Duration::hours(DEFAULT_EXPIRATION_HOURS))
    }

    /// Creates claims expiring after `expires_in`
    ///
    /// A negative duration yields an already-expired token, which is useful
    /// in tests.
    pub fn with_expiration(
        subject: impl Into<String>,
        issuer: impl Into<String>,
        expires_in: Duration,
    ) -> Self {
        let now = Utc::now();
        Self {
            sub: subject.into(),
            email: None,
            name: None,
            iss: issuer.into(),
            iat: now.timestamp(),
            exp: (now + expires_in).timestamp(),
            nbf: now.timestamp(),
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Checks if token has expired
    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() >= self.exp
    }
}

/// Signs claims with HS256
///
/// # Errors
///
/// Returns `JwtError::CreateError` if encoding fails
pub fn create_token(claims: &IdentityClaims, secret: &str) -> Result<String, JwtError> {
    let header = Header::new(Algorithm::HS256);
    let key = EncodingKey::from_secret(secret.as_bytes());

    encode(&header, claims, &key)
        .map_err(|e| JwtError::CreateError(format!("Token encoding failed: {}", e)))
}

/// Validates a token and extracts its claims
///
/// Verifies the signature, `exp`, `nbf`, and that `iss` equals `issuer`.
///
/// # Errors
///
/// - `JwtError::Expired` if the token has expired
/// - `JwtError::InvalidIssuer` if the issuer does not match
/// - `JwtError::ValidationError` for bad signatures or malformed tokens
pub fn validate_token(token: &str, secret: &str, issuer: &str) -> Result<IdentityClaims, JwtError> {
    let key = DecodingKey::from_secret(secret.as_bytes());

    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[issuer]);
    validation.validate_exp = true;
    validation.validate_nbf = true;

    let token_data = decode::<IdentityClaims>(token, &key, &validation).map_err(|e| {
        match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => JwtError::Expired,
            jsonwebtoken::errors::ErrorKind::InvalidIssuer => JwtError::InvalidIssuer {
                expected: issuer.to_string(),
            },
            _ => JwtError::ValidationError(format!("Token validation failed: {}", e)),
        }
    })?;

    Ok(token_data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret-key-at-least-32-bytes-long";
    const ISSUER: &str = "bugtrack-identity";

    #[test]
    fn test_create_and_validate_token() {
        let claims = IdentityClaims::new("subject-1", ISSUER)
            .with_email("dev@example.com")
            .with_name("Dev");
        let token = create_token(&claims, SECRET).expect("Should create token");

        let validated = validate_token(&token, SECRET, ISSUER).expect("Should validate token");
        assert_eq!(validated.sub, "subject-1");
        assert_eq!(validated.email.as_deref(), Some("dev@example.com"));
        assert_eq!(validated.name.as_deref(), Some("Dev"));
        assert!(!validated.is_expired());
    }

    #[test]
    fn test_profile_claims_are_optional() {
        let claims = IdentityClaims::new("subject-1", ISSUER);
        let token = create_token(&claims, SECRET).unwrap();

        let validated = validate_token(&token, SECRET, ISSUER).unwrap();
        assert!(validated.email.is_none());
        assert!(validated.name.is_none());
    }

    #[test]
    fn test_validate_with_wrong_secret() {
        let claims = IdentityClaims::new("subject-1", ISSUER);
        let token = create_token(&claims, SECRET).unwrap();

        let result = validate_token(&token, "another-secret-key-at-least-32-bytes", ISSUER);
        assert!(matches!(result, Err(JwtError::ValidationError(_))));
    }

    #[test]
    fn test_validate_expired_token() {
        // Past the default 60s leeway
        let claims = IdentityClaims::with_expiration("subject-1", ISSUER, Duration::seconds(-3600));
        assert!(claims.is_expired());

        let token = create_token(&claims, SECRET).unwrap();
        let result = validate_token(&token, SECRET, ISSUER);

        assert!(matches!(result, Err(JwtError::Expired)));
    }

    #[test]
    fn test_validate_wrong_issuer() {
        let claims = IdentityClaims::new("subject-1", "someone-else");
        let token = create_token(&claims, SECRET).unwrap();

        let result = validate_token(&token, SECRET, ISSUER);
        assert!(matches!(result, Err(JwtError::InvalidIssuer { .. })));
    }

    #[test]
    fn test_garbage_token_rejected() {
        let result = validate_token("not.a.token", SECRET, ISSUER);
        assert!(result.is_err());
    }
}
