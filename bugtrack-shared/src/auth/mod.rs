/// Authentication and authorization
///
/// # Modules
///
/// - [`jwt`]: HS256 identity token generation and validation
/// - [`verifier`]: The [`CredentialVerifier`](verifier::CredentialVerifier) seam and its JWT implementation
/// - [`identity`]: Resolves a verified identity to a stored [`User`](crate::models::user::User)
/// - [`authorization`]: Pure read/mutate policy for projects and bugs
/// - [`middleware`]: Bearer token extraction and the per-request [`AuthContext`](middleware::AuthContext)
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use bugtrack_shared::auth::identity::IdentityResolver;
/// use bugtrack_shared::auth::verifier::JwtVerifier;
/// use bugtrack_shared::store::MemoryStore;
///
/// # async fn example(token: &str) -> Result<(), Box<dyn std::error::Error>> {
/// let resolver = IdentityResolver::new(
///     Arc::new(JwtVerifier::new("secret-key-at-least-32-bytes-long!!", "bugtrack-identity")),
///     Arc::new(MemoryStore::new()),
/// );
/// let user = resolver.resolve(token).await?;
/// # Ok(())
/// # }
/// ```

pub mod authorization;
pub mod identity;
pub mod jwt;
pub mod middleware;
pub mod verifier;
