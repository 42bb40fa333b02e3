/// Application state and router builder
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use bugtrack_api::{app::{build_router, AppState}, config::Config};
/// use bugtrack_shared::auth::verifier::JwtVerifier;
/// use bugtrack_shared::store::MemoryStore;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let verifier = JwtVerifier::new(&config.auth.jwt_secret, &config.auth.issuer);
/// let state = AppState::new(Arc::new(MemoryStore::new()), Arc::new(verifier), config);
/// let app = build_router(state);
/// # Ok(())
/// # }
/// ```

use crate::{config::Config, error::ApiError, middleware::security::SecurityHeadersLayer};
use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, Method},
    middleware::Next,
    response::Response,
    routing::{get, post},
    Router,
};
use bugtrack_shared::auth::{
    identity::IdentityResolver,
    middleware::{bearer_token, AuthContext},
    verifier::CredentialVerifier,
};
use bugtrack_shared::service::AccessService;
use bugtrack_shared::store::Store;
use std::sync::Arc;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// Cloned for each request via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    /// Authorized reads and writes
    pub service: AccessService,

    /// Bearer token to user resolution
    pub resolver: IdentityResolver,

    /// Application configuration
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, verifier: Arc<dyn CredentialVerifier>, config: Config) -> Self {
        Self {
            service: AccessService::new(store.clone()),
            resolver: IdentityResolver::new(verifier, store),
            config: Arc::new(config),
        }
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /
/// ├── GET /health                      # Liveness and store check (public)
/// └── /v1/                             # Bearer token required
///     ├── GET  /auth/me
///     ├── GET  /users, /users/:id
///     ├── PUT  /users/:id
///     ├── /projects
///     │   ├── GET, POST /
///     │   ├── GET, PUT, DELETE /:id
///     │   └── POST /:id/members
///     └── /bugs
///         ├── GET, POST /
///         ├── GET, PUT, DELETE /:id
///         ├── POST /:id/comments
///         └── POST /:id/attachments
/// ```
///
/// # Middleware Stack
///
/// Applied outermost first: security headers, CORS, request tracing, and
/// authentication on `/v1`.
pub fn build_router(state: AppState) -> Router {
    use crate::routes;

    let health_routes = Router::new().route("/health", get(routes::health::health_check));

    let project_routes = Router::new()
        .route(
            "/",
            get(routes::projects::list_projects).post(routes::projects::create_project),
        )
        .route(
            "/:id",
            get(routes::projects::get_project)
                .put(routes::projects::update_project)
                .delete(routes::projects::delete_project),
        )
        .route("/:id/members", post(routes::projects::add_member));

    let bug_routes = Router::new()
        .route("/", get(routes::bugs::list_bugs).post(routes::bugs::create_bug))
        .route(
            "/:id",
            get(routes::bugs::get_bug)
                .put(routes::bugs::update_bug)
                .delete(routes::bugs::delete_bug),
        )
        .route("/:id/comments", post(routes::bugs::add_comment))
        .route("/:id/attachments", post(routes::bugs::add_attachment));

    let v1_routes = Router::new()
        .route("/auth/me", get(routes::auth::me))
        .route("/users", get(routes::users::list_users))
        .route(
            "/users/:id",
            get(routes::users::get_user).put(routes::users::update_user),
        )
        .nest("/projects", project_routes)
        .nest("/bugs", bug_routes)
        .layer(axum::middleware::from_fn_with_state(state.clone(), auth_layer));

    let cors = if state.config.api.cors_origins.iter().any(|o| o == "*") {
        CorsLayer::permissive()
    } else {
        let origins: Vec<HeaderValue> = state
            .config
            .api
            .cors_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .allow_credentials(true)
            .max_age(std::time::Duration::from_secs(3600))
    };

    Router::new()
        .merge(health_routes)
        .nest("/v1", v1_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .layer(SecurityHeadersLayer::new(state.config.api.production))
        .with_state(state)
}

/// Resolves the bearer token to a user and injects [`AuthContext`]
async fn auth_layer(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(req.headers())?;
    let user = state.resolver.resolve(token).await?;

    tracing::debug!(user_id = %user.id, "Authenticated request");
    req.extensions_mut().insert(AuthContext::new(user));

    Ok(next.run(req).await)
}
