//! HTTP route definitions and handlers.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    async_trait,
    extract::{FromRequest, Path, Request, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tower_http::limit::RequestBodyLimitLayer;
use tracing::error;
use uuid::Uuid;

use dominion_domain::{BattleOutcome, DomainError, Principal, TokenPair};
use dominion_server::handlers::{
    EngageError, EngageRequest, RegistrationError, RegistrationRequest,
};
use dominion_storage::{
    BuildingRecord, DataStore, FleetRecord, PlanetRecord, StorageError, UserBuildingRecord,
    UserRecord,
};

use super::extract::CurrentUser;
use super::state::AppState;
use crate::observability::{metrics_handler, MetricsState};

/// JSON extractor that renders every rejection in the [`ApiError`] body
/// format instead of axum's plain-text defaults.
///
/// Axum's status choices are kept as-is: syntax errors stay 400, schema
/// mismatches stay 422, and body-limit overruns stay 413.
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ApiJson<T>
where
    T: serde::de::DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = (StatusCode, Json<ApiError>);

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ApiJson(value)),
            Err(rejection) => {
                let status = rejection.status();
                let message = rejection.body_text();
                let error = if status == StatusCode::PAYLOAD_TOO_LARGE {
                    ApiError::new(error_codes::PAYLOAD_TOO_LARGE, message)
                } else {
                    ApiError::validation_error(message)
                };
                Err((status, Json(error)))
            }
        }
    }
}

/// Default request body size limit (1MB).
/// This prevents memory exhaustion from oversized payloads.
pub const DEFAULT_BODY_LIMIT: usize = 1024 * 1024;

/// Private helper for the common API routes.
///
/// This consolidates the whole route table in one place so the router
/// builders below cannot drift apart.
fn api_routes<S: DataStore>() -> Router<Arc<AppState<S>>> {
    Router::new()
        .route("/", get(root))
        // Accounts and sessions
        .route("/auth/register", post(register::<S>))
        .route("/auth/register-admin", post(register_admin::<S>))
        .route("/auth/login", post(login::<S>))
        .route("/auth/refresh", post(refresh::<S>))
        // User management
        .route("/users/me", get(read_current_user::<S>))
        .route("/users", get(list_users::<S>))
        .route(
            "/users/:user_id",
            get(get_user::<S>)
                .put(update_user::<S>)
                .delete(delete_user::<S>),
        )
        // Planets
        .route("/planets", post(create_planet::<S>).get(list_planets::<S>))
        .route(
            "/planets/:planet_id",
            get(get_planet::<S>)
                .put(update_planet::<S>)
                .delete(delete_planet::<S>),
        )
        .route("/planets/:planet_id/claim", put(claim_planet::<S>))
        // Planet buildings
        .route(
            "/buildings",
            post(create_building::<S>).get(list_buildings::<S>),
        )
        .route(
            "/buildings/:building_id",
            get(get_building::<S>)
                .put(upgrade_building::<S>)
                .delete(delete_building::<S>),
        )
        // User buildings
        .route(
            "/user-buildings",
            post(create_user_building::<S>).get(list_user_buildings::<S>),
        )
        .route(
            "/user-buildings/:user_building_id",
            get(get_user_building::<S>)
                .put(update_user_building::<S>)
                .delete(delete_user_building::<S>),
        )
        // Fleets
        .route(
            "/user-fleets",
            post(create_fleet::<S>).get(list_fleets::<S>),
        )
        .route(
            "/user-fleets/:fleet_id",
            get(get_fleet::<S>)
                .put(update_fleet::<S>)
                .delete(delete_fleet::<S>),
        )
        // Battles
        .route("/battles", post(start_battle::<S>))
}

/// Creates the HTTP router with all game endpoints.
///
/// Applies the default body size limit (1MB) to protect against oversized payloads.
pub fn create_router<S: DataStore>(state: AppState<S>) -> Router {
    create_router_with_body_limit(state, DEFAULT_BODY_LIMIT)
}

/// Creates the HTTP router with a custom body size limit.
///
/// # Arguments
///
/// * `state` - Application state with storage backend
/// * `body_limit` - Maximum request body size in bytes
pub fn create_router_with_body_limit<S: DataStore>(
    state: AppState<S>,
    body_limit: usize,
) -> Router {
    let shared_state = Arc::new(state);
    api_routes::<S>()
        // Health and readiness checks
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check::<S>))
        .with_state(shared_state)
        // Apply body size limit layer
        .layer(RequestBodyLimitLayer::new(body_limit))
}

/// Creates the HTTP router with observability endpoints.
///
/// This includes all game endpoints plus:
/// - `/metrics` - Prometheus metrics endpoint
/// - `/health` - Basic health check
/// - `/ready` - Readiness check (validates dependencies)
///
/// Applies the default body size limit (1MB) to protect against oversized payloads.
///
/// # Arguments
///
/// * `state` - Application state with storage backend
/// * `metrics_state` - Metrics state for Prometheus endpoint
pub fn create_router_with_observability<S: DataStore>(
    state: AppState<S>,
    metrics_state: MetricsState,
) -> Router {
    create_router_with_observability_and_limit(state, metrics_state, DEFAULT_BODY_LIMIT)
}

/// Creates the HTTP router with observability endpoints and custom body size limit.
///
/// # Arguments
///
/// * `state` - Application state with storage backend
/// * `metrics_state` - Metrics state for Prometheus endpoint
/// * `body_limit` - Maximum request body size in bytes
pub fn create_router_with_observability_and_limit<S: DataStore>(
    state: AppState<S>,
    metrics_state: MetricsState,
    body_limit: usize,
) -> Router {
    let shared_state = Arc::new(state);

    // Create the API router with readiness check
    let api_router = api_routes::<S>()
        .route("/ready", get(readiness_check::<S>))
        .with_state(shared_state)
        // Apply body size limit layer to API routes only
        .layer(RequestBodyLimitLayer::new(body_limit));

    // Create observability router (metrics, health) - no body limit needed
    let observability_router = Router::new()
        .route("/metrics", get(metrics_handler))
        .route("/health", get(health_check))
        .with_state(metrics_state);

    // Merge routers
    api_router.merge(observability_router)
}

// ============================================================
// Error Handling
// ============================================================

/// Machine-readable error codes carried in every error response.
///
/// Each code maps to exactly one HTTP status via [`ApiError::into_response`],
/// so clients can branch on `code` without parsing `message`.
///
/// # Error Code Categories
///
/// ## 404 Not Found
/// - [`NOT_FOUND`] - The addressed user, planet, building, or fleet does not exist
///   (or is not visible to the caller, for owner-scoped resources)
///
/// ## 403 Forbidden
/// - [`FORBIDDEN`] - Authenticated, but not allowed to act on this resource
///
/// ## 401 Unauthorized
/// - [`UNAUTHENTICATED`] - Missing, invalid, or expired credentials
///
/// ## 400 Bad Request
/// - [`VALIDATION_ERROR`] - Malformed input (bad JSON, bad UUID, missing fields)
/// - [`DUPLICATE_USERNAME`] - Username already registered
/// - [`DUPLICATE_EMAIL`] - Email already registered
/// - [`PLANET_ALREADY_CLAIMED`] - Caller already owns the planet they try to claim
/// - [`SELF_BATTLE_FORBIDDEN`] - Both fleets in a battle belong to the caller
///
/// ## 5xx Server Errors
/// - [`INTERNAL_ERROR`] - Unexpected internal error
/// - [`TIMEOUT`] - Storage operation timed out
/// - [`SERVICE_UNAVAILABLE`] - Storage backend unreachable
/// - [`PAYLOAD_TOO_LARGE`] - Request body exceeds size limit (413)
///
/// # Usage
///
/// Use the corresponding [`ApiError`] constructor methods rather than these
/// constants directly:
///
/// ```ignore
/// ApiError::not_found("Planet not found")
/// ApiError::forbidden("Unauthorized to update this planet")
/// ```
pub mod error_codes {
    // 404 Not Found
    /// The addressed resource does not exist.
    pub const NOT_FOUND: &str = "not_found";

    // 403 Forbidden
    /// The caller is authenticated but not allowed to perform this action.
    pub const FORBIDDEN: &str = "forbidden";

    // 401 Unauthorized
    /// Missing, invalid, or expired credentials.
    pub const UNAUTHENTICATED: &str = "unauthenticated";

    // 400 Bad Request codes
    /// Generic input validation error (invalid format, missing required fields).
    pub const VALIDATION_ERROR: &str = "validation_error";
    /// Another account already holds this username.
    pub const DUPLICATE_USERNAME: &str = "duplicate_username";
    /// Another account already holds this email.
    pub const DUPLICATE_EMAIL: &str = "duplicate_email";
    /// The caller already owns the planet they tried to claim.
    pub const PLANET_ALREADY_CLAIMED: &str = "planet_already_claimed";
    /// A fleet cannot battle another fleet of the same owner.
    pub const SELF_BATTLE_FORBIDDEN: &str = "self_battle_forbidden";

    // 5xx codes
    /// Unexpected internal server error.
    pub const INTERNAL_ERROR: &str = "internal_error";
    /// Operation timed out before completion.
    pub const TIMEOUT: &str = "timeout";
    /// Service temporarily unavailable (storage backend issues).
    pub const SERVICE_UNAVAILABLE: &str = "service_unavailable";
    /// Request body exceeds maximum allowed size.
    pub const PAYLOAD_TOO_LARGE: &str = "payload_too_large";
}

/// API error response body.
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Creates a not found error (404).
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(error_codes::NOT_FOUND, message)
    }

    /// Creates a forbidden error (403).
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(error_codes::FORBIDDEN, message)
    }

    /// Creates an unauthenticated error (401).
    pub fn unauthenticated(message: impl Into<String>) -> Self {
        Self::new(error_codes::UNAUTHENTICATED, message)
    }

    /// Creates a validation error (400).
    pub fn validation_error(message: impl Into<String>) -> Self {
        Self::new(error_codes::VALIDATION_ERROR, message)
    }

    /// Creates a duplicate username error (400).
    pub fn duplicate_username(message: impl Into<String>) -> Self {
        Self::new(error_codes::DUPLICATE_USERNAME, message)
    }

    /// Creates a duplicate email error (400).
    pub fn duplicate_email(message: impl Into<String>) -> Self {
        Self::new(error_codes::DUPLICATE_EMAIL, message)
    }

    /// Creates an already-claimed error (400).
    pub fn already_claimed(message: impl Into<String>) -> Self {
        Self::new(error_codes::PLANET_ALREADY_CLAIMED, message)
    }

    /// Creates a self-battle error (400).
    pub fn self_battle(message: impl Into<String>) -> Self {
        Self::new(error_codes::SELF_BATTLE_FORBIDDEN, message)
    }

    /// Creates an internal error (500).
    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new(error_codes::INTERNAL_ERROR, message)
    }

    /// Creates a timeout error (504 Gateway Timeout).
    pub fn gateway_timeout(message: impl Into<String>) -> Self {
        Self::new(error_codes::TIMEOUT, message)
    }

    /// Creates a service unavailable error (503 Service Unavailable).
    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::new(error_codes::SERVICE_UNAVAILABLE, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        use error_codes::*;

        let status = match self.code.as_str() {
            NOT_FOUND => StatusCode::NOT_FOUND,

            FORBIDDEN => StatusCode::FORBIDDEN,

            UNAUTHENTICATED => StatusCode::UNAUTHORIZED,

            VALIDATION_ERROR | DUPLICATE_USERNAME | DUPLICATE_EMAIL | PLANET_ALREADY_CLAIMED
            | SELF_BATTLE_FORBIDDEN => StatusCode::BAD_REQUEST,

            TIMEOUT => StatusCode::GATEWAY_TIMEOUT,

            PAYLOAD_TOO_LARGE => StatusCode::PAYLOAD_TOO_LARGE,

            SERVICE_UNAVAILABLE => StatusCode::SERVICE_UNAVAILABLE,

            // Default: 500 Internal Server Error
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        match &err {
            // 404 Not Found: the addressed record does not exist. Owner-scoped
            // lookups fold "exists but is someone else's" into the same code.
            StorageError::UserNotFound { .. } => ApiError::not_found("User not found"),
            StorageError::PlanetNotFound { .. } => ApiError::not_found("Planet not found"),
            StorageError::BuildingNotFound { .. } => {
                ApiError::not_found("Building not found or not owned by user")
            }
            StorageError::UserBuildingNotFound { .. } => {
                ApiError::not_found("User building not found")
            }
            StorageError::FleetNotFound { .. } => ApiError::not_found("User fleet not found"),
            // 400 Bad Request: uniqueness conflicts
            StorageError::DuplicateUsername { .. } => {
                ApiError::duplicate_username("Username already taken")
            }
            StorageError::DuplicateEmail { .. } => {
                ApiError::duplicate_email("Email already in use")
            }
            // 503 Service Unavailable: connection errors
            StorageError::ConnectionError { .. } => {
                error!("Storage unavailable: {}", err);
                ApiError::service_unavailable("storage backend unavailable")
            }
            // 504 Gateway Timeout: query timeout
            StorageError::QueryTimeout { .. } => {
                error!("Query timeout: {}", err);
                ApiError::gateway_timeout("storage operation timed out")
            }
            _ => {
                error!("Storage error: {}", err);
                ApiError::internal_error("internal storage error")
            }
        }
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::AuthenticationFailed { message } => ApiError::unauthenticated(message),
            // Token decode failures embed library detail; clients get the
            // stable message only.
            DomainError::InvalidToken { .. } => {
                ApiError::unauthenticated("Invalid or expired refresh token")
            }
            DomainError::Forbidden { message } => ApiError::forbidden(message),
            DomainError::NotFound { message } => ApiError::not_found(message),
            DomainError::SelfBattleForbidden => {
                ApiError::self_battle("Cannot attack your own fleet")
            }
            DomainError::AdapterUnavailable { message } => {
                error!(error = %message, "Credential adapter unavailable");
                ApiError::service_unavailable("storage backend unavailable")
            }
        }
    }
}

/// Converts a RegistrationError to an ApiError.
///
/// Uniqueness conflicts surface verbatim; hashing and storage failures are
/// logged in full and sanitized for the client.
fn registration_error_to_api_error(err: RegistrationError) -> ApiError {
    match err {
        RegistrationError::UsernameTaken => ApiError::duplicate_username("Username already taken"),
        RegistrationError::EmailTaken => ApiError::duplicate_email("Email already in use"),
        RegistrationError::Hashing(message) => {
            error!(error = %message, "Password hashing failed during registration");
            ApiError::internal_error("Error creating user")
        }
        RegistrationError::Storage(message) => {
            error!(error = %message, "Storage failure during registration");
            ApiError::internal_error("Error creating user")
        }
    }
}

/// Converts an EngageError to an ApiError.
fn engage_error_to_api_error(err: EngageError) -> ApiError {
    match err {
        EngageError::AttackerFleetNotFound => ApiError::not_found("Attacker fleet not found"),
        EngageError::NotFleetOwner => ApiError::forbidden("You do not own the attacker fleet"),
        EngageError::DefenderFleetNotFound => ApiError::not_found("Defender fleet not found"),
        EngageError::SelfBattle => ApiError::self_battle("Cannot attack your own fleet"),
        EngageError::Storage(message) => {
            error!(error = %message, "Storage failure during battle");
            ApiError::internal_error("Error during battle")
        }
        EngageError::Domain(message) => {
            error!(error = %message, "Resolver failure during battle");
            ApiError::internal_error("Error during battle")
        }
    }
}

type ApiResult<T> = Result<T, ApiError>;

// ============================================================
// Shared Helpers
// ============================================================

/// Generic acknowledgement body for update and delete operations.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Parses a path segment as a UUID, rejecting malformed ids up front.
fn parse_uuid(raw: &str) -> ApiResult<Uuid> {
    Uuid::parse_str(raw)
        .map_err(|_| ApiError::validation_error(format!("Invalid UUID format: {raw}")))
}

/// Same as [`parse_uuid`] but with the message the user endpoints use.
fn parse_user_id(raw: &str) -> ApiResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| ApiError::validation_error("Invalid user ID format"))
}

/// Extracts the caller's user id from the authenticated principal.
///
/// The id was written by us at token issue time, so a parse failure means
/// the token subject no longer names a user we can act for.
fn caller_id(principal: &Principal) -> ApiResult<Uuid> {
    Uuid::parse_str(&principal.id)
        .map_err(|_| ApiError::unauthenticated("Could not validate credentials"))
}

// ============================================================
// Health and Readiness Checks
// ============================================================

/// Basic health check - returns 200 if the server is running.
///
/// This is a liveness probe that indicates the server process is alive.
/// It does NOT check dependencies.
async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

/// Readiness check - validates that all dependencies are accessible.
///
/// This is a readiness probe that checks:
/// - Storage backend connectivity (by attempting to list users)
///
/// Returns 200 if ready, 503 if dependencies are unavailable.
///
/// Note: Error details are logged but not exposed in the response
/// to avoid leaking internal implementation details.
async fn readiness_check<S: DataStore>(State(state): State<Arc<AppState<S>>>) -> impl IntoResponse {
    match state.storage.list_users().await {
        Ok(_) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "status": "ready",
                "checks": {
                    "storage": "ok"
                }
            })),
        ),
        Err(e) => {
            error!("Readiness check failed: storage unavailable: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(serde_json::json!({
                    "status": "not_ready",
                    "checks": {
                        "storage": "unavailable"
                    }
                })),
            )
        }
    }
}

/// Root greeting.
async fn root() -> impl IntoResponse {
    Json(serde_json::json!({ "message": "Welcome to the Dominion API" }))
}

// ============================================================
// Accounts and Sessions
// ============================================================

/// Request body for registering an account.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Response for successful registration.
#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub message: String,
    pub user_id: Uuid,
}

/// Request body for logging in.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Request body for refreshing a session.
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Response carrying a fresh token pair.
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
}

impl From<TokenPair> for TokenResponse {
    fn from(pair: TokenPair) -> Self {
        Self {
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
            token_type: pair.token_type.to_string(),
        }
    }
}

async fn register_account<S: DataStore>(
    state: &AppState<S>,
    body: RegisterRequest,
    as_admin: bool,
) -> ApiResult<Json<RegisterResponse>> {
    let request = RegistrationRequest {
        username: body.username,
        email: body.email,
        password: body.password,
    };

    let result = if as_admin {
        state.accounts.register_admin(request).await
    } else {
        state.accounts.register(request).await
    };

    match result {
        Ok(user) => {
            metrics::counter!("dominion_registrations_total", "outcome" => "success").increment(1);
            let message = if as_admin {
                "Admin user created successfully"
            } else {
                "User created successfully"
            };
            Ok(Json(RegisterResponse {
                message: message.to_string(),
                user_id: user.id,
            }))
        }
        Err(err) => {
            let outcome = match &err {
                RegistrationError::UsernameTaken | RegistrationError::EmailTaken => "conflict",
                _ => "error",
            };
            metrics::counter!("dominion_registrations_total", "outcome" => outcome).increment(1);
            Err(registration_error_to_api_error(err))
        }
    }
}

/// `POST /auth/register` - Registers a regular account.
async fn register<S: DataStore>(
    State(state): State<Arc<AppState<S>>>,
    ApiJson(body): ApiJson<RegisterRequest>,
) -> ApiResult<Json<RegisterResponse>> {
    register_account(&state, body, false).await
}

/// `POST /auth/register-admin` - Registers an administrator account.
async fn register_admin<S: DataStore>(
    State(state): State<Arc<AppState<S>>>,
    ApiJson(body): ApiJson<RegisterRequest>,
) -> ApiResult<Json<RegisterResponse>> {
    register_account(&state, body, true).await
}

/// `POST /auth/login` - Exchanges credentials for a token pair.
async fn login<S: DataStore>(
    State(state): State<Arc<AppState<S>>>,
    ApiJson(body): ApiJson<LoginRequest>,
) -> ApiResult<Json<TokenResponse>> {
    match state.sessions.login(&body.username, &body.password).await {
        Ok(pair) => {
            metrics::counter!("dominion_logins_total", "outcome" => "success").increment(1);
            Ok(Json(pair.into()))
        }
        Err(err) => {
            metrics::counter!("dominion_logins_total", "outcome" => "failure").increment(1);
            Err(err.into())
        }
    }
}

/// `POST /auth/refresh` - Exchanges a refresh token for a new token pair.
async fn refresh<S: DataStore>(
    State(state): State<Arc<AppState<S>>>,
    ApiJson(body): ApiJson<RefreshRequest>,
) -> ApiResult<Json<TokenResponse>> {
    let pair = state.sessions.refresh(&body.refresh_token)?;
    Ok(Json(pair.into()))
}

// ============================================================
// User Management
// ============================================================

/// Public view of a user account. Never carries the password hash.
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub is_admin: bool,
}

impl From<UserRecord> for UserResponse {
    fn from(user: UserRecord) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            is_admin: user.is_admin,
        }
    }
}

/// Request body for updating a user's profile.
#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    pub username: String,
    pub email: String,
    pub is_admin: bool,
}

/// `GET /users/me` - Returns the caller's own account.
///
/// A valid token whose account has since been deleted gets 404, not 401.
async fn read_current_user<S: DataStore>(
    State(state): State<Arc<AppState<S>>>,
    CurrentUser(principal): CurrentUser,
) -> ApiResult<Json<UserResponse>> {
    let user = state
        .storage
        .get_user_by_username(&principal.username)
        .await?;
    Ok(Json(user.into()))
}

/// `GET /users` - Lists all accounts. Admin only.
async fn list_users<S: DataStore>(
    State(state): State<Arc<AppState<S>>>,
    CurrentUser(principal): CurrentUser,
) -> ApiResult<Json<Vec<UserResponse>>> {
    if !principal.is_admin {
        return Err(ApiError::forbidden("Unauthorized to fetch all users"));
    }
    let users = state.storage.list_users().await?;
    Ok(Json(users.into_iter().map(UserResponse::from).collect()))
}

/// `GET /users/:user_id` - Returns one account. Self or admin.
async fn get_user<S: DataStore>(
    State(state): State<Arc<AppState<S>>>,
    CurrentUser(principal): CurrentUser,
    Path(user_id): Path<String>,
) -> ApiResult<Json<UserResponse>> {
    let user_id = parse_user_id(&user_id)?;
    let user = state.storage.get_user(user_id).await?;
    if principal.username != user.username && !principal.is_admin {
        return Err(ApiError::forbidden("Unauthorized to view this user"));
    }
    Ok(Json(user.into()))
}

/// `PUT /users/:user_id` - Updates an account's profile. Admin only.
async fn update_user<S: DataStore>(
    State(state): State<Arc<AppState<S>>>,
    CurrentUser(principal): CurrentUser,
    Path(user_id): Path<String>,
    ApiJson(body): ApiJson<UpdateUserRequest>,
) -> ApiResult<Json<MessageResponse>> {
    let user_id = parse_user_id(&user_id)?;
    if !principal.is_admin {
        return Err(ApiError::forbidden("Only admins can update users"));
    }
    state
        .storage
        .update_user(user_id, &body.username, &body.email, body.is_admin)
        .await?;
    Ok(Json(MessageResponse::new("User updated successfully")))
}

/// `DELETE /users/:user_id` - Deletes an account and everything it owns.
/// Admin only.
async fn delete_user<S: DataStore>(
    State(state): State<Arc<AppState<S>>>,
    CurrentUser(principal): CurrentUser,
    Path(user_id): Path<String>,
) -> ApiResult<Json<MessageResponse>> {
    let user_id = parse_user_id(&user_id)?;
    if !principal.is_admin {
        return Err(ApiError::forbidden("Only admins can delete users"));
    }
    state.storage.delete_user(user_id).await?;
    Ok(Json(MessageResponse::new("User deleted successfully")))
}

// ============================================================
// Planets
// ============================================================

/// Request body for creating or updating a planet.
#[derive(Debug, Deserialize)]
pub struct PlanetRequest {
    pub name: String,
    pub resources: serde_json::Value,
    pub discovered_at: DateTime<Utc>,
    pub claimed_at: DateTime<Utc>,
}

/// Response for planet creation. Deliberately thin; the full record is
/// available through `GET /planets/:planet_id`.
#[derive(Debug, Serialize)]
pub struct PlanetCreatedResponse {
    pub id: Uuid,
    pub name: String,
    pub owner_id: Uuid,
}

/// Full planet view, owner included.
#[derive(Debug, Serialize)]
pub struct PlanetResponse {
    pub id: Uuid,
    pub name: String,
    pub owner_id: Uuid,
    pub resources: serde_json::Value,
    pub discovered_at: DateTime<Utc>,
    pub claimed_at: DateTime<Utc>,
}

/// Planet view used in listings. The owner is implied by the request.
#[derive(Debug, Serialize)]
pub struct PlanetSummary {
    pub id: Uuid,
    pub name: String,
    pub resources: serde_json::Value,
    pub discovered_at: DateTime<Utc>,
    pub claimed_at: DateTime<Utc>,
}

impl From<PlanetRecord> for PlanetSummary {
    fn from(planet: PlanetRecord) -> Self {
        Self {
            id: planet.id,
            name: planet.name,
            resources: planet.resources,
            discovered_at: planet.discovered_at,
            claimed_at: planet.claimed_at,
        }
    }
}

/// Resolves the caller's stored account for the planet endpoints.
///
/// Planet ownership is keyed by the stored user row, so a valid token
/// whose account has since been deleted gets 404 here.
async fn planet_caller<S: DataStore>(
    state: &AppState<S>,
    principal: &Principal,
) -> ApiResult<UserRecord> {
    Ok(state
        .storage
        .get_user_by_username(&principal.username)
        .await?)
}

/// `POST /planets` - Registers a newly discovered planet owned by the caller.
async fn create_planet<S: DataStore>(
    State(state): State<Arc<AppState<S>>>,
    CurrentUser(principal): CurrentUser,
    ApiJson(body): ApiJson<PlanetRequest>,
) -> ApiResult<Json<PlanetCreatedResponse>> {
    let owner = planet_caller(&state, &principal).await?;
    let planet = state
        .storage
        .create_planet(PlanetRecord {
            id: Uuid::new_v4(),
            name: body.name,
            user_id: owner.id,
            resources: body.resources,
            discovered_at: body.discovered_at,
            claimed_at: body.claimed_at,
        })
        .await?;
    Ok(Json(PlanetCreatedResponse {
        id: planet.id,
        name: planet.name,
        owner_id: planet.user_id,
    }))
}

/// `GET /planets` - Lists the caller's planets.
async fn list_planets<S: DataStore>(
    State(state): State<Arc<AppState<S>>>,
    CurrentUser(principal): CurrentUser,
) -> ApiResult<Json<Vec<PlanetSummary>>> {
    let owner = planet_caller(&state, &principal).await?;
    let planets = state.storage.list_planets_by_owner(owner.id).await?;
    Ok(Json(planets.into_iter().map(PlanetSummary::from).collect()))
}

/// `GET /planets/:planet_id` - Returns one planet. Owner or admin.
async fn get_planet<S: DataStore>(
    State(state): State<Arc<AppState<S>>>,
    CurrentUser(principal): CurrentUser,
    Path(planet_id): Path<String>,
) -> ApiResult<Json<PlanetResponse>> {
    let planet_id = parse_uuid(&planet_id)?;
    let planet = state.storage.get_planet(planet_id).await?;
    let owner = match state.storage.get_user(planet.user_id).await {
        Ok(owner) => owner,
        Err(StorageError::UserNotFound { .. }) => {
            return Err(ApiError::not_found("Owner user not found"))
        }
        Err(other) => return Err(other.into()),
    };
    if principal.username != owner.username && !principal.is_admin {
        return Err(ApiError::forbidden("Unauthorized to view this planet"));
    }
    Ok(Json(PlanetResponse {
        id: planet.id,
        name: planet.name,
        owner_id: planet.user_id,
        resources: planet.resources,
        discovered_at: planet.discovered_at,
        claimed_at: planet.claimed_at,
    }))
}

/// `PUT /planets/:planet_id` - Updates a planet. Owner only; admins do not
/// get write access to foreign planets.
async fn update_planet<S: DataStore>(
    State(state): State<Arc<AppState<S>>>,
    CurrentUser(principal): CurrentUser,
    Path(planet_id): Path<String>,
    ApiJson(body): ApiJson<PlanetRequest>,
) -> ApiResult<Json<MessageResponse>> {
    let planet_id = parse_uuid(&planet_id)?;
    let caller = planet_caller(&state, &principal).await?;
    let planet = state.storage.get_planet(planet_id).await?;
    if planet.user_id != caller.id {
        return Err(ApiError::forbidden("Unauthorized to update this planet"));
    }
    state
        .storage
        .update_planet(
            planet_id,
            &body.name,
            body.resources,
            body.discovered_at,
            body.claimed_at,
        )
        .await?;
    Ok(Json(MessageResponse::new("Planet updated successfully")))
}

/// `DELETE /planets/:planet_id` - Deletes a planet. Owner only.
async fn delete_planet<S: DataStore>(
    State(state): State<Arc<AppState<S>>>,
    CurrentUser(principal): CurrentUser,
    Path(planet_id): Path<String>,
) -> ApiResult<Json<MessageResponse>> {
    let planet_id = parse_uuid(&planet_id)?;
    let caller = planet_caller(&state, &principal).await?;
    let planet = state.storage.get_planet(planet_id).await?;
    if planet.user_id != caller.id {
        return Err(ApiError::forbidden("Unauthorized to delete this planet"));
    }
    state.storage.delete_planet(planet_id).await?;
    Ok(Json(MessageResponse::new("Planet deleted successfully")))
}

/// `PUT /planets/:planet_id/claim` - Transfers a planet to the caller.
///
/// Any authenticated user may claim any planet they do not already own;
/// contested ownership is settled through battles, not here.
async fn claim_planet<S: DataStore>(
    State(state): State<Arc<AppState<S>>>,
    CurrentUser(principal): CurrentUser,
    Path(planet_id): Path<String>,
) -> ApiResult<Json<MessageResponse>> {
    let planet_id = parse_uuid(&planet_id)?;
    let caller = planet_caller(&state, &principal).await?;
    let planet = state.storage.get_planet(planet_id).await?;
    if planet.user_id == caller.id {
        return Err(ApiError::already_claimed("Planet already claimed by you"));
    }
    state.storage.claim_planet(planet_id, caller.id).await?;
    Ok(Json(MessageResponse::new("Planet claimed successfully")))
}

// ============================================================
// Planet Buildings
// ============================================================

/// Request body for constructing a building on a planet.
#[derive(Debug, Deserialize)]
pub struct CreateBuildingRequest {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub planet_id: Uuid,
}

/// Building view. `kind` travels as `type` on the wire.
#[derive(Debug, Serialize)]
pub struct BuildingResponse {
    pub id: Uuid,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub planet_id: Uuid,
    pub level: i32,
}

impl From<BuildingRecord> for BuildingResponse {
    fn from(building: BuildingRecord) -> Self {
        Self {
            id: building.id,
            name: building.name,
            kind: building.kind,
            planet_id: building.planet_id,
            level: building.level,
        }
    }
}

/// `POST /buildings` - Constructs a building on one of the caller's planets.
///
/// The store assigns the level, one above the planet's current maximum.
async fn create_building<S: DataStore>(
    State(state): State<Arc<AppState<S>>>,
    CurrentUser(principal): CurrentUser,
    ApiJson(body): ApiJson<CreateBuildingRequest>,
) -> ApiResult<Json<BuildingResponse>> {
    let caller = caller_id(&principal)?;
    let owned = state.storage.planet_owned_by(body.planet_id, caller).await?;
    if !owned {
        return Err(ApiError::not_found(
            "Planet not found or not owned by the user",
        ));
    }
    let building = state
        .storage
        .create_building(BuildingRecord {
            id: Uuid::new_v4(),
            name: body.name,
            kind: body.kind,
            planet_id: body.planet_id,
            level: 0,
        })
        .await?;
    Ok(Json(building.into()))
}

/// `GET /buildings` - Lists buildings across all of the caller's planets.
async fn list_buildings<S: DataStore>(
    State(state): State<Arc<AppState<S>>>,
    CurrentUser(principal): CurrentUser,
) -> ApiResult<Json<Vec<BuildingResponse>>> {
    let caller = caller_id(&principal)?;
    let buildings = state.storage.list_buildings_for_owner(caller).await?;
    Ok(Json(
        buildings.into_iter().map(BuildingResponse::from).collect(),
    ))
}

/// `GET /buildings/:building_id` - Returns one building.
///
/// Foreign buildings are indistinguishable from absent ones.
async fn get_building<S: DataStore>(
    State(state): State<Arc<AppState<S>>>,
    CurrentUser(principal): CurrentUser,
    Path(building_id): Path<String>,
) -> ApiResult<Json<BuildingResponse>> {
    let caller = caller_id(&principal)?;
    let building_id = parse_uuid(&building_id)?;
    let building = state
        .storage
        .get_building_for_owner(building_id, caller)
        .await?;
    Ok(Json(building.into()))
}

/// `PUT /buildings/:building_id` - Upgrades a building one level.
async fn upgrade_building<S: DataStore>(
    State(state): State<Arc<AppState<S>>>,
    CurrentUser(principal): CurrentUser,
    Path(building_id): Path<String>,
) -> ApiResult<Json<MessageResponse>> {
    let caller = caller_id(&principal)?;
    let building_id = parse_uuid(&building_id)?;
    let new_level = state.storage.upgrade_building(building_id, caller).await?;
    Ok(Json(MessageResponse::new(format!(
        "Building upgraded to level {new_level} successfully"
    ))))
}

/// `DELETE /buildings/:building_id` - Demolishes a building.
async fn delete_building<S: DataStore>(
    State(state): State<Arc<AppState<S>>>,
    CurrentUser(principal): CurrentUser,
    Path(building_id): Path<String>,
) -> ApiResult<Json<MessageResponse>> {
    let caller = caller_id(&principal)?;
    let building_id = parse_uuid(&building_id)?;
    state.storage.delete_building(building_id, caller).await?;
    Ok(Json(MessageResponse::new("Building deleted successfully")))
}

// ============================================================
// User Buildings
// ============================================================

/// Request body for creating or updating a user building.
#[derive(Debug, Deserialize)]
pub struct UserBuildingRequest {
    pub name: String,
    pub planet_id: Uuid,
    #[serde(default = "default_building_level")]
    pub level: i32,
}

fn default_building_level() -> i32 {
    1
}

/// User building view.
#[derive(Debug, Serialize)]
pub struct UserBuildingResponse {
    pub id: Uuid,
    pub name: String,
    pub planet_id: Uuid,
    pub level: i32,
    pub user_id: Uuid,
}

impl From<UserBuildingRecord> for UserBuildingResponse {
    fn from(building: UserBuildingRecord) -> Self {
        Self {
            id: building.id,
            name: building.name,
            planet_id: building.planet_id,
            level: building.level,
            user_id: building.user_id,
        }
    }
}

/// `POST /user-buildings` - Creates a user building on one of the caller's
/// planets. Unlike planet buildings, the caller picks the level.
async fn create_user_building<S: DataStore>(
    State(state): State<Arc<AppState<S>>>,
    CurrentUser(principal): CurrentUser,
    ApiJson(body): ApiJson<UserBuildingRequest>,
) -> ApiResult<Json<UserBuildingResponse>> {
    let caller = caller_id(&principal)?;
    let owned = state.storage.planet_owned_by(body.planet_id, caller).await?;
    if !owned {
        return Err(ApiError::not_found(
            "Planet not found or not owned by the user",
        ));
    }
    let building = state
        .storage
        .create_user_building(UserBuildingRecord {
            id: Uuid::new_v4(),
            name: body.name,
            planet_id: body.planet_id,
            level: body.level,
            user_id: caller,
        })
        .await?;
    Ok(Json(building.into()))
}

/// `GET /user-buildings` - Lists the caller's user buildings.
async fn list_user_buildings<S: DataStore>(
    State(state): State<Arc<AppState<S>>>,
    CurrentUser(principal): CurrentUser,
) -> ApiResult<Json<Vec<UserBuildingResponse>>> {
    let caller = caller_id(&principal)?;
    let buildings = state.storage.list_user_buildings(caller).await?;
    Ok(Json(
        buildings
            .into_iter()
            .map(UserBuildingResponse::from)
            .collect(),
    ))
}

/// `GET /user-buildings/:user_building_id` - Returns one user building.
///
/// Existence is visible to any authenticated user; the content is not.
async fn get_user_building<S: DataStore>(
    State(state): State<Arc<AppState<S>>>,
    CurrentUser(principal): CurrentUser,
    Path(user_building_id): Path<String>,
) -> ApiResult<Json<UserBuildingResponse>> {
    let caller = caller_id(&principal)?;
    let user_building_id = parse_uuid(&user_building_id)?;
    let building = state.storage.get_user_building(user_building_id).await?;
    if building.user_id != caller {
        return Err(ApiError::forbidden("Unauthorized to view this building"));
    }
    Ok(Json(building.into()))
}

/// `PUT /user-buildings/:user_building_id` - Updates a user building's name
/// and level. The building cannot move to another planet.
async fn update_user_building<S: DataStore>(
    State(state): State<Arc<AppState<S>>>,
    CurrentUser(principal): CurrentUser,
    Path(user_building_id): Path<String>,
    ApiJson(body): ApiJson<UserBuildingRequest>,
) -> ApiResult<Json<MessageResponse>> {
    let caller = caller_id(&principal)?;
    let user_building_id = parse_uuid(&user_building_id)?;
    let building = state.storage.get_user_building(user_building_id).await?;
    if building.user_id != caller {
        return Err(ApiError::forbidden(
            "Unauthorized to update this user building",
        ));
    }
    state
        .storage
        .update_user_building(user_building_id, &body.name, body.level)
        .await?;
    Ok(Json(MessageResponse::new(
        "User building updated successfully",
    )))
}

/// `DELETE /user-buildings/:user_building_id` - Deletes a user building.
async fn delete_user_building<S: DataStore>(
    State(state): State<Arc<AppState<S>>>,
    CurrentUser(principal): CurrentUser,
    Path(user_building_id): Path<String>,
) -> ApiResult<Json<MessageResponse>> {
    let caller = caller_id(&principal)?;
    let user_building_id = parse_uuid(&user_building_id)?;
    let building = state.storage.get_user_building(user_building_id).await?;
    if building.user_id != caller {
        return Err(ApiError::forbidden(
            "Unauthorized to delete this user building",
        ));
    }
    state.storage.delete_user_building(user_building_id).await?;
    Ok(Json(MessageResponse::new(
        "User building deleted successfully",
    )))
}

// ============================================================
// Fleets
// ============================================================

/// Request body for creating or updating a fleet.
#[derive(Debug, Deserialize)]
pub struct FleetRequest {
    pub planet_id: Uuid,
    pub ships: HashMap<String, u64>,
    pub name: String,
}

/// Fleet view.
#[derive(Debug, Serialize)]
pub struct FleetResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub planet_id: Uuid,
    pub ships: HashMap<String, u64>,
    pub name: String,
}

impl From<FleetRecord> for FleetResponse {
    fn from(fleet: FleetRecord) -> Self {
        Self {
            id: fleet.id,
            user_id: fleet.user_id,
            planet_id: fleet.planet_id,
            ships: fleet.ships,
            name: fleet.name,
        }
    }
}

/// `POST /user-fleets` - Stations a new fleet at one of the caller's planets.
async fn create_fleet<S: DataStore>(
    State(state): State<Arc<AppState<S>>>,
    CurrentUser(principal): CurrentUser,
    ApiJson(body): ApiJson<FleetRequest>,
) -> ApiResult<Json<FleetResponse>> {
    let caller = caller_id(&principal)?;
    let owned = state.storage.planet_owned_by(body.planet_id, caller).await?;
    if !owned {
        return Err(ApiError::not_found(
            "Planet not found or not owned by the user",
        ));
    }
    let fleet = state
        .storage
        .create_fleet(FleetRecord {
            id: Uuid::new_v4(),
            user_id: caller,
            planet_id: body.planet_id,
            ships: body.ships,
            name: body.name,
        })
        .await?;
    Ok(Json(fleet.into()))
}

/// `GET /user-fleets` - Lists the caller's fleets.
async fn list_fleets<S: DataStore>(
    State(state): State<Arc<AppState<S>>>,
    CurrentUser(principal): CurrentUser,
) -> ApiResult<Json<Vec<FleetResponse>>> {
    let caller = caller_id(&principal)?;
    let fleets = state.storage.list_fleets(caller).await?;
    Ok(Json(fleets.into_iter().map(FleetResponse::from).collect()))
}

/// `GET /user-fleets/:fleet_id` - Returns one fleet.
async fn get_fleet<S: DataStore>(
    State(state): State<Arc<AppState<S>>>,
    CurrentUser(principal): CurrentUser,
    Path(fleet_id): Path<String>,
) -> ApiResult<Json<FleetResponse>> {
    let caller = caller_id(&principal)?;
    let fleet_id = parse_uuid(&fleet_id)?;
    let fleet = state.storage.get_fleet(fleet_id).await?;
    if fleet.user_id != caller {
        return Err(ApiError::forbidden("Unauthorized to view this fleet"));
    }
    Ok(Json(fleet.into()))
}

/// `PUT /user-fleets/:fleet_id` - Restations a fleet and replaces its ships.
async fn update_fleet<S: DataStore>(
    State(state): State<Arc<AppState<S>>>,
    CurrentUser(principal): CurrentUser,
    Path(fleet_id): Path<String>,
    ApiJson(body): ApiJson<FleetRequest>,
) -> ApiResult<Json<MessageResponse>> {
    let caller = caller_id(&principal)?;
    let fleet_id = parse_uuid(&fleet_id)?;
    let fleet = state.storage.get_fleet(fleet_id).await?;
    if fleet.user_id != caller {
        return Err(ApiError::forbidden("Unauthorized to update this fleet"));
    }
    state
        .storage
        .update_fleet(fleet_id, body.planet_id, body.ships, &body.name)
        .await?;
    Ok(Json(MessageResponse::new("User fleet updated successfully")))
}

/// `DELETE /user-fleets/:fleet_id` - Disbands a fleet.
async fn delete_fleet<S: DataStore>(
    State(state): State<Arc<AppState<S>>>,
    CurrentUser(principal): CurrentUser,
    Path(fleet_id): Path<String>,
) -> ApiResult<Json<MessageResponse>> {
    let caller = caller_id(&principal)?;
    let fleet_id = parse_uuid(&fleet_id)?;
    let fleet = state.storage.get_fleet(fleet_id).await?;
    if fleet.user_id != caller {
        return Err(ApiError::forbidden("Unauthorized to delete this fleet"));
    }
    state.storage.delete_fleet(fleet_id).await?;
    Ok(Json(MessageResponse::new("User fleet deleted successfully")))
}

// ============================================================
// Battles
// ============================================================

/// Request body for starting a battle between two fleets.
#[derive(Debug, Deserialize)]
pub struct BattleRequest {
    pub attacker_fleet_id: Uuid,
    pub defender_fleet_id: Uuid,
}

/// `POST /battles` - Resolves a battle between the caller's fleet and a
/// defending fleet, persisting the outcome.
async fn start_battle<S: DataStore>(
    State(state): State<Arc<AppState<S>>>,
    CurrentUser(principal): CurrentUser,
    ApiJson(body): ApiJson<BattleRequest>,
) -> ApiResult<Json<BattleOutcome>> {
    let caller = caller_id(&principal)?;
    let outcome = state
        .battles
        .engage(EngageRequest {
            caller_id: caller,
            attacker_fleet_id: body.attacker_fleet_id,
            defender_fleet_id: body.defender_fleet_id,
        })
        .await
        .map_err(engage_error_to_api_error)?;

    let winner = if outcome.winner_id == outcome.attacker_id {
        "attacker"
    } else {
        "defender"
    };
    metrics::counter!("dominion_battles_total", "outcome" => winner).increment(1);

    Ok(Json(outcome))
}
