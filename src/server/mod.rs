//! Hosted table API.
//!
//! Serves every bucket over REST and pushes a [`ChangeEvent`] to realtime
//! subscribers after each write. Records live in the same SQLite layout as
//! the client cache.
//!
//! # Config File Format
//!
//! ```yaml
//! api_keys:
//!   - key: "your-secret-key-here"
//!     client: "secretaria"
//! ```
//!
//! [`ChangeEvent`]: crate::remote::ChangeEvent

mod realtime;
mod tables;

pub use realtime::ChangeHub;

use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::db::{init_db, LocalStore};

/// API key entry in config
#[derive(Debug, Clone, Deserialize)]
struct ApiKeyEntry {
    key: String,
    client: String,
}

/// Config file structure
#[derive(Debug, Clone, Deserialize, Default)]
struct KeysFile {
    #[serde(default)]
    api_keys: Vec<ApiKeyEntry>,
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port to listen on
    pub port: u16,
    /// Directory holding the table database
    pub data_dir: PathBuf,
    /// Path to the API keys file
    pub config_path: PathBuf,
}

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let port = std::env::var("SKOLAI_SERVER_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(8080);

        let data_dir = std::env::var("SKOLAI_SERVER_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                dirs::data_dir()
                    .unwrap_or_else(|| PathBuf::from("."))
                    .join("skolai-server")
            });

        let config_path = std::env::var("SKOLAI_SERVER_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                dirs::config_dir()
                    .unwrap_or_else(|| PathBuf::from("."))
                    .join("skolai-server")
                    .join("config.yaml")
            });

        Self {
            port,
            data_dir,
            config_path,
        }
    }
}

#[derive(Debug)]
pub enum ServerError {
    Io(std::io::Error),
    Database(sqlx::Error),
}

impl std::fmt::Display for ServerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServerError::Io(e) => write!(f, "I/O error: {}", e),
            ServerError::Database(e) => write!(f, "Database error: {}", e),
        }
    }
}

impl std::error::Error for ServerError {}

impl From<std::io::Error> for ServerError {
    fn from(e: std::io::Error) -> Self {
        ServerError::Io(e)
    }
}

impl From<sqlx::Error> for ServerError {
    fn from(e: sqlx::Error) -> Self {
        ServerError::Database(e)
    }
}

/// Authenticated client, added to request extensions after auth
#[derive(Debug, Clone)]
pub struct AuthClient {
    pub name: String,
}

/// API key store - maps key -> AuthClient
#[derive(Debug, Clone, Default)]
pub struct ApiKeyStore {
    keys: HashMap<String, AuthClient>,
}

impl ApiKeyStore {
    /// Load API keys from config file. A missing or unreadable file yields
    /// an empty store.
    pub fn load(config_path: &Path) -> Self {
        let keys = match std::fs::read_to_string(config_path) {
            Ok(contents) => match serde_yaml::from_str::<KeysFile>(&contents) {
                Ok(config) => {
                    let map: HashMap<String, AuthClient> = config
                        .api_keys
                        .into_iter()
                        .map(|entry| (entry.key, AuthClient { name: entry.client }))
                        .collect();
                    tracing::info!("Loaded {} API key(s)", map.len());
                    map
                }
                Err(e) => {
                    tracing::warn!("Failed to parse config file: {}", e);
                    HashMap::new()
                }
            },
            Err(e) => {
                tracing::warn!(
                    "Failed to read config file {}: {}",
                    config_path.display(),
                    e
                );
                tracing::warn!("No API keys loaded - all authenticated requests will fail");
                HashMap::new()
            }
        };

        Self { keys }
    }

    pub fn with_key(mut self, key: impl Into<String>, client: impl Into<String>) -> Self {
        self.keys.insert(
            key.into(),
            AuthClient {
                name: client.into(),
            },
        );
        self
    }

    /// Validate an API key and return the associated client
    fn validate(&self, key: &str) -> Option<AuthClient> {
        self.keys.get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    store: LocalStore,
    hub: Arc<ChangeHub>,
    api_keys: Arc<ApiKeyStore>,
}

impl AppState {
    pub fn new(store: LocalStore, api_keys: ApiKeyStore) -> Self {
        Self {
            store,
            hub: Arc::new(ChangeHub::new()),
            api_keys: Arc::new(api_keys),
        }
    }
}

/// Error body returned by every failing endpoint
#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
}

fn error_response(status: StatusCode, error: &'static str, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorBody {
            error,
            message: message.into(),
        }),
    )
        .into_response()
}

/// Authentication middleware
async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let api_key = match auth_header.map(|h| h.strip_prefix("Bearer ")) {
        Some(Some(key)) => key,
        Some(None) => {
            return error_response(
                StatusCode::UNAUTHORIZED,
                "invalid_auth",
                "Authorization header must use Bearer scheme",
            );
        }
        None => {
            return error_response(
                StatusCode::UNAUTHORIZED,
                "missing_auth",
                "Authorization header required",
            );
        }
    };

    match state.api_keys.validate(api_key) {
        Some(client) => {
            request.extensions_mut().insert(client);
            next.run(request).await
        }
        None => error_response(StatusCode::UNAUTHORIZED, "invalid_key", "Invalid API key"),
    }
}

/// Health check response
#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

/// Health check endpoint (no auth required)
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Builds the full router.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new().route("/health", get(health));

    let protected_routes = Router::new()
        .route(
            "/rest/{table}",
            get(tables::select).post(tables::insert),
        )
        .route("/rest/{table}/count", get(tables::count))
        .route(
            "/rest/{table}/{id}",
            get(tables::fetch)
                .put(tables::upsert)
                .patch(tables::update)
                .delete(tables::remove),
        )
        .route("/realtime/{table}", get(realtime::subscribe))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Opens the database, loads keys and serves until the process exits.
pub async fn serve(config: ServerConfig) -> Result<(), ServerError> {
    std::fs::create_dir_all(&config.data_dir)?;
    tracing::info!("Data directory: {}", config.data_dir.display());
    tracing::info!("Config file: {}", config.config_path.display());

    let pool = init_db(&config.data_dir.join("tables.db")).await?;
    let api_keys = ApiKeyStore::load(&config.config_path);
    let app = router(AppState::new(LocalStore::new(pool), api_keys));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::remote::RemoteStore;
    use std::time::Duration;
    use tempfile::TempDir;

    pub const TEST_KEY: &str = "test-key";

    /// An in-process table API bound to an ephemeral port.
    pub struct TestServer {
        addr: SocketAddr,
        handle: tokio::task::JoinHandle<()>,
        _temp_dir: TempDir,
    }

    impl TestServer {
        pub fn base_url(&self) -> String {
            format!("http://{}", self.addr)
        }

        pub fn remote(&self) -> RemoteStore {
            RemoteStore::new(self.base_url(), TEST_KEY, Duration::from_secs(5)).unwrap()
        }
    }

    impl Drop for TestServer {
        fn drop(&mut self) {
            self.handle.abort();
        }
    }

    pub async fn spawn_server() -> TestServer {
        let temp_dir = TempDir::new().unwrap();
        let pool = init_db(&temp_dir.path().join("tables.db")).await.unwrap();
        let state = AppState::new(
            LocalStore::new(pool),
            ApiKeyStore::default().with_key(TEST_KEY, "tests"),
        );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = router(state);
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        TestServer {
            addr,
            handle,
            _temp_dir: temp_dir,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request as HttpRequest;
    use tempfile::TempDir;
    use tower::ServiceExt;

    async fn test_router() -> (Router, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let pool = init_db(&temp_dir.path().join("tables.db")).await.unwrap();
        let state = AppState::new(
            LocalStore::new(pool),
            ApiKeyStore::default().with_key("k", "tests"),
        );
        (router(state), temp_dir)
    }

    #[tokio::test]
    async fn test_health_needs_no_auth() {
        let (app, _dir) = test_router().await;
        let response = app
            .oneshot(HttpRequest::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_missing_auth_rejected() {
        let (app, _dir) = test_router().await;
        let response = app
            .oneshot(HttpRequest::get("/rest/students").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_basic_scheme_rejected() {
        let (app, _dir) = test_router().await;
        let response = app
            .oneshot(
                HttpRequest::get("/rest/students")
                    .header(header::AUTHORIZATION, "Basic k")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_unknown_table_is_not_found() {
        let (app, _dir) = test_router().await;
        let response = app
            .oneshot(
                HttpRequest::get("/rest/grades")
                    .header(header::AUTHORIZATION, "Bearer k")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_authenticated_writes_reach_handlers() {
        let (app, _dir) = test_router().await;
        let response = app
            .clone()
            .oneshot(
                HttpRequest::post("/rest/courses")
                    .header(header::AUTHORIZATION, "Bearer k")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"data":{"name":"7°A"}}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let created: crate::store::StoredRecord = serde_json::from_slice(&body).unwrap();

        let response = app
            .oneshot(
                HttpRequest::delete(format!("/rest/courses/{}", created.id))
                    .header(header::AUTHORIZATION, "Bearer k")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }

    #[test]
    fn test_api_key_store_load() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("keys.yaml");
        std::fs::write(
            &path,
            "api_keys:\n  - key: abc\n    client: secretaria\n  - key: def\n    client: kiosko\n",
        )
        .unwrap();

        let store = ApiKeyStore::load(&path);
        assert_eq!(store.len(), 2);
        assert_eq!(store.validate("def").unwrap().name, "kiosko");
        assert!(store.validate("zzz").is_none());
    }

    #[test]
    fn test_api_key_store_missing_file_is_empty() {
        let store = ApiKeyStore::load(Path::new("/nonexistent/keys.yaml"));
        assert!(store.is_empty());
    }
}
