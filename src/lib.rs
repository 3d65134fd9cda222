pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod resources;

use std::sync::Arc;
use actix_web::{web, HttpResponse};
use serde_json::Value;
use tracing::{info, warn};

pub use error::AppError;
pub type Result<T> = std::result::Result<T, AppError>;
pub use crate::config::Settings;

pub use auth::{Identity, TokenService};
pub use db::{DbOperations, DocumentStore, FirestoreStore, MemoryStore};

use crate::config::StoreBackend;

const INDEX_HTML: &str = include_str!("../templates/index.html");

/// Health check endpoint handler
/// Returns a JSON response with server status and timestamp
pub async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

pub async fn home() -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(INDEX_HTML)
}

/// Registers every route. Shared by the server binary and the HTTP tests.
pub fn configure(cfg: &mut web::ServiceConfig) {
    use auth::handlers::{login, signup, user_details};
    use resources::handlers::{get_plots, get_properties, submit_contact};

    // Malformed bodies and query strings get the same {"error": ...} shape as everything else.
    cfg.app_data(web::JsonConfig::default().error_handler(|err, _req| {
        AppError::ValidationError(err.to_string()).into()
    }))
    .app_data(web::QueryConfig::default().error_handler(|err, _req| {
        AppError::ValidationError(err.to_string()).into()
    }));

    cfg.route("/", web::get().to(home))
        .route("/health", web::get().to(health_check))
        .route("/login", web::post().to(login))
        .route("/signup", web::post().to(signup))
        .route("/contact", web::post().to(submit_contact))
        .route("/getplots", web::get().to(get_plots))
        .route("/getproperties", web::get().to(get_properties))
        .route("/protected/user-details", web::get().to(user_details));
}

/// A request field counts as present when it is truthy: not null, `false`,
/// zero, or an empty string, list or object. Any JSON type is accepted.
pub(crate) fn present(field: Option<Value>) -> Option<Value> {
    field.filter(|value| match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(true, |f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    })
}

/// Application state shared across all workers. Built once, never mutated.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Settings>,
    pub db: DbOperations,
    pub tokens: Arc<TokenService>,
}

impl AppState {
    pub fn new(config: Settings) -> Result<Self> {
        let store: Arc<dyn DocumentStore> = match config.store.backend {
            StoreBackend::Memory if config.environment == "test" => {
                info!("Using in-memory document store");
                Arc::new(MemoryStore::new())
            }
            StoreBackend::Memory => {
                warn!(
                    "Using in-memory document store in {}: all data is lost on restart",
                    config.environment
                );
                Arc::new(MemoryStore::new())
            }
            StoreBackend::Firestore => {
                info!("Using Firestore project {}", config.store.project_id);
                Arc::new(FirestoreStore::new(&config.store)?)
            }
        };

        Ok(Self::with_store(config, store))
    }

    pub fn with_store(config: Settings, store: Arc<dyn DocumentStore>) -> Self {
        let tokens = TokenService::new(
            &config.auth.jwt_secret,
            chrono::Duration::hours(config.auth.token_expiry_hours),
        );

        Self {
            config: Arc::new(config),
            db: DbOperations::new(store),
            tokens: Arc::new(tokens),
        }
    }
}
