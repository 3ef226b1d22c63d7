pub mod auth;
pub mod config;
pub mod db;
pub mod error;

use std::sync::Arc;
use std::time::Duration;
use sqlx::PgPool;
use actix_web::HttpResponse;
use tracing::info;

pub use error::{AppError, AuthError};
pub type Result<T> = std::result::Result<T, AppError>;
pub use config::Settings;

pub use auth::{AccessGuard, AccessPolicy, AuthService};
pub use db::{Account, CredentialStore, MemoryCredentialStore, PgCredentialStore};

/// Health check endpoint handler
/// Returns a JSON response with server status and timestamp
pub async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// Application state shared across all workers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Settings>,
    pub auth_service: Arc<AuthService>,
    pub policy: Arc<AccessPolicy>,
    pub db_pool: Option<Arc<PgPool>>,
}

impl AppState {
    /// Connects to PostgreSQL, applies migrations if configured, and wires
    /// the auth service on top of it.
    pub async fn new(config: Settings) -> Result<Self> {
        let store = PgCredentialStore::new_with_options(
            &config.database.url,
            config.database.max_connections,
            Duration::from_secs(config.database.acquire_timeout_secs),
        )
        .await?;

        if config.database.run_migrations {
            store.run_migrations().await?;
            info!("Database migrations applied");
        }

        let pool = store.pool().clone();
        let mut state = Self::with_store(config, Arc::new(store))?;
        state.db_pool = Some(pool);
        Ok(state)
    }

    /// Builds the state over an arbitrary credential store.
    pub fn with_store(config: Settings, store: Arc<dyn CredentialStore>) -> Result<Self> {
        let auth_service = AuthService::from_settings(store, &config)?;
        let policy = AccessPolicy::standard(config.session.cookie_name.clone());

        Ok(Self {
            config: Arc::new(config),
            auth_service: Arc::new(auth_service),
            policy: Arc::new(policy),
            db_pool: None,
        })
    }

    pub async fn shutdown(&self) -> Result<()> {
        if let Some(pool) = &self.db_pool {
            pool.close().await;
        }
        Ok(())
    }
}
