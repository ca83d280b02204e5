//! AeroKV Server - HTTP front for the aerokv record engine.
//!
//! Each configured namespace is an in-memory [`Store`]; every request is a
//! JSON body in the same shape the engine's C ABI accepts.

mod config;
mod error;
mod handlers;
mod routes;

use crate::config::Config;
use aerokv_engine::{JsonCodec, Store};
use axum::Router;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// One store per namespace.
    pub stores: Arc<DashMap<String, Store>>,
    pub config: Arc<Config>,
    pub codec: JsonCodec,
}

impl AppState {
    pub fn new(config: Config, codec: JsonCodec) -> Self {
        let stores = DashMap::new();
        for namespace in &config.namespaces {
            stores.insert(namespace.clone(), Store::new(config.store_config(namespace)));
        }
        Self {
            stores: Arc::new(stores),
            config: Arc::new(config),
            codec,
        }
    }

    /// Run `f` against the store for `namespace`.
    ///
    /// The shard lock is held only for the duration of `f`.
    pub fn with_store<T>(
        &self,
        namespace: &str,
        f: impl FnOnce(&mut Store) -> aerokv_engine::Result<T>,
    ) -> aerokv_engine::Result<T> {
        let mut store = self
            .stores
            .get_mut(namespace)
            .ok_or_else(|| aerokv_engine::Error::NamespaceNotFound(namespace.to_string()))?;
        f(&mut store)
    }

    /// Drop expired records from every namespace.
    pub fn reap_expired(&self, now: aerokv_engine::Timestamp) -> usize {
        self.stores
            .iter_mut()
            .map(|mut store| store.reap_expired(now))
            .sum()
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "aerokv_server=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;
    let codec = JsonCodec::named(&config.serializer)?;

    tracing::info!("Starting AeroKV Server on {}:{}", config.host, config.port);
    tracing::info!(namespaces = ?config.namespaces, default_ttl = config.default_ttl, "Namespaces configured");

    let state = AppState::new(config.clone(), codec);

    if config.reap_interval_secs > 0 {
        tokio::spawn(reap_loop(
            state.clone(),
            Duration::from_secs(config.reap_interval_secs),
        ));
    }

    // Build router
    let app = Router::new()
        .merge(routes::create_routes())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state);

    // Start server
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Periodically sweep expired records so idle keys do not linger.
async fn reap_loop(state: AppState, every: Duration) {
    let mut interval = tokio::time::interval(every);
    loop {
        interval.tick().await;
        let reaped = state.reap_expired(handlers::now());
        if reaped > 0 {
            tracing::debug!(reaped, "Reaped expired records");
        }
    }
}
