//! HTTP server for Courier.
//!
//! Wires the JSON API from `courier-api` to a [`SqliteStore`], guarded by
//! HTTP Basic authentication against the same store's user table.

pub mod auth;
pub mod error;

pub use error::Error;

use std::{path::PathBuf, sync::Arc};

use axum::{Router, middleware};
use chrono::Duration;
use courier_api::SharedMessenger;
use courier_core::delivery::{DEFAULT_ONLINE_WINDOW_SECS, Messenger};
use courier_store_sqlite::SqliteStore;
use serde::Deserialize;
use tower_http::trace::TraceLayer;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `COURIER_*` environment variables.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  pub host:               String,
  pub port:               u16,
  pub store_path:         PathBuf,
  /// Seconds after their last activity during which a user shows as online.
  #[serde(default = "default_online_window")]
  pub online_window_secs: i64,
}

fn default_online_window() -> i64 { DEFAULT_ONLINE_WINDOW_SECS }

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state for the auth layer and the API router.
#[derive(Clone)]
pub struct AppState {
  pub store:     Arc<SqliteStore>,
  pub messenger: SharedMessenger<SqliteStore>,
  pub config:    Arc<ServerConfig>,
}

impl AppState {
  pub fn new(store: SqliteStore, config: ServerConfig) -> Self {
    let store = Arc::new(store);
    let messenger = Messenger::new(Arc::clone(&store), Arc::clone(&store))
      .with_online_window(Duration::seconds(config.online_window_secs));
    Self {
      store,
      messenger: Arc::new(messenger),
      config: Arc::new(config),
    }
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the full application router: the API under `/api`, behind auth,
/// with request tracing on everything.
pub fn router(state: AppState) -> Router {
  let api = courier_api::api_router(state.messenger.clone())
    .layer(middleware::from_fn_with_state(state.clone(), auth::require_auth));

  Router::new()
    .nest("/api", api)
    .layer(TraceLayer::new_for_http())
}

// ─── Integration tests ────────────────────────────────────────────────────────
