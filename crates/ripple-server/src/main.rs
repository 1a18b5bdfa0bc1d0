//! ripple-server binary.
//!
//! Reads `config.toml` (or the path specified with `--config`), opens an
//! in-process SQLite store, registers a bulk fetcher for every entity kind in
//! the directory, and serves the activity stream API over HTTP.
//!
//! # Configuration keys
//!
//! | Key | Default | Meaning |
//! |-----|---------|---------|
//! | `host` / `port` | `127.0.0.1` / `8322` | Bind address |
//! | `store_path` | `ripple.db` | SQLite file (leading `~` expanded) |
//! | `announce_follows` | `true` | Dispatch "started following" actions |
//! | `fetch_relations` | `true` | Resolve entity references on streams |
//! | `prefetch_related` | `false` | Ask fetchers to eager-load nested data |
//! | `fetch_depth` | `0` | Nested eager-load depth |
//! | `entity_kinds` | `[]` | Kinds to register even before any entity exists |
//!
//! Every key can also be set through the environment with a `RIPPLE_` prefix.

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use clap::Parser;
use ripple_api::ApiState;
use ripple_core::resolve::ResolveOptions;
use ripple_store_sqlite::SqliteStore;
use serde::Deserialize;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Ripple activity stream server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,
}

fn default_host() -> String { "127.0.0.1".to_owned() }
fn default_port() -> u16 { 8322 }
fn default_store_path() -> PathBuf { PathBuf::from("ripple.db") }
fn default_true() -> bool { true }

/// Runtime server configuration, deserialised from `config.toml`.
#[derive(Deserialize, Clone)]
struct ServerConfig {
  #[serde(default = "default_host")]
  host:             String,
  #[serde(default = "default_port")]
  port:             u16,
  #[serde(default = "default_store_path")]
  store_path:       PathBuf,
  #[serde(default = "default_true")]
  announce_follows: bool,
  #[serde(default = "default_true")]
  fetch_relations:  bool,
  #[serde(default)]
  prefetch_related: bool,
  #[serde(default)]
  fetch_depth:      u32,
  /// Kinds registered even when the directory holds no entity of that kind
  /// yet, so references to them resolve instead of failing as unknown.
  #[serde(default)]
  entity_kinds:     Vec<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  // Load configuration.
  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(config::Environment::with_prefix("RIPPLE"))
    .build()
    .context("failed to read config file")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  // Expand `~` in store path.
  let store_path = expand_tilde(&server_cfg.store_path);

  // Open SQLite store.
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  // Register a bulk fetcher for every kind the directory knows about, plus
  // any kinds named explicitly in the configuration.
  let directory = store.entity_directory();
  let mut kinds = directory
    .kinds()
    .await
    .context("failed to list entity kinds")?;
  for kind in &server_cfg.entity_kinds {
    if !kinds.contains(kind) {
      kinds.push(kind.clone());
    }
  }
  let registry = directory.registry_for(&kinds);
  tracing::info!(kinds = ?kinds, "entity registry initialised");

  // Build application state.
  let state = ApiState {
    store:            Arc::new(store),
    registry:         Arc::new(registry),
    resolve:          ResolveOptions {
      fetch_relations:  server_cfg.fetch_relations,
      prefetch_related: server_cfg.prefetch_related,
      depth:            server_cfg.fetch_depth,
    },
    announce_follows: server_cfg.announce_follows,
  };

  let app = axum::Router::new()
    .nest("/api", ripple_api::api_router(state))
    .layer(TraceLayer::new_for_http());
  let address = format!("{}:{}", server_cfg.host, server_cfg.port);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
