//! courier server binary.
//!
//! Reads `config.toml` (or the path specified with `--config`), opens the
//! SQLite store, and serves the messaging API over HTTP. The remaining
//! subcommands seed the user directory for local use.
//!
//! ```sh
//! cargo run -p courier-server -- add-user alice
//! cargo run -p courier-server -- befriend alice bob
//! cargo run -p courier-server -- serve
//! ```

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use courier_server::{AppState, ServerConfig, auth::hash_password};
use courier_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Courier messaging server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
  /// Serve the HTTP API (the default).
  Serve,
  /// Register a user; the password is read from stdin.
  AddUser { username: String },
  /// Make two users mutual friends.
  Befriend { a: String, b: String },
  /// Record that `blocker` blocked `blocked`, dissolving any friendship.
  Block { blocker: String, blocked: String },
  /// Print the argon2 hash for a password entered on stdin and exit.
  HashPassword,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  match cli.command.unwrap_or(Command::Serve) {
    Command::Serve => {
      let (store, server_cfg) = open(&cli.config).await?;
      serve(store, server_cfg).await
    }
    Command::AddUser { username } => {
      let password = read_password()?;
      let hash = hash_password(&password).map_err(|e| anyhow::anyhow!("argon2 error: {e}"))?;
      let (store, _) = open(&cli.config).await?;
      let user = store
        .add_user(&username, Some(hash))
        .await
        .with_context(|| format!("failed to add user {username:?}"))?;
      tracing::info!(user_id = %user.user_id, username = %user.username, "user added");
      Ok(())
    }
    Command::Befriend { a, b } => {
      let (store, _) = open(&cli.config).await?;
      store
        .befriend(&a, &b)
        .await
        .with_context(|| format!("failed to befriend {a:?} and {b:?}"))?;
      tracing::info!(%a, %b, "friendship recorded");
      Ok(())
    }
    Command::Block { blocker, blocked } => {
      let (store, _) = open(&cli.config).await?;
      store
        .block(&blocker, &blocked)
        .await
        .with_context(|| format!("failed to record block of {blocked:?}"))?;
      tracing::info!(%blocker, %blocked, "block recorded");
      Ok(())
    }
    Command::HashPassword => {
      let password = read_password()?;
      let hash = hash_password(&password).map_err(|e| anyhow::anyhow!("argon2 error: {e}"))?;
      println!("{hash}");
      Ok(())
    }
  }
}

/// Load configuration and open the SQLite store it points at.
async fn open(config_path: &Path) -> anyhow::Result<(SqliteStore, ServerConfig)> {
  let server_cfg = load_config(config_path)?;

  let store_path = expand_tilde(&server_cfg.store_path);
  if let Some(parent) = store_path.parent()
    && !parent.as_os_str().is_empty()
  {
    std::fs::create_dir_all(parent)
      .with_context(|| format!("failed to create {parent:?}"))?;
  }

  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;
  Ok((store, server_cfg))
}

async fn serve(store: SqliteStore, server_cfg: ServerConfig) -> anyhow::Result<()> {
  let address = format!("{}:{}", server_cfg.host, server_cfg.port);
  let app = courier_server::router(AppState::new(store, server_cfg));

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

/// Layer the optional config file and `COURIER_*` environment variables over
/// built-in defaults.
fn load_config(path: &Path) -> anyhow::Result<ServerConfig> {
  let settings = config::Config::builder()
    .set_default("host", "127.0.0.1")?
    .set_default("port", 8080)?
    .set_default("store_path", "~/.local/share/courier/courier.db")?
    .add_source(config::File::from(path).required(false))
    .add_source(config::Environment::with_prefix("COURIER"))
    .build()
    .context("failed to read config file")?;

  settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")
}

/// Read a password from stdin.
fn read_password() -> anyhow::Result<String> {
  use std::io::{self, BufRead, Write};
  let stdin = io::stdin();
  print!("Password: ");
  io::stdout().flush().ok();
  let mut line = String::new();
  stdin.lock().read_line(&mut line)?;
  Ok(
    line
      .trim_end_matches('\n')
      .trim_end_matches('\r')
      .to_string(),
  )
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
