//! `server`: receives identity-provider webhooks and mirrors users into
//! SQLite. Run with `--generate-token` to mint a value for `auth_token`.

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use clap::Parser;
use rand_core::{OsRng, RngCore};
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use usermirror_store_sqlite::SqliteStore;
use usermirror_webhook::{AppState, ServerConfig, auth::AuthConfig};

#[derive(Parser)]
#[command(author, version, about = "usermirror webhook receiver")]
struct Cli {
  /// TOML configuration file. Missing is fine if `USERMIRROR_*` covers it.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  /// Print a random 256-bit bearer token as hex and exit.
  #[arg(long)]
  generate_token: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  let cli = Cli::parse();
  if cli.generate_token {
    println!("{}", generate_token());
    return Ok(());
  }

  init_tracing();

  let cfg = load_config(&cli.config)?;
  let store_path = home_relative(&cfg.store_path);
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("cannot open user mirror at {}", store_path.display()))?;

  let app = usermirror_webhook::router(AppState {
    store: Arc::new(store),
    auth:  Arc::new(AuthConfig::new(cfg.auth_token.trim())),
  });

  let address = format!("{}:{}", cfg.host, cfg.port);
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("cannot bind {address}"))?;
  tracing::info!(%address, store = %store_path.display(), "accepting webhooks");

  axum::serve(listener, app).await.context("server error")
}

/// `RUST_LOG` wins; otherwise `info` and above.
fn init_tracing() {
  let filter = EnvFilter::builder()
    .with_default_directive(LevelFilter::INFO.into())
    .from_env_lossy();
  tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn generate_token() -> String {
  let mut secret = [0u8; 32];
  OsRng.fill_bytes(&mut secret);
  hex::encode(secret)
}

fn load_config(path: &Path) -> anyhow::Result<ServerConfig> {
  let file = config::File::from(path.to_path_buf()).required(false);
  let cfg = ServerConfig::from_builder(config::Config::builder().add_source(file))
    .with_context(|| format!("invalid configuration ({})", path.display()))?;
  anyhow::ensure!(!cfg.auth_token.trim().is_empty(), "auth_token must not be empty");
  Ok(cfg)
}

/// Resolve a leading `~` component against `$HOME`.
fn home_relative(path: &Path) -> PathBuf {
  match (path.strip_prefix("~"), std::env::var_os("HOME")) {
    (Ok(rest), Some(home)) => PathBuf::from(home).join(rest),
    _ => path.to_path_buf(),
  }
}
