use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use rekey_config::Config;
use rekey_rotation::{ResetRequest, RotationWorkflow, WorkflowResult};
use rekey_secret::{Argon2Hasher, UuidGenerator};
use rekey_store::SqliteUserStore;

const DEFAULT_MAX_CONNECTIONS: u32 = 5;

/// Rekey - rotate API keys using out-of-band reset tokens
#[derive(Parser)]
#[command(name = "rekey")]
#[command(version, about, long_about = None)]
struct Cli {
  /// Path to the data directory (default: ~/.rekey)
  #[arg(long, global = true)]
  data_dir: Option<PathBuf>,

  /// Path to a JSON config file (default: <data-dir>/config.json, if present)
  #[arg(long, global = true)]
  config: Option<PathBuf>,

  #[command(subcommand)]
  command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
  /// Rotate an API key. Reads {"email", "token"} JSON from stdin.
  Reset,

  /// Apply database migrations
  Migrate,
}

fn main() -> Result<ExitCode> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::from_default_env())
    .with_writer(io::stderr)
    .init();

  let cli = Cli::parse();

  let data_dir = match cli.data_dir {
    Some(dir) => dir,
    None => dirs::home_dir()
      .context("could not determine home directory")?
      .join(".rekey"),
  };
  let config = load_config(cli.config.as_deref(), &data_dir)?;

  match cli.command {
    Some(Commands::Reset) => {
      let rt = tokio::runtime::Runtime::new()?;
      rt.block_on(reset(config, data_dir))
    }
    Some(Commands::Migrate) => {
      let rt = tokio::runtime::Runtime::new()?;
      rt.block_on(migrate(config, data_dir))?;
      Ok(ExitCode::SUCCESS)
    }
    None => {
      println!("rekey - use --help to see available commands");
      Ok(ExitCode::SUCCESS)
    }
  }
}

fn load_config(path: Option<&Path>, data_dir: &Path) -> Result<Config> {
  let path = match path {
    Some(path) => path.to_path_buf(),
    None => {
      let default = data_dir.join("config.json");
      if !default.exists() {
        return Ok(Config::default());
      }
      default
    }
  };

  Config::from_file(&path).with_context(|| format!("failed to load config: {}", path.display()))
}

async fn open_store(config: &Config, data_dir: &Path) -> Result<SqliteUserStore> {
  let url = match &config.database.url {
    Some(url) => url.clone(),
    None => {
      tokio::fs::create_dir_all(data_dir)
        .await
        .with_context(|| format!("failed to create data directory: {}", data_dir.display()))?;
      format!("sqlite://{}?mode=rwc", data_dir.join("rekey.db").display())
    }
  };
  let max_connections = config
    .database
    .max_connections
    .unwrap_or(DEFAULT_MAX_CONNECTIONS);

  SqliteUserStore::connect(&url, max_connections)
    .await
    .context("failed to open database")
}

async fn migrate(config: Config, data_dir: PathBuf) -> Result<()> {
  let store = open_store(&config, &data_dir).await?;
  store.migrate().await.context("failed to apply migrations")?;
  info!(data_dir = %data_dir.display(), "migrations_applied");
  Ok(())
}

async fn reset(config: Config, data_dir: PathBuf) -> Result<ExitCode> {
  let body = read_stdin()?;
  let request = match ResetRequest::from_json(&body) {
    Ok(request) => request,
    Err(e) => {
      warn!(kind = %e.kind(), error = %e, "rotation_rejected");
      return respond(&WorkflowResult::failure(e.public_messages()));
    }
  };

  let store = open_store(&config, &data_dir).await?;
  let hasher = Argon2Hasher::new(&config.hashing).context("invalid hashing parameters")?;
  let workflow = RotationWorkflow::new(Arc::new(store), Arc::new(hasher), Arc::new(UuidGenerator))
    .with_step_timeout(config.rotation.step_timeout());

  let cancel = CancellationToken::new();
  let ctrl_c = cancel.clone();
  tokio::spawn(async move {
    if tokio::signal::ctrl_c().await.is_ok() {
      ctrl_c.cancel();
    }
  });

  let result = workflow.run_with_cancel(request, cancel).await;
  respond(&result)
}

/// Print the response JSON; a failed rotation exits non-zero.
fn respond(result: &WorkflowResult) -> Result<ExitCode> {
  println!("{}", serde_json::to_string(result)?);

  if result.is_success() {
    Ok(ExitCode::SUCCESS)
  } else {
    Ok(ExitCode::FAILURE)
  }
}

fn read_stdin() -> Result<String> {
  let mut input = String::new();
  io::stdin()
    .read_to_string(&mut input)
    .context("failed to read request from stdin")?;
  Ok(input)
}
