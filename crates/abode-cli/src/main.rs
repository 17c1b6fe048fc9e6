//! `abode` — command-line front end for the Abode address-history store.
//!
//! # Usage
//!
//! ```text
//! abode address add --line1 "1 High St" --town Exeter --postcode "EX1 1AA" \
//!   --country "United Kingdom" --start 2021-04-01
//! abode doc attach <ADDRESS_ID> ./council-tax.pdf
//! abode gaps
//! abode --data-dir /srv/abode gaps --from 2020-01-01 --to 2023-01-01
//! ```

mod commands;

use std::path::PathBuf;

use abode_store_fs::{FileStore, StoreConfig};
use anyhow::{Context, Result};
use clap::Parser;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use commands::Command;

const DEFAULT_DATA_DIR: &str = "~/.local/share/abode";

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "abode", version, about = "Residential address history and proof documents")]
struct Cli {
  /// Path to a TOML configuration file.
  #[arg(short, long, value_name = "FILE", default_value = "abode.toml")]
  config: PathBuf,

  /// Directory holding the snapshot and uploaded documents.
  #[arg(long, value_name = "DIR", env = "ABODE_DATA_DIR")]
  data_dir: Option<PathBuf>,

  #[command(subcommand)]
  command: Command,
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
  // Logs go to stderr; stdout carries command output.
  tracing_subscriber::fmt()
    .with_writer(std::io::stderr)
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let store_cfg = load_config(&cli)?;
  tracing::debug!(data_dir = %store_cfg.data_dir.display(), "using data directory");

  let store = FileStore::open(&store_cfg)
    .await
    .with_context(|| format!("failed to open store at {:?}", store_cfg.data_dir))?;

  commands::run(&store, cli.command).await
}

/// Layer defaults, the optional config file, `ABODE_*` environment variables
/// and the `--data-dir` flag, in increasing precedence.
fn load_config(cli: &Cli) -> Result<StoreConfig> {
  let settings = config::Config::builder()
    .set_default("data_dir", DEFAULT_DATA_DIR)?
    .add_source(config::File::from(cli.config.clone()).required(false))
    .add_source(config::Environment::with_prefix("ABODE"))
    .set_override_option(
      "data_dir",
      cli
        .data_dir
        .as_ref()
        .map(|p| p.to_string_lossy().into_owned()),
    )?
    .build()
    .context("failed to read configuration")?;

  let store_cfg: StoreConfig = settings
    .try_deserialize()
    .context("failed to deserialise store configuration")?;

  Ok(store_cfg.expand_home())
}
