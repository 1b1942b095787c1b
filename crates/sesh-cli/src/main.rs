use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use sesh_runner::{Config, Session, DEFAULT_STATE_FILE};

/// Run code against a session whose variables persist between invocations.
#[derive(Parser)]
#[command(name = "sesh", version)]
struct Cli {
    /// Code to run, or a path to a file containing code
    code: String,

    /// Snapshot file carrying the session between runs
    #[arg(long, default_value = DEFAULT_STATE_FILE)]
    state: String,

    /// Skip bindings the snapshot cannot represent instead of failing
    #[arg(long)]
    lenient: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let mut cfg = Config::new(PathBuf::from(
        shellexpand::tilde(&cli.state).to_string(),
    ));
    cfg.lenient = cli.lenient;

    let payload = resolve_payload(&cli.code)?;

    let session = Session::open(&cfg)?;
    session.run(&payload)
}

/// An argument naming an existing file is read as the payload; anything
/// else is the payload itself.
fn resolve_payload(arg: &str) -> Result<String> {
    let path = Path::new(arg);
    if path.is_file() {
        std::fs::read_to_string(path).with_context(|| format!("read {}", path.display()))
    } else {
        Ok(arg.to_string())
    }
}
