//!
//! strata API server binary
//! ------------------------
//! Reads configuration from the environment (see `strata::config`); flags override it.

use anyhow::{Context, Result};
use clap::Parser;

use strata::config::{PatchPolicy, ServerConfig};

#[derive(Parser)]
#[command(name = "strata_server")]
#[command(about = "strata project API")]
struct Cli {
    /// HTTP port (env: STRATA_HTTP_PORT / PORT, default 8787)
    #[arg(long)]
    port: Option<u16>,

    /// Snapshot root, or "memory" (env: STRATA_DATA_DIR, default data)
    #[arg(long)]
    data_dir: Option<String>,

    /// Let PATCH create missing projects (env: STRATA_PATCH_UPSERT)
    #[arg(long)]
    patch_upsert: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    strata::logging::init_tracing();
    let cli = Cli::parse();

    let mut config = ServerConfig::from_env().context("invalid server configuration")?;
    if let Some(port) = cli.port {
        config.port = port;
    }
    if let Some(dir) = cli.data_dir.as_deref() {
        config.store = config.store.with_data_dir(dir);
    }
    if cli.patch_upsert {
        config.patch_policy = PatchPolicy::Upsert;
    }

    strata::server::run(config).await
}
