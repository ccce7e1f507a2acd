//!
//! strata web frontend binary
//! --------------------------

use anyhow::{Context, Result};
use clap::Parser;

use strata::config::WebConfig;

#[derive(Parser)]
#[command(name = "strata_web")]
#[command(about = "Localized web pages over the strata API")]
struct Cli {
    /// HTTP port (env: STRATA_WEB_PORT, default 3000)
    #[arg(long)]
    port: Option<u16>,

    /// API base URL (env: STRATA_API_BASE)
    #[arg(long)]
    api_base: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    strata::logging::init_tracing();
    let cli = Cli::parse();

    let mut config = WebConfig::from_env().context("invalid web configuration")?;
    if let Some(port) = cli.port {
        config.port = port;
    }
    if let Some(base) = cli.api_base {
        config.api_base = base;
    }

    strata::web::run(config).await
}
