//!
//! strata admin tool
//! -----------------
//! `seed` writes demo projects into the configured store; `token` mints a bearer
//! token with the configured credential.

use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};

use strata::config::AdminConfig;
use strata::identity::mint_token;
use strata::seed::{seed_projects, DEFAULT_COUNT};

#[derive(Parser)]
#[command(name = "strata_admin")]
#[command(about = "strata administration: seed demo data, mint tokens")]
struct Cli {
    /// Snapshot root, or "memory" (env: STRATA_DATA_DIR, default data)
    #[arg(long, global = true)]
    data_dir: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Insert demo projects in one batch
    Seed {
        #[arg(long, default_value_t = DEFAULT_COUNT)]
        count: usize,
    },
    /// Print a signed bearer token
    Token {
        #[arg(long)]
        subject: String,
        #[arg(long, default_value_t = 3600)]
        ttl_secs: u64,
    },
}

fn main() -> Result<()> {
    strata::logging::init_tracing();
    let cli = Cli::parse();
    let mut config = AdminConfig::from_env().context("invalid configuration")?;
    if let Some(dir) = cli.data_dir.as_deref() {
        config.store = config.store.with_data_dir(dir);
    }

    match cli.command {
        Command::Seed { count } => {
            let store = config.store.open().context("while opening the document store")?;
            let ids = seed_projects(&store, count).context("seeding failed")?;
            store.flush().context("flush failed")?;
            println!("Seeded {} projects", ids.len());
        }
        Command::Token { subject, ttl_secs } => {
            let credential = config
                .credential
                .ok_or_else(|| anyhow!("set STRATA_SERVICE_ACCOUNT or STRATA_TOKEN_SECRET to mint tokens"))?;
            let token = mint_token(&credential, &subject, Duration::from_secs(ttl_secs))?;
            println!("{token}");
        }
    }
    Ok(())
}
