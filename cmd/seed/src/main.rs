//! # seed
//!
//! Developer tool: registers a principal in the configured SQLite database
//! and prints a bearer token for it.
//!
//! ```bash
//! TASKBOARD__AUTH__JWT_SECRET=... seed alice --superuser --role "Board admins"
//! ```

use anyhow::Context;
use auth_adapters::JwtIdentity;
use clap::Parser;
use configs::AppConfig;
use domains::{Principal, PrincipalDirectory};
use storage_adapters::SqliteStore;

#[derive(Parser)]
#[command(name = "seed")]
#[command(about = "Register a principal and print a bearer token for it")]
struct Cli {
    /// Display name of the principal
    username: String,

    /// Grant superuser status
    #[arg(long)]
    superuser: bool,

    /// Role labels carried in the token (repeatable)
    #[arg(long = "role")]
    roles: Vec<String>,

    /// Overrides `database.url` from configuration
    #[arg(long)]
    database_url: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load().context("failed to load configuration")?;
    tracing_subscriber::fmt().with_env_filter(config.log.filter.as_str()).with_writer(std::io::stderr).init();

    let url = cli.database_url.unwrap_or(config.database.url);
    let store = SqliteStore::open(&url, 1).await.with_context(|| format!("failed to open {url}"))?;

    let principal = if cli.superuser {
        Principal::superuser(cli.username)
    } else {
        Principal::new(cli.username)
    }
    .with_roles(cli.roles);
    store.upsert_principal(&principal).await?;

    let identity = JwtIdentity::new(&config.auth.jwt_secret, config.auth.issuer, config.auth.token_ttl_secs)?;
    let token = identity.issue(&principal)?;
    tracing::info!(principal = %principal.id, username = %principal.username, "principal registered");

    println!("{token}");
    Ok(())
}
