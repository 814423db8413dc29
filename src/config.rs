use std::net::SocketAddr;

use anyhow::{Context, Result, bail};
use clap::Args;
use tracing::warn;
use uuid::Uuid;

use crate::auth::{DEFAULT_TOKEN_TTL_DAYS, MAX_TOKEN_TTL_DAYS, TokenSigner};

pub const DEFAULT_BIND: &str = "127.0.0.1:5000";

/// Options of the `serve` command. Each falls back to an environment variable.
#[derive(Args, Debug, Clone)]
pub struct ServeArgs {
    /// Address to listen on
    #[arg(long, env = "FRESHCLEAN_BIND", default_value = DEFAULT_BIND)]
    pub bind: String,

    /// Secret the token signing key is derived from
    #[arg(long, env = "FRESHCLEAN_TOKEN_SECRET", hide_env_values = true)]
    pub token_secret: Option<String>,

    /// Token lifetime in days
    #[arg(long, env = "FRESHCLEAN_TOKEN_TTL_DAYS", default_value_t = DEFAULT_TOKEN_TTL_DAYS)]
    pub token_ttl_days: i64,
}

/// Resolved server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub database: String,
    pub bind: SocketAddr,
    pub token_secret: String,
    pub token_ttl_days: i64,
}

impl ServerConfig {
    pub fn from_args(database: &str, args: ServeArgs) -> Result<Self> {
        let bind: SocketAddr = args
            .bind
            .parse()
            .with_context(|| format!("Invalid bind address '{}'", args.bind))?;

        if !(1..=MAX_TOKEN_TTL_DAYS).contains(&args.token_ttl_days) {
            bail!(
                "Token lifetime must be between 1 and {} days, got {}",
                MAX_TOKEN_TTL_DAYS,
                args.token_ttl_days
            );
        }

        let token_secret = match args.token_secret.filter(|s| !s.is_empty()) {
            Some(secret) => secret,
            None => {
                warn!("No token secret configured; issued tokens will not survive a restart");
                Uuid::new_v4().simple().to_string()
            }
        };

        Ok(Self {
            database: database.to_string(),
            bind,
            token_secret,
            token_ttl_days: args.token_ttl_days,
        })
    }

    pub fn token_signer(&self) -> Result<TokenSigner> {
        let ttl = chrono::Duration::try_days(self.token_ttl_days)
            .context("Token lifetime is out of range")?;
        TokenSigner::from_secret(&self.token_secret, ttl)
            .context("Failed to derive token signing key")
    }
}
