use anyhow::{Context, Result};
use chrono::Duration;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use crate::application::LaundryService;
use crate::auth::{DEFAULT_TOKEN_TTL_DAYS, TokenSigner};
use crate::config::{ServeArgs, ServerConfig};
use crate::domain::{Account, format_rupees, normalize_email};
use crate::http;

/// FreshClean - laundry booking service with wallet payments
#[derive(Parser)]
#[command(name = "freshclean")]
#[command(about = "Laundry booking API backed by a per-account wallet ledger")]
#[command(version)]
pub struct Cli {
    /// Database file path
    #[arg(short, long, env = "FRESHCLEAN_DATABASE", default_value = "freshclean.db")]
    pub database: String,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new database
    Init,

    /// Run the HTTP API
    Serve(ServeArgs),

    /// Show the wallet balance of an account
    Balance {
        /// Account email
        email: String,
    },

    /// List wallet ledger entries of an account, newest first
    Ledger {
        /// Account email
        email: String,

        /// Maximum number of entries to show
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Replay every wallet ledger and compare with the stored balances
    Check,
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        init_tracing(self.verbose);

        match self.command {
            Commands::Init => {
                let service = LaundryService::init(&self.database, offline_signer()?).await?;
                service.close().await;
                println!("Database initialized: {}", self.database);
            }

            Commands::Serve(args) => {
                let config = ServerConfig::from_args(&self.database, args)?;
                // Serving an empty path is the common first run
                let service =
                    LaundryService::init(&config.database, config.token_signer()?).await?;
                let listener = tokio::net::TcpListener::bind(config.bind)
                    .await
                    .with_context(|| format!("Failed to bind {}", config.bind))?;
                http::serve(listener, service, http::shutdown_signal()).await?;
            }

            Commands::Balance { email } => {
                let service = connect(&self.database).await?;
                let account = find_account(&service, &email).await?;
                println!(
                    "{} <{}>: ₹{}",
                    account.name,
                    account.email,
                    format_rupees(account.wallet_balance)
                );
            }

            Commands::Ledger { email, limit } => {
                let service = connect(&self.database).await?;
                run_ledger_command(&service, &email, limit).await?;
            }

            Commands::Check => {
                let service = connect(&self.database).await?;
                run_check_command(&service).await?;
            }
        }

        Ok(())
    }
}

/// Install the global subscriber. `RUST_LOG` wins unless `--verbose` is given.
pub fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("freshclean=debug,tower_http=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("freshclean=info"))
    };

    // A subscriber may already be installed (tests)
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Commands that never verify tokens still need a signer to build the service.
fn offline_signer() -> Result<TokenSigner> {
    TokenSigner::from_secret(
        &Uuid::new_v4().to_string(),
        Duration::days(DEFAULT_TOKEN_TTL_DAYS),
    )
    .context("Failed to derive token signing key")
}

async fn connect(database: &str) -> Result<LaundryService> {
    LaundryService::connect(database, offline_signer()?)
        .await
        .with_context(|| format!("Failed to open database '{}'. Run 'init' first?", database))
}

async fn find_account(service: &LaundryService, email: &str) -> Result<Account> {
    service
        .repository()
        .get_account_by_email(&normalize_email(email))
        .await?
        .with_context(|| format!("No account registered for '{}'", email))
}

async fn run_ledger_command(
    service: &LaundryService,
    email: &str,
    limit: Option<usize>,
) -> Result<()> {
    let account = find_account(service, email).await?;
    let mut entries = service.wallet().ledger(account.id).await?;
    entries.reverse();
    if let Some(limit) = limit {
        entries.truncate(limit);
    }

    if entries.is_empty() {
        println!("No transactions for {}.", account.email);
        return Ok(());
    }

    println!(
        "{:>5} {:<19} {:<7} {:>12} {:>12} {:<11} DESCRIPTION",
        "SEQ", "DATE", "TYPE", "AMOUNT", "BALANCE", "METHOD"
    );
    println!("{}", "-".repeat(94));
    for entry in &entries {
        println!(
            "{:>5} {:<19} {:<7} {:>12} {:>12} {:<11} {}",
            entry.sequence,
            entry.created_at.format("%Y-%m-%d %H:%M:%S"),
            entry.kind.as_str(),
            format_rupees(entry.amount),
            format_rupees(entry.balance_after),
            entry.method.as_str(),
            entry.description
        );
    }
    println!("{}", "-".repeat(94));
    println!("Balance: ₹{}", format_rupees(account.wallet_balance));

    Ok(())
}

async fn run_check_command(service: &LaundryService) -> Result<()> {
    println!("Checking wallet ledgers...\n");

    let reports = service.wallet().reconcile_all().await?;
    let mut issues = Vec::new();

    for report in &reports {
        if report.is_consistent() {
            continue;
        }
        if report.stored_balance != report.replayed_balance {
            issues.push(format!(
                "Account {}: stored balance {} but ledger replays to {}",
                report.account_id,
                format_rupees(report.stored_balance),
                format_rupees(report.replayed_balance)
            ));
        }
        if report.stored_version != report.entry_count {
            issues.push(format!(
                "Account {}: version {} but {} ledger entries",
                report.account_id, report.stored_version, report.entry_count
            ));
        }
        if let Some(sequence) = report.sequence_gap {
            issues.push(format!(
                "Account {}: ledger sequence broken at {}",
                report.account_id, sequence
            ));
        }
    }

    let entries: i64 = reports.iter().map(|r| r.entry_count).sum();
    println!("Accounts: {}", reports.len());
    println!("Entries:  {}", entries);
    println!();

    if issues.is_empty() {
        println!("All wallets are consistent.");
    } else {
        println!("Issues found:");
        for issue in &issues {
            println!("  - {}", issue);
        }
        anyhow::bail!("Wallet ledger check failed");
    }

    Ok(())
}
