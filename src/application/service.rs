use crate::auth::{PasswordHasher, TokenSigner};
use crate::storage::Repository;

use super::{AccountService, AppError, FeedbackService, OrderService, WalletService};

/// Application facade wiring every service to one injected store handle.
/// This is the primary interface for any client (HTTP API, CLI, tests).
#[derive(Clone)]
pub struct LaundryService {
    repo: Repository,
    wallet: WalletService,
    orders: OrderService,
    accounts: AccountService,
    feedback: FeedbackService,
}

impl LaundryService {
    /// Create the services over an existing repository.
    pub fn new(repo: Repository, hasher: PasswordHasher, tokens: TokenSigner) -> Self {
        let wallet = WalletService::new(repo.clone());
        Self {
            orders: OrderService::new(repo.clone(), wallet.clone()),
            accounts: AccountService::new(repo.clone(), hasher, tokens),
            feedback: FeedbackService::new(repo.clone()),
            wallet,
            repo,
        }
    }

    /// Initialize a new database at the given path.
    pub async fn init(database_path: &str, tokens: TokenSigner) -> Result<Self, AppError> {
        let repo = Repository::init(&database_url(database_path)).await?;
        Ok(Self::new(repo, PasswordHasher::default(), tokens))
    }

    /// Connect to an existing database.
    pub async fn connect(database_path: &str, tokens: TokenSigner) -> Result<Self, AppError> {
        let repo = Repository::connect(&database_url(database_path)).await?;
        Ok(Self::new(repo, PasswordHasher::default(), tokens))
    }

    /// Release the store handle.
    pub async fn close(&self) {
        self.repo.close().await;
    }

    pub fn wallet(&self) -> &WalletService {
        &self.wallet
    }

    pub fn orders(&self) -> &OrderService {
        &self.orders
    }

    pub fn accounts(&self) -> &AccountService {
        &self.accounts
    }

    pub fn feedback(&self) -> &FeedbackService {
        &self.feedback
    }

    pub fn repository(&self) -> &Repository {
        &self.repo
    }
}

fn database_url(database_path: &str) -> String {
    if database_path.starts_with("sqlite:") {
        database_path.to_string()
    } else {
        format!("sqlite:{}", database_path)
    }
}
