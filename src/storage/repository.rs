use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::domain::{
    Account, AccountId, ContactSnapshot, Feedback, LedgerEntry, Order, OrderId, OrderStatus,
    Paise, PaymentMethod, Recommend, ServiceType, TransactionKind,
};

use super::MIGRATION_001_INITIAL;

/// How long a writer waits for the SQLite write lock before giving up.
const BUSY_TIMEOUT: Duration = Duration::from_secs(10);

/// A balance mutation ready to be committed: the compare-and-swap target plus
/// the ledger entry recording it.
#[derive(Debug, Clone)]
pub struct BalanceChange<'a> {
    pub account_id: AccountId,
    /// Version the new balance was computed from
    pub expected_version: i64,
    pub new_balance: Paise,
    pub entry: &'a LedgerEntry,
}

/// Stored wallet state of one account, used for reconciliation.
#[derive(Debug, Clone, Copy)]
pub struct WalletState {
    pub account_id: AccountId,
    pub balance: Paise,
    pub version: i64,
}

/// Profile fields to overwrite; `None` keeps the stored value.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub password_hash: Option<String>,
}

/// Repository for persisting and querying accounts, ledger entries, orders and feedback.
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given SQLite connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to an existing SQLite database.
    pub async fn connect(database_url: &str) -> Result<Self> {
        Self::open(database_url, false).await
    }

    async fn open(database_url: &str, create: bool) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .context("Invalid database URL")?
            .create_if_missing(create)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(BUSY_TIMEOUT)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .connect_with(options)
            .await
            .context("Failed to connect to database")?;
        Ok(Self::new(pool))
    }

    /// Run database migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(MIGRATION_001_INITIAL)
            .execute(&self.pool)
            .await
            .context("Failed to run migration 001")?;

        Ok(())
    }

    /// Initialize a database (create if missing + migrate).
    pub async fn init(database_url: &str) -> Result<Self> {
        let repo = Self::open(database_url, true).await?;
        repo.migrate().await?;
        Ok(repo)
    }

    /// Close every pooled connection. Further queries will fail.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    // ========================
    // Account operations
    // ========================

    /// Save a new account to the database.
    pub async fn save_account(&self, account: &Account) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO accounts (id, name, email, phone, address, password_hash, wallet_balance, balance_version, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(account.id.to_string())
        .bind(&account.name)
        .bind(&account.email)
        .bind(&account.phone)
        .bind(&account.address)
        .bind(&account.password_hash)
        .bind(account.wallet_balance)
        .bind(account.balance_version)
        .bind(timestamp(&account.created_at))
        .execute(&self.pool)
        .await
        .context("Failed to save account")?;
        Ok(())
    }

    /// Get an account by ID.
    pub async fn get_account(&self, id: AccountId) -> Result<Option<Account>> {
        let row = sqlx::query(
            r#"
            SELECT id, name, email, phone, address, password_hash, wallet_balance, balance_version, created_at
            FROM accounts
            WHERE id = ?
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch account")?;

        row.as_ref().map(Self::row_to_account).transpose()
    }

    /// Get an account by its (normalized) email.
    pub async fn get_account_by_email(&self, email: &str) -> Result<Option<Account>> {
        let row = sqlx::query(
            r#"
            SELECT id, name, email, phone, address, password_hash, wallet_balance, balance_version, created_at
            FROM accounts
            WHERE email = ?
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch account by email")?;

        row.as_ref().map(Self::row_to_account).transpose()
    }

    /// Overwrite the profile fields that are set. Never touches the wallet.
    pub async fn update_profile(&self, id: AccountId, update: &ProfileUpdate) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE accounts
            SET name = COALESCE(?, name),
                phone = COALESCE(?, phone),
                address = COALESCE(?, address),
                password_hash = COALESCE(?, password_hash)
            WHERE id = ?
            "#,
        )
        .bind(&update.name)
        .bind(&update.phone)
        .bind(&update.address)
        .bind(&update.password_hash)
        .bind(id.to_string())
        .execute(&self.pool)
        .await
        .context("Failed to update profile")?;
        Ok(())
    }

    /// Wallet state of every account, for reconciliation.
    pub async fn list_wallet_states(&self) -> Result<Vec<WalletState>> {
        let rows = sqlx::query(
            "SELECT id, wallet_balance, balance_version FROM accounts ORDER BY created_at",
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to list wallet states")?;

        rows.iter()
            .map(|row| {
                let id_str: String = row.get("id");
                Ok(WalletState {
                    account_id: Uuid::parse_str(&id_str).context("Invalid account ID")?,
                    balance: row.get("wallet_balance"),
                    version: row.get("balance_version"),
                })
            })
            .collect()
    }

    fn row_to_account(row: &SqliteRow) -> Result<Account> {
        let id_str: String = row.get("id");
        let created_at_str: String = row.get("created_at");

        Ok(Account {
            id: Uuid::parse_str(&id_str).context("Invalid account ID")?,
            name: row.get("name"),
            email: row.get("email"),
            phone: row.get("phone"),
            address: row.get("address"),
            password_hash: row.get("password_hash"),
            wallet_balance: row.get("wallet_balance"),
            balance_version: row.get("balance_version"),
            created_at: parse_timestamp(&created_at_str).context("Invalid created_at timestamp")?,
        })
    }

    // ========================
    // Wallet operations
    // ========================

    /// Atomically apply a balance change, append its ledger entry and, when
    /// given, persist the order it pays for.
    ///
    /// The balance write is a compare-and-swap on `balance_version`. Returns
    /// `false` without writing anything when the version has moved on.
    pub async fn commit_balance_change(
        &self,
        change: &BalanceChange<'_>,
        order: Option<&Order>,
    ) -> Result<bool> {
        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin wallet transaction")?;

        let updated = sqlx::query(
            r#"
            UPDATE accounts
            SET wallet_balance = ?, balance_version = balance_version + 1
            WHERE id = ? AND balance_version = ?
            "#,
        )
        .bind(change.new_balance)
        .bind(change.account_id.to_string())
        .bind(change.expected_version)
        .execute(&mut *tx)
        .await
        .context("Failed to update wallet balance")?
        .rows_affected();

        if updated == 0 {
            tx.rollback()
                .await
                .context("Failed to roll back wallet transaction")?;
            return Ok(false);
        }

        Self::insert_entry(&mut tx, change.entry).await?;
        if let Some(order) = order {
            Self::insert_order(&mut tx, order).await?;
        }

        tx.commit()
            .await
            .context("Failed to commit wallet transaction")?;
        Ok(true)
    }

    async fn insert_entry(
        tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
        entry: &LedgerEntry,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO transactions (id, account_id, sequence, kind, amount, description, method, balance_after, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(entry.id.to_string())
        .bind(entry.account_id.to_string())
        .bind(entry.sequence)
        .bind(entry.kind.as_str())
        .bind(entry.amount)
        .bind(&entry.description)
        .bind(entry.method.as_str())
        .bind(entry.balance_after)
        .bind(timestamp(&entry.created_at))
        .execute(&mut **tx)
        .await
        .context("Failed to append ledger entry")?;
        Ok(())
    }

    /// All ledger entries of an account in commit order.
    pub async fn list_entries(&self, account_id: AccountId) -> Result<Vec<LedgerEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT id, account_id, sequence, kind, amount, description, method, balance_after, created_at
            FROM transactions
            WHERE account_id = ?
            ORDER BY sequence
            "#,
        )
        .bind(account_id.to_string())
        .fetch_all(&self.pool)
        .await
        .context("Failed to list ledger entries")?;

        rows.iter().map(Self::row_to_entry).collect()
    }

    /// The most recent ledger entries of an account, newest first.
    pub async fn recent_entries(
        &self,
        account_id: AccountId,
        limit: usize,
    ) -> Result<Vec<LedgerEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT id, account_id, sequence, kind, amount, description, method, balance_after, created_at
            FROM transactions
            WHERE account_id = ?
            ORDER BY sequence DESC
            LIMIT ?
            "#,
        )
        .bind(account_id.to_string())
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list recent ledger entries")?;

        rows.iter().map(Self::row_to_entry).collect()
    }

    fn row_to_entry(row: &SqliteRow) -> Result<LedgerEntry> {
        let id_str: String = row.get("id");
        let account_id_str: String = row.get("account_id");
        let kind_str: String = row.get("kind");
        let method_str: String = row.get("method");
        let created_at_str: String = row.get("created_at");

        Ok(LedgerEntry {
            id: Uuid::parse_str(&id_str).context("Invalid entry ID")?,
            account_id: Uuid::parse_str(&account_id_str).context("Invalid account ID")?,
            sequence: row.get("sequence"),
            kind: TransactionKind::from_str(&kind_str)
                .ok_or_else(|| anyhow::anyhow!("Invalid transaction kind: {}", kind_str))?,
            amount: row.get("amount"),
            description: row.get("description"),
            method: PaymentMethod::from_str(&method_str)
                .ok_or_else(|| anyhow::anyhow!("Invalid payment method: {}", method_str))?,
            balance_after: row.get("balance_after"),
            created_at: parse_timestamp(&created_at_str).context("Invalid created_at timestamp")?,
        })
    }

    // ========================
    // Order operations
    // ========================

    /// Save an order that involves no wallet movement.
    pub async fn save_order(&self, order: &Order) -> Result<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin order transaction")?;
        Self::insert_order(&mut tx, order).await?;
        tx.commit()
            .await
            .context("Failed to commit order transaction")?;
        Ok(())
    }

    async fn insert_order(
        tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
        order: &Order,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO orders (id, account_id, name, phone, address, pickup_date, pickup_time, service_type, weight, express, total_amount, payment_method, status, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(order.id.to_string())
        .bind(order.account_id.to_string())
        .bind(&order.contact.name)
        .bind(&order.contact.phone)
        .bind(&order.contact.address)
        .bind(order.pickup_date.to_string())
        .bind(&order.pickup_time)
        .bind(order.service_type.as_str())
        .bind(order.weight)
        .bind(order.express)
        .bind(order.total_amount)
        .bind(order.payment_method.as_str())
        .bind(order.status.as_str())
        .bind(timestamp(&order.created_at))
        .execute(&mut **tx)
        .await
        .context("Failed to save order")?;
        Ok(())
    }

    /// Get an order by ID.
    pub async fn get_order(&self, id: OrderId) -> Result<Option<Order>> {
        let row = sqlx::query(
            r#"
            SELECT id, account_id, name, phone, address, pickup_date, pickup_time, service_type, weight, express, total_amount, payment_method, status, created_at
            FROM orders
            WHERE id = ?
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch order")?;

        row.as_ref().map(Self::row_to_order).transpose()
    }

    /// All orders of an account, newest first.
    pub async fn list_orders(&self, account_id: AccountId) -> Result<Vec<Order>> {
        let rows = sqlx::query(
            r#"
            SELECT id, account_id, name, phone, address, pickup_date, pickup_time, service_type, weight, express, total_amount, payment_method, status, created_at
            FROM orders
            WHERE account_id = ?
            ORDER BY created_at DESC, rowid DESC
            "#,
        )
        .bind(account_id.to_string())
        .fetch_all(&self.pool)
        .await
        .context("Failed to list orders")?;

        rows.iter().map(Self::row_to_order).collect()
    }

    fn row_to_order(row: &SqliteRow) -> Result<Order> {
        let id_str: String = row.get("id");
        let account_id_str: String = row.get("account_id");
        let pickup_date_str: String = row.get("pickup_date");
        let service_str: String = row.get("service_type");
        let method_str: String = row.get("payment_method");
        let status_str: String = row.get("status");
        let created_at_str: String = row.get("created_at");

        Ok(Order {
            id: Uuid::parse_str(&id_str).context("Invalid order ID")?,
            account_id: Uuid::parse_str(&account_id_str).context("Invalid account ID")?,
            contact: ContactSnapshot {
                name: row.get("name"),
                phone: row.get("phone"),
                address: row.get("address"),
            },
            pickup_date: NaiveDate::parse_from_str(&pickup_date_str, "%Y-%m-%d")
                .context("Invalid pickup date")?,
            pickup_time: row.get("pickup_time"),
            service_type: ServiceType::from_str(&service_str)
                .ok_or_else(|| anyhow::anyhow!("Invalid service type: {}", service_str))?,
            weight: row.get("weight"),
            express: row.get::<i32, _>("express") != 0,
            total_amount: row.get("total_amount"),
            payment_method: PaymentMethod::from_str(&method_str)
                .ok_or_else(|| anyhow::anyhow!("Invalid payment method: {}", method_str))?,
            status: OrderStatus::from_str(&status_str)
                .ok_or_else(|| anyhow::anyhow!("Invalid order status: {}", status_str))?,
            created_at: parse_timestamp(&created_at_str).context("Invalid created_at timestamp")?,
        })
    }

    // ========================
    // Feedback operations
    // ========================

    /// Save new feedback.
    pub async fn save_feedback(&self, feedback: &Feedback) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO feedback (id, account_id, order_id, rating, comments, service_quality, recommend, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(feedback.id.to_string())
        .bind(feedback.account_id.to_string())
        .bind(feedback.order_id.map(|id| id.to_string()))
        .bind(i64::from(feedback.rating))
        .bind(&feedback.comments)
        .bind(feedback.service_quality.map(i64::from))
        .bind(feedback.recommend.as_str())
        .bind(timestamp(&feedback.created_at))
        .execute(&self.pool)
        .await
        .context("Failed to save feedback")?;
        Ok(())
    }

    /// All feedback of an account, newest first.
    pub async fn list_feedback(&self, account_id: AccountId) -> Result<Vec<Feedback>> {
        let rows = sqlx::query(
            r#"
            SELECT id, account_id, order_id, rating, comments, service_quality, recommend, created_at
            FROM feedback
            WHERE account_id = ?
            ORDER BY created_at DESC, rowid DESC
            "#,
        )
        .bind(account_id.to_string())
        .fetch_all(&self.pool)
        .await
        .context("Failed to list feedback")?;

        rows.iter().map(Self::row_to_feedback).collect()
    }

    fn row_to_feedback(row: &SqliteRow) -> Result<Feedback> {
        let id_str: String = row.get("id");
        let account_id_str: String = row.get("account_id");
        let order_id_str: Option<String> = row.get("order_id");
        let recommend_str: String = row.get("recommend");
        let created_at_str: String = row.get("created_at");
        let rating: i64 = row.get("rating");
        let service_quality: Option<i64> = row.get("service_quality");

        Ok(Feedback {
            id: Uuid::parse_str(&id_str).context("Invalid feedback ID")?,
            account_id: Uuid::parse_str(&account_id_str).context("Invalid account ID")?,
            order_id: order_id_str
                .map(|s| Uuid::parse_str(&s))
                .transpose()
                .context("Invalid order ID")?,
            rating: u8::try_from(rating).context("Invalid rating")?,
            comments: row.get("comments"),
            service_quality: service_quality
                .map(u8::try_from)
                .transpose()
                .context("Invalid service quality")?,
            recommend: Recommend::from_str(&recommend_str)
                .ok_or_else(|| anyhow::anyhow!("Invalid recommend value: {}", recommend_str))?,
            created_at: parse_timestamp(&created_at_str).context("Invalid created_at timestamp")?,
        })
    }
}

/// Fixed-width RFC 3339 so stored timestamps sort lexicographically.
fn timestamp(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(s)?.with_timezone(&Utc))
}
