use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::domain::{
    Agent, DelegatedAddress, Deployment, TelegramLink, TradingPreferences, WalletId,
    LAZY_TRADER_TAG,
};
use crate::error::{OnboardError, Result};
use crate::platform::IdentityStore;

/// PostgreSQL storage adapter
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Create a new PostgreSQL store
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;

        info!("Connected to PostgreSQL");
        Ok(Self { pool })
    }

    /// Create a PostgreSQL store from an existing connection pool
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Run migrations
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        info!("Database migrations completed");
        Ok(())
    }

    /// Get the connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Cheap connectivity probe for the health endpoint
    pub async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

fn agent_from_row(row: &PgRow) -> Agent {
    Agent {
        id: row.get("id"),
        creator_wallet: row.get("creator_wallet"),
        name: row.get("name"),
        venue: row.get("venue"),
        status: row.get("status"),
        created_at: row.get("created_at"),
    }
}

fn link_from_row(row: &PgRow) -> TelegramLink {
    TelegramLink {
        id: row.get("id"),
        telegram_user_id: row.get("telegram_user_id"),
        telegram_username: row.get("telegram_username"),
        first_name: row.get("first_name"),
        last_name: row.get("last_name"),
        is_active: row.get("is_active"),
        lazy_trader: row.get("lazy_trader"),
        user_wallet: row.get("user_wallet"),
        agent_id: row.get("agent_id"),
        created_at: row.get("created_at"),
    }
}

fn deployment_from_row(row: &PgRow) -> Deployment {
    Deployment {
        id: row.get("id"),
        agent_id: row.get("agent_id"),
        user_wallet: row.get("user_wallet"),
        status: row.get("status"),
        enabled_venues: row.get("enabled_venues"),
        preferences: TradingPreferences {
            risk_tolerance: row.get("risk_tolerance"),
            trade_frequency: row.get("trade_frequency"),
            social_sentiment_weight: row.get("social_sentiment_weight"),
            price_momentum_focus: row.get("price_momentum_focus"),
            market_rank_priority: row.get("market_rank_priority"),
        },
        started_at: row.get("started_at"),
    }
}

const LINK_COLUMNS: &str = "id, telegram_user_id, telegram_username, first_name, last_name, \
     is_active, lazy_trader, user_wallet, agent_id, created_at";

#[async_trait]
impl IdentityStore for PostgresStore {
    #[instrument(skip(self))]
    async fn find_lazy_agent(&self, wallet: &WalletId) -> Result<Option<Agent>> {
        let row = sqlx::query(
            r#"
            SELECT id, creator_wallet, name, venue, status, created_at
            FROM agents
            WHERE creator_wallet = $1 AND strpos(name, $2) > 0
            ORDER BY created_at ASC
            LIMIT 1
            "#,
        )
        .bind(wallet.as_str())
        .bind(LAZY_TRADER_TAG)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(agent_from_row))
    }

    #[instrument(skip(self))]
    async fn find_attached_link(&self, agent_id: Uuid) -> Result<Option<TelegramLink>> {
        let sql = format!(
            "SELECT {LINK_COLUMNS} FROM telegram_links \
             WHERE agent_id = $1 AND is_active \
             LIMIT 1"
        );
        let row = sqlx::query(&sql)
            .bind(agent_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(link_from_row))
    }

    #[instrument(skip(self))]
    async fn find_standalone_link(&self, wallet: &WalletId) -> Result<Option<TelegramLink>> {
        let sql = format!(
            "SELECT {LINK_COLUMNS} FROM telegram_links \
             WHERE user_wallet = $1 AND is_active AND lazy_trader AND agent_id IS NULL \
             ORDER BY created_at DESC \
             LIMIT 1"
        );
        let row = sqlx::query(&sql)
            .bind(wallet.as_str())
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(link_from_row))
    }

    #[instrument(skip(self))]
    async fn find_latest_deployment(
        &self,
        agent_id: Uuid,
        wallet: &WalletId,
    ) -> Result<Option<Deployment>> {
        let row = sqlx::query(
            r#"
            SELECT id, agent_id, user_wallet, status, enabled_venues,
                   risk_tolerance, trade_frequency, social_sentiment_weight,
                   price_momentum_focus, market_rank_priority, started_at
            FROM deployments
            WHERE agent_id = $1 AND user_wallet = $2
            ORDER BY started_at DESC, seq DESC
            LIMIT 1
            "#,
        )
        .bind(agent_id)
        .bind(wallet.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(deployment_from_row))
    }

    #[instrument(skip(self))]
    async fn find_delegated_address(&self, wallet: &WalletId) -> Result<Option<DelegatedAddress>> {
        let row = sqlx::query(
            r#"
            SELECT user_wallet, address, created_at
            FROM delegated_addresses
            WHERE user_wallet = $1
            "#,
        )
        .bind(wallet.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| DelegatedAddress {
            user_wallet: r.get("user_wallet"),
            address: r.get("address"),
            created_at: r.get("created_at"),
        }))
    }

    #[instrument(skip(self, link), fields(link_id = %link.id))]
    async fn insert_telegram_link(&self, link: &TelegramLink) -> Result<()> {
        let result = sqlx::query(
            r#"
            INSERT INTO telegram_links (
                id, telegram_user_id, telegram_username, first_name, last_name,
                is_active, lazy_trader, user_wallet, agent_id, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, LOWER($8), $9, $10)
            "#,
        )
        .bind(link.id)
        .bind(link.telegram_user_id)
        .bind(&link.telegram_username)
        .bind(&link.first_name)
        .bind(&link.last_name)
        .bind(link.is_active)
        .bind(link.lazy_trader)
        .bind(&link.user_wallet)
        .bind(link.agent_id)
        .bind(link.created_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => {
                debug!("Inserted telegram link");
                Ok(())
            }
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                Err(OnboardError::Conflict(format!(
                    "telegram link violates {}",
                    db.constraint().unwrap_or("a uniqueness constraint")
                )))
            }
            Err(e) => Err(e.into()),
        }
    }
}
