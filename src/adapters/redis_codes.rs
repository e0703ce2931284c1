//! Redis-backed link-code store
//!
//! Each code is a plain string key holding the canonical wallet, written with
//! `SET key value EX ttl` so the overwrite and the expiry are one atomic
//! command and Redis evicts the key on its own.

use async_trait::async_trait;
use chrono::Utc;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tracing::{debug, info, instrument};

use crate::domain::{LinkCode, WalletId};
use crate::error::{OnboardError, Result};
use crate::platform::LinkCodeStore;

/// Link-code store shared across API replicas
#[derive(Clone)]
pub struct RedisLinkCodeStore {
    conn: ConnectionManager,
    key_prefix: String,
}

impl RedisLinkCodeStore {
    pub async fn connect(redis_url: &str, key_prefix: &str) -> Result<Self> {
        let client = redis::Client::open(redis_url)?;
        let conn = ConnectionManager::new(client).await?;
        info!("Connected to Redis link-code store");
        Ok(Self {
            conn,
            key_prefix: key_prefix.to_string(),
        })
    }

    fn key(&self, code: &str) -> String {
        format!("{}:{}", self.key_prefix, code)
    }
}

#[async_trait]
impl LinkCodeStore for RedisLinkCodeStore {
    #[instrument(skip(self, code), fields(code = %code.code))]
    async fn put(&self, code: &LinkCode) -> Result<()> {
        let ttl_secs = (code.expires_at - Utc::now()).num_seconds();
        if ttl_secs <= 0 {
            return Err(OnboardError::Internal(format!(
                "link code {} is already expired",
                code.code
            )));
        }

        // Each call works on its own clone of the multiplexed connection.
        let mut conn = self.conn.clone();
        redis::cmd("SET")
            .arg(self.key(&code.code))
            .arg(code.wallet.as_str())
            .arg("EX")
            .arg(ttl_secs)
            .query_async::<_, ()>(&mut conn)
            .await?;
        debug!(ttl_secs, "Stored link code");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn get(&self, code: &str) -> Result<Option<WalletId>> {
        let mut conn = self.conn.clone();
        let stored: Option<String> = conn.get(self.key(code)).await?;
        stored.map(|raw| WalletId::normalize(&raw)).transpose()
    }
}
