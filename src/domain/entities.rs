use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::wallet::WalletId;

/// Substring carried in the name of every agent provisioned by the lazy-trading flow
pub const LAZY_TRADER_TAG: &str = "Lazy Trader";

/// A provisioned trading agent (read-only here; created by the provisioning flow)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Agent {
    pub id: Uuid,
    pub creator_wallet: String,
    pub name: String,
    pub venue: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl Agent {
    pub fn is_lazy_trader(&self) -> bool {
        self.name.contains(LAZY_TRADER_TAG)
    }
}

/// Binding between a Telegram account and a wallet, later attached to an agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelegramLink {
    pub id: Uuid,
    pub telegram_user_id: i64,
    pub telegram_username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub is_active: bool,
    pub lazy_trader: bool,
    /// Wallet that issued the link code this binding was created from
    pub user_wallet: Option<String>,
    /// Agent the link is attached to, if any
    pub agent_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl TelegramLink {
    /// Active, flagged for lazy trading and not yet attached to an agent
    pub fn is_standalone_lazy(&self) -> bool {
        self.is_active && self.lazy_trader && self.agent_id.is_none()
    }

    pub fn is_attached_to(&self, agent_id: Uuid) -> bool {
        self.is_active && self.agent_id == Some(agent_id)
    }
}

/// Trading preferences captured by a deployment (sliders in the 0..=100 range)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradingPreferences {
    pub risk_tolerance: i32,
    pub trade_frequency: i32,
    pub social_sentiment_weight: i32,
    pub price_momentum_focus: i32,
    pub market_rank_priority: i32,
}

impl Default for TradingPreferences {
    fn default() -> Self {
        Self {
            risk_tolerance: 50,
            trade_frequency: 50,
            social_sentiment_weight: 50,
            price_momentum_focus: 50,
            market_rank_priority: 50,
        }
    }
}

/// Configuration snapshot of an agent for one wallet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deployment {
    pub id: Uuid,
    pub agent_id: Uuid,
    pub user_wallet: String,
    pub status: String,
    pub enabled_venues: Vec<String>,
    #[serde(flatten)]
    pub preferences: TradingPreferences,
    pub started_at: DateTime<Utc>,
}

/// Externally controlled trading address delegated by a wallet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DelegatedAddress {
    pub user_wallet: String,
    pub address: String,
    pub created_at: DateTime<Utc>,
}

/// Ephemeral code issued to bind a Telegram account back to a wallet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkCode {
    pub code: String,
    pub wallet: WalletId,
    pub expires_at: DateTime<Utc>,
}

impl LinkCode {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}
