//! Collaborator traits for the onboarding platform
//!
//! Everything the core talks to sits behind one of these seams: the
//! relational store that owns agents, links and deployments, the ephemeral
//! store holding link codes, and the Telegram bot control plane.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::{Agent, DelegatedAddress, Deployment, LinkCode, TelegramLink, WalletId};
use crate::error::Result;

/// Source of the current time, injectable so expiry can be tested
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

pub fn system_clock() -> Clock {
    Arc::new(Utc::now)
}

/// Read access to the entities owned by the provisioning and linking flows.
///
/// Every lookup is keyed on the canonical wallet form and returns an owned
/// snapshot of the row.
#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// The agent created by `wallet` whose name carries the lazy-trading tag
    async fn find_lazy_agent(&self, wallet: &WalletId) -> Result<Option<Agent>>;

    /// The active link attached to `agent_id`
    async fn find_attached_link(&self, agent_id: Uuid) -> Result<Option<TelegramLink>>;

    /// Most recently created active lazy-trading link for `wallet` that no agent owns yet
    async fn find_standalone_link(&self, wallet: &WalletId) -> Result<Option<TelegramLink>>;

    /// Latest deployment for the (agent, wallet) pair by start time, then insertion order
    async fn find_latest_deployment(
        &self,
        agent_id: Uuid,
        wallet: &WalletId,
    ) -> Result<Option<Deployment>>;

    async fn find_delegated_address(&self, wallet: &WalletId) -> Result<Option<DelegatedAddress>>;

    /// Record a link created by the code exchange.
    ///
    /// Fails with `OnboardError::Conflict` when it would give a wallet a second
    /// unattached active lazy-trading link, an agent a second active link, or
    /// attach one Telegram account to two agents.
    async fn insert_telegram_link(&self, link: &TelegramLink) -> Result<()>;
}

/// Keyed store with per-key expiry for link codes.
#[async_trait]
pub trait LinkCodeStore: Send + Sync {
    /// Atomic insert-or-overwrite keyed by `code.code`, evicted at `code.expires_at`
    async fn put(&self, code: &LinkCode) -> Result<()>;

    /// Wallet bound to `code`, or `None` once the code is unknown or expired
    async fn get(&self, code: &str) -> Result<Option<WalletId>>;
}

/// Public identity of the messaging bot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BotIdentity {
    pub id: i64,
    pub username: String,
}

/// Control plane of the shared messaging bot
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BotControlPlane: Send + Sync {
    /// Ask the bot platform who this bot is
    async fn get_self_identity(&self) -> Result<BotIdentity>;

    /// Fresh opaque token from a collision-resistant source (no flow prefix)
    fn generate_opaque_code(&self) -> Result<String>;
}
