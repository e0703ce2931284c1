//! In-process stores
//!
//! Used by `serve --memory` and by the test suites. The identity store
//! enforces the same uniqueness rules as the partial unique indexes in the
//! PostgreSQL schema, so races surface as `Conflict` here too.

use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::domain::{Agent, DelegatedAddress, Deployment, LinkCode, TelegramLink, WalletId};
use crate::error::{OnboardError, Result};
use crate::platform::{system_clock, Clock, IdentityStore, LinkCodeStore};

#[derive(Default)]
struct Tables {
    agents: Vec<Agent>,
    links: Vec<TelegramLink>,
    /// Insertion order doubles as the deployment tie-breaker
    deployments: Vec<Deployment>,
    delegated: HashMap<String, DelegatedAddress>,
}

/// Identity store held entirely in memory
#[derive(Clone, Default)]
pub struct MemoryIdentityStore {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryIdentityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an agent; a wallet may own only one lazy-trading agent
    pub async fn insert_agent(&self, agent: Agent) -> Result<()> {
        let mut tables = self.tables.write().await;
        let wallet = agent.creator_wallet.to_ascii_lowercase();
        if agent.is_lazy_trader()
            && tables
                .agents
                .iter()
                .any(|a| a.is_lazy_trader() && a.creator_wallet == wallet)
        {
            return Err(OnboardError::Conflict(format!(
                "wallet {} already owns a lazy-trading agent",
                wallet
            )));
        }
        tables.agents.push(Agent {
            creator_wallet: wallet,
            ..agent
        });
        Ok(())
    }

    pub async fn insert_deployment(&self, deployment: Deployment) -> Result<()> {
        let mut tables = self.tables.write().await;
        tables.deployments.push(Deployment {
            user_wallet: deployment.user_wallet.to_ascii_lowercase(),
            ..deployment
        });
        Ok(())
    }

    /// One delegated address per wallet; a later insert replaces the earlier one
    pub async fn upsert_delegated_address(&self, address: DelegatedAddress) -> Result<()> {
        let mut tables = self.tables.write().await;
        let wallet = address.user_wallet.to_ascii_lowercase();
        tables.delegated.insert(
            wallet.clone(),
            DelegatedAddress {
                user_wallet: wallet,
                ..address
            },
        );
        Ok(())
    }

    /// Attach an existing link to an agent, as the provisioning flow does
    pub async fn attach_link(&self, link_id: Uuid, agent_id: Uuid) -> Result<()> {
        let mut tables = self.tables.write().await;

        let Some(link) = tables.links.iter().find(|l| l.id == link_id).cloned() else {
            return Err(OnboardError::Internal(format!("link {} not found", link_id)));
        };
        let attached = TelegramLink {
            agent_id: Some(agent_id),
            ..link
        };
        check_link_constraints(&tables.links, &attached, Some(link_id))?;

        if let Some(slot) = tables.links.iter_mut().find(|l| l.id == link_id) {
            *slot = attached;
        }
        Ok(())
    }
}

/// Mirror of the partial unique indexes on `telegram_links`
fn check_link_constraints(
    existing: &[TelegramLink],
    candidate: &TelegramLink,
    replacing: Option<Uuid>,
) -> Result<()> {
    if !candidate.is_active {
        return Ok(());
    }

    let others = existing
        .iter()
        .filter(|l| Some(l.id) != replacing && l.is_active);

    for other in others {
        if other.id == candidate.id {
            return Err(OnboardError::Conflict(format!(
                "link {} already exists",
                candidate.id
            )));
        }

        if let Some(agent_id) = candidate.agent_id {
            if other.agent_id == Some(agent_id) {
                return Err(OnboardError::Conflict(format!(
                    "agent {} already has an active link",
                    agent_id
                )));
            }
            if other.agent_id.is_some() && other.telegram_user_id == candidate.telegram_user_id {
                return Err(OnboardError::Conflict(format!(
                    "telegram user {} is already attached to another agent",
                    candidate.telegram_user_id
                )));
            }
        } else if candidate.lazy_trader
            && other.is_standalone_lazy()
            && other.user_wallet.is_some()
            && other.user_wallet == candidate.user_wallet
        {
            return Err(OnboardError::Conflict(format!(
                "wallet {} already has an active lazy-trading link",
                candidate.user_wallet.as_deref().unwrap_or_default()
            )));
        }
    }

    Ok(())
}

#[async_trait]
impl IdentityStore for MemoryIdentityStore {
    async fn find_lazy_agent(&self, wallet: &WalletId) -> Result<Option<Agent>> {
        let tables = self.tables.read().await;
        Ok(tables
            .agents
            .iter()
            .find(|a| a.creator_wallet == wallet.as_str() && a.is_lazy_trader())
            .cloned())
    }

    async fn find_attached_link(&self, agent_id: Uuid) -> Result<Option<TelegramLink>> {
        let tables = self.tables.read().await;
        Ok(tables
            .links
            .iter()
            .find(|l| l.is_attached_to(agent_id))
            .cloned())
    }

    async fn find_standalone_link(&self, wallet: &WalletId) -> Result<Option<TelegramLink>> {
        let tables = self.tables.read().await;
        Ok(tables
            .links
            .iter()
            .filter(|l| l.is_standalone_lazy() && l.user_wallet.as_deref() == Some(wallet.as_str()))
            .max_by_key(|l| l.created_at)
            .cloned())
    }

    async fn find_latest_deployment(
        &self,
        agent_id: Uuid,
        wallet: &WalletId,
    ) -> Result<Option<Deployment>> {
        let tables = self.tables.read().await;
        // max_by_key keeps the last maximum, so equal start times resolve to the later insert
        Ok(tables
            .deployments
            .iter()
            .filter(|d| d.agent_id == agent_id && d.user_wallet == wallet.as_str())
            .max_by_key(|d| d.started_at)
            .cloned())
    }

    async fn find_delegated_address(&self, wallet: &WalletId) -> Result<Option<DelegatedAddress>> {
        let tables = self.tables.read().await;
        Ok(tables.delegated.get(wallet.as_str()).cloned())
    }

    async fn insert_telegram_link(&self, link: &TelegramLink) -> Result<()> {
        let mut tables = self.tables.write().await;
        let link = TelegramLink {
            user_wallet: link.user_wallet.as_ref().map(|w| w.to_ascii_lowercase()),
            ..link.clone()
        };
        check_link_constraints(&tables.links, &link, None)?;
        debug!(link_id = %link.id, "stored telegram link");
        tables.links.push(link);
        Ok(())
    }
}

/// Link-code store backed by a concurrent map with lazy eviction
#[derive(Clone)]
pub struct MemoryLinkCodeStore {
    codes: Arc<DashMap<String, LinkCode>>,
    clock: Clock,
}

impl Default for MemoryLinkCodeStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryLinkCodeStore {
    pub fn new() -> Self {
        Self::with_clock(system_clock())
    }

    pub fn with_clock(clock: Clock) -> Self {
        Self {
            codes: Arc::new(DashMap::new()),
            clock,
        }
    }

    /// Drop every expired entry; returns how many were removed
    pub fn purge_expired(&self) -> usize {
        let now = (self.clock)();
        let before = self.codes.len();
        self.codes.retain(|_, code| !code.is_expired_at(now));
        before.saturating_sub(self.codes.len())
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}

#[async_trait]
impl LinkCodeStore for MemoryLinkCodeStore {
    async fn put(&self, code: &LinkCode) -> Result<()> {
        self.codes.insert(code.code.clone(), code.clone());
        Ok(())
    }

    async fn get(&self, code: &str) -> Result<Option<WalletId>> {
        let now = (self.clock)();
        let found = self.codes.get(code).map(|entry| entry.value().clone());

        match found {
            Some(entry) if !entry.is_expired_at(now) => Ok(Some(entry.wallet)),
            Some(_) => {
                self.codes.remove_if(code, |_, stored| stored.is_expired_at(now));
                Ok(None)
            }
            None => Ok(None),
        }
    }
}
