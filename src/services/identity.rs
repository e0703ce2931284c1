//! Identity resolution
//!
//! Turns a raw wallet string into the canonical form and reads every fact the
//! onboarding funnel depends on. All reads are snapshots; nothing is cached.

use std::sync::Arc;
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::domain::{
    Agent, DelegatedAddress, Deployment, IdentitySnapshot, TelegramLink, WalletId,
};
use crate::error::Result;
use crate::platform::IdentityStore;

#[derive(Clone)]
pub struct IdentityResolver {
    store: Arc<dyn IdentityStore>,
}

impl IdentityResolver {
    pub fn new(store: Arc<dyn IdentityStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn IdentityStore> {
        &self.store
    }

    pub fn normalize(&self, raw: &str) -> Result<WalletId> {
        WalletId::normalize(raw)
    }

    pub async fn resolve_agent(&self, wallet: &WalletId) -> Result<Option<Agent>> {
        self.store.find_lazy_agent(wallet).await
    }

    /// The agent's attached link when an agent is given, otherwise the
    /// wallet's newest standalone lazy-trading link.
    pub async fn resolve_telegram_link(
        &self,
        agent: Option<&Agent>,
        wallet: &WalletId,
    ) -> Result<Option<TelegramLink>> {
        match agent {
            Some(agent) => self.store.find_attached_link(agent.id).await,
            None => self.store.find_standalone_link(wallet).await,
        }
    }

    pub async fn resolve_standalone_link(&self, wallet: &WalletId) -> Result<Option<TelegramLink>> {
        self.store.find_standalone_link(wallet).await
    }

    pub async fn resolve_deployment(
        &self,
        agent_id: Uuid,
        wallet: &WalletId,
    ) -> Result<Option<Deployment>> {
        self.store.find_latest_deployment(agent_id, wallet).await
    }

    pub async fn resolve_delegated_address(
        &self,
        wallet: &WalletId,
    ) -> Result<Option<DelegatedAddress>> {
        self.store.find_delegated_address(wallet).await
    }

    /// Gather every fact step resolution needs.
    ///
    /// Once the agent is known the remaining lookups are independent and run
    /// concurrently. The standalone link is read even when an agent exists so
    /// a link created before its agent still counts.
    #[instrument(skip_all, fields(wallet = %wallet))]
    pub async fn snapshot(&self, wallet: &WalletId) -> Result<IdentitySnapshot> {
        let Some(agent) = self.resolve_agent(wallet).await? else {
            let standalone_link = self.resolve_standalone_link(wallet).await?;
            debug!(standalone = standalone_link.is_some(), "no lazy-trading agent");
            return Ok(IdentitySnapshot {
                standalone_link,
                ..Default::default()
            });
        };

        let (attached_link, standalone_link, deployment, delegated_address) = tokio::try_join!(
            self.resolve_telegram_link(Some(&agent), wallet),
            self.resolve_standalone_link(wallet),
            self.resolve_deployment(agent.id, wallet),
            self.resolve_delegated_address(wallet),
        )?;

        debug!(
            agent_id = %agent.id,
            attached = attached_link.is_some(),
            standalone = standalone_link.is_some(),
            deployment = deployment.is_some(),
            "resolved identity snapshot"
        );

        Ok(IdentitySnapshot {
            agent: Some(agent),
            attached_link,
            standalone_link,
            deployment,
            delegated_address,
        })
    }
}
