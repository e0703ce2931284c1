//! Idempotency guard for Telegram links
//!
//! Lookup-before-act check shared by the link broker and the code exchange.
//! The storage layer enforces the same rules with unique indexes, so a race
//! between two writers ends in `OnboardError::Conflict` instead of a
//! duplicate row.

use tracing::{instrument, warn};
use uuid::Uuid;

use crate::domain::{TelegramLink, WalletId};
use crate::error::{OnboardError, Result};
use crate::services::identity::IdentityResolver;

/// What the wallet is already bound to
#[derive(Debug, Clone, PartialEq)]
pub enum LinkState {
    Unlinked,
    /// Active lazy-trading link not attached to any agent yet
    Standalone(TelegramLink),
    /// Lazy-trading agent with an attached active link
    Attached { agent_id: Uuid, link: TelegramLink },
}

impl LinkState {
    pub fn is_linked(&self) -> bool {
        !matches!(self, LinkState::Unlinked)
    }
}

#[derive(Clone)]
pub struct IdempotencyGuard {
    identity: IdentityResolver,
}

impl IdempotencyGuard {
    pub fn new(identity: IdentityResolver) -> Self {
        Self { identity }
    }

    /// Standalone link first, then the transitive agent → attached link path
    #[instrument(skip_all, fields(wallet = %wallet))]
    pub async fn check_wallet(&self, wallet: &WalletId) -> Result<LinkState> {
        if let Some(link) = self.identity.resolve_standalone_link(wallet).await? {
            return Ok(LinkState::Standalone(link));
        }

        if let Some(agent) = self.identity.resolve_agent(wallet).await? {
            if let Some(link) = self
                .identity
                .resolve_telegram_link(Some(&agent), wallet)
                .await?
            {
                return Ok(LinkState::Attached {
                    agent_id: agent.id,
                    link,
                });
            }
        }

        Ok(LinkState::Unlinked)
    }

    /// Store a link produced by the code exchange unless the wallet is already linked.
    ///
    /// The check and the insert are separate round trips; the store's unique
    /// indexes catch anything that slips between them.
    #[instrument(skip_all, fields(wallet = %wallet, link_id = %link.id))]
    pub async fn record_link(&self, wallet: &WalletId, link: &TelegramLink) -> Result<()> {
        let state = self.check_wallet(wallet).await?;
        if state.is_linked() {
            return Err(OnboardError::Conflict(format!(
                "wallet {} already has an active telegram link",
                wallet
            )));
        }

        let link = TelegramLink {
            user_wallet: Some(wallet.as_str().to_string()),
            ..link.clone()
        };

        self.identity
            .store()
            .insert_telegram_link(&link)
            .await
            .map_err(|e| {
                if matches!(e, OnboardError::Conflict(_)) {
                    warn!("concurrent link creation rejected by store: {}", e);
                }
                e
            })
    }
}
