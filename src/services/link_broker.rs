//! Link code issuance
//!
//! Mints short-lived codes that bind a wallet to whoever redeems them through
//! the bot's `/start` deep link. A wallet that already has a link gets the
//! existing link back instead of a new code.

use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::config::AppConfig;
use crate::domain::{LinkCode, TelegramLink, WalletId};
use crate::error::{OnboardError, Result};
use crate::platform::{system_clock, BotControlPlane, Clock, LinkCodeStore};
use crate::services::idempotency::{IdempotencyGuard, LinkState};

/// Issuance parameters
#[derive(Debug, Clone)]
pub struct LinkBrokerSettings {
    pub ttl: Duration,
    pub code_prefix: String,
    pub default_handle: String,
    pub deep_link_base: String,
    pub lookup_timeout: Duration,
}

impl LinkBrokerSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            ttl: config.link_codes.ttl(),
            code_prefix: config.link_codes.code_prefix.clone(),
            default_handle: config.telegram.default_handle.clone(),
            deep_link_base: config.telegram.deep_link_base.trim_end_matches('/').to_string(),
            lookup_timeout: config.telegram.lookup_timeout(),
        }
    }
}

impl Default for LinkBrokerSettings {
    fn default() -> Self {
        Self::from_config(&AppConfig::default_config())
    }
}

/// The wallet is already linked; no code was minted
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlreadyLinked {
    pub already_linked: bool,
    pub telegram_user: TelegramLink,
    /// `None` while the link is still standalone
    pub agent_id: Option<Uuid>,
}

/// A freshly minted code and the deep link that redeems it
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuedCode {
    pub already_linked: bool,
    pub code: String,
    /// Bot handle the deep link points at
    pub handle: String,
    pub deep_link: String,
    pub expires_in_seconds: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum LinkCodeOutcome {
    AlreadyLinked(AlreadyLinked),
    Issued(IssuedCode),
}

impl LinkCodeOutcome {
    pub fn is_already_linked(&self) -> bool {
        matches!(self, LinkCodeOutcome::AlreadyLinked(_))
    }
}

#[derive(Clone)]
pub struct LinkBroker {
    guard: IdempotencyGuard,
    codes: Arc<dyn LinkCodeStore>,
    bot: Arc<dyn BotControlPlane>,
    settings: LinkBrokerSettings,
    clock: Clock,
}

impl LinkBroker {
    pub fn new(
        guard: IdempotencyGuard,
        codes: Arc<dyn LinkCodeStore>,
        bot: Arc<dyn BotControlPlane>,
        settings: LinkBrokerSettings,
    ) -> Self {
        Self {
            guard,
            codes,
            bot,
            settings,
            clock: system_clock(),
        }
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Issue a link code for a raw wallet string
    pub async fn generate_code_for(&self, raw_wallet: &str) -> Result<LinkCodeOutcome> {
        let wallet = WalletId::normalize(raw_wallet)?;
        self.generate_code(&wallet).await
    }

    /// Return the existing link, or mint, store and advertise a new code.
    ///
    /// Only the idempotency lookup and code minting can fail. A failed code
    /// write or bot lookup degrades the result but still returns a code.
    #[instrument(skip_all, fields(wallet = %wallet))]
    pub async fn generate_code(&self, wallet: &WalletId) -> Result<LinkCodeOutcome> {
        let state = self.guard.check_wallet(wallet).await.map_err(|e| {
            error!("idempotency check failed: {}", e);
            e.into_link_generation()
        })?;

        match state {
            LinkState::Standalone(link) => {
                info!("wallet already has a standalone link");
                return Ok(LinkCodeOutcome::AlreadyLinked(AlreadyLinked {
                    already_linked: true,
                    telegram_user: link,
                    agent_id: None,
                }));
            }
            LinkState::Attached { agent_id, link } => {
                info!(%agent_id, "wallet's agent already has a link");
                return Ok(LinkCodeOutcome::AlreadyLinked(AlreadyLinked {
                    already_linked: true,
                    telegram_user: link,
                    agent_id: Some(agent_id),
                }));
            }
            LinkState::Unlinked => {}
        }

        let opaque = self.bot.generate_opaque_code().map_err(|e| {
            error!("code minting failed: {}", e);
            e.into_link_generation()
        })?;
        let code = format!("{}{}", self.settings.code_prefix, opaque);

        let expires_at = chrono::Duration::from_std(self.settings.ttl)
            .ok()
            .and_then(|ttl| (self.clock)().checked_add_signed(ttl))
            .ok_or_else(|| {
                OnboardError::LinkGeneration(format!(
                    "code ttl of {}s is out of range",
                    self.settings.ttl.as_secs()
                ))
            })?;
        let link_code = LinkCode {
            code: code.clone(),
            wallet: wallet.clone(),
            expires_at,
        };
        if let Err(e) = self.codes.put(&link_code).await {
            warn!(code = %code, "degraded write, link code not persisted: {}", e);
        }

        let handle = self.bot_handle().await;
        let deep_link = format!(
            "{}/{}?start={}",
            self.settings.deep_link_base, handle, code
        );

        info!(code = %code, handle = %handle, "issued link code");
        Ok(LinkCodeOutcome::Issued(IssuedCode {
            already_linked: false,
            code,
            handle,
            deep_link,
            expires_in_seconds: self.settings.ttl.as_secs(),
        }))
    }

    /// Wallet bound to an unexpired code
    #[instrument(skip(self))]
    pub async fn resolve_code(&self, code: &str) -> Result<Option<WalletId>> {
        self.codes.get(code.trim()).await
    }

    async fn bot_handle(&self) -> String {
        match tokio::time::timeout(self.settings.lookup_timeout, self.bot.get_self_identity()).await
        {
            Ok(Ok(identity)) => identity.username,
            Ok(Err(e)) => {
                warn!(
                    "bot handle lookup failed, using @{}: {}",
                    self.settings.default_handle, e
                );
                self.settings.default_handle.clone()
            }
            Err(_) => {
                warn!(
                    timeout_ms = self.settings.lookup_timeout.as_millis() as u64,
                    "bot handle lookup timed out, using @{}", self.settings.default_handle
                );
                self.settings.default_handle.clone()
            }
        }
    }
}
