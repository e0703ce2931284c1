use serde::{Deserialize, Serialize};
use std::fmt;

use super::entities::{Agent, DelegatedAddress, Deployment, TelegramLink, TradingPreferences};

/// Onboarding funnel stages, in funnel order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OnboardingStep {
    /// Wallet connected, nothing else known
    Wallet,
    /// Agent exists but no Telegram account is linked
    Telegram,
    /// Telegram linked, trading preferences not yet deployed
    Preferences,
    /// Fully configured; also the resume state for returning users
    Ostium,
}

impl OnboardingStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            OnboardingStep::Wallet => "wallet",
            OnboardingStep::Telegram => "telegram",
            OnboardingStep::Preferences => "preferences",
            OnboardingStep::Ostium => "ostium",
        }
    }

    /// Position in the funnel; later steps have a higher rank
    pub fn rank(&self) -> u8 {
        match self {
            OnboardingStep::Wallet => 0,
            OnboardingStep::Telegram => 1,
            OnboardingStep::Preferences => 2,
            OnboardingStep::Ostium => 3,
        }
    }
}

impl fmt::Display for OnboardingStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Raw facts read for one wallet; the only input of step resolution
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IdentitySnapshot {
    pub agent: Option<Agent>,
    /// Active link attached to `agent`
    pub attached_link: Option<TelegramLink>,
    /// Active lazy-trading link owned by the wallet and attached to no agent
    pub standalone_link: Option<TelegramLink>,
    pub deployment: Option<Deployment>,
    pub delegated_address: Option<DelegatedAddress>,
}

/// Setup status returned to the client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetupStatus {
    pub has_setup: bool,
    pub step: OnboardingStep,
    pub agent: Option<Agent>,
    pub telegram_user: Option<TelegramLink>,
    pub deployment: Option<Deployment>,
    pub trading_preferences: Option<TradingPreferences>,
    pub delegated_address: Option<DelegatedAddress>,
}

impl SetupStatus {
    fn empty(step: OnboardingStep, has_setup: bool) -> Self {
        Self {
            has_setup,
            step,
            agent: None,
            telegram_user: None,
            deployment: None,
            trading_preferences: None,
            delegated_address: None,
        }
    }
}

impl IdentitySnapshot {
    /// Compute the current funnel step from the snapshot.
    ///
    /// An active standalone lazy-trading link satisfies the Telegram step on
    /// its own: without an agent the wallet goes straight to `preferences`,
    /// and with an agent whose link is not attached yet the standalone link
    /// stands in for the attached one. `telegram` is only reported when no
    /// usable link exists at all.
    pub fn resolve(self) -> SetupStatus {
        let IdentitySnapshot {
            agent,
            attached_link,
            standalone_link,
            deployment,
            delegated_address,
        } = self;

        let Some(agent) = agent else {
            return match standalone_link {
                None => SetupStatus::empty(OnboardingStep::Wallet, false),
                Some(link) => SetupStatus {
                    telegram_user: Some(link),
                    ..SetupStatus::empty(OnboardingStep::Preferences, true)
                },
            };
        };

        let Some(link) = attached_link.or(standalone_link) else {
            return SetupStatus {
                agent: Some(agent),
                delegated_address,
                ..SetupStatus::empty(OnboardingStep::Telegram, true)
            };
        };

        let step = if deployment.is_some() {
            OnboardingStep::Ostium
        } else {
            OnboardingStep::Preferences
        };
        let trading_preferences = deployment.as_ref().map(|d| d.preferences);

        SetupStatus {
            has_setup: true,
            step,
            agent: Some(agent),
            telegram_user: Some(link),
            deployment,
            trading_preferences,
            delegated_address,
        }
    }
}
