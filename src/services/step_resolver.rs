use tracing::{debug, error, instrument};

use crate::domain::{SetupStatus, WalletId};
use crate::error::{OnboardError, Result};
use crate::services::identity::IdentityResolver;

/// Reads the wallet's facts and runs them through the onboarding state machine
#[derive(Clone)]
pub struct StepResolver {
    identity: IdentityResolver,
}

impl StepResolver {
    pub fn new(identity: IdentityResolver) -> Self {
        Self { identity }
    }

    /// Setup status for a raw wallet string
    pub async fn status_for(&self, raw_wallet: &str) -> Result<SetupStatus> {
        let wallet = self.identity.normalize(raw_wallet)?;
        self.status(&wallet).await
    }

    /// Setup status for a canonical wallet. Store failures collapse into
    /// `OnboardError::Resolution`; no partial status is ever returned.
    #[instrument(skip_all, fields(wallet = %wallet))]
    pub async fn status(&self, wallet: &WalletId) -> Result<SetupStatus> {
        let snapshot = self.identity.snapshot(wallet).await.map_err(|e| {
            error!("setup status lookup failed: {}", e);
            OnboardError::into_resolution(e)
        })?;

        let status = snapshot.resolve();
        debug!(step = %status.step, has_setup = status.has_setup, "resolved setup step");
        Ok(status)
    }
}
