use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::adapters::PostgresStore;
use crate::platform::{BotControlPlane, IdentityStore, LinkCodeStore};
use crate::services::{
    IdempotencyGuard, IdentityResolver, LinkBroker, LinkBrokerSettings, StepResolver,
};

/// Shared application state for API handlers
#[derive(Clone)]
pub struct AppState {
    pub step_resolver: StepResolver,

    pub link_broker: LinkBroker,

    /// Database probed by the health endpoint (absent for in-memory runs)
    pub database: Option<PostgresStore>,

    /// Application start time
    pub start_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(
        identity: Arc<dyn IdentityStore>,
        codes: Arc<dyn LinkCodeStore>,
        bot: Arc<dyn BotControlPlane>,
        settings: LinkBrokerSettings,
    ) -> Self {
        let resolver = IdentityResolver::new(identity);
        let guard = IdempotencyGuard::new(resolver.clone());
        Self {
            step_resolver: StepResolver::new(resolver),
            link_broker: LinkBroker::new(guard, codes, bot, settings),
            database: None,
            start_time: Utc::now(),
        }
    }

    pub fn with_database(mut self, store: PostgresStore) -> Self {
        self.database = Some(store);
        self
    }

    pub fn uptime_seconds(&self) -> i64 {
        (Utc::now() - self.start_time).num_seconds().max(0)
    }
}
