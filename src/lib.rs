pub mod adapters;
pub mod api;
pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod persistence;
pub mod platform;
pub mod services;

pub use config::AppConfig;
pub use domain::{OnboardingStep, SetupStatus, WalletId};
pub use error::{OnboardError, Result};
pub use persistence::{MemoryIdentityStore, MemoryLinkCodeStore};
pub use platform::{BotControlPlane, IdentityStore, LinkCodeStore};
pub use services::{IdempotencyGuard, IdentityResolver, LinkBroker, LinkCodeOutcome, StepResolver};
