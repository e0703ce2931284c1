//! Onboarding platform seams

pub mod traits;

pub use traits::{
    system_clock, BotControlPlane, BotIdentity, Clock, IdentityStore, LinkCodeStore,
};
