pub mod idempotency;
pub mod identity;
pub mod link_broker;
pub mod step_resolver;

pub use idempotency::{IdempotencyGuard, LinkState};
pub use identity::IdentityResolver;
pub use link_broker::{AlreadyLinked, IssuedCode, LinkBroker, LinkBrokerSettings, LinkCodeOutcome};
pub use step_resolver::StepResolver;
