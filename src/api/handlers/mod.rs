pub mod onboarding;
pub mod system;

pub use onboarding::*;
pub use system::*;
