pub mod entities;
pub mod state;
pub mod wallet;

pub use entities::*;
pub use state::*;
pub use wallet::*;
