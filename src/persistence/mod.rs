//! In-process persistence
//!
//! Memory-backed implementations of the identity and link-code stores. The
//! production implementations live in `adapters` (PostgreSQL and Redis).

pub mod memory;

pub use memory::{MemoryIdentityStore, MemoryLinkCodeStore};
