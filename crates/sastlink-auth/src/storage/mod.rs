//! Storage traits for the authorization hand-off.
//!
//! This module defines storage interfaces for:
//!
//! - OAuth client registrations
//! - Issued authorization codes
//! - Browser sessions (the pending-request slot lives here)
//!
//! # Implementations
//!
//! - [`memory`] - `dashmap`-backed stores for tests and single-node runs
//! - `sastlink-auth-postgres` - PostgreSQL storage backend

pub mod client;
pub mod code;
pub mod memory;
pub mod session;

pub use client::ClientStorage;
pub use code::AuthorizationCodeStorage;
pub use memory::{MemoryClientStorage, MemoryCodeStorage, MemorySessionStorage};
pub use session::{SessionRecord, SessionStorage};
