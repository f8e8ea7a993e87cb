//! Vault module: encrypted secret storage.
//!
//! This module provides:
//! - `Secret`, `SecretMetadata`, `Category` and the input/query types (`secret`)
//! - `SecretStore`, the owner-scoped create/read/update/delete/list/search API (`store`)

pub mod secret;
pub mod store;

// Re-export the most commonly used items.
pub use secret::{
    Category, ListOptions, NewSecret, Page, SearchOptions, Secret, SecretFilter, SecretMetadata,
    SecretUpdate,
};
pub use store::SecretStore;
