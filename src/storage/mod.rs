//! Persistence collaborators.
//!
//! The vault, audit log and access gate never talk to a database
//! directly; they are handed implementations of these traits at
//! construction.  Every lookup that touches a secret is scoped by owner
//! id, so isolation is enforced by the query itself.
//!
//! `SqliteStorage` implements all four traits over one connection.

pub mod sqlite;

use chrono::{DateTime, SubsecRound, Utc};

use crate::audit::{AuditEntry, AuditQuery};
use crate::auth::challenge::Challenge;
use crate::auth::{Owner, OwnerId};
use crate::errors::Result;
use crate::vault::{Secret, SecretFilter, SecretMetadata};

pub use sqlite::SqliteStorage;

/// Current time at the precision the storage layer keeps (microseconds).
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

pub trait SecretRepository: Send + Sync {
    fn insert_secret(&self, secret: &Secret) -> Result<()>;

    /// Fetch a secret only if it belongs to `owner_id`.
    fn find_secret(&self, owner_id: &OwnerId, id: &str) -> Result<Option<Secret>>;

    /// Count the owner's matching secrets and return one page of
    /// metadata, newest first.
    fn list_secrets(
        &self,
        owner_id: &OwnerId,
        filter: &SecretFilter,
    ) -> Result<(u64, Vec<SecretMetadata>)>;

    /// Overwrite name, category, payload and `updated_at` for the row
    /// matching both id and owner.  Returns `false` if no row matched.
    fn update_secret(&self, secret: &Secret) -> Result<bool>;

    /// Returns `false` if no row matched both id and owner.
    fn delete_secret(&self, owner_id: &OwnerId, id: &str) -> Result<bool>;
}

pub trait AuditRepository: Send + Sync {
    /// Append an entry and return the sequence number assigned to it.
    fn insert_entry(&self, entry: &AuditEntry) -> Result<i64>;

    fn list_entries(&self, owner_id: &OwnerId, query: &AuditQuery)
        -> Result<(u64, Vec<AuditEntry>)>;

    /// Delete every entry created strictly before `cutoff`.
    fn delete_entries_before(&self, cutoff: DateTime<Utc>) -> Result<u64>;
}

pub trait OwnerRepository: Send + Sync {
    /// Look up the owner for `address`, creating it on first sight, and
    /// record `now` as its last login.
    fn record_login(&self, address: &str, now: DateTime<Utc>) -> Result<Owner>;

    fn find_owner(&self, id: &OwnerId) -> Result<Option<Owner>>;
}

pub trait ChallengeRepository: Send + Sync {
    fn insert_challenge(&self, challenge: &Challenge) -> Result<()>;

    /// Atomically remove a matching, unexpired challenge.  Returns
    /// `true` only for the first caller.
    fn consume_challenge(&self, address: &str, message: &str, now: DateTime<Utc>)
        -> Result<bool>;
}
