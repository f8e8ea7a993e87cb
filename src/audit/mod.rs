//! Audit log: an append-only trail of every security-relevant action.
//!
//! Designed for graceful degradation: if the backing store can't be
//! written to, `append` logs the failure on the tracing channel and the
//! operation being described carries on.  Entries are never updated;
//! the only removal path is the retention purge.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::auth::OwnerId;
use crate::errors::{Result, VaultError};
use crate::storage::{self, AuditRepository};
use crate::vault::secret::validate_page_size;
use crate::vault::Page;

/// Default and maximum page sizes for audit queries.
pub const DEFAULT_AUDIT_PAGE_SIZE: u32 = 50;
pub const MAX_AUDIT_PAGE_SIZE: u32 = 500;

/// Longest retention horizon accepted by `purge_older_than` (100 years).
pub const MAX_RETENTION_DAYS: u32 = 36_500;

/// Kinds of audited action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    CreateSecret,
    UpdateSecret,
    DeleteSecret,
    ViewSecret,
    ViewSecrets,
    SearchSecrets,
    Login,
    Logout,
}

impl AuditAction {
    pub const ALL: [AuditAction; 8] = [
        AuditAction::CreateSecret,
        AuditAction::UpdateSecret,
        AuditAction::DeleteSecret,
        AuditAction::ViewSecret,
        AuditAction::ViewSecrets,
        AuditAction::SearchSecrets,
        AuditAction::Login,
        AuditAction::Logout,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::CreateSecret => "CREATE_SECRET",
            AuditAction::UpdateSecret => "UPDATE_SECRET",
            AuditAction::DeleteSecret => "DELETE_SECRET",
            AuditAction::ViewSecret => "VIEW_SECRET",
            AuditAction::ViewSecrets => "VIEW_SECRETS",
            AuditAction::SearchSecrets => "SEARCH_SECRETS",
            AuditAction::Login => "LOGIN",
            AuditAction::Logout => "LOGOUT",
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuditAction {
    type Err = VaultError;

    fn from_str(s: &str) -> Result<Self> {
        AuditAction::ALL
            .into_iter()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| VaultError::Validation(format!("unknown audit action '{s}'")))
    }
}

/// A single, immutable audit log entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    pub id: String,
    /// Insertion order, assigned by the store.  Breaks timestamp ties.
    pub sequence: i64,
    pub owner_id: OwnerId,
    pub action: AuditAction,
    pub resource_id: Option<String>,
    pub metadata: Map<String, Value>,
    pub ip_address: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// What to append.  Built by the caller, stamped by `AuditLog::append`.
#[derive(Debug, Clone)]
pub struct AuditRecord {
    pub owner_id: OwnerId,
    pub action: AuditAction,
    pub resource_id: Option<String>,
    pub metadata: Map<String, Value>,
    pub ip_address: Option<String>,
}

impl AuditRecord {
    pub fn new(owner_id: OwnerId, action: AuditAction) -> Self {
        Self {
            owner_id,
            action,
            resource_id: None,
            metadata: Map::new(),
            ip_address: None,
        }
    }

    pub fn resource(mut self, resource_id: impl Into<String>) -> Self {
        self.resource_id = Some(resource_id.into());
        self
    }

    /// Attach a metadata annotation.  Never pass secret values here.
    pub fn meta(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }

    pub fn ip_address(mut self, ip: Option<&str>) -> Self {
        self.ip_address = ip.map(str::to_string);
        self
    }

    pub fn user_agent(self, user_agent: Option<&str>) -> Self {
        match user_agent {
            Some(ua) => self.meta("userAgent", ua),
            None => self,
        }
    }
}

/// Query options for `AuditLog::query`.  Both date bounds are inclusive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditQuery {
    pub limit: u32,
    pub offset: u32,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

impl Default for AuditQuery {
    fn default() -> Self {
        Self {
            limit: DEFAULT_AUDIT_PAGE_SIZE,
            offset: 0,
            start_date: None,
            end_date: None,
        }
    }
}

/// The audit log, backed by any `AuditRepository`.
#[derive(Clone)]
pub struct AuditLog {
    repo: Arc<dyn AuditRepository>,
}

impl AuditLog {
    pub fn new(repo: Arc<dyn AuditRepository>) -> Self {
        Self { repo }
    }

    /// Record an action.  Never fails the caller: if the store is
    /// unavailable the failure is logged and `None` is returned.
    pub fn append(&self, record: AuditRecord) -> Option<AuditEntry> {
        let mut entry = AuditEntry {
            id: uuid::Uuid::new_v4().to_string(),
            sequence: 0,
            owner_id: record.owner_id,
            action: record.action,
            resource_id: record.resource_id,
            metadata: record.metadata,
            ip_address: record.ip_address,
            created_at: storage::now(),
        };

        match self.repo.insert_entry(&entry) {
            Ok(sequence) => {
                entry.sequence = sequence;
                Some(entry)
            }
            Err(e) => {
                tracing::warn!(
                    owner_id = %entry.owner_id,
                    action = %entry.action,
                    resource_id = ?entry.resource_id,
                    error = %e,
                    "audit append failed"
                );
                None
            }
        }
    }

    /// Entries for `owner_id`, newest first.
    pub fn query(&self, owner_id: &OwnerId, query: &AuditQuery) -> Result<Page<AuditEntry>> {
        validate_page_size(query.limit, MAX_AUDIT_PAGE_SIZE)?;
        if let (Some(start), Some(end)) = (query.start_date, query.end_date) {
            if start > end {
                return Err(VaultError::Validation(
                    "startDate must not be after endDate".into(),
                ));
            }
        }

        let (total, items) = self.repo.list_entries(owner_id, query)?;
        Ok(Page {
            total,
            limit: query.limit,
            offset: query.offset,
            items,
        })
    }

    /// Irreversibly delete entries older than `retention_days`.
    pub fn purge_older_than(&self, retention_days: u32) -> Result<u64> {
        let out_of_range = || {
            VaultError::Validation(format!(
                "retention must be at most {MAX_RETENTION_DAYS} days (got {retention_days})"
            ))
        };
        if retention_days > MAX_RETENTION_DAYS {
            return Err(out_of_range());
        }
        let cutoff = Duration::try_days(i64::from(retention_days))
            .and_then(|horizon| storage::now().checked_sub_signed(horizon))
            .ok_or_else(out_of_range)?;
        let removed = self.repo.delete_entries_before(cutoff)?;
        tracing::info!(retention_days, removed, %cutoff, "purged audit entries");
        Ok(removed)
    }
}
