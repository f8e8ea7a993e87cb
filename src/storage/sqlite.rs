//! SQLite implementation of every persistence trait.
//!
//! One database file holds four tables:
//!
//! - `owners`: one row per address, keyed by an opaque uuid
//! - `secrets`: encrypted payloads, always queried by `owner_id`
//! - `audit_log`: append-only; `seq` is the insertion order
//! - `login_challenges`: outstanding single-use challenges
//!
//! Timestamps are stored as fixed-width RFC 3339 text in UTC with
//! microsecond precision, so string comparison is time comparison.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::{ToSql, Type};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde_json::{Map, Value};

use super::{AuditRepository, ChallengeRepository, OwnerRepository, SecretRepository};
use crate::audit::{AuditAction, AuditEntry, AuditQuery};
use crate::auth::challenge::{normalize_address, Challenge};
use crate::auth::{Owner, OwnerId};
use crate::errors::{Result, VaultError};
use crate::vault::{Category, Secret, SecretFilter, SecretMetadata};

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS owners (
        id          TEXT PRIMARY KEY,
        address     TEXT NOT NULL UNIQUE,
        created_at  TEXT NOT NULL,
        last_login  TEXT
    );

    CREATE TABLE IF NOT EXISTS secrets (
        id              TEXT PRIMARY KEY,
        owner_id        TEXT NOT NULL,
        name            TEXT NOT NULL,
        category        TEXT NOT NULL,
        cipher_payload  TEXT NOT NULL,
        created_at      TEXT NOT NULL,
        updated_at      TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_secrets_owner_created
        ON secrets (owner_id, created_at);

    CREATE TABLE IF NOT EXISTS audit_log (
        seq          INTEGER PRIMARY KEY AUTOINCREMENT,
        id           TEXT NOT NULL UNIQUE,
        owner_id     TEXT NOT NULL,
        action       TEXT NOT NULL,
        resource_id  TEXT,
        metadata     TEXT NOT NULL,
        ip_address   TEXT,
        created_at   TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_audit_owner_created
        ON audit_log (owner_id, created_at);
    CREATE INDEX IF NOT EXISTS idx_audit_created
        ON audit_log (created_at);

    CREATE TABLE IF NOT EXISTS login_challenges (
        nonce       TEXT PRIMARY KEY,
        address     TEXT NOT NULL,
        message     TEXT NOT NULL,
        expires_at  TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_challenges_address
        ON login_challenges (address);
";

/// SQLite-backed storage.  All access is serialised through one
/// connection.
pub struct SqliteStorage {
    conn: Mutex<Connection>,
}

impl SqliteStorage {
    /// Open (or create) the database at `path`, creating parent
    /// directories as needed.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        // The file holds ciphertext and the audit trail.  It must never
        // exist with umask permissions, not even briefly.
        create_owner_only(path)?;
        let conn = Connection::open(path)?;

        conn.busy_timeout(std::time::Duration::from_secs(5))?;
        Self::with_connection(conn)
    }

    /// A private in-memory database.  Used by tests and dry runs.
    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| VaultError::PersistenceUnavailable("connection lock poisoned".into()))
    }
}

// ── Secrets ─────────────────────────────────────────────────────────

impl SecretRepository for SqliteStorage {
    fn insert_secret(&self, secret: &Secret) -> Result<()> {
        self.conn()?.execute(
            "INSERT INTO secrets (id, owner_id, name, category, cipher_payload, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                secret.id,
                secret.owner_id.as_str(),
                secret.name,
                secret.category.as_str(),
                secret.cipher_payload,
                format_ts(&secret.created_at),
                format_ts(&secret.updated_at),
            ],
        )?;
        Ok(())
    }

    fn find_secret(&self, owner_id: &OwnerId, id: &str) -> Result<Option<Secret>> {
        let secret = self
            .conn()?
            .query_row(
                "SELECT id, owner_id, name, category, cipher_payload, created_at, updated_at
                 FROM secrets
                 WHERE id = ?1 AND owner_id = ?2",
                params![id, owner_id.as_str()],
                row_to_secret,
            )
            .optional()?;
        Ok(secret)
    }

    fn list_secrets(
        &self,
        owner_id: &OwnerId,
        filter: &SecretFilter,
    ) -> Result<(u64, Vec<SecretMetadata>)> {
        let mut clauses = vec!["owner_id = ?"];
        let mut params: Vec<Box<dyn ToSql>> = vec![Box::new(owner_id.as_str().to_string())];

        if let Some(category) = filter.category {
            clauses.push("category = ?");
            params.push(Box::new(category.as_str().to_string()));
        }
        if let Some(needle) = &filter.name_contains {
            clauses.push("name LIKE ? ESCAPE '\\'");
            params.push(Box::new(format!("%{}%", escape_like(needle))));
        }

        let where_sql = clauses.join(" AND ");
        let conn = self.conn()?;

        let params_refs: Vec<&dyn ToSql> = params.iter().map(|p| &**p).collect();
        let total: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM secrets WHERE {where_sql}"),
            params_refs.as_slice(),
            |row| row.get(0),
        )?;

        let limit = i64::from(filter.limit);
        let offset = i64::from(filter.offset);
        let mut page_refs = params_refs.clone();
        page_refs.push(&limit);
        page_refs.push(&offset);

        let mut stmt = conn.prepare(&format!(
            "SELECT id, name, category, created_at, updated_at
             FROM secrets
             WHERE {where_sql}
             ORDER BY created_at DESC, rowid DESC
             LIMIT ? OFFSET ?"
        ))?;
        let rows = stmt.query_map(page_refs.as_slice(), |row| {
            Ok(SecretMetadata {
                id: row.get(0)?,
                name: row.get(1)?,
                category: parse_category(row, 2)?,
                created_at: parse_ts(row, 3)?,
                updated_at: parse_ts(row, 4)?,
            })
        })?;

        let items = rows.collect::<rusqlite::Result<Vec<_>>>()?;
        Ok((u64::try_from(total).unwrap_or(0), items))
    }

    fn update_secret(&self, secret: &Secret) -> Result<bool> {
        let changed = self.conn()?.execute(
            "UPDATE secrets
             SET name = ?1, category = ?2, cipher_payload = ?3, updated_at = ?4
             WHERE id = ?5 AND owner_id = ?6",
            params![
                secret.name,
                secret.category.as_str(),
                secret.cipher_payload,
                format_ts(&secret.updated_at),
                secret.id,
                secret.owner_id.as_str(),
            ],
        )?;
        Ok(changed > 0)
    }

    fn delete_secret(&self, owner_id: &OwnerId, id: &str) -> Result<bool> {
        let changed = self.conn()?.execute(
            "DELETE FROM secrets WHERE id = ?1 AND owner_id = ?2",
            params![id, owner_id.as_str()],
        )?;
        Ok(changed > 0)
    }
}

// ── Audit log ───────────────────────────────────────────────────────

impl AuditRepository for SqliteStorage {
    fn insert_entry(&self, entry: &AuditEntry) -> Result<i64> {
        let metadata = serde_json::to_string(&entry.metadata)
            .map_err(|e| VaultError::PersistenceUnavailable(format!("audit metadata: {e}")))?;

        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO audit_log (id, owner_id, action, resource_id, metadata, ip_address, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                entry.id,
                entry.owner_id.as_str(),
                entry.action.as_str(),
                entry.resource_id,
                metadata,
                entry.ip_address,
                format_ts(&entry.created_at),
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    fn list_entries(
        &self,
        owner_id: &OwnerId,
        query: &AuditQuery,
    ) -> Result<(u64, Vec<AuditEntry>)> {
        let mut clauses = vec!["owner_id = ?"];
        let mut params: Vec<Box<dyn ToSql>> = vec![Box::new(owner_id.as_str().to_string())];

        if let Some(start) = &query.start_date {
            clauses.push("created_at >= ?");
            params.push(Box::new(format_ts(start)));
        }
        if let Some(end) = &query.end_date {
            clauses.push("created_at <= ?");
            params.push(Box::new(format_ts(end)));
        }

        let where_sql = clauses.join(" AND ");
        let conn = self.conn()?;

        let params_refs: Vec<&dyn ToSql> = params.iter().map(|p| &**p).collect();
        let total: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM audit_log WHERE {where_sql}"),
            params_refs.as_slice(),
            |row| row.get(0),
        )?;

        let limit = i64::from(query.limit);
        let offset = i64::from(query.offset);
        let mut page_refs = params_refs.clone();
        page_refs.push(&limit);
        page_refs.push(&offset);

        let mut stmt = conn.prepare(&format!(
            "SELECT seq, id, owner_id, action, resource_id, metadata, ip_address, created_at
             FROM audit_log
             WHERE {where_sql}
             ORDER BY created_at DESC, seq DESC
             LIMIT ? OFFSET ?"
        ))?;
        let rows = stmt.query_map(page_refs.as_slice(), row_to_entry)?;

        let items = rows.collect::<rusqlite::Result<Vec<_>>>()?;
        Ok((u64::try_from(total).unwrap_or(0), items))
    }

    fn delete_entries_before(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let removed = self.conn()?.execute(
            "DELETE FROM audit_log WHERE created_at < ?1",
            params![format_ts(&cutoff)],
        )?;
        Ok(removed as u64)
    }
}

// ── Owners ──────────────────────────────────────────────────────────

impl OwnerRepository for SqliteStorage {
    fn record_login(&self, address: &str, now: DateTime<Utc>) -> Result<Owner> {
        let address = normalize_address(address);
        let ts = format_ts(&now);
        let conn = self.conn()?;

        conn.execute(
            "INSERT INTO owners (id, address, created_at, last_login)
             VALUES (?1, ?2, ?3, ?3)
             ON CONFLICT(address) DO UPDATE SET last_login = excluded.last_login",
            params![uuid::Uuid::new_v4().to_string(), address, ts],
        )?;

        let owner = conn.query_row(
            "SELECT id, address, created_at, last_login FROM owners WHERE address = ?1",
            params![address],
            row_to_owner,
        )?;
        Ok(owner)
    }

    fn find_owner(&self, id: &OwnerId) -> Result<Option<Owner>> {
        let owner = self
            .conn()?
            .query_row(
                "SELECT id, address, created_at, last_login FROM owners WHERE id = ?1",
                params![id.as_str()],
                row_to_owner,
            )
            .optional()?;
        Ok(owner)
    }
}

// ── Login challenges ────────────────────────────────────────────────

impl ChallengeRepository for SqliteStorage {
    fn insert_challenge(&self, challenge: &Challenge) -> Result<()> {
        let conn = self.conn()?;

        // Sweep expired challenges so the table stays small.
        conn.execute(
            "DELETE FROM login_challenges WHERE expires_at <= ?1",
            params![format_ts(&super::now())],
        )?;

        conn.execute(
            "INSERT INTO login_challenges (nonce, address, message, expires_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                challenge.nonce,
                normalize_address(&challenge.address),
                challenge.message,
                format_ts(&challenge.expires_at),
            ],
        )?;
        Ok(())
    }

    fn consume_challenge(&self, address: &str, message: &str, now: DateTime<Utc>) -> Result<bool> {
        let removed = self.conn()?.execute(
            "DELETE FROM login_challenges
             WHERE address = ?1 AND message = ?2 AND expires_at > ?3",
            params![normalize_address(address), message, format_ts(&now)],
        )?;
        Ok(removed == 1)
    }
}

// ── Row mapping ─────────────────────────────────────────────────────

fn format_ts(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_ts(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn parse_opt_ts(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|raw| {
        DateTime::parse_from_rfc3339(&raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
    })
    .transpose()
}

fn parse_category(row: &Row<'_>, idx: usize) -> rusqlite::Result<Category> {
    let raw: String = row.get(idx)?;
    raw.parse()
        .map_err(|e: VaultError| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn row_to_secret(row: &Row<'_>) -> rusqlite::Result<Secret> {
    Ok(Secret {
        id: row.get(0)?,
        owner_id: OwnerId::new(row.get::<_, String>(1)?),
        name: row.get(2)?,
        category: parse_category(row, 3)?,
        cipher_payload: row.get(4)?,
        created_at: parse_ts(row, 5)?,
        updated_at: parse_ts(row, 6)?,
    })
}

fn row_to_owner(row: &Row<'_>) -> rusqlite::Result<Owner> {
    Ok(Owner {
        id: OwnerId::new(row.get::<_, String>(0)?),
        address: row.get(1)?,
        created_at: parse_ts(row, 2)?,
        last_login: parse_opt_ts(row, 3)?,
    })
}

fn row_to_entry(row: &Row<'_>) -> rusqlite::Result<AuditEntry> {
    let action: String = row.get(3)?;
    let action: AuditAction = action
        .parse()
        .map_err(|e: VaultError| rusqlite::Error::FromSqlConversionFailure(3, Type::Text, Box::new(e)))?;

    let metadata: String = row.get(5)?;
    let metadata: Map<String, Value> = serde_json::from_str(&metadata)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(5, Type::Text, Box::new(e)))?;

    Ok(AuditEntry {
        sequence: row.get(0)?,
        id: row.get(1)?,
        owner_id: OwnerId::new(row.get::<_, String>(2)?),
        action,
        resource_id: row.get(4)?,
        metadata,
        ip_address: row.get(6)?,
        created_at: parse_ts(row, 7)?,
    })
}

/// Escape `%`, `_` and the escape character itself for a `LIKE ... ESCAPE '\'`.
fn escape_like(needle: &str) -> String {
    let mut escaped = String::with_capacity(needle.len());
    for c in needle.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Create `path` as an owner-only file if it is missing, and tighten an
/// existing file to the same mode.
#[cfg(unix)]
fn create_owner_only(path: &Path) -> Result<()> {
    use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

    std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .mode(0o600)
        .open(path)?;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
    Ok(())
}

#[cfg(not(unix))]
fn create_owner_only(_path: &Path) -> Result<()> {
    Ok(())
}
