//! Request-level façade over the vault, the audit log and the access gate.
//!
//! Every secret operation is executed exactly once and then followed by
//! exactly one audit append, whatever the outcome.  Failed operations are
//! recorded with `outcome: "failure"` and the error kind; the requested
//! resource id is kept even when the lookup failed.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use zeroize::Zeroizing;

use crate::audit::{AuditAction, AuditEntry, AuditLog, AuditQuery, AuditRecord};
use crate::auth::{
    AccessGate, Authenticated, Challenge, EthereumRecovery, OwnerId, SessionIssuer,
    SignerRecovery,
};
use crate::config::Settings;
use crate::crypto::{CryptoEngine, MasterKey};
use crate::errors::Result;
use crate::storage::SqliteStorage;
use crate::vault::{
    ListOptions, NewSecret, Page, SearchOptions, SecretMetadata, SecretStore, SecretUpdate,
};

/// Who is making a request, and from where.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    pub owner_id: OwnerId,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl RequestContext {
    pub fn new(owner_id: OwnerId) -> Self {
        Self {
            owner_id,
            ip_address: None,
            user_agent: None,
        }
    }
}

/// A secret's metadata together with its decrypted value.
pub struct RevealedSecret {
    pub metadata: SecretMetadata,
    pub value: Zeroizing<String>,
}

impl fmt::Debug for RevealedSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RevealedSecret")
            .field("metadata", &self.metadata)
            .field("value", &"<redacted>")
            .finish()
    }
}

pub struct VaultService {
    store: SecretStore,
    audit: AuditLog,
    gate: AccessGate,
}

impl VaultService {
    pub fn new(store: SecretStore, audit: AuditLog, gate: AccessGate) -> Self {
        Self { store, audit, gate }
    }

    /// Wire every component over one SQLite handle.
    pub fn with_storage(
        storage: Arc<SqliteStorage>,
        settings: &Settings,
        master_key: MasterKey,
        session_secret: &[u8],
        recovery: Arc<dyn SignerRecovery>,
    ) -> Result<Self> {
        let crypto = CryptoEngine::new(master_key);
        let sessions = SessionIssuer::new(session_secret, settings.session_ttl())?;
        let gate = AccessGate::new(storage.clone(), storage.clone(), recovery, sessions)
            .require_challenges(settings.require_login_challenge)
            .challenge_ttl(settings.challenge_ttl());

        Ok(Self::new(
            SecretStore::new(storage.clone(), Arc::new(crypto)),
            AuditLog::new(storage),
            gate,
        ))
    }

    /// Open the database configured in `settings` and wire everything up
    /// with Ethereum signature recovery.
    pub fn open(
        project_dir: &Path,
        settings: &Settings,
        master_key: MasterKey,
        session_secret: &[u8],
    ) -> Result<Self> {
        let storage = Arc::new(SqliteStorage::open(&settings.database_path(project_dir))?);
        Self::with_storage(
            storage,
            settings,
            master_key,
            session_secret,
            Arc::new(EthereumRecovery),
        )
    }

    pub fn store(&self) -> &SecretStore {
        &self.store
    }

    pub fn audit_log(&self) -> &AuditLog {
        &self.audit
    }

    pub fn gate(&self) -> &AccessGate {
        &self.gate
    }

    // ------------------------------------------------------------------
    // Sessions
    // ------------------------------------------------------------------

    pub fn issue_challenge(&self, address: &str) -> Result<Challenge> {
        self.gate.issue_challenge(address)
    }

    /// Authenticate a signed message.  Successful logins are audited;
    /// failed ones have no owner and only reach the tracing channel.
    pub fn login(
        &self,
        message: &str,
        signature: &str,
        address: &str,
        ip_address: Option<&str>,
        user_agent: Option<&str>,
    ) -> Result<Authenticated> {
        let authenticated = self.gate.authenticate(message, signature, address)?;

        self.audit.append(
            AuditRecord::new(authenticated.owner.id.clone(), AuditAction::Login)
                .meta("outcome", "success")
                .meta("address", authenticated.owner.address.as_str())
                .ip_address(ip_address)
                .user_agent(user_agent),
        );
        Ok(authenticated)
    }

    /// Verify a session credential and build the request context.
    pub fn authorize(
        &self,
        credential: &str,
        ip_address: Option<&str>,
        user_agent: Option<&str>,
    ) -> Result<RequestContext> {
        let owner_id = self.gate.verify(credential)?;
        Ok(RequestContext {
            owner_id,
            ip_address: ip_address.map(str::to_string),
            user_agent: user_agent.map(str::to_string),
        })
    }

    /// Record a logout.  Credentials stay valid until they expire.
    pub fn logout(&self, ctx: &RequestContext) {
        self.audit
            .append(self.record(ctx, AuditAction::Logout).meta("outcome", "success"));
    }

    // ------------------------------------------------------------------
    // Secrets
    // ------------------------------------------------------------------

    pub fn create(&self, ctx: &RequestContext, input: NewSecret) -> Result<SecretMetadata> {
        let mut record = self
            .record(ctx, AuditAction::CreateSecret)
            .meta("name", input.name.trim())
            .meta("category", input.category.unwrap_or_default().as_str());

        let result = self.store.create(&ctx.owner_id, input);
        if let Ok(meta) = &result {
            record = record.resource(meta.id.as_str());
        }
        self.finish(record, &result);
        result
    }

    /// Metadata only.  Recorded as a view.
    pub fn get(&self, ctx: &RequestContext, id: &str) -> Result<SecretMetadata> {
        let result = self.store.get(&ctx.owner_id, id).map(|s| s.metadata());
        let mut record = self.record(ctx, AuditAction::ViewSecret).resource(id);
        if let Ok(meta) = &result {
            record = record.meta("name", meta.name.as_str());
        }
        self.finish(record, &result);
        result
    }

    /// Metadata plus decrypted value.  Recorded as a view.
    pub fn reveal(&self, ctx: &RequestContext, id: &str) -> Result<RevealedSecret> {
        let result = self.store.get(&ctx.owner_id, id).and_then(|secret| {
            Ok(RevealedSecret {
                value: self.store.open_secret(&secret)?,
                metadata: secret.metadata(),
            })
        });

        let mut record = self
            .record(ctx, AuditAction::ViewSecret)
            .resource(id)
            .meta("revealed", true);
        if let Ok(revealed) = &result {
            record = record.meta("name", revealed.metadata.name.as_str());
        }
        self.finish(record, &result);
        result
    }

    pub fn list(
        &self,
        ctx: &RequestContext,
        options: &ListOptions,
    ) -> Result<Page<SecretMetadata>> {
        let result = self.store.list(&ctx.owner_id, options);

        let mut record = self
            .record(ctx, AuditAction::ViewSecrets)
            .meta("page", page_number(options.offset, options.limit))
            .meta("limit", options.limit);
        if let Some(category) = options.category {
            record = record.meta("category", category.as_str());
        }
        if let Some(search) = options.search.as_deref() {
            record = record.meta("search", search);
        }
        if let Ok(page) = &result {
            record = record.meta("count", page.items.len()).meta("total", page.total);
        }
        self.finish(record, &result);
        result
    }

    pub fn search(
        &self,
        ctx: &RequestContext,
        options: &SearchOptions,
    ) -> Result<Page<SecretMetadata>> {
        let result = self.store.search(&ctx.owner_id, options);

        let mut record = self
            .record(ctx, AuditAction::SearchSecrets)
            .meta("query", options.query.as_str())
            .meta("page", page_number(options.offset, options.limit));
        if let Some(category) = options.category {
            record = record.meta("category", category.as_str());
        }
        if let Ok(page) = &result {
            record = record.meta("count", page.items.len()).meta("total", page.total);
        }
        self.finish(record, &result);
        result
    }

    pub fn update(
        &self,
        ctx: &RequestContext,
        id: &str,
        changes: SecretUpdate,
    ) -> Result<SecretMetadata> {
        let mut fields = Vec::new();
        if changes.name.is_some() {
            fields.push("name");
        }
        if changes.value.is_some() {
            fields.push("value");
        }
        if changes.category.is_some() {
            fields.push("category");
        }

        let result = self.store.update(&ctx.owner_id, id, changes);

        let mut record = self
            .record(ctx, AuditAction::UpdateSecret)
            .resource(id)
            .meta("fields", fields);
        if let Ok(meta) = &result {
            record = record
                .meta("name", meta.name.as_str())
                .meta("category", meta.category.as_str());
        }
        self.finish(record, &result);
        result
    }

    pub fn delete(&self, ctx: &RequestContext, id: &str) -> Result<()> {
        let result = self.store.delete(&ctx.owner_id, id);
        self.finish(
            self.record(ctx, AuditAction::DeleteSecret).resource(id),
            &result,
        );
        result
    }

    // ------------------------------------------------------------------
    // Audit
    // ------------------------------------------------------------------

    /// The caller's own audit trail, newest first.  Not itself audited.
    pub fn audit_trail(
        &self,
        ctx: &RequestContext,
        query: &AuditQuery,
    ) -> Result<Page<AuditEntry>> {
        self.audit.query(&ctx.owner_id, query)
    }

    /// Retention maintenance.  Not itself audited.
    pub fn purge_audit(&self, retention_days: u32) -> Result<u64> {
        self.audit.purge_older_than(retention_days)
    }

    // ------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------

    fn record(&self, ctx: &RequestContext, action: AuditAction) -> AuditRecord {
        AuditRecord::new(ctx.owner_id.clone(), action)
            .ip_address(ctx.ip_address.as_deref())
            .user_agent(ctx.user_agent.as_deref())
    }

    fn finish<T>(&self, record: AuditRecord, result: &Result<T>) {
        let record = match result {
            Ok(_) => record.meta("outcome", "success"),
            Err(e) => record
                .meta("outcome", "failure")
                .meta("error", e.kind().as_str()),
        };
        self.audit.append(record);
    }
}

fn page_number(offset: u32, limit: u32) -> u32 {
    if limit == 0 {
        return 1;
    }
    offset / limit + 1
}
