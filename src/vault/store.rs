//! Owner-scoped secret operations.
//!
//! `SecretStore` ties the crypto engine to a `SecretRepository`.  Every
//! lookup carries the caller's owner id down to the query, and a secret
//! that exists under another owner is reported exactly like one that does
//! not exist at all.
//!
//! None of these methods retry.  Re-running `create` or a value `update`
//! produces a second ciphertext under a new salt and nonce, so repeating
//! one is left to the caller.

use std::sync::Arc;

use zeroize::Zeroizing;

use crate::auth::OwnerId;
use crate::crypto::CryptoEngine;
use crate::errors::{Result, VaultError};
use crate::storage::{self, SecretRepository};

use super::secret::{
    validate_page_size, ListOptions, NewSecret, Page, SearchOptions, Secret, SecretFilter,
    SecretMetadata, SecretUpdate, MAX_PAGE_SIZE,
};

/// The secret vault for all owners.  Cheap to clone.
#[derive(Clone)]
pub struct SecretStore {
    repo: Arc<dyn SecretRepository>,
    crypto: Arc<CryptoEngine>,
}

impl SecretStore {
    pub fn new(repo: Arc<dyn SecretRepository>, crypto: Arc<CryptoEngine>) -> Self {
        Self { repo, crypto }
    }

    // ------------------------------------------------------------------
    // Writes
    // ------------------------------------------------------------------

    /// Encrypt and store a new secret.  Returns metadata only.
    pub fn create(&self, owner_id: &OwnerId, input: NewSecret) -> Result<SecretMetadata> {
        input.validate()?;

        let payload = self.crypto.encrypt(input.value.as_bytes())?;
        let now = storage::now();
        let secret = Secret {
            id: uuid::Uuid::new_v4().to_string(),
            owner_id: owner_id.clone(),
            name: input.name.trim().to_string(),
            category: input.category.unwrap_or_default(),
            cipher_payload: payload.to_string(),
            created_at: now,
            updated_at: now,
        };

        self.repo.insert_secret(&secret)?;
        tracing::debug!(owner_id = %owner_id, secret_id = %secret.id, "secret created");
        Ok(secret.metadata())
    }

    /// Apply the supplied fields.  A new value always gets a fresh
    /// payload; name and category changes leave the payload untouched.
    pub fn update(
        &self,
        owner_id: &OwnerId,
        id: &str,
        changes: SecretUpdate,
    ) -> Result<SecretMetadata> {
        changes.validate()?;

        let mut secret = self.get(owner_id, id)?;
        if let Some(name) = changes.name {
            secret.name = name.trim().to_string();
        }
        if let Some(category) = changes.category {
            secret.category = category;
        }
        if let Some(value) = changes.value {
            secret.cipher_payload = self.crypto.encrypt(value.as_bytes())?.to_string();
        }
        secret.updated_at = storage::now();

        if !self.repo.update_secret(&secret)? {
            return Err(VaultError::NotFound);
        }
        tracing::debug!(owner_id = %owner_id, secret_id = %id, "secret updated");
        Ok(secret.metadata())
    }

    /// Hard delete.  Deleting twice fails the second time.
    pub fn delete(&self, owner_id: &OwnerId, id: &str) -> Result<()> {
        if !self.repo.delete_secret(owner_id, id)? {
            return Err(VaultError::NotFound);
        }
        tracing::debug!(owner_id = %owner_id, secret_id = %id, "secret deleted");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    /// Fetch the stored record, encrypted payload included.
    pub fn get(&self, owner_id: &OwnerId, id: &str) -> Result<Secret> {
        self.repo
            .find_secret(owner_id, id)?
            .ok_or(VaultError::NotFound)
    }

    /// Fetch and decrypt a secret's value.
    pub fn reveal(&self, owner_id: &OwnerId, id: &str) -> Result<Zeroizing<String>> {
        let secret = self.get(owner_id, id)?;
        self.open_secret(&secret)
    }

    /// Decrypt a record already fetched with `get`.
    pub fn open_secret(&self, secret: &Secret) -> Result<Zeroizing<String>> {
        self.crypto.decrypt_str(&secret.cipher_payload).inspect_err(|e| {
            tracing::warn!(
                owner_id = %secret.owner_id,
                secret_id = %secret.id,
                error = %e,
                "secret failed to decrypt"
            );
        })
    }

    pub fn list(&self, owner_id: &OwnerId, options: &ListOptions) -> Result<Page<SecretMetadata>> {
        let search = options
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty());

        self.page(
            owner_id,
            SecretFilter {
                category: options.category,
                name_contains: search.map(str::to_string),
                limit: options.limit,
                offset: options.offset,
            },
        )
    }

    /// Like `list`, but the name query is mandatory.
    pub fn search(
        &self,
        owner_id: &OwnerId,
        options: &SearchOptions,
    ) -> Result<Page<SecretMetadata>> {
        let query = options.query.trim();
        if query.is_empty() {
            return Err(VaultError::Validation("Search query is required".into()));
        }

        self.page(
            owner_id,
            SecretFilter {
                category: options.category,
                name_contains: Some(query.to_string()),
                limit: options.limit,
                offset: options.offset,
            },
        )
    }

    fn page(&self, owner_id: &OwnerId, filter: SecretFilter) -> Result<Page<SecretMetadata>> {
        validate_page_size(filter.limit, MAX_PAGE_SIZE)?;

        let (total, items) = self.repo.list_secrets(owner_id, &filter)?;
        tracing::debug!(owner_id = %owner_id, total, returned = items.len(), "secrets listed");
        Ok(Page {
            total,
            limit: filter.limit,
            offset: filter.offset,
            items,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::MasterKey;
    use crate::storage::SqliteStorage;
    use crate::vault::Category;

    fn store() -> SecretStore {
        let engine = CryptoEngine::new(MasterKey::new(b"unit-test-master-key".to_vec()).unwrap());
        SecretStore::new(
            Arc::new(SqliteStorage::open_in_memory().unwrap()),
            Arc::new(engine),
        )
    }

    #[test]
    fn create_defaults_category_and_hides_value() {
        let store = store();
        let owner = OwnerId::new("owner");
        let meta = store.create(&owner, NewSecret::new("db", "hunter2")).unwrap();

        assert_eq!(meta.category, Category::Other);
        assert!(!serde_json::to_string(&meta).unwrap().contains("hunter2"));

        let stored = store.get(&owner, &meta.id).unwrap();
        assert!(!stored.cipher_payload.contains("hunter2"));
        assert_eq!(store.reveal(&owner, &meta.id).unwrap().as_str(), "hunter2");
    }

    #[test]
    fn rename_keeps_payload() {
        let store = store();
        let owner = OwnerId::new("owner");
        let meta = store.create(&owner, NewSecret::new("db", "v")).unwrap();
        let before = store.get(&owner, &meta.id).unwrap().cipher_payload;

        let updated = store
            .update(&owner, &meta.id, SecretUpdate::default().name("database"))
            .unwrap();
        assert_eq!(updated.name, "database");
        assert_eq!(store.get(&owner, &meta.id).unwrap().cipher_payload, before);
    }

    #[test]
    fn new_value_replaces_payload() {
        let store = store();
        let owner = OwnerId::new("owner");
        let meta = store.create(&owner, NewSecret::new("db", "v1")).unwrap();
        let before = store.get(&owner, &meta.id).unwrap().cipher_payload;

        store
            .update(&owner, &meta.id, SecretUpdate::default().value("v2"))
            .unwrap();
        let after = store.get(&owner, &meta.id).unwrap().cipher_payload;
        assert_ne!(after, before);
        assert_eq!(store.reveal(&owner, &meta.id).unwrap().as_str(), "v2");
    }

    #[test]
    fn empty_update_is_rejected() {
        let store = store();
        let owner = OwnerId::new("owner");
        let meta = store.create(&owner, NewSecret::new("db", "v")).unwrap();
        let err = store
            .update(&owner, &meta.id, SecretUpdate::default())
            .unwrap_err();
        assert!(matches!(err, VaultError::Validation(_)));
    }

    #[test]
    fn second_delete_is_not_found() {
        let store = store();
        let owner = OwnerId::new("owner");
        let meta = store.create(&owner, NewSecret::new("db", "v")).unwrap();

        store.delete(&owner, &meta.id).unwrap();
        assert!(matches!(
            store.delete(&owner, &meta.id),
            Err(VaultError::NotFound)
        ));
    }

    #[test]
    fn blank_search_is_rejected() {
        let err = store()
            .search(&OwnerId::new("owner"), &SearchOptions::new("   "))
            .unwrap_err();
        assert!(matches!(err, VaultError::Validation(_)));
    }

    #[test]
    fn oversized_page_is_rejected() {
        let options = ListOptions {
            limit: MAX_PAGE_SIZE + 1,
            ..ListOptions::default()
        };
        assert!(store().list(&OwnerId::new("owner"), &options).is_err());
    }
}
