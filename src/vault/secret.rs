//! Secret entities and the input/query types for `SecretStore`.
//!
//! A `Secret` only ever holds the encrypted payload string; plaintext
//! lives in `Zeroizing` buffers on the way in (`NewSecret`,
//! `SecretUpdate`) and on the way out (`SecretStore::reveal`), and those
//! types redact themselves in `Debug` output.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::auth::OwnerId;
use crate::errors::{Result, VaultError};

/// Maximum length of a secret name, in characters.
pub const MAX_NAME_LEN: usize = 100;

/// Default and maximum page sizes for list and search.
pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const MAX_PAGE_SIZE: u32 = 100;

/// The fixed set of secret categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Category {
    Password,
    ApiKey,
    Note,
    #[default]
    Other,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Password,
        Category::ApiKey,
        Category::Note,
        Category::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Password => "PASSWORD",
            Category::ApiKey => "API_KEY",
            Category::Note => "NOTE",
            Category::Other => "OTHER",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = VaultError;

    fn from_str(s: &str) -> Result<Self> {
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| {
                let allowed: Vec<&str> = Category::ALL.iter().map(Category::as_str).collect();
                VaultError::Validation(format!(
                    "Invalid category. Must be one of: {}",
                    allowed.join(", ")
                ))
            })
    }
}

/// A stored secret, as persisted.  Never contains plaintext.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Secret {
    pub id: String,
    pub owner_id: OwnerId,
    pub name: String,
    pub category: Category,
    /// `salt:nonce:tag:ciphertext`, see `crypto::payload`.
    pub cipher_payload: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Secret {
    pub fn metadata(&self) -> SecretMetadata {
        SecretMetadata {
            id: self.id.clone(),
            name: self.name.clone(),
            category: self.category,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// The public view of a secret: no ciphertext, no plaintext.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SecretMetadata {
    pub id: String,
    pub name: String,
    pub category: Category,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for `SecretStore::create`.
pub struct NewSecret {
    pub name: String,
    pub value: Zeroizing<String>,
    /// Defaults to `Category::Other`.
    pub category: Option<Category>,
}

impl NewSecret {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: Zeroizing::new(value.into()),
            category: None,
        }
    }

    pub fn with_category(mut self, category: Category) -> Self {
        self.category = Some(category);
        self
    }

    pub(crate) fn validate(&self) -> Result<()> {
        validate_name(&self.name)?;
        validate_value(&self.value)
    }
}

impl fmt::Debug for NewSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewSecret")
            .field("name", &self.name)
            .field("value", &"<redacted>")
            .field("category", &self.category)
            .finish()
    }
}

/// Input for `SecretStore::update`.  Only supplied fields change.
#[derive(Default)]
pub struct SecretUpdate {
    pub name: Option<String>,
    pub value: Option<Zeroizing<String>>,
    pub category: Option<Category>,
}

impl SecretUpdate {
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(Zeroizing::new(value.into()));
        self
    }

    pub fn category(mut self, category: Category) -> Self {
        self.category = Some(category);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.value.is_none() && self.category.is_none()
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.is_empty() {
            return Err(VaultError::Validation("nothing to update".into()));
        }
        if let Some(name) = &self.name {
            validate_name(name)?;
        }
        if let Some(value) = &self.value {
            validate_value(value)?;
        }
        Ok(())
    }
}

impl fmt::Debug for SecretUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretUpdate")
            .field("name", &self.name)
            .field("value", &self.value.as_ref().map(|_| "<redacted>"))
            .field("category", &self.category)
            .finish()
    }
}

/// Options for `SecretStore::list`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListOptions {
    pub limit: u32,
    pub offset: u32,
    pub category: Option<Category>,
    pub search: Option<String>,
}

impl Default for ListOptions {
    fn default() -> Self {
        Self {
            limit: DEFAULT_PAGE_SIZE,
            offset: 0,
            category: None,
            search: None,
        }
    }
}

impl ListOptions {
    /// Build options from a 1-based page number.  Page 0 is treated as 1.
    pub fn from_page(page: u32, limit: u32) -> Self {
        Self {
            limit,
            offset: page.max(1).saturating_sub(1).saturating_mul(limit),
            ..Self::default()
        }
    }
}

/// Options for `SecretStore::search`.  `query` is required.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchOptions {
    pub query: String,
    pub category: Option<Category>,
    pub limit: u32,
    pub offset: u32,
}

impl SearchOptions {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            category: None,
            limit: DEFAULT_PAGE_SIZE,
            offset: 0,
        }
    }
}

/// Filter handed to the persistence layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretFilter {
    pub category: Option<Category>,
    pub name_contains: Option<String>,
    pub limit: u32,
    pub offset: u32,
}

/// One page of results plus the size of the full matching set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    pub total: u64,
    pub limit: u32,
    pub offset: u32,
    pub items: Vec<T>,
}

impl<T> Page<T> {
    pub fn total_pages(&self) -> u64 {
        if self.limit == 0 {
            return 0;
        }
        self.total.div_ceil(u64::from(self.limit))
    }
}

// ── Validation ──────────────────────────────────────────────────────

fn validate_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(VaultError::Validation("Secret name is required".into()));
    }
    if name.trim().chars().count() > MAX_NAME_LEN {
        return Err(VaultError::Validation(format!(
            "Secret name must be at most {MAX_NAME_LEN} characters"
        )));
    }
    Ok(())
}

fn validate_value(value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(VaultError::Validation("Secret value is required".into()));
    }
    Ok(())
}

pub(crate) fn validate_page_size(limit: u32, max: u32) -> Result<()> {
    if limit == 0 || limit > max {
        return Err(VaultError::Validation(format!(
            "limit must be between 1 and {max}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_parses_known_values() {
        assert_eq!("PASSWORD".parse::<Category>().unwrap(), Category::Password);
        assert_eq!("API_KEY".parse::<Category>().unwrap(), Category::ApiKey);
        assert_eq!("NOTE".parse::<Category>().unwrap(), Category::Note);
        assert_eq!("OTHER".parse::<Category>().unwrap(), Category::Other);
    }

    #[test]
    fn category_rejects_unknown_values() {
        for bad in ["password", "CERT", ""] {
            let err = bad.parse::<Category>().unwrap_err();
            assert!(matches!(err, VaultError::Validation(_)));
        }
    }

    #[test]
    fn category_serializes_screaming_snake() {
        assert_eq!(
            serde_json::to_string(&Category::ApiKey).unwrap(),
            "\"API_KEY\""
        );
        assert!(serde_json::from_str::<Category>("\"SSH\"").is_err());
    }

    #[test]
    fn name_validation_bounds() {
        assert!(NewSecret::new("a", "v").validate().is_ok());
        assert!(NewSecret::new("x".repeat(100), "v").validate().is_ok());
        assert!(NewSecret::new("x".repeat(101), "v").validate().is_err());
        assert!(NewSecret::new("", "v").validate().is_err());
        assert!(NewSecret::new("   ", "v").validate().is_err());
        // Length is counted in characters, not bytes.
        assert!(NewSecret::new("é".repeat(100), "v").validate().is_ok());
    }

    #[test]
    fn empty_value_is_rejected() {
        assert!(NewSecret::new("name", "").validate().is_err());
    }

    #[test]
    fn update_requires_at_least_one_field() {
        assert!(SecretUpdate::default().validate().is_err());
        assert!(SecretUpdate::default().category(Category::Note).validate().is_ok());
        assert!(SecretUpdate::default().value("").validate().is_err());
    }

    #[test]
    fn debug_output_redacts_values() {
        let input = NewSecret::new("github", "s3cr3t");
        assert!(!format!("{input:?}").contains("s3cr3t"));

        let update = SecretUpdate::default().value("s3cr3t");
        assert!(!format!("{update:?}").contains("s3cr3t"));
    }

    #[test]
    fn list_options_from_page() {
        let opts = ListOptions::from_page(3, 10);
        assert_eq!(opts.offset, 20);
        assert_eq!(ListOptions::from_page(0, 10).offset, 0);
    }

    #[test]
    fn page_count_rounds_up() {
        let page: Page<()> = Page {
            total: 21,
            limit: 10,
            offset: 0,
            items: vec![],
        };
        assert_eq!(page.total_pages(), 3);
    }
}
