use std::path::{Path, PathBuf};

use chrono::Duration;
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::audit::MAX_RETENTION_DAYS;
use crate::crypto::MasterKey;
use crate::errors::{Result, VaultError};
use crate::logging::LogFormat;

/// Environment variable holding the master key.  Never read from a file.
pub const MASTER_KEY_VAR: &str = "ENCRYPTOLOCK_MASTER_KEY";

/// Environment variable holding the session-signing secret.
pub const SESSION_SECRET_VAR: &str = "ENCRYPTOLOCK_SESSION_SECRET";

const DB_PATH_VAR: &str = "ENCRYPTOLOCK_DB_PATH";
const SESSION_TTL_VAR: &str = "ENCRYPTOLOCK_SESSION_TTL";
const LOG_FORMAT_VAR: &str = "ENCRYPTOLOCK_LOG_FORMAT";
const REQUIRE_CHALLENGE_VAR: &str = "ENCRYPTOLOCK_REQUIRE_CHALLENGE";

/// Upper bound for any configured lifetime (one year).
const MAX_TTL_SECS: u64 = 365 * 24 * 3600;

/// Project-level configuration, loaded from `encryptolock.toml`.
///
/// Every field has a sensible default so EncryptoLock works out-of-the-box
/// without any config file at all.  Keys and secrets are deliberately not
/// fields here; see `master_key_from_env` and `session_secret_from_env`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// SQLite database path, relative to the project directory.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Session credential lifetime in seconds (default: 1 hour).
    #[serde(default = "default_session_ttl_secs")]
    pub session_ttl_secs: u64,

    /// Audit entries older than this many days are purged (default: 90).
    #[serde(default = "default_audit_retention_days")]
    pub audit_retention_days: u32,

    /// Only accept logins that sign a server-issued challenge.
    #[serde(default)]
    pub require_login_challenge: bool,

    /// Lifetime of a server-issued challenge in seconds (default: 5 minutes).
    #[serde(default = "default_challenge_ttl_secs")]
    pub challenge_ttl_secs: u64,

    /// Include internal error causes in reports.  Development only.
    #[serde(default)]
    pub expose_error_details: bool,

    #[serde(default)]
    pub log_format: LogFormat,
}

// ── Serde default helpers ────────────────────────────────────────────

fn default_database_path() -> String {
    "database/encryptolock.db".to_string()
}

fn default_session_ttl_secs() -> u64 {
    3600
}

fn default_audit_retention_days() -> u32 {
    90
}

fn default_challenge_ttl_secs() -> u64 {
    300
}

// ── Implementation ───────────────────────────────────────────────────

impl Default for Settings {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            session_ttl_secs: default_session_ttl_secs(),
            audit_retention_days: default_audit_retention_days(),
            require_login_challenge: false,
            challenge_ttl_secs: default_challenge_ttl_secs(),
            expose_error_details: false,
            log_format: LogFormat::default(),
        }
    }
}

impl Settings {
    /// Name of the config file we look for in the project root.
    pub const FILE_NAME: &'static str = "encryptolock.toml";

    /// Load settings from `<project_dir>/encryptolock.toml`.
    ///
    /// If the file does not exist, sensible defaults are returned.
    /// If the file exists but cannot be parsed, an error is returned.
    pub fn load(project_dir: &Path) -> Result<Self> {
        let config_path = project_dir.join(Self::FILE_NAME);

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&config_path)?;

        let settings: Settings = toml::from_str(&contents).map_err(|e| {
            VaultError::ConfigError(format!("Failed to parse {}: {e}", config_path.display()))
        })?;

        settings.validate()?;
        Ok(settings)
    }

    /// Load from file, then apply overrides from the process environment.
    pub fn load_with_env(project_dir: &Path) -> Result<Self> {
        let mut settings = Self::load(project_dir)?;
        settings.apply_overrides(|name| std::env::var(name).ok())?;
        Ok(settings)
    }

    /// Apply `ENCRYPTOLOCK_*` overrides looked up through `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(path) = get(DB_PATH_VAR) {
            self.database_path = path;
        }
        if let Some(ttl) = get(SESSION_TTL_VAR) {
            self.session_ttl_secs = ttl.trim().parse().map_err(|_| {
                VaultError::ConfigError(format!("{SESSION_TTL_VAR} must be a number of seconds"))
            })?;
        }
        if let Some(format) = get(LOG_FORMAT_VAR) {
            self.log_format = format.parse()?;
        }
        if let Some(flag) = get(REQUIRE_CHALLENGE_VAR) {
            self.require_login_challenge = parse_flag(REQUIRE_CHALLENGE_VAR, &flag)?;
        }

        self.validate()
    }

    fn validate(&self) -> Result<()> {
        if self.audit_retention_days > MAX_RETENTION_DAYS {
            return Err(VaultError::ConfigError(format!(
                "audit_retention_days must be at most {MAX_RETENTION_DAYS} (got {})",
                self.audit_retention_days
            )));
        }
        for (name, secs) in [
            ("session_ttl_secs", self.session_ttl_secs),
            ("challenge_ttl_secs", self.challenge_ttl_secs),
        ] {
            if secs == 0 || secs > MAX_TTL_SECS {
                return Err(VaultError::ConfigError(format!(
                    "{name} must be between 1 and {MAX_TTL_SECS}"
                )));
            }
        }
        Ok(())
    }

    /// Full path to the database file.
    ///
    /// Example: `project_dir/database/encryptolock.db`
    pub fn database_path(&self, project_dir: &Path) -> PathBuf {
        project_dir.join(&self.database_path)
    }

    pub fn session_ttl(&self) -> Duration {
        ttl_duration(self.session_ttl_secs)
    }

    pub fn challenge_ttl(&self) -> Duration {
        ttl_duration(self.challenge_ttl_secs)
    }
}

fn ttl_duration(secs: u64) -> Duration {
    Duration::seconds(i64::try_from(secs.min(MAX_TTL_SECS)).unwrap_or(0))
}

fn parse_flag(name: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(VaultError::ConfigError(format!(
            "{name} must be true or false (got '{other}')"
        ))),
    }
}

/// Read the master key from `ENCRYPTOLOCK_MASTER_KEY`.
pub fn master_key_from_env() -> Result<MasterKey> {
    master_key_from(|name| std::env::var(name).ok())
}

pub fn master_key_from<F>(lookup: F) -> Result<MasterKey>
where
    F: Fn(&str) -> Option<String>,
{
    let value = Zeroizing::new(
        lookup(MASTER_KEY_VAR)
            .ok_or_else(|| VaultError::ConfigError(format!("{MASTER_KEY_VAR} is not set")))?,
    );
    MasterKey::new(value.as_bytes().to_vec())
}

/// Read the session-signing secret from `ENCRYPTOLOCK_SESSION_SECRET`.
pub fn session_secret_from_env() -> Result<Zeroizing<Vec<u8>>> {
    session_secret_from(|name| std::env::var(name).ok())
}

pub fn session_secret_from<F>(lookup: F) -> Result<Zeroizing<Vec<u8>>>
where
    F: Fn(&str) -> Option<String>,
{
    let value = Zeroizing::new(
        lookup(SESSION_SECRET_VAR)
            .ok_or_else(|| VaultError::ConfigError(format!("{SESSION_SECRET_VAR} is not set")))?,
    );
    Ok(Zeroizing::new(value.as_bytes().to_vec()))
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::fs;
    use tempfile::TempDir;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn default_settings_are_sensible() {
        let s = Settings::default();
        assert_eq!(s.database_path, "database/encryptolock.db");
        assert_eq!(s.session_ttl_secs, 3600);
        assert_eq!(s.audit_retention_days, 90);
        assert!(!s.require_login_challenge);
        assert!(!s.expose_error_details);
        assert_eq!(s.log_format, LogFormat::Pretty);
    }

    #[test]
    fn load_returns_defaults_when_no_config_file() {
        let tmp = TempDir::new().unwrap();
        let settings = Settings::load(tmp.path()).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn load_parses_toml_file() {
        let tmp = TempDir::new().unwrap();
        let config = r#"
database_path = "data/vault.db"
session_ttl_secs = 900
audit_retention_days = 30
require_login_challenge = true
log_format = "json"
"#;
        fs::write(tmp.path().join("encryptolock.toml"), config).unwrap();

        let settings = Settings::load(tmp.path()).unwrap();
        assert_eq!(settings.database_path, "data/vault.db");
        assert_eq!(settings.session_ttl_secs, 900);
        assert_eq!(settings.audit_retention_days, 30);
        assert!(settings.require_login_challenge);
        assert_eq!(settings.log_format, LogFormat::Json);
        // Rest should be defaults
        assert_eq!(settings.challenge_ttl_secs, 300);
    }

    #[test]
    fn load_errors_on_invalid_toml() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("encryptolock.toml"), "not valid {{toml").unwrap();
        assert!(Settings::load(tmp.path()).is_err());
    }

    #[test]
    fn load_rejects_unbounded_retention() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join("encryptolock.toml"),
            "audit_retention_days = 4000000000\n",
        )
        .unwrap();
        let err = Settings::load(tmp.path()).unwrap_err();
        assert!(matches!(err, VaultError::ConfigError(_)));

        fs::write(tmp.path().join("encryptolock.toml"), "audit_retention_days = 36500\n").unwrap();
        assert_eq!(Settings::load(tmp.path()).unwrap().audit_retention_days, 36_500);
    }

    #[test]
    fn env_overrides_apply() {
        let mut s = Settings::default();
        s.apply_overrides(env(&[
            ("ENCRYPTOLOCK_DB_PATH", "/tmp/x.db"),
            ("ENCRYPTOLOCK_SESSION_TTL", "60"),
            ("ENCRYPTOLOCK_LOG_FORMAT", "json"),
            ("ENCRYPTOLOCK_REQUIRE_CHALLENGE", "yes"),
        ]))
        .unwrap();

        assert_eq!(s.database_path, "/tmp/x.db");
        assert_eq!(s.session_ttl_secs, 60);
        assert_eq!(s.log_format, LogFormat::Json);
        assert!(s.require_login_challenge);
    }

    #[test]
    fn bad_overrides_are_config_errors() {
        let mut s = Settings::default();
        let err = s
            .apply_overrides(env(&[("ENCRYPTOLOCK_SESSION_TTL", "soon")]))
            .unwrap_err();
        assert!(matches!(err, VaultError::ConfigError(_)));

        let mut s = Settings::default();
        assert!(s
            .apply_overrides(env(&[("ENCRYPTOLOCK_SESSION_TTL", "0")]))
            .is_err());
    }

    #[test]
    fn database_path_is_relative_to_project() {
        let s = Settings::default();
        assert_eq!(
            s.database_path(Path::new("/srv/app")),
            PathBuf::from("/srv/app/database/encryptolock.db")
        );
    }

    #[test]
    fn secrets_come_from_lookup() {
        assert!(master_key_from(env(&[])).is_err());
        assert!(master_key_from(env(&[("ENCRYPTOLOCK_MASTER_KEY", "")])).is_err());
        assert!(master_key_from(env(&[("ENCRYPTOLOCK_MASTER_KEY", "k")])).is_ok());

        let secret = session_secret_from(env(&[("ENCRYPTOLOCK_SESSION_SECRET", "abc")])).unwrap();
        assert_eq!(secret.as_slice(), b"abc");
    }
}
