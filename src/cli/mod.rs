//! CLI module: Clap argument parser, output helpers, and command implementations.

pub mod commands;
pub mod output;

use std::path::PathBuf;

use clap::Parser;

use crate::config::{master_key_from_env, session_secret_from_env, Settings};
use crate::errors::{Result, VaultError};
use crate::service::{RequestContext, VaultService};
use crate::vault::Category;

/// EncryptoLock CLI: encrypted secret vault with wallet-signature login.
#[derive(Parser)]
#[command(
    name = "encryptolock",
    about = "Encrypted secret vault with wallet-signature login and an audit trail",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Directory containing encryptolock.toml (default: current directory)
    #[arg(long, default_value = ".", global = true)]
    pub project_dir: PathBuf,

    /// Database file (overrides the configured path)
    #[arg(long, global = true)]
    pub db: Option<String>,

    /// Session credential printed by `encryptolock login`
    #[arg(long, env = "ENCRYPTOLOCK_TOKEN", hide_env_values = true, global = true)]
    pub token: Option<String>,
}

/// All available subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Issue a single-use login challenge for an address
    Challenge {
        /// Wallet address (0x...)
        address: String,
    },

    /// Log in with a signed message and print a session token
    Login {
        /// The exact message that was signed
        #[arg(long)]
        message: String,
        /// 65-byte hex signature (0x...)
        #[arg(long)]
        signature: String,
        /// Address that claims to have signed
        #[arg(long)]
        address: String,
    },

    /// Record a logout (tokens stay valid until they expire)
    Logout,

    /// Store a new secret
    Create {
        /// Display name
        name: String,
        /// Secret value (omit for piped input or an interactive prompt)
        value: Option<String>,
        /// PASSWORD, API_KEY, NOTE or OTHER (default: OTHER)
        #[arg(short, long)]
        category: Option<Category>,
    },

    /// Show a secret's metadata
    Get {
        /// Secret id
        id: String,
    },

    /// Print a secret's decrypted value
    Reveal {
        /// Secret id
        id: String,
    },

    /// List secrets, newest first
    List {
        /// Page number, starting at 1
        #[arg(long, default_value = "1")]
        page: u32,
        /// Secrets per page (1-100)
        #[arg(long, default_value = "10")]
        limit: u32,
        /// Only secrets in this category
        #[arg(short, long)]
        category: Option<Category>,
        /// Only secrets whose name contains this text
        #[arg(short, long)]
        search: Option<String>,
    },

    /// Search secrets by name
    Search {
        /// Text to look for in secret names
        query: String,
        /// Page number, starting at 1
        #[arg(long, default_value = "1")]
        page: u32,
        /// Secrets per page (1-100)
        #[arg(long, default_value = "10")]
        limit: u32,
        /// Only secrets in this category
        #[arg(short, long)]
        category: Option<Category>,
    },

    /// Change a secret's name, value or category
    Update {
        /// Secret id
        id: String,
        /// New display name
        #[arg(long)]
        name: Option<String>,
        /// New value
        #[arg(long)]
        value: Option<String>,
        /// New category
        #[arg(short, long)]
        category: Option<Category>,
    },

    /// Permanently delete a secret
    Delete {
        /// Secret id
        id: String,
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },

    /// View your audit trail
    Audit {
        /// Number of entries to show (default: 50)
        #[arg(long, default_value = "50")]
        last: u32,
        /// Skip this many newer entries
        #[arg(long, default_value = "0")]
        offset: u32,
        /// Show entries since a duration ago (e.g. 7d, 24h, 30m)
        #[arg(long)]
        since: Option<String>,
    },

    /// Delete audit entries older than the retention horizon
    PurgeAudit {
        /// Days to keep (default: audit_retention_days from config)
        #[arg(long)]
        retention_days: Option<u32>,
    },
}

// ---------------------------------------------------------------------------
// Shared helpers used by multiple commands
// ---------------------------------------------------------------------------

/// Load `encryptolock.toml`, apply environment overrides, then `--db`.
pub fn load_settings(cli: &Cli) -> Result<Settings> {
    let mut settings = Settings::load_with_env(&cli.project_dir)?;
    if let Some(db) = &cli.db {
        settings.database_path = db.clone();
    }
    Ok(settings)
}

/// Open the database and wire the service with keys from the environment.
pub fn open_service(cli: &Cli, settings: &Settings) -> Result<VaultService> {
    let master_key = master_key_from_env()?;
    let session_secret = session_secret_from_env()?;
    VaultService::open(&cli.project_dir, settings, master_key, &session_secret)
}

/// Identify the caller from `--token` / `ENCRYPTOLOCK_TOKEN`.
pub fn request_context(cli: &Cli, service: &VaultService) -> Result<RequestContext> {
    let token = cli
        .token
        .as_deref()
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| {
            VaultError::CommandFailed(
                "not logged in: run `encryptolock login` and pass --token or set ENCRYPTOLOCK_TOKEN"
                    .into(),
            )
        })?;

    service.authorize(token, None, Some(&user_agent()))
}

/// User agent recorded in audit entries made from the CLI.
pub fn user_agent() -> String {
    format!("encryptolock-cli/{}", env!("CARGO_PKG_VERSION"))
}
