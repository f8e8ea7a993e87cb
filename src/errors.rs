use serde::Serialize;
use thiserror::Error;

/// All errors that can occur in EncryptoLock.
#[derive(Debug, Error)]
pub enum VaultError {
    // --- Caller errors ---
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Authentication failed: {0}")]
    Authentication(AuthFailure),

    /// Returned both for missing secrets and for secrets owned by someone
    /// else, so callers cannot test for existence.
    #[error("Secret not found")]
    NotFound,

    // --- Integrity errors ---
    #[error("Cryptographic operation failed: {0}")]
    Crypto(CryptoFailure),

    // --- Infrastructure errors ---
    #[error("Persistence unavailable: {0}")]
    PersistenceUnavailable(String),

    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // --- CLI errors ---
    #[error("Command failed: {0}")]
    CommandFailed(String),
}

/// Why an identity assertion or session credential was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AuthFailure {
    #[error("invalid signature")]
    InvalidSignature,

    #[error("signature does not match the provided address")]
    AddressMismatch,

    #[error("session expired")]
    Expired,

    #[error("malformed session credential")]
    Malformed,

    #[error("login challenge unknown, expired or already used")]
    ChallengeRejected,
}

/// Internal reason for a cryptographic failure.
///
/// Only surfaced through `ErrorReport::detail`, never in public messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CryptoFailure {
    #[error("authentication tag mismatch")]
    AuthenticationFailed,

    #[error("malformed cipher payload")]
    MalformedPayload,

    #[error("encryption failed")]
    EncryptionFailed,
}

/// Coarse error category that callers pattern-match on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    Authentication,
    NotFound,
    Crypto,
    Persistence,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::Authentication => "authentication",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Crypto => "crypto",
            ErrorKind::Persistence => "persistence",
            ErrorKind::Internal => "internal",
        }
    }
}

/// Structured error body handed to the request layer.
///
/// `detail` carries the internal cause and is only filled in when the
/// deployment explicitly enables it.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorReport {
    pub kind: ErrorKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl VaultError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            VaultError::Validation(_) => ErrorKind::Validation,
            VaultError::Authentication(_) => ErrorKind::Authentication,
            VaultError::NotFound => ErrorKind::NotFound,
            VaultError::Crypto(_) => ErrorKind::Crypto,
            VaultError::PersistenceUnavailable(_) => ErrorKind::Persistence,
            VaultError::ConfigError(_) | VaultError::Io(_) | VaultError::CommandFailed(_) => {
                ErrorKind::Internal
            }
        }
    }

    /// Message that is safe to show to an external caller.
    ///
    /// Validation and authentication errors keep their category and text;
    /// crypto and infrastructure failures collapse to a generic message.
    pub fn public_message(&self) -> String {
        match self {
            VaultError::Validation(_) | VaultError::Authentication(_) | VaultError::NotFound => {
                self.to_string()
            }
            VaultError::CommandFailed(msg) => msg.clone(),
            VaultError::Crypto(_) => "Operation failed".to_string(),
            VaultError::PersistenceUnavailable(_) => {
                "Service temporarily unavailable".to_string()
            }
            VaultError::ConfigError(_) | VaultError::Io(_) => {
                "An unexpected error occurred".to_string()
            }
        }
    }

    /// Build the structured report for this error.
    pub fn report(&self, expose_detail: bool) -> ErrorReport {
        let detail = match self {
            VaultError::Crypto(failure) => Some(failure.to_string()),
            VaultError::PersistenceUnavailable(msg) | VaultError::ConfigError(msg) => {
                Some(msg.clone())
            }
            VaultError::Io(e) => Some(e.to_string()),
            _ => None,
        };

        ErrorReport {
            kind: self.kind(),
            message: self.public_message(),
            detail: detail.filter(|_| expose_detail),
        }
    }

    /// HTTP-equivalent status code for the request layer.
    pub fn status_code(&self) -> u16 {
        match self.kind() {
            ErrorKind::Validation => 400,
            ErrorKind::Authentication => 401,
            ErrorKind::NotFound => 404,
            ErrorKind::Persistence => 503,
            ErrorKind::Crypto | ErrorKind::Internal => 500,
        }
    }
}

impl From<AuthFailure> for VaultError {
    fn from(failure: AuthFailure) -> Self {
        VaultError::Authentication(failure)
    }
}

impl From<CryptoFailure> for VaultError {
    fn from(failure: CryptoFailure) -> Self {
        VaultError::Crypto(failure)
    }
}

impl From<rusqlite::Error> for VaultError {
    fn from(e: rusqlite::Error) -> Self {
        VaultError::PersistenceUnavailable(e.to_string())
    }
}

/// Convenience type alias for EncryptoLock results.
pub type Result<T> = std::result::Result<T, VaultError>;
