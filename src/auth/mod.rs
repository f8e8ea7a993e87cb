//! Access gate: wallet-signature login and session verification.
//!
//! Identity is proven by possession of a signing key.  A caller presents
//! a message, a signature over it and the address they claim; the gate
//! recovers the signer, checks it against the claim, finds or creates the
//! owner record for that address and issues a short-lived session
//! credential bound to the owner id.

pub mod challenge;
pub mod session;
pub mod signature;

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::{AuthFailure, Result, VaultError};
use crate::storage::{self, ChallengeRepository, OwnerRepository};

pub use challenge::{is_valid_address, normalize_address, Challenge, LOGIN_PHRASE};
pub use session::{SessionCredential, SessionIssuer};
pub use signature::{EthereumRecovery, SignerRecovery};

/// Stable, opaque identifier of an owner.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerId(String);

impl OwnerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An owner record.  The lower-cased address is the sole identity key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Owner {
    pub id: OwnerId,
    pub address: String,
    pub created_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

/// Result of a successful login.
#[derive(Debug, Clone)]
pub struct Authenticated {
    pub owner: Owner,
    pub session: SessionCredential,
}

/// Default lifetime of a server-issued challenge.
pub const DEFAULT_CHALLENGE_TTL_SECS: i64 = 300;

pub struct AccessGate {
    owners: Arc<dyn OwnerRepository>,
    challenges: Arc<dyn ChallengeRepository>,
    recovery: Arc<dyn SignerRecovery>,
    sessions: SessionIssuer,
    require_challenge: bool,
    challenge_ttl: Duration,
}

impl AccessGate {
    pub fn new(
        owners: Arc<dyn OwnerRepository>,
        challenges: Arc<dyn ChallengeRepository>,
        recovery: Arc<dyn SignerRecovery>,
        sessions: SessionIssuer,
    ) -> Self {
        Self {
            owners,
            challenges,
            recovery,
            sessions,
            require_challenge: false,
            challenge_ttl: Duration::seconds(DEFAULT_CHALLENGE_TTL_SECS),
        }
    }

    /// Only accept logins that sign an outstanding server-issued
    /// challenge, each at most once.
    pub fn require_challenges(mut self, required: bool) -> Self {
        self.require_challenge = required;
        self
    }

    pub fn challenge_ttl(mut self, ttl: Duration) -> Self {
        self.challenge_ttl = ttl;
        self
    }

    pub fn requires_challenge(&self) -> bool {
        self.require_challenge
    }

    /// Issue and store a fresh challenge for `address`.
    pub fn issue_challenge(&self, address: &str) -> Result<Challenge> {
        if !is_valid_address(address) {
            return Err(VaultError::Validation(format!(
                "'{}' is not a valid address",
                address.trim()
            )));
        }

        let challenge = Challenge::new(address, self.challenge_ttl, storage::now());
        self.challenges.insert_challenge(&challenge)?;
        tracing::debug!(address = %challenge.address, expires_at = %challenge.expires_at, "issued login challenge");
        Ok(challenge)
    }

    /// Verify a signed login and issue a session credential.
    pub fn authenticate(
        &self,
        message: &str,
        signature: &str,
        claimed_address: &str,
    ) -> Result<Authenticated> {
        if message.is_empty() || signature.trim().is_empty() || claimed_address.trim().is_empty() {
            return Err(VaultError::Validation(
                "Message, signature, and address are required".into(),
            ));
        }

        let recovered = self
            .recovery
            .recover_signer_address(message, signature)
            .inspect_err(|_| {
                tracing::warn!(claimed = %claimed_address.trim(), "signature recovery failed");
            })?;
        let recovered = normalize_address(&recovered);

        if recovered != normalize_address(claimed_address) {
            tracing::warn!(
                recovered = %recovered,
                claimed = %normalize_address(claimed_address),
                "signature does not match claimed address"
            );
            return Err(AuthFailure::AddressMismatch.into());
        }

        let now = storage::now();
        if self.require_challenge && !self.challenges.consume_challenge(&recovered, message, now)? {
            tracing::warn!(address = %recovered, "login challenge rejected");
            return Err(AuthFailure::ChallengeRejected.into());
        }

        let owner = self.owners.record_login(&recovered, now)?;
        let session = self.sessions.issue(&owner)?;

        tracing::info!(owner_id = %owner.id, address = %owner.address, "owner authenticated");
        Ok(Authenticated { owner, session })
    }

    /// Check a session credential and return its owner.
    pub fn verify(&self, credential: &str) -> Result<OwnerId> {
        self.sessions.verify(credential.trim())
    }
}
