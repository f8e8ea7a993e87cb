//! Short-lived session credentials (HS256 JWTs).

use std::fmt;

use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::errors::ErrorKind as JwtErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use super::{Owner, OwnerId};
use crate::errors::{AuthFailure, Result, VaultError};

/// Minimum length of the signing secret in bytes.
pub const MIN_SECRET_LEN: usize = 32;

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    address: String,
    iat: i64,
    exp: i64,
}

/// A signed token asserting a verified owner identity.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionCredential {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl fmt::Debug for SessionCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionCredential")
            .field("token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Issues and verifies session credentials.
pub struct SessionIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl SessionIssuer {
    pub fn new(secret: &[u8], ttl: Duration) -> Result<Self> {
        if secret.len() < MIN_SECRET_LEN {
            return Err(VaultError::ConfigError(format!(
                "session secret must be at least {MIN_SECRET_LEN} bytes"
            )));
        }
        if ttl <= Duration::zero() {
            return Err(VaultError::ConfigError(
                "session lifetime must be positive".into(),
            ));
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
            ttl,
        })
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn issue(&self, owner: &Owner) -> Result<SessionCredential> {
        self.issue_at(owner, Utc::now())
    }

    /// Issue a credential as if it were `issued_at`.
    pub fn issue_at(&self, owner: &Owner, issued_at: DateTime<Utc>) -> Result<SessionCredential> {
        let expires_at = issued_at + self.ttl;
        let claims = Claims {
            sub: owner.id.as_str().to_string(),
            address: owner.address.clone(),
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| VaultError::ConfigError(format!("failed to sign session token: {e}")))?;

        Ok(SessionCredential {
            token,
            expires_at: Utc
                .timestamp_opt(claims.exp, 0)
                .single()
                .unwrap_or(expires_at),
        })
    }

    /// Check a credential and return the owner it was issued to.
    ///
    /// Expiry is never extended here.
    pub fn verify(&self, token: &str) -> Result<OwnerId> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|e| {
            match e.kind() {
                JwtErrorKind::ExpiredSignature => AuthFailure::Expired,
                _ => AuthFailure::Malformed,
            }
        })?;

        if data.claims.sub.is_empty() {
            return Err(AuthFailure::Malformed.into());
        }
        Ok(OwnerId::new(data.claims.sub))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"0123456789abcdef0123456789abcdef";

    fn owner() -> Owner {
        Owner {
            id: OwnerId::new("7d0c5bb6-8d8e-4b8e-9d3c-0f1e2a3b4c5d"),
            address: "0xdef0000000000000000000000000000000000000".into(),
            created_at: Utc::now(),
            last_login: None,
        }
    }

    fn issuer() -> SessionIssuer {
        SessionIssuer::new(SECRET, Duration::hours(1)).unwrap()
    }

    #[test]
    fn issue_and_verify() {
        let issuer = issuer();
        let credential = issuer.issue(&owner()).unwrap();
        assert_eq!(issuer.verify(&credential.token).unwrap(), owner().id);
        assert!(credential.expires_at > Utc::now());
    }

    #[test]
    fn expired_credentials_are_rejected() {
        let issuer = issuer();
        let credential = issuer
            .issue_at(&owner(), Utc::now() - Duration::hours(2))
            .unwrap();
        let err = issuer.verify(&credential.token).unwrap_err();
        assert!(matches!(
            err,
            VaultError::Authentication(AuthFailure::Expired)
        ));
    }

    #[test]
    fn garbage_is_malformed() {
        let err = issuer().verify("not.a.token").unwrap_err();
        assert!(matches!(
            err,
            VaultError::Authentication(AuthFailure::Malformed)
        ));
    }

    #[test]
    fn foreign_secret_is_malformed() {
        let other = SessionIssuer::new(b"ffffffffffffffffffffffffffffffff", Duration::hours(1))
            .unwrap();
        let credential = other.issue(&owner()).unwrap();
        let err = issuer().verify(&credential.token).unwrap_err();
        assert!(matches!(
            err,
            VaultError::Authentication(AuthFailure::Malformed)
        ));
    }

    #[test]
    fn short_secret_is_rejected() {
        assert!(SessionIssuer::new(b"short", Duration::hours(1)).is_err());
    }

    #[test]
    fn debug_redacts_token() {
        let credential = issuer().issue(&owner()).unwrap();
        assert!(!format!("{credential:?}").contains(&credential.token));
    }
}
