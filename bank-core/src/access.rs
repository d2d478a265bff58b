//! Ownership and access checks
//!
//! The caller-identity resolver verifies a bearer token against the
//! configured HMAC secret and maps the subject claim to a username. Its
//! contract is strict: callers get a valid identity or a fatal
//! [`crate::Error::Auth`], never a silent null.
//!
//! Ownership is an explicit [`Ownership`] tag rather than a boolean, so a
//! call site cannot invert the predicate by accident.

use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use crate::{
    types::{Account, AccountNumber},
    Error, Result,
};

/// Token claims expected from the identity provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the username
    pub sub: String,

    /// Issued-at (seconds since Unix epoch)
    pub iat: i64,

    /// Expiration (seconds since Unix epoch)
    pub exp: i64,
}

/// Result of an ownership check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ownership {
    /// The account belongs to the caller's active accounts
    Owned,
    /// The account is not among the caller's active accounts
    Forbidden,
}

impl Ownership {
    /// Whether the caller may operate on the account
    pub fn is_owned(&self) -> bool {
        matches!(self, Ownership::Owned)
    }
}

/// Extract and verify the bearer token from an authorization header value
///
/// Fails on a missing `Bearer ` prefix, a malformed or mis-signed token,
/// or an expired one. All failures are fatal for the triggering request.
pub fn decode_bearer(header: &str, key: &DecodingKey) -> Result<Claims> {
    let token = header
        .strip_prefix("Bearer ")
        .ok_or_else(|| Error::Auth("missing bearer token".to_string()))?
        .trim();

    if token.is_empty() {
        return Err(Error::Auth("empty bearer token".to_string()));
    }

    let data = decode::<Claims>(token, key, &Validation::new(Algorithm::HS256))?;
    Ok(data.claims)
}

/// Decide whether `number` is among the caller's active accounts
///
/// `active` is the caller's account list already filtered to active
/// status, in list order.
pub fn check_ownership(active: &[Account], number: &AccountNumber) -> Ownership {
    if active.iter().any(|a| &a.number == number) {
        Ownership::Owned
    } else {
        Ownership::Forbidden
    }
}
