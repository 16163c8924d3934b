//! HTTP Basic authentication gate
//!
//! A single shared credential from the configuration; no accounts, hashing
//! or lockout.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use hyper::header::{HeaderMap, AUTHORIZATION};

use crate::config::AuthSettings;

/// Username/password pair decoded from an `Authorization` header
#[derive(Debug, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// Decode `Authorization: Basic <base64(user:pass)>`.
///
/// The scheme name is matched case-insensitively and the password is
/// everything after the first `:`. Anything malformed yields `None`.
pub fn parse_basic_auth(headers: &HeaderMap) -> Option<Credentials> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, encoded) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return None;
    }

    let decoded = STANDARD.decode(encoded.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (username, password) = decoded.split_once(':')?;

    Some(Credentials {
        username: username.to_string(),
        password: password.to_string(),
    })
}

/// Result of checking a request against the configured credential
#[derive(Debug, PartialEq, Eq)]
pub enum AuthOutcome {
    /// Authentication is switched off
    NotRequired,
    /// The header matched; carries the decoded pair
    Authenticated(Credentials),
    Rejected,
}

impl AuthOutcome {
    pub const fn is_allowed(&self) -> bool {
        !matches!(self, Self::Rejected)
    }

    /// Name of the authenticated user, if any
    pub fn username(&self) -> Option<&str> {
        match self {
            Self::Authenticated(creds) => Some(&creds.username),
            _ => None,
        }
    }
}

/// Decode the `Authorization` header once and check it.
pub fn verify(headers: &HeaderMap, settings: AuthSettings<'_>) -> AuthOutcome {
    if !settings.required {
        return AuthOutcome::NotRequired;
    }

    match parse_basic_auth(headers) {
        Some(creds) => {
            // Evaluate both so a wrong username costs the same as a wrong password
            let user_ok = constant_time_eq(creds.username.as_bytes(), settings.username.as_bytes());
            let pass_ok = constant_time_eq(creds.password.as_bytes(), settings.password.as_bytes());
            if user_ok & pass_ok {
                AuthOutcome::Authenticated(creds)
            } else {
                AuthOutcome::Rejected
            }
        }
        None => AuthOutcome::Rejected,
    }
}

/// True when the request may proceed.
pub fn authenticate(headers: &HeaderMap, settings: AuthSettings<'_>) -> bool {
    verify(headers, settings).is_allowed()
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
