//! Unverified JWT claim decoding.
//!
//! The identity provider is authoritative for token validity; the client only
//! peeks at `exp` and role claims to decide whether a token is worth sending.
//! Signatures are never checked here.

#[cfg(test)]
#[path = "jwt_test.rs"]
mod jwt_test;

use std::collections::BTreeSet;

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::Deserialize;

/// Realm-level role grant as issued by Keycloak-style providers.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct RealmAccess {
    #[serde(default)]
    pub roles: Vec<String>,
}

/// The subset of access-token claims the client cares about.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct AccessClaims {
    pub sub: Option<String>,
    pub exp: Option<i64>,
    pub iat: Option<i64>,
    pub preferred_username: Option<String>,
    pub email: Option<String>,
    pub realm_access: Option<RealmAccess>,
    /// Single-role claim used by tokens minted outside the realm.
    pub role: Option<String>,
}

impl AccessClaims {
    /// Realm roles plus the single `role` claim, if any.
    #[must_use]
    pub fn roles(&self) -> BTreeSet<String> {
        let mut roles: BTreeSet<String> = self
            .realm_access
            .as_ref()
            .map(|access| access.roles.iter().cloned().collect())
            .unwrap_or_default();
        if let Some(role) = self.role.as_ref().filter(|r| !r.is_empty()) {
            roles.insert(role.clone());
        }
        roles
    }
}

/// Decode the payload segment of a compact JWT.
///
/// Returns `None` unless the token has exactly three segments and the middle
/// one is base64url-encoded JSON.
#[must_use]
pub fn decode_claims(token: &str) -> Option<AccessClaims> {
    let mut parts = token.split('.');
    let (_header, payload, _signature) = (parts.next()?, parts.next()?, parts.next()?);
    if parts.next().is_some() || payload.is_empty() {
        return None;
    }
    let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
    serde_json::from_slice(&bytes).ok()
}

/// The `exp` claim of `token`, if it decodes.
#[must_use]
pub fn expires_at(token: &str) -> Option<i64> {
    decode_claims(token)?.exp
}

/// Expired when the claim is absent, the token is malformed, or `now >= exp`.
#[must_use]
pub fn is_expired(token: &str, now: i64) -> bool {
    expires_at(token).map_or(true, |exp| now >= exp)
}

/// Build an `alg: none` token around `claims`. Only the mock backend uses this.
#[must_use]
pub fn encode_unsigned(claims: &serde_json::Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("{header}.{payload}.")
}
