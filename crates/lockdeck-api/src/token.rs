// Local bearer-token inspection
//
// Reads the `exp` claim out of a JWT payload without verifying the
// signature. The server remains the authority; this only lets the
// transport skip a round trip that is certain to come back 401.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;

#[derive(Deserialize)]
struct ExpiryClaim {
    exp: Option<i64>,
}

/// Expiry timestamp of a JWT, or `None` if the token is opaque or has no `exp`.
pub fn token_expiry(token: &str) -> Option<DateTime<Utc>> {
    let mut parts = token.split('.');
    let (_header, payload, _sig) = (parts.next()?, parts.next()?, parts.next()?);
    if parts.next().is_some() {
        return None;
    }

    let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
    let claim: ExpiryClaim = serde_json::from_slice(&bytes).ok()?;
    Utc.timestamp_opt(claim.exp?, 0).single()
}

/// `true` when the token carries an `exp` claim at or before `now`.
pub fn is_expired_at(token: &str, now: DateTime<Utc>) -> bool {
    token_expiry(token).is_some_and(|exp| exp <= now)
}
