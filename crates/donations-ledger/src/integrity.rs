use std::fmt;

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use donations_types::Identity;

type HmacSha256 = Hmac<Sha256>;

const ACTION: &str = "donation_actions";
/// Tokens rotate every 12 hours; the previous tick is still accepted.
const TICK_SECS: i64 = 12 * 60 * 60;

/// Issues and verifies anti-forgery tokens bound to a visitor identity.
#[derive(Clone)]
pub struct IntegrityKey {
    secret: Vec<u8>,
}

impl IntegrityKey {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self {
            secret: secret.as_ref().to_vec(),
        }
    }

    pub fn issue(&self, identity: &Identity, now: DateTime<Utc>) -> String {
        hex::encode(self.mac(identity, tick(now)).finalize().into_bytes())
    }

    pub fn verify(&self, identity: &Identity, token: &str, now: DateTime<Utc>) -> bool {
        let Ok(presented) = hex::decode(token.trim()) else {
            return false;
        };
        let current = tick(now);
        [current, current - 1]
            .into_iter()
            .any(|t| self.mac(identity, t).verify_slice(&presented).is_ok())
    }

    fn mac(&self, identity: &Identity, tick: i64) -> HmacSha256 {
        // HMAC accepts keys of any length.
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .unwrap_or_else(|_| unreachable!("hmac key length is unrestricted"));
        mac.update(format!("{}:{}:{}", ACTION, identity.key(), tick).as_bytes());
        mac
    }
}

impl fmt::Debug for IntegrityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IntegrityKey").finish_non_exhaustive()
    }
}

/// Constant-time equality for shared secrets. Both values are MACed under a
/// fixed key and the tags compared with `verify_slice`, so neither length nor
/// a common prefix shows in the timing. Empty values never match.
pub fn secrets_match(expected: &str, presented: &str) -> bool {
    if expected.is_empty() || presented.is_empty() {
        return false;
    }
    let tag = |value: &str| {
        let mut mac = HmacSha256::new_from_slice(ACTION.as_bytes())
            .unwrap_or_else(|_| unreachable!("hmac key length is unrestricted"));
        mac.update(value.as_bytes());
        mac
    };
    let expected = tag(expected).finalize().into_bytes();
    tag(presented).verify_slice(&expected).is_ok()
}

fn tick(now: DateTime<Utc>) -> i64 {
    now.timestamp().div_euclid(TICK_SECS)
}
