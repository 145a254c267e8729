//! Cookie token format: `Base64( SHA-256(payload || secret) || payload )`
//! where the payload is UTF-8 text, newline-joined, in fixed order:
//! username, RFC 3339 UTC expiration (microsecond precision), `"1"`/`"0"`
//! for the temporary flag. The tag is prepended because its fixed length
//! makes the split unambiguous on decode.

use std::fmt;

use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use chrono::{DateTime, DurationRound, SecondsFormat, TimeDelta, Utc};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Length of the SHA-256 tag prepended to the payload.
const TAG_LEN: usize = 32;

/// Smallest blob worth looking at: a full tag plus two payload bytes.
const MIN_LEN: usize = TAG_LEN + 2;

/// A proof of a prior successful credential check, carried in a cookie.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub username: String,
    pub expiration: DateTime<Utc>,
    pub temporary: bool,
}

impl Token {
    /// Mint the short-lived token handed out right after a credential check.
    pub fn issue(username: impl Into<String>, ttl: TimeDelta) -> Self {
        Self {
            username: username.into(),
            expiration: expiry(ttl),
            temporary: true,
        }
    }

    /// Long-lived replacement for a temporary token, same username.
    pub fn upgrade(&self, ttl: TimeDelta) -> Self {
        Self {
            username: self.username.clone(),
            expiration: expiry(ttl),
            temporary: false,
        }
    }
}

/// Payload timestamps carry microsecond precision, so truncate up front:
/// a token must survive an encode/decode round trip unchanged.
fn expiry(ttl: TimeDelta) -> DateTime<Utc> {
    let at = Utc::now() + ttl;
    at.duration_trunc(TimeDelta::microseconds(1)).unwrap_or(at)
}

/// Why a cookie value was rejected. Never leaves this module except as
/// `None`: the wire behavior must not distinguish malformed from tampered
/// from expired.
#[derive(Debug, Error)]
enum DecodeFailure {
    #[error("empty cookie value")]
    Empty,
    #[error("not valid base64")]
    Base64,
    #[error("shorter than tag plus payload")]
    Truncated,
    #[error("tag mismatch")]
    Tampered,
    #[error("malformed payload")]
    Malformed,
    #[error("unparsable expiration")]
    BadTimestamp,
    #[error("expired")]
    Expired,
}

/// Encodes and authenticates tokens with a process-wide secret.
///
/// Pure and I/O-free. The secret is injected at construction and immutable
/// for the process lifetime; rotating it invalidates every outstanding
/// token, which is acceptable.
#[derive(Clone)]
pub struct TokenCodec {
    secret: Vec<u8>,
}

impl fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenCodec").field("secret", &"[REDACTED]").finish()
    }
}

impl TokenCodec {
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self { secret: secret.into() }
    }

    /// Serialize `token` into an opaque cookie value.
    pub fn encode(&self, token: &Token) -> String {
        let payload = format!(
            "{}\n{}\n{}",
            token.username,
            token.expiration.to_rfc3339_opts(SecondsFormat::Micros, true),
            if token.temporary { "1" } else { "0" },
        );

        let mut blob = Vec::with_capacity(TAG_LEN + payload.len());
        blob.extend_from_slice(&self.tag(payload.as_bytes()));
        blob.extend_from_slice(payload.as_bytes());
        BASE64.encode(blob)
    }

    /// Decode and authenticate a raw cookie value.
    ///
    /// Anything short of a well-formed, untampered, unexpired token comes
    /// back as `None`. The distinct failure causes are logged at debug level
    /// for operators and deliberately collapsed before they reach callers.
    pub fn decode(&self, raw: &str) -> Option<Token> {
        match self.try_decode(raw, Utc::now()) {
            Ok(token) => Some(token),
            Err(failure) => {
                tracing::debug!(%failure, "rejected token cookie");
                None
            }
        }
    }

    fn try_decode(&self, raw: &str, now: DateTime<Utc>) -> Result<Token, DecodeFailure> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(DecodeFailure::Empty);
        }

        let blob = BASE64.decode(raw).map_err(|_| DecodeFailure::Base64)?;
        if blob.len() < MIN_LEN {
            return Err(DecodeFailure::Truncated);
        }

        let (tag, payload) = blob.split_at(TAG_LEN);
        if tag != self.tag(payload).as_slice() {
            return Err(DecodeFailure::Tampered);
        }

        let text = std::str::from_utf8(payload).map_err(|_| DecodeFailure::Malformed)?;
        let mut fields = text.split('\n');
        let (username, expiration, temporary) =
            match (fields.next(), fields.next(), fields.next(), fields.next()) {
                (Some(username), Some(expiration), Some(temporary), None) => {
                    (username, expiration, temporary)
                }
                _ => return Err(DecodeFailure::Malformed),
            };

        let expiration = DateTime::parse_from_rfc3339(expiration)
            .map_err(|_| DecodeFailure::BadTimestamp)?
            .with_timezone(&Utc);
        let temporary = match temporary {
            "1" => true,
            "0" => false,
            _ => return Err(DecodeFailure::Malformed),
        };

        // Expired reads the same as absent; callers cannot tell the two apart.
        if expiration <= now {
            return Err(DecodeFailure::Expired);
        }

        Ok(Token {
            username: username.to_string(),
            expiration,
            temporary,
        })
    }

    fn tag(&self, payload: &[u8]) -> [u8; TAG_LEN] {
        let mut hasher = Sha256::new();
        hasher.update(payload);
        hasher.update(&self.secret);
        hasher.finalize().into()
    }
}
