use std::fmt;

use base64::{Engine, engine::general_purpose::STANDARD as BASE64};

/// Credentials carried by a `Basic` Authorization header.
///
/// Used once for a validator call and then dropped; never stored.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Parse a raw `Authorization` header value into [`Credentials`].
///
/// Accepts only the `Basic` scheme (case-insensitive). The Base64 parameter
/// is decoded byte-for-byte as Latin-1, which is what browsers historically
/// put on the wire for Basic auth. The password may contain colons; only the
/// first colon splits. Returns `None` for anything that does not parse;
/// callers never learn why.
pub fn decode_basic(header: &str) -> Option<Credentials> {
    let header = header.trim();
    if header.is_empty() {
        return None;
    }

    let mut parts = header.splitn(2, char::is_whitespace);
    let scheme = parts.next()?;
    let parameter = parts.next()?.trim();
    if !scheme.eq_ignore_ascii_case("Basic") {
        return None;
    }

    let bytes = BASE64.decode(parameter).ok()?;
    // Latin-1: every byte is exactly one char.
    let text: String = bytes.iter().map(|&b| char::from(b)).collect();

    let (username, password) = text.split_once(':')?;
    if username.is_empty() || password.is_empty() {
        return None;
    }

    Some(Credentials {
        username: username.to_string(),
        password: password.to_string(),
    })
}
