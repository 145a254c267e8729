use std::sync::Arc;

use chrono::TimeDelta;
use tracing::warn;

use crate::services::auth::basic::Credentials;
use crate::services::auth::codec::{Token, TokenCodec};
use crate::services::auth::validator::CredentialValidator;

/// Terminal outcome for one request. Exactly one of these is reached; the
/// middleware renders it into status, headers and cookie.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Authenticated as `username`. `upgraded` carries the long-lived
    /// replacement token when the request presented a temporary one.
    Admit {
        username: String,
        upgraded: Option<Token>,
    },
    /// Credentials checked out: hand out a fresh temporary token and the
    /// reload document instead of the requested resource. Identity attaches
    /// only once the client comes back without the header.
    IssueTemporary(Token),
    /// 401 without a challenge. The client sent credentials while already
    /// holding a token; re-prompting would be wrong, it has to drop them.
    RejectNoChallenge,
    /// 401 with a `Basic` challenge.
    RejectWithChallenge,
}

/// The request-authorization decision procedure.
///
/// Stateless: every input is request-local, the only shared piece is the
/// immutable codec secret, so requests run concurrently without any
/// coordination.
pub struct AuthGate {
    codec: TokenCodec,
    validator: Arc<dyn CredentialValidator>,
    temporary_ttl: TimeDelta,
    session_ttl: TimeDelta,
}

impl AuthGate {
    pub fn new(
        codec: TokenCodec,
        validator: Arc<dyn CredentialValidator>,
        temporary_ttl: TimeDelta,
        session_ttl: TimeDelta,
    ) -> Self {
        Self {
            codec,
            validator,
            temporary_ttl,
            session_ttl,
        }
    }

    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    /// Pick one of the four outcomes for a request.
    ///
    /// Inputs are the already-collapsed parse results: a header or token
    /// that failed to parse, verify or outlive `now` arrives here as `None`.
    /// Header-plus-token is checked first; the order is contractual.
    pub async fn authorize(
        &self,
        credentials: Option<Credentials>,
        token: Option<Token>,
    ) -> Decision {
        match (credentials, token) {
            (Some(_), Some(_)) => Decision::RejectNoChallenge,
            (None, Some(token)) => {
                let upgraded = token.temporary.then(|| token.upgrade(self.session_ttl));
                Decision::Admit {
                    username: token.username,
                    upgraded,
                }
            }
            (Some(credentials), None) => {
                if self.validate(&credentials).await {
                    Decision::IssueTemporary(Token::issue(credentials.username, self.temporary_ttl))
                } else {
                    Decision::RejectWithChallenge
                }
            }
            (None, None) => Decision::RejectWithChallenge,
        }
    }

    async fn validate(&self, credentials: &Credentials) -> bool {
        match self
            .validator
            .validate(&credentials.username, &credentials.password)
            .await
        {
            Ok(valid) => valid,
            Err(err) => {
                // An unreachable backend must read as a failed check.
                warn!(username = %credentials.username, error = %err, "credential validation unavailable");
                false
            }
        }
    }
}
