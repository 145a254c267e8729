//! Token gate in front of the protected routes.
//!
//! Extracts the raw `Authorization` header and the token cookie, collapses
//! both into parse results, lets [`AuthGate`] pick an outcome and renders it:
//!
//! - admit: `AuthCtx` goes into request extensions for the extractors, and a
//!   temporary token is replaced by its upgrade on the same response
//! - issue: 200 with the reload document and the fresh token cookie
//! - reject: 401, with a `Basic` challenge or (header-plus-token) without

use axum::{
    Router,
    body::Body,
    extract::State,
    http::{
        HeaderMap, HeaderValue, Request, StatusCode, header,
        header::InvalidHeaderValue,
    },
    middleware::{self, Next},
    response::{Html, IntoResponse, Response},
};
use chrono::{DateTime, TimeDelta, Utc};

use crate::api::extractors::AuthCtx;
use crate::services::auth::basic;
use crate::services::auth::engine::Decision;
use crate::state::AppState;

/// Name of the cookie the token travels in.
pub const TOKEN_COOKIE: &str = "reauth_token";

/// How `Set-Cookie` values are rendered. `lifetime` is the `Expires` horizon
/// of the first-issuance cookie; the upgrade cookie stays session-scoped.
#[derive(Debug, Clone)]
pub struct CookiePolicy {
    pub secure: bool,
    pub lifetime: TimeDelta,
}

/// Document served instead of the requested resource when a temporary token
/// is issued. The script clears the browser's cached Basic credentials: the
/// legacy `ClearAuthenticationCache` API where it exists, otherwise a HEAD
/// probe to `logout`. The probe still carries the header next to the fresh
/// cookie, so the gate answers 401 and the browser drops the header.
const RELOAD_PAGE: &str = r#"<!DOCTYPE html>
<html>
  <head>
    <meta charset="utf-8">
    <title>Signing in</title>
    <script>
      function dropCachedCredentials() {
        try {
          if (document.execCommand("ClearAuthenticationCache")) {
            window.location.reload();
            return;
          }
        } catch (ignored) {}
        var probe = new XMLHttpRequest();
        probe.open("HEAD", "logout", true);
        probe.onloadend = function () { window.location.reload(); };
        probe.send();
      }
    </script>
  </head>
  <body onload="dropCachedCredentials()">Signing you in&hellip;</body>
</html>
"#;

/// Wrap `router` with the token gate.
///
/// Example:
/// ```ignore
/// let protected = token_auth::apply(api::routes(state.clone()), state.clone());
/// ```
pub fn apply(router: Router<AppState>, state: AppState) -> Router<AppState> {
    router.layer(middleware::from_fn_with_state(state, token_auth_middleware))
}

async fn token_auth_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let credentials = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(basic::decode_basic);

    let token = token_cookie(req.headers()).and_then(|raw| state.gate.codec().decode(&raw));

    match state.gate.authorize(credentials, token).await {
        Decision::Admit { username, upgraded } => {
            req.extensions_mut().insert(AuthCtx::new(username));
            let mut response = next.run(req).await;

            if let Some(token) = upgraded {
                // Replace the cookie on the same response; no Expires, the
                // upgraded cookie is session-scoped.
                let encoded = state.gate.codec().encode(&token);
                match cookie_header(&state.cookies, &encoded, None) {
                    Ok(cookie) => {
                        response.headers_mut().append(header::SET_COOKIE, cookie);
                    }
                    Err(err) => {
                        tracing::warn!(error = %err, "could not render upgrade cookie");
                    }
                }
            }
            response
        }

        Decision::IssueTemporary(token) => {
            let encoded = state.gate.codec().encode(&token);
            let expires = Utc::now() + state.cookies.lifetime;
            let mut response = Html(RELOAD_PAGE).into_response();
            match cookie_header(&state.cookies, &encoded, Some(expires)) {
                Ok(cookie) => {
                    response.headers_mut().append(header::SET_COOKIE, cookie);
                    response
                }
                Err(err) => {
                    // A token we cannot ship is worthless; fall back to the
                    // challenge rather than strand the client on the reload
                    // page without a cookie.
                    tracing::error!(error = %err, "could not render token cookie");
                    challenge(req.headers())
                }
            }
        }

        Decision::RejectNoChallenge => StatusCode::UNAUTHORIZED.into_response(),

        Decision::RejectWithChallenge => challenge(req.headers()),
    }
}

fn challenge(headers: &HeaderMap) -> Response {
    let realm = headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    let value = HeaderValue::from_str(&format!("Basic realm=\"{realm}\""))
        .unwrap_or_else(|_| HeaderValue::from_static("Basic"));

    (StatusCode::UNAUTHORIZED, [(header::WWW_AUTHENTICATE, value)]).into_response()
}

/// Pull the raw token cookie out of the `Cookie` header, if any.
fn token_cookie(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(header::COOKIE)?.to_str().ok()?;
    for pair in value.split(';') {
        let mut parts = pair.trim().splitn(2, '=');
        let (Some(key), Some(val)) = (parts.next(), parts.next()) else {
            continue;
        };
        if key.trim() == TOKEN_COOKIE {
            return Some(val.trim().to_string());
        }
    }
    None
}

/// Build the `Set-Cookie` value for the token cookie.
fn cookie_header(
    policy: &CookiePolicy,
    encoded: &str,
    expires: Option<DateTime<Utc>>,
) -> Result<HeaderValue, InvalidHeaderValue> {
    let mut cookie = format!("{TOKEN_COOKIE}={encoded}; Path=/; HttpOnly");
    if policy.secure {
        cookie.push_str("; Secure");
    }
    if let Some(expires) = expires {
        // IMF-fixdate, e.g. "Sun, 06 Nov 1994 08:49:37 GMT".
        cookie.push_str(&format!(
            "; Expires={}",
            expires.format("%a, %d %b %Y %H:%M:%S GMT")
        ));
    }
    HeaderValue::from_str(&cookie)
}
