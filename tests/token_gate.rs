//! End-to-end runs of the token gate against the real router: the four
//! protocol scenarios (challenge, issuance, admit, header-plus-token
//! rejection) plus the upgrade round trip, driven with `oneshot` requests.

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, Response, StatusCode, header},
};
use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use chrono::{TimeDelta, Utc};
use http_body_util::BodyExt;
use tower::ServiceExt;

use reauth::app;
use reauth::middleware::token_auth::{CookiePolicy, TOKEN_COOKIE};
use reauth::services::auth::codec::{Token, TokenCodec};
use reauth::services::auth::engine::AuthGate;
use reauth::services::auth::validator::FixedUserValidator;
use reauth::state::AppState;

const SECRET: &[u8; 32] = b"0123456789abcdef0123456789abcdef";

fn test_app() -> Router {
    let validator = Arc::new(FixedUserValidator::new([(
        "mathijs".to_string(),
        "secret".to_string(),
    )]));
    let gate = AuthGate::new(
        TokenCodec::new(*SECRET),
        validator,
        TimeDelta::minutes(1),
        TimeDelta::hours(8),
    );
    let state = AppState::new(
        Arc::new(gate),
        CookiePolicy {
            secure: false,
            lifetime: TimeDelta::hours(8),
        },
    );
    app::build_router(state)
}

fn codec() -> TokenCodec {
    TokenCodec::new(*SECRET)
}

fn basic_header(username: &str, password: &str) -> String {
    format!("Basic {}", BASE64.encode(format!("{username}:{password}")))
}

/// Raw token value from the response's `Set-Cookie`, if one was set.
fn set_cookie(response: &Response<Body>) -> Option<String> {
    let value = response.headers().get(header::SET_COOKIE)?.to_str().ok()?;
    let (pair, _attributes) = value.split_once(';')?;
    let (name, token) = pair.split_once('=')?;
    assert_eq!(name, TOKEN_COOKIE);
    Some(token.to_string())
}

async fn body_text(response: Response<Body>) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

// ---------------------------------------------------------------------------
// Anonymous requests are challenged
// ---------------------------------------------------------------------------

#[tokio::test]
async fn anonymous_request_gets_basic_challenge_with_host_realm() {
    let response = test_app()
        .oneshot(
            Request::builder()
                .uri("/")
                .header(header::HOST, "example.com")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        response.headers().get(header::WWW_AUTHENTICATE).unwrap(),
        "Basic realm=\"example.com\""
    );
    assert!(set_cookie(&response).is_none());
}

#[tokio::test]
async fn wrong_password_gets_challenged_again() {
    let response = test_app()
        .oneshot(
            Request::builder()
                .uri("/")
                .header(header::HOST, "example.com")
                .header(header::AUTHORIZATION, basic_header("mathijs", "wrong"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(response.headers().contains_key(header::WWW_AUTHENTICATE));
    assert!(set_cookie(&response).is_none());
}

// ---------------------------------------------------------------------------
// Valid credentials buy a temporary token and the reload document
// ---------------------------------------------------------------------------

#[tokio::test]
async fn valid_credentials_issue_temporary_token_and_reload_page() {
    let response = test_app()
        .oneshot(
            Request::builder()
                .uri("/")
                .header(header::HOST, "example.com")
                .header(header::AUTHORIZATION, basic_header("mathijs", "secret"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains("Path=/"));
    // First issuance pins a cookie lifetime; the upgrade later will not.
    assert!(cookie.contains("Expires="));

    let token = codec().decode(&set_cookie(&response).unwrap()).unwrap();
    assert_eq!(token.username, "mathijs");
    assert!(token.temporary);
    assert!(token.expiration > Utc::now());
    assert!(token.expiration <= Utc::now() + TimeDelta::minutes(1));

    let body = body_text(response).await;
    assert!(body.contains("ClearAuthenticationCache"));
    assert!(body.contains("logout"));
}

// ---------------------------------------------------------------------------
// Token-only requests are admitted; the first one upgrades the cookie
// ---------------------------------------------------------------------------

#[tokio::test]
async fn temporary_cookie_admits_and_is_upgraded_once() {
    let app = test_app();

    // Round 1: credentials -> temporary token.
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/")
                .header(header::AUTHORIZATION, basic_header("mathijs", "secret"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let temporary = set_cookie(&response).unwrap();

    // Round 2: token only -> admitted, cookie replaced by the upgrade.
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/")
                .header(header::COOKIE, format!("{TOKEN_COOKIE}={temporary}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let raw_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    // Session-scoped on upgrade: no Expires.
    assert!(!raw_cookie.contains("Expires="));

    let upgraded_value = set_cookie(&response).unwrap();
    let upgraded = codec().decode(&upgraded_value).unwrap();
    assert_eq!(upgraded.username, "mathijs");
    assert!(!upgraded.temporary);
    assert!(upgraded.expiration > Utc::now() + TimeDelta::hours(7));

    let body = body_text(response).await;
    assert!(body.contains("mathijs"));

    // Round 3: upgraded token -> admitted, no further cookie mutation.
    let response = app
        .oneshot(
            Request::builder()
                .uri("/")
                .header(header::COOKIE, format!("{TOKEN_COOKIE}={upgraded_value}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get(header::SET_COOKIE).is_none());
}

#[tokio::test]
async fn whoami_reports_token_identity() {
    let token = Token::issue("mathijs", TimeDelta::minutes(1)).upgrade(TimeDelta::hours(8));
    let encoded = codec().encode(&token);

    let response = test_app()
        .oneshot(
            Request::builder()
                .uri("/whoami")
                .header(header::COOKIE, format!("{TOKEN_COOKIE}={encoded}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, r#"{"username":"mathijs"}"#);
}

// ---------------------------------------------------------------------------
// Header next to a valid token is rejected without a challenge
// ---------------------------------------------------------------------------

#[tokio::test]
async fn header_plus_cookie_rejected_without_challenge() {
    let token = Token::issue("mathijs", TimeDelta::minutes(1));
    let encoded = codec().encode(&token);

    for uri in ["/", "/logout"] {
        let response = test_app()
            .oneshot(
                Request::builder()
                    .uri(uri)
                    .header(header::AUTHORIZATION, basic_header("mathijs", "secret"))
                    .header(header::COOKIE, format!("{TOKEN_COOKIE}={encoded}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(
            !response.headers().contains_key(header::WWW_AUTHENTICATE),
            "{uri} must not re-prompt a client that has to drop credentials",
        );
    }
}

// ---------------------------------------------------------------------------
// Broken tokens read as absent
// ---------------------------------------------------------------------------

#[tokio::test]
async fn tampered_cookie_falls_back_to_challenge() {
    let encoded = codec().encode(&Token::issue("mathijs", TimeDelta::minutes(1)));
    let mut blob = BASE64.decode(&encoded).unwrap();
    blob[40] ^= 0x01;
    let tampered = BASE64.encode(&blob);

    let response = test_app()
        .oneshot(
            Request::builder()
                .uri("/")
                .header(header::HOST, "example.com")
                .header(header::COOKIE, format!("{TOKEN_COOKIE}={tampered}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    // Indistinguishable from carrying no cookie at all.
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(response.headers().contains_key(header::WWW_AUTHENTICATE));
}

#[tokio::test]
async fn expired_cookie_falls_back_to_challenge() {
    let expired = Token {
        username: "mathijs".to_string(),
        expiration: Utc::now() - TimeDelta::minutes(1),
        temporary: false,
    };
    let encoded = codec().encode(&expired);

    let response = test_app()
        .oneshot(
            Request::builder()
                .uri("/")
                .header(header::COOKIE, format!("{TOKEN_COOKIE}={encoded}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(response.headers().contains_key(header::WWW_AUTHENTICATE));
}

// ---------------------------------------------------------------------------
// Health stays outside the gate
// ---------------------------------------------------------------------------

#[tokio::test]
async fn health_needs_no_authentication() {
    let response = test_app()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, r#"{"status":"ok"}"#);
}
