use axum::response::{Html, IntoResponse};

use crate::api::extractors::AuthCtxExtractor;

/// Stand-in for the protected resource; the gate passes admitted requests
/// through untouched, so anything routed here behaves the same.
pub async fn home(AuthCtxExtractor(ctx): AuthCtxExtractor) -> impl IntoResponse {
    Html(format!(
        "<!DOCTYPE html><html><body><p>Signed in as {}.</p></body></html>",
        ctx.username
    ))
}
