use axum::http::StatusCode;

/// Target of the reload script's HEAD probe.
///
/// A browser that still attaches credentials next to its fresh cookie never
/// reaches this handler: the gate answers 401 upstream, which is what makes
/// the browser finally drop the cached header. A clean client just gets an
/// empty success.
pub async fn logout() -> StatusCode {
    StatusCode::NO_CONTENT
}
