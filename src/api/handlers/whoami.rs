use axum::Json;

use crate::api::dto::whoami_response::WhoamiResponse;
use crate::api::extractors::AuthCtxExtractor;

pub async fn whoami(AuthCtxExtractor(ctx): AuthCtxExtractor) -> Json<WhoamiResponse> {
    Json(WhoamiResponse {
        username: ctx.username,
    })
}
