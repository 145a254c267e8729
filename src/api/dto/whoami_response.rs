use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct WhoamiResponse {
    pub username: String,
}
