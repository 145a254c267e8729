/// Authenticated principal for one request.
///
/// Inserted into request extensions by the token gate on admit; carries the
/// username proven by the token, nothing more; permissions are out of
/// scope here.
#[derive(Debug, Clone)]
pub struct AuthCtx {
    pub username: String,
}

impl AuthCtx {
    pub fn new(username: String) -> Self {
        Self { username }
    }
}
