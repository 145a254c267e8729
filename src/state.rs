use std::sync::Arc;

use crate::middleware::token_auth::CookiePolicy;
use crate::services::auth::engine::AuthGate;

#[derive(Clone)]
pub struct AppState {
    pub gate: Arc<AuthGate>,
    pub cookies: CookiePolicy,
}

impl AppState {
    pub fn new(gate: Arc<AuthGate>, cookies: CookiePolicy) -> Self {
        Self { gate, cookies }
    }
}
