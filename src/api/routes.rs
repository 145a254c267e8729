use axum::{Router, routing::get};

use crate::api::handlers::{home::home, logout::logout, whoami::whoami};
use crate::state::AppState;

/// The protected content routes. The token gate is layered on top of this
/// router in `app::build_router`; `/health` deliberately lives outside it.
pub fn routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(home))
        .route("/whoami", get(whoami))
        // HEAD target of the reload script; GET also admits a signed-in
        // client that navigates here by hand.
        .route("/logout", get(logout))
        .with_state(state)
}
