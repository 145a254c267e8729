/*!
 * Authentication context extractor
 *
 * Responsibility:
 * - hand the authenticated principal (AuthCtx) to handlers
 * - keep the axum plumbing in core, the plain type in types
 *
 * Public API:
 * - AuthCtx
 * - AuthCtxExtractor
 */

mod core;
mod types;

pub use self::core::AuthCtxExtractor;
pub use types::AuthCtx;
