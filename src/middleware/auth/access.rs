//! Access gate middleware: bearer JWT 検証 → Principal を extensions に入れる
//!
//! - 全パス (fallback 含む) に掛ける。公開ルートは無い
//! - 失敗時は 401 + WWW-Authenticate で打ち切り、handler は呼ばれない

use axum::{
    Router,
    body::Body,
    extract::State,
    http::Request,
    middleware::{self, Next},
    response::Response,
};

use crate::error::AppError;
use crate::services::auth::AuthError;
use crate::state::AppState;

/// Router 全体に access gate を適用する。
///
/// 例：
/// ```ignore
/// let router = Router::new().nest("/api/v1", api::v1::routes());
/// let router = middleware::auth::access::apply(router, state.clone());
/// ```
pub fn apply(router: Router<AppState>, state: AppState) -> Router<AppState> {
    // axum 0.8 の from_fn は State extractor を受け取れないため、`from_fn_with_state` で明示的に state を渡す
    router.layer(middleware::from_fn_with_state(state, access_middleware))
}

async fn access_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let principal = match state.gate.authorize(req.headers()) {
        Ok(principal) => principal,
        Err(AuthError::MissingCredential) => {
            tracing::debug!(path = %req.uri().path(), "no bearer token");
            return Err(AuthError::MissingCredential.into());
        }
        Err(err) => {
            tracing::warn!(
                error = %err,
                path = %req.uri().path(),
                "access token rejected"
            );
            return Err(err.into());
        }
    };

    tracing::debug!(
        subject = %principal.subject,
        authorities = ?principal.authorities,
        "request authenticated"
    );

    // middleware → extractor への受け渡し
    req.extensions_mut().insert(principal);

    Ok(next.run(req).await)
}
