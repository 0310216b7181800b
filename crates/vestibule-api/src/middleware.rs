use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;

use crate::AppState;
use crate::error::ApiError;

/// Validate the access token from the `accessToken` cookie or the
/// `Authorization: Bearer` header and stash its claims as an extension.
pub async fn require_auth(
    State(state): State<AppState>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let bearer = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_owned);

    let token = jar
        .get("accessToken")
        .map(|c| c.value().to_owned())
        .or(bearer)
        .ok_or(ApiError::Unauthorized)?;

    let claims = state.tokens.verify_access_token(&token)?;

    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}
