use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum_extra::extract::cookie::{Key, PrivateCookieJar};

use crate::error::LotError;
use crate::router::LotState;
use crate::service::credential_ops::AdminToken;

/// Encrypted cookie carrying the id of an admin session.
pub const SESSION_COOKIE: &str = "lotkeeper_admin";

/// Extractor for admin-only routes.
///
/// The session cookie must decrypt under the server key and name a session
/// that is still live in [`SessionStore`](crate::service::sessions::SessionStore).
#[derive(Debug, Clone)]
pub struct RequireAdmin(pub AdminToken);

impl FromRequestParts<LotState> for RequireAdmin {
    type Rejection = LotError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &LotState,
    ) -> Result<Self, Self::Rejection> {
        let jar = match PrivateCookieJar::<Key>::from_request_parts(parts, state).await {
            Ok(jar) => jar,
            Err(never) => match never {},
        };
        let Some(cookie) = jar.get(SESSION_COOKIE) else {
            return Err(LotError::Unauthorized);
        };
        if state.sessions.is_live(cookie.value()) {
            Ok(Self(AdminToken::grant()))
        } else {
            Err(LotError::Unauthorized)
        }
    }
}
