use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use axum_extra::extract::cookie::{Cookie, PrivateCookieJar, SameSite};
use serde::Deserialize;
use serde_json::json;
use time::Duration;

use crate::middleware::auth::{RequireAdmin, SESSION_COOKIE};
use crate::{LotError, router::LotState};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub current: String,
    pub new: String,
    pub confirm: String,
}

/// POST /api/session -> verifies the admin password and opens a session.
pub async fn login(
    State(state): State<LotState>,
    jar: PrivateCookieJar,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, LotError> {
    if state.registry.login(&req.password).await?.is_none() {
        return Err(LotError::InvalidCredentials);
    }
    let jar = issue_session(&state, jar);
    Ok((jar, Json(json!({"authenticated": true}))))
}

/// DELETE /api/session -> ends the session server-side and drops the cookie.
pub async fn logout(State(state): State<LotState>, jar: PrivateCookieJar) -> impl IntoResponse {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        state.sessions.revoke(cookie.value());
    }
    (jar.remove(clear_cookie(SESSION_COOKIE)), StatusCode::NO_CONTENT)
}

/// PUT /api/password -> re-checks the current password, applies the policy and
/// rotates the credential. Every open session ends; the caller gets a new one.
pub async fn change_password(
    State(state): State<LotState>,
    RequireAdmin(token): RequireAdmin,
    jar: PrivateCookieJar,
    Json(req): Json<ChangePasswordRequest>,
) -> Result<impl IntoResponse, LotError> {
    state
        .registry
        .change_password(&token, &req.current, &req.new, &req.confirm)
        .await?;
    state.sessions.revoke_all();
    let jar = issue_session(&state, jar);
    Ok((jar, StatusCode::NO_CONTENT))
}

fn issue_session(state: &LotState, jar: PrivateCookieJar) -> PrivateCookieJar {
    let id = state.sessions.issue();
    let max_age = Duration::seconds(state.sessions.ttl().num_seconds());
    jar.add(build_cookie(SESSION_COOKIE, id, max_age, !state.insecure_cookie))
}

fn build_cookie(name: &str, value: String, max_age: Duration, secure: bool) -> Cookie<'static> {
    Cookie::build(Cookie::new(name.to_string(), value))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .max_age(max_age)
        .build()
}

fn clear_cookie(name: &str) -> Cookie<'static> {
    Cookie::build(Cookie::new(name.to_string(), ""))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}
