use axum::{
    Router,
    extract::{DefaultBodyLimit, FromRef},
    routing::{delete, get, patch, post, put},
};
use axum_extra::extract::cookie::Key;
use sha2::{Digest, Sha512};
use tower_http::services::ServeDir;
use tracing::warn;

use crate::handlers::{admin, search, session};
use crate::service::registry::Registry;
use crate::service::sessions::SessionStore;

#[derive(Clone)]
pub struct LotState {
    pub registry: Registry,
    pub key: Key,
    pub sessions: SessionStore,
    pub insecure_cookie: bool,
    pub max_upload_bytes: usize,
}

impl LotState {
    pub fn new(
        registry: Registry,
        key: Key,
        sessions: SessionStore,
        insecure_cookie: bool,
        max_upload_bytes: usize,
    ) -> Self {
        Self {
            registry,
            key,
            sessions,
            insecure_cookie,
            max_upload_bytes,
        }
    }
}

impl FromRef<LotState> for Key {
    fn from_ref(state: &LotState) -> Self {
        state.key.clone()
    }
}

/// Derive the session cookie key from a configured secret, or generate a
/// throwaway one.
pub fn cookie_key(secret: Option<&str>) -> Key {
    match secret.filter(|s| !s.is_empty()) {
        Some(s) => Key::from(Sha512::digest(s.as_bytes()).as_slice()),
        None => {
            warn!("no cookie_secret configured; admin sessions will not survive a restart");
            Key::generate()
        }
    }
}

pub fn lot_router(state: LotState) -> Router {
    let images = ServeDir::new(state.registry.images().dir());
    let body_limit = state.max_upload_bytes;

    Router::new()
        .route("/api/search", get(search::search_client_or_car))
        .route("/api/search/place", get(search::search_place))
        .route("/api/session", post(session::login).delete(session::logout))
        .route("/api/password", put(session::change_password))
        .route("/api/places", get(admin::list_places).post(admin::add_place))
        .route("/api/places/{id}", delete(admin::delete_place))
        .route("/api/objects", get(admin::list_objects).post(admin::create_object))
        .route(
            "/api/objects/{id}",
            patch(admin::update_car_number).delete(admin::delete_object),
        )
        .nest_service("/images", images)
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}
