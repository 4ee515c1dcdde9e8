use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, Response, StatusCode, header},
};
use lotkeeper::Registry;
use lotkeeper::config::Config;
use lotkeeper::router::{LotState, cookie_key, lot_router};
use lotkeeper::service::sessions::SessionStore;
use serde_json::{Value, json};
use tempfile::TempDir;
use tower::ServiceExt;

const BOUNDARY: &str = "lotkeeper-test-boundary";

async fn test_app(dir: &TempDir) -> Router {
    test_app_with(dir, |_| {}).await
}

async fn test_app_with(dir: &TempDir, configure: impl FnOnce(&mut Config)) -> Router {
    let mut cfg = Config::default();
    cfg.storage.database_url = format!("sqlite:{}", dir.path().join("objects.db").display());
    cfg.storage.images_dir = dir.path().join("images");
    cfg.basic.insecure_cookie = true;
    configure(&mut cfg);

    let registry = Registry::open(&cfg).await.expect("failed to open registry");
    let ttl = chrono::Duration::seconds(cfg.basic.session_ttl_secs as i64);
    let state = LotState::new(
        registry,
        cookie_key(Some("test-secret")),
        SessionStore::new(ttl),
        cfg.basic.insecure_cookie,
        cfg.storage.max_upload_bytes,
    );
    lot_router(state)
}

fn json_request(method: &str, uri: &str, cookie: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(c) = cookie {
        builder = builder.header(header::COOKIE, c);
    }
    builder
        .body(Body::from(body.to_string()))
        .expect("failed to build request")
}

fn empty_request(method: &str, uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(c) = cookie {
        builder = builder.header(header::COOKIE, c);
    }
    builder.body(Body::empty()).expect("failed to build request")
}

fn multipart_request(
    cookie: &str,
    fields: &[(&str, &str)],
    image: Option<(&str, &[u8])>,
) -> Request<Body> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    if let Some((file_name, bytes)) = image {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\n\
                 Content-Disposition: form-data; name=\"image\"; filename=\"{file_name}\"\r\n\
                 Content-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri("/api/objects")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .header(header::COOKIE, cookie)
        .body(Body::from(body))
        .expect("failed to build request")
}

async fn body_json(resp: Response<Body>) -> Value {
    let bytes = to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("failed to read response body");
    serde_json::from_slice(&bytes).expect("response body was not json")
}

/// `name=value` pair from the response's session cookie.
fn session_cookie(resp: &Response<Body>) -> String {
    resp.headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with("lotkeeper_admin="))
        .and_then(|v| v.split(';').next())
        .expect("no session cookie set")
        .to_string()
}

async fn login(app: &Router, password: &str) -> String {
    let resp = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/session",
            None,
            json!({"password": password}),
        ))
        .await
        .expect("request failed");
    assert_eq!(resp.status(), StatusCode::OK);
    session_cookie(&resp)
}

#[tokio::test]
async fn wrong_password_is_unauthorized() {
    let dir = TempDir::new().unwrap();
    let app = test_app(&dir).await;

    let resp = app
        .oneshot(json_request(
            "POST",
            "/api/session",
            None,
            json!({"password": "nope"}),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert!(resp.headers().get(header::SET_COOKIE).is_none());
    let body = body_json(resp).await;
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn admin_routes_require_session() {
    let dir = TempDir::new().unwrap();
    let app = test_app(&dir).await;

    let resp = app
        .clone()
        .oneshot(json_request("POST", "/api/places", None, json!({"name": "Lot A"})))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = app
        .clone()
        .oneshot(empty_request(
            "GET",
            "/api/objects",
            Some("lotkeeper_admin=forged"),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    // search stays public
    let resp = app
        .oneshot(empty_request("GET", "/api/search?term=x", None))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await, json!([]));
}

#[tokio::test]
async fn place_lifecycle_over_http() {
    let dir = TempDir::new().unwrap();
    let app = test_app(&dir).await;
    let cookie = login(&app, "admin123").await;

    let resp = app
        .clone()
        .oneshot(json_request("POST", "/api/places", Some(&cookie), json!({"name": " Lot A "})))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let place = body_json(resp).await;
    assert_eq!(place["name"], "Lot A");
    let place_id = place["id"].as_i64().unwrap();

    let resp = app
        .clone()
        .oneshot(json_request("POST", "/api/places", Some(&cookie), json!({"name": "Lot A"})))
        .await
        .unwrap();
    assert_eq!(body_json(resp).await["id"].as_i64(), Some(place_id));

    let resp = app
        .clone()
        .oneshot(multipart_request(
            &cookie,
            &[("client_name", "Jane Doe"), ("car_number", "XYZ123"), ("place_name", "Lot A")],
            None,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let object_id = body_json(resp).await["id"].as_i64().unwrap();

    let uri = format!("/api/places/{place_id}");
    let resp = app
        .clone()
        .oneshot(empty_request("DELETE", &uri, Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(resp).await["error"]["code"], "PLACE_IN_USE");

    let resp = app
        .clone()
        .oneshot(empty_request("DELETE", &format!("/api/objects/{object_id}"), Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let resp = app
        .clone()
        .oneshot(empty_request("DELETE", &uri, Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let resp = app
        .oneshot(empty_request("GET", "/api/places", None))
        .await
        .unwrap();
    assert_eq!(body_json(resp).await, json!([]));
}

#[tokio::test]
async fn registration_with_photo_is_searchable_and_served() {
    let dir = TempDir::new().unwrap();
    let app = test_app(&dir).await;
    let cookie = login(&app, "admin123").await;
    let photo: &[u8] = b"\x89PNG fake image";

    let resp = app
        .clone()
        .oneshot(multipart_request(
            &cookie,
            &[("client_name", "Jane Doe"), ("car_number", "XYZ123"), ("place_name", "Lot A")],
            Some(("front.png", photo)),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);

    let resp = app
        .clone()
        .oneshot(multipart_request(
            &cookie,
            &[("client_name", "Jane Doe"), ("car_number", "XYZ123"), ("place_name", "Lot A")],
            None,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    let resp = app
        .clone()
        .oneshot(empty_request("GET", "/api/search?term=jane", None))
        .await
        .unwrap();
    let hits = body_json(resp).await;
    assert_eq!(hits.as_array().unwrap().len(), 1);
    assert_eq!(hits[0]["place_name"], "Lot A");
    let image_url = hits[0]["image_url"].as_str().unwrap().to_string();
    assert!(image_url.starts_with("/images/Jane_Doe_"));

    let resp = app
        .clone()
        .oneshot(empty_request("GET", &image_url, None))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let served = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&served[..], photo);

    let resp = app
        .oneshot(empty_request("GET", "/api/search/place?term=lot", None))
        .await
        .unwrap();
    let body = body_json(resp).await;
    assert_eq!(body["place"], "lot");
    assert_eq!(body["results"][0]["client_name"], "Jane Doe");
    assert_eq!(body["results"][0]["image_url"], image_url.as_str());
}

#[tokio::test]
async fn missing_fields_are_a_bad_request() {
    let dir = TempDir::new().unwrap();
    let app = test_app(&dir).await;
    let cookie = login(&app, "admin123").await;

    let resp = app
        .oneshot(multipart_request(&cookie, &[("client_name", "Jane Doe")], None))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(resp).await["error"]["code"], "VALIDATION");
}

#[tokio::test]
async fn update_car_number_over_http() {
    let dir = TempDir::new().unwrap();
    let app = test_app(&dir).await;
    let cookie = login(&app, "admin123").await;

    let resp = app
        .clone()
        .oneshot(multipart_request(
            &cookie,
            &[("client_name", "Jane Doe"), ("car_number", "XYZ123"), ("place_name", "Lot A")],
            None,
        ))
        .await
        .unwrap();
    let id = body_json(resp).await["id"].as_i64().unwrap();

    let resp = app
        .clone()
        .oneshot(json_request(
            "PATCH",
            &format!("/api/objects/{id}"),
            Some(&cookie),
            json!({"car_number": "XYZ999"}),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let resp = app
        .clone()
        .oneshot(empty_request("GET", "/api/objects", Some(&cookie)))
        .await
        .unwrap();
    let rows = body_json(resp).await;
    assert_eq!(rows[0]["car_number"], "XYZ999");
    assert_eq!(rows[0]["place_name"], "Lot A");

    let resp = app
        .oneshot(json_request(
            "PATCH",
            "/api/objects/9999",
            Some(&cookie),
            json!({"car_number": "XYZ999"}),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn password_change_rotates_sessions() {
    let dir = TempDir::new().unwrap();
    let app = test_app(&dir).await;
    let old_cookie = login(&app, "admin123").await;
    let other_cookie = login(&app, "admin123").await;

    let resp = app
        .clone()
        .oneshot(json_request(
            "PUT",
            "/api/password",
            Some(&old_cookie),
            json!({"current": "admin123", "new": "abc", "confirm": "abc"}),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = app
        .clone()
        .oneshot(json_request(
            "PUT",
            "/api/password",
            Some(&old_cookie),
            json!({"current": "admin123", "new": "n3w-pass", "confirm": "n3w-pass"}),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    let new_cookie = session_cookie(&resp);

    let resp = app
        .clone()
        .oneshot(empty_request("GET", "/api/objects", Some(&other_cookie)))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = app
        .clone()
        .oneshot(empty_request("GET", "/api/objects", Some(&old_cookie)))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = app
        .clone()
        .oneshot(empty_request("GET", "/api/objects", Some(&new_cookie)))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    login(&app, "n3w-pass").await;
}

#[tokio::test]
async fn logout_clears_cookie() {
    let dir = TempDir::new().unwrap();
    let app = test_app(&dir).await;
    let cookie = login(&app, "admin123").await;

    let resp = app
        .oneshot(empty_request("DELETE", "/api/session", Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    let cleared = resp
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .unwrap();
    assert!(cleared.starts_with("lotkeeper_admin=;"));
    assert!(cleared.contains("Max-Age=0"));
}

#[tokio::test]
async fn logged_out_cookie_cannot_be_replayed() {
    let dir = TempDir::new().unwrap();
    let app = test_app(&dir).await;
    let cookie = login(&app, "admin123").await;

    let resp = app
        .clone()
        .oneshot(empty_request("DELETE", "/api/session", Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let resp = app
        .oneshot(json_request("POST", "/api/places", Some(&cookie), json!({"name": "Lot A"})))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(resp).await["error"]["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn expired_session_is_rejected() {
    let dir = TempDir::new().unwrap();
    let app = test_app_with(&dir, |cfg| cfg.basic.session_ttl_secs = 0).await;
    let cookie = login(&app, "admin123").await;

    let resp = app
        .oneshot(empty_request("GET", "/api/objects", Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn oversized_upload_is_payload_too_large() {
    let dir = TempDir::new().unwrap();
    let app = test_app_with(&dir, |cfg| cfg.storage.max_upload_bytes = 1024).await;
    let cookie = login(&app, "admin123").await;
    let photo = vec![0u8; 4096];

    let resp = app
        .clone()
        .oneshot(multipart_request(
            &cookie,
            &[("client_name", "Jane Doe"), ("car_number", "XYZ123"), ("place_name", "Lot A")],
            Some(("front.png", photo.as_slice())),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(body_json(resp).await["error"]["code"], "PAYLOAD_TOO_LARGE");

    let resp = app
        .oneshot(empty_request("GET", "/api/places", None))
        .await
        .unwrap();
    assert_eq!(body_json(resp).await, json!([]));
}
