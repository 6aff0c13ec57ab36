//! End-to-end tests for the HTTP layer
//!
//! The router runs against in-memory SQLite, a memory session cache and a
//! temporary upload directory.

use axum::{
    body::{to_bytes, Body},
    http::{header, HeaderMap, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tower::ServiceExt;

use super::{build_router, AppState};
use crate::cache::{Cache, MemoryCache};
use crate::config::Config;
use crate::db::repositories::{
    NewsRepository, SqlxNewsRepository, SqlxSessionRepository, SqlxUserRepository, UserRepository,
};
use crate::db::{create_test_pool, migrations, DynDatabasePool};
use crate::models::{CreateUserInput, User};
use crate::services::{
    verify_password, ProfileRepositories, ProfileService, ProfileSettings, SessionStore, UserService,
};
use crate::storage::{content_key, LocalStorage, ObjectStorage};
use crate::view::ViewEngine;

const MOBILE: &str = "13800000001";
const PASSWORD: &str = "secret-1";
const BOUNDARY: &str = "newsdesk-test-boundary";

struct TestApp {
    router: Router,
    pool: DynDatabasePool,
    user: User,
    _uploads: TempDir,
}

async fn setup() -> TestApp {
    let pool = create_test_pool().await.expect("Failed to create test pool");
    migrations::run_migrations(&pool).await.expect("Failed to run migrations");

    let uploads = TempDir::new().unwrap();
    let mut config = Config::default();
    config.storage.local_path = uploads.path().to_path_buf();

    let sessions = Arc::new(SessionStore::new(
        Arc::new(Cache::Memory(MemoryCache::new())),
        Duration::from_secs(3600),
    ));
    let user_service = Arc::new(UserService::new(
        SqlxUserRepository::boxed(pool.clone()),
        SqlxSessionRepository::boxed(pool.clone()),
        sessions.clone(),
    ));
    let user = user_service
        .register(CreateUserInput {
            mobile: MOBILE.into(),
            nick_name: "reader".into(),
            password: PASSWORD.into(),
        })
        .await
        .unwrap();

    let storage: Arc<dyn ObjectStorage> = Arc::new(LocalStorage::new(uploads.path()));
    let profile_service = Arc::new(ProfileService::new(
        ProfileRepositories::sqlx(pool.clone()),
        storage,
        sessions,
        ProfileSettings::from_config(&config),
    ));

    let state = AppState {
        user_service,
        profile_service,
        views: Arc::new(ViewEngine::embedded().unwrap()),
        session: Arc::new(config.session.clone()),
    };

    TestApp {
        router: build_router(state, &config),
        pool,
        user,
        _uploads: uploads,
    }
}

async fn send(app: &TestApp, request: Request<Body>) -> (StatusCode, HeaderMap, Vec<u8>) {
    let response = app.router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, headers, body.to_vec())
}

async fn send_json(app: &TestApp, request: Request<Body>) -> Value {
    let (status, _, body) = send(app, request).await;
    assert_eq!(status, StatusCode::OK);
    serde_json::from_slice(&body).unwrap()
}

async fn send_page(app: &TestApp, request: Request<Body>) -> String {
    let (status, _, body) = send(app, request).await;
    assert_eq!(status, StatusCode::OK);
    String::from_utf8(body).unwrap()
}

fn post_json(uri: &str, cookie: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::post(uri).header(header::CONTENT_TYPE, "application/json");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn get(uri: &str, cookie: &str) -> Request<Body> {
    Request::get(uri).header(header::COOKIE, cookie).body(Body::empty()).unwrap()
}

enum Part<'a> {
    Text(&'a str, &'a str),
    File(&'a str, &'a str, &'a [u8]),
}

fn post_multipart(uri: &str, cookie: &str, parts: &[Part<'_>]) -> Request<Body> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match part {
            Part::Text(name, value) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n", name, value).as_bytes(),
                );
            }
            Part::File(name, content_type, data) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"upload.png\"\r\nContent-Type: {}\r\n\r\n",
                        name, content_type
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(data);
                body.extend_from_slice(b"\r\n");
            }
        }
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());

    Request::post(uri)
        .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={}", BOUNDARY))
        .header(header::COOKIE, cookie)
        .body(Body::from(body))
        .unwrap()
}

/// Log in and return the `name=value` cookie pair
async fn login(app: &TestApp) -> String {
    let request = post_json("/passport/login", None, json!({ "mobile": MOBILE, "password": PASSWORD }));
    let (_, headers, body) = send(app, request).await;

    let envelope: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(envelope["errno"], "0");

    let set_cookie = headers.get(header::SET_COOKIE).unwrap().to_str().unwrap();
    assert!(set_cookie.contains("HttpOnly"));
    set_cookie.split(';').next().unwrap().to_string()
}

async fn stored_user(app: &TestApp) -> User {
    SqlxUserRepository::new(app.pool.clone())
        .get_by_id(app.user.id)
        .await
        .unwrap()
        .unwrap()
}

fn news_form<'a>(image: &'a [u8]) -> Vec<Part<'a>> {
    vec![
        Part::Text("title", "Bond yields climb"),
        Part::Text("digest", "Ten-year at a high"),
        Part::Text("content", "<p>Markets moved.</p>"),
        Part::Text("category_id", "3"),
        Part::File("index_image", "image/png", image),
    ]
}

// ============================================================================
// Passport
// ============================================================================

#[tokio::test]
async fn test_register_then_login() {
    let app = setup().await;

    let envelope = send_json(
        &app,
        post_json(
            "/passport/register",
            None,
            json!({ "mobile": "13800000002", "nick_name": "writer", "password": "pw-2" }),
        ),
    )
    .await;
    assert_eq!(envelope["errno"], "0");
    assert!(envelope["data"]["user_id"].as_i64().unwrap() > app.user.id);

    let (_, headers, body) = send(
        &app,
        post_json("/passport/login", None, json!({ "mobile": "13800000002", "password": "pw-2" })),
    )
    .await;
    let envelope: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(envelope["errno"], "0");
    assert_eq!(envelope["data"]["nick_name"], "writer");
    assert!(headers.get(header::SET_COOKIE).is_some());
}

#[tokio::test]
async fn test_register_existing_mobile() {
    let app = setup().await;

    let envelope = send_json(
        &app,
        post_json(
            "/passport/register",
            None,
            json!({ "mobile": MOBILE, "nick_name": "someone", "password": "pw" }),
        ),
    )
    .await;
    assert_eq!(envelope["errno"], "4103");

    let original = stored_user(&app).await;
    assert!(verify_password(PASSWORD, &original.password_hash).unwrap());
}

#[tokio::test]
async fn test_register_rejects_incomplete_body() {
    let app = setup().await;

    for body in [
        json!({ "mobile": "13800000002", "password": "pw" }),
        json!({ "mobile": "13800000002", "nick_name": "  ", "password": "pw" }),
        json!({ "mobile": "", "nick_name": "writer", "password": "pw" }),
    ] {
        let envelope = send_json(&app, post_json("/passport/register", None, body)).await;
        assert_eq!(envelope["errno"], "4103");
    }

    let request = Request::post("/passport/register")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("not json"))
        .unwrap();
    let envelope = send_json(&app, request).await;
    assert_eq!(envelope["errno"], "4103");
}

#[tokio::test]
async fn test_login_wrong_password() {
    let app = setup().await;

    let envelope = send_json(
        &app,
        post_json("/passport/login", None, json!({ "mobile": MOBILE, "password": "nope" })),
    )
    .await;

    assert_eq!(envelope["errno"], "4102");
    assert_eq!(envelope["errmsg"], "用户名或密码错误");
}

#[tokio::test]
async fn test_login_missing_field() {
    let app = setup().await;

    let envelope = send_json(&app, post_json("/passport/login", None, json!({ "mobile": MOBILE }))).await;
    assert_eq!(envelope["errno"], "4103");
}

#[tokio::test]
async fn test_logout_ends_session() {
    let app = setup().await;
    let cookie = login(&app).await;

    let request = Request::post("/passport/logout")
        .header(header::COOKIE, &cookie)
        .body(Body::empty())
        .unwrap();
    let (_, headers, _) = send(&app, request).await;
    let cleared = headers.get(header::SET_COOKIE).unwrap().to_str().unwrap();
    assert!(cleared.contains("Max-Age=0"));

    let envelope = send_json(
        &app,
        post_json("/base_info", Some(&cookie), json!({ "nick_name": "x", "gender": "MAN", "signature": "y" })),
    )
    .await;
    assert_eq!(envelope["errno"], "4101");
}

// ============================================================================
// Session handling
// ============================================================================

#[tokio::test]
async fn test_json_endpoint_without_session() {
    let app = setup().await;

    let envelope = send_json(
        &app,
        post_json("/base_info", None, json!({ "nick_name": "Alice", "gender": "MAN", "signature": "hi" })),
    )
    .await;

    assert_eq!(envelope["errno"], "4101");
    assert_eq!(envelope["errmsg"], "用户未登录");
    assert_eq!(stored_user(&app).await.nick_name, "reader");
}

#[tokio::test]
async fn test_pages_redirect_anonymous_visitors() {
    let app = setup().await;

    for uri in ["/info", "/user_info", "/base_info", "/followed_user", "/news_list"] {
        let (status, headers, _) = send(&app, Request::get(uri).body(Body::empty()).unwrap()).await;
        assert!(status.is_redirection(), "{} answered {}", uri, status);
        assert_eq!(headers.get(header::LOCATION).unwrap(), "/");
    }
}

#[tokio::test]
async fn test_bearer_token_is_accepted() {
    let app = setup().await;
    let cookie = login(&app).await;
    let token = cookie.split_once('=').unwrap().1;

    let request = Request::get("/user_info")
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap();
    let html = send_page(&app, request).await;
    assert!(html.contains("reader"));
}

#[tokio::test]
async fn test_user_info_renders_base_info_form() {
    let app = setup().await;
    let cookie = login(&app).await;

    let html = send_page(&app, get("/user_info", &cookie)).await;
    assert!(html.contains(r#"id="base-info""#));

    let centre = send_page(&app, get("/info", &cookie)).await;
    assert!(!centre.contains(r#"id="base-info""#));
}

// ============================================================================
// Profile edits
// ============================================================================

#[tokio::test]
async fn test_update_base_info() {
    let app = setup().await;
    let cookie = login(&app).await;

    let envelope = send_json(
        &app,
        post_json("/base_info", Some(&cookie), json!({ "nick_name": "Alice", "gender": "MAN", "signature": "hi" })),
    )
    .await;

    assert_eq!(envelope, json!({ "errno": "0", "errmsg": "更新成功" }));
    let user = stored_user(&app).await;
    assert_eq!(user.nick_name, "Alice");
    assert_eq!(user.signature.as_deref(), Some("hi"));

    let html = send_page(&app, get("/base_info", &cookie)).await;
    assert!(html.contains("Alice"));
}

#[tokio::test]
async fn test_update_base_info_rejects_bad_input() {
    let app = setup().await;
    let cookie = login(&app).await;

    let bad_gender = send_json(
        &app,
        post_json("/base_info", Some(&cookie), json!({ "nick_name": "Alice", "gender": "CAT", "signature": "hi" })),
    )
    .await;
    assert_eq!(bad_gender["errno"], "4103");

    let not_json = Request::post("/base_info")
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::COOKIE, &cookie)
        .body(Body::from("{nick_name"))
        .unwrap();
    assert_eq!(send_json(&app, not_json).await["errno"], "4103");

    assert_eq!(stored_user(&app).await.nick_name, "reader");
}

#[tokio::test]
async fn test_change_password_wrong_old_password() {
    let app = setup().await;
    let cookie = login(&app).await;

    let envelope = send_json(
        &app,
        post_json("/pass_info", Some(&cookie), json!({ "old_password": "guess", "new_password": "next" })),
    )
    .await;

    assert_eq!(envelope["errno"], "4106");
    assert_eq!(stored_user(&app).await.password_hash, app.user.password_hash);
}

#[tokio::test]
async fn test_change_password() {
    let app = setup().await;
    let cookie = login(&app).await;

    let envelope = send_json(
        &app,
        post_json("/pass_info", Some(&cookie), json!({ "old_password": PASSWORD, "new_password": "next-2" })),
    )
    .await;

    assert_eq!(envelope["errmsg"], "保存成功");
    assert!(verify_password("next-2", &stored_user(&app).await.password_hash).unwrap());
}

#[tokio::test]
async fn test_avatar_upload_is_served() {
    let app = setup().await;
    let cookie = login(&app).await;

    let envelope = send_json(
        &app,
        post_multipart("/pic_info", &cookie, &[Part::File("avatar", "image/png", b"png-bytes")]),
    )
    .await;

    assert_eq!(envelope["errno"], "0");
    let avatar_url = envelope["data"]["avatar_url"].as_str().unwrap().to_string();
    assert_eq!(avatar_url, format!("/uploads/{}", content_key(b"png-bytes")));

    let (status, _, body) = send(&app, Request::get(&avatar_url).body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"png-bytes");
}

#[tokio::test]
async fn test_avatar_upload_without_file() {
    let app = setup().await;
    let cookie = login(&app).await;

    let envelope = send_json(&app, post_multipart("/pic_info", &cookie, &[Part::Text("other", "x")])).await;

    assert_eq!(envelope["errno"], "4103");
    assert_eq!(envelope["errmsg"], "读取文件错误");
}

// ============================================================================
// Publishing and listings
// ============================================================================

#[tokio::test]
async fn test_release_form_hides_latest_category() {
    let app = setup().await;
    let cookie = login(&app).await;

    let html = send_page(&app, get("/news_release", &cookie)).await;

    assert!(html.contains("股市"));
    assert!(!html.contains("最新"));
}

#[tokio::test]
async fn test_publish_news_then_list_it() {
    let app = setup().await;
    let cookie = login(&app).await;

    let envelope = send_json(&app, post_multipart("/news_release", &cookie, &news_form(b"cover"))).await;
    assert_eq!(envelope["errno"], "0");
    assert_eq!(envelope["errmsg"], "发布成功，等待审核");

    let news_repo = SqlxNewsRepository::new(app.pool.clone());
    assert_eq!(news_repo.count_by_author(app.user.id).await.unwrap(), 1);

    let html = send_page(&app, get("/news_list", &cookie)).await;
    assert!(html.contains("Bond yields climb"));
    assert!(html.contains("审核中"));
}

#[tokio::test]
async fn test_publish_news_missing_title() {
    let app = setup().await;
    let cookie = login(&app).await;

    let mut form = news_form(b"cover");
    form.remove(0);
    let envelope = send_json(&app, post_multipart("/news_release", &cookie, &form)).await;

    assert_eq!(envelope["errno"], "4103");
    let news_repo = SqlxNewsRepository::new(app.pool.clone());
    assert_eq!(news_repo.count_by_author(app.user.id).await.unwrap(), 0);
}

#[tokio::test]
async fn test_listing_pages_tolerate_bad_page_numbers() {
    let app = setup().await;
    let cookie = login(&app).await;

    for uri in ["/collection?p=abc", "/followed_user?p=-1", "/news_list?p=999", "/collection"] {
        let html = send_page(&app, get(uri, &cookie)).await;
        assert!(html.contains("1 / 1"), "{} did not render page 1/1", uri);
    }
}
