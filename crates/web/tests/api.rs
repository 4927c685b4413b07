//! HTTP-level tests driving the full router with an in-memory database.

use axum::body::Body;
use axum::http::{header, HeaderMap, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use sitekit_core::config::AppConfig;
use sitekit_core::db::Database;
use sitekit_core::users::ExtraFields;
use sitekit_web::WebServer;

// ===========================================================================
// Helpers
// ===========================================================================

const ADMIN_EMAIL: &str = "admin@example.com";
const ADMIN_PASSWORD: &str = "Adm1n-Pa55word!";

fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.auth.bcrypt_cost = 4;
    config
}

fn server_with(config: AppConfig) -> WebServer {
    let db = Database::in_memory().unwrap();
    db.initialize().unwrap();
    let server = WebServer::new(config, db).unwrap();
    server
        .state()
        .users()
        .create_superuser(ADMIN_EMAIL, Some(ADMIN_PASSWORD), ExtraFields::default())
        .unwrap();
    server
}

fn app() -> (WebServer, Router) {
    let server = server_with(test_config());
    let router = server.router();
    (server, router)
}

struct TestResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Vec<u8>,
}

impl TestResponse {
    fn json(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap()
    }

    fn header(&self, name: header::HeaderName) -> &str {
        self.headers.get(name).unwrap().to_str().unwrap()
    }
}

async fn send(app: &Router, req: Request<Body>) -> TestResponse {
    let response = app.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec();
    TestResponse {
        status,
        headers,
        body,
    }
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn authed(method: Method, uri: &str, token: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token));
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn login(app: &Router, email: &str, password: &str) -> TestResponse {
    let req = Request::builder()
        .method(Method::POST)
        .uri("/en/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({ "email": email, "password": password }).to_string(),
        ))
        .unwrap();
    send(app, req).await
}

/// `sessionid=<token>` from a login response, ready for a `Cookie` header.
fn session_cookie(response: &TestResponse) -> String {
    let set_cookie = response.header(header::SET_COOKIE);
    set_cookie.split(';').next().unwrap().to_string()
}

fn with_cookie(uri: &str, cookie: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(header::COOKIE, cookie)
        .body(Body::empty())
        .unwrap()
}

async fn admin_token(app: &Router) -> String {
    let response = login(app, ADMIN_EMAIL, ADMIN_PASSWORD).await;
    assert_eq!(response.status, StatusCode::OK);
    response.json()["token"].as_str().unwrap().to_string()
}

// ===========================================================================
// Routing and middleware
// ===========================================================================

#[tokio::test]
async fn health_is_unprefixed_and_carries_security_headers() {
    let (_server, app) = app();
    let response = send(&app, get("/health")).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json()["ok"], true);
    assert_eq!(response.header(header::X_FRAME_OPTIONS), "DENY");
    assert_eq!(response.header(header::X_CONTENT_TYPE_OPTIONS), "nosniff");
    assert_eq!(response.header(header::REFERRER_POLICY), "same-origin");
}

#[tokio::test]
async fn bare_paths_redirect_to_negotiated_prefix() {
    let (_server, app) = app();

    let response = send(&app, get("/")).await;
    assert_eq!(response.status, StatusCode::FOUND);
    assert_eq!(response.header(header::LOCATION), "/en/");

    let req = Request::builder()
        .uri("/users?q=ada")
        .header(header::ACCEPT_LANGUAGE, "de-CH,de;q=0.9")
        .body(Body::empty())
        .unwrap();
    let response = send(&app, req).await;
    assert_eq!(response.status, StatusCode::FOUND);
    assert_eq!(response.header(header::LOCATION), "/de/users?q=ada");

    let req = Request::builder()
        .uri("/i18n/")
        .header(header::ACCEPT_LANGUAGE, "de")
        .header(header::COOKIE, "lang=en")
        .body(Body::empty())
        .unwrap();
    let response = send(&app, req).await;
    assert_eq!(response.header(header::LOCATION), "/en/i18n/");
}

#[tokio::test]
async fn prefixed_requests_set_content_language() {
    let (_server, app) = app();

    let response = send(&app, get("/de")).await;
    assert_eq!(response.status, StatusCode::FOUND);
    assert_eq!(response.header(header::LOCATION), "/de/");

    let response = send(&app, get("/de/i18n/")).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.header(header::CONTENT_LANGUAGE), "de");
}

#[tokio::test]
async fn unknown_prefixed_route_is_json_404() {
    let (_server, app) = app();
    let response = send(&app, get("/en/nothing/here")).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert!(response.json()["error"].is_string());
}

#[tokio::test]
async fn bare_paths_are_404_without_prefix_redirect() {
    let mut config = test_config();
    config.i18n.prefix_redirect = false;
    let app = server_with(config).router();

    let response = send(&app, get("/users")).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert!(response.headers.get(header::LOCATION).is_none());

    assert_eq!(send(&app, get("/en/i18n/")).await.status, StatusCode::OK);
    assert_eq!(send(&app, get("/health")).await.status, StatusCode::OK);
}

#[tokio::test]
async fn debug_mode_serves_static_dirs_and_media() {
    let root = tempfile::tempdir().unwrap();
    let static_root = root.path().join("static");
    let extra = root.path().join("assets");
    let media = root.path().join("media");
    for dir in [&static_root, &extra, &media] {
        std::fs::create_dir_all(dir).unwrap();
    }
    std::fs::write(static_root.join("site.css"), "body {}").unwrap();
    std::fs::write(extra.join("site.css"), "shadowed").unwrap();
    std::fs::write(extra.join("admin.js"), "let admin;").unwrap();
    std::fs::write(media.join("avatar.txt"), "avatar").unwrap();

    let mut config = test_config();
    config.static_files.static_root = static_root;
    config.static_files.static_dirs = vec![extra];
    config.static_files.media_root = media;

    config.server.debug = false;
    let app = server_with(config.clone()).router();
    assert_ne!(send(&app, get("/static/site.css")).await.status, StatusCode::OK);

    config.server.debug = true;
    let app = server_with(config).router();

    let response = send(&app, get("/static/site.css")).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body, b"body {}");

    let response = send(&app, get("/static/admin.js")).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body, b"let admin;");

    let response = send(&app, get("/media/avatar.txt")).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body, b"avatar");

    assert_eq!(
        send(&app, get("/static/missing.css")).await.status,
        StatusCode::NOT_FOUND
    );
}

#[tokio::test]
async fn disallowed_host_is_rejected() {
    let mut config = test_config();
    config.server.allowed_hosts = vec!["example.com".into(), ".example.org".into()];
    let app = server_with(config).router();

    let req = Request::builder()
        .uri("/health")
        .header(header::HOST, "evil.test")
        .body(Body::empty())
        .unwrap();
    assert_eq!(send(&app, req).await.status, StatusCode::BAD_REQUEST);

    for host in ["example.com:8000", "www.example.org"] {
        let req = Request::builder()
            .uri("/health")
            .header(header::HOST, host)
            .body(Body::empty())
            .unwrap();
        assert_eq!(send(&app, req).await.status, StatusCode::OK, "host {host}");
    }
}

// ===========================================================================
// Sessions
// ===========================================================================

#[tokio::test]
async fn login_session_logout_cycle() {
    let (_server, app) = app();

    let bad = login(&app, ADMIN_EMAIL, "wrong").await;
    assert_eq!(bad.status, StatusCode::UNAUTHORIZED);

    let token = admin_token(&app).await;
    let response = send(&app, authed(Method::GET, "/en/session", &token, None)).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json()["user"]["email"], ADMIN_EMAIL);
    assert_eq!(response.json()["user"]["is_superuser"], true);

    let response = send(&app, authed(Method::POST, "/en/logout", &token, None)).await;
    assert_eq!(response.status, StatusCode::OK);

    let response = send(&app, authed(Method::GET, "/en/session", &token, None)).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn admin_requires_staff() {
    let (server, app) = app();
    server
        .state()
        .users()
        .create_user(
            "visitor@example.com",
            Some("visitor-pass-1"),
            ExtraFields {
                is_staff: Some(false),
                ..Default::default()
            },
        )
        .unwrap();

    assert_eq!(send(&app, get("/en/users")).await.status, StatusCode::UNAUTHORIZED);

    let token = login(&app, "visitor@example.com", "visitor-pass-1").await.json()["token"]
        .as_str()
        .unwrap()
        .to_string();
    let response = send(&app, authed(Method::GET, "/en/users", &token, None)).await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);

    // Docs only need a login.
    let response = send(
        &app,
        authed(Method::GET, "/en/documentation/schema/", &token, None),
    )
    .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json()["openapi"], "3.0.3");
}

#[tokio::test]
async fn session_cookie_opens_docs_pages() {
    let (_server, app) = app();

    for page in ["/en/documentation/swagger-ui/", "/en/documentation/redoc/"] {
        assert_eq!(send(&app, get(page)).await.status, StatusCode::UNAUTHORIZED);
    }

    let response = login(&app, ADMIN_EMAIL, ADMIN_PASSWORD).await;
    let cookie = session_cookie(&response);
    assert!(cookie.starts_with("sessionid="));
    assert!(response.header(header::SET_COOKIE).contains("HttpOnly"));

    let response = send(&app, with_cookie("/en/documentation/swagger-ui/", &cookie)).await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.header(header::CONTENT_TYPE).starts_with("text/html"));
    let html = String::from_utf8(response.body).unwrap();
    assert!(html.contains(r##"dom_id: "#swagger-ui""##));
    assert!(html.contains(r#"url: "/en/documentation/schema/""#));
    assert!(html.contains(r#"req.credentials = "same-origin""#));

    let response = send(&app, with_cookie("/de/documentation/redoc/", &cookie)).await;
    assert_eq!(response.status, StatusCode::OK);
    let html = String::from_utf8(response.body).unwrap();
    assert!(html.contains(r#"<redoc spec-url="/de/documentation/schema/">"#));

    let response = send(&app, with_cookie("/en/documentation/schema/", &cookie)).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(
        response.json()["paths"]["/{lang}/users"]["get"]["parameters"][0]["schema"]["enum"],
        json!(["de", "en"])
    );

    // A forged cookie does not pass.
    let forged = format!("{}0", cookie);
    let response = send(&app, with_cookie("/en/documentation/redoc/", &forged)).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);

    // Logging out through the cookie closes the session.
    let req = Request::builder()
        .method(Method::POST)
        .uri("/en/logout")
        .header(header::COOKIE, &cookie)
        .body(Body::empty())
        .unwrap();
    let response = send(&app, req).await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.header(header::SET_COOKIE).contains("Max-Age=0"));
    let response = send(&app, with_cookie("/en/documentation/swagger-ui/", &cookie)).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn session_tokens_are_signed_with_the_secret_key() {
    let mut config = test_config();
    config.server.secret_key = Some("unit-test-secret".into());
    let app = server_with(config).router();

    let token = admin_token(&app).await;
    assert!(sitekit_web::api::auth::verify_session(b"unit-test-secret", &token).is_some());
    assert!(sitekit_web::api::auth::verify_session(b"another-secret", &token).is_none());
}

// ===========================================================================
// Admin
// ===========================================================================

#[tokio::test]
async fn admin_index_counts_records() {
    let (_server, app) = app();
    let token = admin_token(&app).await;

    let response = send(&app, authed(Method::GET, "/de/", &token, None)).await;
    assert_eq!(response.status, StatusCode::OK);
    let body = response.json();
    assert_eq!(body["user_count"], 1);
    assert_eq!(body["links"]["users"], "/de/users");
}

#[tokio::test]
async fn add_user_validates_passwords() {
    let (_server, app) = app();
    let token = admin_token(&app).await;

    let mismatch = json!({
        "email": "new@example.com",
        "password1": "Tr1cky-Horse-77",
        "password2": "Tr1cky-Horse-78",
    });
    let response = send(&app, authed(Method::POST, "/en/users", &token, Some(mismatch))).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let common = json!({
        "email": "new@example.com",
        "password1": "password",
        "password2": "password",
    });
    let response = send(&app, authed(Method::POST, "/en/users", &token, Some(common))).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let good = json!({
        "email": "New@EXAMPLE.com",
        "password1": "Tr1cky-Horse-77",
        "password2": "Tr1cky-Horse-77",
    });
    let response = send(&app, authed(Method::POST, "/en/users", &token, Some(good.clone()))).await;
    assert_eq!(response.status, StatusCode::CREATED);
    let body = response.json();
    assert_eq!(body["email"], "New@example.com");
    assert_eq!(body["first_name"], "N");
    assert_eq!(body["last_name"], "E");
    assert_eq!(body["is_staff"], true);
    assert_eq!(body["is_superuser"], false);

    let response = send(&app, authed(Method::POST, "/en/users", &token, Some(good))).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn add_form_sets_flags_groups_and_join_date() {
    let mut config = test_config();
    config.i18n.time_zone = "Europe/Berlin".into();
    let app = server_with(config).router();
    let token = admin_token(&app).await;

    let group = send(
        &app,
        authed(Method::POST, "/en/groups", &token, Some(json!({ "name": "editors" }))),
    )
    .await;
    let group_id = group.json()["id"].as_i64().unwrap();

    let unknown_group = json!({
        "email": "ghost@example.com",
        "password1": "Tr1cky-Horse-77",
        "password2": "Tr1cky-Horse-77",
        "groups": [group_id, 9999],
    });
    let response = send(&app, authed(Method::POST, "/en/users", &token, Some(unknown_group))).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    let response = send(&app, authed(Method::GET, "/en/users?q=ghost", &token, None)).await;
    assert_eq!(response.json(), json!([]));

    let form = json!({
        "email": "chief@example.com",
        "password1": "Tr1cky-Horse-77",
        "password2": "Tr1cky-Horse-77",
        "is_superuser": true,
        "is_staff": true,
        "is_active": false,
        "groups": [group_id],
        "date_joined": "2024-01-15T12:00:00Z",
    });
    let response = send(&app, authed(Method::POST, "/en/users", &token, Some(form))).await;
    assert_eq!(response.status, StatusCode::CREATED);
    let body = response.json();
    assert_eq!(body["is_superuser"], true);
    assert_eq!(body["is_staff"], true);
    assert_eq!(body["is_active"], false);
    assert_eq!(body["groups"], json!(["editors"]));
    assert_eq!(body["date_joined"], "2024-01-15T13:00:00+01:00");
}

#[tokio::test]
async fn user_list_search_and_filters() {
    let (server, app) = app();
    let state = server.state();
    let users = state.users();
    for (email, first) in [("zoe@example.com", "Zoe"), ("bob@example.com", "Robert")] {
        users
            .create_user(
                email,
                None,
                ExtraFields {
                    first_name: Some(first.into()),
                    ..Default::default()
                },
            )
            .unwrap();
    }
    let token = admin_token(&app).await;

    let response = send(&app, authed(Method::GET, "/en/users", &token, None)).await;
    let emails: Vec<String> = response
        .json()
        .as_array()
        .unwrap()
        .iter()
        .map(|u| u["email"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(emails, vec![ADMIN_EMAIL, "bob@example.com", "zoe@example.com"]);

    let response = send(&app, authed(Method::GET, "/en/users?q=robert", &token, None)).await;
    let body = response.json();
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["email"], "bob@example.com");
    assert_eq!(body[0]["is_admin"], false);

    let response = send(
        &app,
        authed(Method::GET, "/en/users?is_superuser=true", &token, None),
    )
    .await;
    let body = response.json();
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["is_admin"], true);
}

#[tokio::test]
async fn change_view_edits_and_protects_read_only_fields() {
    let (server, app) = app();
    let user = server
        .state()
        .users()
        .create_user("edit@example.com", Some("edit-pass-123"), ExtraFields::default())
        .unwrap();
    let token = admin_token(&app).await;
    let uri = format!("/en/users/{}", user.id);

    let response = send(
        &app,
        authed(Method::PATCH, &uri, &token, Some(json!({ "is_superuser": true }))),
    )
    .await;
    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);

    let groups = send(
        &app,
        authed(Method::POST, "/en/groups", &token, Some(json!({ "name": "editors" }))),
    )
    .await;
    assert_eq!(groups.status, StatusCode::CREATED);
    let group_id = groups.json()["id"].as_i64().unwrap();

    let change = json!({
        "first_name": "Edith",
        "last_name": "",
        "is_active": false,
        "groups": [group_id],
    });
    let response = send(&app, authed(Method::PATCH, &uri, &token, Some(change))).await;
    assert_eq!(response.status, StatusCode::OK);
    let body = response.json();
    assert_eq!(body["first_name"], "Edith");
    assert_eq!(body["last_name"], "D");
    assert_eq!(body["is_active"], false);
    assert_eq!(body["groups"], json!(["editors"]));
    assert_eq!(body["is_superuser"], false);

    let response = send(&app, authed(Method::DELETE, &uri, &token, None)).await;
    assert_eq!(response.status, StatusCode::NO_CONTENT);
    let response = send(&app, authed(Method::GET, &uri, &token, None)).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn user_search_matches_non_ascii_names() {
    let (server, app) = app();
    server
        .state()
        .users()
        .create_user(
            "olaf@example.com",
            None,
            ExtraFields {
                first_name: Some("Ölaf".into()),
                ..Default::default()
            },
        )
        .unwrap();
    let token = admin_token(&app).await;

    // "Ölaf" and "laf", percent-encoded.
    for q in ["%C3%96laf", "laf", "LAF"] {
        let uri = format!("/en/users?q={}", q);
        let response = send(&app, authed(Method::GET, &uri, &token, None)).await;
        let body = response.json();
        assert_eq!(body.as_array().unwrap().len(), 1, "q={q}");
        assert_eq!(body[0]["email"], "olaf@example.com");
    }
}

#[tokio::test]
async fn change_with_unknown_group_leaves_record_unchanged() {
    let (server, app) = app();
    let state = server.state();
    let user = state
        .users()
        .create_user(
            "steady@example.com",
            None,
            ExtraFields {
                first_name: Some("Stella".into()),
                ..Default::default()
            },
        )
        .unwrap();
    let token = admin_token(&app).await;
    let editors = send(
        &app,
        authed(Method::POST, "/en/groups", &token, Some(json!({ "name": "editors" }))),
    )
    .await
    .json()["id"]
        .as_i64()
        .unwrap();
    state.users().set_groups(&user, &[editors]).unwrap();
    let uri = format!("/en/users/{}", user.id);

    let change = json!({
        "email": "moved@example.com",
        "first_name": "Changed",
        "is_active": false,
        "groups": [editors, 9999],
    });
    let response = send(&app, authed(Method::PATCH, &uri, &token, Some(change))).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);

    let body = send(&app, authed(Method::GET, &uri, &token, None)).await.json();
    assert_eq!(body["email"], "steady@example.com");
    assert_eq!(body["first_name"], "Stella");
    assert_eq!(body["is_active"], true);
    assert_eq!(body["groups"], json!(["editors"]));
}

#[tokio::test]
async fn admin_sets_password() {
    let (server, app) = app();
    let user = server
        .state()
        .users()
        .create_user("pw@example.com", None, ExtraFields::default())
        .unwrap();
    let token = admin_token(&app).await;
    let uri = format!("/en/users/{}/password", user.id);

    let numeric = json!({ "password1": "908172635443", "password2": "908172635443" });
    let response = send(&app, authed(Method::POST, &uri, &token, Some(numeric))).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let good = json!({ "password1": "Quiet-Lantern-42", "password2": "Quiet-Lantern-42" });
    let response = send(&app, authed(Method::POST, &uri, &token, Some(good))).await;
    assert_eq!(response.status, StatusCode::OK);

    assert_eq!(
        login(&app, "pw@example.com", "Quiet-Lantern-42").await.status,
        StatusCode::OK
    );
}

#[tokio::test]
async fn duplicate_group_is_rejected() {
    let (_server, app) = app();
    let token = admin_token(&app).await;

    for expected in [StatusCode::CREATED, StatusCode::BAD_REQUEST] {
        let response = send(
            &app,
            authed(Method::POST, "/en/groups", &token, Some(json!({ "name": "staff" }))),
        )
        .await;
        assert_eq!(response.status, expected);
    }
    let response = send(&app, authed(Method::GET, "/en/groups", &token, None)).await;
    assert_eq!(response.json(), json!([{ "id": 1, "name": "staff" }]));
}

// ===========================================================================
// Languages
// ===========================================================================

#[tokio::test]
async fn language_list_has_switch_urls() {
    let (_server, app) = app();
    let response = send(&app, get("/en/i18n/?next=/en/users?page=2")).await;
    assert_eq!(response.status, StatusCode::OK);

    let body = response.json();
    assert_eq!(body["current"], "en");
    assert_eq!(
        body["languages"],
        json!([
            { "code": "de", "name": "German", "active": false, "url": "/de/users?page=2" },
            { "code": "en", "name": "English", "active": true, "url": "/en/users?page=2" },
        ])
    );
}

#[tokio::test]
async fn switch_sets_cookie_and_redirects() {
    let (_server, app) = app();

    let response = send(&app, get("/en/i18n/switch?to=de&next=/en/users")).await;
    assert_eq!(response.status, StatusCode::FOUND);
    assert_eq!(response.header(header::LOCATION), "/de/users");
    assert!(response.header(header::SET_COOKIE).starts_with("lang=de;"));

    let response = send(&app, get("/en/i18n/switch?to=de")).await;
    assert_eq!(response.header(header::LOCATION), "/de/");

    let response = send(&app, get("/en/i18n/switch?to=fr&next=/en/users")).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let response = send(&app, get("/en/i18n/switch?to=de&next=//evil.test/")).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}
