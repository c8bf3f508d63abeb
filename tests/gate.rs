//! Route gate tests driving the real middleware with fake collaborators.

mod common;

use std::sync::Arc;

use actix_web::{App, HttpRequest, HttpResponse, http::header, test, web};
use common::{
    FakeRoles, FakeSessions, ROTATED_ACCESS, RoleAnswer, principal, session_cookie_header,
};
use storefront_admin::{GateConfig, RouteGate, data::Role, handlers, services::Principal};

async fn echo_cookies(req: HttpRequest) -> HttpResponse {
    let cookies = req
        .headers()
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    HttpResponse::Ok().body(cookies)
}

macro_rules! gated_app {
    ($sessions:expr, $roles:expr) => {
        test::init_service(
            App::new().service(
                web::scope("")
                    .wrap(RouteGate::new($sessions, $roles, GateConfig::default()))
                    .configure(handlers::pages::configure_page_routes)
                    .route("/orders/{id}", web::get().to(echo_cookies)),
            ),
        )
        .await
    };
}

fn location<B>(resp: &actix_web::dev::ServiceResponse<B>) -> String {
    resp.headers()
        .get(header::LOCATION)
        .expect("redirect without Location")
        .to_str()
        .unwrap()
        .to_string()
}

fn response_cookie<B>(resp: &actix_web::dev::ServiceResponse<B>, name: &str) -> Option<String> {
    resp.response()
        .cookies()
        .find(|c| c.name() == name)
        .map(|c| c.value().to_string())
}

#[actix_web::test]
async fn anonymous_request_to_protected_path_redirects_to_login() {
    let sessions = Arc::new(FakeSessions::default());
    let roles = Arc::new(FakeRoles::admin());
    let app = gated_app!(sessions.clone(), roles.clone());

    let req = test::TestRequest::get().uri("/orders/42").to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), 302);
    let location = location(&resp);
    assert_eq!(location, "/login?redirect=%2Forders%2F42");

    let (_, encoded) = location.split_once("redirect=").unwrap();
    assert_eq!(urlencoding::decode(encoded).unwrap(), "/orders/42");
    assert_eq!(roles.calls(), 0);
}

#[actix_web::test]
async fn return_path_drops_query_string() {
    let app = gated_app!(Arc::new(FakeSessions::default()), Arc::new(FakeRoles::admin()));

    let req = test::TestRequest::get()
        .uri("/orders/42?tab=items")
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(location(&resp), "/login?redirect=%2Forders%2F42");
}

#[actix_web::test]
async fn anonymous_request_to_public_path_passes_through() {
    let app = gated_app!(Arc::new(FakeSessions::default()), Arc::new(FakeRoles::admin()));

    let req = test::TestRequest::get()
        .uri("/login?error=unauthorized")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);

    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["notice"], handlers::pages::UNAUTHORIZED_NOTICE);
}

#[actix_web::test]
async fn unrouted_public_path_is_not_redirected() {
    let app = gated_app!(Arc::new(FakeSessions::default()), Arc::new(FakeRoles::admin()));

    let req = test::TestRequest::get().uri("/setup-admin").to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), 404);
}

#[actix_web::test]
async fn admin_is_allowed_with_rotated_cookies() {
    let app = gated_app!(Arc::new(FakeSessions::rotating()), Arc::new(FakeRoles::admin()));

    let req = test::TestRequest::get()
        .uri("/orders/42")
        .insert_header(session_cookie_header())
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), 200);
    assert_eq!(
        response_cookie(&resp, "sb-access-token").as_deref(),
        Some(ROTATED_ACCESS)
    );

    // the handler sees the rotated tokens, not the stale ones
    let body = test::read_body(resp).await;
    let seen = std::str::from_utf8(&body).unwrap();
    assert!(seen.contains("sb-access-token=rotated-access"), "{seen}");
    assert!(seen.contains("sb-refresh-token=rotated-refresh"), "{seen}");
    assert!(seen.contains("theme=dark"), "{seen}");
    assert!(!seen.contains("old-access"), "{seen}");
}

#[actix_web::test]
async fn customer_is_redirected_as_unauthorized() {
    let roles = Arc::new(FakeRoles::new(RoleAnswer::Found(Role::Customer)));
    let app = gated_app!(Arc::new(FakeSessions::signed_in()), roles.clone());

    let req = test::TestRequest::get()
        .uri("/dashboard")
        .insert_header(session_cookie_header())
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), 302);
    assert_eq!(location(&resp), "/login?error=unauthorized");
    assert_eq!(roles.calls(), 1);
}

#[actix_web::test]
async fn seller_is_redirected_as_unauthorized() {
    let app = gated_app!(
        Arc::new(FakeSessions::signed_in()),
        Arc::new(FakeRoles::new(RoleAnswer::Found(Role::Seller)))
    );

    let req = test::TestRequest::get()
        .uri("/orders/7")
        .insert_header(session_cookie_header())
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(location(&resp), "/login?error=unauthorized");
}

#[actix_web::test]
async fn missing_role_record_is_unauthorized() {
    let app = gated_app!(
        Arc::new(FakeSessions::signed_in()),
        Arc::new(FakeRoles::new(RoleAnswer::Missing))
    );

    let req = test::TestRequest::get()
        .uri("/orders/42")
        .insert_header(session_cookie_header())
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), 302);
    assert_eq!(location(&resp), "/login?error=unauthorized");
}

#[actix_web::test]
async fn role_lookup_failure_fails_closed() {
    let app = gated_app!(
        Arc::new(FakeSessions::signed_in()),
        Arc::new(FakeRoles::new(RoleAnswer::Fail))
    );

    let req = test::TestRequest::get()
        .uri("/orders/42")
        .insert_header(session_cookie_header())
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), 302);
    assert_eq!(location(&resp), "/login?error=unauthorized");
}

#[actix_web::test]
async fn rotated_cookies_survive_unauthorized_redirect() {
    let app = gated_app!(
        Arc::new(FakeSessions::rotating()),
        Arc::new(FakeRoles::new(RoleAnswer::Found(Role::Customer)))
    );

    let req = test::TestRequest::get()
        .uri("/orders/42")
        .insert_header(session_cookie_header())
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(location(&resp), "/login?error=unauthorized");
    assert_eq!(
        response_cookie(&resp, "sb-access-token").as_deref(),
        Some(ROTATED_ACCESS)
    );
    assert!(response_cookie(&resp, "sb-refresh-token").is_some());
}

#[actix_web::test]
async fn signed_in_caller_on_login_lands_on_dashboard() {
    let roles = Arc::new(FakeRoles::admin());
    let app = gated_app!(Arc::new(FakeSessions::rotating()), roles.clone());

    let req = test::TestRequest::get()
        .uri("/login")
        .insert_header(session_cookie_header())
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), 302);
    assert_eq!(location(&resp), "/dashboard");
    assert!(response_cookie(&resp, "sb-access-token").is_some());
    assert_eq!(roles.calls(), 0);
}

#[actix_web::test]
async fn session_store_failure_treats_caller_as_anonymous() {
    let roles = Arc::new(FakeRoles::admin());
    let app = gated_app!(Arc::new(FakeSessions::unavailable()), roles.clone());

    let req = test::TestRequest::get()
        .uri("/orders/42")
        .insert_header(session_cookie_header())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(location(&resp), "/login?redirect=%2Forders%2F42");

    let req = test::TestRequest::get()
        .uri("/login")
        .insert_header(session_cookie_header())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    assert_eq!(roles.calls(), 0);
}

#[actix_web::test]
async fn static_assets_skip_the_gate() {
    let sessions = Arc::new(FakeSessions::default());
    let app = gated_app!(sessions.clone(), Arc::new(FakeRoles::admin()));

    for uri in ["/_next/static/chunks/app.js", "/favicon.ico", "/static/Logo.PNG"] {
        let req = test::TestRequest::get().uri(uri).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 404, "{uri}");
    }
    assert_eq!(sessions.calls(), 0);
}

#[actix_web::test]
async fn image_extension_on_a_page_route_is_still_gated() {
    let sessions = Arc::new(FakeSessions::default());
    let app = gated_app!(sessions.clone(), Arc::new(FakeRoles::admin()));

    let req = test::TestRequest::get().uri("/orders/42.png").to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), 302);
    assert_eq!(location(&resp), "/login?redirect=%2Forders%2F42.png");
    assert_eq!(sessions.calls(), 1);
}

#[actix_web::test]
async fn dot_segments_under_asset_prefix_are_gated() {
    let app = gated_app!(Arc::new(FakeSessions::default()), Arc::new(FakeRoles::admin()));

    let req = test::TestRequest::get()
        .uri("/static/../orders/42")
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), 302);
}

/// A signed-in customer bounces between the unauthorized notice and the landing
/// page: `/login` is public, so any session is sent on to `/dashboard`.
#[actix_web::test]
async fn signed_in_customer_cycles_between_login_and_dashboard() {
    let app = gated_app!(
        Arc::new(FakeSessions::signed_in()),
        Arc::new(FakeRoles::new(RoleAnswer::Found(Role::Customer)))
    );

    let req = test::TestRequest::get()
        .uri("/dashboard")
        .insert_header(session_cookie_header())
        .to_request();
    let resp = test::call_service(&app, req).await;
    let notice = location(&resp);
    assert_eq!(notice, "/login?error=unauthorized");

    let req = test::TestRequest::get()
        .uri(&notice)
        .insert_header(session_cookie_header())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 302);
    assert_eq!(location(&resp), "/dashboard");
}

#[actix_web::test]
async fn admitted_principal_reaches_handlers() {
    let app = gated_app!(Arc::new(FakeSessions::signed_in()), Arc::new(FakeRoles::admin()));

    let req = test::TestRequest::get()
        .uri("/api/session")
        .insert_header(session_cookie_header())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);

    let body: serde_json::Value = test::read_body_json(resp).await;
    let expected: Principal = principal();
    assert_eq!(body["id"], expected.id.to_string());
    assert_eq!(body["email"], "owner@shop.example");
}
