//! Page endpoints behind the route gate.
//!
//! The frontend renders these pages; the backend only supplies the data each one
//! needs to decide what to show.

use actix_web::{HttpResponse, Responder, web};
use serde::Deserialize;

use crate::auth_middleware::AdminSession;

/// Message the login page shows after an `error=unauthorized` redirect.
pub const UNAUTHORIZED_NOTICE: &str = "You do not have access to the admin dashboard.";

#[derive(Debug, Deserialize)]
pub struct LoginQuery {
    pub redirect: Option<String>,
    pub error: Option<String>,
}

/// Registers the gated page routes.
///
/// # Routes
/// ```text
/// GET /login        - sign-in page state (public)
/// GET /dashboard    - landing page for admins
/// GET /api/session  - the admitted principal
/// ```
pub fn configure_page_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/login", web::get().to(login))
        .route("/dashboard", web::get().to(dashboard))
        .route("/api/session", web::get().to(current_session));
}

/// `GET /login`
///
/// Reports whether an access notice should be displayed and where to go after
/// signing in. Only same-origin paths are accepted as the return target.
///
/// # Example
/// ```json
/// { "notice": "You do not have access to the admin dashboard.", "redirect": "/dashboard" }
/// ```
pub async fn login(query: web::Query<LoginQuery>) -> impl Responder {
    let notice = query
        .error
        .as_deref()
        .filter(|e| *e == "unauthorized")
        .map(|_| UNAUTHORIZED_NOTICE);

    let redirect = query
        .redirect
        .as_deref()
        .filter(|target| is_local_path(target))
        .unwrap_or("/dashboard");

    HttpResponse::Ok().json(serde_json::json!({
        "notice": notice,
        "redirect": redirect,
    }))
}

/// `GET /dashboard`
#[tracing::instrument(skip(admin), fields(user_id = %admin.id))]
pub async fn dashboard(admin: AdminSession) -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({
        "user_id": admin.id,
        "email": admin.email,
    }))
}

/// `GET /api/session`
pub async fn current_session(admin: AdminSession) -> impl Responder {
    HttpResponse::Ok().json(&admin.0)
}

/// Rejects absolute and protocol-relative URLs so the return target stays on this site.
fn is_local_path(target: &str) -> bool {
    target.starts_with('/') && !target.starts_with("//") && !target.contains('\\')
}
