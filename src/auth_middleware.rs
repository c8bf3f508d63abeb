//! Actix Web middleware running the route gate ahead of every page.
//!
//! # Overview
//! [`RouteGate`] wraps a scope. For each request it parses the incoming cookies, runs
//! [`gate::evaluate`], and then either:
//!
//! - forwards the request, after merging any rotated session cookies into the
//!   request's `Cookie` header and storing the [`Principal`] in request extensions, or
//! - answers with a `302 Found` redirect.
//!
//! In both cases every cookie returned by the session store is written to the
//! response, so a token rotation is never lost to a redirect.
//!
//! # Usage
//! ```rust,no_run
//! use std::sync::Arc;
//! use actix_web::{App, web};
//! use storefront_admin::{AdminSession, GateConfig, RouteGate, services::{RoleStore, SessionStore}};
//!
//! fn app(sessions: Arc<dyn SessionStore>, roles: Arc<dyn RoleStore>) {
//!     let _app = App::new().service(
//!         web::scope("")
//!             .wrap(RouteGate::new(sessions, roles, GateConfig::default()))
//!             .route("/dashboard", web::get().to(|admin: AdminSession| async move {
//!                 format!("hello {}", admin.id)
//!             })),
//!     );
//! }
//! ```
//!
//! # See Also
//! - [`AdminSession`]: extractor for the principal admitted by the gate.

use std::{
    future::Future,
    ops::Deref,
    pin::Pin,
    rc::Rc,
    sync::Arc,
    task::{Context, Poll},
};

use actix_web::{
    Error, FromRequest, HttpMessage, HttpRequest, HttpResponse,
    body::EitherBody,
    cookie::Cookie,
    dev::{Payload, Service, ServiceRequest, ServiceResponse, Transform},
    http::header::{self, HeaderValue},
};
use futures::future::{Ready, ok, ready};

use crate::{
    gate::{self, Decision, GateConfig, routes},
    services::{Principal, RoleStore, SessionStore},
};

/// Middleware factory holding the gate's collaborators.
#[derive(Clone)]
pub struct RouteGate {
    sessions: Arc<dyn SessionStore>,
    roles: Arc<dyn RoleStore>,
    config: Arc<GateConfig>,
}

impl RouteGate {
    pub fn new(
        sessions: Arc<dyn SessionStore>,
        roles: Arc<dyn RoleStore>,
        config: GateConfig,
    ) -> Self {
        Self {
            sessions,
            roles,
            config: Arc::new(config),
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for RouteGate
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = RouteGateService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(RouteGateService {
            service: Rc::new(service),
            gate: self.clone(),
        })
    }
}

/// Per-worker service produced by [`RouteGate`].
pub struct RouteGateService<S> {
    service: Rc<S>,
    gate: RouteGate,
}

impl<S, B> Service<ServiceRequest> for RouteGateService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    fn poll_ready(&self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(cx)
    }

    fn call(&self, mut req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let gate = self.gate.clone();

        Box::pin(async move {
            let path = req.path().to_string();

            if !routes::is_gated(&path) {
                tracing::trace!(path = %path, "Path excluded from route gate");
                return service.call(req).await.map(ServiceResponse::map_into_left_body);
            }

            let incoming = request_cookies(req.request());
            let outcome = gate::evaluate(
                &path,
                &incoming,
                &gate.config,
                gate.sessions.as_ref(),
                gate.roles.as_ref(),
            )
            .await;

            tracing::info!(
                path = %path,
                decision = outcome.decision.label(),
                user_id = ?outcome.principal.as_ref().map(|p| p.id),
                rotated_cookies = outcome.cookies.len(),
                "Route gate decision"
            );

            if let Some(location) = outcome.decision.location(&gate.config) {
                let mut response = HttpResponse::Found()
                    .insert_header((header::LOCATION, location))
                    .finish();
                set_cookies(&mut response, &outcome.cookies);
                return Ok(req.into_response(response).map_into_right_body());
            }

            debug_assert_eq!(outcome.decision, Decision::Allow);

            if !outcome.cookies.is_empty() {
                forward_cookies(&mut req, &incoming, &outcome.cookies);
            }
            if let Some(principal) = outcome.principal {
                req.extensions_mut().insert(principal);
            }

            let mut res = service.call(req).await?;
            set_cookies(res.response_mut(), &outcome.cookies);
            Ok(res.map_into_left_body())
        })
    }
}

/// Parses the `Cookie` headers directly.
///
/// `HttpRequest::cookies` caches its result in request extensions, which would go
/// stale once [`forward_cookies`] rewrites the header.
fn request_cookies(req: &HttpRequest) -> Vec<Cookie<'static>> {
    req.headers()
        .get_all(header::COOKIE)
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter(|piece| !piece.trim().is_empty())
        .map(|piece| Cookie::parse(piece.to_owned()))
        .filter_map(Result::ok)
        .collect()
}

/// Applies session cookie mutations to the cookies a handler will see.
///
/// Removal cookies drop the entry; every other cookie replaces its namesake.
pub fn merge_request_cookies(
    incoming: &[Cookie<'static>],
    mutations: &[Cookie<'static>],
) -> Vec<Cookie<'static>> {
    let mut merged: Vec<Cookie<'static>> = incoming
        .iter()
        .filter(|c| !mutations.iter().any(|m| m.name() == c.name()))
        .cloned()
        .collect();

    merged.extend(
        mutations
            .iter()
            .filter(|m| !m.value().is_empty())
            .map(|m| Cookie::new(m.name().to_owned(), m.value().to_owned())),
    );
    merged
}

fn forward_cookies(req: &mut ServiceRequest, incoming: &[Cookie<'static>], mutations: &[Cookie<'static>]) {
    let merged = merge_request_cookies(incoming, mutations);
    let headers = req.headers_mut();
    headers.remove(header::COOKIE);

    if merged.is_empty() {
        return;
    }

    let joined = merged
        .iter()
        .map(|c| c.stripped().to_string())
        .collect::<Vec<_>>()
        .join("; ");

    match HeaderValue::from_str(&joined) {
        Ok(value) => {
            headers.insert(header::COOKIE, value);
        }
        Err(e) => tracing::error!(error = %e, "Failed to rewrite request cookies"),
    }
}

fn set_cookies<B>(response: &mut HttpResponse<B>, cookies: &[Cookie<'static>]) {
    for cookie in cookies {
        if let Err(e) = response.add_cookie(cookie) {
            tracing::error!(cookie = cookie.name(), error = %e, "Failed to set session cookie");
        }
    }
}

/// Extractor for the principal the gate admitted.
///
/// Only available on routes wrapped by [`RouteGate`] that reached the handler, which
/// for protected routes means the principal holds the admin role. Responds with
/// 401 Unauthorized otherwise.
#[derive(Debug, Clone)]
pub struct AdminSession(pub Principal);

impl Deref for AdminSession {
    type Target = Principal;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl FromRequest for AdminSession {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(
            req.extensions()
                .get::<Principal>()
                .cloned()
                .map(AdminSession)
                .ok_or_else(|| {
                    tracing::warn!(path = %req.path(), "AdminSession requested outside the route gate");
                    actix_web::error::ErrorUnauthorized("no admitted session")
                }),
        )
    }
}
