//! Variant routing middleware for `splitpage`.
//!
//! Runs before route matching. Reads the `Host` and `Cookie` headers, asks the
//! [`RequestRouter`](splitpage_core::routing::RequestRouter) for a decision,
//! rewrites the request URI in place (the browser's URL is untouched), and
//! appends any `Set-Cookie` headers to the response the inner router
//! produces. Nothing in here can fail a request: if a rewrite cannot be
//! applied the request is served as it came in.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::header::{COOKIE, HOST, SET_COOKIE};
use axum::http::{HeaderMap, HeaderValue, Uri};
use axum::middleware::Next;
use axum::response::Response;
use tracing::{info, warn};

use splitpage_core::cookie::{Cookie, CookieJar, find_cookie};
use splitpage_core::routing::{RouteOutcome, RouteRequest};

use crate::state::AppState;

/// Routing decision made for a request, inserted into request extensions
/// when the request was rewritten.
#[derive(Debug, Clone)]
pub struct VariantContext(pub RouteOutcome);

impl VariantContext {
    /// `true` when the visitor was assigned a variant on this request.
    #[must_use]
    pub fn newly_assigned(&self) -> bool {
        matches!(
            &self.0,
            RouteOutcome::Rewrite { assignment: Some(decision), .. } if decision.is_new
        )
    }
}

/// Cookie jar over request headers, collecting cookies for the response.
#[derive(Debug, Default)]
pub struct HeaderCookieJar {
    header: String,
    outgoing: Vec<Cookie>,
}

impl HeaderCookieJar {
    /// Collect every readable `Cookie` header. Non-UTF-8 headers are ignored.
    #[must_use]
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let header = headers
            .get_all(COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .collect::<Vec<_>>()
            .join("; ");
        Self {
            header,
            outgoing: Vec::new(),
        }
    }

    /// Write queued cookies as `Set-Cookie` headers.
    pub fn apply(self, headers: &mut HeaderMap) {
        for cookie in self.outgoing {
            match HeaderValue::from_str(&cookie.to_header_value()) {
                Ok(value) => {
                    headers.append(SET_COOKIE, value);
                }
                Err(e) => warn!(cookie = %cookie.name, error = %e, "dropping unencodable cookie"),
            }
        }
    }
}

impl CookieJar for HeaderCookieJar {
    fn get_cookie(&self, name: &str) -> Option<String> {
        find_cookie(&self.header, name)
    }

    fn set_cookie(&mut self, cookie: Cookie) {
        self.outgoing.push(cookie);
    }
}

/// Middleware applying path- and host-based variant routing.
///
/// Must wrap the whole router (not be added with `route_layer`) so that the
/// rewritten URI is what the inner router matches on.
pub async fn variant_routing(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Response {
    let host = request_host(&req);
    let mut jar = HeaderCookieJar::from_headers(req.headers());

    let outcome = state.router.route(
        RouteRequest {
            host: host.as_deref(),
            path: req.uri().path(),
        },
        &mut jar,
    );

    if let RouteOutcome::Rewrite {
        path,
        variant,
        strategy,
        assignment,
    } = &outcome
    {
        if assignment.as_ref().is_some_and(|a| a.is_new) {
            info!(variant = %variant, "variant assigned");
        }

        match rewrite_uri(req.uri(), path) {
            Some(uri) => {
                *req.uri_mut() = uri;
                req.extensions_mut().insert(VariantContext(outcome.clone()));
            }
            None => {
                warn!(path = %path, strategy = %strategy, "could not rewrite request uri");
            }
        }
    }

    let mut response = next.run(req).await;
    jar.apply(response.headers_mut());
    response
}

/// `Host` header, falling back to the URI authority (HTTP/2).
fn request_host(req: &Request) -> Option<String> {
    req.headers()
        .get(HOST)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned)
        .or_else(|| req.uri().authority().map(|a| a.as_str().to_owned()))
}

/// Replace the path of `uri`, keeping its query string.
fn rewrite_uri(uri: &Uri, path: &str) -> Option<Uri> {
    let path_and_query = match uri.query() {
        Some(query) => format!("{path}?{query}"),
        None => path.to_owned(),
    };
    let mut parts = uri.clone().into_parts();
    parts.path_and_query = Some(path_and_query.parse().ok()?);
    Uri::from_parts(parts).ok()
}
