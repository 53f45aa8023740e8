//! Request routing: decides which variant page serves a request.
//!
//! Two strategies can be enabled side by side:
//!
//! - **Host**: a request whose leftmost host label is a known alias
//!   (`variant-b.example.com`, `b.localhost`) is served that variant's page.
//!   The host alone decides; cookies are neither read nor written.
//! - **Path**: a request for the entry path (`/landing`) is resolved through
//!   the [`AssignmentEngine`] using the `ab_variant` cookie, and the cookie is
//!   (re)written when it is missing or disagrees with the resolved variant.
//!
//! Host is checked first, so a variant subdomain always wins over a cookie.
//! Both produce an internal rewrite to `{entry_path}/{variant}`; the visible
//! URL is untouched. A path that already names a variant page is never
//! rewritten again.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use rand::Rng;
use serde::Serialize;
use tracing::debug;

use crate::assignment::{AssignmentDecision, AssignmentEngine};
use crate::catalog::{Variant, VariantCatalog};
use crate::cookie::{Cookie, CookieJar, VARIANT_COOKIE_NAME};

/// Default entry path for path-based assignment.
pub const DEFAULT_ENTRY_PATH: &str = "/landing";

/// Path prefixes the host strategy never rewrites.
const HOST_EXEMPT_PREFIXES: &[&str] = &["/api/", "/static/"];

/// File extensions the host strategy never rewrites.
const STATIC_EXTENSIONS: &[&str] = &["svg", "png", "jpg", "jpeg", "gif", "webp", "ico", "css", "js"];

/// A routing strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Cookie-backed assignment on the entry path.
    Path,
    /// Subdomain alias mapping.
    Host,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Path => "path",
            Self::Host => "host",
        })
    }
}

impl FromStr for Strategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "path" | "cookie" => Ok(Self::Path),
            "host" | "subdomain" => Ok(Self::Host),
            other => Err(format!("unknown routing strategy '{other}'")),
        }
    }
}

/// Router settings.
#[derive(Debug, Clone)]
pub struct RoutingConfig {
    /// Path that triggers cookie-backed assignment. No trailing slash.
    pub entry_path: String,
    /// Enabled strategies. Order does not matter; host always runs first.
    pub strategies: Vec<Strategy>,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            entry_path: DEFAULT_ENTRY_PATH.to_owned(),
            strategies: vec![Strategy::Host, Strategy::Path],
        }
    }
}

/// The parts of an inbound request the router looks at.
#[derive(Debug, Clone, Copy)]
pub struct RouteRequest<'a> {
    /// `Host` header (or URI authority), possibly with a port.
    pub host: Option<&'a str>,
    /// Request path, without query string.
    pub path: &'a str,
}

/// What to do with a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteOutcome {
    /// Serve the request as-is.
    PassThrough,
    /// Serve `path` instead of the requested path.
    Rewrite {
        path: String,
        variant: Variant,
        strategy: Strategy,
        /// Present for path-based rewrites only.
        assignment: Option<AssignmentDecision>,
    },
}

impl RouteOutcome {
    /// The internal path to serve, if the request is rewritten.
    #[must_use]
    pub fn rewritten_path(&self) -> Option<&str> {
        match self {
            Self::PassThrough => None,
            Self::Rewrite { path, .. } => Some(path),
        }
    }
}

/// Applies the enabled strategies to inbound requests.
#[derive(Debug, Clone)]
pub struct RequestRouter {
    engine: AssignmentEngine,
    aliases: HashMap<String, Variant>,
    entry_path: String,
    path_enabled: bool,
    host_enabled: bool,
}

impl RequestRouter {
    /// Build a router over a catalog.
    ///
    /// Subdomain aliases are derived from the catalog: variant `X` answers to
    /// `variant-x` and `x` (lower-cased).
    #[must_use]
    pub fn new(catalog: Arc<VariantCatalog>, config: &RoutingConfig) -> Self {
        let mut aliases = HashMap::new();
        for variant in catalog.variants() {
            let lower = variant.as_str().to_ascii_lowercase();
            aliases.insert(format!("variant-{lower}"), variant.clone());
            aliases.insert(lower, variant.clone());
        }

        let entry_path = config.entry_path.trim_end_matches('/').to_owned();

        Self {
            engine: AssignmentEngine::new(catalog),
            aliases,
            entry_path,
            path_enabled: config.strategies.contains(&Strategy::Path),
            host_enabled: config.strategies.contains(&Strategy::Host),
        }
    }

    /// The engine used for path-based assignment.
    #[must_use]
    pub fn engine(&self) -> &AssignmentEngine {
        &self.engine
    }

    /// The configured entry path.
    #[must_use]
    pub fn entry_path(&self) -> &str {
        &self.entry_path
    }

    /// Enabled strategies, in evaluation order.
    #[must_use]
    pub fn strategies(&self) -> Vec<Strategy> {
        let mut out = Vec::with_capacity(2);
        if self.host_enabled {
            out.push(Strategy::Host);
        }
        if self.path_enabled {
            out.push(Strategy::Path);
        }
        out
    }

    /// Internal page path for a variant.
    #[must_use]
    pub fn variant_path(&self, variant: &Variant) -> String {
        format!("{}/{variant}", self.entry_path)
    }

    /// Route using the thread-local RNG.
    pub fn route<J: CookieJar + ?Sized>(&self, req: RouteRequest<'_>, jar: &mut J) -> RouteOutcome {
        self.route_with(req, jar, &mut rand::rng())
    }

    /// Route with an explicit random source.
    pub fn route_with<J, R>(&self, req: RouteRequest<'_>, jar: &mut J, rng: &mut R) -> RouteOutcome
    where
        J: CookieJar + ?Sized,
        R: Rng + ?Sized,
    {
        if self.is_variant_page(req.path) {
            return RouteOutcome::PassThrough;
        }

        if self.host_enabled && !self.is_host_exempt(req.path) {
            if let Some(variant) = req.host.and_then(|h| self.variant_for_host(h)) {
                debug!(host = req.host, variant = %variant, "host-based rewrite");
                return RouteOutcome::Rewrite {
                    path: self.variant_path(variant),
                    variant: variant.clone(),
                    strategy: Strategy::Host,
                    assignment: None,
                };
            }
        }

        if self.path_enabled && self.is_entry_path(req.path) {
            let prior = jar.get_cookie(VARIANT_COOKIE_NAME);
            let decision = self.engine.resolve_with(prior.as_deref(), rng);

            if prior.as_deref() != Some(decision.variant.as_str()) {
                jar.set_cookie(Cookie::assignment(&decision.variant));
            }

            debug!(
                variant = %decision.variant,
                is_new = decision.is_new,
                "path-based rewrite"
            );
            return RouteOutcome::Rewrite {
                path: self.variant_path(&decision.variant),
                variant: decision.variant.clone(),
                strategy: Strategy::Path,
                assignment: Some(decision),
            };
        }

        RouteOutcome::PassThrough
    }

    /// Variant mapped to a host's leftmost label.
    ///
    /// Only hosts with at least three labels (`variant-a.example.com`) or a
    /// `localhost` suffix (`variant-a.localhost`) are considered, so a bare
    /// apex domain is never mistaken for an alias. Matching ignores case and
    /// any `:port` suffix.
    #[must_use]
    pub fn variant_for_host(&self, host: &str) -> Option<&Variant> {
        if host.starts_with('[') {
            return None;
        }
        let host = host.split(':').next().unwrap_or(host).to_ascii_lowercase();
        let labels: Vec<&str> = host.split('.').collect();

        let is_local = labels.len() >= 2 && labels.last() == Some(&"localhost");
        if !is_local && labels.len() < 3 {
            return None;
        }
        self.aliases.get(labels[0])
    }

    fn is_entry_path(&self, path: &str) -> bool {
        path.strip_suffix('/').unwrap_or(path) == self.entry_path
    }

    /// `true` when `path` is `{entry_path}/{known variant}`.
    fn is_variant_page(&self, path: &str) -> bool {
        self.variant_segment(path)
            .is_some_and(|seg| self.engine.catalog().is_valid(seg))
    }

    /// Anything beneath `{entry_path}/` is left for the page route to resolve
    /// (including unknown variants, which must 404), as are API routes and
    /// static assets.
    fn is_host_exempt(&self, path: &str) -> bool {
        if self.variant_segment(path).is_some() {
            return true;
        }
        if path == "/api" || path == "/favicon.ico" {
            return true;
        }
        if HOST_EXEMPT_PREFIXES.iter().any(|p| path.starts_with(p)) {
            return true;
        }
        path.rsplit('/')
            .next()
            .and_then(|last| last.rsplit_once('.'))
            .is_some_and(|(_, ext)| STATIC_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
    }

    fn variant_segment<'p>(&self, path: &'p str) -> Option<&'p str> {
        let rest = path.strip_prefix(self.entry_path.as_str())?.strip_prefix('/')?;
        let rest = rest.strip_suffix('/').unwrap_or(rest);
        (!rest.is_empty() && !rest.contains('/')).then_some(rest)
    }
}
