//! End-to-end tests for variant routing.
//!
//! Each test drives the full Axum app in-process with `oneshot`, so the
//! routing middleware, the inner router, and the landing handlers all run
//! exactly as they do behind a listener.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::collections::HashSet;
use std::sync::Arc;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::header::{COOKIE, HOST, LOCATION, SET_COOKIE};
use axum::http::{Request, Response, StatusCode};
use tower::ServiceExt;

use splitpage_core::catalog::VariantCatalog;
use splitpage_core::routing::{RoutingConfig, Strategy};
use splitpage_core::sink::AnalyticsPipeline;
use splitpage_server::app::build_router;
use splitpage_server::state::AppState;

fn app(strategies: Vec<Strategy>) -> Router {
    let routing = RoutingConfig {
        strategies,
        ..Default::default()
    };
    let state = AppState::new(
        Arc::new(VariantCatalog::default()),
        &routing,
        Arc::new(AnalyticsPipeline::new()),
    );
    build_router(Arc::new(state))
}

fn get(path: &str) -> axum::http::request::Builder {
    Request::builder().method("GET").uri(path)
}

async fn send(app: Router, req: axum::http::request::Builder) -> Response<Body> {
    app.oneshot(req.body(Body::empty()).unwrap()).await.unwrap()
}

async fn body_text(resp: Response<Body>) -> String {
    let bytes = to_bytes(resp.into_body(), 1024 * 1024).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn set_cookies(resp: &Response<Body>) -> Vec<String> {
    resp.headers()
        .get_all(SET_COOKIE)
        .iter()
        .map(|v| v.to_str().unwrap().to_owned())
        .collect()
}

/// Variant id carried by a rendered page's `data-variant` attribute.
fn page_variant(html: &str) -> Option<String> {
    let start = html.find("data-variant=\"")? + "data-variant=\"".len();
    let end = html[start..].find('"')? + start;
    Some(html[start..end].to_owned())
}

// ── Path strategy ────────────────────────────────────────────────────

#[tokio::test]
async fn first_visit_is_assigned_and_cookied() {
    let resp = send(app(vec![Strategy::Path]), get("/landing")).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let cookies = set_cookies(&resp);
    assert_eq!(cookies.len(), 1);
    let cookie = &cookies[0];
    assert!(cookie.starts_with("ab_variant="));
    assert!(cookie.contains("Max-Age=2592000"));
    assert!(cookie.contains("Path=/"));
    assert!(cookie.contains("SameSite=Lax"));

    let assigned = cookie
        .trim_start_matches("ab_variant=")
        .split(';')
        .next()
        .unwrap()
        .to_owned();
    assert!(["A", "B", "C", "D"].contains(&assigned.as_str()));

    let html = body_text(resp).await;
    assert_eq!(page_variant(&html).as_deref(), Some(assigned.as_str()));
    assert!(html.contains("if(true)"), "first visit reports variant_assigned");
}

#[tokio::test]
async fn returning_visitor_keeps_variant_without_new_cookie() {
    let resp = send(
        app(vec![Strategy::Path]),
        get("/landing").header(COOKIE, "theme=dark; ab_variant=C"),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(set_cookies(&resp).is_empty());

    let html = body_text(resp).await;
    assert_eq!(page_variant(&html).as_deref(), Some("C"));
    assert!(html.contains("if(false)"));
}

#[tokio::test]
async fn invalid_cookie_is_reassigned() {
    let resp = send(
        app(vec![Strategy::Path]),
        get("/landing").header(COOKIE, "ab_variant=Z"),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);

    let cookies = set_cookies(&resp);
    assert_eq!(cookies.len(), 1);
    assert!(!cookies[0].starts_with("ab_variant=Z"));
}

#[tokio::test]
async fn sticky_across_many_requests() {
    let app = app(vec![Strategy::Path]);
    for _ in 0..20 {
        let resp = send(app.clone(), get("/landing").header(COOKIE, "ab_variant=B")).await;
        assert!(set_cookies(&resp).is_empty());
        assert_eq!(page_variant(&body_text(resp).await).as_deref(), Some("B"));
    }
}

#[tokio::test]
async fn fresh_visitors_reach_every_variant() {
    let app = app(vec![Strategy::Path]);
    let mut seen = HashSet::new();
    for _ in 0..200 {
        let resp = send(app.clone(), get("/landing")).await;
        seen.insert(page_variant(&body_text(resp).await).unwrap());
    }
    assert_eq!(seen.len(), 4, "saw only {seen:?}");
}

#[tokio::test]
async fn query_string_survives_rewrite() {
    let resp = send(
        app(vec![Strategy::Path]),
        get("/landing?utm_source=ad&ref=x").header(COOKIE, "ab_variant=D"),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(page_variant(&body_text(resp).await).as_deref(), Some("D"));
}

#[tokio::test]
async fn trailing_slash_entry_path_is_routed() {
    let resp = send(
        app(vec![Strategy::Path]),
        get("/landing/").header(COOKIE, "ab_variant=A"),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(page_variant(&body_text(resp).await).as_deref(), Some("A"));
}

#[tokio::test]
async fn variant_page_requested_directly_is_not_rerouted() {
    let resp = send(app(vec![Strategy::Path]), get("/landing/B")).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(set_cookies(&resp).is_empty());
    assert_eq!(page_variant(&body_text(resp).await).as_deref(), Some("B"));
}

#[tokio::test]
async fn variant_page_with_trailing_slash_is_served() {
    let resp = send(
        app(vec![Strategy::Path]),
        get("/landing/B/").header(COOKIE, "ab_variant=B"),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(set_cookies(&resp).is_empty());
    assert_eq!(page_variant(&body_text(resp).await).as_deref(), Some("B"));
}

#[tokio::test]
async fn custom_entry_path_serves_pages_under_it() {
    let routing = RoutingConfig {
        entry_path: "/promo".to_owned(),
        strategies: vec![Strategy::Path],
    };
    let state = AppState::new(
        Arc::new(VariantCatalog::default()),
        &routing,
        Arc::new(AnalyticsPipeline::new()),
    );
    let app = build_router(Arc::new(state));

    let resp = send(app.clone(), get("/promo").header(COOKIE, "ab_variant=D")).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(page_variant(&body_text(resp).await).as_deref(), Some("D"));

    let resp = send(app.clone(), get("/promo/C/")).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(page_variant(&body_text(resp).await).as_deref(), Some("C"));

    let resp = send(app, get("/landing/C")).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unknown_variant_page_is_404() {
    let resp = send(app(vec![Strategy::Path]), get("/landing/X")).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert!(set_cookies(&resp).is_empty());
    assert!(body_text(resp).await.contains("\"error\""));
}

#[tokio::test]
async fn root_redirects_to_entry_path() {
    let resp = send(app(vec![Strategy::Path]), get("/")).await;
    assert_eq!(resp.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(resp.headers().get(LOCATION).unwrap(), "/landing");
}

// ── Host strategy ────────────────────────────────────────────────────

#[tokio::test]
async fn variant_subdomain_serves_mapped_page_without_cookie() {
    let resp = send(
        app(vec![Strategy::Host, Strategy::Path]),
        get("/").header(HOST, "variant-b.example.com"),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(set_cookies(&resp).is_empty());
    assert_eq!(page_variant(&body_text(resp).await).as_deref(), Some("B"));
}

#[tokio::test]
async fn short_alias_on_localhost_with_port() {
    let resp = send(
        app(vec![Strategy::Host]),
        get("/pricing").header(HOST, "C.localhost:3000"),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(page_variant(&body_text(resp).await).as_deref(), Some("C"));
}

#[tokio::test]
async fn host_wins_over_cookie_on_entry_path() {
    let resp = send(
        app(vec![Strategy::Host, Strategy::Path]),
        get("/landing")
            .header(HOST, "variant-d.example.com")
            .header(COOKIE, "ab_variant=A"),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(set_cookies(&resp).is_empty());
    assert_eq!(page_variant(&body_text(resp).await).as_deref(), Some("D"));
}

#[tokio::test]
async fn variant_host_does_not_swallow_api_routes() {
    let resp = send(
        app(vec![Strategy::Host]),
        get("/api/health").header(HOST, "variant-a.example.com"),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(body_text(resp).await.contains("\"status\":\"ok\""));
}

#[tokio::test]
async fn unrecognized_host_and_path_pass_through() {
    let resp = send(
        app(vec![Strategy::Host, Strategy::Path]),
        get("/pricing").header(HOST, "www.example.com"),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert!(set_cookies(&resp).is_empty());
}

#[tokio::test]
async fn apex_domain_is_not_an_alias() {
    let resp = send(
        app(vec![Strategy::Host]),
        get("/pricing").header(HOST, "b.com"),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

// ── Strategy toggles ─────────────────────────────────────────────────

#[tokio::test]
async fn path_strategy_disabled_leaves_entry_alone() {
    let app = app(vec![Strategy::Host]);

    let resp = send(app.clone(), get("/landing")).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert!(set_cookies(&resp).is_empty());

    let resp = send(app, get("/")).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn host_strategy_disabled_ignores_subdomain() {
    let resp = send(
        app(vec![Strategy::Path]),
        get("/pricing").header(HOST, "variant-a.example.com"),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

// ── Response hardening & health ──────────────────────────────────────

#[tokio::test]
async fn responses_are_not_cached() {
    let resp = send(app(vec![Strategy::Path]), get("/landing")).await;
    assert_eq!(resp.headers().get("cache-control").unwrap(), "no-store");
    assert_eq!(
        resp.headers().get("x-content-type-options").unwrap(),
        "nosniff"
    );
}

#[tokio::test]
async fn health_reports_catalog_and_strategies() {
    let resp = send(app(vec![Strategy::Host, Strategy::Path]), get("/api/health")).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let json: serde_json::Value = serde_json::from_str(&body_text(resp).await).unwrap();
    assert_eq!(json["status"], "ok");
    assert_eq!(json["entry_path"], "/landing");
    assert_eq!(json["variants"].as_array().unwrap().len(), 4);
    assert_eq!(json["variants"][0]["id"], "A");
    assert_eq!(json["variants"][0]["weight"], 25);
    assert_eq!(json["strategies"], serde_json::json!(["host", "path"]));
}
