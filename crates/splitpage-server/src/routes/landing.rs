//! Landing page routes.
//!
//! Serves one page per catalog variant at `{entry_path}/{variant}` (the
//! target of every internal rewrite) and redirects `/` to the assignment entry path.
//! The markup is deliberately minimal: it identifies the variant and reports
//! a `page_view` (plus `variant_assigned` on the visit that drew it) to the
//! analytics collector without blocking render.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::get;
use axum::{Extension, Router};

use splitpage_core::catalog::Variant;
use splitpage_core::routing::Strategy;

use crate::error::AppError;
use crate::middleware::VariantContext;
use crate::state::AppState;

/// Build the landing page router for pages under `entry_path`.
///
/// Variant pages answer with and without a trailing slash, matching what the
/// routing middleware passes through.
pub fn router(entry_path: &str) -> Router<Arc<AppState>> {
    let page = format!("{entry_path}/{{variant}}");
    Router::new()
        .route("/", get(home))
        .route(&format!("{page}/"), get(variant_page))
        .route(&page, get(variant_page))
}

/// `/` hands visitors to the entry path, where assignment happens.
async fn home(State(state): State<Arc<AppState>>) -> Result<Response, AppError> {
    if !state.router.strategies().contains(&Strategy::Path) {
        return Err(AppError::NotFound("not found".to_owned()));
    }
    Ok(Redirect::temporary(state.router.entry_path()).into_response())
}

/// Render the page for a variant, or 404 for an identifier not in the catalog.
async fn variant_page(
    State(state): State<Arc<AppState>>,
    Path(variant): Path<String>,
    context: Option<Extension<VariantContext>>,
) -> Result<Html<String>, AppError> {
    let Some(variant) = state.catalog.get(&variant) else {
        return Err(AppError::NotFound(format!("unknown variant '{variant}'")));
    };

    let newly_assigned = context.is_some_and(|Extension(ctx)| ctx.newly_assigned());
    Ok(Html(render_page(variant, newly_assigned)))
}

/// Page markup for a variant.
///
/// Variant identifiers are restricted to `[A-Za-z0-9_-]` by the catalog, so
/// they are interpolated without escaping.
#[must_use]
pub fn render_page(variant: &Variant, newly_assigned: bool) -> String {
    let mut html = String::with_capacity(PAGE_HEAD.len() + PAGE_BODY.len() + 256);
    html.push_str(&PAGE_HEAD.replace("{{VARIANT}}", variant.as_str()));
    html.push_str(
        &PAGE_BODY
            .replace("{{VARIANT}}", variant.as_str())
            .replace("{{ASSIGNED}}", if newly_assigned { "true" } else { "false" }),
    );
    html
}

const PAGE_HEAD: &str = r#"<!DOCTYPE html>
<html lang="en"><head><meta charset="utf-8"/><meta name="viewport" content="width=device-width,initial-scale=1"/>
<title>Landing &mdash; variant {{VARIANT}}</title>
<style>
*,*::before,*::after{box-sizing:border-box;margin:0;padding:0}
body{font-family:-apple-system,BlinkMacSystemFont,'Segoe UI',sans-serif;background:#0f1412;color:#e8f0ea;line-height:1.6}
main{max-width:960px;margin:0 auto;padding:96px 24px;text-align:center}
h1{font-size:44px;font-weight:800;letter-spacing:-.02em;margin-bottom:16px}
p{color:#9fb3a6;font-size:18px;margin-bottom:32px}
form{display:flex;gap:8px;justify-content:center;flex-wrap:wrap}
input{padding:12px 16px;border-radius:8px;border:1px solid #2c3a33;background:#16201b;color:inherit;min-width:260px}
button{padding:12px 28px;border-radius:8px;border:none;background:#3ddc84;color:#0f1412;font-weight:700;cursor:pointer}
</style></head>
"#;

const PAGE_BODY: &str = r#"<body data-variant="{{VARIANT}}">
<main>
<h1>Variant {{VARIANT}}</h1>
<p>Join the waitlist and be first to know when we launch.</p>
<form id="signup"><input type="email" name="email" placeholder="you@example.com" required/><button type="submit" data-cta="hero">Notify me</button></form>
</main>
<script>
(function(){
  var variant='{{VARIANT}}';
  function track(event,properties){
    var body={event:event,variant:variant,timestamp:Date.now(),properties:properties||{}};
    try{fetch('/api/analytics',{method:'POST',headers:{'Content-Type':'application/json'},body:JSON.stringify(body),keepalive:true}).catch(function(){});}catch(e){}
  }
  if({{ASSIGNED}}){track('variant_assigned',{variant:variant});}
  track('page_view',{variant:variant,path:location.pathname});
  document.querySelectorAll('[data-cta]').forEach(function(el){
    el.addEventListener('click',function(){track('cta_click',{variant:variant,location:el.getAttribute('data-cta')});});
  });
  document.getElementById('signup').addEventListener('submit',function(e){
    e.preventDefault();
    var email=new FormData(e.target).get('email')||'';
    track('email_submit',{variant:variant,email_domain:String(email).split('@')[1]});
  });
})();
</script>
</body></html>
"#;
