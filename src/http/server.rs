//! HTTP server setup and request dispatch.
//!
//! # Responsibilities
//! - Create the Axum router with a single fallback handler
//! - Wire up middleware (tracing, timeout, request ID)
//! - Translate resolutions into responses: contexts through the
//!   renderer seam, redirects with Location headers, not-found through
//!   the designated error template
//! - Stamp RSS responses with their content type
//!
//! # Design Decisions
//! - The render layer is an external collaborator behind [`Renderer`];
//!   the built-in [`DirectiveRenderer`] emits the request context as
//!   JSON for preview serving and tests
//! - Protocol detection trusts `x-forwarded-proto`: TLS terminates
//!   upstream, never here

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderValue, Method, Request, StatusCode},
    response::{IntoResponse, Response},
    Json, Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::schema::SiteConfig;
use crate::http::request::RequestIdLayer;
use crate::index::resource::Resource;
use crate::routing::context::RequestContext;
use crate::routing::table::Resolution;
use crate::Site;

/// The render layer seam. Given a request context (and the matched
/// resource for entries), produce the response body.
pub trait Renderer: Send + Sync {
    fn render(&self, context: &RequestContext, resource: Option<&Resource>) -> Response;

    /// The not-found response, rendered with the designated template.
    fn render_not_found(&self) -> Response {
        (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({ "template": "error-404" })),
        )
            .into_response()
    }
}

/// Renders the resolved directive itself as JSON. Stands in for a real
/// theme layer during preview serving and in tests.
pub struct DirectiveRenderer;

impl Renderer for DirectiveRenderer {
    fn render(&self, context: &RequestContext, resource: Option<&Resource>) -> Response {
        Json(serde_json::json!({
            "context": context,
            "resource": resource,
        }))
        .into_response()
    }
}

/// Application state injected into the handler.
#[derive(Clone)]
pub struct AppState {
    pub site: Arc<Site>,
    pub renderer: Arc<dyn Renderer>,
    pub default_host: String,
}

/// HTTP server for the site.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    /// Create a new HTTP server for a site.
    pub fn new(config: &SiteConfig, site: Arc<Site>, renderer: Arc<dyn Renderer>) -> Self {
        let default_host = url::Url::parse(&config.site.url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
            .unwrap_or_else(|| "localhost".to_string());

        let state = AppState {
            site,
            renderer,
            default_host,
        };

        let router = Router::new()
            .fallback(site_handler)
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(
                config.server.request_timeout_secs,
            )))
            .layer(RequestIdLayer)
            .layer(TraceLayer::new_for_http());

        Self { router }
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let app = self.router.into_make_service();
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Main site handler: resolve the path and translate the outcome.
async fn site_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string();

    let method = request.method().clone();
    if method != Method::GET && method != Method::HEAD {
        return (
            StatusCode::METHOD_NOT_ALLOWED,
            [(header::ALLOW, "GET, HEAD")],
        )
            .into_response();
    }

    let path = request.uri().path().to_string();
    let host = request
        .headers()
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or(&state.default_host)
        .to_string();
    let secure = request
        .headers()
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .map(|proto| proto.eq_ignore_ascii_case("https"))
        .unwrap_or(false);

    tracing::debug!(
        request_id = %request_id,
        method = %method,
        path = %path,
        "resolving request"
    );

    match state.site.resolve(&path, &host, secure) {
        Resolution::Redirect { status, location } => {
            let status =
                StatusCode::from_u16(status).unwrap_or(StatusCode::MOVED_PERMANENTLY);
            match HeaderValue::from_str(&location) {
                Ok(value) => Response::builder()
                    .status(status)
                    .header(header::LOCATION, value)
                    .body(Body::empty())
                    .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response()),
                Err(_) => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
            }
        }

        Resolution::NotFound => {
            tracing::debug!(request_id = %request_id, path = %path, "no route matched");
            state.renderer.render_not_found()
        }

        Resolution::Context { context, resource } => {
            let mut response = state.renderer.render(&context, resource.as_ref());
            if let Some(content_type) = &context.content_type {
                if let Ok(value) = HeaderValue::from_str(content_type) {
                    response.headers_mut().insert(header::CONTENT_TYPE, value);
                }
            }
            response
        }
    }
}
