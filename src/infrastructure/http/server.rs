//! axum router and server for the resolution API.
//!
//! - `GET /`: resolve (synchronous mode) or submit (queued mode)
//! - `GET /status?task-id=`: job descriptor (`&html=true` for the page)
//! - `GET /status/html?task-id=`: HTML status page
//! - `GET /health`

use anyhow::{Context, Result};
use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde::Deserialize;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::domain::errors::ResolutionError;
use crate::domain::models::RequestParams;
use crate::services::{GatewayError, GatewayResponse, RequestGateway};

#[derive(Debug, Deserialize)]
struct StatusQuery {
    #[serde(rename = "task-id", default)]
    task_id: Option<String>,
    /// `/status?task-id=..&html=true` is the same as `/status/html`
    #[serde(default)]
    html: bool,
}

/// Build the router over a gateway.
pub fn router(gateway: Arc<RequestGateway>) -> Router {
    Router::new()
        .route("/", get(resolve))
        .route("/status", get(status))
        .route("/status/html", get(status_html))
        .route("/health", get(health_check))
        .with_state(gateway)
        .layer(TraceLayer::new_for_http())
}

/// HTTP server bound to one address.
pub struct HttpServer {
    bind_address: SocketAddr,
    gateway: Arc<RequestGateway>,
}

impl HttpServer {
    pub fn new(bind_address: SocketAddr, gateway: Arc<RequestGateway>) -> Self {
        Self {
            bind_address,
            gateway,
        }
    }

    /// Serve until `shutdown` resolves, then drain open connections.
    pub async fn serve_with_shutdown<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind(self.bind_address)
            .await
            .with_context(|| format!("Failed to bind {}", self.bind_address))?;

        tracing::info!(
            address = %self.bind_address,
            mode = self.gateway.mode().as_str(),
            "tmt-web HTTP server listening"
        );

        axum::serve(listener, router(self.gateway))
            .with_graceful_shutdown(shutdown)
            .await
            .context("HTTP server failed")?;
        Ok(())
    }
}

// Handler functions

async fn health_check() -> &'static str {
    "ok"
}

async fn resolve(
    State(gateway): State<Arc<RequestGateway>>,
    Query(params): Query<RequestParams>,
) -> Result<Response, ApiError> {
    Ok(into_response(gateway.handle(params).await?))
}

async fn status(
    State(gateway): State<Arc<RequestGateway>>,
    Query(query): Query<StatusQuery>,
) -> Result<Response, ApiError> {
    Ok(into_response(
        gateway.status(query.task_id.as_deref(), query.html).await?,
    ))
}

async fn status_html(
    State(gateway): State<Arc<RequestGateway>>,
    Query(query): Query<StatusQuery>,
) -> Result<Response, ApiError> {
    Ok(into_response(
        gateway.status(query.task_id.as_deref(), true).await?,
    ))
}

fn into_response(response: GatewayResponse) -> Response {
    match response {
        GatewayResponse::Rendered {
            format,
            body: Some(body),
        } => ([(header::CONTENT_TYPE, format.content_type())], body).into_response(),
        GatewayResponse::Rendered { body: None, .. } => {
            (StatusCode::NOT_FOUND, Json(serde_json::Value::Null)).into_response()
        }
        GatewayResponse::Job(descriptor) => Json(descriptor).into_response(),
        GatewayResponse::StatusPage(page) => Html(page).into_response(),
    }
}

/// Gateway errors as plain-text HTTP responses.
struct ApiError(GatewayError);

impl From<GatewayError> for ApiError {
    fn from(err: GatewayError) -> Self {
        Self(err)
    }
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match &self.0 {
            GatewayError::Request(_) => StatusCode::BAD_REQUEST,
            GatewayError::UnknownJob(_) => StatusCode::NOT_FOUND,
            GatewayError::Resolution(ResolutionError::Fetch(_)) => StatusCode::BAD_GATEWAY,
            GatewayError::Resolution(_) | GatewayError::Queue(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self.0, "Request failed");
        } else {
            tracing::debug!(error = %self.0, "Request rejected");
        }
        (status, self.0.to_string()).into_response()
    }
}
