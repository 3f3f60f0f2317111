use std::future::Future;
use std::net::SocketAddr;
use std::thread::JoinHandle;

use axum::body::Bytes;
use axum::http::{header, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use cgv_core::error::{codes, AppError};
use serde::{Deserialize, Serialize};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::canned::canned_response;

pub const SERVICE_NAME: &str = "IGAL Mock Backend";

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub timestamp: String,
}

#[derive(Debug, Deserialize)]
struct ChatBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    session_id: String,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub response: String,
    pub session_id: String,
    pub timestamp: String,
    pub mock: bool,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    details: &'static str,
}

fn now_timestamp() -> String {
    let now = OffsetDateTime::now_utc();
    now.format(&Rfc3339)
        .unwrap_or_else(|_| now.unix_timestamp().to_string())
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: SERVICE_NAME,
        timestamp: now_timestamp(),
    })
}

async fn chat(body: Bytes) -> Response {
    let req: ChatBody = match serde_json::from_slice(&body) {
        Ok(req) => req,
        Err(e) => {
            tracing::warn!(error = %e, "undecodable chat request");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorBody {
                    error: e.to_string(),
                    details: "Mock backend error",
                }),
            )
                .into_response();
        }
    };

    let response = canned_response(&req.message);
    tracing::info!(message = %req.message, session_id = %req.session_id, "chat request");

    Json(ChatResponse {
        response,
        session_id: req.session_id,
        timestamp: now_timestamp(),
        mock: true,
    })
    .into_response()
}

/// Routes of the mock backend. Both the widget path and the legacy chat path are served, each
/// with and without the trailing slash.
pub fn router() -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/health/", get(health))
        .route("/api/widget", post(chat))
        .route("/api/widget/", post(chat))
        .route("/api/chat/widget", post(chat))
        .route("/api/chat/widget/", post(chat))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
                .allow_headers([header::CONTENT_TYPE]),
        )
}

fn server_error(message: &str, err: impl std::fmt::Display) -> AppError {
    AppError::new(codes::STUB_SERVER_FAILED, message).with_details(err.to_string())
}

pub async fn bind(addr: &str) -> Result<TcpListener, AppError> {
    TcpListener::bind(addr)
        .await
        .map_err(|e| server_error("Failed to bind stub listener", format!("addr={addr}; err={e}")))
}

pub async fn serve(listener: TcpListener) -> Result<(), AppError> {
    serve_with_shutdown(listener, std::future::pending::<()>()).await
}

pub async fn serve_with_shutdown<F>(listener: TcpListener, shutdown: F) -> Result<(), AppError>
where
    F: Future<Output = ()> + Send + 'static,
{
    if let Ok(addr) = listener.local_addr() {
        tracing::info!(%addr, "mock backend listening");
    }
    axum::serve(listener, router())
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| server_error("Mock backend server failed", e))
}

/// A stub served from its own thread and runtime, for callers that are not async.
///
/// Dropping the handle stops the server and joins the thread.
pub struct BackgroundStub {
    addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    thread: Option<JoinHandle<Result<(), AppError>>>,
}

impl BackgroundStub {
    pub fn start(addr: &str) -> Result<Self, AppError> {
        let std_listener = std::net::TcpListener::bind(addr)
            .map_err(|e| server_error("Failed to bind stub listener", format!("addr={addr}; err={e}")))?;
        std_listener
            .set_nonblocking(true)
            .map_err(|e| server_error("Failed to configure stub listener", e))?;
        let local = std_listener
            .local_addr()
            .map_err(|e| server_error("Failed to read stub address", e))?;

        let (tx, rx) = oneshot::channel::<()>();
        let thread = std::thread::Builder::new()
            .name("cgv-stub".to_string())
            .spawn(move || -> Result<(), AppError> {
                let rt = tokio::runtime::Builder::new_multi_thread()
                    .worker_threads(1)
                    .enable_all()
                    .build()
                    .map_err(|e| server_error("Failed to start stub runtime", e))?;
                rt.block_on(async move {
                    let listener = TcpListener::from_std(std_listener)
                        .map_err(|e| server_error("Failed to adopt stub listener", e))?;
                    serve_with_shutdown(listener, async move {
                        let _ = rx.await;
                    })
                    .await
                })
            })
            .map_err(|e| server_error("Failed to spawn stub thread", e))?;

        Ok(Self {
            addr: local,
            shutdown: Some(tx),
            thread: Some(thread),
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Stop the server and surface any error it ran into.
    pub fn stop(mut self) -> Result<(), AppError> {
        self.shutdown_and_join()
    }

    fn shutdown_and_join(&mut self) -> Result<(), AppError> {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        match self.thread.take() {
            Some(t) => t
                .join()
                .map_err(|_| AppError::new(codes::STUB_SERVER_FAILED, "Stub thread panicked"))?,
            None => Ok(()),
        }
    }
}

impl Drop for BackgroundStub {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown_and_join() {
            tracing::warn!(error = %e, "mock backend stopped with an error");
        }
    }
}

/// Resolves on Ctrl+C (and SIGTERM on unix).
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutdown signal received");
}
