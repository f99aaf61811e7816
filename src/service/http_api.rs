use super::{ErrorSink, Service, ServiceError};
use crate::error::HttpApiError;
use axum::{response::IntoResponse, routing::get, Json, Router};
use parking_lot::Mutex;
use serde_json::json;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

const SERVICE_NAME: &str = "HTTP API";

/// Base HTTP API server managed by the supervisor
pub struct HttpApiService {
    port: String,
    shutdown: CancellationToken,
    finished: CancellationToken,
    started: AtomicBool,
    local_addr: Mutex<Option<SocketAddr>>,
}

impl HttpApiService {
    /// Create a service listening on `port` once started
    pub fn new<S: Into<String>>(port: S) -> Self {
        Self {
            port: port.into(),
            shutdown: CancellationToken::new(),
            finished: CancellationToken::new(),
            started: AtomicBool::new(false),
            local_addr: Mutex::new(None),
        }
    }

    /// Address the server is bound to, once listening
    pub fn local_addr(&self) -> Option<SocketAddr> {
        *self.local_addr.lock()
    }

    async fn serve(&self) -> Result<(), HttpApiError> {
        let address = format!("0.0.0.0:{}", self.port);

        let listener =
            TcpListener::bind(&address)
                .await
                .map_err(|e| HttpApiError::BindFailed {
                    address: address.clone(),
                    source: e,
                })?;

        let bound = listener.local_addr().ok();
        *self.local_addr.lock() = bound;
        info!(
            "serving {:?} on {}",
            SERVICE_NAME,
            bound.map(|a| a.to_string()).unwrap_or(address)
        );

        let shutdown = self.shutdown.clone();
        axum::serve(listener, router())
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await
            .map_err(|e| HttpApiError::ServeFailed { source: e })
    }
}

#[async_trait::async_trait]
impl Service for HttpApiService {
    fn name(&self) -> &str {
        SERVICE_NAME
    }

    async fn start(&self, errors: ErrorSink) {
        self.started.store(true, Ordering::SeqCst);

        if self.shutdown.is_cancelled() {
            debug!("{} stopped before it started serving", SERVICE_NAME);
            self.finished.cancel();
            return;
        }

        let result = self.serve().await;
        self.finished.cancel();

        if let Err(e) = result {
            errors.report(ServiceError::new(SERVICE_NAME, e));
        }
    }

    async fn stop(&self, run_context: CancellationToken) -> ServiceError {
        self.shutdown.cancel();

        if !self.started.load(Ordering::SeqCst) {
            return ServiceError::none(SERVICE_NAME);
        }

        tokio::select! {
            _ = self.finished.cancelled() => ServiceError::none(SERVICE_NAME),
            _ = run_context.cancelled() => {
                ServiceError::new(SERVICE_NAME, HttpApiError::ShutdownInterrupted)
            }
        }
    }
}

/// Routes served by the HTTP API
pub fn router() -> Router {
    Router::new()
        .route("/hello", get(hello_handler))
        .route("/health", get(health_handler))
        .layer(TraceLayer::new_for_http())
}

async fn hello_handler() -> &'static str {
    "Hello, world!"
}

async fn health_handler() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": SERVICE_NAME,
    }))
}
