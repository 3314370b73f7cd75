//! Preview server implementation.

use std::future::Future;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    extract::State,
    handler::Handler,
    http::{StatusCode, Uri},
    response::{Html, IntoResponse, Response},
    Router,
};
use tokio::net::TcpListener;
use tower_http::services::ServeDir;

use crate::listing::DirectoryListing;

/// Configuration for the preview server.
#[derive(Debug, Clone)]
pub struct PreviewConfig {
    /// Directory to serve
    pub root: PathBuf,

    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("_site"),
            host: "127.0.0.1".to_string(),
            port: 8000,
        }
    }
}

/// Errors that can occur with the server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Directory not found: {0}. Run 'quire build' first.")]
    DirectoryNotFound(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Failed to bind to {0}: {1}")]
    BindError(SocketAddr, String),

    #[error("Server error: {0}")]
    ServeError(String),

    #[error("Failed to load directory listing template: {0}")]
    TemplateError(#[from] minijinja::Error),
}

/// Static file server for a built site.
///
/// The served directory is passed explicitly; the process working directory
/// is never changed.
pub struct PreviewServer {
    config: PreviewConfig,
}

impl PreviewServer {
    /// Create a new preview server.
    pub fn new(config: PreviewConfig) -> Self {
        Self { config }
    }

    /// The configuration this server was created with.
    pub fn config(&self) -> &PreviewConfig {
        &self.config
    }

    /// Socket address from the configured host and port.
    pub fn addr(&self) -> Result<SocketAddr, ServerError> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        addr.parse().map_err(|_| ServerError::InvalidAddress(addr))
    }

    /// Bind the listening socket.
    pub async fn bind(&self) -> Result<TcpListener, ServerError> {
        let addr = self.addr()?;

        TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::BindError(addr, e.to_string()))
    }

    /// Build the router: files from the root, listings for directories
    /// without an `index.html`.
    pub fn router(&self) -> Result<Router, ServerError> {
        let listing = Arc::new(DirectoryListing::new(&self.config.root)?);
        let files =
            ServeDir::new(&self.config.root).fallback(directory_listing.with_state(listing));

        Ok(Router::new().fallback_service(files))
    }

    /// Bind and serve until Ctrl+C.
    pub async fn start(&self) -> Result<(), ServerError> {
        if !self.config.root.is_dir() {
            return Err(ServerError::DirectoryNotFound(
                self.config.root.display().to_string(),
            ));
        }

        let listener = self.bind().await?;
        self.serve_with_shutdown(listener, shutdown_signal()).await
    }

    /// Serve on an already bound listener until `signal` completes.
    pub async fn serve_with_shutdown<F>(
        &self,
        listener: TcpListener,
        signal: F,
    ) -> Result<(), ServerError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let app = self.router()?;

        if let Ok(addr) = listener.local_addr() {
            tracing::info!("Serving {} at http://{}", self.config.root.display(), addr);
        }

        axum::serve(listener, app)
            .with_graceful_shutdown(signal)
            .await
            .map_err(|e| ServerError::ServeError(e.to_string()))
    }
}

/// Resolve when Ctrl+C is received.
async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Shutting down preview server"),
        Err(e) => {
            tracing::warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    }
}

/// Fallback for paths `ServeDir` could not answer.
async fn directory_listing(State(listing): State<Arc<DirectoryListing>>, uri: Uri) -> Response {
    match listing.render(uri.path()) {
        Ok(Some(html)) => Html(html).into_response(),
        Ok(None) => (StatusCode::NOT_FOUND, "Not Found").into_response(),
        Err(e) => {
            tracing::warn!("Failed to list {}: {}", uri.path(), e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
        }
    }
}
