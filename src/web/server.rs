//! Web server bootstrap.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::net::TcpListener;

use crate::{FiledropError, Result};

use super::handlers::AppState;
use super::middleware::JwtState;
use super::router::{create_health_router, create_router, create_uploads_router};

/// Web server for the API.
pub struct WebServer {
    /// Server address.
    addr: SocketAddr,
    /// Application state.
    app_state: Arc<AppState>,
    /// JWT state.
    jwt_state: Arc<JwtState>,
    /// Local uploads directory, served when the local backend is active.
    uploads_dir: Option<PathBuf>,
}

impl WebServer {
    /// Create a new web server.
    pub fn new(
        host: &str,
        port: u16,
        app_state: AppState,
        jwt_secret: &str,
        uploads_dir: Option<PathBuf>,
    ) -> Result<Self> {
        let addr = format!("{host}:{port}")
            .parse()
            .map_err(|_| FiledropError::Config(format!("invalid server address {host}:{port}")))?;

        Ok(Self {
            addr,
            app_state: Arc::new(app_state),
            jwt_state: Arc::new(JwtState::new(jwt_secret)),
            uploads_dir,
        })
    }

    /// Get the server address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    fn build_router(&self) -> axum::Router {
        let mut router = create_router(self.app_state.clone(), self.jwt_state.clone())
            .merge(create_health_router());

        if let Some(dir) = &self.uploads_dir {
            router = router.merge(create_uploads_router(dir));
        }

        router
    }

    /// Run the web server.
    pub async fn run(self) -> std::io::Result<()> {
        let router = self.build_router();

        let listener = TcpListener::bind(self.addr).await?;
        let local_addr = listener.local_addr()?;

        tracing::info!("Web server listening on http://{}", local_addr);

        axum::serve(listener, router).await
    }

    /// Run the server in the background and return the actual bound address.
    ///
    /// This is useful for testing when binding to port 0.
    pub async fn run_with_addr(self) -> std::io::Result<SocketAddr> {
        let router = self.build_router();

        let listener = TcpListener::bind(self.addr).await?;
        let local_addr = listener.local_addr()?;

        tracing::info!("Web server listening on http://{}", local_addr);

        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, router).await {
                tracing::error!("Web server error: {}", e);
            }
        });

        Ok(local_addr)
    }
}
