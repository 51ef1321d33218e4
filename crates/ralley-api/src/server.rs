//! HTTP server.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::info;

use crate::error::ApiError;
use crate::routes::create_router;
use crate::state::AppState;

/// Listener configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
}

impl ApiConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 4747,
        }
    }
}

/// The HTTP listener.
pub struct ApiServer {
    config: ApiConfig,
    state: Arc<AppState>,
}

impl ApiServer {
    pub fn new(config: ApiConfig, state: AppState) -> Self {
        Self {
            config,
            state: Arc::new(state),
        }
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.config.host, self.config.port)
    }

    /// Bind and serve until `shutdown` changes.
    pub async fn run(&self, shutdown: watch::Receiver<bool>) -> Result<(), ApiError> {
        let addr = self.addr();
        let addr: SocketAddr = addr
            .parse()
            .map_err(|e| ApiError::Internal(format!("Invalid listen address '{}': {}", addr, e)))?;
        let listener = TcpListener::bind(addr).await?;
        self.serve(listener, shutdown).await
    }

    /// Serve on an already bound listener until `shutdown` changes.
    pub async fn serve(
        &self,
        listener: TcpListener,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<(), ApiError> {
        let app = create_router(self.state.clone());

        info!("Queue listening on http://{}", listener.local_addr()?);
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.changed().await;
            })
            .await?;

        info!("HTTP listener stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use ralley_queue::{
        Dispatcher, FakeClock, Job, QueueConfig, QueueError, Scheduler, SharedJobStore,
    };

    struct NullDispatcher;

    #[async_trait]
    impl Dispatcher for NullDispatcher {
        async fn dispatch(&self, _job: &Job) -> Result<u16, QueueError> {
            Ok(200)
        }
    }

    fn state() -> AppState {
        AppState::new(Scheduler::new(
            QueueConfig::default(),
            SharedJobStore::default(),
            Arc::new(NullDispatcher),
            Arc::new(FakeClock::default()),
        ))
    }

    #[test]
    fn test_api_config_default() {
        let config = ApiConfig::default();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 4747);
    }

    #[test]
    fn test_server_addr() {
        let server = ApiServer::new(ApiConfig::new("0.0.0.0", 9000), state());
        assert_eq!(server.addr(), "0.0.0.0:9000");
    }

    #[tokio::test]
    async fn test_invalid_address() {
        let server = ApiServer::new(ApiConfig::new("not a host", 1), state());
        let (_tx, rx) = watch::channel(false);
        assert!(matches!(server.run(rx).await, Err(ApiError::Internal(_))));
    }

    #[tokio::test]
    async fn test_serve_stops_on_shutdown() {
        let server = ApiServer::new(ApiConfig::default(), state());
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let (tx, rx) = watch::channel(false);

        let handle = tokio::spawn(async move { server.serve(listener, rx).await });
        tx.send(true).unwrap();

        assert!(handle.await.unwrap().is_ok());
    }
}
