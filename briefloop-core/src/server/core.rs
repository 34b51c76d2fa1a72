//! HTTP server integration for briefloop

use crate::models::ControlLevel;
use crate::server::api::create_api_routes;
use crate::workflow::engine::WorkflowEngine;
use crate::workflow::quick::QuickBriefEngine;
use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;

/// Serves the workflow and quick brief API until interrupted
pub struct BriefloopServer {
    host: String,
    port: u16,
    engine: Arc<WorkflowEngine>,
    quick_briefs: Arc<QuickBriefEngine>,
    default_control_level: ControlLevel,
}

impl BriefloopServer {
    pub fn new(
        host: String,
        port: u16,
        engine: Arc<WorkflowEngine>,
        quick_briefs: Arc<QuickBriefEngine>,
    ) -> Self {
        Self {
            host,
            port,
            engine,
            quick_briefs,
            default_control_level: ControlLevel::default(),
        }
    }

    /// Control level for workflows created without one
    pub fn with_default_control_level(mut self, level: ControlLevel) -> Self {
        self.default_control_level = level;
        self
    }

    pub fn address(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("Invalid server address {}:{}", self.host, self.port))
    }

    /// Start the server, shutting down gracefully on Ctrl-C
    pub async fn start(self) -> Result<()> {
        let address = self.address()?;
        let routes = create_api_routes(
            Arc::clone(&self.engine),
            Arc::clone(&self.quick_briefs),
            self.default_control_level,
        );

        let (bound, server) = warp::serve(routes)
            .try_bind_with_graceful_shutdown(address, async {
                // An error here means no signal handler; run until killed instead
                if tokio::signal::ctrl_c().await.is_err() {
                    std::future::pending::<()>().await;
                }
            })
            .with_context(|| format!("Failed to bind to {}", address))?;

        tracing::info!(address = %bound, "HTTP API listening");
        server.await;
        tracing::info!("Server shut down");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::generation::{GenerationRequest, GenerationService};
    use crate::workflow::persistence::MemoryStore;
    use crate::models::StageOutput;
    use async_trait::async_trait;

    struct Unused;

    #[async_trait]
    impl GenerationService for Unused {
        async fn generate(&self, _request: &GenerationRequest) -> anyhow::Result<StageOutput> {
            anyhow::bail!("not used")
        }
    }

    fn server(host: &str) -> BriefloopServer {
        let store = Arc::new(MemoryStore::new());
        let engine = Arc::new(WorkflowEngine::new(store.clone(), Arc::new(Unused)));
        let quick_briefs = Arc::new(QuickBriefEngine::new(store, Arc::new(Unused)));
        BriefloopServer::new(host.to_string(), 8080, engine, quick_briefs)
            .with_default_control_level(ControlLevel::Autopilot)
    }

    #[test]
    fn test_address_parsing() {
        assert_eq!(
            server("127.0.0.1").address().unwrap(),
            "127.0.0.1:8080".parse::<SocketAddr>().unwrap()
        );
        assert!(server("not a host").address().is_err());
        assert_eq!(server("127.0.0.1").default_control_level, ControlLevel::Autopilot);
    }
}
