use std::sync::Arc;

use axum::http::HeaderValue;
use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::{info, warn};

use plaint_core::config::{FlowConfig, GatewayConfig};
use plaint_core::traits::ComplaintStore;
use plaint_flow::ComplaintFlow;

use crate::registry::TaskRegistry;
use crate::routes;
use crate::state::AppState;

/// HTTP gateway server built on axum.
pub struct GatewayServer {
    config: GatewayConfig,
    state: Arc<AppState>,
}

impl GatewayServer {
    pub fn new(
        config: GatewayConfig,
        flow: Arc<ComplaintFlow>,
        store: Arc<dyn ComplaintStore>,
        settings: FlowConfig,
    ) -> Self {
        let state = Arc::new(AppState {
            registry: Arc::new(TaskRegistry::new()),
            flow,
            store,
            settings,
        });
        Self { config, state }
    }

    pub fn registry(&self) -> Arc<TaskRegistry> {
        self.state.registry.clone()
    }

    pub fn router(&self) -> Router {
        router(self.state.clone(), &self.config.allowed_origins)
    }

    /// Run the gateway server until the cancellation token is triggered.
    pub async fn run(&self, shutdown: CancellationToken) -> anyhow::Result<()> {
        let app = self.router();

        let listener = TcpListener::bind(&self.config.bind).await?;
        info!(bind = %self.config.bind, "Gateway listening");

        axum::serve(listener, app)
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await?;

        info!("Gateway shut down");
        Ok(())
    }
}

fn cors(allowed_origins: &[String]) -> CorsLayer {
    if allowed_origins.is_empty() {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Build the API router over the given state.
pub fn router(state: Arc<AppState>, allowed_origins: &[String]) -> Router {
    Router::new()
        .route("/api/health", get(routes::health))
        .route("/api/chat", post(routes::chat))
        .route("/api/chat/stream/{task_id}", get(routes::chat_stream))
        .route("/api/complaints/{id}", get(routes::get_complaint))
        .layer(cors(allowed_origins))
        .with_state(state)
}
