//! HTTP endpoint for on-demand reports.

use crate::state::SharedState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use balance_engine::BalanceService;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatRequest {
    pub network: String,
}

/// Rendered report. An empty `text` means there is nothing to report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatReply {
    pub text: String,
    pub network: String,
}

pub struct RpcState {
    pub service: Arc<BalanceService>,
    pub app_state: SharedState,
}

type RpcResult = Result<Json<StatReply>, (StatusCode, String)>;

pub fn create_router(state: Arc<RpcState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/stat", post(stat_handler))
        .route("/balance", post(balance_handler))
        .route("/health", get(health_handler))
        .layer(cors)
        .with_state(state)
}

async fn health_handler() -> &'static str {
    "OK"
}

async fn stat_handler(State(state): State<Arc<RpcState>>, Json(req): Json<StatRequest>) -> RpcResult {
    state.app_state.stats.record_rpc_request();
    let text = state.service.stat(&req.network).await.map_err(|e| {
        error!(network = %req.network, error = %e, "Stat request failed");
        (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    })?;
    Ok(Json(StatReply {
        text,
        network: req.network,
    }))
}

async fn balance_handler(
    State(state): State<Arc<RpcState>>,
    Json(req): Json<StatRequest>,
) -> RpcResult {
    state.app_state.stats.record_rpc_request();
    let text = state.service.balances(&req.network).await.map_err(|e| {
        error!(network = %req.network, error = %e, "Balance request failed");
        (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    })?;
    Ok(Json(StatReply {
        text,
        network: req.network,
    }))
}

/// Bind the endpoint and serve it in the background.
pub async fn start_rpc_server(
    state: Arc<RpcState>,
    port: u16,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let app = create_router(state);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Report endpoint listening on http://0.0.0.0:{}", port);

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!("Report endpoint error: {}", e);
        }
    });

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::create_state;
    use balance_core::{NetworksConfig, NetworksSource};
    use balance_engine::{Collector, CollectorConfig, InMemoryBalanceStore, Router as BalanceRouter, ServiceConfig};
    use balance_feeds::MockBalanceAdapter;
    use pretty_assertions::assert_eq;

    fn rpc_state(networks: NetworksSource) -> Arc<RpcState> {
        let store = Arc::new(InMemoryBalanceStore::new());
        let router = BalanceRouter::new().with_adapter("A", Arc::new(MockBalanceAdapter::balance(12.5)));
        let collector = Arc::new(Collector::new(
            Arc::new(router),
            store.clone(),
            CollectorConfig::default(),
        ));
        let service = Arc::new(BalanceService::new(
            networks,
            collector,
            store,
            ServiceConfig::default(),
        ));
        Arc::new(RpcState {
            service,
            app_state: create_state(),
        })
    }

    fn static_networks() -> NetworksSource {
        NetworksSource::Static(
            NetworksConfig::from_json(r#"{"networks": {"adrich": {"A": {"token": "t", "is_active": true}}}}"#)
                .unwrap(),
        )
    }

    fn request(network: &str) -> Json<StatRequest> {
        Json(StatRequest {
            network: network.to_string(),
        })
    }

    #[tokio::test]
    async fn test_stat_without_history_is_empty() {
        let state = rpc_state(static_networks());
        let Json(reply) = stat_handler(State(state.clone()), request("adrich")).await.unwrap();

        assert_eq!(
            reply,
            StatReply {
                text: String::new(),
                network: "adrich".to_string(),
            }
        );
        assert_eq!(state.app_state.stats.summary().rpc_requests, 1);
    }

    #[tokio::test]
    async fn test_balance_listing() {
        let state = rpc_state(static_networks());
        let Json(reply) = balance_handler(State(state), request("adrich")).await.unwrap();

        assert_eq!(reply.network, "adrich");
        assert!(reply.text.ends_with("<b>A</b>: 12.50\n\n"));
    }

    #[tokio::test]
    async fn test_config_error_is_500() {
        let state = rpc_state(NetworksSource::file("/nonexistent/networks.json"));
        let (status, _) = stat_handler(State(state), request("adrich")).await.unwrap_err();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_reply_json_shape() {
        let reply = StatReply {
            text: "x".to_string(),
            network: "adrich".to_string(),
        };
        assert_eq!(
            serde_json::to_string(&reply).unwrap(),
            r#"{"text":"x","network":"adrich"}"#
        );
    }
}
