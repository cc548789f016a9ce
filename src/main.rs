pub mod analysis;
pub mod api;
pub mod chart;
pub mod config;
pub mod indicators;
pub mod page;
pub mod yahoo;

use crate::config::SharedSettings;
use crate::yahoo::{SharedFetcher, YahooClient};
use axum::{Router, extract::FromRef, routing::get};
use std::{net::SocketAddr, sync::Arc};
use tokio::sync::Mutex;
use tower_governor::{GovernorLayer, governor::GovernorConfigBuilder};

#[derive(Clone)]
struct AppState {
    fetcher: SharedFetcher,
    settings: SharedSettings,
}

impl FromRef<AppState> for SharedFetcher {
    fn from_ref(app_state: &AppState) -> SharedFetcher {
        app_state.fetcher.clone()
    }
}

impl FromRef<AppState> for SharedSettings {
    fn from_ref(app_state: &AppState) -> SharedSettings {
        app_state.settings.clone()
    }
}

#[tokio::main]
async fn main() {
    let app_config = config::AppConfig::load();

    // Initialize tracing with node_name in all logs
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .init();

    // Set a global span with node_name for all subsequent logs
    let _span = tracing::info_span!("node", name = %app_config.node_name).entered();

    tracing::info!("Starting tickerlens");
    tracing::info!(
        environment = %app_config.environment,
        port = app_config.port,
        default_ticker = %app_config.default_ticker,
        data_range = %app_config.data_range,
        "Loaded configuration"
    );

    let fetcher: SharedFetcher = Arc::new(Mutex::new(
        YahooClient::new(app_config.random_agent, app_config.provider_rate_limit_per_minute)
            .unwrap(),
    ));
    let settings: SharedSettings = Arc::new(app_config.clone());

    let app_state = AppState { fetcher, settings };

    let governor_conf = Arc::new(
        GovernorConfigBuilder::default().per_second(10).burst_size(20).finish().unwrap(),
    );

    let app = Router::new()
        .route(
            "/",
            get(api::index_handler)
                .post(api::chart_handler)
                .layer(GovernorLayer::new(governor_conf)),
        )
        .with_state(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], app_config.port));
    tracing::info!(%addr, "Server listening");
    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .await
        .unwrap();
}
