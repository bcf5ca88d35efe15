//! Farmwatch - Smart-farm telemetry dashboard service
//!
//! Signs in to the farm backend, polls the signed-in device for telemetry
//! snapshots, keeps a short rolling history for charts, and serves a web
//! dashboard that renders each field with the widget registered for it.

pub mod api;
pub mod camera;
pub mod config;
pub mod dashboard;
pub mod dispatch;
pub mod error;
pub mod history;
pub mod io;
pub mod poller;
pub mod session;
pub mod snapshot;
pub mod state;
pub mod store;
pub mod widget;

pub use config::{load_config, Config};
pub use error::{FarmwatchError, Result};

use std::net::SocketAddr;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::api::ApiClient;
use crate::camera::CameraRelay;
use crate::dashboard::DashboardState;
use crate::io::{HttpClient, ReqwestHttpClient};
use crate::poller::{supervise, TelemetryPoller};
use crate::session::Session;
use crate::store::{FileStore, KeyValueStore, MemoryStore};
use crate::widget::WidgetRegistry;

/// Run the farmwatch service with the given configuration
pub async fn run(config: Config) -> Result<()> {
    let http: Arc<dyn HttpClient> = Arc::new(ReqwestHttpClient::new());
    let cancel = CancellationToken::new();

    let store: Arc<dyn KeyValueStore> = match &config.session.store_path {
        Some(path) => Arc::new(FileStore::open(path)?),
        None => Arc::new(MemoryStore::new()),
    };
    let session = Arc::new(Session::restore(store));
    let api = Arc::new(ApiClient::new(
        &config.api.base_url,
        Arc::clone(&http),
        Arc::clone(&session),
    ));

    if let Some((email, password)) = config.session.credentials() {
        if let Err(e) = api.login(email, password).await {
            tracing::warn!("Startup login for {} failed: {}", email, e);
        }
    }

    let registry =
        Arc::new(WidgetRegistry::farm_defaults().with_overrides(config.widget_descriptors()));
    let telemetry = state::new_state_handle();

    tokio::spawn(cancel_on_ctrl_c(cancel.clone()));

    if config.dashboard.enabled {
        let dashboard_state = DashboardState {
            telemetry: Arc::clone(&telemetry),
            api: Arc::clone(&api),
            registry: Arc::clone(&registry),
            charts: Arc::new(history::default_charts()),
            camera: Arc::new(CameraRelay::new(&config.camera.relay_url, Arc::clone(&http))),
        };
        let addr = SocketAddr::from(([0, 0, 0, 0], config.dashboard.port));
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if let Err(e) = dashboard::serve(dashboard_state, addr, cancel).await {
                tracing::error!("Dashboard on {} failed: {}. Polling continues.", addr, e);
            }
        });
    }

    tracing::info!("Farmwatch started against {}", api.base_url());

    // Follow the session until cancelled
    let poller = TelemetryPoller::new(api.clone(), Arc::clone(&telemetry));
    supervise(session.subscribe(), poller, cancel).await;

    tracing::info!("Farmwatch stopped");
    Ok(())
}

async fn cancel_on_ctrl_c(cancel: CancellationToken) {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Shutdown signal received");
            cancel.cancel();
        }
        Err(e) => tracing::error!("Failed to listen for ctrl-c: {}", e),
    }
}
