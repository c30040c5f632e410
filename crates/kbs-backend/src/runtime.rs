//! Backend runtime setup and orchestration.
//!
//! This module wires together configuration, local storage, the
//! notification center, backend clients and the message dispatch loop that
//! listens to frontend bridge requests.

use std::{sync::Arc, thread};

use kbs_bridge::config::Config;
use kbs_bridge::{MessageFromBackend, MessageToBackend};
use kbs_supabase::RestClient;
use tokio::sync::{
    RwLock,
    mpsc::{Receiver, Sender},
};

use crate::app::AppContext;
use crate::bridge_platform::BridgePlatform;
use crate::center::NotificationCenter;
use crate::config::ConfigError;
use crate::permission::{NativeSettings, PermissionManager};
use crate::platform::NotificationCapability;
use crate::services;
use crate::state::State;
use crate::storage::{FileStorage, KeyValueStorage};
use crate::store::NotificationStore;

/// Opens the table API client when credentials are present. The realtime
/// socket is connected later, beside the dispatch loop.
fn connect_rest(config: &Config) -> Option<RestClient> {
    let Some((url, key)) = config.backend.credentials() else {
        log::warn!("Backend credentials are not configured, running without change feeds");
        return None;
    };

    RestClient::new(reqwest::Client::new(), url, key)
        .inspect_err(|error| log::error!("Invalid backend url {url}: {error}"))
        .ok()
}

/// Initialize backend state and start processing frontend messages.
async fn setup_backend(
    rx: Receiver<MessageToBackend>,
    tx: Sender<MessageFromBackend>,
) -> Result<(), ConfigError> {
    let (config, data_path) = crate::config::load_config().await?;
    log::info!("Local storage at {data_path:?}");
    let storage: Arc<dyn KeyValueStorage> = Arc::new(FileStorage::new(data_path));

    let (capability, platform) = if config.notifications.native_enabled {
        let platform = Arc::new(BridgePlatform::load(tx.clone(), storage.clone()).await);
        (NotificationCapability::Supported(platform.clone()), Some(platform))
    } else {
        (NotificationCapability::Unsupported, None)
    };
    let permissions =
        PermissionManager::mount(capability, NativeSettings::from(&config.notifications));
    let store = NotificationStore::load(storage).await;
    let center = Arc::new(NotificationCenter::new(store, permissions));

    let mut state = State::new(config);
    state.rest = connect_rest(&state.config);

    let context = Arc::new(AppContext {
        state: Arc::new(RwLock::new(state)),
        center,
        platform,
        tx,
    });

    let background = vec![
        tokio::spawn(services::notification_service::forward_notification_changes(
            context.clone(),
        )),
        tokio::spawn(services::permission_service::forward_permission_changes(
            context.clone(),
        )),
        tokio::spawn(services::keep_alive_service::run_keep_alive(context.clone())),
        tokio::spawn(services::change_feed_service::connect_change_feeds(
            context.clone(),
        )),
    ];
    context.state.write().await.background = background;

    context.consume_bridge_messages(rx).await;
    context.shutdown().await;
    Ok(())
}

/// Spawn the backend runtime and begin processing bridge messages. The
/// backend stops once the frontend drops its sender; join the returned
/// handle to wait for the teardown.
pub fn run(
    rx: Receiver<MessageToBackend>,
    tx: Sender<MessageFromBackend>,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let runtime = match tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime,
            Err(error) => {
                log::error!("Failed to build tokio runtime: {error}");
                return;
            }
        };
        if let Err(error) = runtime.block_on(setup_backend(rx, tx)) {
            log::error!("Backend failed to start: {error}");
        }
    })
}
