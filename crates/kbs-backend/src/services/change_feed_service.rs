use kbs_supabase::{EventSource, RealtimeClient, RealtimeConfig};

use super::AppContextHandle;
use crate::feeds::ChangeFeeds;

/// Subscribes the notification center to the change feeds of the configured
/// table. Without a realtime connection there is nothing to follow.
pub async fn start_change_feeds(context: AppContextHandle) {
    let (realtime, schema, table) = {
        let state = context.state.read().await;
        (
            state.realtime.clone(),
            state.config.backend.schema.clone(),
            state.config.backend.table.clone(),
        )
    };
    let Some(realtime) = realtime else {
        log::warn!("Realtime is unavailable, change feeds are disabled");
        return;
    };

    let source: &dyn EventSource = &realtime;
    match ChangeFeeds::subscribe(source, context.center.clone(), &schema, &table).await {
        Ok(feeds) => context.state.write().await.feeds = Some(feeds),
        Err(error) => log::error!("Error subscribing to change feeds of {table}: {error}"),
    }
}

/// Opens the realtime socket and then starts the change feeds. Runs beside
/// the dispatch loop so a slow or unreachable host only delays the feeds.
pub async fn connect_change_feeds(context: AppContextHandle) {
    let realtime_config = {
        let state = context.state.read().await;
        let Some((url, key)) = state.config.backend.credentials() else {
            return;
        };
        match RealtimeConfig::new(url, key) {
            Ok(realtime_config) => realtime_config,
            Err(error) => {
                log::error!("Invalid backend url {url}: {error}");
                return;
            }
        }
    };

    match RealtimeClient::connect(realtime_config).await {
        Ok(realtime) => context.state.write().await.realtime = Some(realtime),
        Err(error) => log::error!("Error connecting to realtime: {error}"),
    }
    start_change_feeds(context).await;
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use kbs_bridge::config::Config;
    use tokio::sync::{RwLock, mpsc};

    use super::*;
    use crate::app::AppContext;
    use crate::center::NotificationCenter;
    use crate::permission::{NativeSettings, PermissionManager};
    use crate::platform::NotificationCapability;
    use crate::state::State;
    use crate::storage::MemoryStorage;
    use crate::store::NotificationStore;

    fn context_with(config: Config) -> AppContextHandle {
        let (tx, _rx) = mpsc::channel(8);
        let center = NotificationCenter::new(
            NotificationStore::new(Arc::new(MemoryStorage::new())),
            PermissionManager::new(NotificationCapability::Unsupported, NativeSettings::default()),
        );
        Arc::new(AppContext {
            state: Arc::new(RwLock::new(State::new(config))),
            center: Arc::new(center),
            platform: None,
            tx,
        })
    }

    #[tokio::test]
    async fn unreachable_realtime_leaves_feeds_off() {
        let mut config = Config::default();
        config.backend.url = Some("http://127.0.0.1:1".into());
        config.backend.anon_key = Some("anon".into());
        let context = context_with(config);

        connect_change_feeds(context.clone()).await;

        let state = context.state.read().await;
        assert!(state.realtime.is_none());
        assert!(state.feeds.is_none());
    }

    #[tokio::test]
    async fn nothing_to_connect_without_credentials() {
        let context = context_with(Config::default());

        connect_change_feeds(context.clone()).await;

        assert!(context.state.read().await.realtime.is_none());
    }
}
