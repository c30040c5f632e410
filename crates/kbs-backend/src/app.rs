//! Application context and message dispatching utilities.
//!
//! The context contains the shared state and the notification center, and
//! provides helpers for sending responses and notifications back to the
//! frontend bridge.

use std::sync::Arc;

use kbs_bridge::notification::{NotificationMessage, NotificationType};
use kbs_bridge::{MessageFromBackend, MessageToBackend};
use tokio::sync::mpsc::{Receiver, Sender};

use crate::bridge_platform::BridgePlatform;
use crate::center::NotificationCenter;
use crate::services;
use crate::state::SharedState;

/// Shared application context passed to services and message handlers.
pub(crate) struct AppContext {
    /// Mutable runtime application state shared across services.
    pub state: SharedState,
    /// Notification list and permission handling.
    pub center: Arc<NotificationCenter>,
    /// The frontend acting as notification host, when native notifications
    /// are enabled.
    pub platform: Option<Arc<BridgePlatform>>,
    /// Outbound channel to the frontend bridge.
    pub tx: Sender<MessageFromBackend>,
}

impl AppContext {
    /// Read and dispatch messages from the frontend bridge until it closes.
    pub async fn consume_bridge_messages(self: &Arc<Self>, mut rx: Receiver<MessageToBackend>) {
        while let Some(message) = rx.recv().await {
            log::debug!("Got a frontend message: {message:?}");
            self.dispatch_message(message).await;
        }
        log::info!("Frontend bridge closed");
    }

    /// Dispatches the received message from frontend down to individual
    /// service handlers.
    async fn dispatch_message(self: &Arc<Self>, message: MessageToBackend) {
        match message {
            MessageToBackend::ConfigurationRequest => {
                services::config_service::handle_config_request(self.clone()).await;
            }
            MessageToBackend::NotificationsRequest => {
                services::notification_service::handle_notifications_request(self.clone()).await;
            }
            MessageToBackend::AddNotification(descriptor) => {
                services::notification_service::handle_add_notification(self.clone(), descriptor)
                    .await;
            }
            MessageToBackend::MarkAsRead(id) => {
                services::notification_service::handle_mark_as_read(self.clone(), id).await;
            }
            MessageToBackend::ClearNotification(id) => {
                services::notification_service::handle_clear_notification(self.clone(), id).await;
            }
            MessageToBackend::ClearAllNotifications => {
                services::notification_service::handle_clear_all_notifications(self.clone()).await;
            }
            MessageToBackend::PermissionStateRequest => {
                services::permission_service::handle_permission_state_request(self.clone()).await;
            }
            MessageToBackend::RequestPermission => {
                // the answer arrives as another bridge message, so the loop
                // must keep running meanwhile
                tokio::spawn(services::permission_service::handle_permission_request(
                    self.clone(),
                ));
            }
            MessageToBackend::PermissionDecision(decision) => {
                services::permission_service::handle_permission_decision(self.clone(), decision)
                    .await;
            }
            MessageToBackend::PermissionReset(permission) => {
                services::permission_service::handle_permission_reset(self.clone(), permission)
                    .await;
            }
            MessageToBackend::NativeNotificationClicked(tag) => {
                services::permission_service::handle_native_click(self.clone(), tag).await;
            }
            MessageToBackend::WorkEntriesRequest(filter) => {
                services::entries_service::handle_work_entries_request(self.clone(), filter).await;
            }
            MessageToBackend::DeleteWorkEntry(id) => {
                services::entries_service::handle_delete_work_entry(self.clone(), id).await;
            }
            MessageToBackend::SaveWorkEntry(entry) => {
                services::entries_service::handle_save_work_entry(self.clone(), entry).await;
            }
        }
    }

    /// Send a message to the frontend bridge. A closed bridge means the
    /// frontend is shutting down, so the message is only logged.
    pub async fn send(&self, message: MessageFromBackend) {
        if let Err(error) = self.tx.send(message).await {
            log::warn!("Dropping message for closed frontend: {:?}", error.0);
        }
    }

    /// Send a short-lived inline message to the frontend bridge.
    pub async fn send_notification(
        &self,
        notification_type: NotificationType,
        content: impl Into<String>,
    ) {
        self.send(MessageFromBackend::NotificationMessage(NotificationMessage {
            notification_type,
            message: content.into(),
        }))
        .await;
    }

    /// Stops change feeds, background tasks and the realtime socket.
    pub async fn shutdown(&self) {
        // a connect still in progress must not store a client after the take
        let background = std::mem::take(&mut self.state.write().await.background);
        for task in background {
            task.abort();
            if let Err(error) = task.await
                && error.is_panic()
            {
                log::error!("Background task panicked: {error}");
            }
        }

        let (feeds, realtime) = {
            let mut state = self.state.write().await;
            (state.feeds.take(), state.realtime.take())
        };
        if let Some(feeds) = feeds {
            feeds.shutdown().await;
        }
        if let Some(realtime) = realtime {
            realtime.close().await;
        }
        self.center.shutdown();
        log::info!("Backend stopped");
    }
}
