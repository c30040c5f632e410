//! The notification context shared by every consumer.
//!
//! [`NotificationCenter`] is built once at startup and handed to whoever
//! needs it. It joins the [`NotificationStore`] with the
//! [`PermissionManager`] so that every added record is also raised as a
//! native alert when the user allowed it. Consumers that render the list
//! follow [`NotificationCenter::subscribe_changes`] instead of polling.

use kbs_bridge::notification::{NativeNotification, NotificationDescriptor, NotificationRecord};
use kbs_bridge::permission::PermissionState;
use tokio::sync::{RwLock, watch};

use crate::permission::PermissionManager;
use crate::platform::PermissionError;
use crate::store::NotificationStore;

/// Notifications as shown to consumers.
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationSnapshot {
    pub notifications: Vec<NotificationRecord>,
    pub unread_count: usize,
}

pub struct NotificationCenter {
    store: RwLock<NotificationStore>,
    permissions: PermissionManager,
    changes: watch::Sender<()>,
}

impl NotificationCenter {
    pub fn new(store: NotificationStore, permissions: PermissionManager) -> Self {
        Self {
            store: RwLock::new(store),
            permissions,
            changes: watch::Sender::new(()),
        }
    }

    /// Fires after every mutation of the list.
    pub fn subscribe_changes(&self) -> watch::Receiver<()> {
        self.changes.subscribe()
    }

    fn notify_changed(&self, changed: bool) -> bool {
        if changed {
            self.changes.send_replace(());
        }
        changed
    }

    /// Records, newest first.
    pub async fn notifications(&self) -> Vec<NotificationRecord> {
        self.store.read().await.notifications().to_vec()
    }

    pub async fn unread_count(&self) -> usize {
        self.store.read().await.unread_count()
    }

    /// Reads the list and its unread count at the same instant.
    pub async fn snapshot(&self) -> NotificationSnapshot {
        let store = self.store.read().await;
        NotificationSnapshot {
            notifications: store.notifications().to_vec(),
            unread_count: store.unread_count(),
        }
    }

    /// Stores a new notification and mirrors it as a native alert. The
    /// record is kept even if the alert cannot be shown.
    pub async fn add_notification(&self, descriptor: NotificationDescriptor) -> NotificationRecord {
        let record = self.store.write().await.add(descriptor).await;
        self.notify_changed(true);

        let settings = self.permissions.settings();
        self.permissions.show_native(
            NativeNotification {
                title: record.title.clone(),
                body: record.message.clone(),
                icon: settings.icon.clone(),
                tag: record.id.clone(),
            },
            settings.event_dismiss,
        );

        record
    }

    pub async fn mark_as_read(&self, id: &str) -> bool {
        let changed = self.store.write().await.mark_as_read(id).await;
        self.notify_changed(changed)
    }

    pub async fn clear_notification(&self, id: &str) -> bool {
        let changed = self.store.write().await.clear(id).await;
        self.notify_changed(changed)
    }

    pub async fn clear_all_notifications(&self) {
        self.store.write().await.clear_all().await;
        self.notify_changed(true);
    }

    pub async fn request_permission(&self) -> Result<(), PermissionError> {
        self.permissions.request_permission().await
    }

    pub fn is_permission_granted(&self) -> bool {
        self.permissions.is_granted()
    }

    pub fn permission_state(&self) -> PermissionState {
        self.permissions.state()
    }

    pub fn subscribe_permission(&self) -> watch::Receiver<PermissionState> {
        self.permissions.subscribe()
    }

    /// Focuses the application and closes the clicked alert.
    pub fn handle_native_click(&self, tag: &str) {
        self.permissions.handle_click(tag);
    }

    pub fn shutdown(&self) {
        self.permissions.shutdown();
    }
}
