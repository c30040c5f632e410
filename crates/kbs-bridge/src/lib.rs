//! Communication bridge between frontend and backend.
//!
//! This crate defines the types and protocols used to connect a frontend
//! (the notification panel and the work entries dashboard) with an
//! asynchronous backend responsible for the notification store, permission
//! handling, realtime change feeds and the hosted database.
//!
//! The design is deliberately lightweight and unidirectional:
//! - The frontend sends commands (e.g., mark a notification as read, request
//!   notification permission, fetch work entries).
//! - The backend pushes events (e.g., notification list updates, permission
//!   prompts, native alerts).
//!
//! Communication happens over bounded [`tokio::sync::mpsc`] channels wrapped
//! in [`BridgeChannels`], providing back-pressure, async compatibility, and
//! clean separation of concerns.

pub mod config;
pub mod notification;
pub mod permission;
pub mod work_entry;

use tokio::sync::mpsc::{self, Receiver, Sender};

/// Messages emitted by the backend to inform the frontend of state updates.
///
/// These are typically sent in response to frontend requests or to push
/// asynchronous events (e.g., a new work entry arrived over the change feed).
#[derive(Debug, Clone)]
pub enum MessageFromBackend {
    /// Short-lived inline message, not stored in the notification list.
    NotificationMessage(notification::NotificationMessage),
    /// Current contents of the notification list, newest first.
    NotificationsUpdate {
        notifications: Vec<notification::NotificationRecord>,
        unread_count: usize,
    },
    /// The notification permission changed or was requested.
    PermissionStateUpdate(permission::PermissionState),
    /// Ask the user whether native notifications may be shown. The answer is
    /// expected as [`MessageToBackend::PermissionDecision`].
    PermissionPrompt,
    /// Display a native (out-of-panel) alert.
    ShowNativeNotification(notification::NativeNotification),
    /// Dismiss a previously displayed native alert by its tag.
    CloseNativeNotification(String),
    /// Bring the application window to the front.
    FocusWindow,
    /// Response to the configuration request from the frontend.
    ConfigurationResponse(config::Config),
    /// Filtered work entries together with their totals.
    WorkEntriesResponse {
        entries: Vec<work_entry::WorkEntry>,
        totals: work_entry::EntryTotals,
    },
}

/// Commands issued by the frontend to control or query the backend.
#[derive(Debug, Clone, PartialEq)]
pub enum MessageToBackend {
    /// Request for the application configuration.
    ConfigurationRequest,
    /// Request for the current notification list.
    NotificationsRequest,
    AddNotification(notification::NotificationDescriptor),
    MarkAsRead(String),
    ClearNotification(String),
    ClearAllNotifications,
    /// Request for the current permission state.
    PermissionStateRequest,
    /// User pressed "enable notifications".
    RequestPermission,
    /// The user's answer to a [`MessageFromBackend::PermissionPrompt`].
    PermissionDecision(permission::PermissionState),
    /// The permission was changed outside of the application prompt, e.g.
    /// from the settings of the host.
    PermissionReset(permission::PermissionState),
    /// The user clicked a native alert with the given tag.
    NativeNotificationClicked(String),
    WorkEntriesRequest(work_entry::EntryFilter),
    DeleteWorkEntry(String),
    /// Creates the entry, or updates it when it carries an id.
    SaveWorkEntry(work_entry::WorkEntry),
}

/// Paired `tokio::mpsc` channels for bidirectional communication between
/// frontend and backend.
pub struct BridgeChannels {
    /// Receiver used by the frontend to get messages from the backend.
    pub frontend_rx: Receiver<MessageFromBackend>,
    /// Sender used by the frontend to send commands to the backend.
    pub frontend_tx: Sender<MessageToBackend>,

    /// Receiver used by the backend to get commands from the frontend.
    pub backend_rx: Receiver<MessageToBackend>,
    /// Sender used by the backend to send events/responses to the frontend.
    pub backend_tx: Sender<MessageFromBackend>,
}

impl BridgeChannels {
    /// Creates a new pair of bridged channels with the given buffer capacity.
    pub fn new(buffer: usize) -> Self {
        let (to_backend_tx, to_backend_rx) = mpsc::channel(buffer);
        let (to_frontend_tx, to_frontend_rx) = mpsc::channel(buffer);
        Self {
            frontend_tx: to_backend_tx,
            frontend_rx: to_frontend_rx,
            backend_rx: to_backend_rx,
            backend_tx: to_frontend_tx,
        }
    }
}

impl Default for BridgeChannels {
    fn default() -> Self {
        Self::new(64)
    }
}
