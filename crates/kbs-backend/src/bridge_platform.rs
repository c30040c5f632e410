//! Native notifications delivered through the frontend bridge.
//!
//! The frontend plays the host: it receives prompts and alerts as
//! [`MessageFromBackend`] messages and answers prompts with
//! [`kbs_bridge::MessageToBackend::PermissionDecision`]. The user's decision is
//! kept in local storage so it survives restarts, like a host setting.

use std::sync::{Arc, Mutex, PoisonError};

use kbs_bridge::MessageFromBackend;
use kbs_bridge::notification::NativeNotification;
use kbs_bridge::permission::PermissionState;
use tokio::sync::mpsc::Sender;
use tokio::sync::{oneshot, watch};

use crate::platform::{
    NativeHandle, NotificationPlatform, PermissionPrompt, PlatformError,
};
use crate::storage::{KeyValueStorage, StorageError};

/// Storage key holding the user's permission decision.
pub const PERMISSION_KEY: &str = "kbs-notification-permission";

pub struct BridgePlatform {
    tx: Sender<MessageFromBackend>,
    storage: Arc<dyn KeyValueStorage>,
    state: watch::Sender<PermissionState>,
    pending: Mutex<Option<oneshot::Sender<PermissionState>>>,
}

impl BridgePlatform {
    /// Creates the platform with the permission decided in an earlier
    /// session, or `default` if there is none.
    pub async fn load(tx: Sender<MessageFromBackend>, storage: Arc<dyn KeyValueStorage>) -> Self {
        let permission = match read_permission(storage.as_ref()).await {
            Ok(permission) => permission.unwrap_or_default(),
            Err(error) => {
                log::error!("Error loading notification permission: {error}");
                PermissionState::Default
            }
        };

        Self {
            tx,
            storage,
            state: watch::Sender::new(permission),
            pending: Mutex::new(None),
        }
    }

    /// Delivers the user's answer to the pending prompt.
    pub async fn resolve_prompt(&self, decision: PermissionState) {
        let pending = self
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        self.set_permission(decision).await;
        match pending {
            Some(pending) => {
                if pending.send(decision).is_err() {
                    log::debug!("Permission requester went away before the answer");
                }
            }
            None => log::warn!("Got a permission decision without a pending prompt"),
        }
    }

    /// Changes the permission outside of a prompt, as a host setting would.
    pub async fn set_permission(&self, permission: PermissionState) {
        self.state.send_replace(permission);
        let result = match serde_json::to_string(&permission) {
            Ok(value) => self.storage.set(PERMISSION_KEY, &value).await,
            Err(error) => Err(error.into()),
        };
        if let Err(error) = result {
            log::error!("Error saving notification permission: {error}");
        }
    }

    fn try_send(&self, message: MessageFromBackend) -> Result<(), PlatformError> {
        self.tx
            .try_send(message)
            .map_err(|error| PlatformError::Display(error.to_string()))
    }
}

async fn read_permission(
    storage: &dyn KeyValueStorage,
) -> Result<Option<PermissionState>, StorageError> {
    let Some(value) = storage.get(PERMISSION_KEY).await? else {
        return Ok(None);
    };
    Ok(Some(serde_json::from_str(&value)?))
}

struct BridgeHandle {
    tag: String,
    tx: Sender<MessageFromBackend>,
}

impl NativeHandle for BridgeHandle {
    fn close(&self) {
        let message = MessageFromBackend::CloseNativeNotification(self.tag.clone());
        if let Err(error) = self.tx.try_send(message) {
            log::debug!("Could not close native notification {}: {error}", self.tag);
        }
    }
}

impl NotificationPlatform for BridgePlatform {
    fn permission(&self) -> PermissionState {
        *self.state.borrow()
    }

    fn prompt(&self) -> PermissionPrompt {
        let (decision_tx, decision_rx) = oneshot::channel();
        // a newer prompt replaces an unanswered one, which then resolves as
        // dismissed
        *self.pending.lock().unwrap_or_else(PoisonError::into_inner) = Some(decision_tx);

        let tx = self.tx.clone();
        PermissionPrompt::Future(Box::pin(async move {
            if tx.send(MessageFromBackend::PermissionPrompt).await.is_err() {
                log::error!("Frontend is gone, cannot prompt for permission");
                return PermissionState::Default;
            }
            decision_rx.await.unwrap_or(PermissionState::Default)
        }))
    }

    fn show(
        &self,
        notification: NativeNotification,
    ) -> Result<Arc<dyn NativeHandle>, PlatformError> {
        let tag = notification.tag.clone();
        self.try_send(MessageFromBackend::ShowNativeNotification(notification))?;
        Ok(Arc::new(BridgeHandle {
            tag,
            tx: self.tx.clone(),
        }))
    }

    fn focus_window(&self) {
        if let Err(error) = self.try_send(MessageFromBackend::FocusWindow) {
            log::debug!("Could not focus window: {error}");
        }
    }

    fn permission_changes(&self) -> Option<watch::Receiver<PermissionState>> {
        Some(self.state.subscribe())
    }
}
