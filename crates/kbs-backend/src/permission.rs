//! Tracks the native notification permission and shows native alerts.
//!
//! The state mirrors the host: `default` until the user answers a prompt,
//! then `granted` or `denied`. A denied permission is never prompted for
//! again; only the host can lift it, and the manager picks that up either
//! from the host's change events or the next time it checks.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use kbs_bridge::config::NotificationsConfig;
use kbs_bridge::notification::NativeNotification;
use kbs_bridge::permission::PermissionState;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::platform::{
    NativeHandle, NotificationCapability, PermissionError, request_platform_permission,
};

const CONFIRMATION_TAG: &str = "permission-confirmation";

/// Presentation settings for native alerts.
#[derive(Debug, Clone)]
pub struct NativeSettings {
    pub icon: Option<String>,
    /// Lifetime of alerts about data changes.
    pub event_dismiss: Duration,
    /// Lifetime of the "notifications enabled" confirmation.
    pub confirmation_dismiss: Duration,
}

impl Default for NativeSettings {
    fn default() -> Self {
        Self::from(&NotificationsConfig::default())
    }
}

impl From<&NotificationsConfig> for NativeSettings {
    fn from(config: &NotificationsConfig) -> Self {
        Self {
            icon: config.icon.clone(),
            event_dismiss: Duration::from_secs(config.event_dismiss_secs),
            confirmation_dismiss: Duration::from_secs(config.confirmation_dismiss_secs),
        }
    }
}

type ActiveAlerts = Arc<Mutex<HashMap<String, Arc<dyn NativeHandle>>>>;

/// Clears the in-flight flag when the request finishes, however it ends.
struct InFlightGuard<'a>(&'a AtomicBool);

impl<'a> InFlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct PermissionManager {
    capability: NotificationCapability,
    settings: NativeSettings,
    state: Arc<watch::Sender<PermissionState>>,
    in_flight: AtomicBool,
    active: ActiveAlerts,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl PermissionManager {
    /// Reads the host's current permission. Without native support the
    /// permission is reported as denied.
    pub fn new(capability: NotificationCapability, settings: NativeSettings) -> Self {
        let initial = match capability.platform() {
            Some(platform) => platform.permission(),
            None => {
                log::info!("Notifications not supported on this host");
                PermissionState::Denied
            }
        };
        log::info!("Notification permission status: {initial}");

        Self {
            capability,
            settings,
            state: Arc::new(watch::Sender::new(initial)),
            in_flight: AtomicBool::new(false),
            active: Arc::new(Mutex::new(HashMap::new())),
            listener: Mutex::new(None),
        }
    }

    /// Like [`PermissionManager::new`], and also follows the host's
    /// permission change events when it has them. Must be called from
    /// within a tokio runtime.
    pub fn mount(capability: NotificationCapability, settings: NativeSettings) -> Self {
        let manager = Self::new(capability, settings);
        manager.follow_host_changes();
        manager
    }

    fn follow_host_changes(&self) {
        let Some(mut changes) = self
            .capability
            .platform()
            .and_then(|platform| platform.permission_changes())
        else {
            return;
        };

        let state = self.state.clone();
        let task = tokio::spawn(async move {
            while changes.changed().await.is_ok() {
                let permission = *changes.borrow_and_update();
                log::info!("Notification permission status: {permission}");
                state.send_replace(permission);
            }
        });

        let mut listener = self.listener.lock().unwrap_or_else(PoisonError::into_inner);
        *listener = Some(task);
    }

    pub fn state(&self) -> PermissionState {
        *self.state.borrow()
    }

    pub fn is_granted(&self) -> bool {
        self.state().is_granted()
    }

    /// Receives every permission change.
    pub fn subscribe(&self) -> watch::Receiver<PermissionState> {
        self.state.subscribe()
    }

    pub fn settings(&self) -> &NativeSettings {
        &self.settings
    }

    fn set_state(&self, permission: PermissionState) {
        self.state.send_if_modified(|current| {
            let changed = *current != permission;
            *current = permission;
            changed
        });
    }

    /// Asks the user for permission to show native alerts.
    ///
    /// Succeeds at once when already granted and fails at once when denied
    /// or unsupported. Otherwise exactly one host prompt is issued; calls
    /// made while it is pending fail with
    /// [`PermissionError::RequestInFlight`]. On grant a confirmation alert
    /// is shown.
    pub async fn request_permission(&self) -> Result<(), PermissionError> {
        let Some(platform) = self.capability.platform() else {
            log::error!("This host does not support notifications");
            return Err(PermissionError::NotSupported);
        };

        let current = platform.permission();
        self.set_state(current);
        match current {
            PermissionState::Granted => return Ok(()),
            PermissionState::Denied => {
                log::error!("Notification permission was previously denied");
                return Err(PermissionError::Denied);
            }
            PermissionState::Default => {}
        }

        let _guard =
            InFlightGuard::acquire(&self.in_flight).ok_or(PermissionError::RequestInFlight)?;
        log::info!("Requesting notification permission from user...");

        let decision = request_platform_permission(platform.as_ref())
            .await
            .inspect_err(|error| log::error!("Error requesting notification permission: {error}"))?;
        log::info!("Permission result: {decision}");
        self.set_state(decision);

        match decision {
            PermissionState::Granted => {
                self.show_native(
                    NativeNotification {
                        title: "Notifications enabled".to_string(),
                        body: "You will now receive push notifications for new work entries."
                            .to_string(),
                        icon: self.settings.icon.clone(),
                        tag: CONFIRMATION_TAG.to_string(),
                    },
                    self.settings.confirmation_dismiss,
                );
                Ok(())
            }
            PermissionState::Denied => Err(PermissionError::Denied),
            PermissionState::Default => Err(PermissionError::Dismissed),
        }
    }

    /// Shows a native alert that closes itself after `auto_close`. Does
    /// nothing unless permission is granted. Failures are only logged.
    pub fn show_native(&self, notification: NativeNotification, auto_close: Duration) {
        if !self.is_granted() {
            return;
        }
        let Some(platform) = self.capability.platform() else {
            return;
        };

        let tag = notification.tag.clone();
        let handle = match platform.show(notification) {
            Ok(handle) => handle,
            Err(error) => {
                log::error!("Error showing native notification: {error}");
                return;
            }
        };

        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(tag.clone(), handle.clone());

        let active = self.active.clone();
        tokio::spawn(async move {
            tokio::time::sleep(auto_close).await;
            handle.close();

            let mut active = active.lock().unwrap_or_else(PoisonError::into_inner);
            if active
                .get(&tag)
                .is_some_and(|current| Arc::ptr_eq(current, &handle))
            {
                active.remove(&tag);
            }
        });
    }

    /// Reacts to a click on a native alert: focuses the application window
    /// and closes the alert.
    pub fn handle_click(&self, tag: &str) {
        let handle = self
            .active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(tag);

        if let Some(platform) = self.capability.platform() {
            platform.focus_window();
        }
        match handle {
            Some(handle) => handle.close(),
            None => log::debug!("Clicked native notification {tag} is already closed"),
        }
    }

    /// Stops following host permission changes.
    pub fn shutdown(&self) {
        let listener = self
            .listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(listener) = listener {
            listener.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use tokio::sync::oneshot;

    use super::*;
    use crate::platform::testing::FakePlatform;

    fn manager_with(platform: &Arc<FakePlatform>) -> PermissionManager {
        PermissionManager::new(
            NotificationCapability::Supported(platform.clone()),
            NativeSettings::default(),
        )
    }

    fn alert(tag: &str) -> NativeNotification {
        NativeNotification {
            title: "New Work Entry Created".into(),
            body: "body".into(),
            icon: None,
            tag: tag.into(),
        }
    }

    #[tokio::test]
    async fn grant_shows_confirmation() {
        let platform = Arc::new(FakePlatform::new(
            PermissionState::Default,
            PermissionState::Granted,
        ));
        let manager = manager_with(&platform);

        assert_eq!(manager.request_permission().await, Ok(()));
        assert!(manager.is_granted());
        assert_eq!(platform.prompt_count(), 1);
        assert_eq!(platform.shown_titles(), vec!["Notifications enabled"]);

        // already granted: no second prompt
        assert_eq!(manager.request_permission().await, Ok(()));
        assert_eq!(platform.prompt_count(), 1);
    }

    #[tokio::test]
    async fn denied_is_never_prompted_again() {
        let platform = Arc::new(FakePlatform::new(
            PermissionState::Default,
            PermissionState::Denied,
        ));
        let manager = manager_with(&platform);

        assert_eq!(manager.request_permission().await, Err(PermissionError::Denied));
        assert_eq!(manager.state(), PermissionState::Denied);
        for _ in 0..3 {
            assert_eq!(manager.request_permission().await, Err(PermissionError::Denied));
        }
        assert_eq!(platform.prompt_count(), 1);
        assert!(platform.shown_titles().is_empty());
    }

    #[tokio::test]
    async fn dismissed_prompt_keeps_default() {
        let platform = Arc::new(FakePlatform::new(
            PermissionState::Default,
            PermissionState::Default,
        ));
        let manager = manager_with(&platform);

        assert_eq!(manager.request_permission().await, Err(PermissionError::Dismissed));
        assert_eq!(manager.state(), PermissionState::Default);
    }

    #[tokio::test]
    async fn unsupported_host_reports_denied() {
        let manager =
            PermissionManager::new(NotificationCapability::Unsupported, NativeSettings::default());

        assert_eq!(manager.state(), PermissionState::Denied);
        assert_eq!(
            manager.request_permission().await,
            Err(PermissionError::NotSupported)
        );
    }

    #[tokio::test]
    async fn concurrent_requests_issue_one_prompt() {
        let platform = Arc::new(FakePlatform::new(
            PermissionState::Default,
            PermissionState::Granted,
        ));
        let (open_gate, gate) = oneshot::channel();
        *platform.gate.lock().unwrap() = Some(gate);
        let manager = Arc::new(manager_with(&platform));

        let first = tokio::spawn({
            let manager = manager.clone();
            async move { manager.request_permission().await }
        });
        while platform.prompt_count() == 0 {
            tokio::task::yield_now().await;
        }

        assert_eq!(
            manager.request_permission().await,
            Err(PermissionError::RequestInFlight)
        );

        open_gate.send(()).unwrap();
        assert_eq!(first.await.unwrap(), Ok(()));
        assert_eq!(platform.prompt_count(), 1);
        assert!(!manager.in_flight.load(Ordering::SeqCst));
    }

    #[tokio::test(start_paused = true)]
    async fn native_alerts_close_themselves() {
        let platform = Arc::new(FakePlatform::new(
            PermissionState::Granted,
            PermissionState::Granted,
        ));
        let manager = manager_with(&platform);

        manager.show_native(alert("a1"), Duration::from_secs(5));
        let handle = platform.shown.lock().unwrap()[0].1.clone();
        assert_eq!(handle.closed.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_secs(6)).await;
        assert_eq!(handle.closed.load(Ordering::SeqCst), 1);
        assert!(manager.active.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn nothing_is_shown_without_permission() {
        let platform = Arc::new(FakePlatform::new(
            PermissionState::Default,
            PermissionState::Granted,
        ));
        let manager = manager_with(&platform);

        manager.show_native(alert("a1"), Duration::from_secs(5));
        assert!(platform.shown_titles().is_empty());
    }

    #[tokio::test]
    async fn display_failures_are_swallowed() {
        let platform = Arc::new(FakePlatform::new(
            PermissionState::Granted,
            PermissionState::Granted,
        ));
        platform.fail_display.store(true, Ordering::SeqCst);
        let manager = manager_with(&platform);

        manager.show_native(alert("a1"), Duration::from_secs(5));
        assert!(manager.active.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn click_focuses_and_closes() {
        let platform = Arc::new(FakePlatform::new(
            PermissionState::Granted,
            PermissionState::Granted,
        ));
        let manager = manager_with(&platform);

        manager.show_native(alert("a1"), Duration::from_secs(5));
        manager.handle_click("a1");

        let handle = platform.shown.lock().unwrap()[0].1.clone();
        assert_eq!(handle.tag, "a1");
        assert_eq!(handle.closed.load(Ordering::SeqCst), 1);
        assert_eq!(platform.focused.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn follows_host_changes() {
        let platform = Arc::new(FakePlatform::new(
            PermissionState::Denied,
            PermissionState::Granted,
        ));
        let manager = PermissionManager::mount(
            NotificationCapability::Supported(platform.clone()),
            NativeSettings::default(),
        );
        let mut changes = manager.subscribe();

        platform.state.send_replace(PermissionState::Default);
        changes.changed().await.unwrap();
        assert_eq!(manager.state(), PermissionState::Default);

        manager.shutdown();
    }
}
