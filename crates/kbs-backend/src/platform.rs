//! Host notification capability.
//!
//! The host either supports native notifications or it does not; that is
//! decided once at startup and captured by [`NotificationCapability`]. A
//! supported host is driven through [`NotificationPlatform`].
//!
//! Hosts ask for permission in one of two ways: by returning a future that
//! resolves with the decision, or by invoking a callback with it.
//! [`request_platform_permission`] folds both into a single async result.

use std::sync::Arc;

use futures_util::future::BoxFuture;
use kbs_bridge::notification::NativeNotification;
use kbs_bridge::permission::PermissionState;
use tokio::sync::{oneshot, watch};

/// Errors reported by a host while displaying a native alert.
#[derive(Debug, thiserror::Error)]
pub enum PlatformError {
    #[error("failed to display native notification: {0}")]
    Display(String),
}

/// Errors returned from a permission request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PermissionError {
    #[error("This host does not support notifications")]
    NotSupported,
    #[error("Notification permission was denied. Please enable it in your settings.")]
    Denied,
    #[error("Notification permission was not granted. Please try again.")]
    Dismissed,
    #[error("A permission request is already waiting for an answer")]
    RequestInFlight,
    #[error("The permission prompt was closed without an answer")]
    PromptAbandoned,
}

/// Receives the user's decision in callback-style prompts.
pub type PermissionCallback = Box<dyn FnOnce(PermissionState) + Send>;

/// The ways a host can ask the user for permission.
pub enum PermissionPrompt {
    /// The decision is the output of a future.
    Future(BoxFuture<'static, PermissionState>),
    /// The decision is passed to the given callback.
    Callback(Box<dyn FnOnce(PermissionCallback) + Send>),
    /// The host has no way to prompt; treated as a refusal.
    Unavailable,
}

/// A native alert that is currently shown.
pub trait NativeHandle: Send + Sync {
    /// Dismisses the alert. Closing twice is harmless.
    fn close(&self);
}

pub trait NotificationPlatform: Send + Sync {
    /// Current permission as known by the host.
    fn permission(&self) -> PermissionState;

    /// Starts a permission prompt.
    fn prompt(&self) -> PermissionPrompt;

    /// Shows a native alert.
    fn show(&self, notification: NativeNotification)
    -> Result<Arc<dyn NativeHandle>, PlatformError>;

    /// Brings the application window to the front.
    fn focus_window(&self);

    /// Pushes permission changes made outside of the application, if the
    /// host can report them.
    fn permission_changes(&self) -> Option<watch::Receiver<PermissionState>> {
        None
    }
}

/// Whether the host can show native notifications at all.
#[derive(Clone)]
pub enum NotificationCapability {
    Supported(Arc<dyn NotificationPlatform>),
    Unsupported,
}

impl NotificationCapability {
    pub fn platform(&self) -> Option<&Arc<dyn NotificationPlatform>> {
        match self {
            Self::Supported(platform) => Some(platform),
            Self::Unsupported => None,
        }
    }
}

/// Issues one permission prompt and waits for the decision, whatever
/// convention the host uses.
pub async fn request_platform_permission(
    platform: &dyn NotificationPlatform,
) -> Result<PermissionState, PermissionError> {
    match platform.prompt() {
        PermissionPrompt::Future(decision) => Ok(decision.await),
        PermissionPrompt::Callback(start) => {
            let (decision_tx, decision_rx) = oneshot::channel();
            start(Box::new(move |state: PermissionState| {
                // the requester may have gone away; nothing to report then
                let _ = decision_tx.send(state);
            }));
            decision_rx
                .await
                .map_err(|_| PermissionError::PromptAbandoned)
        }
        PermissionPrompt::Unavailable => Ok(PermissionState::Denied),
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted host used by the tests of this crate.

    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use super::*;

    #[derive(Clone, Copy, PartialEq, Eq, Debug)]
    pub enum PromptStyle {
        Future,
        Callback,
        Unavailable,
    }

    pub struct FakeHandle {
        pub tag: String,
        pub closed: AtomicUsize,
    }

    impl NativeHandle for FakeHandle {
        fn close(&self) {
            self.closed.fetch_add(1, Ordering::SeqCst);
        }
    }

    /// Answers every prompt with `answer` and records what it was asked.
    pub struct FakePlatform {
        pub state: Arc<watch::Sender<PermissionState>>,
        pub answer: Mutex<PermissionState>,
        pub style: PromptStyle,
        pub prompts: AtomicUsize,
        pub focused: AtomicUsize,
        pub fail_display: AtomicBool,
        pub shown: Mutex<Vec<(NativeNotification, Arc<FakeHandle>)>>,
        /// When set, prompts wait for this gate before answering.
        pub gate: Mutex<Option<oneshot::Receiver<()>>>,
    }

    impl FakePlatform {
        pub fn new(initial: PermissionState, answer: PermissionState) -> Self {
            Self::with_style(initial, answer, PromptStyle::Future)
        }

        pub fn with_style(
            initial: PermissionState,
            answer: PermissionState,
            style: PromptStyle,
        ) -> Self {
            Self {
                state: Arc::new(watch::Sender::new(initial)),
                answer: Mutex::new(answer),
                style,
                prompts: AtomicUsize::new(0),
                focused: AtomicUsize::new(0),
                fail_display: AtomicBool::new(false),
                shown: Mutex::new(Vec::new()),
                gate: Mutex::new(None),
            }
        }

        pub fn prompt_count(&self) -> usize {
            self.prompts.load(Ordering::SeqCst)
        }

        pub fn shown_titles(&self) -> Vec<String> {
            self.shown
                .lock()
                .unwrap()
                .iter()
                .map(|(notification, _)| notification.title.clone())
                .collect()
        }
    }

    impl NotificationPlatform for FakePlatform {
        fn permission(&self) -> PermissionState {
            *self.state.borrow()
        }

        fn prompt(&self) -> PermissionPrompt {
            self.prompts.fetch_add(1, Ordering::SeqCst);
            let answer = *self.answer.lock().unwrap();
            let state = self.state.clone();
            let gate = self.gate.lock().unwrap().take();

            let decide = async move {
                if let Some(gate) = gate {
                    let _ = gate.await;
                }
                state.send_replace(answer);
                answer
            };

            match self.style {
                PromptStyle::Future => PermissionPrompt::Future(Box::pin(decide)),
                PromptStyle::Callback => PermissionPrompt::Callback(Box::new(move |callback: PermissionCallback| {
                    tokio::spawn(async move { callback(decide.await) });
                })),
                PromptStyle::Unavailable => PermissionPrompt::Unavailable,
            }
        }

        fn show(
            &self,
            notification: NativeNotification,
        ) -> Result<Arc<dyn NativeHandle>, PlatformError> {
            if self.fail_display.load(Ordering::SeqCst) {
                return Err(PlatformError::Display("constructor threw".into()));
            }
            let handle = Arc::new(FakeHandle {
                tag: notification.tag.clone(),
                closed: AtomicUsize::new(0),
            });
            self.shown
                .lock()
                .unwrap()
                .push((notification, handle.clone()));
            Ok(handle)
        }

        fn focus_window(&self) {
            self.focused.fetch_add(1, Ordering::SeqCst);
        }

        fn permission_changes(&self) -> Option<watch::Receiver<PermissionState>> {
            Some(self.state.subscribe())
        }
    }
}
