use kbs_bridge::MessageFromBackend;
use kbs_bridge::notification::NotificationType;
use kbs_bridge::permission::PermissionState;

use super::AppContextHandle;

/// Pushes the permission state to the frontend now and whenever it changes.
pub async fn forward_permission_changes(context: AppContextHandle) {
    let mut changes = context.center.subscribe_permission();
    loop {
        let permission = *changes.borrow_and_update();
        context
            .send(MessageFromBackend::PermissionStateUpdate(permission))
            .await;
        if changes.changed().await.is_err() {
            break;
        }
    }
}

pub async fn handle_permission_state_request(context: AppContextHandle) {
    let permission = context.center.permission_state();
    context
        .send(MessageFromBackend::PermissionStateUpdate(permission))
        .await;
}

/// Handles the "enable notifications" action (see
/// [`kbs_bridge::MessageToBackend::RequestPermission`]). Failures are shown
/// inline.
pub async fn handle_permission_request(context: AppContextHandle) {
    match context.center.request_permission().await {
        Ok(()) => {
            context
                .send_notification(NotificationType::Success, "Notifications enabled")
                .await;
        }
        Err(error) => {
            context
                .send_notification(NotificationType::Error, error.to_string())
                .await;
        }
    }
}

/// Delivers the user's answer to the pending prompt.
pub async fn handle_permission_decision(context: AppContextHandle, decision: PermissionState) {
    match &context.platform {
        Some(platform) => platform.resolve_prompt(decision).await,
        None => log::warn!("Got a permission decision, but native notifications are disabled"),
    }
}

/// Applies a permission change made in the host settings.
pub async fn handle_permission_reset(context: AppContextHandle, permission: PermissionState) {
    match &context.platform {
        Some(platform) => {
            log::info!("Notification permission reset to {permission}");
            platform.set_permission(permission).await;
        }
        None => log::warn!("Cannot reset permission, native notifications are disabled"),
    }
}

pub async fn handle_native_click(context: AppContextHandle, tag: String) {
    context.center.handle_native_click(&tag);
}
