use kbs_bridge::MessageFromBackend;
use kbs_bridge::notification::NotificationDescriptor;

use super::AppContextHandle;

async fn send_notifications(context: &AppContextHandle) {
    let snapshot = context.center.snapshot().await;
    context
        .send(MessageFromBackend::NotificationsUpdate {
            notifications: snapshot.notifications,
            unread_count: snapshot.unread_count,
        })
        .await;
}

/// Pushes the notification list to the frontend now and after every change,
/// whoever made it.
pub async fn forward_notification_changes(context: AppContextHandle) {
    let mut changes = context.center.subscribe_changes();
    send_notifications(&context).await;
    while changes.changed().await.is_ok() {
        send_notifications(&context).await;
    }
}

/// Handles an incoming list request (see
/// [`kbs_bridge::MessageToBackend::NotificationsRequest`]).
pub async fn handle_notifications_request(context: AppContextHandle) {
    send_notifications(&context).await;
}

pub async fn handle_add_notification(context: AppContextHandle, descriptor: NotificationDescriptor) {
    let record = context.center.add_notification(descriptor).await;
    log::debug!("Added notification {} from frontend", record.id);
}

pub async fn handle_mark_as_read(context: AppContextHandle, id: String) {
    if !context.center.mark_as_read(&id).await {
        log::debug!("Notification {id} is unknown or already read");
    }
}

pub async fn handle_clear_notification(context: AppContextHandle, id: String) {
    if !context.center.clear_notification(&id).await {
        log::debug!("Notification {id} is unknown");
    }
}

pub async fn handle_clear_all_notifications(context: AppContextHandle) {
    context.center.clear_all_notifications().await;
}
