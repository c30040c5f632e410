//! Change feeds of the work entries table.
//!
//! Every change event type gets its own channel. Changes are summarized and
//! added to the [`NotificationCenter`] as they arrive; nothing orders events
//! across channels.

use std::sync::Arc;

use kbs_supabase::{ChangeEvent, ChangeFilter, EventSource, SubscriptionHandle, SupabaseError};
use tokio::task::JoinHandle;

use crate::center::NotificationCenter;
use crate::summarizer;

/// Events watched on the table, one channel each.
pub const FEED_EVENTS: [ChangeEvent; 3] =
    [ChangeEvent::Insert, ChangeEvent::Update, ChangeEvent::Delete];

/// Name of the channel carrying `event` changes of `table`, e.g.
/// `work_entries_insert`.
pub fn channel_name(table: &str, event: ChangeEvent) -> String {
    format!("{table}_{}", event.to_string().to_lowercase())
}

/// The live subscriptions feeding the notification center.
#[derive(Debug)]
pub struct ChangeFeeds {
    handles: Vec<SubscriptionHandle>,
    tasks: Vec<JoinHandle<()>>,
}

impl ChangeFeeds {
    /// Subscribes to inserts, updates and deletes of `schema.table`. If any
    /// subscription fails the ones already made are left again.
    pub async fn subscribe(
        source: &dyn EventSource,
        center: Arc<NotificationCenter>,
        schema: &str,
        table: &str,
    ) -> Result<Self, SupabaseError> {
        let mut feeds = Self {
            handles: Vec::with_capacity(FEED_EVENTS.len()),
            tasks: Vec::with_capacity(FEED_EVENTS.len()),
        };

        for event in FEED_EVENTS {
            let channel = channel_name(table, event);
            let subscription = match source
                .subscribe(&channel, ChangeFilter::new(event, schema, table))
                .await
            {
                Ok(subscription) => subscription,
                Err(error) => {
                    log::error!("Failed to subscribe to {channel}: {error}");
                    feeds.unsubscribe();
                    return Err(error);
                }
            };
            log::info!("Subscribed to {channel}");

            let (handle, mut changes) = subscription.split();
            let center = center.clone();
            feeds.tasks.push(tokio::spawn(async move {
                while let Some(change) = changes.recv().await {
                    log::info!("Received {} on {}", change.event, change.table);
                    center.add_notification(summarizer::summarize(&change)).await;
                }
                log::debug!("Change feed {channel} ended");
            }));
            feeds.handles.push(handle);
        }

        Ok(feeds)
    }

    pub fn handles(&self) -> &[SubscriptionHandle] {
        &self.handles
    }

    /// Leaves every channel. Changes already received are still delivered.
    pub fn unsubscribe(&mut self) {
        for handle in self.handles.drain(..) {
            log::debug!("Unsubscribing from {}", handle.topic());
            handle.unsubscribe();
        }
    }

    /// Leaves every channel and waits for the delivery of pending changes.
    pub async fn shutdown(mut self) {
        self.unsubscribe();
        for task in self.tasks.drain(..) {
            if let Err(error) = task.await {
                log::error!("Change feed task failed: {error}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channels_are_named_after_table_and_event() {
        let names: Vec<_> = FEED_EVENTS
            .iter()
            .map(|event| channel_name("work_entries", *event))
            .collect();
        assert_eq!(
            names,
            vec![
                "work_entries_insert",
                "work_entries_update",
                "work_entries_delete"
            ]
        );
    }
}
