//! Bounded, persisted list of notifications.
//!
//! The list is ordered newest first and never holds more than
//! [`NotificationStore::CAPACITY`] records; adding to a full list silently
//! evicts the oldest ones. Every mutation writes the whole list to local
//! storage, and [`NotificationStore::load`] reads it back at startup.
//! Storage failures are logged and never reach the caller.

use std::sync::Arc;

use chrono::Utc;
use kbs_bridge::notification::{NotificationDescriptor, NotificationRecord};
use rand::Rng;

use crate::storage::{KeyValueStorage, StorageError};

const ID_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const ID_SUFFIX_LEN: usize = 9;

/// Generates a record id: creation time in milliseconds followed by a random
/// base-36 suffix.
fn generate_id() -> String {
    let mut rng = rand::rng();
    let suffix: String = (0..ID_SUFFIX_LEN)
        .map(|_| ID_ALPHABET[rng.random_range(0..ID_ALPHABET.len())] as char)
        .collect();
    format!("{}{suffix}", Utc::now().timestamp_millis())
}

pub struct NotificationStore {
    notifications: Vec<NotificationRecord>,
    storage: Arc<dyn KeyValueStorage>,
}

impl NotificationStore {
    /// Maximum number of records kept.
    pub const CAPACITY: usize = 50;
    /// Storage key holding the serialized list.
    pub const STORAGE_KEY: &'static str = "kbs-notifications";

    /// Creates an empty store without reading storage.
    pub fn new(storage: Arc<dyn KeyValueStorage>) -> Self {
        Self {
            notifications: Vec::new(),
            storage,
        }
    }

    /// Restores the list persisted by a previous session. A missing or
    /// malformed value yields an empty store.
    pub async fn load(storage: Arc<dyn KeyValueStorage>) -> Self {
        let mut store = Self::new(storage);
        match store.read_persisted().await {
            Ok(Some(mut notifications)) => {
                notifications.truncate(Self::CAPACITY);
                log::info!("Restored {} notification(-s)", notifications.len());
                store.notifications = notifications;
            }
            Ok(None) => log::debug!("No persisted notifications found"),
            Err(error) => log::error!("Error loading notifications: {error}"),
        }
        store
    }

    async fn read_persisted(&self) -> Result<Option<Vec<NotificationRecord>>, StorageError> {
        let Some(contents) = self.storage.get(Self::STORAGE_KEY).await? else {
            return Ok(None);
        };
        Ok(Some(serde_json::from_str(&contents)?))
    }

    async fn write_persisted(&self) -> Result<(), StorageError> {
        let contents = serde_json::to_string(&self.notifications)?;
        self.storage.set(Self::STORAGE_KEY, &contents).await
    }

    async fn persist(&self) {
        if let Err(error) = self.write_persisted().await {
            log::error!("Error saving notifications: {error}");
        }
    }

    /// Creates a record from `descriptor`, puts it at the front of the list
    /// and returns a copy of it.
    pub async fn add(&mut self, descriptor: NotificationDescriptor) -> NotificationRecord {
        let record = NotificationRecord {
            id: generate_id(),
            title: descriptor.title,
            message: descriptor.message,
            notification_type: descriptor.notification_type,
            timestamp: Utc::now(),
            read: false,
            details: descriptor.details,
        };
        log::debug!("Adding notification {}: {}", record.id, record.title);

        self.notifications.insert(0, record.clone());
        self.notifications.truncate(Self::CAPACITY);
        self.persist().await;

        record
    }

    /// Marks the record as read. Returns whether a record changed.
    pub async fn mark_as_read(&mut self, id: &str) -> bool {
        let Some(record) = self
            .notifications
            .iter_mut()
            .find(|record| record.id == id && !record.read)
        else {
            return false;
        };

        record.read = true;
        self.persist().await;
        true
    }

    /// Removes the record. Returns whether it existed.
    pub async fn clear(&mut self, id: &str) -> bool {
        let before = self.notifications.len();
        self.notifications.retain(|record| record.id != id);
        if self.notifications.len() == before {
            return false;
        }

        self.persist().await;
        true
    }

    pub async fn clear_all(&mut self) {
        self.notifications.clear();
        self.persist().await;
    }

    /// Records, newest first.
    pub fn notifications(&self) -> &[NotificationRecord] {
        &self.notifications
    }

    pub fn unread_count(&self) -> usize {
        self.notifications.iter().filter(|record| !record.read).count()
    }
}
