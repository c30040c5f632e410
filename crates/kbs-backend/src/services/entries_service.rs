use chrono::{Local, Utc};
use kbs_bridge::MessageFromBackend;
use kbs_bridge::notification::{NotificationDescriptor, NotificationType};
use kbs_bridge::work_entry::{EntryFilter, WorkEntry};
use kbs_supabase::{RestClient, SupabaseError};

use super::AppContextHandle;
use crate::{ledger, summarizer};

const NOT_CONFIGURED: &str = "Backend is not configured";

/// Handles an incoming work entries request (see
/// [`kbs_bridge::MessageToBackend::WorkEntriesRequest`]): fetches every
/// entry, newest first, and answers with the ones matching `filter`.
pub async fn handle_work_entries_request(context: AppContextHandle, filter: EntryFilter) {
    let (rest, table) = {
        let state = context.state.read().await;
        (state.rest.clone(), state.config.backend.table.clone())
    };
    let Some(rest) = rest else {
        context
            .send_notification(NotificationType::Warning, NOT_CONFIGURED)
            .await;
        return;
    };

    let entries = match rest
        .select::<WorkEntry>(&table, &[("select", "*"), ("order", "created_at.desc")])
        .await
    {
        Ok(entries) => entries,
        Err(error) => {
            log::error!("Error fetching work entries: {error}");
            context
                .send_notification(
                    NotificationType::Error,
                    format!("Error fetching entries: {error}"),
                )
                .await;
            return;
        }
    };
    log::debug!("Fetched {} work entr(-y/-ies)", entries.len());

    let entries = ledger::filter_entries(entries, &filter);
    let totals = ledger::totals(&entries);
    context
        .send(MessageFromBackend::WorkEntriesResponse { entries, totals })
        .await;
}

/// Deletes a work entry and records the outcome in the notification list.
pub async fn handle_delete_work_entry(context: AppContextHandle, id: String) {
    let (rest, table) = {
        let state = context.state.read().await;
        (state.rest.clone(), state.config.backend.table.clone())
    };

    let descriptor = match rest {
        Some(rest) => match rest.delete_eq(&table, "id", &id).await {
            Ok(()) => {
                log::info!("Deleted work entry {id}");
                summarizer::entry_deleted()
            }
            Err(error) => {
                log::error!("Error deleting work entry {id}: {error}");
                summarizer::delete_failed(&error.to_string())
            }
        },
        None => summarizer::delete_failed(NOT_CONFIGURED),
    };
    context.center.add_notification(descriptor).await;
}

async fn save_entry(
    rest: &RestClient,
    table: &str,
    entry: &WorkEntry,
) -> Result<NotificationDescriptor, SupabaseError> {
    match entry.id.as_deref().filter(|id| !id.is_empty()) {
        Some(id) => {
            let changes = ledger::update_row(entry, Utc::now())?;
            rest.update_eq(table, "id", id, &changes).await?;
            log::info!("Updated work entry {id}");
            Ok(summarizer::entry_updated())
        }
        None => {
            let row = ledger::new_admin_row(entry, Local::now().time())?;
            rest.insert(table, &row).await?;
            log::info!("Created work entry for {}", entry.rental_person_name);
            Ok(summarizer::entry_created())
        }
    }
}

/// Creates or updates a work entry and records the outcome in the
/// notification list.
pub async fn handle_save_work_entry(context: AppContextHandle, entry: WorkEntry) {
    let (rest, table) = {
        let state = context.state.read().await;
        (state.rest.clone(), state.config.backend.table.clone())
    };

    let descriptor = match rest {
        Some(rest) => save_entry(&rest, &table, &entry)
            .await
            .unwrap_or_else(|error| {
                log::error!("Error saving work entry: {error}");
                summarizer::save_failed(&error.to_string())
            }),
        None => summarizer::save_failed(NOT_CONFIGURED),
    };
    context.center.add_notification(descriptor).await;
}
