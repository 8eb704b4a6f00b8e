use crate::db::Database;
use crate::errors::is_foreign_key_violation;
use crate::models::{SyncEvent, SyncStatus};

/// Record a channel sync event. A failure to write the log row is logged and swallowed,
/// it never fails the operation being logged.
///
/// A row that names a channel which no longer exists is stored without the
/// channel, with the stale id kept in the message.
pub fn log_channel_sync_event(db: &Database, event: SyncEvent) {
    match event.status {
        SyncStatus::Success => log::info!(
            "[N8N] {} {} channel={:?} http={:?}",
            event.direction,
            event.event,
            event.channel_id,
            event.http_status
        ),
        SyncStatus::Retrying => log::warn!(
            "[N8N] Retrying {} channel={:?}: {}",
            event.event,
            event.channel_id,
            event.message.as_deref().unwrap_or("-")
        ),
        SyncStatus::Failed => log::error!(
            "[N8N] {} {} failed channel={:?}: {}",
            event.direction,
            event.event,
            event.channel_id,
            event.message.as_deref().unwrap_or("-")
        ),
    }

    let result = match db.insert_sync_log(&event) {
        Err(e) if is_foreign_key_violation(&e) && event.channel_id.is_some() => {
            db.insert_sync_log(&detach_channel(event.clone()))
        }
        other => other,
    };
    if let Err(e) = result {
        log::error!("[N8N] Failed to write sync log for '{}': {}", event.event, e);
    }
}

fn detach_channel(mut event: SyncEvent) -> SyncEvent {
    if let Some(id) = event.channel_id.take() {
        let note = format!("channel {} no longer exists", id);
        event.message = Some(match event.message {
            Some(message) => format!("{}; {}", note, message),
            None => note,
        });
    }
    event
}
