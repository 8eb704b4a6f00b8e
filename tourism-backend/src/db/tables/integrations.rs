//! Integration channel and sync log database operations

use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult, Row, ToSql};

use crate::db::{now_rfc3339, parse_enum, parse_timestamp, Database};
use crate::models::{
    ChannelSyncLog, CreateChannelRequest, IntegrationChannel, SyncEvent, SyncLogFilter,
    UpdateChannelRequest,
};

/// Upper bound for sync log listings
pub const MAX_SYNC_LOG_LIST: i64 = 500;

const CHANNEL_COLUMNS: &str = "id, name, channel_type, webhook_url, enabled, created_at, updated_at";
const LOG_COLUMNS: &str =
    "id, channel_id, direction, event, status, http_status, message, payload, created_at";

fn row_to_channel(row: &Row) -> SqliteResult<IntegrationChannel> {
    let created_at: String = row.get(5)?;
    let updated_at: String = row.get(6)?;

    Ok(IntegrationChannel {
        id: row.get(0)?,
        name: row.get(1)?,
        channel_type: row.get(2)?,
        webhook_url: row.get(3)?,
        enabled: row.get::<_, i64>(4)? != 0,
        created_at: parse_timestamp(5, &created_at)?,
        updated_at: parse_timestamp(6, &updated_at)?,
    })
}

fn row_to_log(row: &Row) -> SqliteResult<ChannelSyncLog> {
    let direction: String = row.get(2)?;
    let status: String = row.get(4)?;
    let payload: Option<String> = row.get(7)?;
    let created_at: String = row.get(8)?;

    Ok(ChannelSyncLog {
        id: row.get(0)?,
        channel_id: row.get(1)?,
        direction: parse_enum(2, &direction)?,
        event: row.get(3)?,
        status: parse_enum(4, &status)?,
        http_status: row.get(5)?,
        message: row.get(6)?,
        // Payloads are stored for inspection only; unreadable ones are dropped
        payload: payload.and_then(|p| serde_json::from_str(&p).ok()),
        created_at: parse_timestamp(8, &created_at)?,
    })
}

fn fetch_channel(conn: &Connection, id: i64) -> SqliteResult<Option<IntegrationChannel>> {
    conn.query_row(
        &format!("SELECT {} FROM integration_channels WHERE id = ?1", CHANNEL_COLUMNS),
        [id],
        row_to_channel,
    )
    .optional()
}

impl Database {
    pub fn list_channels(&self) -> SqliteResult<Vec<IntegrationChannel>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM integration_channels ORDER BY name",
            CHANNEL_COLUMNS
        ))?;
        let channels = stmt
            .query_map([], row_to_channel)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(channels)
    }

    pub fn list_enabled_channels(&self) -> SqliteResult<Vec<IntegrationChannel>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM integration_channels WHERE enabled = 1 ORDER BY id",
            CHANNEL_COLUMNS
        ))?;
        let channels = stmt
            .query_map([], row_to_channel)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(channels)
    }

    pub fn get_channel(&self, id: i64) -> SqliteResult<Option<IntegrationChannel>> {
        let conn = self.conn.lock().unwrap();
        fetch_channel(&conn, id)
    }

    pub fn create_channel(&self, req: &CreateChannelRequest) -> SqliteResult<IntegrationChannel> {
        let conn = self.conn.lock().unwrap();
        let now = now_rfc3339();

        conn.execute(
            "INSERT INTO integration_channels (name, channel_type, webhook_url, enabled, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
            params![
                req.name.trim(),
                req.channel_type.as_deref().unwrap_or("n8n"),
                req.webhook_url.trim(),
                req.enabled as i64,
                now,
            ],
        )?;

        let id = conn.last_insert_rowid();
        conn.query_row(
            &format!("SELECT {} FROM integration_channels WHERE id = ?1", CHANNEL_COLUMNS),
            [id],
            row_to_channel,
        )
    }

    pub fn update_channel(
        &self,
        id: i64,
        req: &UpdateChannelRequest,
    ) -> SqliteResult<Option<IntegrationChannel>> {
        let conn = self.conn.lock().unwrap();
        let Some(mut channel) = fetch_channel(&conn, id)? else {
            return Ok(None);
        };

        if let Some(name) = &req.name {
            channel.name = name.trim().to_string();
        }
        if let Some(channel_type) = &req.channel_type {
            channel.channel_type = channel_type.clone();
        }
        if let Some(url) = &req.webhook_url {
            channel.webhook_url = url.trim().to_string();
        }
        if let Some(enabled) = req.enabled {
            channel.enabled = enabled;
        }

        conn.execute(
            "UPDATE integration_channels SET name = ?1, channel_type = ?2, webhook_url = ?3, enabled = ?4,
                                             updated_at = ?5
             WHERE id = ?6",
            params![
                channel.name,
                channel.channel_type,
                channel.webhook_url,
                channel.enabled as i64,
                now_rfc3339(),
                id,
            ],
        )?;

        fetch_channel(&conn, id)
    }

    pub fn delete_channel(&self, id: i64) -> SqliteResult<bool> {
        let conn = self.conn.lock().unwrap();
        let rows_affected = conn.execute("DELETE FROM integration_channels WHERE id = ?1", [id])?;
        Ok(rows_affected > 0)
    }

    pub fn insert_sync_log(&self, event: &SyncEvent) -> SqliteResult<i64> {
        let conn = self.conn.lock().unwrap();
        let payload = event
            .payload
            .as_ref()
            .and_then(|p| serde_json::to_string(p).ok());

        conn.execute(
            "INSERT INTO channel_sync_logs (channel_id, direction, event, status, http_status, message, payload, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                event.channel_id,
                event.direction.as_ref(),
                event.event,
                event.status.as_ref(),
                event.http_status,
                event.message,
                payload,
                now_rfc3339(),
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Newest first, filtered by channel and status
    pub fn list_sync_logs(&self, filter: &SyncLogFilter) -> SqliteResult<Vec<ChannelSyncLog>> {
        let conn = self.conn.lock().unwrap();

        let mut clauses: Vec<&str> = Vec::new();
        let mut values: Vec<Box<dyn ToSql>> = Vec::new();
        if let Some(channel_id) = filter.channel_id {
            clauses.push("channel_id = ?");
            values.push(Box::new(channel_id));
        }
        if let Some(status) = filter.status {
            clauses.push("status = ?");
            values.push(Box::new(status.as_ref().to_string()));
        }
        let where_sql = if clauses.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", clauses.join(" AND "))
        };
        let limit = filter.limit.unwrap_or(100).clamp(1, MAX_SYNC_LOG_LIST);

        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM channel_sync_logs {} ORDER BY id DESC LIMIT {}",
            LOG_COLUMNS, where_sql, limit
        ))?;
        let params: Vec<&dyn ToSql> = values.iter().map(|v| v.as_ref()).collect();
        let logs = stmt
            .query_map(params.as_slice(), row_to_log)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(logs)
    }
}
