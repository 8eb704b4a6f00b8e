//! Auth session database operations

use chrono::{Duration, Utc};
use rusqlite::{params, OptionalExtension, Result as SqliteResult};

use crate::db::{parse_timestamp, Database};
use crate::models::Session;

impl Database {
    /// Create a session for a user with the given token and lifetime
    pub fn create_session(&self, user_id: i64, token: &str, ttl_hours: i64) -> SqliteResult<Session> {
        let conn = self.conn.lock().unwrap();
        let now = Utc::now();
        let expires_at = now + Duration::hours(ttl_hours);

        conn.execute(
            "INSERT INTO auth_sessions (token, user_id, created_at, expires_at) VALUES (?1, ?2, ?3, ?4)",
            params![token, user_id, now.to_rfc3339(), expires_at.to_rfc3339()],
        )?;

        Ok(Session {
            id: conn.last_insert_rowid(),
            token: token.to_string(),
            user_id,
            created_at: now,
            expires_at,
        })
    }

    /// Look up a session by token, returning None when missing or expired
    pub fn validate_session(&self, token: &str) -> SqliteResult<Option<Session>> {
        let conn = self.conn.lock().unwrap();

        let session = conn
            .query_row(
                "SELECT id, token, user_id, created_at, expires_at FROM auth_sessions WHERE token = ?1",
                [token],
                |row| {
                    let created_at: String = row.get(3)?;
                    let expires_at: String = row.get(4)?;
                    Ok(Session {
                        id: row.get(0)?,
                        token: row.get(1)?,
                        user_id: row.get(2)?,
                        created_at: parse_timestamp(3, &created_at)?,
                        expires_at: parse_timestamp(4, &expires_at)?,
                    })
                },
            )
            .optional()?;

        Ok(session.filter(|s| s.expires_at > Utc::now()))
    }

    /// Delete a session (logout)
    pub fn delete_session(&self, token: &str) -> SqliteResult<bool> {
        let conn = self.conn.lock().unwrap();
        let rows_affected = conn.execute("DELETE FROM auth_sessions WHERE token = ?1", [token])?;
        Ok(rows_affected > 0)
    }

    /// Remove every expired session, returning how many were purged
    pub fn purge_expired_sessions(&self) -> SqliteResult<usize> {
        let conn = self.conn.lock().unwrap();
        // RFC 3339 strings in UTC compare lexicographically in time order
        conn.execute(
            "DELETE FROM auth_sessions WHERE expires_at <= ?1",
            [Utc::now().to_rfc3339()],
        )
    }
}
