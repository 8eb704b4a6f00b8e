//! User database operations

use rusqlite::{params, OptionalExtension, Result as SqliteResult, Row};

use crate::db::{now_rfc3339, parse_enum, parse_timestamp, Database};
use crate::models::{Role, User};

const USER_COLUMNS: &str = "id, email, name, password_hash, role, created_at, updated_at";

fn row_to_user(row: &Row) -> SqliteResult<User> {
    let role: String = row.get(4)?;
    let created_at: String = row.get(5)?;
    let updated_at: String = row.get(6)?;

    Ok(User {
        id: row.get(0)?,
        email: row.get(1)?,
        name: row.get(2)?,
        password_hash: row.get(3)?,
        role: parse_enum(4, &role)?,
        created_at: parse_timestamp(5, &created_at)?,
        updated_at: parse_timestamp(6, &updated_at)?,
    })
}

impl Database {
    /// Insert a user. Emails are stored lowercased so lookups are case-insensitive.
    pub fn create_user(
        &self,
        email: &str,
        name: &str,
        password_hash: &str,
        role: Role,
    ) -> SqliteResult<User> {
        let conn = self.conn.lock().unwrap();
        let now = now_rfc3339();
        let email = email.trim().to_lowercase();

        conn.execute(
            "INSERT INTO users (email, name, password_hash, role, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
            params![email, name.trim(), password_hash, role.as_ref(), now],
        )?;
        let id = conn.last_insert_rowid();

        conn.query_row(
            &format!("SELECT {} FROM users WHERE id = ?1", USER_COLUMNS),
            [id],
            row_to_user,
        )
    }

    pub fn get_user(&self, id: i64) -> SqliteResult<Option<User>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            &format!("SELECT {} FROM users WHERE id = ?1", USER_COLUMNS),
            [id],
            row_to_user,
        )
        .optional()
    }

    pub fn get_user_by_email(&self, email: &str) -> SqliteResult<Option<User>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            &format!("SELECT {} FROM users WHERE email = ?1", USER_COLUMNS),
            [email.trim().to_lowercase()],
            row_to_user,
        )
        .optional()
    }

    pub fn list_users(&self) -> SqliteResult<Vec<User>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!("SELECT {} FROM users ORDER BY id", USER_COLUMNS))?;
        let users = stmt.query_map([], row_to_user)?.collect::<SqliteResult<Vec<_>>>()?;
        Ok(users)
    }

    /// Change a user's role, returning the updated user (None if no such user)
    pub fn update_user_role(&self, id: i64, role: Role) -> SqliteResult<Option<User>> {
        let conn = self.conn.lock().unwrap();
        let rows_affected = conn.execute(
            "UPDATE users SET role = ?1, updated_at = ?2 WHERE id = ?3",
            params![role.as_ref(), now_rfc3339(), id],
        )?;
        drop(conn);

        if rows_affected == 0 {
            return Ok(None);
        }
        self.get_user(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_and_lookup_user() {
        let db = Database::new(":memory:").unwrap();
        let user = db
            .create_user(" Guide@Example.com ", "Minh", "hash", Role::Editor)
            .unwrap();
        assert_eq!(user.email, "guide@example.com");
        assert_eq!(user.role, Role::Editor);

        let found = db.get_user_by_email("GUIDE@example.com").unwrap().unwrap();
        assert_eq!(found.id, user.id);
        assert!(db.get_user(999).unwrap().is_none());
    }

    #[test]
    fn test_duplicate_email_rejected() {
        let db = Database::new(":memory:").unwrap();
        db.create_user("dup@example.com", "One", "h", Role::User).unwrap();
        assert!(db.create_user("DUP@example.com", "Two", "h", Role::User).is_err());
    }

    #[test]
    fn test_update_role() {
        let db = Database::new(":memory:").unwrap();
        let user = db.create_user("u@example.com", "U", "h", Role::User).unwrap();

        let updated = db.update_user_role(user.id, Role::Admin).unwrap().unwrap();
        assert_eq!(updated.role, Role::Admin);
        assert!(db.update_user_role(404, Role::Admin).unwrap().is_none());
        assert_eq!(db.list_users().unwrap().len(), 1);
    }
}
