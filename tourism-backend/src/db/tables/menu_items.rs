//! Menu item database operations

use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult, Row};

use crate::db::{now_rfc3339, parse_timestamp, Database};
use crate::models::{CreateMenuItemRequest, MenuItem, SortItem, UpdateMenuItemRequest};

const MENU_COLUMNS: &str = "id, label, url, parent_id, sort_order, visible, created_at, updated_at";

fn row_to_menu_item(row: &Row) -> SqliteResult<MenuItem> {
    let created_at: String = row.get(6)?;
    let updated_at: String = row.get(7)?;

    Ok(MenuItem {
        id: row.get(0)?,
        label: row.get(1)?,
        url: row.get(2)?,
        parent_id: row.get(3)?,
        sort_order: row.get(4)?,
        visible: row.get::<_, i64>(5)? != 0,
        created_at: parse_timestamp(6, &created_at)?,
        updated_at: parse_timestamp(7, &updated_at)?,
    })
}

fn fetch_menu_item(conn: &Connection, id: i64) -> SqliteResult<Option<MenuItem>> {
    conn.query_row(
        &format!("SELECT {} FROM menu_items WHERE id = ?1", MENU_COLUMNS),
        [id],
        row_to_menu_item,
    )
    .optional()
}

impl Database {
    /// Flat list ordered by parent, then sort order
    pub fn list_menu_items(&self, visible_only: bool) -> SqliteResult<Vec<MenuItem>> {
        let conn = self.conn.lock().unwrap();
        let filter = if visible_only { "WHERE visible = 1" } else { "" };
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM menu_items {} ORDER BY COALESCE(parent_id, 0), sort_order, id",
            MENU_COLUMNS, filter
        ))?;
        let items = stmt
            .query_map([], row_to_menu_item)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(items)
    }

    pub fn get_menu_item(&self, id: i64) -> SqliteResult<Option<MenuItem>> {
        let conn = self.conn.lock().unwrap();
        fetch_menu_item(&conn, id)
    }

    /// Insert an item; without an explicit sort order it goes after its siblings
    pub fn create_menu_item(&self, req: &CreateMenuItemRequest) -> SqliteResult<MenuItem> {
        let conn = self.conn.lock().unwrap();
        let sort_order = match req.sort_order {
            Some(order) => order,
            None => conn.query_row(
                "SELECT COALESCE(MAX(sort_order) + 1, 0) FROM menu_items WHERE parent_id IS ?1",
                [req.parent_id],
                |row| row.get(0),
            )?,
        };
        let now = now_rfc3339();

        conn.execute(
            "INSERT INTO menu_items (label, url, parent_id, sort_order, visible, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
            params![
                req.label.trim(),
                req.url.trim(),
                req.parent_id,
                sort_order,
                req.visible.unwrap_or(true) as i64,
                now,
            ],
        )?;

        let id = conn.last_insert_rowid();
        conn.query_row(
            &format!("SELECT {} FROM menu_items WHERE id = ?1", MENU_COLUMNS),
            [id],
            row_to_menu_item,
        )
    }

    pub fn update_menu_item(
        &self,
        id: i64,
        req: &UpdateMenuItemRequest,
    ) -> SqliteResult<Option<MenuItem>> {
        let conn = self.conn.lock().unwrap();
        let Some(mut item) = fetch_menu_item(&conn, id)? else {
            return Ok(None);
        };

        if let Some(label) = &req.label {
            item.label = label.trim().to_string();
        }
        if let Some(url) = &req.url {
            item.url = url.trim().to_string();
        }
        if let Some(parent_id) = req.parent_id {
            item.parent_id = parent_id;
        }
        if let Some(order) = req.sort_order {
            item.sort_order = order;
        }
        if let Some(visible) = req.visible {
            item.visible = visible;
        }

        conn.execute(
            "UPDATE menu_items SET label = ?1, url = ?2, parent_id = ?3, sort_order = ?4, visible = ?5,
                                   updated_at = ?6
             WHERE id = ?7",
            params![
                item.label,
                item.url,
                item.parent_id,
                item.sort_order,
                item.visible as i64,
                now_rfc3339(),
                id,
            ],
        )?;

        fetch_menu_item(&conn, id)
    }

    /// Delete an item; its children go with it (ON DELETE CASCADE)
    pub fn delete_menu_item(&self, id: i64) -> SqliteResult<bool> {
        let conn = self.conn.lock().unwrap();
        let rows_affected = conn.execute("DELETE FROM menu_items WHERE id = ?1", [id])?;
        Ok(rows_affected > 0)
    }

    /// Apply sort orders in one transaction. Returns the first unknown id, if any,
    /// in which case nothing is written.
    pub fn sort_menu_items(&self, items: &[SortItem]) -> SqliteResult<Option<i64>> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        let now = now_rfc3339();

        for item in items {
            let rows_affected = tx.execute(
                "UPDATE menu_items SET sort_order = ?1, updated_at = ?2 WHERE id = ?3",
                params![item.sort_order, now, item.id],
            )?;
            if rows_affected == 0 {
                return Ok(Some(item.id));
            }
        }

        tx.commit()?;
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create(db: &Database, label: &str, parent_id: Option<i64>) -> MenuItem {
        db.create_menu_item(&CreateMenuItemRequest {
            label: label.to_string(),
            url: format!("/{}", label.to_lowercase()),
            parent_id,
            sort_order: None,
            visible: None,
        })
        .unwrap()
    }

    #[test]
    fn test_sibling_order_defaults() {
        let db = Database::new(":memory:").unwrap();
        let tours = create(&db, "Tours", None);
        let stays = create(&db, "Homestays", None);
        let north = create(&db, "North", Some(tours.id));
        let south = create(&db, "South", Some(tours.id));

        assert_eq!(tours.sort_order, 0);
        assert_eq!(stays.sort_order, 1);
        assert_eq!(north.sort_order, 0);
        assert_eq!(south.sort_order, 1);
    }

    #[test]
    fn test_delete_cascades_children() {
        let db = Database::new(":memory:").unwrap();
        let tours = create(&db, "Tours", None);
        create(&db, "North", Some(tours.id));

        assert!(db.delete_menu_item(tours.id).unwrap());
        assert!(db.list_menu_items(false).unwrap().is_empty());
    }

    #[test]
    fn test_update_moves_to_top_level() {
        let db = Database::new(":memory:").unwrap();
        let tours = create(&db, "Tours", None);
        let north = create(&db, "North", Some(tours.id));

        let moved = db
            .update_menu_item(north.id, &UpdateMenuItemRequest {
                parent_id: Some(None),
                ..Default::default()
            })
            .unwrap()
            .unwrap();
        assert_eq!(moved.parent_id, None);
    }

    #[test]
    fn test_sort_unknown_id_rolls_back() {
        let db = Database::new(":memory:").unwrap();
        let a = create(&db, "A", None);

        let unknown = db
            .sort_menu_items(&[SortItem { id: a.id, sort_order: 9 }, SortItem { id: 77, sort_order: 0 }])
            .unwrap();
        assert_eq!(unknown, Some(77));
        assert_eq!(db.get_menu_item(a.id).unwrap().unwrap().sort_order, 0);

        assert_eq!(db.sort_menu_items(&[SortItem { id: a.id, sort_order: 3 }]).unwrap(), None);
        assert_eq!(db.get_menu_item(a.id).unwrap().unwrap().sort_order, 3);
    }
}
