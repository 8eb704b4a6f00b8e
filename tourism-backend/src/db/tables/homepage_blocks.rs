//! Homepage block database operations
//!
//! Sort orders are kept contiguous (0..n) after every structural change.

use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult, Row};
use serde_json::{Map, Value};

use crate::db::{now_rfc3339, parse_enum, parse_json, parse_optional_timestamp, parse_timestamp, Database};
use crate::homepage::{normalized_order, plan_sync, SyncPlan};
use crate::models::{
    BlockStatus, CreateBlockRequest, HomepageBlock, SectionInput, SortItem, UpdateBlockRequest,
};
use crate::validation::FieldError;

const BLOCK_COLUMNS: &str =
    "id, block_type, title, fields, sort_order, status, visible, created_at, updated_at, published_at";

/// Outcome of a reorder request
#[derive(Debug)]
pub enum SortOutcome {
    Sorted(Vec<HomepageBlock>),
    /// An id in the request did not exist; nothing was changed
    UnknownBlock(i64),
}

/// Outcome of saving a full section list
#[derive(Debug)]
pub enum SaveOutcome {
    Saved { plan: SyncPlan, blocks: Vec<HomepageBlock> },
    /// The submission did not match the stored blocks; nothing was changed
    Rejected(Vec<FieldError>),
}

/// Outcome of a publish request
#[derive(Debug)]
pub enum PublishOutcome {
    Published(usize),
    /// An id in the request did not exist; nothing was changed
    UnknownBlock(i64),
}

fn row_to_block(row: &Row) -> SqliteResult<HomepageBlock> {
    let block_type: String = row.get(1)?;
    let fields: String = row.get(3)?;
    let status: String = row.get(5)?;
    let created_at: String = row.get(7)?;
    let updated_at: String = row.get(8)?;

    Ok(HomepageBlock {
        id: row.get(0)?,
        block_type: parse_enum(1, &block_type)?,
        title: row.get(2)?,
        fields: parse_json(3, &fields)?,
        sort_order: row.get(4)?,
        status: parse_enum(5, &status)?,
        visible: row.get::<_, i64>(6)? != 0,
        created_at: parse_timestamp(7, &created_at)?,
        updated_at: parse_timestamp(8, &updated_at)?,
        published_at: parse_optional_timestamp(9, row.get(9)?)?,
    })
}

fn fetch_block(conn: &Connection, id: i64) -> SqliteResult<Option<HomepageBlock>> {
    conn.query_row(
        &format!("SELECT {} FROM homepage_blocks WHERE id = ?1", BLOCK_COLUMNS),
        [id],
        row_to_block,
    )
    .optional()
}

fn fetch_all_blocks(conn: &Connection) -> SqliteResult<Vec<HomepageBlock>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM homepage_blocks ORDER BY sort_order, id",
        BLOCK_COLUMNS
    ))?;
    let blocks = stmt.query_map([], row_to_block)?.collect::<SqliteResult<Vec<_>>>()?;
    Ok(blocks)
}

fn fields_json(fields: &Map<String, Value>) -> String {
    serde_json::to_string(fields).unwrap_or_else(|_| "{}".to_string())
}

/// Rewrite sort orders so they run 0..n in their current relative order
fn renumber(conn: &Connection) -> SqliteResult<()> {
    let mut stmt = conn.prepare("SELECT id, sort_order FROM homepage_blocks")?;
    let current = stmt
        .query_map([], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?)))?
        .collect::<SqliteResult<Vec<_>>>()?;

    for (id, order) in normalized_order(&current) {
        conn.execute(
            "UPDATE homepage_blocks SET sort_order = ?1 WHERE id = ?2 AND sort_order != ?1",
            params![order, id],
        )?;
    }
    Ok(())
}

fn block_ids(conn: &Connection) -> SqliteResult<Vec<i64>> {
    let mut stmt = conn.prepare("SELECT id FROM homepage_blocks ORDER BY sort_order, id")?;
    let ids = stmt
        .query_map([], |row| row.get(0))?
        .collect::<SqliteResult<Vec<i64>>>()?;
    Ok(ids)
}

fn insert_block(conn: &Connection, section: &SectionInput, sort_order: i64, now: &str) -> SqliteResult<i64> {
    conn.execute(
        "INSERT INTO homepage_blocks (block_type, title, fields, sort_order, status, visible, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
        params![
            section.block_type.as_ref(),
            section.title,
            fields_json(&section.fields),
            sort_order,
            BlockStatus::Draft.as_ref(),
            section.visible.unwrap_or(true) as i64,
            now,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

impl Database {
    /// All blocks in display order; `published_only` limits to visible PUBLISHED blocks
    pub fn list_blocks(&self, published_only: bool) -> SqliteResult<Vec<HomepageBlock>> {
        let conn = self.conn.lock().unwrap();
        let blocks = fetch_all_blocks(&conn)?;
        if published_only {
            Ok(blocks
                .into_iter()
                .filter(|b| b.visible && b.status == BlockStatus::Published)
                .collect())
        } else {
            Ok(blocks)
        }
    }

    pub fn get_block(&self, id: i64) -> SqliteResult<Option<HomepageBlock>> {
        let conn = self.conn.lock().unwrap();
        fetch_block(&conn, id)
    }

    /// Create a DRAFT block at the end of the page
    pub fn create_block(&self, req: &CreateBlockRequest) -> SqliteResult<HomepageBlock> {
        let conn = self.conn.lock().unwrap();
        let next_order: i64 = conn.query_row(
            "SELECT COALESCE(MAX(sort_order) + 1, 0) FROM homepage_blocks",
            [],
            |row| row.get(0),
        )?;

        let section = SectionInput {
            id: None,
            block_type: req.block_type,
            title: req.title.clone(),
            fields: req.fields.clone(),
            visible: req.visible,
        };
        let id = insert_block(&conn, &section, next_order, &now_rfc3339())?;

        conn.query_row(
            &format!("SELECT {} FROM homepage_blocks WHERE id = ?1", BLOCK_COLUMNS),
            [id],
            row_to_block,
        )
    }

    /// Edit a block. Any edit returns the block to DRAFT until it is published again.
    pub fn update_block(
        &self,
        id: i64,
        req: &UpdateBlockRequest,
    ) -> SqliteResult<Option<HomepageBlock>> {
        let conn = self.conn.lock().unwrap();
        let Some(mut block) = fetch_block(&conn, id)? else {
            return Ok(None);
        };

        if req.title.is_some() {
            block.title = req.title.clone();
        }
        if let Some(fields) = &req.fields {
            block.fields = fields.clone();
        }
        if let Some(visible) = req.visible {
            block.visible = visible;
        }

        conn.execute(
            "UPDATE homepage_blocks SET title = ?1, fields = ?2, visible = ?3, status = ?4, updated_at = ?5
             WHERE id = ?6",
            params![
                block.title,
                fields_json(&block.fields),
                block.visible as i64,
                BlockStatus::Draft.as_ref(),
                now_rfc3339(),
                id,
            ],
        )?;

        fetch_block(&conn, id)
    }

    /// Delete a block and close the gap it leaves in the ordering
    pub fn delete_block(&self, id: i64) -> SqliteResult<bool> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        let rows_affected = tx.execute("DELETE FROM homepage_blocks WHERE id = ?1", [id])?;
        if rows_affected > 0 {
            renumber(&tx)?;
        }
        tx.commit()?;
        Ok(rows_affected > 0)
    }

    /// Apply a batch of sort orders in one transaction, then renumber 0..n
    pub fn sort_blocks(&self, items: &[SortItem]) -> SqliteResult<SortOutcome> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;

        for item in items {
            let rows_affected = tx.execute(
                "UPDATE homepage_blocks SET sort_order = ?1, updated_at = ?2 WHERE id = ?3",
                params![item.sort_order, now_rfc3339(), item.id],
            )?;
            if rows_affected == 0 {
                // Dropping the transaction rolls back the orders already applied
                return Ok(SortOutcome::UnknownBlock(item.id));
            }
        }

        renumber(&tx)?;
        let blocks = fetch_all_blocks(&tx)?;
        tx.commit()?;
        Ok(SortOutcome::Sorted(blocks))
    }

    /// Plan and persist a section sync in one transaction. Saved sections become DRAFT.
    pub fn save_sections(&self, sections: &[SectionInput]) -> SqliteResult<SaveOutcome> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        let plan = match plan_sync(&block_ids(&tx)?, sections) {
            Ok(plan) => plan,
            Err(errors) => return Ok(SaveOutcome::Rejected(errors)),
        };
        let now = now_rfc3339();

        for id in &plan.deletes {
            tx.execute("DELETE FROM homepage_blocks WHERE id = ?1", [id])?;
        }

        for (id, index) in &plan.updates {
            let section = &sections[*index];
            tx.execute(
                "UPDATE homepage_blocks SET block_type = ?1, title = ?2, fields = ?3, sort_order = ?4,
                                            visible = ?5, status = ?6, updated_at = ?7
                 WHERE id = ?8",
                params![
                    section.block_type.as_ref(),
                    section.title,
                    fields_json(&section.fields),
                    *index as i64,
                    section.visible.unwrap_or(true) as i64,
                    BlockStatus::Draft.as_ref(),
                    now,
                    id,
                ],
            )?;
        }

        for index in &plan.creates {
            insert_block(&tx, &sections[*index], *index as i64, &now)?;
        }

        let blocks = fetch_all_blocks(&tx)?;
        tx.commit()?;
        Ok(SaveOutcome::Saved { plan, blocks })
    }

    /// Publish the listed blocks, or every block when `ids` is None
    pub fn publish_blocks(&self, ids: Option<&[i64]>) -> SqliteResult<PublishOutcome> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        let now = now_rfc3339();

        let changed = match ids {
            None => tx.execute(
                "UPDATE homepage_blocks SET status = ?1, published_at = ?2, updated_at = ?2 WHERE status != ?1",
                params![BlockStatus::Published.as_ref(), now],
            )?,
            Some(ids) => {
                let mut changed = 0;
                for id in ids {
                    let exists = tx
                        .query_row("SELECT 1 FROM homepage_blocks WHERE id = ?1", [id], |_| Ok(()))
                        .optional()?
                        .is_some();
                    if !exists {
                        return Ok(PublishOutcome::UnknownBlock(*id));
                    }
                    changed += tx.execute(
                        "UPDATE homepage_blocks SET status = ?1, published_at = ?2, updated_at = ?2
                         WHERE id = ?3 AND status != ?1",
                        params![BlockStatus::Published.as_ref(), now, id],
                    )?;
                }
                changed
            }
        };

        tx.commit()?;
        Ok(PublishOutcome::Published(changed))
    }

    pub fn unpublish_block(&self, id: i64) -> SqliteResult<Option<HomepageBlock>> {
        let conn = self.conn.lock().unwrap();
        let rows_affected = conn.execute(
            "UPDATE homepage_blocks SET status = ?1, updated_at = ?2 WHERE id = ?3",
            params![BlockStatus::Draft.as_ref(), now_rfc3339(), id],
        )?;
        if rows_affected == 0 {
            return Ok(None);
        }
        fetch_block(&conn, id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BlockType;
    use std::sync::Arc;
    use serde_json::json;

    fn create(db: &Database, block_type: BlockType, fields: Value) -> HomepageBlock {
        db.create_block(&CreateBlockRequest {
            block_type,
            title: None,
            fields: fields.as_object().cloned().unwrap(),
            visible: None,
        })
        .unwrap()
    }

    fn orders(db: &Database) -> Vec<(i64, i64)> {
        db.list_blocks(false)
            .unwrap()
            .iter()
            .map(|b| (b.id, b.sort_order))
            .collect()
    }

    #[test]
    fn test_create_appends_as_draft() {
        let db = Database::new(":memory:").unwrap();
        let a = create(&db, BlockType::Hero, json!({"heading": "Hi"}));
        let b = create(&db, BlockType::TourList, json!({}));
        assert_eq!(a.sort_order, 0);
        assert_eq!(b.sort_order, 1);
        assert_eq!(a.status, BlockStatus::Draft);
        assert!(db.list_blocks(true).unwrap().is_empty());
    }

    #[test]
    fn test_publish_and_edit_returns_to_draft() {
        let db = Database::new(":memory:").unwrap();
        let a = create(&db, BlockType::Hero, json!({"heading": "Hi"}));
        create(&db, BlockType::TourList, json!({}));

        assert!(matches!(db.publish_blocks(None).unwrap(), PublishOutcome::Published(2)));
        assert!(matches!(db.publish_blocks(None).unwrap(), PublishOutcome::Published(0)));
        assert_eq!(db.list_blocks(true).unwrap().len(), 2);

        let edited = db
            .update_block(a.id, &UpdateBlockRequest {
                title: Some("Welcome".into()),
                ..Default::default()
            })
            .unwrap()
            .unwrap();
        assert_eq!(edited.status, BlockStatus::Draft);
        assert_eq!(db.list_blocks(true).unwrap().len(), 1);

        assert!(matches!(
            db.publish_blocks(Some(&[a.id])).unwrap(),
            PublishOutcome::Published(1)
        ));
        let published = db.get_block(a.id).unwrap().unwrap();
        assert!(published.published_at.is_some());
    }

    #[test]
    fn test_hidden_blocks_not_public() {
        let db = Database::new(":memory:").unwrap();
        let a = create(&db, BlockType::Text, json!({"body": "x"}));
        db.update_block(a.id, &UpdateBlockRequest {
            visible: Some(false),
            ..Default::default()
        })
        .unwrap();
        db.publish_blocks(None).unwrap();
        assert!(db.list_blocks(true).unwrap().is_empty());
    }

    #[test]
    fn test_sort_and_delete_keep_orders_contiguous() {
        let db = Database::new(":memory:").unwrap();
        let a = create(&db, BlockType::Hero, json!({"heading": "A"}));
        let b = create(&db, BlockType::Text, json!({"body": "B"}));
        let c = create(&db, BlockType::Text, json!({"body": "C"}));

        let outcome = db
            .sort_blocks(&[
                SortItem { id: c.id, sort_order: 0 },
                SortItem { id: a.id, sort_order: 10 },
                SortItem { id: b.id, sort_order: 5 },
            ])
            .unwrap();
        assert!(matches!(outcome, SortOutcome::Sorted(_)));
        assert_eq!(orders(&db), vec![(c.id, 0), (b.id, 1), (a.id, 2)]);

        assert!(db.delete_block(b.id).unwrap());
        assert_eq!(orders(&db), vec![(c.id, 0), (a.id, 1)]);
    }

    #[test]
    fn test_sort_with_unknown_id_changes_nothing() {
        let db = Database::new(":memory:").unwrap();
        let a = create(&db, BlockType::Hero, json!({"heading": "A"}));
        let b = create(&db, BlockType::Text, json!({"body": "B"}));

        let outcome = db
            .sort_blocks(&[
                SortItem { id: b.id, sort_order: 0 },
                SortItem { id: 999, sort_order: 1 },
            ])
            .unwrap();
        assert!(matches!(outcome, SortOutcome::UnknownBlock(999)));
        assert_eq!(orders(&db), vec![(a.id, 0), (b.id, 1)]);
    }

    #[test]
    fn test_save_sections() {
        let db = Database::new(":memory:").unwrap();
        let a = create(&db, BlockType::Hero, json!({"heading": "A"}));
        let b = create(&db, BlockType::Text, json!({"body": "B"}));

        let sections: Vec<SectionInput> = serde_json::from_value(json!([
            {"id": b.id, "block_type": "TEXT", "fields": {"body": "B2"}},
            {"block_type": "CTA", "fields": {"label": "Book now", "href": "/tours"}}
        ]))
        .unwrap();
        let (plan, blocks) = match db.save_sections(&sections).unwrap() {
            SaveOutcome::Saved { plan, blocks } => (plan, blocks),
            SaveOutcome::Rejected(errors) => panic!("unexpected rejection: {:?}", errors),
        };
        assert_eq!(plan.deletes, vec![a.id]);

        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].id, b.id);
        assert_eq!(blocks[0].fields["body"], "B2");
        assert_eq!(blocks[1].block_type, BlockType::Cta);
        assert_eq!(blocks[1].sort_order, 1);
        assert!(db.get_block(a.id).unwrap().is_none());
    }

    fn sections(value: Value) -> Vec<SectionInput> {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_save_sections_rejects_stale_ids_without_changes() {
        let db = Database::new(":memory:").unwrap();
        let a = create(&db, BlockType::Hero, json!({"heading": "A"}));

        let submitted = sections(json!([
            {"id": a.id, "block_type": "HERO", "fields": {"heading": "A2"}},
            {"id": 999, "block_type": "TEXT", "fields": {"body": "x"}}
        ]));
        match db.save_sections(&submitted).unwrap() {
            SaveOutcome::Rejected(errors) => assert_eq!(errors[0].field, "sections[1].id"),
            other => panic!("expected rejection, got {:?}", other),
        }
        assert_eq!(db.get_block(a.id).unwrap().unwrap().fields["heading"], "A");
    }

    #[test]
    fn test_concurrent_saves_replace_whole_list() {
        let db = Arc::new(Database::new(":memory:").unwrap());
        create(&db, BlockType::Hero, json!({"heading": "Old"}));
        let submitted = sections(json!([
            {"block_type": "HERO", "fields": {"heading": "New"}},
            {"block_type": "TEXT", "fields": {"body": "Intro"}},
            {"block_type": "TOUR_LIST", "fields": {}}
        ]));

        std::thread::scope(|scope| {
            for _ in 0..4 {
                let db = db.clone();
                let submitted = &submitted;
                scope.spawn(move || {
                    assert!(matches!(
                        db.save_sections(submitted).unwrap(),
                        SaveOutcome::Saved { .. }
                    ));
                });
            }
        });

        let stored = orders(&db);
        assert_eq!(stored.len(), 3);
        assert_eq!(
            stored.iter().map(|(_, order)| *order).collect::<Vec<_>>(),
            vec![0, 1, 2]
        );
    }

    #[test]
    fn test_publish_with_unknown_id_changes_nothing() {
        let db = Database::new(":memory:").unwrap();
        let a = create(&db, BlockType::Hero, json!({"heading": "A"}));

        let outcome = db.publish_blocks(Some(&[a.id, 999])).unwrap();
        assert!(matches!(outcome, PublishOutcome::UnknownBlock(999)));
        assert_eq!(db.get_block(a.id).unwrap().unwrap().status, BlockStatus::Draft);
    }
}
