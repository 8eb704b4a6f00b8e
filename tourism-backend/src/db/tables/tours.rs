//! Tour database operations

use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult, Row};

use crate::db::{now_rfc3339, parse_timestamp, Database};
use crate::models::{CreateTourRequest, Tour, UpdateTourRequest, DEFAULT_CURRENCY};

const TOUR_COLUMNS: &str = "id, title, slug, summary, description, price, currency, duration_days, \
                            location, cover_image, published, created_at, updated_at";

fn row_to_tour(row: &Row) -> SqliteResult<Tour> {
    let created_at: String = row.get(11)?;
    let updated_at: String = row.get(12)?;

    Ok(Tour {
        id: row.get(0)?,
        title: row.get(1)?,
        slug: row.get(2)?,
        summary: row.get(3)?,
        description: row.get(4)?,
        price: row.get(5)?,
        currency: row.get(6)?,
        duration_days: row.get(7)?,
        location: row.get(8)?,
        cover_image: row.get(9)?,
        published: row.get::<_, i64>(10)? != 0,
        created_at: parse_timestamp(11, &created_at)?,
        updated_at: parse_timestamp(12, &updated_at)?,
    })
}

fn fetch_tour(conn: &Connection, id: i64) -> SqliteResult<Option<Tour>> {
    conn.query_row(
        &format!("SELECT {} FROM tours WHERE id = ?1", TOUR_COLUMNS),
        [id],
        row_to_tour,
    )
    .optional()
}

impl Database {
    pub fn list_tours(&self, published_only: bool) -> SqliteResult<Vec<Tour>> {
        let conn = self.conn.lock().unwrap();
        let sql = if published_only {
            format!("SELECT {} FROM tours WHERE published = 1 ORDER BY created_at DESC, id DESC", TOUR_COLUMNS)
        } else {
            format!("SELECT {} FROM tours ORDER BY created_at DESC, id DESC", TOUR_COLUMNS)
        };
        let mut stmt = conn.prepare(&sql)?;
        let tours = stmt.query_map([], row_to_tour)?.collect::<SqliteResult<Vec<_>>>()?;
        Ok(tours)
    }

    pub fn get_tour(&self, id: i64) -> SqliteResult<Option<Tour>> {
        let conn = self.conn.lock().unwrap();
        fetch_tour(&conn, id)
    }

    pub fn get_tour_by_slug(&self, slug: &str) -> SqliteResult<Option<Tour>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            &format!("SELECT {} FROM tours WHERE slug = ?1", TOUR_COLUMNS),
            [slug],
            row_to_tour,
        )
        .optional()
    }

    pub fn create_tour(&self, req: &CreateTourRequest, slug: &str) -> SqliteResult<Tour> {
        let conn = self.conn.lock().unwrap();
        let now = now_rfc3339();

        conn.execute(
            "INSERT INTO tours (title, slug, summary, description, price, currency, duration_days,
                                location, cover_image, published, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?11)",
            params![
                req.title.trim(),
                slug,
                req.summary,
                req.description,
                req.price,
                req.currency.as_deref().unwrap_or(DEFAULT_CURRENCY),
                req.duration_days.unwrap_or(1),
                req.location,
                req.cover_image,
                req.published as i64,
                now,
            ],
        )?;

        let id = conn.last_insert_rowid();
        conn.query_row(
            &format!("SELECT {} FROM tours WHERE id = ?1", TOUR_COLUMNS),
            [id],
            row_to_tour,
        )
    }

    /// Apply a partial update; returns None when the tour does not exist
    pub fn update_tour(&self, id: i64, req: &UpdateTourRequest) -> SqliteResult<Option<Tour>> {
        let conn = self.conn.lock().unwrap();
        let Some(mut tour) = fetch_tour(&conn, id)? else {
            return Ok(None);
        };

        if let Some(title) = &req.title {
            tour.title = title.trim().to_string();
        }
        if let Some(slug) = &req.slug {
            tour.slug = slug.clone();
        }
        if req.summary.is_some() {
            tour.summary = req.summary.clone();
        }
        if req.description.is_some() {
            tour.description = req.description.clone();
        }
        if let Some(price) = req.price {
            tour.price = price;
        }
        if let Some(currency) = &req.currency {
            tour.currency = currency.clone();
        }
        if let Some(days) = req.duration_days {
            tour.duration_days = days;
        }
        if req.location.is_some() {
            tour.location = req.location.clone();
        }
        if req.cover_image.is_some() {
            tour.cover_image = req.cover_image.clone();
        }
        if let Some(published) = req.published {
            tour.published = published;
        }

        conn.execute(
            "UPDATE tours SET title = ?1, slug = ?2, summary = ?3, description = ?4, price = ?5,
                              currency = ?6, duration_days = ?7, location = ?8, cover_image = ?9,
                              published = ?10, updated_at = ?11
             WHERE id = ?12",
            params![
                tour.title,
                tour.slug,
                tour.summary,
                tour.description,
                tour.price,
                tour.currency,
                tour.duration_days,
                tour.location,
                tour.cover_image,
                tour.published as i64,
                now_rfc3339(),
                id,
            ],
        )?;

        fetch_tour(&conn, id)
    }

    pub fn delete_tour(&self, id: i64) -> SqliteResult<bool> {
        let conn = self.conn.lock().unwrap();
        let rows_affected = conn.execute("DELETE FROM tours WHERE id = ?1", [id])?;
        Ok(rows_affected > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(title: &str, published: bool) -> CreateTourRequest {
        CreateTourRequest {
            title: title.to_string(),
            slug: None,
            summary: Some("Two days in the mountains".into()),
            description: None,
            price: 1_200_000,
            currency: None,
            duration_days: Some(2),
            location: Some("Sapa".into()),
            cover_image: None,
            published,
        }
    }

    #[test]
    fn test_tour_crud() {
        let db = Database::new(":memory:").unwrap();
        let tour = db.create_tour(&sample("Sapa Trek", false), "sapa-trek").unwrap();
        assert_eq!(tour.currency, "VND");
        assert!(!tour.published);

        let update = UpdateTourRequest {
            price: Some(990_000),
            published: Some(true),
            ..Default::default()
        };
        let updated = db.update_tour(tour.id, &update).unwrap().unwrap();
        assert_eq!(updated.price, 990_000);
        assert!(updated.published);
        assert_eq!(updated.title, "Sapa Trek");

        assert_eq!(db.get_tour_by_slug("sapa-trek").unwrap().unwrap().id, tour.id);
        assert!(db.delete_tour(tour.id).unwrap());
        assert!(db.get_tour(tour.id).unwrap().is_none());
        assert!(db.update_tour(tour.id, &update).unwrap().is_none());
    }

    #[test]
    fn test_list_published_only() {
        let db = Database::new(":memory:").unwrap();
        db.create_tour(&sample("Draft", false), "draft").unwrap();
        db.create_tour(&sample("Live", true), "live").unwrap();

        assert_eq!(db.list_tours(false).unwrap().len(), 2);
        let published = db.list_tours(true).unwrap();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].slug, "live");
    }

    #[test]
    fn test_duplicate_slug_rejected() {
        let db = Database::new(":memory:").unwrap();
        db.create_tour(&sample("One", true), "same").unwrap();
        assert!(db.create_tour(&sample("Two", true), "same").is_err());
    }
}
