//! Homestay database operations

use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult, Row};

use crate::db::{now_rfc3339, parse_json, parse_timestamp, Database};
use crate::models::{CreateHomestayRequest, Homestay, UpdateHomestayRequest, DEFAULT_CURRENCY};

const HOMESTAY_COLUMNS: &str = "id, name, slug, description, location, price_per_night, currency, \
                                max_guests, amenities, cover_image, published, created_at, updated_at";

fn row_to_homestay(row: &Row) -> SqliteResult<Homestay> {
    let amenities: String = row.get(8)?;
    let created_at: String = row.get(11)?;
    let updated_at: String = row.get(12)?;

    Ok(Homestay {
        id: row.get(0)?,
        name: row.get(1)?,
        slug: row.get(2)?,
        description: row.get(3)?,
        location: row.get(4)?,
        price_per_night: row.get(5)?,
        currency: row.get(6)?,
        max_guests: row.get(7)?,
        amenities: parse_json(8, &amenities)?,
        cover_image: row.get(9)?,
        published: row.get::<_, i64>(10)? != 0,
        created_at: parse_timestamp(11, &created_at)?,
        updated_at: parse_timestamp(12, &updated_at)?,
    })
}

fn fetch_homestay(conn: &Connection, id: i64) -> SqliteResult<Option<Homestay>> {
    conn.query_row(
        &format!("SELECT {} FROM homestays WHERE id = ?1", HOMESTAY_COLUMNS),
        [id],
        row_to_homestay,
    )
    .optional()
}

fn amenities_json(amenities: &[String]) -> String {
    let trimmed: Vec<&str> = amenities.iter().map(|a| a.trim()).collect();
    serde_json::to_string(&trimmed).unwrap_or_else(|_| "[]".to_string())
}

impl Database {
    pub fn list_homestays(&self, published_only: bool) -> SqliteResult<Vec<Homestay>> {
        let conn = self.conn.lock().unwrap();
        let filter = if published_only { "WHERE published = 1" } else { "" };
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM homestays {} ORDER BY created_at DESC, id DESC",
            HOMESTAY_COLUMNS, filter
        ))?;
        let homestays = stmt
            .query_map([], row_to_homestay)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(homestays)
    }

    pub fn get_homestay(&self, id: i64) -> SqliteResult<Option<Homestay>> {
        let conn = self.conn.lock().unwrap();
        fetch_homestay(&conn, id)
    }

    pub fn get_homestay_by_slug(&self, slug: &str) -> SqliteResult<Option<Homestay>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            &format!("SELECT {} FROM homestays WHERE slug = ?1", HOMESTAY_COLUMNS),
            [slug],
            row_to_homestay,
        )
        .optional()
    }

    pub fn create_homestay(&self, req: &CreateHomestayRequest, slug: &str) -> SqliteResult<Homestay> {
        let conn = self.conn.lock().unwrap();
        let now = now_rfc3339();

        conn.execute(
            "INSERT INTO homestays (name, slug, description, location, price_per_night, currency,
                                    max_guests, amenities, cover_image, published, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?11)",
            params![
                req.name.trim(),
                slug,
                req.description,
                req.location,
                req.price_per_night,
                req.currency.as_deref().unwrap_or(DEFAULT_CURRENCY),
                req.max_guests.unwrap_or(2),
                amenities_json(&req.amenities),
                req.cover_image,
                req.published as i64,
                now,
            ],
        )?;

        let id = conn.last_insert_rowid();
        conn.query_row(
            &format!("SELECT {} FROM homestays WHERE id = ?1", HOMESTAY_COLUMNS),
            [id],
            row_to_homestay,
        )
    }

    pub fn update_homestay(
        &self,
        id: i64,
        req: &UpdateHomestayRequest,
    ) -> SqliteResult<Option<Homestay>> {
        let conn = self.conn.lock().unwrap();
        let Some(mut homestay) = fetch_homestay(&conn, id)? else {
            return Ok(None);
        };

        if let Some(name) = &req.name {
            homestay.name = name.trim().to_string();
        }
        if let Some(slug) = &req.slug {
            homestay.slug = slug.clone();
        }
        if req.description.is_some() {
            homestay.description = req.description.clone();
        }
        if req.location.is_some() {
            homestay.location = req.location.clone();
        }
        if let Some(price) = req.price_per_night {
            homestay.price_per_night = price;
        }
        if let Some(currency) = &req.currency {
            homestay.currency = currency.clone();
        }
        if let Some(max_guests) = req.max_guests {
            homestay.max_guests = max_guests;
        }
        if let Some(amenities) = &req.amenities {
            homestay.amenities = amenities.clone();
        }
        if req.cover_image.is_some() {
            homestay.cover_image = req.cover_image.clone();
        }
        if let Some(published) = req.published {
            homestay.published = published;
        }

        conn.execute(
            "UPDATE homestays SET name = ?1, slug = ?2, description = ?3, location = ?4,
                                  price_per_night = ?5, currency = ?6, max_guests = ?7, amenities = ?8,
                                  cover_image = ?9, published = ?10, updated_at = ?11
             WHERE id = ?12",
            params![
                homestay.name,
                homestay.slug,
                homestay.description,
                homestay.location,
                homestay.price_per_night,
                homestay.currency,
                homestay.max_guests,
                amenities_json(&homestay.amenities),
                homestay.cover_image,
                homestay.published as i64,
                now_rfc3339(),
                id,
            ],
        )?;

        fetch_homestay(&conn, id)
    }

    pub fn delete_homestay(&self, id: i64) -> SqliteResult<bool> {
        let conn = self.conn.lock().unwrap();
        let rows_affected = conn.execute("DELETE FROM homestays WHERE id = ?1", [id])?;
        Ok(rows_affected > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_homestay_amenities_round_trip() {
        let db = Database::new(":memory:").unwrap();
        let req = CreateHomestayRequest {
            name: "Riverside House".into(),
            slug: None,
            description: None,
            location: Some("Hoi An".into()),
            price_per_night: 650_000,
            currency: None,
            max_guests: Some(4),
            amenities: vec![" wifi ".into(), "breakfast".into()],
            cover_image: None,
            published: true,
        };
        let homestay = db.create_homestay(&req, "riverside-house").unwrap();
        assert_eq!(homestay.amenities, vec!["wifi", "breakfast"]);
        assert_eq!(homestay.max_guests, 4);

        let update = UpdateHomestayRequest {
            amenities: Some(vec!["pool".into()]),
            ..Default::default()
        };
        let updated = db.update_homestay(homestay.id, &update).unwrap().unwrap();
        assert_eq!(updated.amenities, vec!["pool"]);
        assert_eq!(updated.price_per_night, 650_000);

        assert_eq!(db.list_homestays(true).unwrap().len(), 1);
        assert!(db.delete_homestay(homestay.id).unwrap());
        assert!(db.get_homestay_by_slug("riverside-house").unwrap().is_none());
    }
}
