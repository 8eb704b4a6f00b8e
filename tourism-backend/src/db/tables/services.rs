//! Service database operations

use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult, Row};

use crate::db::{now_rfc3339, parse_timestamp, Database};
use crate::models::{CreateServiceRequest, Service, UpdateServiceRequest, DEFAULT_CURRENCY};

const SERVICE_COLUMNS: &str =
    "id, name, slug, description, price, currency, published, created_at, updated_at";

fn row_to_service(row: &Row) -> SqliteResult<Service> {
    let created_at: String = row.get(7)?;
    let updated_at: String = row.get(8)?;

    Ok(Service {
        id: row.get(0)?,
        name: row.get(1)?,
        slug: row.get(2)?,
        description: row.get(3)?,
        price: row.get(4)?,
        currency: row.get(5)?,
        published: row.get::<_, i64>(6)? != 0,
        created_at: parse_timestamp(7, &created_at)?,
        updated_at: parse_timestamp(8, &updated_at)?,
    })
}

fn fetch_service(conn: &Connection, id: i64) -> SqliteResult<Option<Service>> {
    conn.query_row(
        &format!("SELECT {} FROM services WHERE id = ?1", SERVICE_COLUMNS),
        [id],
        row_to_service,
    )
    .optional()
}

impl Database {
    pub fn list_services(&self, published_only: bool) -> SqliteResult<Vec<Service>> {
        let conn = self.conn.lock().unwrap();
        let filter = if published_only { "WHERE published = 1" } else { "" };
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM services {} ORDER BY name",
            SERVICE_COLUMNS, filter
        ))?;
        let services = stmt
            .query_map([], row_to_service)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(services)
    }

    pub fn get_service(&self, id: i64) -> SqliteResult<Option<Service>> {
        let conn = self.conn.lock().unwrap();
        fetch_service(&conn, id)
    }

    pub fn get_service_by_slug(&self, slug: &str) -> SqliteResult<Option<Service>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            &format!("SELECT {} FROM services WHERE slug = ?1", SERVICE_COLUMNS),
            [slug],
            row_to_service,
        )
        .optional()
    }

    pub fn create_service(&self, req: &CreateServiceRequest, slug: &str) -> SqliteResult<Service> {
        let conn = self.conn.lock().unwrap();
        let now = now_rfc3339();

        conn.execute(
            "INSERT INTO services (name, slug, description, price, currency, published, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
            params![
                req.name.trim(),
                slug,
                req.description,
                req.price,
                req.currency.as_deref().unwrap_or(DEFAULT_CURRENCY),
                req.published as i64,
                now,
            ],
        )?;

        let id = conn.last_insert_rowid();
        conn.query_row(
            &format!("SELECT {} FROM services WHERE id = ?1", SERVICE_COLUMNS),
            [id],
            row_to_service,
        )
    }

    pub fn update_service(
        &self,
        id: i64,
        req: &UpdateServiceRequest,
    ) -> SqliteResult<Option<Service>> {
        let conn = self.conn.lock().unwrap();
        let Some(mut service) = fetch_service(&conn, id)? else {
            return Ok(None);
        };

        if let Some(name) = &req.name {
            service.name = name.trim().to_string();
        }
        if let Some(slug) = &req.slug {
            service.slug = slug.clone();
        }
        if req.description.is_some() {
            service.description = req.description.clone();
        }
        if let Some(price) = req.price {
            service.price = price;
        }
        if let Some(currency) = &req.currency {
            service.currency = currency.clone();
        }
        if let Some(published) = req.published {
            service.published = published;
        }

        conn.execute(
            "UPDATE services SET name = ?1, slug = ?2, description = ?3, price = ?4, currency = ?5,
                                 published = ?6, updated_at = ?7
             WHERE id = ?8",
            params![
                service.name,
                service.slug,
                service.description,
                service.price,
                service.currency,
                service.published as i64,
                now_rfc3339(),
                id,
            ],
        )?;

        fetch_service(&conn, id)
    }

    pub fn delete_service(&self, id: i64) -> SqliteResult<bool> {
        let conn = self.conn.lock().unwrap();
        let rows_affected = conn.execute("DELETE FROM services WHERE id = ?1", [id])?;
        Ok(rows_affected > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_crud() {
        let db = Database::new(":memory:").unwrap();
        let req = CreateServiceRequest {
            name: "Airport Pickup".into(),
            slug: None,
            description: None,
            price: 300_000,
            currency: Some("VND".into()),
            published: false,
        };
        let service = db.create_service(&req, "airport-pickup").unwrap();
        assert!(db.list_services(true).unwrap().is_empty());

        let update = UpdateServiceRequest {
            published: Some(true),
            ..Default::default()
        };
        db.update_service(service.id, &update).unwrap().unwrap();
        assert_eq!(db.list_services(true).unwrap().len(), 1);

        assert!(db.delete_service(service.id).unwrap());
        assert!(!db.delete_service(service.id).unwrap());
    }
}
