//! Booking database operations

use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult, Row, ToSql};

use crate::db::{now_rfc3339, parse_date, parse_enum, parse_timestamp, Database};
use crate::models::{Booking, BookingFilter, BookingStatus, NewBooking, Transition};

/// Upper bound for admin listings
pub const MAX_BOOKING_LIST: i64 = 200;

const BOOKING_COLUMNS: &str = "id, reference, user_id, item_type, item_id, customer_name, customer_email, \
                               customer_phone, guests, start_date, end_date, notes, total_amount, currency, \
                               status, created_at, updated_at";

fn row_to_booking(row: &Row) -> SqliteResult<Booking> {
    let item_type: String = row.get(3)?;
    let start_date: String = row.get(9)?;
    let end_date: Option<String> = row.get(10)?;
    let status: String = row.get(14)?;
    let created_at: String = row.get(15)?;
    let updated_at: String = row.get(16)?;

    Ok(Booking {
        id: row.get(0)?,
        reference: row.get(1)?,
        user_id: row.get(2)?,
        item_type: parse_enum(3, &item_type)?,
        item_id: row.get(4)?,
        customer_name: row.get(5)?,
        customer_email: row.get(6)?,
        customer_phone: row.get(7)?,
        guests: row.get(8)?,
        start_date: parse_date(9, &start_date)?,
        end_date: end_date.map(|d| parse_date(10, &d)).transpose()?,
        notes: row.get(11)?,
        total_amount: row.get(12)?,
        currency: row.get(13)?,
        status: parse_enum(14, &status)?,
        created_at: parse_timestamp(15, &created_at)?,
        updated_at: parse_timestamp(16, &updated_at)?,
    })
}

pub(crate) fn fetch_booking(conn: &Connection, id: i64) -> SqliteResult<Option<Booking>> {
    conn.query_row(
        &format!("SELECT {} FROM bookings WHERE id = ?1", BOOKING_COLUMNS),
        [id],
        row_to_booking,
    )
    .optional()
}

/// Check and apply a booking status change on an open connection or transaction
pub(crate) fn apply_booking_transition(
    conn: &Connection,
    id: i64,
    next: BookingStatus,
) -> SqliteResult<Transition<Booking, BookingStatus>> {
    let Some(booking) = fetch_booking(conn, id)? else {
        return Ok(Transition::NotFound);
    };

    let previous = booking.status;
    if previous == next {
        return Ok(Transition::Unchanged(booking));
    }
    if !previous.can_transition_to(next) {
        return Ok(Transition::Rejected { current: previous });
    }

    conn.execute(
        "UPDATE bookings SET status = ?1, updated_at = ?2 WHERE id = ?3",
        params![next.as_ref(), now_rfc3339(), id],
    )?;

    match fetch_booking(conn, id)? {
        Some(record) => Ok(Transition::Applied { record, previous }),
        None => Ok(Transition::NotFound),
    }
}

impl Database {
    pub fn create_booking(&self, booking: &NewBooking) -> SqliteResult<Booking> {
        let conn = self.conn.lock().unwrap();
        let now = now_rfc3339();

        conn.execute(
            "INSERT INTO bookings (reference, user_id, item_type, item_id, customer_name, customer_email,
                                   customer_phone, guests, start_date, end_date, notes, total_amount,
                                   currency, status, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?15)",
            params![
                booking.reference,
                booking.user_id,
                booking.item_type.as_ref(),
                booking.item_id,
                booking.customer_name.trim(),
                booking.customer_email.trim().to_lowercase(),
                booking.customer_phone,
                booking.guests,
                booking.start_date.format("%Y-%m-%d").to_string(),
                booking.end_date.map(|d| d.format("%Y-%m-%d").to_string()),
                booking.notes,
                booking.total_amount,
                booking.currency,
                BookingStatus::Pending.as_ref(),
                now,
            ],
        )?;

        let id = conn.last_insert_rowid();
        conn.query_row(
            &format!("SELECT {} FROM bookings WHERE id = ?1", BOOKING_COLUMNS),
            [id],
            row_to_booking,
        )
    }

    pub fn get_booking(&self, id: i64) -> SqliteResult<Option<Booking>> {
        let conn = self.conn.lock().unwrap();
        fetch_booking(&conn, id)
    }

    pub fn get_booking_by_reference(&self, reference: &str) -> SqliteResult<Option<Booking>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            &format!("SELECT {} FROM bookings WHERE reference = ?1", BOOKING_COLUMNS),
            [reference.trim().to_uppercase()],
            row_to_booking,
        )
        .optional()
    }

    /// List bookings, newest first, with optional status and item type filters
    pub fn list_bookings(&self, filter: &BookingFilter) -> SqliteResult<Vec<Booking>> {
        let conn = self.conn.lock().unwrap();

        let mut clauses: Vec<&str> = Vec::new();
        let mut values: Vec<Box<dyn ToSql>> = Vec::new();
        if let Some(status) = filter.status {
            clauses.push("status = ?");
            values.push(Box::new(status.as_ref().to_string()));
        }
        if let Some(item_type) = filter.item_type {
            clauses.push("item_type = ?");
            values.push(Box::new(item_type.as_ref().to_string()));
        }
        let where_sql = if clauses.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", clauses.join(" AND "))
        };
        let limit = filter.limit.unwrap_or(50).clamp(1, MAX_BOOKING_LIST);

        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM bookings {} ORDER BY created_at DESC, id DESC LIMIT {}",
            BOOKING_COLUMNS, where_sql, limit
        ))?;
        let params: Vec<&dyn ToSql> = values.iter().map(|v| v.as_ref()).collect();
        let bookings = stmt
            .query_map(params.as_slice(), row_to_booking)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(bookings)
    }

    pub fn list_bookings_for_user(&self, user_id: i64) -> SqliteResult<Vec<Booking>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM bookings WHERE user_id = ?1 ORDER BY created_at DESC, id DESC",
            BOOKING_COLUMNS
        ))?;
        let bookings = stmt
            .query_map([user_id], row_to_booking)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(bookings)
    }

    pub fn transition_booking(
        &self,
        id: i64,
        next: BookingStatus,
    ) -> SqliteResult<Transition<Booking, BookingStatus>> {
        let conn = self.conn.lock().unwrap();
        apply_booking_transition(&conn, id, next)
    }

    pub fn delete_booking(&self, id: i64) -> SqliteResult<bool> {
        let conn = self.conn.lock().unwrap();
        let rows_affected = conn.execute("DELETE FROM bookings WHERE id = ?1", [id])?;
        Ok(rows_affected > 0)
    }
}
