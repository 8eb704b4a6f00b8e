//! Payment database operations

use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult, Row};

use super::bookings::{apply_booking_transition, fetch_booking};
use crate::db::{now_rfc3339, parse_enum, parse_timestamp, Database};
use crate::models::{
    Booking, BookingStatus, CreatePaymentRequest, Payment, PaymentStatus, Transition,
};

const PAYMENT_COLUMNS: &str =
    "id, booking_id, amount, currency, method, provider_ref, status, created_at, updated_at";

/// Result of a payment status change, including the booking it confirmed (if any)
#[derive(Debug)]
pub struct PaymentUpdate {
    pub transition: Transition<Payment, PaymentStatus>,
    pub confirmed_booking: Option<Booking>,
}

fn row_to_payment(row: &Row) -> SqliteResult<Payment> {
    let status: String = row.get(6)?;
    let created_at: String = row.get(7)?;
    let updated_at: String = row.get(8)?;

    Ok(Payment {
        id: row.get(0)?,
        booking_id: row.get(1)?,
        amount: row.get(2)?,
        currency: row.get(3)?,
        method: row.get(4)?,
        provider_ref: row.get(5)?,
        status: parse_enum(6, &status)?,
        created_at: parse_timestamp(7, &created_at)?,
        updated_at: parse_timestamp(8, &updated_at)?,
    })
}

fn fetch_payment(conn: &Connection, id: i64) -> SqliteResult<Option<Payment>> {
    conn.query_row(
        &format!("SELECT {} FROM payments WHERE id = ?1", PAYMENT_COLUMNS),
        [id],
        row_to_payment,
    )
    .optional()
}

impl Database {
    pub fn list_payments_for_booking(&self, booking_id: i64) -> SqliteResult<Vec<Payment>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM payments WHERE booking_id = ?1 ORDER BY id",
            PAYMENT_COLUMNS
        ))?;
        let payments = stmt
            .query_map([booking_id], row_to_payment)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(payments)
    }

    pub fn get_payment(&self, id: i64) -> SqliteResult<Option<Payment>> {
        let conn = self.conn.lock().unwrap();
        fetch_payment(&conn, id)
    }

    /// Record a PENDING payment against a booking, in the booking's currency
    pub fn create_payment(
        &self,
        booking_id: i64,
        currency: &str,
        req: &CreatePaymentRequest,
    ) -> SqliteResult<Payment> {
        let conn = self.conn.lock().unwrap();
        let now = now_rfc3339();

        conn.execute(
            "INSERT INTO payments (booking_id, amount, currency, method, provider_ref, status, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
            params![
                booking_id,
                req.amount,
                currency,
                req.method.trim(),
                req.provider_ref,
                PaymentStatus::Pending.as_ref(),
                now,
            ],
        )?;

        let id = conn.last_insert_rowid();
        conn.query_row(
            &format!("SELECT {} FROM payments WHERE id = ?1", PAYMENT_COLUMNS),
            [id],
            row_to_payment,
        )
    }

    /// Move a payment to a new status. A payment that becomes PAID confirms its
    /// booking when the booking is still PENDING; both writes share one transaction.
    pub fn transition_payment(
        &self,
        id: i64,
        next: PaymentStatus,
        provider_ref: Option<&str>,
    ) -> SqliteResult<PaymentUpdate> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;

        let Some(payment) = fetch_payment(&tx, id)? else {
            return Ok(PaymentUpdate {
                transition: Transition::NotFound,
                confirmed_booking: None,
            });
        };

        let previous = payment.status;
        if previous == next {
            return Ok(PaymentUpdate {
                transition: Transition::Unchanged(payment),
                confirmed_booking: None,
            });
        }
        if !previous.can_transition_to(next) {
            return Ok(PaymentUpdate {
                transition: Transition::Rejected { current: previous },
                confirmed_booking: None,
            });
        }

        tx.execute(
            "UPDATE payments SET status = ?1, provider_ref = COALESCE(?2, provider_ref), updated_at = ?3
             WHERE id = ?4",
            params![next.as_ref(), provider_ref, now_rfc3339(), id],
        )?;

        let mut confirmed_booking = None;
        if next == PaymentStatus::Paid {
            let pending = fetch_booking(&tx, payment.booking_id)?
                .map(|b| b.status == BookingStatus::Pending)
                .unwrap_or(false);
            if pending {
                if let Transition::Applied { record, .. } =
                    apply_booking_transition(&tx, payment.booking_id, BookingStatus::Confirmed)?
                {
                    confirmed_booking = Some(record);
                }
            }
        }

        let record = fetch_payment(&tx, id)?;
        tx.commit()?;

        Ok(PaymentUpdate {
            transition: match record {
                Some(record) => Transition::Applied { record, previous },
                None => Transition::NotFound,
            },
            confirmed_booking,
        })
    }
}
