use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use crate::errors::ApiError;
use crate::validation::{Validate, Validator};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Completed,
    Cancelled,
}

impl BookingStatus {
    /// Whether a booking may move from `self` to `next`
    pub fn can_transition_to(&self, next: BookingStatus) -> bool {
        use BookingStatus::*;
        matches!(
            (self, next),
            (Pending, Confirmed) | (Pending, Cancelled) | (Confirmed, Completed) | (Confirmed, Cancelled)
        )
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingItemType {
    Tour,
    Homestay,
    Service,
}

#[derive(Debug, Clone, Serialize)]
pub struct Booking {
    pub id: i64,
    pub reference: String,
    pub user_id: Option<i64>,
    pub item_type: BookingItemType,
    pub item_id: i64,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: Option<String>,
    pub guests: i64,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub notes: Option<String>,
    pub total_amount: i64,
    pub currency: String,
    pub status: BookingStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Everything needed to insert a booking once pricing has been resolved
#[derive(Debug, Clone)]
pub struct NewBooking {
    pub reference: String,
    pub user_id: Option<i64>,
    pub item_type: BookingItemType,
    pub item_id: i64,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: Option<String>,
    pub guests: i64,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub notes: Option<String>,
    pub total_amount: i64,
    pub currency: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateBookingRequest {
    pub item_type: BookingItemType,
    pub item_id: i64,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: Option<String>,
    pub guests: i64,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

impl Validate for CreateBookingRequest {
    fn validate(&self) -> Result<(), ApiError> {
        let mut v = Validator::new();
        v.required("customer_name", &self.customer_name, 200)
            .email("customer_email", &self.customer_email)
            .optional("customer_phone", self.customer_phone.as_deref(), 30)
            .optional("notes", self.notes.as_deref(), 2000)
            .range("guests", self.guests, 1, 100)
            .check(
                self.start_date >= Utc::now().date_naive(),
                "start_date",
                "must not be in the past",
            );
        if let Some(end) = self.end_date {
            v.check(end >= self.start_date, "end_date", "must not be before start_date");
        }
        if self.item_type == BookingItemType::Homestay {
            match self.end_date {
                None => {
                    v.error("end_date", "is required for homestay bookings");
                }
                Some(end) => {
                    v.check(end > self.start_date, "end_date", "must be after start_date");
                }
            }
        }
        v.finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateBookingStatusRequest {
    pub status: BookingStatus,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookingFilter {
    pub status: Option<BookingStatus>,
    pub item_type: Option<BookingItemType>,
    pub limit: Option<i64>,
}

/// Number of nights between two dates (0 when `end` is not after `start`)
pub fn nights_between(start: NaiveDate, end: NaiveDate) -> i64 {
    (end - start).num_days().max(0)
}

/// Human-friendly booking reference, e.g. `BK-3F9A12C0`
pub fn generate_reference() -> String {
    let id = uuid::Uuid::new_v4().simple().to_string();
    format!("BK-{}", id[..8].to_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_booking_transitions() {
        use BookingStatus::*;
        assert!(Pending.can_transition_to(Confirmed));
        assert!(Pending.can_transition_to(Cancelled));
        assert!(Confirmed.can_transition_to(Completed));
        assert!(Confirmed.can_transition_to(Cancelled));

        assert!(!Pending.can_transition_to(Completed));
        assert!(!Completed.can_transition_to(Cancelled));
        assert!(!Cancelled.can_transition_to(Pending));
    }

    #[test]
    fn test_reference_format() {
        let reference = generate_reference();
        assert!(reference.starts_with("BK-"));
        assert_eq!(reference.len(), 11);
        assert_eq!(reference, reference.to_uppercase());
    }

    #[test]
    fn test_nights_between() {
        let start = NaiveDate::from_ymd_opt(2030, 1, 1).unwrap();
        assert_eq!(nights_between(start, start + Duration::days(3)), 3);
        assert_eq!(nights_between(start, start), 0);
        assert_eq!(nights_between(start + Duration::days(1), start), 0);
    }

    fn request(item_type: BookingItemType, end_offset: Option<i64>) -> CreateBookingRequest {
        let start = Utc::now().date_naive() + Duration::days(7);
        CreateBookingRequest {
            item_type,
            item_id: 1,
            customer_name: "Lan Nguyen".into(),
            customer_email: "lan@example.com".into(),
            customer_phone: None,
            guests: 2,
            start_date: start,
            end_date: end_offset.map(|d| start + Duration::days(d)),
            notes: None,
        }
    }

    #[test]
    fn test_homestay_requires_end_date() {
        assert!(request(BookingItemType::Tour, None).validate().is_ok());
        assert!(request(BookingItemType::Homestay, None).validate().is_err());
        assert!(request(BookingItemType::Homestay, Some(0)).validate().is_err());
        assert!(request(BookingItemType::Homestay, Some(2)).validate().is_ok());
    }

    #[test]
    fn test_past_start_date_rejected() {
        let mut req = request(BookingItemType::Service, None);
        req.start_date = Utc::now().date_naive() - Duration::days(1);
        assert!(req.validate().is_err());
    }
}
