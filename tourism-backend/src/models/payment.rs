use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use crate::errors::ApiError;
use crate::validation::{Validate, Validator};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Failed,
    Refunded,
}

impl PaymentStatus {
    pub fn can_transition_to(&self, next: PaymentStatus) -> bool {
        use PaymentStatus::*;
        matches!(
            (self, next),
            (Pending, Paid) | (Pending, Failed) | (Failed, Pending) | (Paid, Refunded)
        )
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Payment {
    pub id: i64,
    pub booking_id: i64,
    pub amount: i64,
    pub currency: String,
    pub method: String,
    pub provider_ref: Option<String>,
    pub status: PaymentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreatePaymentRequest {
    pub amount: i64,
    pub method: String,
    pub provider_ref: Option<String>,
}

impl Validate for CreatePaymentRequest {
    fn validate(&self) -> Result<(), ApiError> {
        Validator::new()
            .positive("amount", self.amount)
            .required("method", &self.method, 50)
            .optional("provider_ref", self.provider_ref.as_deref(), 200)
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdatePaymentStatusRequest {
    pub status: PaymentStatus,
    pub provider_ref: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payment_transitions() {
        use PaymentStatus::*;
        assert!(Pending.can_transition_to(Paid));
        assert!(Pending.can_transition_to(Failed));
        assert!(Failed.can_transition_to(Pending));
        assert!(Paid.can_transition_to(Refunded));

        assert!(!Paid.can_transition_to(Pending));
        assert!(!Refunded.can_transition_to(Paid));
        assert!(!Failed.can_transition_to(Paid));
    }

    #[test]
    fn test_create_payment_validation() {
        let ok = CreatePaymentRequest {
            amount: 100,
            method: "bank_transfer".into(),
            provider_ref: None,
        };
        assert!(ok.validate().is_ok());

        let bad = CreatePaymentRequest {
            amount: 0,
            method: " ".into(),
            provider_ref: None,
        };
        assert!(bad.validate().is_err());
    }
}
