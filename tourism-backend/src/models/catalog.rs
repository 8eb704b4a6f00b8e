//! Bookable catalog items: tours, homestays and services
//!
//! Prices are integer minor units of `currency`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::ApiError;
use crate::validation::{Validate, Validator};

pub const DEFAULT_CURRENCY: &str = "VND";

#[derive(Debug, Clone, Serialize)]
pub struct Tour {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub price: i64,
    pub currency: String,
    pub duration_days: i64,
    pub location: Option<String>,
    pub cover_image: Option<String>,
    pub published: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateTourRequest {
    pub title: String,
    pub slug: Option<String>,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub price: i64,
    pub currency: Option<String>,
    pub duration_days: Option<i64>,
    pub location: Option<String>,
    pub cover_image: Option<String>,
    #[serde(default)]
    pub published: bool,
}

impl Validate for CreateTourRequest {
    fn validate(&self) -> Result<(), ApiError> {
        Validator::new()
            .required("title", &self.title, 200)
            .slug("slug", self.slug.as_deref())
            .optional("summary", self.summary.as_deref(), 500)
            .non_negative("price", self.price)
            .currency("currency", self.currency.as_deref())
            .range("duration_days", self.duration_days.unwrap_or(1), 1, 365)
            .optional("location", self.location.as_deref(), 200)
            .finish()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateTourRequest {
    pub title: Option<String>,
    pub slug: Option<String>,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub price: Option<i64>,
    pub currency: Option<String>,
    pub duration_days: Option<i64>,
    pub location: Option<String>,
    pub cover_image: Option<String>,
    pub published: Option<bool>,
}

impl Validate for UpdateTourRequest {
    fn validate(&self) -> Result<(), ApiError> {
        let mut v = Validator::new();
        if let Some(title) = &self.title {
            v.required("title", title, 200);
        }
        v.slug("slug", self.slug.as_deref())
            .optional("summary", self.summary.as_deref(), 500)
            .non_negative("price", self.price.unwrap_or(0))
            .currency("currency", self.currency.as_deref())
            .range("duration_days", self.duration_days.unwrap_or(1), 1, 365)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Homestay {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub price_per_night: i64,
    pub currency: String,
    pub max_guests: i64,
    pub amenities: Vec<String>,
    pub cover_image: Option<String>,
    pub published: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateHomestayRequest {
    pub name: String,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub price_per_night: i64,
    pub currency: Option<String>,
    pub max_guests: Option<i64>,
    #[serde(default)]
    pub amenities: Vec<String>,
    pub cover_image: Option<String>,
    #[serde(default)]
    pub published: bool,
}

impl Validate for CreateHomestayRequest {
    fn validate(&self) -> Result<(), ApiError> {
        let mut v = Validator::new();
        v.required("name", &self.name, 200)
            .slug("slug", self.slug.as_deref())
            .optional("location", self.location.as_deref(), 200)
            .non_negative("price_per_night", self.price_per_night)
            .currency("currency", self.currency.as_deref())
            .range("max_guests", self.max_guests.unwrap_or(2), 1, 100);
        for amenity in &self.amenities {
            v.required("amenities", amenity, 100);
        }
        v.finish()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateHomestayRequest {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub price_per_night: Option<i64>,
    pub currency: Option<String>,
    pub max_guests: Option<i64>,
    pub amenities: Option<Vec<String>>,
    pub cover_image: Option<String>,
    pub published: Option<bool>,
}

impl Validate for UpdateHomestayRequest {
    fn validate(&self) -> Result<(), ApiError> {
        let mut v = Validator::new();
        if let Some(name) = &self.name {
            v.required("name", name, 200);
        }
        v.slug("slug", self.slug.as_deref())
            .non_negative("price_per_night", self.price_per_night.unwrap_or(0))
            .currency("currency", self.currency.as_deref())
            .range("max_guests", self.max_guests.unwrap_or(2), 1, 100);
        for amenity in self.amenities.iter().flatten() {
            v.required("amenities", amenity, 100);
        }
        v.finish()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Service {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub price: i64,
    pub currency: String,
    pub published: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateServiceRequest {
    pub name: String,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub price: i64,
    pub currency: Option<String>,
    #[serde(default)]
    pub published: bool,
}

impl Validate for CreateServiceRequest {
    fn validate(&self) -> Result<(), ApiError> {
        Validator::new()
            .required("name", &self.name, 200)
            .slug("slug", self.slug.as_deref())
            .non_negative("price", self.price)
            .currency("currency", self.currency.as_deref())
            .finish()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateServiceRequest {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub price: Option<i64>,
    pub currency: Option<String>,
    pub published: Option<bool>,
}

impl Validate for UpdateServiceRequest {
    fn validate(&self) -> Result<(), ApiError> {
        let mut v = Validator::new();
        if let Some(name) = &self.name {
            v.required("name", name, 200);
        }
        v.slug("slug", self.slug.as_deref())
            .non_negative("price", self.price.unwrap_or(0))
            .currency("currency", self.currency.as_deref())
            .finish()
    }
}
