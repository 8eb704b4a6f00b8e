use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use strum::{AsRefStr, Display, EnumString};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum BlockType {
    Hero,
    Cta,
    Testimonial,
    Features,
    Gallery,
    TourList,
    HomestayList,
    Text,
    Faq,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum BlockStatus {
    Draft,
    Published,
}

/// A CMS content unit on the homepage
#[derive(Debug, Clone, Serialize)]
pub struct HomepageBlock {
    pub id: i64,
    pub block_type: BlockType,
    pub title: Option<String>,
    pub fields: Map<String, Value>,
    pub sort_order: i64,
    pub status: BlockStatus,
    pub visible: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub published_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateBlockRequest {
    pub block_type: BlockType,
    pub title: Option<String>,
    #[serde(default)]
    pub fields: Map<String, Value>,
    pub visible: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateBlockRequest {
    pub title: Option<String>,
    pub fields: Option<Map<String, Value>>,
    pub visible: Option<bool>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct SortItem {
    pub id: i64,
    pub sort_order: i64,
}

/// Batch reorder for homepage blocks or menu items
#[derive(Debug, Clone, Deserialize)]
pub struct SortRequest {
    pub items: Vec<SortItem>,
}

/// One section as submitted by the homepage editor; `id` is absent for new sections
#[derive(Debug, Clone, Deserialize)]
pub struct SectionInput {
    pub id: Option<i64>,
    pub block_type: BlockType,
    pub title: Option<String>,
    #[serde(default)]
    pub fields: Map<String, Value>,
    pub visible: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SaveSectionsRequest {
    pub sections: Vec<SectionInput>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PublishRequest {
    pub ids: Option<Vec<i64>>,
}
