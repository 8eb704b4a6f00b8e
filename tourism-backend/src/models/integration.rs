use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::{AsRefStr, Display, EnumString};

use crate::errors::ApiError;
use crate::validation::{Validate, Validator};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum SyncStatus {
    Success,
    Failed,
    Retrying,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum SyncDirection {
    Outbound,
    Inbound,
}

/// An external automation endpoint that receives site events
#[derive(Debug, Clone, Serialize)]
pub struct IntegrationChannel {
    pub id: i64,
    pub name: String,
    pub channel_type: String,
    pub webhook_url: String,
    pub enabled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChannelSyncLog {
    pub id: i64,
    pub channel_id: Option<i64>,
    pub direction: SyncDirection,
    pub event: String,
    pub status: SyncStatus,
    pub http_status: Option<u16>,
    pub message: Option<String>,
    pub payload: Option<Value>,
    pub created_at: DateTime<Utc>,
}

/// A sync log row before it is persisted
#[derive(Debug, Clone)]
pub struct SyncEvent {
    pub channel_id: Option<i64>,
    pub direction: SyncDirection,
    pub event: String,
    pub status: SyncStatus,
    pub http_status: Option<u16>,
    pub message: Option<String>,
    pub payload: Option<Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateChannelRequest {
    pub name: String,
    pub channel_type: Option<String>,
    pub webhook_url: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_true() -> bool {
    true
}

impl Validate for CreateChannelRequest {
    fn validate(&self) -> Result<(), ApiError> {
        Validator::new()
            .required("name", &self.name, 100)
            .optional("channel_type", self.channel_type.as_deref(), 50)
            .http_url("webhook_url", &self.webhook_url)
            .finish()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateChannelRequest {
    pub name: Option<String>,
    pub channel_type: Option<String>,
    pub webhook_url: Option<String>,
    pub enabled: Option<bool>,
}

impl Validate for UpdateChannelRequest {
    fn validate(&self) -> Result<(), ApiError> {
        let mut v = Validator::new();
        if let Some(name) = &self.name {
            v.required("name", name, 100);
        }
        if let Some(url) = &self.webhook_url {
            v.http_url("webhook_url", url);
        }
        v.optional("channel_type", self.channel_type.as_deref(), 50).finish()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SyncLogFilter {
    pub channel_id: Option<i64>,
    pub status: Option<SyncStatus>,
    pub limit: Option<i64>,
}
