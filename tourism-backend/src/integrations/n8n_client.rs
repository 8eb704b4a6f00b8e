//! n8n webhook client
//!
//! Site events are POSTed as `{"event", "payload", "sent_at"}` to every enabled
//! integration channel and, when `N8N_BASE_URL` is set, to `<base>/webhook/<event>`.
//! Each attempt outcome is written to the channel sync log.

use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

use super::retry::{is_reqwest_error_retryable, is_retryable_status, RetryPolicy};
use super::sync_log::log_channel_sync_event;
use crate::config::Config;
use crate::db::Database;
use crate::models::{IntegrationChannel, SyncDirection, SyncEvent, SyncStatus};

/// Header carrying the shared secret, both directions
pub const SECRET_HEADER: &str = "X-Webhook-Secret";

const REQUEST_TIMEOUT_SECS: u64 = 10;

/// A request that never produced an HTTP response
#[derive(Debug, Clone)]
pub struct TransportError {
    pub message: String,
    pub retryable: bool,
}

/// Transport seam so deliveries can be exercised without a network
#[async_trait]
pub trait WebhookSender: Send + Sync {
    /// POST `body` to `url`, returning the response status code
    async fn post(&self, url: &str, secret: Option<&str>, body: &Value) -> Result<u16, TransportError>;
}

pub struct ReqwestSender {
    client: reqwest::Client,
}

impl ReqwestSender {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .user_agent(concat!("tourism-backend/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        ReqwestSender { client }
    }
}

impl Default for ReqwestSender {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WebhookSender for ReqwestSender {
    async fn post(&self, url: &str, secret: Option<&str>, body: &Value) -> Result<u16, TransportError> {
        let mut request = self.client.post(url).json(body);
        if let Some(secret) = secret {
            request = request.header(SECRET_HEADER, secret);
        }

        match request.send().await {
            Ok(response) => Ok(response.status().as_u16()),
            Err(e) => Err(TransportError {
                message: format!("Request failed: {}", e),
                retryable: is_reqwest_error_retryable(&e),
            }),
        }
    }
}

/// Where one event copy goes
#[derive(Debug, Clone, PartialEq)]
pub struct Target {
    pub channel_id: Option<i64>,
    pub url: String,
}

/// Final result of delivering one event to one target
#[derive(Debug, Clone, Serialize)]
pub struct DeliveryOutcome {
    pub channel_id: Option<i64>,
    pub url: String,
    pub status: SyncStatus,
    pub http_status: Option<u16>,
    pub attempts: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Clone)]
pub struct N8nClient {
    db: Arc<Database>,
    sender: Arc<dyn WebhookSender>,
    base_url: Option<String>,
    secret: Option<String>,
    policy: RetryPolicy,
}

impl N8nClient {
    pub fn new(db: Arc<Database>, config: &Config) -> Self {
        Self::with_sender(db, config, Arc::new(ReqwestSender::new()))
    }

    pub fn with_sender(db: Arc<Database>, config: &Config, sender: Arc<dyn WebhookSender>) -> Self {
        N8nClient {
            db,
            sender,
            base_url: config.n8n_base_url.clone(),
            secret: config.n8n_webhook_secret.clone(),
            policy: RetryPolicy::new(config.n8n_max_attempts),
        }
    }

    #[cfg(test)]
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Fire-and-forget: deliveries run on a detached task so callers never wait on n8n
    pub fn trigger(&self, event: &str, payload: Value) {
        let client = self.clone();
        let event = event.to_string();
        tokio::spawn(async move {
            let outcomes = client.broadcast(&event, payload).await;
            let failed = outcomes.iter().filter(|o| o.status == SyncStatus::Failed).count();
            log::debug!(
                "[N8N] '{}' relayed to {} target(s), {} failed",
                event,
                outcomes.len(),
                failed
            );
        });
    }

    /// Deliver an event to every target, one after another
    pub async fn broadcast(&self, event: &str, payload: Value) -> Vec<DeliveryOutcome> {
        let targets = self.targets(event);
        if targets.is_empty() {
            log::debug!("[N8N] No targets for '{}', skipping", event);
            return Vec::new();
        }

        let body = envelope(event, payload);
        let mut outcomes = Vec::with_capacity(targets.len());
        for target in targets {
            outcomes.push(self.deliver(&target, event, &body).await);
        }
        outcomes
    }

    /// Send a `test` event to one channel and wait for the outcome
    pub async fn send_test(&self, channel: &IntegrationChannel) -> DeliveryOutcome {
        let target = Target {
            channel_id: Some(channel.id),
            url: channel.webhook_url.clone(),
        };
        let body = envelope("test", json!({ "channel": channel.name }));
        self.deliver(&target, "test", &body).await
    }

    fn targets(&self, event: &str) -> Vec<Target> {
        let mut targets: Vec<Target> = match self.db.list_enabled_channels() {
            Ok(channels) => channels
                .into_iter()
                .map(|c| Target {
                    channel_id: Some(c.id),
                    url: c.webhook_url,
                })
                .collect(),
            Err(e) => {
                log::error!("[N8N] Failed to load channels: {}", e);
                Vec::new()
            }
        };

        if let Some(base) = &self.base_url {
            targets.push(Target {
                channel_id: None,
                url: format!("{}/webhook/{}", base, event),
            });
        }
        targets
    }

    async fn deliver(&self, target: &Target, event: &str, body: &Value) -> DeliveryOutcome {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let (http_status, error, retryable) =
                match self.sender.post(&target.url, self.secret.as_deref(), body).await {
                    Ok(code) if (200..300).contains(&code) => (Some(code), None, false),
                    Ok(code) => (
                        Some(code),
                        Some(format!("HTTP error: {}", code)),
                        is_retryable_status(code),
                    ),
                    Err(e) => (None, Some(e.message), e.retryable),
                };

            let status = match (&error, retryable && self.policy.should_retry(attempt)) {
                (None, _) => SyncStatus::Success,
                (Some(_), true) => SyncStatus::Retrying,
                (Some(_), false) => SyncStatus::Failed,
            };

            log_channel_sync_event(&self.db, SyncEvent {
                channel_id: target.channel_id,
                direction: SyncDirection::Outbound,
                event: event.to_string(),
                status,
                http_status,
                message: error.as_ref().map(|e| format!("attempt {}: {}", attempt, e)),
                payload: Some(body.clone()),
            });

            if status != SyncStatus::Retrying {
                return DeliveryOutcome {
                    channel_id: target.channel_id,
                    url: target.url.clone(),
                    status,
                    http_status,
                    attempts: attempt,
                    message: error,
                };
            }

            tokio::time::sleep(self.policy.backoff_delay(attempt)).await;
        }
    }
}

fn envelope(event: &str, payload: Value) -> Value {
    json!({
        "event": event,
        "payload": payload,
        "sent_at": Utc::now().to_rfc3339(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CreateChannelRequest, SyncLogFilter};
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays scripted responses and records every request
    struct ScriptedSender {
        responses: Mutex<VecDeque<Result<u16, TransportError>>>,
        calls: Mutex<Vec<(String, Option<String>, Value)>>,
    }

    impl ScriptedSender {
        fn new(responses: Vec<Result<u16, TransportError>>) -> Arc<Self> {
            Arc::new(ScriptedSender {
                responses: Mutex::new(responses.into()),
                calls: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl WebhookSender for ScriptedSender {
        async fn post(&self, url: &str, secret: Option<&str>, body: &Value) -> Result<u16, TransportError> {
            self.calls
                .lock()
                .unwrap()
                .push((url.to_string(), secret.map(String::from), body.clone()));
            self.responses.lock().unwrap().pop_front().unwrap_or(Ok(200))
        }
    }

    fn timeout() -> Result<u16, TransportError> {
        Err(TransportError {
            message: "operation timed out".into(),
            retryable: true,
        })
    }

    fn setup(sender: Arc<ScriptedSender>, config: Config) -> (Arc<Database>, N8nClient) {
        let db = Arc::new(Database::new(":memory:").unwrap());
        db.create_channel(&CreateChannelRequest {
            name: "bookings".into(),
            channel_type: None,
            webhook_url: "https://n8n.example.com/webhook/bookings".into(),
            enabled: true,
        })
        .unwrap();
        let policy = RetryPolicy {
            base_delay: Duration::ZERO,
            ..RetryPolicy::new(config.n8n_max_attempts)
        };
        let client = N8nClient::with_sender(db.clone(), &config, sender).with_policy(policy);
        (db, client)
    }

    #[tokio::test]
    async fn test_retries_then_succeeds() {
        let sender = ScriptedSender::new(vec![Ok(503), timeout(), Ok(200)]);
        let (db, client) = setup(sender.clone(), Config::default());

        let outcomes = client.broadcast("booking.created", json!({"reference": "BK-1"})).await;
        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].status, SyncStatus::Success);
        assert_eq!(outcomes[0].attempts, 3);

        let statuses: Vec<SyncStatus> = db
            .list_sync_logs(&SyncLogFilter::default())
            .unwrap()
            .into_iter()
            .map(|l| l.status)
            .collect();
        assert_eq!(
            statuses,
            vec![SyncStatus::Success, SyncStatus::Retrying, SyncStatus::Retrying]
        );
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let sender = ScriptedSender::new(vec![timeout(), timeout(), timeout(), Ok(200)]);
        let (_db, client) = setup(sender.clone(), Config::default());

        let outcomes = client.broadcast("booking.created", json!({})).await;
        assert_eq!(outcomes[0].status, SyncStatus::Failed);
        assert_eq!(outcomes[0].attempts, 3);
        assert_eq!(sender.calls.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_client_errors_are_not_retried() {
        let sender = ScriptedSender::new(vec![Ok(400)]);
        let (_db, client) = setup(sender.clone(), Config::default());

        let outcomes = client.broadcast("booking.created", json!({})).await;
        assert_eq!(outcomes[0].status, SyncStatus::Failed);
        assert_eq!(outcomes[0].http_status, Some(400));
        assert_eq!(sender.calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_base_url_target_and_secret_header() {
        let sender = ScriptedSender::new(vec![]);
        let config = Config {
            n8n_base_url: Some("https://n8n.example.com".into()),
            n8n_webhook_secret: Some("s3cret".into()),
            ..Config::default()
        };
        let (_db, client) = setup(sender.clone(), config);

        client.broadcast("payment.updated", json!({"id": 1})).await;

        let calls = sender.calls.lock().unwrap();
        let urls: Vec<&str> = calls.iter().map(|c| c.0.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "https://n8n.example.com/webhook/bookings",
                "https://n8n.example.com/webhook/payment.updated",
            ]
        );
        assert!(calls.iter().all(|c| c.1.as_deref() == Some("s3cret")));
        assert_eq!(calls[0].2["event"], "payment.updated");
        assert_eq!(calls[0].2["payload"]["id"], 1);
        assert!(calls[0].2["sent_at"].is_string());
    }

    #[tokio::test]
    async fn test_no_targets_sends_nothing() {
        let sender = ScriptedSender::new(vec![]);
        let db = Arc::new(Database::new(":memory:").unwrap());
        let client = N8nClient::with_sender(db, &Config::default(), sender.clone());

        assert!(client.broadcast("booking.created", json!({})).await.is_empty());
        assert!(sender.calls.lock().unwrap().is_empty());
    }
}
