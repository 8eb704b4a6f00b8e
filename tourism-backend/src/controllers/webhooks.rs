//! Inbound n8n webhooks
//!
//! Workflows call back into the site to move bookings and payments along or to
//! report on their own runs. Every call must carry the shared secret in
//! `X-Webhook-Secret`.

use actix_web::{web, HttpRequest, HttpResponse};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use crate::auth::constant_time_eq;
use crate::controllers::bookings::apply_booking_status;
use crate::controllers::payments::apply_payment_status;
use crate::errors::{ApiError, ApiResult};
use crate::integrations::{log_channel_sync_event, SECRET_HEADER};
use crate::models::{BookingStatus, PaymentStatus, SyncDirection, SyncEvent, SyncStatus};
use crate::AppState;

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.route("/api/webhooks/n8n/{event}", web::post().to(receive));
}

#[derive(Debug, Deserialize)]
struct BookingStatusEvent {
    reference: String,
    status: BookingStatus,
}

#[derive(Debug, Deserialize)]
struct PaymentStatusEvent {
    payment_id: i64,
    status: PaymentStatus,
    provider_ref: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChannelSyncEvent {
    channel_id: Option<i64>,
    status: SyncStatus,
    message: Option<String>,
}

fn verify_secret(state: &AppState, req: &HttpRequest) -> ApiResult<()> {
    let expected = state
        .config
        .n8n_webhook_secret
        .as_deref()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| {
            ApiError::ServiceUnavailable("Inbound webhooks are not configured".to_string())
        })?;

    let provided = req
        .headers()
        .get(SECRET_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    if constant_time_eq(provided.as_bytes(), expected.as_bytes()) {
        Ok(())
    } else {
        log::warn!("[N8N] Rejected inbound webhook with a bad secret");
        Err(ApiError::Unauthorized("Invalid webhook secret".to_string()))
    }
}

fn parse_event<T: DeserializeOwned>(event: &str, body: &Value) -> ApiResult<T> {
    serde_json::from_value(body.clone())
        .map_err(|e| ApiError::BadRequest(format!("Invalid {} payload: {}", event, e)))
}

async fn receive(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<String>,
    body: web::Bytes,
) -> ApiResult<HttpResponse> {
    verify_secret(&state, &req)?;

    let event = path.into_inner();
    let payload: Value = serde_json::from_slice(&body)
        .map_err(|e| ApiError::BadRequest(format!("Invalid JSON body: {}", e)))?;

    // channel.sync rows record what the workflow reported about its own run
    let mut reported = None;
    let (channel_id, result) = match event.as_str() {
        "booking.status" => (None, handle_booking_status(&state, &event, &payload)),
        "payment.status" => (None, handle_payment_status(&state, &event, &payload)),
        "channel.sync" => match parse_event::<ChannelSyncEvent>(&event, &payload) {
            Ok(sync) => {
                reported = Some((sync.status, sync.message.clone()));
                (sync.channel_id, handle_channel_sync(&state, sync))
            }
            Err(e) => (None, Err(e)),
        },
        _ => return Err(ApiError::NotFound(format!("Unknown webhook event '{}'", event))),
    };

    let (status, message) = match (&result, reported) {
        (Err(e), _) => (SyncStatus::Failed, Some(e.to_string())),
        (Ok(_), Some(reported)) => reported,
        (Ok(_), None) => (SyncStatus::Success, None),
    };
    log_channel_sync_event(
        &state.db,
        SyncEvent {
            channel_id,
            direction: SyncDirection::Inbound,
            event: event.clone(),
            status,
            http_status: None,
            message,
            payload: Some(payload),
        },
    );

    let data = result?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "event": event, "data": data })))
}

fn handle_booking_status(state: &AppState, event: &str, payload: &Value) -> ApiResult<Value> {
    let update: BookingStatusEvent = parse_event(event, payload)?;
    let booking = state
        .db
        .get_booking_by_reference(&update.reference)?
        .ok_or_else(|| ApiError::not_found("Booking"))?;
    let booking = apply_booking_status(state, booking.id, update.status)?;
    Ok(json!({ "booking": booking }))
}

fn handle_payment_status(state: &AppState, event: &str, payload: &Value) -> ApiResult<Value> {
    let update: PaymentStatusEvent = parse_event(event, payload)?;
    let payment = apply_payment_status(
        state,
        update.payment_id,
        update.status,
        update.provider_ref.as_deref(),
    )?;
    Ok(json!({ "payment": payment }))
}

// The inbound log row written by `receive` is the record of the workflow run
fn handle_channel_sync(state: &AppState, sync: ChannelSyncEvent) -> ApiResult<Value> {
    if let Some(id) = sync.channel_id {
        if state.db.get_channel(id)?.is_none() {
            return Err(ApiError::not_found("Channel"));
        }
    }
    if let Some(message) = &sync.message {
        log::info!("[N8N] Workflow reported {}: {}", sync.status, message);
    }
    Ok(json!({ "status": sync.status }))
}

#[cfg(test)]
mod tests {
    use crate::config::Config;
    use crate::controllers::test_support::*;
    use crate::models::{
        BookingItemType, BookingStatus, CreateChannelRequest, CreatePaymentRequest, NewBooking,
        SyncDirection, SyncLogFilter, SyncStatus,
    };
    use actix_web::http::StatusCode;
    use actix_web::test;
    use chrono::NaiveDate;
    use serde_json::{json, Value};

    const SECRET: &str = "s3cret-hook";

    fn configured() -> actix_web::web::Data<crate::AppState> {
        state_with(Config {
            n8n_webhook_secret: Some(SECRET.to_string()),
            ..Config::default()
        })
    }

    fn seed_booking(state: &crate::AppState) -> i64 {
        state
            .db
            .create_booking(&NewBooking {
                reference: "BK-HOOK0001".into(),
                user_id: None,
                item_type: BookingItemType::Tour,
                item_id: 1,
                customer_name: "Minh".into(),
                customer_email: "minh@example.com".into(),
                customer_phone: None,
                guests: 2,
                start_date: NaiveDate::from_ymd_opt(2031, 5, 1).unwrap(),
                end_date: None,
                notes: None,
                total_amount: 1_000_000,
                currency: "VND".into(),
            })
            .unwrap()
            .id
    }

    fn inbound_logs(state: &crate::AppState) -> Vec<crate::models::ChannelSyncLog> {
        state
            .db
            .list_sync_logs(&SyncLogFilter::default())
            .unwrap()
            .into_iter()
            .filter(|l| l.direction == SyncDirection::Inbound)
            .collect()
    }

    #[actix_web::test]
    async fn test_secret_is_required() {
        let state = state();
        let app = test_app!(state);
        let req = test::TestRequest::post()
            .uri("/api/webhooks/n8n/booking.status")
            .insert_header(("X-Webhook-Secret", "anything"))
            .set_json(json!({}))
            .to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::SERVICE_UNAVAILABLE
        );

        let state = configured();
        let app = test_app!(state);
        let req = test::TestRequest::post()
            .uri("/api/webhooks/n8n/booking.status")
            .insert_header(("X-Webhook-Secret", "wrong"))
            .set_json(json!({"reference": "BK-X", "status": "CONFIRMED"}))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::UNAUTHORIZED);

        let req = test::TestRequest::post()
            .uri("/api/webhooks/n8n/booking.status")
            .set_json(json!({"reference": "BK-X", "status": "CONFIRMED"}))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::UNAUTHORIZED);
        assert!(inbound_logs(&state).is_empty());
    }

    #[actix_web::test]
    async fn test_booking_status_event() {
        let state = configured();
        let app = test_app!(state);
        let booking_id = seed_booking(&state);

        let req = test::TestRequest::post()
            .uri("/api/webhooks/n8n/booking.status")
            .insert_header(("X-Webhook-Secret", SECRET))
            .set_json(json!({"reference": "BK-HOOK0001", "status": "CONFIRMED"}))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["booking"]["status"], "CONFIRMED");
        assert_eq!(
            state.db.get_booking(booking_id).unwrap().unwrap().status,
            BookingStatus::Confirmed
        );

        // CONFIRMED -> PENDING is rejected and recorded as a failed inbound event
        let req = test::TestRequest::post()
            .uri("/api/webhooks/n8n/booking.status")
            .insert_header(("X-Webhook-Secret", SECRET))
            .set_json(json!({"reference": "BK-HOOK0001", "status": "PENDING"}))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CONFLICT);

        let logs = inbound_logs(&state);
        assert_eq!(logs.len(), 2);
        assert_eq!(logs[0].status, SyncStatus::Failed);
        assert_eq!(logs[1].status, SyncStatus::Success);
        assert_eq!(logs[1].event, "booking.status");
    }

    #[actix_web::test]
    async fn test_payment_and_channel_events() {
        let state = configured();
        let app = test_app!(state);
        let booking_id = seed_booking(&state);
        let payment = state
            .db
            .create_payment(
                booking_id,
                "VND",
                &CreatePaymentRequest {
                    amount: 1_000_000,
                    method: "card".into(),
                    provider_ref: None,
                },
            )
            .unwrap();

        let req = test::TestRequest::post()
            .uri("/api/webhooks/n8n/payment.status")
            .insert_header(("X-Webhook-Secret", SECRET))
            .set_json(json!({"payment_id": payment.id, "status": "PAID", "provider_ref": "PSP-1"}))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["payment"]["status"], "PAID");
        assert_eq!(
            state.db.get_booking(booking_id).unwrap().unwrap().status,
            BookingStatus::Confirmed
        );

        let channel = state
            .db
            .create_channel(&CreateChannelRequest {
                name: "crm".into(),
                channel_type: None,
                webhook_url: "https://n8n.example.com/webhook/crm".into(),
                enabled: true,
            })
            .unwrap();
        let req = test::TestRequest::post()
            .uri("/api/webhooks/n8n/channel.sync")
            .insert_header(("X-Webhook-Secret", SECRET))
            .set_json(json!({"channel_id": channel.id, "status": "SUCCESS", "message": "42 rows"}))
            .to_request();
        assert!(test::call_service(&app, req).await.status().is_success());

        let logs = inbound_logs(&state);
        assert_eq!(logs[0].event, "channel.sync");
        assert_eq!(logs[0].channel_id, Some(channel.id));

        let req = test::TestRequest::post()
            .uri("/api/webhooks/n8n/tour.deleted")
            .insert_header(("X-Webhook-Secret", SECRET))
            .set_json(json!({}))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn test_channel_sync_records_reported_outcome() {
        let state = configured();
        let app = test_app!(state);
        let channel = state
            .db
            .create_channel(&CreateChannelRequest {
                name: "crm".into(),
                channel_type: None,
                webhook_url: "https://n8n.example.com/webhook/crm".into(),
                enabled: true,
            })
            .unwrap();

        let req = test::TestRequest::post()
            .uri("/api/webhooks/n8n/channel.sync")
            .insert_header(("X-Webhook-Secret", SECRET))
            .set_json(json!({"channel_id": channel.id, "status": "FAILED", "message": "CRM down"}))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["status"], "FAILED");

        let logs = inbound_logs(&state);
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].status, SyncStatus::Failed);
        assert_eq!(logs[0].message.as_deref(), Some("CRM down"));
        assert_eq!(logs[0].channel_id, Some(channel.id));

        // An unknown channel is a 404 but the run is still on record
        let req = test::TestRequest::post()
            .uri("/api/webhooks/n8n/channel.sync")
            .insert_header(("X-Webhook-Secret", SECRET))
            .set_json(json!({"channel_id": 999, "status": "SUCCESS"}))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);

        let logs = inbound_logs(&state);
        assert_eq!(logs.len(), 2);
        assert_eq!(logs[0].status, SyncStatus::Failed);
        assert_eq!(logs[0].channel_id, None);
        assert!(logs[0].message.as_deref().unwrap().contains("999"));
    }
}
