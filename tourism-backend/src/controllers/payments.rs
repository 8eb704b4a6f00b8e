use actix_web::{web, HttpRequest, HttpResponse};
use serde_json::json;

use crate::db::PaymentUpdate;
use crate::errors::{ApiError, ApiResult};
use crate::middleware::require_role;
use crate::models::{
    BookingStatus, CreatePaymentRequest, Payment, PaymentStatus, Transition,
    UpdatePaymentStatusRequest, ADMIN_ONLY,
};
use crate::validation::Validate;
use crate::AppState;

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/payments")
            .route("/booking/{booking_id}", web::get().to(list_for_booking))
            .route("/booking/{booking_id}", web::post().to(create_payment))
            .route("/{id}", web::get().to(get_payment))
            .route("/{id}/status", web::put().to(update_status)),
    );
}

/// Move a payment to `next`, emitting `payment.updated` (and `booking.status_changed`
/// when the payment confirmed its booking)
pub(crate) fn apply_payment_status(
    state: &AppState,
    id: i64,
    next: PaymentStatus,
    provider_ref: Option<&str>,
) -> ApiResult<Payment> {
    let PaymentUpdate {
        transition,
        confirmed_booking,
    } = state.db.transition_payment(id, next, provider_ref)?;

    match transition {
        Transition::NotFound => Err(ApiError::not_found("Payment")),
        Transition::Unchanged(payment) => Ok(payment),
        Transition::Rejected { current } => Err(ApiError::Conflict(format!(
            "Cannot change payment status from {} to {}",
            current, next
        ))),
        Transition::Applied { record, previous } => {
            log::info!("Payment {} moved from {} to {}", record.id, previous, record.status);
            state.n8n.trigger(
                "payment.updated",
                json!({ "payment": &record, "previous_status": previous }),
            );

            if let Some(booking) = confirmed_booking {
                log::info!("Booking {} confirmed by payment {}", booking.reference, record.id);
                state.n8n.trigger(
                    "booking.status_changed",
                    json!({ "booking": &booking, "previous_status": BookingStatus::Pending }),
                );
            }
            Ok(record)
        }
    }
}

async fn list_for_booking(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> ApiResult<HttpResponse> {
    require_role(&state.db, &req, ADMIN_ONLY)?;
    let booking_id = path.into_inner();
    if state.db.get_booking(booking_id)?.is_none() {
        return Err(ApiError::not_found("Booking"));
    }
    let payments = state.db.list_payments_for_booking(booking_id)?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "payments": payments })))
}

async fn create_payment(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<i64>,
    body: web::Json<CreatePaymentRequest>,
) -> ApiResult<HttpResponse> {
    let auth = require_role(&state.db, &req, ADMIN_ONLY)?;
    body.validate()?;

    let booking = state
        .db
        .get_booking(path.into_inner())?
        .ok_or_else(|| ApiError::not_found("Booking"))?;
    if booking.status == BookingStatus::Cancelled {
        return Err(ApiError::Conflict("Cannot record a payment for a cancelled booking".to_string()));
    }

    let payment = state.db.create_payment(booking.id, &booking.currency, &body)?;
    log::info!(
        "User {} recorded payment {} of {} {} for booking {}",
        auth.id(),
        payment.id,
        payment.amount,
        payment.currency,
        booking.reference
    );
    state.n8n.trigger("payment.updated", json!({ "payment": &payment }));

    Ok(HttpResponse::Created().json(json!({ "success": true, "payment": payment })))
}

async fn get_payment(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> ApiResult<HttpResponse> {
    require_role(&state.db, &req, ADMIN_ONLY)?;
    let payment = state
        .db
        .get_payment(path.into_inner())?
        .ok_or_else(|| ApiError::not_found("Payment"))?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "payment": payment })))
}

async fn update_status(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<i64>,
    body: web::Json<UpdatePaymentStatusRequest>,
) -> ApiResult<HttpResponse> {
    require_role(&state.db, &req, ADMIN_ONLY)?;
    let payment = apply_payment_status(
        &state,
        path.into_inner(),
        body.status,
        body.provider_ref.as_deref(),
    )?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "payment": payment })))
}
