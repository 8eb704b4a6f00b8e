use actix_web::{web, HttpRequest, HttpResponse};
use serde_json::json;

use crate::db::Database;
use crate::errors::{ApiError, ApiResult};
use crate::middleware::{optional_session, require_role, require_session};
use crate::models::{
    generate_reference, nights_between, Booking, BookingFilter, BookingItemType, BookingStatus,
    CreateBookingRequest, NewBooking, Transition, UpdateBookingStatusRequest, ADMIN_ONLY, STAFF,
};
use crate::validation::Validate;
use crate::AppState;

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/bookings")
            .route("", web::post().to(create_booking))
            .route("", web::get().to(list_bookings))
            .route("/mine", web::get().to(list_my_bookings))
            .route("/{id}", web::get().to(get_booking))
            .route("/{id}", web::delete().to(delete_booking))
            .route("/{id}/status", web::put().to(update_status)),
    );
}

/// Resolve the booked item and compute `(total_amount, currency)`.
/// The item must exist and be published.
fn price_booking(db: &Database, req: &CreateBookingRequest) -> ApiResult<(i64, String)> {
    let unavailable = || ApiError::field("item_id", "does not match a bookable item");

    let (unit_price, units, currency) = match req.item_type {
        BookingItemType::Tour => {
            let tour = db.get_tour(req.item_id)?.filter(|t| t.published).ok_or_else(unavailable)?;
            (tour.price, req.guests, tour.currency)
        }
        BookingItemType::Homestay => {
            let homestay = db
                .get_homestay(req.item_id)?
                .filter(|h| h.published)
                .ok_or_else(unavailable)?;
            if req.guests > homestay.max_guests {
                return Err(ApiError::field(
                    "guests",
                    &format!("must not exceed {} for this homestay", homestay.max_guests),
                ));
            }
            let end = req
                .end_date
                .ok_or_else(|| ApiError::field("end_date", "is required for homestay bookings"))?;
            (
                homestay.price_per_night,
                nights_between(req.start_date, end),
                homestay.currency,
            )
        }
        BookingItemType::Service => {
            let service = db
                .get_service(req.item_id)?
                .filter(|s| s.published)
                .ok_or_else(unavailable)?;
            (service.price, req.guests, service.currency)
        }
    };

    let total = unit_price
        .checked_mul(units)
        .ok_or_else(|| ApiError::field("guests", "total amount is too large"))?;
    Ok((total, currency))
}

/// Move a booking to `next`, emitting `booking.status_changed` when something changed
pub(crate) fn apply_booking_status(
    state: &AppState,
    id: i64,
    next: BookingStatus,
) -> ApiResult<Booking> {
    match state.db.transition_booking(id, next)? {
        Transition::NotFound => Err(ApiError::not_found("Booking")),
        Transition::Unchanged(booking) => Ok(booking),
        Transition::Rejected { current } => Err(ApiError::Conflict(format!(
            "Cannot change booking status from {} to {}",
            current, next
        ))),
        Transition::Applied { record, previous } => {
            log::info!(
                "Booking {} moved from {} to {}",
                record.reference,
                previous,
                record.status
            );
            state.n8n.trigger(
                "booking.status_changed",
                json!({ "booking": &record, "previous_status": previous }),
            );
            Ok(record)
        }
    }
}

async fn create_booking(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Json<CreateBookingRequest>,
) -> ApiResult<HttpResponse> {
    body.validate()?;
    let user = optional_session(&state.db, &req)?;
    let (total_amount, currency) = price_booking(&state.db, &body)?;

    let body = body.into_inner();
    let booking = state.db.create_booking(&NewBooking {
        reference: generate_reference(),
        user_id: user.map(|u| u.id()),
        item_type: body.item_type,
        item_id: body.item_id,
        customer_name: body.customer_name,
        customer_email: body.customer_email,
        customer_phone: body.customer_phone,
        guests: body.guests,
        start_date: body.start_date,
        end_date: body.end_date,
        notes: body.notes,
        total_amount,
        currency,
    })?;

    log::info!(
        "Booking {} created for {} {} ({} {})",
        booking.reference,
        booking.item_type,
        booking.item_id,
        booking.total_amount,
        booking.currency
    );
    state.n8n.trigger("booking.created", json!({ "booking": &booking }));

    Ok(HttpResponse::Created().json(json!({ "success": true, "booking": booking })))
}

async fn list_my_bookings(state: web::Data<AppState>, req: HttpRequest) -> ApiResult<HttpResponse> {
    let auth = require_session(&state.db, &req)?;
    let bookings = state.db.list_bookings_for_user(auth.id())?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "bookings": bookings })))
}

async fn list_bookings(
    state: web::Data<AppState>,
    req: HttpRequest,
    query: web::Query<BookingFilter>,
) -> ApiResult<HttpResponse> {
    require_role(&state.db, &req, STAFF)?;
    let bookings = state.db.list_bookings(&query)?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "bookings": bookings })))
}

async fn get_booking(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> ApiResult<HttpResponse> {
    require_role(&state.db, &req, STAFF)?;
    let id = path.into_inner();
    let booking = state.db.get_booking(id)?.ok_or_else(|| ApiError::not_found("Booking"))?;
    let payments = state.db.list_payments_for_booking(id)?;
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "booking": booking,
        "payments": payments,
    })))
}

async fn update_status(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<i64>,
    body: web::Json<UpdateBookingStatusRequest>,
) -> ApiResult<HttpResponse> {
    require_role(&state.db, &req, STAFF)?;
    let booking = apply_booking_status(&state, path.into_inner(), body.status)?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "booking": booking })))
}

async fn delete_booking(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> ApiResult<HttpResponse> {
    let auth = require_role(&state.db, &req, ADMIN_ONLY)?;
    let id = path.into_inner();
    if !state.db.delete_booking(id)? {
        return Err(ApiError::not_found("Booking"));
    }
    log::info!("User {} deleted booking {}", auth.id(), id);
    Ok(HttpResponse::Ok().json(json!({ "success": true })))
}
