//! Tours, homestays and services
//!
//! Public routes only see published items, looked up by slug. Staff routes under
//! `/api/admin` work on ids and see drafts too.

use actix_web::{web, HttpRequest, HttpResponse};

use crate::errors::{conflict_on_unique, ApiError, ApiResult};
use crate::middleware::require_role;
use crate::models::{
    CreateHomestayRequest, CreateServiceRequest, CreateTourRequest, UpdateHomestayRequest,
    UpdateServiceRequest, UpdateTourRequest, STAFF,
};
use crate::validation::{slugify, Validate};
use crate::AppState;

const SLUG_TAKEN: &str = "Slug already exists";

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/tours")
            .route("", web::get().to(list_published_tours))
            .route("/{slug}", web::get().to(get_tour_by_slug)),
    )
    .service(
        web::scope("/api/homestays")
            .route("", web::get().to(list_published_homestays))
            .route("/{slug}", web::get().to(get_homestay_by_slug)),
    )
    .service(
        web::scope("/api/services")
            .route("", web::get().to(list_published_services))
            .route("/{slug}", web::get().to(get_service_by_slug)),
    )
    .service(
        web::scope("/api/admin/tours")
            .route("", web::get().to(list_tours))
            .route("", web::post().to(create_tour))
            .route("/{id}", web::get().to(get_tour))
            .route("/{id}", web::put().to(update_tour))
            .route("/{id}", web::delete().to(delete_tour)),
    )
    .service(
        web::scope("/api/admin/homestays")
            .route("", web::get().to(list_homestays))
            .route("", web::post().to(create_homestay))
            .route("/{id}", web::get().to(get_homestay))
            .route("/{id}", web::put().to(update_homestay))
            .route("/{id}", web::delete().to(delete_homestay)),
    )
    .service(
        web::scope("/api/admin/services")
            .route("", web::get().to(list_services))
            .route("", web::post().to(create_service))
            .route("/{id}", web::get().to(get_service))
            .route("/{id}", web::put().to(update_service))
            .route("/{id}", web::delete().to(delete_service)),
    );
}

/// Explicit slug, or one derived from the title
fn resolve_slug(explicit: Option<&str>, title: &str) -> ApiResult<String> {
    let slug = match explicit {
        Some(s) => s.to_string(),
        None => slugify(title),
    };
    if slug.is_empty() {
        return Err(ApiError::field("slug", "could not be derived from the title"));
    }
    Ok(slug)
}

fn deleted(found: bool, what: &str) -> ApiResult<HttpResponse> {
    if !found {
        return Err(ApiError::not_found(what));
    }
    Ok(HttpResponse::Ok().json(serde_json::json!({ "success": true })))
}

// Tours

async fn list_published_tours(state: web::Data<AppState>) -> ApiResult<HttpResponse> {
    let tours = state.db.list_tours(true)?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "success": true, "tours": tours })))
}

async fn get_tour_by_slug(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let tour = state
        .db
        .get_tour_by_slug(&path)?
        .filter(|t| t.published)
        .ok_or_else(|| ApiError::not_found("Tour"))?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "success": true, "tour": tour })))
}

async fn list_tours(state: web::Data<AppState>, req: HttpRequest) -> ApiResult<HttpResponse> {
    require_role(&state.db, &req, STAFF)?;
    let tours = state.db.list_tours(false)?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "success": true, "tours": tours })))
}

async fn get_tour(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> ApiResult<HttpResponse> {
    require_role(&state.db, &req, STAFF)?;
    let tour = state
        .db
        .get_tour(path.into_inner())?
        .ok_or_else(|| ApiError::not_found("Tour"))?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "success": true, "tour": tour })))
}

async fn create_tour(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Json<CreateTourRequest>,
) -> ApiResult<HttpResponse> {
    let auth = require_role(&state.db, &req, STAFF)?;
    body.validate()?;

    let slug = resolve_slug(body.slug.as_deref(), &body.title)?;
    let tour = state
        .db
        .create_tour(&body, &slug)
        .map_err(|e| conflict_on_unique(e, SLUG_TAKEN))?;

    log::info!("User {} created tour {} ({})", auth.id(), tour.id, tour.slug);
    Ok(HttpResponse::Created().json(serde_json::json!({ "success": true, "tour": tour })))
}

async fn update_tour(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<i64>,
    body: web::Json<UpdateTourRequest>,
) -> ApiResult<HttpResponse> {
    require_role(&state.db, &req, STAFF)?;
    body.validate()?;

    let tour = state
        .db
        .update_tour(path.into_inner(), &body)
        .map_err(|e| conflict_on_unique(e, SLUG_TAKEN))?
        .ok_or_else(|| ApiError::not_found("Tour"))?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "success": true, "tour": tour })))
}

async fn delete_tour(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> ApiResult<HttpResponse> {
    require_role(&state.db, &req, STAFF)?;
    deleted(state.db.delete_tour(path.into_inner())?, "Tour")
}

// Homestays

async fn list_published_homestays(state: web::Data<AppState>) -> ApiResult<HttpResponse> {
    let homestays = state.db.list_homestays(true)?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "success": true, "homestays": homestays })))
}

async fn get_homestay_by_slug(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let homestay = state
        .db
        .get_homestay_by_slug(&path)?
        .filter(|h| h.published)
        .ok_or_else(|| ApiError::not_found("Homestay"))?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "success": true, "homestay": homestay })))
}

async fn list_homestays(state: web::Data<AppState>, req: HttpRequest) -> ApiResult<HttpResponse> {
    require_role(&state.db, &req, STAFF)?;
    let homestays = state.db.list_homestays(false)?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "success": true, "homestays": homestays })))
}

async fn get_homestay(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> ApiResult<HttpResponse> {
    require_role(&state.db, &req, STAFF)?;
    let homestay = state
        .db
        .get_homestay(path.into_inner())?
        .ok_or_else(|| ApiError::not_found("Homestay"))?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "success": true, "homestay": homestay })))
}

async fn create_homestay(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Json<CreateHomestayRequest>,
) -> ApiResult<HttpResponse> {
    let auth = require_role(&state.db, &req, STAFF)?;
    body.validate()?;

    let slug = resolve_slug(body.slug.as_deref(), &body.name)?;
    let homestay = state
        .db
        .create_homestay(&body, &slug)
        .map_err(|e| conflict_on_unique(e, SLUG_TAKEN))?;

    log::info!("User {} created homestay {} ({})", auth.id(), homestay.id, homestay.slug);
    Ok(HttpResponse::Created().json(serde_json::json!({ "success": true, "homestay": homestay })))
}

async fn update_homestay(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<i64>,
    body: web::Json<UpdateHomestayRequest>,
) -> ApiResult<HttpResponse> {
    require_role(&state.db, &req, STAFF)?;
    body.validate()?;

    let homestay = state
        .db
        .update_homestay(path.into_inner(), &body)
        .map_err(|e| conflict_on_unique(e, SLUG_TAKEN))?
        .ok_or_else(|| ApiError::not_found("Homestay"))?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "success": true, "homestay": homestay })))
}

async fn delete_homestay(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> ApiResult<HttpResponse> {
    require_role(&state.db, &req, STAFF)?;
    deleted(state.db.delete_homestay(path.into_inner())?, "Homestay")
}

// Services

async fn list_published_services(state: web::Data<AppState>) -> ApiResult<HttpResponse> {
    let services = state.db.list_services(true)?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "success": true, "services": services })))
}

async fn get_service_by_slug(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let service = state
        .db
        .get_service_by_slug(&path)?
        .filter(|s| s.published)
        .ok_or_else(|| ApiError::not_found("Service"))?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "success": true, "service": service })))
}

async fn list_services(state: web::Data<AppState>, req: HttpRequest) -> ApiResult<HttpResponse> {
    require_role(&state.db, &req, STAFF)?;
    let services = state.db.list_services(false)?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "success": true, "services": services })))
}

async fn get_service(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> ApiResult<HttpResponse> {
    require_role(&state.db, &req, STAFF)?;
    let service = state
        .db
        .get_service(path.into_inner())?
        .ok_or_else(|| ApiError::not_found("Service"))?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "success": true, "service": service })))
}

async fn create_service(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Json<CreateServiceRequest>,
) -> ApiResult<HttpResponse> {
    let auth = require_role(&state.db, &req, STAFF)?;
    body.validate()?;

    let slug = resolve_slug(body.slug.as_deref(), &body.name)?;
    let service = state
        .db
        .create_service(&body, &slug)
        .map_err(|e| conflict_on_unique(e, SLUG_TAKEN))?;

    log::info!("User {} created service {} ({})", auth.id(), service.id, service.slug);
    Ok(HttpResponse::Created().json(serde_json::json!({ "success": true, "service": service })))
}

async fn update_service(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<i64>,
    body: web::Json<UpdateServiceRequest>,
) -> ApiResult<HttpResponse> {
    require_role(&state.db, &req, STAFF)?;
    body.validate()?;

    let service = state
        .db
        .update_service(path.into_inner(), &body)
        .map_err(|e| conflict_on_unique(e, SLUG_TAKEN))?
        .ok_or_else(|| ApiError::not_found("Service"))?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "success": true, "service": service })))
}

async fn delete_service(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> ApiResult<HttpResponse> {
    require_role(&state.db, &req, STAFF)?;
    deleted(state.db.delete_service(path.into_inner())?, "Service")
}

#[cfg(test)]
mod tests {
    use crate::controllers::test_support::*;
    use crate::models::Role;
    use actix_web::http::StatusCode;
    use actix_web::test;
    use serde_json::{json, Value};

    #[actix_web::test]
    async fn test_tour_crud_and_publication() {
        let state = state();
        let app = test_app!(state);
        let editor = token_for(&state, Role::Editor);

        let req = test::TestRequest::post()
            .uri("/api/admin/tours")
            .insert_header(bearer(&editor))
            .set_json(json!({"title": "Hạ Long Bay Cruise", "price": 2500000}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let body: Value = test::read_body_json(resp).await;
        let id = body["tour"]["id"].as_i64().unwrap();
        assert_eq!(body["tour"]["slug"], "ha-long-bay-cruise");
        assert_eq!(body["tour"]["currency"], "VND");

        // Drafts are hidden from the public
        let req = test::TestRequest::get().uri("/api/tours/ha-long-bay-cruise").to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);

        let req = test::TestRequest::put()
            .uri(&format!("/api/admin/tours/{}", id))
            .insert_header(bearer(&editor))
            .set_json(json!({"published": true}))
            .to_request();
        assert!(test::call_service(&app, req).await.status().is_success());

        let req = test::TestRequest::get().uri("/api/tours").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["tours"].as_array().unwrap().len(), 1);

        let req = test::TestRequest::delete()
            .uri(&format!("/api/admin/tours/{}", id))
            .insert_header(bearer(&editor))
            .to_request();
        assert!(test::call_service(&app, req).await.status().is_success());

        let req = test::TestRequest::delete()
            .uri(&format!("/api/admin/tours/{}", id))
            .insert_header(bearer(&editor))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn test_duplicate_slug_conflicts() {
        let state = state();
        let app = test_app!(state);
        let admin = token_for(&state, Role::Admin);

        let create = || {
            test::TestRequest::post()
                .uri("/api/admin/homestays")
                .insert_header(bearer(&admin))
                .set_json(json!({"name": "Sapa Valley House", "price_per_night": 800000}))
                .to_request()
        };
        assert_eq!(test::call_service(&app, create()).await.status(), StatusCode::CREATED);
        assert_eq!(test::call_service(&app, create()).await.status(), StatusCode::CONFLICT);
    }

    #[actix_web::test]
    async fn test_catalog_writes_require_staff() {
        let state = state();
        let app = test_app!(state);
        let user = token_for(&state, Role::User);

        let req = test::TestRequest::post()
            .uri("/api/admin/services")
            .insert_header(bearer(&user))
            .set_json(json!({"name": "Airport pickup", "price": 300000}))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);

        let req = test::TestRequest::post()
            .uri("/api/admin/services")
            .set_json(json!({"name": "Airport pickup", "price": 300000}))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn test_invalid_tour_is_rejected() {
        let state = state();
        let app = test_app!(state);
        let admin = token_for(&state, Role::Admin);

        let req = test::TestRequest::post()
            .uri("/api/admin/tours")
            .insert_header(bearer(&admin))
            .set_json(json!({"title": " ", "price": -5, "slug": "Bad Slug"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body: Value = test::read_body_json(resp).await;
        let fields: Vec<&str> = body["details"]
            .as_array()
            .unwrap()
            .iter()
            .map(|d| d["field"].as_str().unwrap())
            .collect();
        assert_eq!(fields, vec!["title", "slug", "price"]);
    }
}
