//! Homepage CMS
//!
//! The public page only shows visible PUBLISHED blocks. Editors work on drafts:
//! create/update/save always leave blocks in DRAFT until `publish` is called.

use actix_web::{web, HttpRequest, HttpResponse};
use serde_json::json;

use crate::db::{PublishOutcome, SaveOutcome, SortOutcome};
use crate::errors::{ApiError, ApiResult};
use crate::homepage::validate_fields;
use crate::middleware::require_role;
use crate::models::{
    CreateBlockRequest, PublishRequest, SaveSectionsRequest, SortRequest,
    UpdateBlockRequest, STAFF,
};
use crate::validation::{FieldError, Validator};
use crate::AppState;

const MAX_TITLE_LEN: usize = 200;

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/api/homepage").route(web::get().to(public_homepage)));
    cfg.service(
        web::scope("/api/admin/homepage")
            .route("/blocks", web::get().to(list_blocks))
            .route("/blocks", web::post().to(create_block))
            .route("/blocks/{id}", web::get().to(get_block))
            .route("/blocks/{id}", web::put().to(update_block))
            .route("/blocks/{id}", web::delete().to(delete_block))
            .route("/blocks/{id}/unpublish", web::post().to(unpublish_block))
            .route("/sort", web::put().to(sort_blocks))
            .route("/save", web::put().to(save_sections))
            .route("/publish", web::post().to(publish)),
    );
}

fn check_title(v: &mut Validator, field: &str, title: Option<&str>) {
    v.optional(field, title, MAX_TITLE_LEN);
}

fn fail_on(errors: Vec<FieldError>) -> ApiResult<()> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(ApiError::Validation(errors))
    }
}

async fn public_homepage(state: web::Data<AppState>) -> ApiResult<HttpResponse> {
    let blocks = state.db.list_blocks(true)?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "blocks": blocks })))
}

async fn list_blocks(state: web::Data<AppState>, req: HttpRequest) -> ApiResult<HttpResponse> {
    require_role(&state.db, &req, STAFF)?;
    let blocks = state.db.list_blocks(false)?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "blocks": blocks })))
}

async fn get_block(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> ApiResult<HttpResponse> {
    require_role(&state.db, &req, STAFF)?;
    let block = state
        .db
        .get_block(path.into_inner())?
        .ok_or_else(|| ApiError::not_found("Block"))?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "block": block })))
}

async fn create_block(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Json<CreateBlockRequest>,
) -> ApiResult<HttpResponse> {
    require_role(&state.db, &req, STAFF)?;

    let mut v = Validator::new();
    check_title(&mut v, "title", body.title.as_deref());
    v.finish()?;
    fail_on(validate_fields(body.block_type, &body.fields, "fields"))?;

    let block = state.db.create_block(&body)?;
    log::info!("Created {} block {}", block.block_type, block.id);
    Ok(HttpResponse::Created().json(json!({ "success": true, "block": block })))
}

async fn update_block(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<i64>,
    body: web::Json<UpdateBlockRequest>,
) -> ApiResult<HttpResponse> {
    require_role(&state.db, &req, STAFF)?;
    let id = path.into_inner();
    let existing = state.db.get_block(id)?.ok_or_else(|| ApiError::not_found("Block"))?;

    let mut v = Validator::new();
    check_title(&mut v, "title", body.title.as_deref());
    v.finish()?;
    if let Some(fields) = &body.fields {
        fail_on(validate_fields(existing.block_type, fields, "fields"))?;
    }

    let block = state
        .db
        .update_block(id, &body)?
        .ok_or_else(|| ApiError::not_found("Block"))?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "block": block })))
}

async fn delete_block(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> ApiResult<HttpResponse> {
    require_role(&state.db, &req, STAFF)?;
    if !state.db.delete_block(path.into_inner())? {
        return Err(ApiError::not_found("Block"));
    }
    Ok(HttpResponse::Ok().json(json!({ "success": true })))
}

async fn unpublish_block(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> ApiResult<HttpResponse> {
    require_role(&state.db, &req, STAFF)?;
    let block = state
        .db
        .unpublish_block(path.into_inner())?
        .ok_or_else(|| ApiError::not_found("Block"))?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "block": block })))
}

async fn sort_blocks(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Json<SortRequest>,
) -> ApiResult<HttpResponse> {
    require_role(&state.db, &req, STAFF)?;

    match state.db.sort_blocks(&body.items)? {
        SortOutcome::Sorted(blocks) => {
            Ok(HttpResponse::Ok().json(json!({ "success": true, "blocks": blocks })))
        }
        SortOutcome::UnknownBlock(id) => Err(ApiError::NotFound(format!("Block {} not found", id))),
    }
}

async fn save_sections(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Json<SaveSectionsRequest>,
) -> ApiResult<HttpResponse> {
    let auth = require_role(&state.db, &req, STAFF)?;

    let mut v = Validator::new();
    for (index, section) in body.sections.iter().enumerate() {
        check_title(&mut v, &format!("sections[{}].title", index), section.title.as_deref());
    }
    v.finish()?;

    let (plan, blocks) = match state.db.save_sections(&body.sections)? {
        SaveOutcome::Saved { plan, blocks } => (plan, blocks),
        SaveOutcome::Rejected(errors) => return Err(ApiError::Validation(errors)),
    };

    log::info!(
        "User {} saved homepage: {} created, {} updated, {} deleted",
        auth.id(),
        plan.creates.len(),
        plan.updates.len(),
        plan.deletes.len()
    );
    Ok(HttpResponse::Ok().json(json!({ "success": true, "blocks": blocks })))
}

/// An empty body publishes every block; `{"ids": [...]}` publishes only those
async fn publish(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Bytes,
) -> ApiResult<HttpResponse> {
    let auth = require_role(&state.db, &req, STAFF)?;
    let body: PublishRequest = if body.iter().all(u8::is_ascii_whitespace) {
        PublishRequest::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| ApiError::BadRequest(format!("Invalid JSON body: {}", e)))?
    };

    let published = match state.db.publish_blocks(body.ids.as_deref())? {
        PublishOutcome::Published(count) => count,
        PublishOutcome::UnknownBlock(id) => {
            return Err(ApiError::NotFound(format!("Block {} not found", id)))
        }
    };
    log::info!("User {} published {} homepage block(s)", auth.id(), published);
    Ok(HttpResponse::Ok().json(json!({ "success": true, "published": published })))
}
