use actix_web::{web, HttpRequest, HttpResponse};
use serde_json::json;

use crate::errors::{conflict_on_unique, ApiError, ApiResult};
use crate::middleware::require_role;
use crate::models::{
    CreateChannelRequest, SyncLogFilter, SyncStatus, UpdateChannelRequest, ADMIN_ONLY,
};
use crate::validation::Validate;
use crate::AppState;

const NAME_TAKEN: &str = "A channel with that name already exists";

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/admin/integrations")
            .route("/channels", web::get().to(list_channels))
            .route("/channels", web::post().to(create_channel))
            .route("/channels/{id}", web::get().to(get_channel))
            .route("/channels/{id}", web::put().to(update_channel))
            .route("/channels/{id}", web::delete().to(delete_channel))
            .route("/channels/{id}/test", web::post().to(test_channel))
            .route("/logs", web::get().to(list_logs)),
    );
}

async fn list_channels(state: web::Data<AppState>, req: HttpRequest) -> ApiResult<HttpResponse> {
    require_role(&state.db, &req, ADMIN_ONLY)?;
    let channels = state.db.list_channels()?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "channels": channels })))
}

async fn get_channel(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> ApiResult<HttpResponse> {
    require_role(&state.db, &req, ADMIN_ONLY)?;
    let channel = state
        .db
        .get_channel(path.into_inner())?
        .ok_or_else(|| ApiError::not_found("Channel"))?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "channel": channel })))
}

async fn create_channel(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Json<CreateChannelRequest>,
) -> ApiResult<HttpResponse> {
    let auth = require_role(&state.db, &req, ADMIN_ONLY)?;
    body.validate()?;

    let channel = state
        .db
        .create_channel(&body)
        .map_err(|e| conflict_on_unique(e, NAME_TAKEN))?;
    log::info!("User {} added integration channel '{}'", auth.id(), channel.name);
    Ok(HttpResponse::Created().json(json!({ "success": true, "channel": channel })))
}

async fn update_channel(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<i64>,
    body: web::Json<UpdateChannelRequest>,
) -> ApiResult<HttpResponse> {
    require_role(&state.db, &req, ADMIN_ONLY)?;
    body.validate()?;

    let channel = state
        .db
        .update_channel(path.into_inner(), &body)
        .map_err(|e| conflict_on_unique(e, NAME_TAKEN))?
        .ok_or_else(|| ApiError::not_found("Channel"))?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "channel": channel })))
}

async fn delete_channel(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> ApiResult<HttpResponse> {
    require_role(&state.db, &req, ADMIN_ONLY)?;
    if !state.db.delete_channel(path.into_inner())? {
        return Err(ApiError::not_found("Channel"));
    }
    Ok(HttpResponse::Ok().json(json!({ "success": true })))
}

/// Send a `test` event and wait for the delivery result
async fn test_channel(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> ApiResult<HttpResponse> {
    require_role(&state.db, &req, ADMIN_ONLY)?;
    let channel = state
        .db
        .get_channel(path.into_inner())?
        .ok_or_else(|| ApiError::not_found("Channel"))?;

    let outcome = state.n8n.send_test(&channel).await;
    Ok(HttpResponse::Ok().json(json!({
        "success": outcome.status == SyncStatus::Success,
        "outcome": outcome,
    })))
}

async fn list_logs(
    state: web::Data<AppState>,
    req: HttpRequest,
    query: web::Query<SyncLogFilter>,
) -> ApiResult<HttpResponse> {
    require_role(&state.db, &req, ADMIN_ONLY)?;
    let logs = state.db.list_sync_logs(&query)?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "logs": logs })))
}
