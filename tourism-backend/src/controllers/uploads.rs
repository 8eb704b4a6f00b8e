use actix_multipart::Multipart;
use actix_web::{web, HttpRequest, HttpResponse};
use futures_util::StreamExt;
use serde_json::json;
use std::path::Path;

use crate::errors::{ApiError, ApiResult};
use crate::middleware::require_role;
use crate::models::STAFF;
use crate::AppState;

const ALLOWED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp", "svg", "pdf"];

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.route("/api/uploads", web::post().to(upload));
}

/// Reduce a client-supplied file name to `[a-z0-9._-]`, dropping any directory part
fn sanitize_filename(raw: &str) -> String {
    let base = raw.rsplit(['/', '\\']).next().unwrap_or(raw);
    let cleaned: String = base
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c.to_ascii_lowercase()
            } else {
                '-'
            }
        })
        .collect();
    cleaned.trim_start_matches('.').to_string()
}

fn allowed_extension(name: &str) -> Option<String> {
    let ext = Path::new(name).extension()?.to_str()?.to_ascii_lowercase();
    ALLOWED_EXTENSIONS.contains(&ext.as_str()).then_some(ext)
}

async fn upload(
    state: web::Data<AppState>,
    req: HttpRequest,
    mut payload: Multipart,
) -> ApiResult<HttpResponse> {
    let auth = require_role(&state.db, &req, STAFF)?;
    let limit = state.config.max_upload_bytes;

    while let Some(item) = payload.next().await {
        let mut field =
            item.map_err(|e| ApiError::BadRequest(format!("Invalid multipart body: {}", e)))?;
        let disposition = field.content_disposition();
        let is_file = disposition.get_name() == Some("file");
        let original = disposition.get_filename().unwrap_or_default().to_string();
        if !is_file {
            while field.next().await.is_some() {}
            continue;
        }

        let name = sanitize_filename(&original);
        if name.is_empty() || allowed_extension(&name).is_none() {
            return Err(ApiError::field(
                "file",
                &format!("File type not allowed; accepted: {}", ALLOWED_EXTENSIONS.join(", ")),
            ));
        }

        let mut data = Vec::new();
        while let Some(chunk) = field.next().await {
            let chunk =
                chunk.map_err(|e| ApiError::BadRequest(format!("Upload interrupted: {}", e)))?;
            if data.len() + chunk.len() > limit {
                return Err(ApiError::PayloadTooLarge(format!(
                    "File exceeds the {} byte limit",
                    limit
                )));
            }
            data.extend_from_slice(&chunk);
        }
        if data.is_empty() {
            return Err(ApiError::field("file", "File is empty"));
        }

        let filename = format!("{}-{}", chrono::Utc::now().timestamp_millis(), name);
        let dir = Path::new(&state.config.upload_dir);
        tokio::fs::create_dir_all(dir).await?;
        tokio::fs::write(dir.join(&filename), &data).await?;

        log::info!("User {} uploaded {} ({} bytes)", auth.id(), filename, data.len());
        return Ok(HttpResponse::Created().json(json!({
            "success": true,
            "url": format!("/uploads/{}", filename),
            "filename": filename,
            "size": data.len(),
        })));
    }

    Err(ApiError::field("file", "A file field is required"))
}
