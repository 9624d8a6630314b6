use actix_multipart::Multipart;
use actix_web::{HttpResponse, delete, get, post, web};
use sea_orm::DatabaseConnection;
use serde_json::json;
use uuid::Uuid;

use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::services::activity_service::ActivityService;
use crate::services::file_service::FileService;
use crate::services::storage::FileStorage;
use crate::utils::multipart::{MAX_UPLOAD_BYTES, read_form};

/// POST /files/file - Partager un fichier (multipart: file, name?) (PROTÉGÉE)
#[post("/file")]
pub async fn upload_file(
    auth_user: AuthUser,
    payload: Multipart,
    db: web::Data<DatabaseConnection>,
    storage: web::Data<dyn FileStorage>,
) -> Result<HttpResponse, ApiError> {
    let form = read_form(payload, "file", MAX_UPLOAD_BYTES).await?;

    let file = FileService::upload(db.get_ref(), storage.get_ref(), &auth_user, form).await?;

    Ok(HttpResponse::Created().json(json!({
        "message": "File uploaded successfully",
        "file": file,
    })))
}

/// GET /files/files - Tous les fichiers, les plus récents d'abord (PUBLIC)
#[get("/files")]
pub async fn get_files(db: web::Data<DatabaseConnection>) -> Result<HttpResponse, ApiError> {
    let files = FileService::list(db.get_ref()).await?;

    Ok(HttpResponse::Ok().json(json!({ "files": files })))
}

/// GET /files/file/{id} (PUBLIC)
#[get("/file/{id}")]
pub async fn get_file(
    path: web::Path<Uuid>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, ApiError> {
    let file = FileService::find(db.get_ref(), path.into_inner()).await?;

    Ok(HttpResponse::Ok().json(json!({ "file": file })))
}

/// DELETE /files/file/{id} - Propriétaire ou admin (PROTÉGÉE)
#[delete("/file/{id}")]
pub async fn delete_file(
    auth_user: AuthUser,
    path: web::Path<Uuid>,
    db: web::Data<DatabaseConnection>,
    storage: web::Data<dyn FileStorage>,
) -> Result<HttpResponse, ApiError> {
    FileService::delete(db.get_ref(), storage.get_ref(), &auth_user, path.into_inner()).await?;

    Ok(HttpResponse::Ok().json(json!({ "message": "File deleted successfully" })))
}

/// GET /files/recent-activity - 10 dernières actions, tous utilisateurs (PUBLIC)
#[get("/recent-activity")]
pub async fn recent_activity(db: web::Data<DatabaseConnection>) -> Result<HttpResponse, ApiError> {
    let activity = ActivityService::recent(db.get_ref()).await?;

    Ok(HttpResponse::Ok().json(json!({ "activity": activity })))
}

pub fn file_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/files")
            .service(upload_file)
            .service(get_files)
            .service(get_file)
            .service(delete_file)
            .service(recent_activity),
    );
}
