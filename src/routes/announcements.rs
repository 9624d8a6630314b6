use actix_web::{HttpResponse, delete, get, post, put, web};
use sea_orm::DatabaseConnection;
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use crate::error::ApiError;
use crate::middleware::AdminUser;
use crate::models::dto::AnnouncementRequest;
use crate::services::announcement_service::AnnouncementService;

/// POST /announcements - Publier une annonce (ADMIN)
#[post("")]
pub async fn create_announcement(
    admin: AdminUser,
    body: web::Json<AnnouncementRequest>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, ApiError> {
    body.validate()?;

    let AdminUser(admin) = admin;
    let announcement =
        AnnouncementService::create(db.get_ref(), admin.user_id, body.into_inner()).await?;

    Ok(HttpResponse::Created().json(json!({
        "message": "Announcement created",
        "announcement": announcement,
    })))
}

/// GET /announcements/announcement - Annonces, les plus récentes d'abord (PUBLIC)
#[get("/announcement")]
pub async fn get_announcements(db: web::Data<DatabaseConnection>) -> Result<HttpResponse, ApiError> {
    let announcements = AnnouncementService::list(db.get_ref()).await?;

    Ok(HttpResponse::Ok().json(json!({ "announcements": announcements })))
}

/// GET /announcements/announcement/{id} (PUBLIC)
#[get("/announcement/{id}")]
pub async fn get_announcement(
    path: web::Path<Uuid>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, ApiError> {
    let announcement = AnnouncementService::find(db.get_ref(), path.into_inner()).await?;

    Ok(HttpResponse::Ok().json(json!({ "announcement": announcement })))
}

/// PUT /announcements/announcement/{id} (ADMIN)
#[put("/announcement/{id}")]
pub async fn update_announcement(
    _admin: AdminUser,
    path: web::Path<Uuid>,
    body: web::Json<AnnouncementRequest>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, ApiError> {
    body.validate()?;

    let announcement =
        AnnouncementService::update(db.get_ref(), path.into_inner(), body.into_inner()).await?;

    Ok(HttpResponse::Ok().json(json!({
        "message": "Announcement updated",
        "announcement": announcement,
    })))
}

/// DELETE /announcements/announcement/{id} (ADMIN)
#[delete("/announcement/{id}")]
pub async fn delete_announcement(
    _admin: AdminUser,
    path: web::Path<Uuid>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, ApiError> {
    AnnouncementService::delete(db.get_ref(), path.into_inner()).await?;

    Ok(HttpResponse::Ok().json(json!({ "message": "Announcement deleted" })))
}

pub fn announcement_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/announcements")
            .service(create_announcement)
            .service(get_announcements)
            .service(get_announcement)
            .service(update_announcement)
            .service(delete_announcement),
    );
}
