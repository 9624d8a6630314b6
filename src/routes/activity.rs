use actix_web::{HttpResponse, get, web};
use sea_orm::DatabaseConnection;
use serde_json::json;

use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::services::activity_service::ActivityService;

/// GET /activity/recent - 10 dernières actions de l'utilisateur connecté (PROTÉGÉE)
#[get("/recent")]
pub async fn my_recent_activity(
    auth_user: AuthUser,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, ApiError> {
    let activity = ActivityService::recent_for_user(db.get_ref(), auth_user.user_id).await?;

    Ok(HttpResponse::Ok().json(json!({ "activity": activity })))
}

pub fn activity_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::scope("/activity").service(my_recent_activity));
}
