use actix_web::{HttpResponse, delete, get, post, web};
use sea_orm::DatabaseConnection;
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::models::dto::FeedbackRequest;
use crate::services::feedback_service::FeedbackService;

/// POST /feedback - Commenter une note ou un tip (PROTÉGÉE)
#[post("")]
pub async fn create_feedback(
    auth_user: AuthUser,
    body: web::Json<FeedbackRequest>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, ApiError> {
    body.validate()?;

    let feedback = FeedbackService::create(db.get_ref(), &auth_user, body.into_inner()).await?;

    Ok(HttpResponse::Created().json(json!({
        "message": "Feedback added",
        "feedback": feedback,
    })))
}

/// GET /feedback/{id} - Feedbacks de la note ou du tip {id} (PUBLIC)
#[get("/{id}")]
pub async fn get_feedbacks(
    path: web::Path<Uuid>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, ApiError> {
    let feedbacks = FeedbackService::list_for_target(db.get_ref(), path.into_inner()).await?;

    Ok(HttpResponse::Ok().json(json!({ "feedbacks": feedbacks })))
}

/// DELETE /feedback/{id} - Auteur ou admin (PROTÉGÉE)
#[delete("/{id}")]
pub async fn delete_feedback(
    auth_user: AuthUser,
    path: web::Path<Uuid>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, ApiError> {
    FeedbackService::delete(db.get_ref(), &auth_user, path.into_inner()).await?;

    Ok(HttpResponse::Ok().json(json!({ "message": "Feedback deleted" })))
}

pub fn feedback_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/feedback")
            .service(create_feedback)
            .service(get_feedbacks)
            .service(delete_feedback),
    );
}
