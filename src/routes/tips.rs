use actix_web::{HttpResponse, delete, get, post, put, web};
use sea_orm::DatabaseConnection;
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use crate::error::ApiError;
use crate::middleware::{AdminUser, AuthUser};
use crate::models::dto::{ModerateTipRequest, PageQuery, TipRequest};
use crate::services::tip_service::TipService;

/// POST /tips/tip - Proposer un tip, en attente de modération (PROTÉGÉE)
#[post("/tip")]
pub async fn create_tip(
    auth_user: AuthUser,
    body: web::Json<TipRequest>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, ApiError> {
    body.validate()?;

    let tip = TipService::create(db.get_ref(), &auth_user, body.into_inner()).await?;

    Ok(HttpResponse::Created().json(json!({
        "message": "Tip submitted for approval",
        "tip": tip,
    })))
}

/// GET /tips/tip/all - Tips approuvés (PUBLIC)
#[get("/tip/all")]
pub async fn get_approved_tips(db: web::Data<DatabaseConnection>) -> Result<HttpResponse, ApiError> {
    let tips = TipService::list_approved(db.get_ref()).await?;

    Ok(HttpResponse::Ok().json(json!({ "tips": tips })))
}

/// GET /tips/tip/pending?page=&limit= - Tips à modérer, paginés (ADMIN)
#[get("/tip/pending")]
pub async fn get_pending_tips(
    _admin: AdminUser,
    query: web::Query<PageQuery>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, ApiError> {
    let pending = TipService::list_pending(db.get_ref(), query.page, query.limit).await?;

    Ok(HttpResponse::Ok().json(pending))
}

/// PUT /tips/tip/approve/{id} - APPROVED ou REJECTED (ADMIN)
#[put("/tip/approve/{id}")]
pub async fn moderate_tip(
    admin: AdminUser,
    path: web::Path<Uuid>,
    body: web::Json<ModerateTipRequest>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, ApiError> {
    let AdminUser(admin) = admin;
    let tip = TipService::moderate(db.get_ref(), path.into_inner(), body.status, admin.user_id).await?;

    Ok(HttpResponse::Ok().json(json!({
        "message": "Tip status updated",
        "tip": tip,
    })))
}

/// DELETE /tips/tip/{id} - Supprimer son tip (ou n'importe lequel en admin) (PROTÉGÉE)
#[delete("/tip/{id}")]
pub async fn delete_tip(
    auth_user: AuthUser,
    path: web::Path<Uuid>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, ApiError> {
    TipService::delete(db.get_ref(), &auth_user, path.into_inner()).await?;

    Ok(HttpResponse::Ok().json(json!({ "message": "Tip deleted" })))
}

pub fn tip_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/tips")
            .service(create_tip)
            .service(get_approved_tips)
            .service(get_pending_tips)
            .service(moderate_tip)
            .service(delete_tip),
    );
}
