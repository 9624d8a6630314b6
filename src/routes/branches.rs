use actix_web::{HttpResponse, get, web};
use sea_orm::{DatabaseConnection, DbErr, EntityTrait, QueryOrder};
use serde_json::json;

use crate::error::ApiError;
use crate::models::branch::{self, Entity as Branch};

/// Toutes les filières, triées par nom
pub async fn load_branches(db: &DatabaseConnection) -> Result<Vec<branch::Model>, DbErr> {
    Branch::find().order_by_asc(branch::Column::Name).all(db).await
}

/// GET /branches - Liste des filières (PUBLIC)
#[get("")]
pub async fn get_branches(db: web::Data<DatabaseConnection>) -> Result<HttpResponse, ApiError> {
    let branches = load_branches(db.get_ref()).await?;

    Ok(HttpResponse::Ok().json(json!({ "branches": branches })))
}

pub fn branch_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::scope("/branches").service(get_branches));
}
