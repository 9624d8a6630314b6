use actix_web::{HttpResponse, delete, get, post, put, web};
use sea_orm::DatabaseConnection;
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use crate::error::ApiError;
use crate::middleware::AdminUser;
use crate::models::dto::{SubjectQuery, SubjectRequest};
use crate::services::subject_service::SubjectService;

/// POST /subjects/subject - Créer une matière (ADMIN)
#[post("/subject")]
pub async fn create_subject(
    _admin: AdminUser,
    body: web::Json<SubjectRequest>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, ApiError> {
    body.validate()?;

    let subject = SubjectService::create(db.get_ref(), body.into_inner()).await?;

    Ok(HttpResponse::Created().json(json!({ "subject": subject })))
}

/// GET /subjects/subject?semester=&branch= - Matières filtrées (PUBLIC)
#[get("/subject")]
pub async fn get_subjects_filtered(
    query: web::Query<SubjectQuery>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, ApiError> {
    let subjects = SubjectService::list(db.get_ref(), &query).await?;

    Ok(HttpResponse::Ok().json(subjects))
}

/// GET /subjects/subjects - Toutes les matières (PUBLIC)
#[get("/subjects")]
pub async fn get_all_subjects(db: web::Data<DatabaseConnection>) -> Result<HttpResponse, ApiError> {
    let query = SubjectQuery {
        semester: None,
        branch: None,
    };
    let subjects = SubjectService::list(db.get_ref(), &query).await?;

    Ok(HttpResponse::Ok().json(subjects))
}

/// GET /subjects/subject/{id} - Matière et ses filières (PUBLIC)
#[get("/subject/{id}")]
pub async fn get_subject(
    path: web::Path<Uuid>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, ApiError> {
    let subject = SubjectService::find(db.get_ref(), path.into_inner()).await?;

    Ok(HttpResponse::Ok().json(subject))
}

/// PUT /subjects/subject/{id} - Remplacer nom, semestre, filières (ADMIN)
#[put("/subject/{id}")]
pub async fn update_subject(
    _admin: AdminUser,
    path: web::Path<Uuid>,
    body: web::Json<SubjectRequest>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, ApiError> {
    body.validate()?;

    let subject = SubjectService::update(db.get_ref(), path.into_inner(), body.into_inner()).await?;

    Ok(HttpResponse::Ok().json(subject))
}

/// DELETE /subjects/subject/{id} - Supprimer une matière sans notes (ADMIN)
#[delete("/subject/{id}")]
pub async fn delete_subject(
    _admin: AdminUser,
    path: web::Path<Uuid>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, ApiError> {
    SubjectService::delete(db.get_ref(), path.into_inner()).await?;

    Ok(HttpResponse::Ok().json(json!({ "message": "Subject deleted" })))
}

pub fn subject_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/subjects")
            .service(create_subject)
            .service(get_subjects_filtered)
            .service(get_all_subjects)
            .service(get_subject)
            .service(update_subject)
            .service(delete_subject),
    );
}
