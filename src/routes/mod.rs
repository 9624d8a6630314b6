pub mod activity;
pub mod announcements;
pub mod branches;
pub mod events;
pub mod feedback;
pub mod files;
pub mod health;
pub mod notes;
pub mod overview;
pub mod subjects;
pub mod tips;
pub mod users;

use actix_web::web;

use crate::error::ApiError;

// Taille max d'un body JSON (les fichiers passent en multipart)
const JSON_LIMIT: usize = 1024 * 1024;

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    // Erreurs d'extraction (JSON invalide, query/path mal formés) → 400 {message}
    cfg.app_data(
        web::JsonConfig::default()
            .limit(JSON_LIMIT)
            .error_handler(|err, _req| ApiError::BadRequest(err.to_string()).into()),
    )
    .app_data(
        web::QueryConfig::default()
            .error_handler(|err, _req| ApiError::BadRequest(err.to_string()).into()),
    )
    .app_data(
        web::PathConfig::default()
            .error_handler(|err, _req| ApiError::BadRequest(err.to_string()).into()),
    );

    cfg.service(
        web::scope("/api")
            .service(health::health_check)
            .service(overview::overview)
            .service(
                web::scope("/v1")
                    .configure(users::user_routes)
                    .configure(branches::branch_routes)
                    .configure(subjects::subject_routes)
                    .configure(notes::note_routes)
                    .configure(tips::tip_routes)
                    .configure(events::event_routes)
                    .configure(announcements::announcement_routes)
                    .configure(feedback::feedback_routes)
                    .configure(files::file_routes)
                    .configure(activity::activity_routes),
            ),
    );
}
