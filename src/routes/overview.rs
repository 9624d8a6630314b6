use actix_web::{HttpResponse, get, web};
use sea_orm::{DatabaseConnection, EntityTrait, PaginatorTrait};

use crate::error::ApiError;
use crate::models::announcement::Entity as Announcement;
use crate::models::dto::OverviewResponse;
use crate::services::event_service::EventService;
use crate::services::note_service::NoteService;
use crate::services::tip_service::TipService;

/// GET /api/overview - Compteurs pour la page d'accueil (PUBLIC)
#[get("/overview")]
pub async fn overview(db: web::Data<DatabaseConnection>) -> Result<HttpResponse, ApiError> {
    let db = db.get_ref();

    let (notes, tips, events, announcements) = futures::try_join!(
        NoteService::count_approved(db),
        TipService::count_approved(db),
        EventService::count_upcoming(db),
        Announcement::find().count(db),
    )?;

    Ok(HttpResponse::Ok().json(OverviewResponse {
        notes,
        tips,
        events,
        announcements,
    }))
}
