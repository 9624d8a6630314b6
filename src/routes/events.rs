use actix_web::{HttpResponse, delete, get, post, put, web};
use sea_orm::DatabaseConnection;
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use crate::error::ApiError;
use crate::middleware::AdminUser;
use crate::models::dto::EventRequest;
use crate::services::event_service::EventService;

/// POST /events - Créer un événement (ADMIN)
#[post("")]
pub async fn create_event(
    admin: AdminUser,
    body: web::Json<EventRequest>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, ApiError> {
    body.validate()?;

    let AdminUser(admin) = admin;
    let event = EventService::create(db.get_ref(), admin.user_id, body.into_inner()).await?;

    Ok(HttpResponse::Created().json(json!({ "message": "event created", "event": event })))
}

/// GET /events/event - Tous les événements, par date (PUBLIC)
#[get("/event")]
pub async fn get_events(db: web::Data<DatabaseConnection>) -> Result<HttpResponse, ApiError> {
    let events = EventService::list(db.get_ref()).await?;

    Ok(HttpResponse::Ok().json(json!({ "events": events })))
}

/// GET /events/event/{id} (PUBLIC)
#[get("/event/{id}")]
pub async fn get_event(
    path: web::Path<Uuid>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, ApiError> {
    let event = EventService::find(db.get_ref(), path.into_inner()).await?;

    Ok(HttpResponse::Ok().json(json!({ "event": event })))
}

/// PUT /events/event/{id} (ADMIN)
#[put("/event/{id}")]
pub async fn update_event(
    _admin: AdminUser,
    path: web::Path<Uuid>,
    body: web::Json<EventRequest>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, ApiError> {
    body.validate()?;

    let event = EventService::update(db.get_ref(), path.into_inner(), body.into_inner()).await?;

    Ok(HttpResponse::Ok().json(json!({ "message": "Event updated", "event": event })))
}

/// DELETE /events/event/{id} (ADMIN)
#[delete("/event/{id}")]
pub async fn delete_event(
    _admin: AdminUser,
    path: web::Path<Uuid>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, ApiError> {
    EventService::delete(db.get_ref(), path.into_inner()).await?;

    Ok(HttpResponse::Ok().json(json!({ "message": "Event deleted" })))
}

pub fn event_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/events")
            .service(create_event)
            .service(get_events)
            .service(get_event)
            .service(update_event)
            .service(delete_event),
    );
}

#[cfg(test)]
mod tests {
    use actix_web::{http::StatusCode, test};
    use serde_json::{Value, json};

    use crate::models::users::Role;
    use crate::test_support::TestContext;

    #[actix_web::test]
    async fn test_event_lifecycle() {
        let ctx = TestContext::new().await;
        let app = test::init_service(ctx.app()).await;
        let (_, admin_token) = ctx.create_user("admin@example.com", Role::Admin, 1).await;
        let bearer = ("Authorization", format!("Bearer {admin_token}"));

        for (title, date) in [("Hackathon", "2030-05-02"), ("Orientation", "2030-01-15T09:00:00Z")] {
            let req = test::TestRequest::post()
                .uri("/api/v1/events")
                .insert_header(bearer.clone())
                .set_json(json!({ "title": title, "content": "All students welcome.", "eventDate": date }))
                .to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::CREATED);
        }

        let req = test::TestRequest::get().uri("/api/v1/events/event").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["events"][0]["title"], "Orientation");
        let id = body["events"][1]["id"].as_str().unwrap().to_string();

        let req = test::TestRequest::put()
            .uri(&format!("/api/v1/events/event/{id}"))
            .insert_header(bearer.clone())
            .set_json(json!({ "title": "Hackathon 2030", "content": "All students welcome.", "eventDate": "someday" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let req = test::TestRequest::delete()
            .uri(&format!("/api/v1/events/event/{id}"))
            .insert_header(bearer.clone())
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["message"], "Event deleted");

        let req = test::TestRequest::get()
            .uri(&format!("/api/v1/events/event/{id}"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
