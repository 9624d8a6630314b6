use sea_orm::*;
use uuid::Uuid;

use crate::error::ApiError;
use crate::models::dto::EventRequest;
use crate::models::event;
use crate::services::activity_service::ActivityService;

pub struct EventService;

fn parse_date(request: &EventRequest) -> Result<chrono::DateTime<chrono::Utc>, ApiError> {
    request.parsed_event_date().ok_or_else(|| {
        ApiError::BadRequest("eventDate must be an ISO 8601 date (YYYY-MM-DD)".to_string())
    })
}

impl EventService {
    pub async fn create(
        db: &DatabaseConnection,
        admin_id: Uuid,
        request: EventRequest,
    ) -> Result<event::Model, ApiError> {
        let event_date = parse_date(&request)?;

        let created = event::ActiveModel {
            id: Set(Uuid::new_v4()),
            title: Set(request.title.trim().to_string()),
            content: Set(request.content),
            event_date: Set(event_date),
            created_at: Set(chrono::Utc::now()),
        }
        .insert(db)
        .await?;

        ActivityService::log(db, admin_id, "Created an event", Some(&created.title)).await;
        Ok(created)
    }

    /// Par date d'événement croissante
    pub async fn list(db: &DatabaseConnection) -> Result<Vec<event::Model>, DbErr> {
        event::Entity::find()
            .order_by_asc(event::Column::EventDate)
            .all(db)
            .await
    }

    pub async fn find(db: &DatabaseConnection, id: Uuid) -> Result<event::Model, ApiError> {
        event::Entity::find_by_id(id)
            .one(db)
            .await?
            .ok_or_else(|| ApiError::NotFound("Event not found".to_string()))
    }

    pub async fn update(
        db: &DatabaseConnection,
        id: Uuid,
        request: EventRequest,
    ) -> Result<event::Model, ApiError> {
        let event_date = parse_date(&request)?;
        let existing = Self::find(db, id).await?;

        let mut active: event::ActiveModel = existing.into();
        active.title = Set(request.title.trim().to_string());
        active.content = Set(request.content);
        active.event_date = Set(event_date);
        Ok(active.update(db).await?)
    }

    pub async fn delete(db: &DatabaseConnection, id: Uuid) -> Result<(), ApiError> {
        let result = event::Entity::delete_by_id(id).exec(db).await?;
        if result.rows_affected == 0 {
            return Err(ApiError::NotFound("Event not found".to_string()));
        }
        Ok(())
    }

    /// Événements à venir (pour la vue d'ensemble)
    pub async fn count_upcoming(db: &DatabaseConnection) -> Result<u64, DbErr> {
        event::Entity::find()
            .filter(event::Column::EventDate.gte(chrono::Utc::now()))
            .count(db)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::users::Role;
    use crate::test_support::TestContext;

    fn request(title: &str, date: &str) -> EventRequest {
        EventRequest {
            title: title.to_string(),
            content: "Bring your student card.".to_string(),
            event_date: date.to_string(),
        }
    }

    #[actix_web::test]
    async fn test_events_are_ordered_by_date() {
        let ctx = TestContext::new().await;
        let (admin, _) = ctx.create_user("admin@example.com", Role::Admin, 1).await;

        EventService::create(&ctx.db, admin.id, request("Hackathon", "2099-05-01")).await.unwrap();
        EventService::create(&ctx.db, admin.id, request("Orientation", "2000-01-15")).await.unwrap();

        let events = EventService::list(&ctx.db).await.unwrap();
        let titles: Vec<&str> = events.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, vec!["Orientation", "Hackathon"]);

        assert_eq!(EventService::count_upcoming(&ctx.db).await.unwrap(), 1);
    }

    #[actix_web::test]
    async fn test_invalid_date_and_unknown_event() {
        let ctx = TestContext::new().await;
        let (admin, _) = ctx.create_user("admin@example.com", Role::Admin, 1).await;

        let invalid = EventService::create(&ctx.db, admin.id, request("Fest", "someday")).await;
        assert!(matches!(invalid, Err(ApiError::BadRequest(_))));

        let missing = EventService::update(&ctx.db, Uuid::new_v4(), request("Fest", "2099-01-01")).await;
        assert!(matches!(missing, Err(ApiError::NotFound(_))));

        let missing = EventService::delete(&ctx.db, Uuid::new_v4()).await;
        assert!(matches!(missing, Err(ApiError::NotFound(_))));
    }
}
