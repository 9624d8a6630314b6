use sea_orm::*;
use uuid::Uuid;

use crate::error::ApiError;
use crate::models::announcement;
use crate::models::dto::{AnnouncementRequest, AnnouncementResponse};
use crate::services::activity_service::ActivityService;
use crate::services::user_service::UserService;

pub struct AnnouncementService;

impl AnnouncementService {
    pub async fn create(
        db: &DatabaseConnection,
        admin_id: Uuid,
        request: AnnouncementRequest,
    ) -> Result<announcement::Model, DbErr> {
        let created = announcement::ActiveModel {
            id: Set(Uuid::new_v4()),
            title: Set(request.title.trim().to_string()),
            message: Set(request.message),
            posted_by_id: Set(admin_id),
            created_at: Set(chrono::Utc::now()),
        }
        .insert(db)
        .await?;

        ActivityService::log(db, admin_id, "Posted an announcement", Some(&created.title)).await;
        Ok(created)
    }

    /// Les plus récentes d'abord, avec l'auteur
    pub async fn list(db: &DatabaseConnection) -> Result<Vec<AnnouncementResponse>, DbErr> {
        let announcements = announcement::Entity::find()
            .order_by_desc(announcement::Column::CreatedAt)
            .all(db)
            .await?;

        let users = UserService::summaries(db, announcements.iter().map(|a| a.posted_by_id)).await?;

        Ok(announcements
            .into_iter()
            .map(|announcement| AnnouncementResponse {
                posted_by: users.get(&announcement.posted_by_id).cloned(),
                announcement,
            })
            .collect())
    }

    pub async fn find(db: &DatabaseConnection, id: Uuid) -> Result<AnnouncementResponse, ApiError> {
        let (announcement, author) = announcement::Entity::find_by_id(id)
            .find_also_related(crate::models::users::Entity)
            .one(db)
            .await?
            .ok_or_else(|| ApiError::NotFound("Announcement not found".to_string()))?;

        Ok(AnnouncementResponse {
            announcement,
            posted_by: author.map(Into::into),
        })
    }

    pub async fn update(
        db: &DatabaseConnection,
        id: Uuid,
        request: AnnouncementRequest,
    ) -> Result<announcement::Model, ApiError> {
        let existing = announcement::Entity::find_by_id(id)
            .one(db)
            .await?
            .ok_or_else(|| ApiError::NotFound("Announcement not found".to_string()))?;

        let mut active: announcement::ActiveModel = existing.into();
        active.title = Set(request.title.trim().to_string());
        active.message = Set(request.message);
        Ok(active.update(db).await?)
    }

    pub async fn delete(db: &DatabaseConnection, id: Uuid) -> Result<(), ApiError> {
        let result = announcement::Entity::delete_by_id(id).exec(db).await?;
        if result.rows_affected == 0 {
            return Err(ApiError::NotFound("Announcement not found".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::users::Role;
    use crate::test_support::TestContext;

    #[actix_web::test]
    async fn test_announcement_crud() {
        let ctx = TestContext::new().await;
        let (admin, _) = ctx.create_user("admin@example.com", Role::Admin, 1).await;

        let created = AnnouncementService::create(
            &ctx.db,
            admin.id,
            AnnouncementRequest {
                title: "Holiday".to_string(),
                message: "Campus closed on Friday.".to_string(),
            },
        )
        .await
        .unwrap();

        let found = AnnouncementService::find(&ctx.db, created.id).await.unwrap();
        assert_eq!(found.posted_by.map(|u| u.id), Some(admin.id));

        let updated = AnnouncementService::update(
            &ctx.db,
            created.id,
            AnnouncementRequest {
                title: "Holiday moved".to_string(),
                message: "Campus closed on Monday instead.".to_string(),
            },
        )
        .await
        .unwrap();
        assert_eq!(updated.title, "Holiday moved");

        assert_eq!(AnnouncementService::list(&ctx.db).await.unwrap().len(), 1);

        AnnouncementService::delete(&ctx.db, created.id).await.unwrap();
        let missing = AnnouncementService::find(&ctx.db, created.id).await;
        assert!(matches!(missing, Err(ApiError::NotFound(_))));
    }
}
