use sea_orm::*;
use uuid::Uuid;

use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::models::dto::FeedbackRequest;
use crate::models::{feedback, note, tip};

pub struct FeedbackService;

impl FeedbackService {
    /// Commentaire sur une note ou un tip existant
    pub async fn create(
        db: &DatabaseConnection,
        auth_user: &AuthUser,
        request: FeedbackRequest,
    ) -> Result<feedback::Model, ApiError> {
        if request.note_id.is_none() && request.tip_id.is_none() {
            return Err(ApiError::BadRequest(
                "Either noteId or tipId must be provided".to_string(),
            ));
        }

        if let Some(note_id) = request.note_id {
            if note::Entity::find_by_id(note_id).one(db).await?.is_none() {
                return Err(ApiError::NotFound("Note not found".to_string()));
            }
        }
        if let Some(tip_id) = request.tip_id {
            if tip::Entity::find_by_id(tip_id).one(db).await?.is_none() {
                return Err(ApiError::NotFound("Tip not found".to_string()));
            }
        }

        let created = feedback::ActiveModel {
            id: Set(Uuid::new_v4()),
            content: Set(request.content.trim().to_string()),
            user_id: Set(auth_user.user_id),
            note_id: Set(request.note_id),
            tip_id: Set(request.tip_id),
            created_at: Set(chrono::Utc::now()),
        }
        .insert(db)
        .await?;

        Ok(created)
    }

    /// Feedbacks d'une note ou d'un tip (même id accepté pour les deux)
    pub async fn list_for_target(
        db: &DatabaseConnection,
        target_id: Uuid,
    ) -> Result<Vec<feedback::Model>, DbErr> {
        feedback::Entity::find()
            .filter(
                Condition::any()
                    .add(feedback::Column::NoteId.eq(target_id))
                    .add(feedback::Column::TipId.eq(target_id)),
            )
            .order_by_desc(feedback::Column::CreatedAt)
            .all(db)
            .await
    }

    pub async fn delete(db: &DatabaseConnection, auth_user: &AuthUser, id: Uuid) -> Result<(), ApiError> {
        let existing = feedback::Entity::find_by_id(id)
            .one(db)
            .await?
            .ok_or_else(|| ApiError::NotFound("Feedback not found".to_string()))?;

        if !auth_user.can_manage(existing.user_id) {
            return Err(ApiError::Forbidden("Unauthorized".to_string()));
        }

        feedback::Entity::delete_by_id(id).exec(db).await?;
        Ok(())
    }
}
