use sea_orm::*;
use tracing::info;
use uuid::Uuid;

use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::models::dto::{PendingTipsResponse, TipRequest, TipResponse};
use crate::models::tip::{self, TipStatus};
use crate::services::activity_service::ActivityService;
use crate::services::user_service::UserService;

pub struct TipService;

pub const DEFAULT_PAGE_SIZE: u64 = 10;
const MAX_PAGE_SIZE: u64 = 100;

impl TipService {
    /// Nouveau tip en attente de modération
    pub async fn create(
        db: &DatabaseConnection,
        auth_user: &AuthUser,
        request: TipRequest,
    ) -> Result<tip::Model, DbErr> {
        let created = tip::ActiveModel {
            id: Set(Uuid::new_v4()),
            title: Set(request.title.trim().to_string()),
            content: Set(request.content),
            status: Set(TipStatus::Pending),
            posted_by_id: Set(auth_user.user_id),
            approved_by_id: Set(None),
            created_at: Set(chrono::Utc::now()),
        }
        .insert(db)
        .await?;

        ActivityService::log(db, auth_user.user_id, "Posted a tip", Some(&created.title)).await;
        Ok(created)
    }

    /// Tips approuvés, les plus récents d'abord
    pub async fn list_approved(db: &DatabaseConnection) -> Result<Vec<TipResponse>, DbErr> {
        let tips = tip::Entity::find()
            .filter(tip::Column::Status.eq(TipStatus::Approved))
            .order_by_desc(tip::Column::CreatedAt)
            .all(db)
            .await?;
        Self::hydrate(db, tips).await
    }

    pub async fn count_approved(db: &DatabaseConnection) -> Result<u64, DbErr> {
        tip::Entity::find()
            .filter(tip::Column::Status.eq(TipStatus::Approved))
            .count(db)
            .await
    }

    /// Tips en attente, paginés (page commence à 1)
    pub async fn list_pending(
        db: &DatabaseConnection,
        page: Option<u64>,
        limit: Option<u64>,
    ) -> Result<PendingTipsResponse, DbErr> {
        let limit = limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
        // L'offset (page - 1) * limit doit tenir dans un BIGINT
        let last_page = i64::MAX as u64 / limit;
        let page = page.unwrap_or(1).clamp(1, last_page);

        let paginator = tip::Entity::find()
            .filter(tip::Column::Status.eq(TipStatus::Pending))
            .order_by_asc(tip::Column::CreatedAt)
            .paginate(db, limit);

        let total = paginator.num_items().await?;
        let tips = paginator.fetch_page(page - 1).await?;

        Ok(PendingTipsResponse {
            tips: Self::hydrate(db, tips).await?,
            total,
            page,
            limit,
        })
    }

    /// APPROVED ou REJECTED, avec l'admin comme modérateur
    pub async fn moderate(
        db: &DatabaseConnection,
        id: Uuid,
        status: TipStatus,
        admin_id: Uuid,
    ) -> Result<tip::Model, ApiError> {
        if status == TipStatus::Pending {
            return Err(ApiError::BadRequest(
                "Status must be APPROVED or REJECTED".to_string(),
            ));
        }

        let existing = tip::Entity::find_by_id(id)
            .one(db)
            .await?
            .ok_or_else(|| ApiError::NotFound("Tip not found".to_string()))?;

        let mut active: tip::ActiveModel = existing.into();
        active.status = Set(status);
        active.approved_by_id = Set(Some(admin_id));
        let updated = active.update(db).await?;

        info!(tip_id = %id, status = ?status, "Tip moderated");
        Ok(updated)
    }

    pub async fn delete(db: &DatabaseConnection, auth_user: &AuthUser, id: Uuid) -> Result<(), ApiError> {
        let existing = tip::Entity::find_by_id(id)
            .one(db)
            .await?
            .ok_or_else(|| ApiError::NotFound("Tip not found".to_string()))?;

        if !auth_user.can_manage(existing.posted_by_id) {
            return Err(ApiError::Forbidden("Unauthorized".to_string()));
        }

        tip::Entity::delete_by_id(id).exec(db).await?;
        ActivityService::log(db, auth_user.user_id, "Deleted a tip", Some(&existing.title)).await;
        Ok(())
    }

    async fn hydrate(db: &DatabaseConnection, tips: Vec<tip::Model>) -> Result<Vec<TipResponse>, DbErr> {
        let user_ids = tips
            .iter()
            .flat_map(|t| std::iter::once(t.posted_by_id).chain(t.approved_by_id));
        let users = UserService::summaries(db, user_ids).await?;

        Ok(tips
            .into_iter()
            .map(|tip| TipResponse {
                posted_by: users.get(&tip.posted_by_id).cloned(),
                approved_by: tip.approved_by_id.and_then(|id| users.get(&id).cloned()),
                tip,
            })
            .collect())
    }
}
