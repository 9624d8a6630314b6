use sea_orm::*;
use tracing::warn;
use uuid::Uuid;

use crate::models::activity;

pub struct ActivityService;

pub const RECENT_LIMIT: u64 = 10;

impl ActivityService {
    /// Ajoute une ligne au journal d'activité.
    /// Un échec est loggé mais ne fait pas échouer l'action principale.
    pub async fn log<C: ConnectionTrait>(db: &C, user_id: Uuid, action: &str, details: Option<&str>) {
        let entry = activity::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            action: Set(action.to_string()),
            details: Set(details.map(str::to_string)),
            created_at: Set(chrono::Utc::now()),
        };

        if let Err(e) = entry.insert(db).await {
            warn!(user_id = %user_id, action, error = %e, "Failed to log activity");
        }
    }

    /// Dernières actions d'un utilisateur
    pub async fn recent_for_user(
        db: &DatabaseConnection,
        user_id: Uuid,
    ) -> Result<Vec<activity::Model>, DbErr> {
        activity::Entity::find()
            .filter(activity::Column::UserId.eq(user_id))
            .order_by_desc(activity::Column::CreatedAt)
            .limit(RECENT_LIMIT)
            .all(db)
            .await
    }

    /// Dernières actions, tous utilisateurs confondus
    pub async fn recent(db: &DatabaseConnection) -> Result<Vec<activity::Model>, DbErr> {
        activity::Entity::find()
            .order_by_desc(activity::Column::CreatedAt)
            .limit(RECENT_LIMIT)
            .all(db)
            .await
    }
}
