// ============================================================================
// MODÈLE : ACTIVITIES
// ============================================================================
//
// Description:
//   Journal des actions des utilisateurs ("Uploaded a note", "Created an
//   event", ...), affiché dans le tableau de bord.
//
// Colonnes de la table activities:
//   - id (UUID, PRIMARY KEY)
//   - user_id (UUID, FK vers users, ON DELETE CASCADE)
//   - action (VARCHAR)
//   - details (VARCHAR NULL) - titre de l'élément concerné
//   - created_at (TIMESTAMPTZ)
//
// ============================================================================

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "activities")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,
    pub action: String,
    pub details: Option<String>,
    #[serde(rename = "time")]
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id",
        on_delete = "Cascade"
    )]
    User,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
