// ============================================================================
// MODÈLE : USERS
// ============================================================================
//
// Colonnes de la table users:
//   - id (UUID, PRIMARY KEY)
//   - email (VARCHAR, UNIQUE) - toujours en minuscules
//   - name (VARCHAR)
//   - password (VARCHAR) - Format: pbkdf2:sha256:iterations$salt$hash
//   - role (VARCHAR(16)) - STUDENT | ADMIN
//   - semester (INTEGER) - 1 à 8
//   - branch_id (UUID, FK vers branches)
//   - created_at (TIMESTAMPTZ)
//
// Points d'attention:
//   - Un seul ADMIN: index unique partiel users_single_admin (voir db.rs)
//   - Le mot de passe n'est jamais sérialisé en JSON
//
// ============================================================================

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    #[default]
    #[sea_orm(string_value = "STUDENT")]
    Student,
    #[sea_orm(string_value = "ADMIN")]
    Admin,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub email: String,
    pub name: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub role: Role,
    pub semester: i32,
    pub branch_id: Uuid,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::branch::Entity",
        from = "Column::BranchId",
        to = "super::branch::Column::Id"
    )]
    Branch,

    #[sea_orm(has_many = "super::activity::Entity")]
    Activity,
}

impl Related<super::branch::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Branch.def()
    }
}

impl Related<super::activity::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Activity.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
