// ============================================================================
// MODÈLE : NOTES
// ============================================================================
//
// Colonnes de la table notes:
//   - id (UUID, PRIMARY KEY)
//   - title (VARCHAR)
//   - semester (INTEGER)
//   - file_url (VARCHAR) - URL publique dans le stockage objet
//   - subject_id (UUID, FK vers subjects)
//   - uploaded_by_id (UUID, FK vers users, ON DELETE CASCADE)
//   - approved_by_id (UUID NULL, FK vers users, ON DELETE SET NULL)
//   - created_at (TIMESTAMPTZ)
//
// Workflow:
//   1. Un étudiant upload une note → approved_by_id = NULL (en attente)
//   2. Un admin approuve → approved_by_id = id de l'admin
//   3. La note apparaît dans /note/all, /note/filter, /note/count
//
// Points d'attention:
//   - Visible publiquement SI ET SEULEMENT SI approved_by_id n'est pas NULL
//   - Les filières sont dans la table de jointure note_branches
//
// ============================================================================

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "notes")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub title: String,
    pub semester: i32,
    pub file_url: String,
    pub subject_id: Uuid,
    pub uploaded_by_id: Uuid,
    pub approved_by_id: Option<Uuid>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::subject::Entity",
        from = "Column::SubjectId",
        to = "super::subject::Column::Id"
    )]
    Subject,

    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UploadedById",
        to = "super::users::Column::Id",
        on_delete = "Cascade"
    )]
    UploadedBy,

    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::ApprovedById",
        to = "super::users::Column::Id",
        on_delete = "SetNull"
    )]
    ApprovedBy,

    #[sea_orm(has_many = "super::note_branch::Entity")]
    NoteBranch,

    #[sea_orm(has_many = "super::feedback::Entity")]
    Feedback,
}

impl Related<super::subject::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Subject.def()
    }
}

impl Related<super::note_branch::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::NoteBranch.def()
    }
}

impl Related<super::feedback::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Feedback.def()
    }
}

// Many-to-many notes <-> branches via note_branches
impl Related<super::branch::Entity> for Entity {
    fn to() -> RelationDef {
        super::note_branch::Relation::Branch.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::note_branch::Relation::Note.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}
