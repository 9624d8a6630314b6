use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "subjects")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    pub semester: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::subject_branch::Entity")]
    SubjectBranch,

    #[sea_orm(has_many = "super::note::Entity")]
    Note,
}

impl Related<super::subject_branch::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SubjectBranch.def()
    }
}

impl Related<super::note::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Note.def()
    }
}

// Many-to-many subjects <-> branches via subject_branches
impl Related<super::branch::Entity> for Entity {
    fn to() -> RelationDef {
        super::subject_branch::Relation::Branch.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::subject_branch::Relation::Subject.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}
