use std::collections::HashSet;

use sea_orm::*;
use uuid::Uuid;

use crate::error::ApiError;
use crate::models::dto::{SubjectQuery, SubjectRequest, SubjectWithBranches};
use crate::models::{branch, note, subject, subject_branch};

pub struct SubjectService;

/// Résout une liste de codes de filière. Tous les codes doivent exister.
pub async fn resolve_branch_codes<C: ConnectionTrait>(
    db: &C,
    codes: &[String],
) -> Result<Vec<branch::Model>, ApiError> {
    let wanted: HashSet<String> = codes.iter().map(|code| code.trim().to_string()).collect();

    let branches = branch::Entity::find()
        .filter(branch::Column::Code.is_in(wanted.iter().cloned()))
        .all(db)
        .await?;

    if branches.len() != wanted.len() {
        let known: HashSet<&str> = branches.iter().map(|b| b.code.as_str()).collect();
        let mut unknown: Vec<&str> = wanted
            .iter()
            .map(String::as_str)
            .filter(|code| !known.contains(code))
            .collect();
        unknown.sort_unstable();
        return Err(ApiError::BadRequest(format!(
            "Invalid branch code(s): {}",
            unknown.join(", ")
        )));
    }

    Ok(branches)
}

impl SubjectService {
    pub async fn create(
        db: &DatabaseConnection,
        request: SubjectRequest,
    ) -> Result<SubjectWithBranches, ApiError> {
        let branches = resolve_branch_codes(db, &request.branch_codes).await?;

        let txn = db.begin().await?;

        let subject = subject::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(request.name.trim().to_string()),
            semester: Set(request.semester),
        }
        .insert(&txn)
        .await?;

        Self::link_branches(&txn, subject.id, &branches).await?;
        txn.commit().await?;

        Ok(SubjectWithBranches { subject, branches })
    }

    /// Matières triées par semestre, filtrables par semestre et code de filière
    pub async fn list(
        db: &DatabaseConnection,
        query: &SubjectQuery,
    ) -> Result<Vec<subject::Model>, DbErr> {
        let mut select = subject::Entity::find();

        if let Some(semester) = query.semester {
            select = select.filter(subject::Column::Semester.eq(semester));
        }

        if let Some(code) = query.branch.as_deref().filter(|code| !code.is_empty()) {
            select = select
                .inner_join(subject_branch::Entity)
                .join(JoinType::InnerJoin, subject_branch::Relation::Branch.def())
                .filter(branch::Column::Code.eq(code));
        }

        select
            .order_by_asc(subject::Column::Semester)
            .order_by_asc(subject::Column::Name)
            .all(db)
            .await
    }

    pub async fn find(db: &DatabaseConnection, id: Uuid) -> Result<SubjectWithBranches, ApiError> {
        let subject = subject::Entity::find_by_id(id)
            .one(db)
            .await?
            .ok_or_else(|| ApiError::NotFound("Subject not found".to_string()))?;

        let branches = subject.find_related(branch::Entity).all(db).await?;
        Ok(SubjectWithBranches { subject, branches })
    }

    /// Remplace nom, semestre et ensemble de filières
    pub async fn update(
        db: &DatabaseConnection,
        id: Uuid,
        request: SubjectRequest,
    ) -> Result<SubjectWithBranches, ApiError> {
        let existing = subject::Entity::find_by_id(id)
            .one(db)
            .await?
            .ok_or_else(|| ApiError::NotFound("Subject not found".to_string()))?;

        let branches = resolve_branch_codes(db, &request.branch_codes).await?;

        let txn = db.begin().await?;

        let mut active: subject::ActiveModel = existing.into();
        active.name = Set(request.name.trim().to_string());
        active.semester = Set(request.semester);
        let subject = active.update(&txn).await?;

        subject_branch::Entity::delete_many()
            .filter(subject_branch::Column::SubjectId.eq(id))
            .exec(&txn)
            .await?;
        Self::link_branches(&txn, id, &branches).await?;

        txn.commit().await?;

        Ok(SubjectWithBranches { subject, branches })
    }

    pub async fn delete(db: &DatabaseConnection, id: Uuid) -> Result<(), ApiError> {
        if subject::Entity::find_by_id(id).one(db).await?.is_none() {
            return Err(ApiError::NotFound("Subject not found".to_string()));
        }

        // Les notes référencent la matière sans cascade
        let notes = note::Entity::find()
            .filter(note::Column::SubjectId.eq(id))
            .count(db)
            .await?;
        if notes > 0 {
            return Err(ApiError::Conflict(format!(
                "Subject still has {} note(s)",
                notes
            )));
        }

        subject::Entity::delete_by_id(id).exec(db).await?;
        Ok(())
    }

    async fn link_branches<C: ConnectionTrait>(
        db: &C,
        subject_id: Uuid,
        branches: &[branch::Model],
    ) -> Result<(), DbErr> {
        if branches.is_empty() {
            return Ok(());
        }

        let links = branches.iter().map(|branch| subject_branch::ActiveModel {
            subject_id: Set(subject_id),
            branch_id: Set(branch.id),
        });
        subject_branch::Entity::insert_many(links)
            .exec_without_returning(db)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::TestContext;

    fn request(name: &str, semester: i32, codes: &[&str]) -> SubjectRequest {
        SubjectRequest {
            name: name.to_string(),
            semester,
            branch_codes: codes.iter().map(|c| String::from(*c)).collect(),
        }
    }

    #[actix_web::test]
    async fn test_create_and_filter_subjects() {
        let ctx = TestContext::new().await;

        SubjectService::create(&ctx.db, request("Operating Systems", 4, &["CSE", "IT"]))
            .await
            .unwrap();
        SubjectService::create(&ctx.db, request("Thermodynamics", 3, &["ME"]))
            .await
            .unwrap();

        let all = SubjectService::list(&ctx.db, &SubjectQuery { semester: None, branch: None })
            .await
            .unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].name, "Thermodynamics");

        let it = SubjectService::list(
            &ctx.db,
            &SubjectQuery { semester: Some(4), branch: Some("IT".to_string()) },
        )
        .await
        .unwrap();
        assert_eq!(it.len(), 1);
        assert_eq!(it[0].name, "Operating Systems");

        let ece = SubjectService::list(
            &ctx.db,
            &SubjectQuery { semester: None, branch: Some("ECE".to_string()) },
        )
        .await
        .unwrap();
        assert!(ece.is_empty());
    }

    #[actix_web::test]
    async fn test_unknown_branch_code_is_rejected() {
        let ctx = TestContext::new().await;
        let result = SubjectService::create(&ctx.db, request("Algorithms", 3, &["CSE", "NOPE"])).await;
        assert!(matches!(result, Err(ApiError::BadRequest(ref m)) if m.contains("NOPE")));
    }

    #[actix_web::test]
    async fn test_update_replaces_branch_set() {
        let ctx = TestContext::new().await;
        let created = SubjectService::create(&ctx.db, request("Networks", 5, &["CSE", "IT"]))
            .await
            .unwrap();

        let updated = SubjectService::update(
            &ctx.db,
            created.subject.id,
            request("Computer Networks", 6, &["ECE"]),
        )
        .await
        .unwrap();
        assert_eq!(updated.subject.semester, 6);

        let reloaded = SubjectService::find(&ctx.db, created.subject.id).await.unwrap();
        let codes: Vec<&str> = reloaded.branches.iter().map(|b| b.code.as_str()).collect();
        assert_eq!(codes, vec!["ECE"]);
        assert_eq!(reloaded.subject.name, "Computer Networks");
    }

    #[actix_web::test]
    async fn test_delete_subject() {
        let ctx = TestContext::new().await;
        let created = SubjectService::create(&ctx.db, request("Compilers", 6, &["CSE"]))
            .await
            .unwrap();

        SubjectService::delete(&ctx.db, created.subject.id).await.unwrap();
        let again = SubjectService::delete(&ctx.db, created.subject.id).await;
        assert!(matches!(again, Err(ApiError::NotFound(_))));
    }
}
