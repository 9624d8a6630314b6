// ============================================================================
// SERVICE NOTES
// ============================================================================
//
// Description:
//   Upload, modération et consultation des notes de cours.
//
// Règle de visibilité:
//   Une note apparaît dans /note/all, /note/filter et /note/count si et
//   seulement si approved_by_id n'est pas NULL. Toutes les requêtes
//   "publiques" passent par approved_only().
//
// Chargement des relations:
//   subject, branches, uploadedBy, approvedBy (et feedbacks pour le détail)
//   sont chargés par lots (une requête par relation) dans hydrate().
//
// ============================================================================

use std::collections::{HashMap, HashSet};

use sea_orm::sea_query::Expr;
use sea_orm::*;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::models::dto::{NoteFilterQuery, NoteResponse};
use crate::models::{branch, feedback, note, note_branch, subject};
use crate::services::activity_service::ActivityService;
use crate::services::storage::{FileStorage, object_key};
use crate::services::subject_service::resolve_branch_codes;
use crate::services::user_service::UserService;
use crate::utils::multipart::{MultipartForm, UploadedFile};

pub struct NoteService;

/// Note à créer, extraite du formulaire multipart
#[derive(Debug)]
pub struct NewNote {
    pub title: String,
    pub semester: i32,
    pub subject_id: Uuid,
    pub branch_codes: Vec<String>,
    pub file: UploadedFile,
}

impl NewNote {
    pub fn from_form(mut form: MultipartForm) -> Result<Self, ApiError> {
        let missing = || ApiError::BadRequest("Missing required fields".to_string());

        let file = form.file.take().filter(|file| !file.bytes.is_empty()).ok_or_else(missing)?;
        let title = form.text("title").ok_or_else(missing)?.to_string();
        let semester = form.text("semester").ok_or_else(missing)?;
        let subject_id = form.text("subjectId").ok_or_else(missing)?;
        let branch_codes = form.text("branchCodes").ok_or_else(missing)?;

        let semester: i32 = semester
            .parse()
            .ok()
            .filter(|s| (1..=8).contains(s))
            .ok_or_else(|| ApiError::BadRequest("Semester must be between 1 and 8".to_string()))?;

        let subject_id = Uuid::parse_str(subject_id)
            .map_err(|_| ApiError::BadRequest("Invalid subjectId".to_string()))?;

        // branchCodes arrive en JSON: ["CSE","IT"]
        let branch_codes: Vec<String> = serde_json::from_str(branch_codes)
            .ok()
            .filter(|codes: &Vec<String>| !codes.is_empty())
            .ok_or_else(|| ApiError::BadRequest("branchCodes must be array".to_string()))?;

        Ok(Self {
            title,
            semester,
            subject_id,
            branch_codes,
            file,
        })
    }
}

fn approved_only() -> Select<note::Entity> {
    note::Entity::find().filter(note::Column::ApprovedById.is_not_null())
}

impl NoteService {
    pub async fn upload(
        db: &DatabaseConnection,
        storage: &dyn FileStorage,
        auth_user: &AuthUser,
        new_note: NewNote,
    ) -> Result<NoteResponse, ApiError> {
        // 1. Vérifier matière et filières avant d'envoyer le fichier
        subject::Entity::find_by_id(new_note.subject_id)
            .one(db)
            .await?
            .ok_or_else(|| ApiError::BadRequest("Invalid subjectId".to_string()))?;
        let branches = resolve_branch_codes(db, &new_note.branch_codes).await?;

        // 2. Stocker le fichier
        let key = object_key("notes", new_note.file.filename.as_deref());
        let file_url = storage
            .put(&key, &new_note.file.content_type, new_note.file.bytes)
            .await?;

        // 3. Créer la note (en attente) et ses filières
        let created = Self::insert_with_branches(
            db,
            auth_user.user_id,
            &new_note.title,
            new_note.semester,
            new_note.subject_id,
            file_url,
            &branches,
        )
        .await;
        let created = match created {
            Ok(note) => note,
            Err(e) => {
                // Pas de fichier orphelin si l'insertion échoue
                if let Err(cleanup) = storage.delete(&key).await {
                    warn!(key = %key, error = %cleanup, "Failed to remove orphan upload");
                }
                return Err(e.into());
            }
        };

        ActivityService::log(db, auth_user.user_id, "Uploaded a note", Some(&created.title)).await;
        info!(note_id = %created.id, user_id = %auth_user.user_id, "Note uploaded");

        let mut hydrated = Self::hydrate(db, vec![created], false).await?;
        hydrated
            .pop()
            .ok_or_else(|| ApiError::Internal("Uploaded note vanished".to_string()))
    }

    async fn insert_with_branches(
        db: &DatabaseConnection,
        user_id: Uuid,
        title: &str,
        semester: i32,
        subject_id: Uuid,
        file_url: String,
        branches: &[branch::Model],
    ) -> Result<note::Model, DbErr> {
        let txn = db.begin().await?;

        let created = note::ActiveModel {
            id: Set(Uuid::new_v4()),
            title: Set(title.to_string()),
            semester: Set(semester),
            file_url: Set(file_url),
            subject_id: Set(subject_id),
            uploaded_by_id: Set(user_id),
            approved_by_id: Set(None),
            created_at: Set(chrono::Utc::now()),
        }
        .insert(&txn)
        .await?;

        let links = branches.iter().map(|branch| note_branch::ActiveModel {
            note_id: Set(created.id),
            branch_id: Set(branch.id),
        });
        note_branch::Entity::insert_many(links)
            .exec_without_returning(&txn)
            .await?;

        txn.commit().await?;
        Ok(created)
    }

    /// Notes approuvées, les plus récentes d'abord
    pub async fn list_approved(db: &DatabaseConnection) -> Result<Vec<NoteResponse>, DbErr> {
        let notes = approved_only()
            .order_by_desc(note::Column::CreatedAt)
            .all(db)
            .await?;
        Self::hydrate(db, notes, false).await
    }

    /// File de modération: notes en attente, les plus anciennes d'abord
    pub async fn list_pending(db: &DatabaseConnection) -> Result<Vec<NoteResponse>, DbErr> {
        let notes = note::Entity::find()
            .filter(note::Column::ApprovedById.is_null())
            .order_by_asc(note::Column::CreatedAt)
            .all(db)
            .await?;
        Self::hydrate(db, notes, false).await
    }

    pub async fn filter(
        db: &DatabaseConnection,
        query: &NoteFilterQuery,
    ) -> Result<Vec<NoteResponse>, DbErr> {
        let mut select = approved_only();

        if let Some(semester) = query.semester {
            select = select.filter(note::Column::Semester.eq(semester));
        }
        if let Some(subject_id) = query.subject_id {
            select = select.filter(note::Column::SubjectId.eq(subject_id));
        }
        if let Some(code) = query.branch_code.as_deref().filter(|code| !code.is_empty()) {
            select = select
                .inner_join(note_branch::Entity)
                .join(JoinType::InnerJoin, note_branch::Relation::Branch.def())
                .filter(branch::Column::Code.eq(code));
        }

        let notes = select.order_by_desc(note::Column::CreatedAt).all(db).await?;
        Self::hydrate(db, notes, false).await
    }

    pub async fn count_approved(db: &DatabaseConnection) -> Result<u64, DbErr> {
        approved_only().count(db).await
    }

    /// Nombre de notes approuvées rattachées à une filière
    pub async fn count_for_branch(db: &DatabaseConnection, branch_id: Uuid) -> Result<u64, DbErr> {
        approved_only()
            .inner_join(note_branch::Entity)
            .filter(note_branch::Column::BranchId.eq(branch_id))
            .count(db)
            .await
    }

    /// Nombre d'URLs de fichier distinctes parmi les notes approuvées
    pub async fn unique_approved_count(db: &DatabaseConnection) -> Result<u64, DbErr> {
        let urls: Vec<String> = approved_only()
            .select_only()
            .column(note::Column::FileUrl)
            .distinct()
            .into_tuple()
            .all(db)
            .await?;
        Ok(urls.len() as u64)
    }

    /// Détail d'une note, avec ses feedbacks
    pub async fn find(db: &DatabaseConnection, id: Uuid) -> Result<NoteResponse, ApiError> {
        let note = note::Entity::find_by_id(id)
            .one(db)
            .await?
            .ok_or_else(|| ApiError::NotFound("Note not found".to_string()))?;

        let mut hydrated = Self::hydrate(db, vec![note], true).await?;
        hydrated
            .pop()
            .ok_or_else(|| ApiError::NotFound("Note not found".to_string()))
    }

    pub async fn approve(
        db: &DatabaseConnection,
        id: Uuid,
        admin_id: Uuid,
    ) -> Result<note::Model, ApiError> {
        let existing = note::Entity::find_by_id(id)
            .one(db)
            .await?
            .ok_or_else(|| ApiError::NotFound("Note not found".to_string()))?;

        let mut active: note::ActiveModel = existing.into();
        active.approved_by_id = Set(Some(admin_id));
        let approved = active.update(db).await?;

        info!(note_id = %id, admin_id = %admin_id, "Note approved");
        Ok(approved)
    }

    /// Approuve uniquement les notes encore en attente. Retourne le nombre approuvé.
    pub async fn bulk_approve(
        db: &DatabaseConnection,
        ids: &[Uuid],
        admin_id: Uuid,
    ) -> Result<u64, DbErr> {
        let result = note::Entity::update_many()
            .col_expr(note::Column::ApprovedById, Expr::value(Some(admin_id)))
            .filter(note::Column::Id.is_in(ids.iter().copied()))
            .filter(note::Column::ApprovedById.is_null())
            .exec(db)
            .await?;

        info!(count = result.rows_affected, admin_id = %admin_id, "Notes bulk approved");
        Ok(result.rows_affected)
    }

    pub async fn bulk_delete(db: &DatabaseConnection, ids: &[Uuid]) -> Result<u64, DbErr> {
        let result = note::Entity::delete_many()
            .filter(note::Column::Id.is_in(ids.iter().copied()))
            .exec(db)
            .await?;

        info!(count = result.rows_affected, "Notes bulk deleted");
        Ok(result.rows_affected)
    }

    /// Suppression par le propriétaire ou l'admin
    pub async fn delete(db: &DatabaseConnection, auth_user: &AuthUser, id: Uuid) -> Result<(), ApiError> {
        let existing = note::Entity::find_by_id(id)
            .one(db)
            .await?
            .ok_or_else(|| ApiError::NotFound("Note not found".to_string()))?;

        if !auth_user.can_manage(existing.uploaded_by_id) {
            return Err(ApiError::Forbidden("Unauthorized".to_string()));
        }

        note::Entity::delete_by_id(id).exec(db).await?;
        ActivityService::log(db, auth_user.user_id, "Deleted a note", Some(&existing.title)).await;

        Ok(())
    }

    /// Charge subject / branches / utilisateurs (et feedbacks) pour une liste de notes
    pub async fn hydrate(
        db: &DatabaseConnection,
        notes: Vec<note::Model>,
        with_feedbacks: bool,
    ) -> Result<Vec<NoteResponse>, DbErr> {
        if notes.is_empty() {
            return Ok(Vec::new());
        }

        let note_ids: Vec<Uuid> = notes.iter().map(|n| n.id).collect();

        // Matières
        let subject_ids: HashSet<Uuid> = notes.iter().map(|n| n.subject_id).collect();
        let subjects: HashMap<Uuid, subject::Model> = subject::Entity::find()
            .filter(subject::Column::Id.is_in(subject_ids))
            .all(db)
            .await?
            .into_iter()
            .map(|s| (s.id, s))
            .collect();

        // Filières
        let mut branches: HashMap<Uuid, Vec<branch::Model>> = HashMap::new();
        let links = note_branch::Entity::find()
            .filter(note_branch::Column::NoteId.is_in(note_ids.iter().copied()))
            .find_also_related(branch::Entity)
            .all(db)
            .await?;
        for (link, branch) in links {
            if let Some(branch) = branch {
                branches.entry(link.note_id).or_default().push(branch);
            }
        }

        // Auteurs et modérateurs
        let user_ids = notes
            .iter()
            .flat_map(|n| std::iter::once(n.uploaded_by_id).chain(n.approved_by_id));
        let users = UserService::summaries(db, user_ids).await?;

        // Feedbacks (détail uniquement)
        let mut feedbacks: HashMap<Uuid, Vec<feedback::Model>> = HashMap::new();
        if with_feedbacks {
            let rows = feedback::Entity::find()
                .filter(feedback::Column::NoteId.is_in(note_ids.iter().copied()))
                .order_by_desc(feedback::Column::CreatedAt)
                .all(db)
                .await?;
            for row in rows {
                if let Some(note_id) = row.note_id {
                    feedbacks.entry(note_id).or_default().push(row);
                }
            }
        }

        Ok(notes
            .into_iter()
            .map(|note| {
                let mut note_branches = branches.remove(&note.id).unwrap_or_default();
                note_branches.sort_by(|a, b| a.code.cmp(&b.code));

                NoteResponse {
                    subject: subjects.get(&note.subject_id).cloned(),
                    branches: note_branches,
                    uploaded_by: users.get(&note.uploaded_by_id).cloned(),
                    approved_by: note.approved_by_id.and_then(|id| users.get(&id).cloned()),
                    feedbacks: with_feedbacks.then(|| feedbacks.remove(&note.id).unwrap_or_default()),
                    note,
                }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::users::Role;
    use crate::test_support::TestContext;

    fn form(fields: &[(&str, &str)], file: Option<&[u8]>) -> MultipartForm {
        MultipartForm {
            fields: fields
                .iter()
                .map(|(k, v)| (String::from(*k), String::from(*v)))
                .collect(),
            file: file.map(|bytes| UploadedFile {
                filename: Some("unit1.pdf".to_string()),
                content_type: "application/pdf".to_string(),
                bytes: bytes.to_vec(),
            }),
        }
    }

    #[test]
    fn test_new_note_from_form() {
        let subject_id = Uuid::new_v4().to_string();
        let fields = [
            ("title", "Unit 1"),
            ("semester", "3"),
            ("subjectId", subject_id.as_str()),
            ("branchCodes", r#"["CSE","IT"]"#),
        ];

        let note = NewNote::from_form(form(&fields, Some(b"%PDF"))).unwrap();
        assert_eq!(note.semester, 3);
        assert_eq!(note.branch_codes, vec!["CSE", "IT"]);

        let missing_file = NewNote::from_form(form(&fields, None));
        assert!(matches!(missing_file, Err(ApiError::BadRequest(ref m)) if m == "Missing required fields"));

        let not_array = [
            ("title", "Unit 1"),
            ("semester", "3"),
            ("subjectId", subject_id.as_str()),
            ("branchCodes", "CSE"),
        ];
        let result = NewNote::from_form(form(&not_array, Some(b"%PDF")));
        assert!(matches!(result, Err(ApiError::BadRequest(ref m)) if m == "branchCodes must be array"));

        let empty_array = [
            ("title", "Unit 1"),
            ("semester", "3"),
            ("subjectId", subject_id.as_str()),
            ("branchCodes", "[]"),
        ];
        let result = NewNote::from_form(form(&empty_array, Some(b"%PDF")));
        assert!(matches!(result, Err(ApiError::BadRequest(ref m)) if m == "branchCodes must be array"));
    }

    #[actix_web::test]
    async fn test_only_approved_notes_are_visible() {
        let ctx = TestContext::new().await;
        let (student, _) = ctx.create_user("s@example.com", Role::Student, 3).await;
        let (admin, _) = ctx.create_user("admin@example.com", Role::Admin, 1).await;
        let subject = ctx.create_subject("Data Structures", 3, &["CSE"]).await;

        let pending = ctx.create_note(&student, &subject, "Trees", &["CSE"]).await;
        let approved = ctx.create_note(&student, &subject, "Graphs", &["CSE", "IT"]).await;
        NoteService::approve(&ctx.db, approved.id, admin.id).await.unwrap();

        let all = NoteService::list_approved(&ctx.db).await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].note.id, approved.id);
        assert_eq!(all[0].approved_by.as_ref().map(|u| u.id), Some(admin.id));
        assert_eq!(all[0].branches.len(), 2);

        let pending_queue = NoteService::list_pending(&ctx.db).await.unwrap();
        assert_eq!(pending_queue.len(), 1);
        assert_eq!(pending_queue[0].note.id, pending.id);

        let cse = ctx.branch("CSE").await;
        assert_eq!(NoteService::count_for_branch(&ctx.db, cse.id).await.unwrap(), 1);

        let filtered = NoteService::filter(
            &ctx.db,
            &NoteFilterQuery { branch_code: Some("IT".to_string()), semester: Some(3), subject_id: None },
        )
        .await
        .unwrap();
        assert_eq!(filtered.len(), 1);

        let none = NoteService::filter(
            &ctx.db,
            &NoteFilterQuery { branch_code: Some("ECE".to_string()), semester: None, subject_id: None },
        )
        .await
        .unwrap();
        assert!(none.is_empty());
    }

    #[actix_web::test]
    async fn test_bulk_approve_skips_already_approved() {
        let ctx = TestContext::new().await;
        let (student, _) = ctx.create_user("s@example.com", Role::Student, 3).await;
        let (admin, _) = ctx.create_user("admin@example.com", Role::Admin, 1).await;
        let subject = ctx.create_subject("DBMS", 3, &["IT"]).await;

        let a = ctx.create_note(&student, &subject, "Normal forms", &["IT"]).await;
        let b = ctx.create_note(&student, &subject, "Transactions", &["IT"]).await;
        NoteService::approve(&ctx.db, a.id, admin.id).await.unwrap();

        let approved = NoteService::bulk_approve(&ctx.db, &[a.id, b.id], admin.id).await.unwrap();
        assert_eq!(approved, 1);
        assert_eq!(NoteService::list_approved(&ctx.db).await.unwrap().len(), 2);

        let deleted = NoteService::bulk_delete(&ctx.db, &[a.id, b.id, Uuid::new_v4()]).await.unwrap();
        assert_eq!(deleted, 2);
    }

    #[actix_web::test]
    async fn test_delete_requires_owner_or_admin() {
        let ctx = TestContext::new().await;
        let (owner, _) = ctx.create_user("owner@example.com", Role::Student, 3).await;
        let (other, _) = ctx.create_user("other@example.com", Role::Student, 3).await;
        let subject = ctx.create_subject("Maths", 3, &["CSE"]).await;
        let note = ctx.create_note(&owner, &subject, "Integrals", &["CSE"]).await;

        let result = NoteService::delete(&ctx.db, &ctx.auth_for(&other), note.id).await;
        assert!(matches!(result, Err(ApiError::Forbidden(_))));

        NoteService::delete(&ctx.db, &ctx.auth_for(&owner), note.id).await.unwrap();
        let gone = NoteService::find(&ctx.db, note.id).await;
        assert!(matches!(gone, Err(ApiError::NotFound(_))));
    }

    #[actix_web::test]
    async fn test_unique_approved_count_dedupes_urls() {
        let ctx = TestContext::new().await;
        let (student, _) = ctx.create_user("s@example.com", Role::Student, 3).await;
        let (admin, _) = ctx.create_user("admin@example.com", Role::Admin, 1).await;
        let subject = ctx.create_subject("Physics", 1, &["ME"]).await;

        let a = ctx.create_note(&student, &subject, "Optics", &["ME"]).await;
        let b = ctx.create_note(&student, &subject, "Optics (copy)", &["ME"]).await;
        let b_id = b.id;
        let mut active: note::ActiveModel = b.into();
        active.file_url = Set(a.file_url.clone());
        active.update(&ctx.db).await.unwrap();

        NoteService::bulk_approve(&ctx.db, &[a.id], admin.id).await.unwrap();
        assert_eq!(NoteService::unique_approved_count(&ctx.db).await.unwrap(), 1);

        NoteService::bulk_approve(&ctx.db, &[b_id], admin.id).await.unwrap();
        assert_eq!(NoteService::unique_approved_count(&ctx.db).await.unwrap(), 1);
    }
}
