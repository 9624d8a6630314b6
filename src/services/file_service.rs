use sea_orm::*;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::models::file;
use crate::services::activity_service::ActivityService;
use crate::services::storage::{FileStorage, object_key};
use crate::utils::multipart::MultipartForm;

pub struct FileService;

impl FileService {
    /// Stocke le part "file" et enregistre ses métadonnées.
    /// Le champ optionnel "name" remplace le nom d'origine.
    pub async fn upload(
        db: &DatabaseConnection,
        storage: &dyn FileStorage,
        auth_user: &AuthUser,
        mut form: MultipartForm,
    ) -> Result<file::Model, ApiError> {
        let upload = form
            .file
            .take()
            .filter(|upload| !upload.bytes.is_empty())
            .ok_or_else(|| ApiError::BadRequest("No file uploaded".to_string()))?;

        let name = form
            .text("name")
            .map(str::to_string)
            .or_else(|| upload.filename.clone())
            .unwrap_or_else(|| "untitled".to_string());

        let key = object_key("files", upload.filename.as_deref());
        let size = upload.bytes.len() as i64;
        let url = storage.put(&key, &upload.content_type, upload.bytes).await?;

        let inserted = file::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name),
            url: Set(url),
            mime_type: Set(upload.content_type),
            size: Set(size),
            storage_key: Set(key.clone()),
            uploaded_by_id: Set(auth_user.user_id),
            created_at: Set(chrono::Utc::now()),
        }
        .insert(db)
        .await;

        let created = match inserted {
            Ok(created) => created,
            Err(e) => {
                if let Err(cleanup) = storage.delete(&key).await {
                    warn!(key = %key, error = %cleanup, "Failed to remove orphan upload");
                }
                return Err(e.into());
            }
        };

        ActivityService::log(db, auth_user.user_id, "Uploaded a file", Some(&created.name)).await;
        info!(file_id = %created.id, size, "File uploaded");
        Ok(created)
    }

    pub async fn list(db: &DatabaseConnection) -> Result<Vec<file::Model>, DbErr> {
        file::Entity::find()
            .order_by_desc(file::Column::CreatedAt)
            .all(db)
            .await
    }

    pub async fn find(db: &DatabaseConnection, id: Uuid) -> Result<file::Model, ApiError> {
        file::Entity::find_by_id(id)
            .one(db)
            .await?
            .ok_or_else(|| ApiError::NotFound("File not found".to_string()))
    }

    /// Supprime la ligne puis l'objet stocké (un échec côté stockage est seulement loggé)
    pub async fn delete(
        db: &DatabaseConnection,
        storage: &dyn FileStorage,
        auth_user: &AuthUser,
        id: Uuid,
    ) -> Result<(), ApiError> {
        let existing = Self::find(db, id).await?;

        if !auth_user.can_manage(existing.uploaded_by_id) {
            return Err(ApiError::Forbidden("Unauthorized".to_string()));
        }

        file::Entity::delete_by_id(id).exec(db).await?;

        if let Err(e) = storage.delete(&existing.storage_key).await {
            warn!(file_id = %id, key = %existing.storage_key, error = %e, "Stored object not removed");
        }

        ActivityService::log(db, auth_user.user_id, "Deleted a file", Some(&existing.name)).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::users::Role;
    use crate::test_support::TestContext;
    use crate::utils::multipart::UploadedFile;

    fn form_with(bytes: &[u8], name: Option<&str>) -> MultipartForm {
        let mut form = MultipartForm::default();
        if let Some(name) = name {
            form.fields.insert("name".to_string(), name.to_string());
        }
        form.file = Some(UploadedFile {
            filename: Some("syllabus.txt".to_string()),
            content_type: "text/plain".to_string(),
            bytes: bytes.to_vec(),
        });
        form
    }

    #[actix_web::test]
    async fn test_upload_and_delete_file() {
        let ctx = TestContext::new().await;
        let (student, _) = ctx.create_user("s@example.com", Role::Student, 3).await;
        let auth = ctx.auth_for(&student);

        let created = FileService::upload(&ctx.db, ctx.storage.as_ref(), &auth, form_with(b"week 1: intro", None))
            .await
            .unwrap();
        assert_eq!(created.name, "syllabus.txt");
        assert_eq!(created.size, 13);
        assert_eq!(created.mime_type, "text/plain");

        let stored = ctx.storage.root().join(&created.storage_key);
        assert!(stored.exists());

        FileService::delete(&ctx.db, ctx.storage.as_ref(), &auth, created.id).await.unwrap();
        assert!(!stored.exists());
        assert!(FileService::list(&ctx.db).await.unwrap().is_empty());
    }

    #[actix_web::test]
    async fn test_upload_requires_file_and_owner_deletes() {
        let ctx = TestContext::new().await;
        let (owner, _) = ctx.create_user("owner@example.com", Role::Student, 3).await;
        let (other, _) = ctx.create_user("other@example.com", Role::Student, 3).await;

        let empty = FileService::upload(
            &ctx.db,
            ctx.storage.as_ref(),
            &ctx.auth_for(&owner),
            MultipartForm::default(),
        )
        .await;
        assert!(matches!(empty, Err(ApiError::BadRequest(_))));

        let created = FileService::upload(
            &ctx.db,
            ctx.storage.as_ref(),
            &ctx.auth_for(&owner),
            form_with(b"data", Some("Timetable")),
        )
        .await
        .unwrap();
        assert_eq!(created.name, "Timetable");

        let denied = FileService::delete(&ctx.db, ctx.storage.as_ref(), &ctx.auth_for(&other), created.id).await;
        assert!(matches!(denied, Err(ApiError::Forbidden(_))));
    }
}
