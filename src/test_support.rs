// Outils partagés par les tests: BD SQLite en mémoire, OTP en mémoire,
// mailer qui enregistre les messages, stockage dans un répertoire temporaire.

use std::sync::{Arc, Mutex};

use actix_web::{
    App, Error,
    dev::{ServiceFactory, ServiceRequest, ServiceResponse},
    web,
};
use async_trait::async_trait;
use sea_orm::*;
use tempfile::TempDir;
use uuid::Uuid;

use crate::db;
use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::models::users::{self, Role};
use crate::models::{branch, note, note_branch, subject, subject_branch};
use crate::routes;
use crate::services::mailer::Mailer;
use crate::services::otp_store::{MemoryOtpStore, OtpStore};
use crate::services::storage::{FileStorage, LocalStorage};
use crate::utils::{jwt, password};

#[derive(Debug, Clone)]
pub struct SentMail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Mailer de test: garde les messages pour lire les codes OTP
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<SentMail>>,
    fail: bool,
}

impl RecordingMailer {
    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn sent(&self) -> Vec<SentMail> {
        self.sent.lock().unwrap().clone()
    }

    /// Dernier code envoyé à cette adresse
    pub fn last_code_for(&self, email: &str) -> Option<String> {
        self.sent()
            .iter()
            .rev()
            .find(|mail| mail.to == email)
            .and_then(|mail| mail.body.split_whitespace().last().map(str::to_string))
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), ApiError> {
        if self.fail {
            return Err(ApiError::Mail("smtp relay unavailable".to_string()));
        }
        self.sent.lock().unwrap().push(SentMail {
            to: to.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
        });
        Ok(())
    }
}

pub struct TestContext {
    pub db: DatabaseConnection,
    pub otp_store: Arc<MemoryOtpStore>,
    pub mailer: Arc<RecordingMailer>,
    pub storage: Arc<LocalStorage>,
    _upload_dir: TempDir,
}

impl TestContext {
    pub const PASSWORD: &'static str = "secret123";

    pub async fn new() -> Self {
        // Une seule connexion: chaque connexion SQLite ":memory:" a sa propre base
        let mut options = ConnectOptions::new("sqlite::memory:");
        options
            .max_connections(1)
            .min_connections(1)
            .sqlx_logging(false);
        let db = Database::connect(options).await.unwrap();

        db::create_schema(&db).await.unwrap();
        db::seed_branches(&db).await.unwrap();

        let upload_dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(upload_dir.path(), "http://localhost:3000/uploads");

        Self {
            db,
            otp_store: Arc::new(MemoryOtpStore::new()),
            mailer: Arc::new(RecordingMailer::default()),
            storage: Arc::new(storage),
            _upload_dir: upload_dir,
        }
    }

    /// Application complète (mêmes routes que le serveur)
    pub fn app(
        &self,
    ) -> App<
        impl ServiceFactory<
            ServiceRequest,
            Config = (),
            Response = ServiceResponse,
            Error = Error,
            InitError = (),
        > + use<>,
    > {
        let otp_store: Arc<dyn OtpStore> = self.otp_store.clone();
        let mailer: Arc<dyn Mailer> = self.mailer.clone();
        let storage: Arc<dyn FileStorage> = self.storage.clone();

        App::new()
            .app_data(web::Data::new(self.db.clone()))
            .app_data(web::Data::from(otp_store))
            .app_data(web::Data::from(mailer))
            .app_data(web::Data::from(storage))
            .configure(routes::configure_routes)
    }

    /// Simule une vérification OTP réussie
    pub async fn mark_verified(&self, email: &str) {
        self.otp_store
            .set_ex(
                &format!("verified:{}", email.to_lowercase()),
                "true",
                std::time::Duration::from_secs(600),
            )
            .await
            .unwrap();
    }

    pub async fn branch(&self, code: &str) -> branch::Model {
        branch::Entity::find()
            .filter(branch::Column::Code.eq(code))
            .one(&self.db)
            .await
            .unwrap()
            .unwrap()
    }

    /// Utilisateur inséré directement (filière CSE, mot de passe PASSWORD) + son JWT
    pub async fn create_user(&self, email: &str, role: Role, semester: i32) -> (users::Model, String) {
        let branch = self.branch("CSE").await;
        let user = users::ActiveModel {
            id: Set(Uuid::new_v4()),
            email: Set(email.to_lowercase()),
            name: Set(format!("User {}", email)),
            password: Set(password::hash_password(Self::PASSWORD).unwrap()),
            role: Set(role),
            semester: Set(semester),
            branch_id: Set(branch.id),
            created_at: Set(chrono::Utc::now()),
        }
        .insert(&self.db)
        .await
        .unwrap();

        let token = jwt::generate_token(&user).unwrap();
        (user, token)
    }

    pub fn auth_for(&self, user: &users::Model) -> AuthUser {
        AuthUser {
            user_id: user.id,
            role: user.role,
            branch_id: user.branch_id,
            semester: user.semester,
        }
    }

    pub async fn create_subject(&self, name: &str, semester: i32, codes: &[&str]) -> subject::Model {
        let created = subject::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name.to_string()),
            semester: Set(semester),
        }
        .insert(&self.db)
        .await
        .unwrap();

        for code in codes {
            let branch = self.branch(code).await;
            subject_branch::ActiveModel {
                subject_id: Set(created.id),
                branch_id: Set(branch.id),
            }
            .insert(&self.db)
            .await
            .unwrap();
        }
        created
    }

    /// Note en attente d'approbation
    pub async fn create_note(
        &self,
        uploader: &users::Model,
        subject: &subject::Model,
        title: &str,
        codes: &[&str],
    ) -> note::Model {
        let id = Uuid::new_v4();
        let created = note::ActiveModel {
            id: Set(id),
            title: Set(title.to_string()),
            semester: Set(subject.semester),
            file_url: Set(format!("http://localhost:3000/uploads/notes/{}.pdf", id)),
            subject_id: Set(subject.id),
            uploaded_by_id: Set(uploader.id),
            approved_by_id: Set(None),
            created_at: Set(chrono::Utc::now()),
        }
        .insert(&self.db)
        .await
        .unwrap();

        for code in codes {
            let branch = self.branch(code).await;
            note_branch::ActiveModel {
                note_id: Set(created.id),
                branch_id: Set(branch.id),
            }
            .insert(&self.db)
            .await
            .unwrap();
        }
        created
    }
}

pub const MULTIPART_BOUNDARY: &str = "notenexus-test-boundary";

/// Corps multipart/form-data: champs texte + un fichier optionnel (nom, type, contenu)
pub fn multipart_body(fields: &[(&str, &str)], file: Option<(&str, &str, &[u8])>) -> (String, Vec<u8>) {
    let mut body = Vec::new();

    for (name, value) in fields {
        body.extend_from_slice(format!("--{}\r\n", MULTIPART_BOUNDARY).as_bytes());
        body.extend_from_slice(
            format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name).as_bytes(),
        );
        body.extend_from_slice(value.as_bytes());
        body.extend_from_slice(b"\r\n");
    }

    if let Some((filename, content_type, bytes)) = file {
        body.extend_from_slice(format!("--{}\r\n", MULTIPART_BOUNDARY).as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                filename, content_type
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }

    body.extend_from_slice(format!("--{}--\r\n", MULTIPART_BOUNDARY).as_bytes());

    (
        format!("multipart/form-data; boundary={}", MULTIPART_BOUNDARY),
        body,
    )
}
