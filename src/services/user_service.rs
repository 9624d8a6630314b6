// ============================================================================
// SERVICE UTILISATEURS
// ============================================================================
//
// Description:
//   Inscription (après OTP), connexion, profil et administration des comptes.
//
// Règles métier:
//   - Inscription seulement si verified:<email> est posé (voir OtpService)
//   - Un seul ADMIN: vérifié ici pour le message, garanti par l'index unique
//     partiel users_single_admin
//   - Un STUDENT ne peut passer qu'au semestre suivant (UPDATE conditionnel)
//
// ============================================================================

use std::collections::{HashMap, HashSet};

use sea_orm::sea_query::Expr;
use sea_orm::*;
use tracing::info;
use uuid::Uuid;

use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::models::dto::{MeResponse, SignupRequest, UpdateProfileRequest, UserListItem, UserSummary};
use crate::models::users::{self, Role};
use crate::models::branch;
use crate::services::otp_service::{OtpService, normalize_email};
use crate::services::otp_store::OtpStore;
use crate::utils::{jwt, password};

pub const ADMIN_EXISTS: &str = "Admin already exists. Only one admin is allowed per system.";

pub struct UserService;

impl UserService {
    /// Crée le compte et retourne (utilisateur, JWT)
    pub async fn signup(
        db: &DatabaseConnection,
        store: &dyn OtpStore,
        request: SignupRequest,
    ) -> Result<(users::Model, String), ApiError> {
        let email = normalize_email(&request.email);

        // 1. Filière
        let branch = branch::Entity::find()
            .filter(branch::Column::Code.eq(request.branch_code.trim()))
            .one(db)
            .await?
            .ok_or_else(|| ApiError::BadRequest("Invalid branch selected".to_string()))?;

        // 2. Email vérifié par OTP
        if !OtpService::is_verified(store, &email).await? {
            return Err(ApiError::Forbidden(
                "Please verify your email via OTP before signing up.".to_string(),
            ));
        }

        // 3. Un seul admin
        if request.role == Role::Admin && Self::admin_count(db).await? > 0 {
            return Err(ApiError::Forbidden(ADMIN_EXISTS.to_string()));
        }

        // 4. Email déjà utilisé
        if Self::find_by_email(db, &email).await?.is_some() {
            return Err(ApiError::Conflict("User already exists".to_string()));
        }

        // 5. Créer l'utilisateur
        let password_hash = hash_blocking(request.password).await?;
        let new_user = users::ActiveModel {
            id: Set(Uuid::new_v4()),
            email: Set(email.clone()),
            name: Set(request.name.trim().to_string()),
            password: Set(password_hash),
            role: Set(request.role),
            semester: Set(request.semester),
            branch_id: Set(branch.id),
            created_at: Set(chrono::Utc::now()),
        };

        let user = match new_user.insert(db).await {
            Ok(user) => user,
            // Deux inscriptions concurrentes: la contrainte unique a tranché
            Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                return Err(Self::signup_conflict(db, request.role).await?);
            }
            Err(e) => return Err(e.into()),
        };

        // 6. Consommer le flag de vérification
        OtpService::consume(store, &email).await?;

        let token = jwt::generate_token(&user).map_err(ApiError::Internal)?;

        info!(user_id = %user.id, role = ?user.role, "User signed up");
        Ok((user, token))
    }

    /// Retourne (JWT, utilisateur)
    pub async fn signin(
        db: &DatabaseConnection,
        email: &str,
        plain_password: &str,
    ) -> Result<(String, users::Model), ApiError> {
        let user = Self::find_by_email(db, &normalize_email(email))
            .await?
            .ok_or_else(|| ApiError::Forbidden("User not found".to_string()))?;

        let stored_hash = user.password.clone();
        let candidate = plain_password.to_string();
        let is_valid = tokio::task::spawn_blocking(move || {
            password::verify_password(&candidate, &stored_hash)
        })
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?
        .map_err(ApiError::Internal)?;

        if !is_valid {
            return Err(ApiError::Unauthorized("Incorrect password".to_string()));
        }

        let token = jwt::generate_token(&user).map_err(ApiError::Internal)?;
        Ok((token, user))
    }

    pub async fn find_by_email(
        db: &DatabaseConnection,
        email: &str,
    ) -> Result<Option<users::Model>, DbErr> {
        users::Entity::find()
            .filter(users::Column::Email.eq(normalize_email(email)))
            .one(db)
            .await
    }

    /// Violation d'unicité à l'insertion: 403 si un admin existe déjà, 409 sinon (email pris)
    async fn signup_conflict(db: &DatabaseConnection, role: Role) -> Result<ApiError, DbErr> {
        if role == Role::Admin && Self::admin_count(db).await? > 0 {
            return Ok(ApiError::Forbidden(ADMIN_EXISTS.to_string()));
        }
        Ok(ApiError::Conflict("User already exists".to_string()))
    }

    pub async fn admin_count(db: &DatabaseConnection) -> Result<u64, DbErr> {
        users::Entity::find()
            .filter(users::Column::Role.eq(Role::Admin))
            .count(db)
            .await
    }

    /// {id, name, email} de plusieurs utilisateurs en une requête
    pub async fn summaries(
        db: &DatabaseConnection,
        ids: impl IntoIterator<Item = Uuid>,
    ) -> Result<HashMap<Uuid, UserSummary>, DbErr> {
        let ids: HashSet<Uuid> = ids.into_iter().collect();
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let users = users::Entity::find()
            .filter(users::Column::Id.is_in(ids))
            .all(db)
            .await?;

        Ok(users
            .into_iter()
            .map(|user| (user.id, UserSummary::from(user)))
            .collect())
    }

    pub async fn me(db: &DatabaseConnection, user_id: Uuid) -> Result<MeResponse, ApiError> {
        let (user, branch) = users::Entity::find_by_id(user_id)
            .find_also_related(branch::Entity)
            .one(db)
            .await?
            .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

        Ok(MeResponse {
            id: user.id,
            name: user.name,
            email: user.email,
            role: user.role,
            semester: user.semester,
            branch,
            created_at: user.created_at,
        })
    }

    /// Tous les utilisateurs, les plus récents d'abord
    pub async fn list(db: &DatabaseConnection) -> Result<Vec<UserListItem>, DbErr> {
        let users = users::Entity::find()
            .order_by_desc(users::Column::CreatedAt)
            .all(db)
            .await?;

        Ok(users.into_iter().map(UserListItem::from).collect())
    }

    pub async fn delete(db: &DatabaseConnection, user_id: Uuid) -> Result<(), ApiError> {
        let result = users::Entity::delete_by_id(user_id).exec(db).await?;
        if result.rows_affected == 0 {
            return Err(ApiError::NotFound("User not found".to_string()));
        }

        info!(user_id = %user_id, "User deleted");
        Ok(())
    }

    /// Met à jour nom / mot de passe / semestre en un seul UPDATE.
    /// Pour un STUDENT, le semestre n'est écrit que si la valeur en base vaut
    /// semestre - 1 (sinon 403), ce qui empêche de sauter un semestre même
    /// avec des requêtes concurrentes.
    pub async fn update_profile(
        db: &DatabaseConnection,
        auth_user: &AuthUser,
        request: UpdateProfileRequest,
    ) -> Result<users::Model, ApiError> {
        let mut update = users::Entity::update_many().filter(users::Column::Id.eq(auth_user.user_id));
        let mut has_changes = false;

        if let Some(name) = request.name {
            update = update.col_expr(users::Column::Name, Expr::value(name.trim().to_string()));
            has_changes = true;
        }

        if let Some(new_password) = request.password {
            let password_hash = hash_blocking(new_password).await?;
            update = update.col_expr(users::Column::Password, Expr::value(password_hash));
            has_changes = true;
        }

        let semester_guarded = match request.semester {
            Some(semester) => {
                update = update.col_expr(users::Column::Semester, Expr::value(semester));
                has_changes = true;
                if auth_user.is_admin() {
                    false
                } else {
                    update = update.filter(users::Column::Semester.eq(semester - 1));
                    true
                }
            }
            None => false,
        };

        if has_changes {
            let result = update.exec(db).await?;

            if result.rows_affected == 0 {
                let exists = users::Entity::find_by_id(auth_user.user_id).one(db).await?.is_some();
                if exists && semester_guarded {
                    return Err(ApiError::Forbidden(
                        "Students can only move to the next semester".to_string(),
                    ));
                }
                return Err(ApiError::NotFound("User not found".to_string()));
            }
        }

        users::Entity::find_by_id(auth_user.user_id)
            .one(db)
            .await?
            .ok_or_else(|| ApiError::NotFound("User not found".to_string()))
    }
}

// PBKDF2 est volontairement lent: hors du thread de l'event loop
async fn hash_blocking(plain: String) -> Result<String, ApiError> {
    tokio::task::spawn_blocking(move || password::hash_password(&plain))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?
        .map_err(ApiError::Internal)
}
