use actix_web::{HttpResponse, delete, get, post, put, web};
use sea_orm::DatabaseConnection;
use serde_json::json;
use validator::Validate;

use crate::error::ApiError;
use crate::middleware::{AdminUser, AuthUser};
use crate::models::dto::{
    AuthResponse, CheckUserQuery, DeleteUserRequest, GenerateOtpRequest, SigninRequest,
    SigninResponse, SignupRequest, UpdateProfileRequest, VerifyOtpRequest,
};
use crate::routes::branches::load_branches;
use crate::services::mailer::Mailer;
use crate::services::otp_service::OtpService;
use crate::services::otp_store::OtpStore;
use crate::services::user_service::UserService;

/// POST /users/generate-otp - Envoyer un code de vérification (PUBLIC)
#[post("/generate-otp")]
pub async fn generate_otp(
    body: web::Json<GenerateOtpRequest>,
    otp_store: web::Data<dyn OtpStore>,
    mailer: web::Data<dyn Mailer>,
) -> Result<HttpResponse, ApiError> {
    body.validate()?;

    OtpService::send_code(otp_store.get_ref(), mailer.get_ref(), &body.email).await?;

    Ok(HttpResponse::Ok().json(json!({ "message": "OTP sent to email!" })))
}

/// POST /users/verify-otp - Vérifier le code reçu (PUBLIC)
#[post("/verify-otp")]
pub async fn verify_otp(
    body: web::Json<VerifyOtpRequest>,
    otp_store: web::Data<dyn OtpStore>,
) -> Result<HttpResponse, ApiError> {
    body.validate()?;

    OtpService::verify_code(otp_store.get_ref(), &body.email, &body.code).await?;

    Ok(HttpResponse::Ok().json(json!({ "message": "OTP verified. You can now sign up." })))
}

/// GET /users/check-admin - Un admin existe-t-il déjà ? (PUBLIC)
#[get("/check-admin")]
pub async fn check_admin(db: web::Data<DatabaseConnection>) -> Result<HttpResponse, ApiError> {
    let admin_count = UserService::admin_count(db.get_ref()).await?;

    Ok(HttpResponse::Ok().json(json!({
        "adminExists": admin_count > 0,
        "adminCount": admin_count,
    })))
}

/// GET /users/check-user?email= - Email déjà inscrit ? (PUBLIC)
#[get("/check-user")]
pub async fn check_user(
    query: web::Query<CheckUserQuery>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, ApiError> {
    let email = query
        .email
        .as_deref()
        .map(str::trim)
        .filter(|email| !email.is_empty())
        .ok_or_else(|| ApiError::BadRequest("Email is required".to_string()))?;

    let exists = UserService::find_by_email(db.get_ref(), email).await?.is_some();

    Ok(HttpResponse::Ok().json(json!({ "exists": exists })))
}

/// POST /users/signup - Créer un compte après vérification OTP (PUBLIC)
#[post("/signup")]
pub async fn signup(
    body: web::Json<SignupRequest>,
    db: web::Data<DatabaseConnection>,
    otp_store: web::Data<dyn OtpStore>,
) -> Result<HttpResponse, ApiError> {
    body.validate()?;

    let (user, token) =
        UserService::signup(db.get_ref(), otp_store.get_ref(), body.into_inner()).await?;

    Ok(HttpResponse::Created().json(AuthResponse { token, user }))
}

/// POST /users/signin - Se connecter (PUBLIC)
#[post("/signin")]
pub async fn signin(
    body: web::Json<SigninRequest>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, ApiError> {
    body.validate()?;

    let (jwt, user) = UserService::signin(db.get_ref(), &body.email, &body.password).await?;

    Ok(HttpResponse::Ok().json(SigninResponse {
        message: "Login successful".to_string(),
        jwt,
        user,
    }))
}

/// GET /users/me - Profil de l'utilisateur connecté (PROTÉGÉE)
#[get("/me")]
pub async fn me(
    auth_user: AuthUser,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, ApiError> {
    let user = UserService::me(db.get_ref(), auth_user.user_id).await?;

    Ok(HttpResponse::Ok().json(json!({ "user": user })))
}

/// GET /users/users - Liste des comptes (ADMIN)
#[get("/users")]
pub async fn list_users(
    _admin: AdminUser,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, ApiError> {
    let users = UserService::list(db.get_ref()).await?;

    Ok(HttpResponse::Ok().json(json!({ "users": users })))
}

/// DELETE /users/user - Supprimer un compte (ADMIN)
#[delete("/user")]
pub async fn delete_user(
    _admin: AdminUser,
    body: web::Json<DeleteUserRequest>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, ApiError> {
    UserService::delete(db.get_ref(), body.user_id).await?;

    Ok(HttpResponse::Ok().json(json!({ "message": "User deleted successfully" })))
}

/// PUT /users/update-profile - Nom, mot de passe, semestre (PROTÉGÉE)
#[put("/update-profile")]
pub async fn update_profile(
    auth_user: AuthUser,
    body: web::Json<UpdateProfileRequest>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, ApiError> {
    body.validate()?;

    let user = UserService::update_profile(db.get_ref(), &auth_user, body.into_inner()).await?;

    Ok(HttpResponse::Ok().json(json!({
        "message": "Profile updated successfully",
        "user": user,
    })))
}

/// GET /users/branch - Filières pour le formulaire d'inscription (PUBLIC)
#[get("/branch")]
pub async fn list_branches(db: web::Data<DatabaseConnection>) -> Result<HttpResponse, ApiError> {
    let branches = load_branches(db.get_ref()).await?;

    Ok(HttpResponse::Ok().json(json!({ "branches": branches })))
}

pub fn user_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/users")
            .service(generate_otp)
            .service(verify_otp)
            .service(check_admin)
            .service(check_user)
            .service(signup)
            .service(signin)
            .service(me)
            .service(list_users)
            .service(delete_user)
            .service(update_profile)
            .service(list_branches),
    );
}
