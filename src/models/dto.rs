// DTOs des requêtes/réponses de l'API (JSON en camelCase côté frontend)
use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::prelude::Uuid;
use serde::{Deserialize, Deserializer, Serialize};
use validator::Validate;

use crate::models::tip::TipStatus;
use crate::models::users::Role;
use crate::models::{branch, feedback, note, subject, tip, users};

// Les champs texte libres sont trimés avant validation : "     " doit échouer `length(min = 5)`
fn trimmed<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    Ok(raw.trim().to_string())
}

fn trimmed_opt<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.map(|value| value.trim().to_string()))
}

// ---------------------------------------------------------------------------
// Utilisateurs / OTP
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Validate)]
pub struct GenerateOtpRequest {
    #[validate(email)]
    pub email: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct VerifyOtpRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(equal = 6, message = "OTP must be exactly 6 digits"))]
    pub code: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    #[validate(email)]
    pub email: String,
    #[serde(deserialize_with = "trimmed")]
    #[validate(length(min = 5, message = "Name must be at least 5 characters!!"))]
    pub name: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters!!"))]
    pub password: String,
    #[serde(default)]
    pub role: Role,
    #[validate(length(min = 1, message = "Branch is required"))]
    pub branch_code: String,
    #[validate(range(min = 1, max = 8, message = "Semester must be between 1 and 8"))]
    pub semester: i32,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SigninRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters!!"))]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct CheckUserQuery {
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteUserRequest {
    pub user_id: Uuid,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[serde(default, deserialize_with = "trimmed_opt")]
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: Option<String>,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: Option<String>,
    #[validate(range(min = 1, max = 8, message = "Semester must be between 1 and 8"))]
    pub semester: Option<i32>,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: users::Model,
}

#[derive(Debug, Serialize)]
pub struct SigninResponse {
    pub message: String,
    pub jwt: String,
    pub user: users::Model,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeResponse {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub semester: i32,
    pub branch: Option<branch::Model>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserSummary {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

impl From<users::Model> for UserSummary {
    fn from(user: users::Model) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
        }
    }
}

// Ligne de GET /users (admin)
#[derive(Debug, Serialize)]
pub struct UserListItem {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
}

impl From<users::Model> for UserListItem {
    fn from(user: users::Model) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            role: user.role,
        }
    }
}

// ---------------------------------------------------------------------------
// Matières
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SubjectRequest {
    #[serde(deserialize_with = "trimmed")]
    #[validate(length(min = 1))]
    pub name: String,
    #[validate(range(min = 1, max = 8))]
    pub semester: i32,
    #[validate(length(min = 1, message = "At least one branch is required"))]
    pub branch_codes: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct SubjectQuery {
    pub semester: Option<i32>,
    pub branch: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SubjectWithBranches {
    #[serde(flatten)]
    pub subject: subject::Model,
    pub branches: Vec<branch::Model>,
}

// ---------------------------------------------------------------------------
// Notes
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteFilterQuery {
    pub branch_code: Option<String>,
    pub semester: Option<i32>,
    pub subject_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkNotesRequest {
    pub note_ids: Vec<Uuid>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteResponse {
    #[serde(flatten)]
    pub note: note::Model,
    pub subject: Option<subject::Model>,
    pub branches: Vec<branch::Model>,
    pub uploaded_by: Option<UserSummary>,
    pub approved_by: Option<UserSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feedbacks: Option<Vec<feedback::Model>>,
}

// ---------------------------------------------------------------------------
// Tips
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Validate)]
pub struct TipRequest {
    #[serde(deserialize_with = "trimmed")]
    #[validate(length(min = 5))]
    pub title: String,
    #[serde(deserialize_with = "trimmed")]
    #[validate(length(min = 10))]
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct ModerateTipRequest {
    pub status: TipStatus,
}

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TipResponse {
    #[serde(flatten)]
    pub tip: tip::Model,
    pub posted_by: Option<UserSummary>,
    pub approved_by: Option<UserSummary>,
}

#[derive(Debug, Serialize)]
pub struct PendingTipsResponse {
    pub tips: Vec<TipResponse>,
    pub total: u64,
    pub page: u64,
    pub limit: u64,
}

// ---------------------------------------------------------------------------
// Événements / annonces
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct EventRequest {
    #[serde(deserialize_with = "trimmed")]
    #[validate(length(min = 3))]
    pub title: String,
    #[serde(deserialize_with = "trimmed")]
    #[validate(length(min = 10))]
    pub content: String,
    pub event_date: String,
}

impl EventRequest {
    /// Accepte une date RFC 3339 ("2025-03-01T10:00:00Z") ou un jour ("2025-03-01")
    pub fn parsed_event_date(&self) -> Option<DateTime<Utc>> {
        parse_event_date(&self.event_date)
    }
}

pub fn parse_event_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(date) = DateTime::parse_from_rfc3339(raw) {
        return Some(date.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|day| day.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

#[derive(Debug, Deserialize, Validate)]
pub struct AnnouncementRequest {
    #[serde(deserialize_with = "trimmed")]
    #[validate(length(min = 3))]
    pub title: String,
    #[serde(deserialize_with = "trimmed")]
    #[validate(length(min = 10))]
    pub message: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnouncementResponse {
    #[serde(flatten)]
    pub announcement: crate::models::announcement::Model,
    pub posted_by: Option<UserSummary>,
}

// ---------------------------------------------------------------------------
// Feedback
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackRequest {
    #[serde(deserialize_with = "trimmed")]
    #[validate(length(min = 5))]
    pub content: String,
    pub note_id: Option<Uuid>,
    pub tip_id: Option<Uuid>,
}

// ---------------------------------------------------------------------------
// Vue d'ensemble
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct OverviewResponse {
    pub notes: u64,
    pub tips: u64,
    pub events: u64,
    pub announcements: u64,
}
