// ============================================================================
// ERREURS API
// ============================================================================
//
// Description:
//   Toutes les erreurs des services et des routes passent par ApiError.
//   Chaque variante correspond à un code HTTP; les erreurs 5xx sont loggées
//   et le client ne reçoit qu'un message générique.
//
// Format des réponses:
//   - {"message": "..."} pour toutes les erreurs
//   - {"errors": {...}} pour les erreurs de validation (validator)
//
// ============================================================================

use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use sea_orm::DbErr;
use thiserror::Error;
use validator::ValidationErrors;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("Validation failed")]
    Validation(#[from] ValidationErrors),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    PayloadTooLarge(String),

    #[error("Database error: {0}")]
    Database(#[from] DbErr),

    #[error("Cache error: {0}")]
    Cache(String),

    #[error("Mail error: {0}")]
    Mail(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// Message renvoyé au client (jamais le détail d'une erreur interne)
    fn public_message(&self) -> String {
        match self {
            ApiError::Mail(_) => "Failed to send email".to_string(),
            ApiError::Storage(_) => "Failed to store file".to_string(),
            ApiError::Database(_) | ApiError::Cache(_) | ApiError::Internal(_) => {
                "Internal server error".to_string()
            }
            other => other.to_string(),
        }
    }
}

impl From<redis::RedisError> for ApiError {
    fn from(e: redis::RedisError) -> Self {
        ApiError::Cache(e.to_string())
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) | ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Database(_)
            | ApiError::Cache(_)
            | ApiError::Mail(_)
            | ApiError::Storage(_)
            | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();

        if let ApiError::Validation(errors) = self {
            return HttpResponse::build(status).json(serde_json::json!({ "errors": errors }));
        }

        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        HttpResponse::build(status).json(serde_json::json!({
            "message": self.public_message()
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;

    #[actix_web::test]
    async fn test_internal_errors_hide_details() {
        let error = ApiError::Database(DbErr::Custom("connection refused on 10.0.0.3".into()));
        assert_eq!(error.status_code(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = to_bytes(error.error_response().into_body()).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["message"], "Internal server error");
    }

    #[actix_web::test]
    async fn test_client_errors_keep_message() {
        let error = ApiError::Conflict("User already exists".into());
        assert_eq!(error.status_code(), StatusCode::CONFLICT);

        let body = to_bytes(error.error_response().into_body()).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["message"], "User already exists");
    }
}
