use chrono::{DateTime, Utc};
use serde::Serialize;

// Réponse de GET /api/health
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: &'static str,
    pub time: DateTime<Utc>,
}
