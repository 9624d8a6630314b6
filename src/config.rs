// Configuration lue depuis l'environnement (.env chargé par dotenv dans main)

use std::{env, fmt::Display, path::PathBuf, str::FromStr};

use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub username: String,
    pub password: String,
    pub from: String,
}

/// Bucket S3 (ou compatible). Les objets sont envoyés sans ACL: le fileUrl
/// retourné n'est lisible que si le bucket (ou le CDN de `public_url`)
/// autorise la lecture publique.
#[derive(Debug, Clone)]
pub struct S3Config {
    pub bucket: String,
    pub region: String,
    pub endpoint: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    /// S3_PUBLIC_URL: base publique des objets (CDN, domaine du bucket).
    /// Absent: {endpoint}/{bucket}
    pub public_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub redis_url: Option<String>,
    pub smtp: Option<SmtpConfig>,
    pub s3: Option<S3Config>,
    pub upload_dir: PathBuf,
    pub upload_base_url: String,
    pub cors_origins: Vec<String>,
    pub auto_migrate: bool,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        let database_url =
            env::var("DATABASE_URL").map_err(|_| "DATABASE_URL must be set".to_string())?;

        let host = try_load("HOST", "127.0.0.1")?;
        let port = try_load("PORT", "3000")?;

        let smtp = match optional("SMTP_HOST") {
            Some(host) => Some(SmtpConfig {
                host,
                username: optional("SMTP_USERNAME").unwrap_or_default(),
                password: optional("SMTP_PASSWORD").unwrap_or_default(),
                from: optional("MAIL_FROM")
                    .ok_or_else(|| "MAIL_FROM must be set when SMTP_HOST is set".to_string())?,
            }),
            None => None,
        };

        let s3 = match optional("S3_BUCKET") {
            Some(bucket) => {
                let region = try_load::<String>("S3_REGION", "us-east-1")?;
                let endpoint = optional("S3_ENDPOINT")
                    .unwrap_or_else(|| format!("https://s3.{region}.amazonaws.com"));
                Some(S3Config {
                    bucket,
                    region,
                    endpoint: endpoint.trim_end_matches('/').to_string(),
                    access_key_id: optional("AWS_ACCESS_KEY_ID").ok_or_else(|| {
                        "AWS_ACCESS_KEY_ID must be set when S3_BUCKET is set".to_string()
                    })?,
                    secret_access_key: optional("AWS_SECRET_ACCESS_KEY").ok_or_else(|| {
                        "AWS_SECRET_ACCESS_KEY must be set when S3_BUCKET is set".to_string()
                    })?,
                    public_url: optional("S3_PUBLIC_URL")
                        .map(|url| url.trim_end_matches('/').to_string()),
                })
            }
            None => None,
        };

        let upload_base_url = optional("UPLOAD_BASE_URL")
            .unwrap_or_else(|| format!("http://{host}:{port}/uploads"));

        let cors_origins = try_load::<String>("CORS_ORIGINS", "http://localhost:5173")?
            .split(',')
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect();

        Ok(Self {
            database_url,
            host,
            port,
            redis_url: optional("REDIS_URL"),
            smtp,
            s3,
            upload_dir: PathBuf::from(try_load::<String>("UPLOAD_DIR", "uploads")?),
            upload_base_url: upload_base_url.trim_end_matches('/').to_string(),
            cors_origins,
            auto_migrate: try_load("AUTO_MIGRATE", "true")?,
        })
    }
}

fn optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn try_load<T: FromStr>(key: &str, default: &str) -> Result<T, String>
where
    T::Err: Display,
{
    let raw = optional(key).unwrap_or_else(|| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });

    raw.parse().map_err(|e| {
        warn!("Invalid {key} value: {e}");
        format!("Invalid {key} value: {e}")
    })
}
