mod config;
mod db;
mod error;
mod middleware;
mod models;
mod routes;
mod services;
mod utils;

#[cfg(test)]
mod test_support;

use std::io;
use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{App, HttpServer, http::header, middleware::Logger, web};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::services::mailer::{LogMailer, Mailer, SmtpMailer};
use crate::services::otp_store::{MemoryOtpStore, OtpStore, RedisOtpStore};
use crate::services::storage::{FileStorage, LocalStorage, S3Storage};

fn startup_error(e: impl std::fmt::Display) -> io::Error {
    io::Error::other(e.to_string())
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenv::dotenv().ok();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = Config::from_env().map_err(startup_error)?;

    // 1. Base de données
    info!("Connecting to database...");
    let db = db::establish_connection(&config.database_url)
        .await
        .map_err(startup_error)?;
    if config.auto_migrate {
        db::create_schema(&db).await.map_err(startup_error)?;
        db::seed_branches(&db).await.map_err(startup_error)?;
    }
    info!("Database ready");

    // 2. Codes OTP: Redis, ou mémoire pour le développement
    let otp_store: Arc<dyn OtpStore> = match &config.redis_url {
        Some(url) => Arc::new(RedisOtpStore::connect(url).await.map_err(startup_error)?),
        None => {
            warn!("REDIS_URL not set, OTP codes are kept in memory");
            Arc::new(MemoryOtpStore::new())
        }
    };

    // 3. Emails: SMTP, ou simple log
    let mailer: Arc<dyn Mailer> = match &config.smtp {
        Some(smtp) => Arc::new(SmtpMailer::new(smtp).map_err(startup_error)?),
        None => {
            warn!("SMTP_HOST not set, emails are only logged");
            Arc::new(LogMailer)
        }
    };

    // 4. Fichiers: S3, ou disque local servi sous /uploads
    let local_upload_dir = match &config.s3 {
        Some(_) => None,
        None => {
            std::fs::create_dir_all(&config.upload_dir)?;
            Some(config.upload_dir.clone())
        }
    };
    let storage: Arc<dyn FileStorage> = match &config.s3 {
        Some(s3) => Arc::new(S3Storage::new(s3.clone())),
        None => {
            warn!(dir = %config.upload_dir.display(), "S3_BUCKET not set, files are stored on disk");
            Arc::new(LocalStorage::new(&config.upload_dir, config.upload_base_url.clone()))
        }
    };

    let otp_store = web::Data::from(otp_store);
    let mailer = web::Data::from(mailer);
    let storage = web::Data::from(storage);
    let db = web::Data::new(db);
    let cors_origins = config.cors_origins.clone();

    info!("Starting server on http://{}:{}", config.host, config.port);

    HttpServer::new(move || {
        let cors = cors_origins
            .iter()
            .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
            .allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
            .allowed_headers(vec![header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
            .supports_credentials()
            .max_age(3600);

        let mut app = App::new()
            .wrap(cors)
            .wrap(Logger::default())
            .app_data(db.clone())
            .app_data(otp_store.clone())
            .app_data(mailer.clone())
            .app_data(storage.clone())
            .configure(routes::configure_routes);

        if let Some(dir) = &local_upload_dir {
            app = app.service(actix_files::Files::new("/uploads", dir));
        }

        app
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await
}
