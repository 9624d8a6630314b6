// connexion BD + création du schéma + données de référence

use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectOptions, ConnectionTrait, Database, DatabaseConnection,
    DbErr, EntityTrait, QueryFilter, Schema, Set, sea_query::TableCreateStatement,
};
use tracing::info;
use uuid::Uuid;

use crate::models::{
    activity, announcement, branch, event, feedback, file, note, note_branch, subject,
    subject_branch, tip, users,
};

/// Nom de l'index unique partiel qui garantit un seul ADMIN
pub const SINGLE_ADMIN_INDEX: &str = "users_single_admin";

/// Filières insérées au démarrage (code, nom)
pub const DEFAULT_BRANCHES: &[(&str, &str)] = &[
    ("CSE", "Computer Science Engineering"),
    ("IT", "Information Technology"),
    ("ECE", "Electronics & Communication Engineering"),
    ("ME", "Mechanical Engineering"),
    ("CSE_AI", "CSE Artificial Intelligence"),
    ("CSE_DS", "CSE Data Science"),
    ("CSE_CS", "CSE Cyber Security"),
    ("CSE_IAIML", "CSE Artificial Intelligence and Machine Learning"),
    ("CSIT", "Computer Science and Information Technology"),
    ("CS", "Computer Science"),
];

pub async fn establish_connection(database_url: &str) -> Result<DatabaseConnection, DbErr> {
    let mut options = ConnectOptions::new(database_url.to_owned());
    options.sqlx_logging(false);

    Database::connect(options).await
}

/// Crée les tables (IF NOT EXISTS) dans l'ordre des clés étrangères
pub async fn create_schema(db: &DatabaseConnection) -> Result<(), DbErr> {
    let backend = db.get_database_backend();
    let schema = Schema::new(backend);

    let tables: Vec<TableCreateStatement> = vec![
        schema.create_table_from_entity(branch::Entity),
        schema.create_table_from_entity(users::Entity),
        schema.create_table_from_entity(subject::Entity),
        schema.create_table_from_entity(subject_branch::Entity),
        schema.create_table_from_entity(note::Entity),
        schema.create_table_from_entity(note_branch::Entity),
        schema.create_table_from_entity(tip::Entity),
        schema.create_table_from_entity(event::Entity),
        schema.create_table_from_entity(announcement::Entity),
        schema.create_table_from_entity(feedback::Entity),
        schema.create_table_from_entity(file::Entity),
        schema.create_table_from_entity(activity::Entity),
    ];

    for mut table in tables {
        table.if_not_exists();
        db.execute(backend.build(&table)).await?;
    }

    // Au plus un ADMIN: contrainte portée par la BD, pas seulement par un COUNT
    db.execute_unprepared(&format!(
        "CREATE UNIQUE INDEX IF NOT EXISTS {SINGLE_ADMIN_INDEX} ON users (role) WHERE role = 'ADMIN'"
    ))
    .await?;

    info!("Database schema ready");
    Ok(())
}

/// Insère les filières manquantes (idempotent)
pub async fn seed_branches(db: &DatabaseConnection) -> Result<usize, DbErr> {
    let mut inserted = 0;

    for (code, name) in DEFAULT_BRANCHES {
        let existing = branch::Entity::find()
            .filter(branch::Column::Code.eq(*code))
            .one(db)
            .await?;

        if existing.is_none() {
            branch::ActiveModel {
                id: Set(Uuid::new_v4()),
                code: Set(code.to_string()),
                name: Set(name.to_string()),
            }
            .insert(db)
            .await?;
            inserted += 1;
        }
    }

    if inserted > 0 {
        info!(inserted, "Seeded branches");
    }
    Ok(inserted)
}
