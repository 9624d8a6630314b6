// ============================================================================
// MODELS - MODULE PRINCIPAL
// ============================================================================
//
// Description:
//   Point d'entrée pour tous les modèles de données.
//   Chaque modèle correspond à une table avec SeaORM (PostgreSQL en prod).
//
// Liste des modules:
//   - health : Health check API
//   - users : Utilisateurs (STUDENT / ADMIN)
//   - branch : Filières (CSE, IT, ...)
//   - subject / subject_branch : Matières et leurs filières
//   - note / note_branch : Notes de cours (approbation par l'admin)
//   - tip : Conseils d'étude (PENDING / APPROVED / REJECTED)
//   - event : Événements
//   - announcement : Annonces de l'admin
//   - feedback : Commentaires sur une note ou un tip
//   - file : Fichiers partagés
//   - activity : Journal d'activité des utilisateurs
//   - dto : Data Transfer Objects pour les requêtes/réponses API
//
// Points d'attention:
//   - Tous les ids sont des UUID v4 générés côté serveur
//   - Les tables sont créées depuis les entités (voir db::create_schema)
//
// ============================================================================

pub mod activity;
pub mod announcement;
pub mod branch;
pub mod dto;
pub mod event;
pub mod feedback;
pub mod file;
pub mod health;
pub mod note;
pub mod note_branch;
pub mod subject;
pub mod subject_branch;
pub mod tip;
pub mod users;
