// Logique métier. Les routes restent fines et délèguent ici.
//
// Infrastructure (traits + implémentations, injectés via web::Data):
//   - otp_store : Redis / mémoire
//   - mailer    : SMTP / log
//   - storage   : S3 / disque local

pub mod activity_service;
pub mod announcement_service;
pub mod event_service;
pub mod feedback_service;
pub mod file_service;
pub mod mailer;
pub mod note_service;
pub mod otp_service;
pub mod otp_store;
pub mod storage;
pub mod subject_service;
pub mod tip_service;
pub mod user_service;
