use std::collections::HashMap;

use actix_multipart::Multipart;
use futures::TryStreamExt;

use crate::error::ApiError;

/// Taille max d'un upload (20 Mo)
pub const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

// Champs texte (title, semester, ...) limités à 64 Ko
const MAX_FIELD_BYTES: usize = 64 * 1024;

#[derive(Debug)]
pub struct UploadedFile {
    pub filename: Option<String>,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Formulaire multipart lu en mémoire: champs texte + un fichier
#[derive(Debug, Default)]
pub struct MultipartForm {
    pub fields: HashMap<String, String>,
    pub file: Option<UploadedFile>,
}

impl MultipartForm {
    /// Valeur texte non vide d'un champ
    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .map(|value| value.trim())
            .filter(|value| !value.is_empty())
    }
}

/// Lit tout le formulaire. Le part `file_field` est gardé comme fichier,
/// les autres parts sont lus comme texte UTF-8.
pub async fn read_form(
    mut payload: Multipart,
    file_field: &str,
    max_file_bytes: usize,
) -> Result<MultipartForm, ApiError> {
    let mut form = MultipartForm::default();

    while let Some(mut field) = payload.try_next().await.map_err(bad_multipart)? {
        let (name, filename) = match field.content_disposition() {
            Some(disposition) => (
                disposition.get_name().unwrap_or_default().to_string(),
                disposition.get_filename().map(str::to_string),
            ),
            None => continue,
        };

        let is_file = name == file_field;
        let limit = if is_file { max_file_bytes } else { MAX_FIELD_BYTES };
        let content_type = field
            .content_type()
            .map(|mime| mime.essence_str().to_string())
            .unwrap_or_else(|| "application/octet-stream".to_string());

        let mut bytes = Vec::new();
        while let Some(chunk) = field.try_next().await.map_err(bad_multipart)? {
            if bytes.len() + chunk.len() > limit {
                return Err(ApiError::PayloadTooLarge(format!(
                    "Field '{}' exceeds {} bytes",
                    name, limit
                )));
            }
            bytes.extend_from_slice(&chunk);
        }

        if is_file {
            form.file = Some(UploadedFile {
                filename,
                content_type,
                bytes,
            });
        } else {
            let value = String::from_utf8(bytes)
                .map_err(|_| ApiError::BadRequest(format!("Field '{}' is not valid UTF-8", name)))?;
            form.fields.insert(name, value);
        }
    }

    Ok(form)
}

fn bad_multipart(e: actix_multipart::MultipartError) -> ApiError {
    ApiError::BadRequest(format!("Invalid multipart body: {}", e))
}
