use actix_multipart::Multipart;
use actix_web::{HttpResponse, delete, get, post, put, web};
use sea_orm::DatabaseConnection;
use serde_json::json;
use uuid::Uuid;

use crate::error::ApiError;
use crate::middleware::{AdminUser, AuthUser};
use crate::models::dto::{BulkNotesRequest, NoteFilterQuery};
use crate::services::note_service::{NewNote, NoteService};
use crate::services::storage::FileStorage;
use crate::utils::multipart::{MAX_UPLOAD_BYTES, read_form};

fn require_ids(body: &BulkNotesRequest) -> Result<(), ApiError> {
    if body.note_ids.is_empty() {
        return Err(ApiError::BadRequest(
            "noteIds must be a non-empty array.".to_string(),
        ));
    }
    Ok(())
}

/// POST /notes/note/upload - Déposer une note (multipart) (PROTÉGÉE)
#[post("/note/upload")]
pub async fn upload_note(
    auth_user: AuthUser,
    payload: Multipart,
    db: web::Data<DatabaseConnection>,
    storage: web::Data<dyn FileStorage>,
) -> Result<HttpResponse, ApiError> {
    // 1. Lire le formulaire
    let form = read_form(payload, "file", MAX_UPLOAD_BYTES).await?;

    // 2. Valider les champs
    let new_note = NewNote::from_form(form)?;

    // 3. Stocker le fichier et créer la note (non approuvée)
    let note = NoteService::upload(db.get_ref(), storage.get_ref(), &auth_user, new_note).await?;

    Ok(HttpResponse::Created().json(json!({
        "message": "Note uploaded successfully",
        "note": note,
    })))
}

/// GET /notes/note/all - Notes approuvées (PUBLIC)
#[get("/note/all")]
pub async fn get_all_notes(db: web::Data<DatabaseConnection>) -> Result<HttpResponse, ApiError> {
    let notes = NoteService::list_approved(db.get_ref()).await?;

    Ok(HttpResponse::Ok().json(json!({ "notes": notes })))
}

/// GET /notes/note/pending - File de modération (ADMIN)
#[get("/note/pending")]
pub async fn get_pending_notes(
    _admin: AdminUser,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, ApiError> {
    let notes = NoteService::list_pending(db.get_ref()).await?;

    Ok(HttpResponse::Ok().json(json!({ "notes": notes })))
}

/// GET /notes/note/filter?branchCode=&semester=&subjectId= (PUBLIC)
#[get("/note/filter")]
pub async fn filter_notes(
    query: web::Query<NoteFilterQuery>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, ApiError> {
    let notes = NoteService::filter(db.get_ref(), &query).await?;

    Ok(HttpResponse::Ok().json(json!({ "notes": notes })))
}

/// GET /notes/note/count - Notes approuvées de la filière de l'utilisateur (PROTÉGÉE)
#[get("/note/count")]
pub async fn count_notes(
    auth_user: AuthUser,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, ApiError> {
    let count = NoteService::count_for_branch(db.get_ref(), auth_user.branch_id).await?;

    Ok(HttpResponse::Ok().json(json!({ "count": count })))
}

/// GET /notes/note/{id} - Détail avec feedbacks (PUBLIC)
#[get("/note/{id}")]
pub async fn get_note(
    path: web::Path<Uuid>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, ApiError> {
    let note = NoteService::find(db.get_ref(), path.into_inner()).await?;

    Ok(HttpResponse::Ok().json(json!({ "note": note })))
}

/// PUT /notes/note/approve/{id} - Approuver une note (ADMIN)
#[put("/note/approve/{id}")]
pub async fn approve_note(
    admin: AdminUser,
    path: web::Path<Uuid>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, ApiError> {
    let AdminUser(admin) = admin;
    let note = NoteService::approve(db.get_ref(), path.into_inner(), admin.user_id).await?;

    Ok(HttpResponse::Ok().json(json!({
        "message": "Note approved successfully",
        "note": note,
    })))
}

/// POST /notes/bulk-approve - Approuver plusieurs notes en attente (ADMIN)
#[post("/bulk-approve")]
pub async fn bulk_approve(
    admin: AdminUser,
    body: web::Json<BulkNotesRequest>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, ApiError> {
    require_ids(&body)?;

    let AdminUser(admin) = admin;
    let count = NoteService::bulk_approve(db.get_ref(), &body.note_ids, admin.user_id).await?;

    Ok(HttpResponse::Ok().json(json!({ "message": format!("{} notes approved.", count) })))
}

/// POST /notes/bulk-delete - Supprimer plusieurs notes (ADMIN)
#[post("/bulk-delete")]
pub async fn bulk_delete(
    _admin: AdminUser,
    body: web::Json<BulkNotesRequest>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, ApiError> {
    require_ids(&body)?;

    let count = NoteService::bulk_delete(db.get_ref(), &body.note_ids).await?;

    Ok(HttpResponse::Ok().json(json!({ "message": format!("{} notes deleted.", count) })))
}

/// DELETE /notes/note/{id} - Supprimer sa note (ou n'importe laquelle en admin) (PROTÉGÉE)
#[delete("/note/{id}")]
pub async fn delete_note(
    auth_user: AuthUser,
    path: web::Path<Uuid>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, ApiError> {
    NoteService::delete(db.get_ref(), &auth_user, path.into_inner()).await?;

    Ok(HttpResponse::Ok().json(json!({ "message": "Note deleted successfully" })))
}

/// GET /notes/unique-approved-count - Fichiers distincts parmi les notes approuvées (PROTÉGÉE)
#[get("/unique-approved-count")]
pub async fn unique_approved_count(
    _auth_user: AuthUser,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, ApiError> {
    let count = NoteService::unique_approved_count(db.get_ref()).await?;

    Ok(HttpResponse::Ok().json(json!({ "count": count })))
}

pub fn note_routes(cfg: &mut web::ServiceConfig) {
    // Les chemins fixes avant /note/{id}
    cfg.service(
        web::scope("/notes")
            .service(upload_note)
            .service(get_all_notes)
            .service(get_pending_notes)
            .service(filter_notes)
            .service(count_notes)
            .service(unique_approved_count)
            .service(get_note)
            .service(approve_note)
            .service(bulk_approve)
            .service(bulk_delete)
            .service(delete_note),
    );
}

#[cfg(test)]
mod tests {
    use actix_web::{http::StatusCode, test};
    use serde_json::{Value, json};

    use crate::models::users::Role;
    use crate::test_support::{TestContext, multipart_body};

    #[actix_web::test]
    async fn test_upload_then_approve_makes_note_visible() {
        let ctx = TestContext::new().await;
        let app = test::init_service(ctx.app()).await;
        let (_, student_token) = ctx.create_user("s@example.com", Role::Student, 3).await;
        let (_, admin_token) = ctx.create_user("admin@example.com", Role::Admin, 1).await;
        let subject = ctx.create_subject("Compilers", 3, &["CSE"]).await;
        let subject_id = subject.id.to_string();

        // 1. Upload par un étudiant
        let (content_type, payload) = multipart_body(
            &[
                ("title", "Lexer cheat sheet"),
                ("semester", "3"),
                ("subjectId", &subject_id),
                ("branchCodes", r#"["CSE","IT"]"#),
            ],
            Some(("lexer.pdf", "application/pdf", &b"%PDF-1.4 tokens"[..])),
        );
        let req = test::TestRequest::post()
            .uri("/api/v1/notes/note/upload")
            .insert_header(("Authorization", format!("Bearer {student_token}")))
            .insert_header(("Content-Type", content_type))
            .set_payload(payload)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let body: Value = test::read_body_json(resp).await;
        let note_id = body["note"]["id"].as_str().unwrap().to_string();
        assert!(body["note"]["approvedById"].is_null());
        assert!(body["note"]["fileUrl"].as_str().unwrap().ends_with(".pdf"));
        assert_eq!(body["note"]["branches"].as_array().unwrap().len(), 2);

        // 2. Pas encore visible
        let req = test::TestRequest::get().uri("/api/v1/notes/note/all").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert!(body["notes"].as_array().unwrap().is_empty());

        let req = test::TestRequest::get()
            .uri("/api/v1/notes/note/pending")
            .insert_header(("Authorization", format!("Bearer {admin_token}")))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["notes"].as_array().unwrap().len(), 1);

        // 3. Approbation
        let req = test::TestRequest::put()
            .uri(&format!("/api/v1/notes/note/approve/{note_id}"))
            .insert_header(("Authorization", format!("Bearer {admin_token}")))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["message"], "Note approved successfully");

        let req = test::TestRequest::get().uri("/api/v1/notes/note/all").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["notes"][0]["title"], "Lexer cheat sheet");
        assert_eq!(body["notes"][0]["uploadedBy"]["email"], "s@example.com");
        assert_eq!(body["notes"][0]["approvedBy"]["email"], "admin@example.com");

        let req = test::TestRequest::get()
            .uri("/api/v1/notes/note/filter?branchCode=IT&semester=3")
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["notes"].as_array().unwrap().len(), 1);

        let req = test::TestRequest::get()
            .uri("/api/v1/notes/note/count")
            .insert_header(("Authorization", format!("Bearer {student_token}")))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["count"], 1);
    }

    #[actix_web::test]
    async fn test_upload_rejects_incomplete_forms() {
        let ctx = TestContext::new().await;
        let app = test::init_service(ctx.app()).await;
        let (_, token) = ctx.create_user("s@example.com", Role::Student, 3).await;
        let subject = ctx.create_subject("Networks", 3, &["CSE"]).await;
        let subject_id = subject.id.to_string();

        let (content_type, payload) = multipart_body(
            &[("title", "No file"), ("semester", "3")],
            None,
        );
        let req = test::TestRequest::post()
            .uri("/api/v1/notes/note/upload")
            .insert_header(("Authorization", format!("Bearer {token}")))
            .insert_header(("Content-Type", content_type))
            .set_payload(payload)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["message"], "Missing required fields");

        let (content_type, payload) = multipart_body(
            &[
                ("title", "Bad codes"),
                ("semester", "3"),
                ("subjectId", &subject_id),
                ("branchCodes", "CSE"),
            ],
            Some(("tcp.pdf", "application/pdf", &b"%PDF"[..])),
        );
        let req = test::TestRequest::post()
            .uri("/api/v1/notes/note/upload")
            .insert_header(("Authorization", format!("Bearer {token}")))
            .insert_header(("Content-Type", content_type))
            .set_payload(payload)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["message"], "branchCodes must be array");

        // Sans token
        let req = test::TestRequest::post()
            .uri("/api/v1/notes/note/upload")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn test_bulk_operations_and_ownership() {
        let ctx = TestContext::new().await;
        let app = test::init_service(ctx.app()).await;
        let (owner, owner_token) = ctx.create_user("owner@example.com", Role::Student, 2).await;
        let (_, other_token) = ctx.create_user("other@example.com", Role::Student, 2).await;
        let (_, admin_token) = ctx.create_user("admin@example.com", Role::Admin, 1).await;
        let subject = ctx.create_subject("Algebra", 2, &["CSE"]).await;
        let first = ctx.create_note(&owner, &subject, "Groups", &["CSE"]).await;
        let second = ctx.create_note(&owner, &subject, "Rings", &["CSE"]).await;

        let req = test::TestRequest::post()
            .uri("/api/v1/notes/bulk-approve")
            .insert_header(("Authorization", format!("Bearer {admin_token}")))
            .set_json(json!({ "noteIds": [] }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let req = test::TestRequest::post()
            .uri("/api/v1/notes/bulk-approve")
            .insert_header(("Authorization", format!("Bearer {admin_token}")))
            .set_json(json!({ "noteIds": [first.id, second.id] }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["message"], "2 notes approved.");

        // Déjà approuvées: rien à faire
        let req = test::TestRequest::post()
            .uri("/api/v1/notes/bulk-approve")
            .insert_header(("Authorization", format!("Bearer {admin_token}")))
            .set_json(json!({ "noteIds": [first.id] }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["message"], "0 notes approved.");

        let req = test::TestRequest::delete()
            .uri(&format!("/api/v1/notes/note/{}", first.id))
            .insert_header(("Authorization", format!("Bearer {other_token}")))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);

        let req = test::TestRequest::delete()
            .uri(&format!("/api/v1/notes/note/{}", first.id))
            .insert_header(("Authorization", format!("Bearer {owner_token}")))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let req = test::TestRequest::post()
            .uri("/api/v1/notes/bulk-delete")
            .insert_header(("Authorization", format!("Bearer {admin_token}")))
            .set_json(json!({ "noteIds": [first.id, second.id] }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["message"], "1 notes deleted.");

        let req = test::TestRequest::get()
            .uri(&format!("/api/v1/notes/note/{}", second.id))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
