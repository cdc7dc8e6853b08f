use actix_multipart::Multipart;
use actix_web::{web, HttpResponse, ResponseError};
use serde::Deserialize;
use serde_json::Value;

use crate::middleware::Claims;
use crate::models::AnalysisResponse;
use crate::services::analysis_service;
use crate::services::upload_service::{self, AnalysisInput};
use crate::state::AppState;

/// Multipart body of `POST /api/analysis/upload` (documentation only).
#[allow(dead_code)]
#[derive(Deserialize, utoipa::ToSchema)]
pub struct UploadForm {
    #[schema(value_type = Option<String>, format = Binary)]
    resume: Vec<u8>,
    #[schema(value_type = Option<String>, format = Binary)]
    transcript: Vec<u8>,
    #[schema(value_type = Option<String>, format = Binary)]
    certificate: Vec<u8>,
    #[serde(rename = "githubUrl")]
    github_url: String,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct ProcessRequest {
    #[serde(rename = "githubUrl")]
    pub github_url: Option<String>,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct PersonalityRequest {
    #[serde(rename = "riasecCode")]
    #[schema(value_type = Option<String>, example = "IAS")]
    pub riasec_code: Option<Value>,
}

fn saved(analysis_id: String) -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "analysisId": analysis_id,
        "message": "Analysis saved"
    }))
}

async fn run_analysis(state: &AppState, claims: &Claims, input: AnalysisInput) -> HttpResponse {
    let user_id = match claims.user_id() {
        Ok(id) => id,
        Err(e) => return e.error_response(),
    };
    let dir = upload_service::user_dir(&state.config.uploads_dir, claims.display_label(), &user_id);

    match analysis_service::analyze_documents(state, &user_id, &dir, input).await {
        Ok(analysis) => saved(analysis.id.map(|id| id.to_hex()).unwrap_or_default()),
        Err(e) => {
            log::warn!("❌ Analysis failed for {}: {}", claims.sub, e);
            e.error_response()
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/analysis/upload",
    tag = "Analysis",
    request_body(content = UploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "All four analyses stored"),
        (status = 400, description = "Missing inputs, duplicate upload or oversized file"),
        (status = 500, description = "An analysis script failed; nothing was stored"),
        (status = 503, description = "Script pool saturated")
    ),
    security(("cookie_auth" = []))
)]
pub async fn upload(
    state: web::Data<AppState>,
    claims: web::ReqData<Claims>,
    payload: Multipart,
) -> HttpResponse {
    log::info!("📤 POST /analysis/upload - user: {}", claims.sub);

    let user_id = match claims.user_id() {
        Ok(id) => id,
        Err(e) => return e.error_response(),
    };
    let dir = upload_service::user_dir(&state.config.uploads_dir, claims.display_label(), &user_id);
    let input = match upload_service::receive(payload, &dir, state.config.max_upload_bytes).await {
        Ok(input) => input,
        Err(e) => {
            log::warn!("❌ Upload rejected for {}: {}", claims.sub, e);
            return e.error_response();
        }
    };

    run_analysis(&state, &claims, input).await
}

#[utoipa::path(
    post,
    path = "/api/analysis/process",
    tag = "Analysis",
    request_body = ProcessRequest,
    responses(
        (status = 200, description = "All four analyses stored"),
        (status = 400, description = "Documents or GitHub URL missing"),
        (status = 500, description = "An analysis script failed; nothing was stored")
    ),
    security(("cookie_auth" = []))
)]
pub async fn process(
    state: web::Data<AppState>,
    claims: web::ReqData<Claims>,
    request: Option<web::Json<ProcessRequest>>,
) -> HttpResponse {
    log::info!("⚙️  POST /analysis/process - user: {}", claims.sub);

    let input = AnalysisInput {
        documents: Default::default(),
        github_url: request
            .and_then(|r| r.into_inner().github_url)
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty()),
    };

    run_analysis(&state, &claims, input).await
}

#[utoipa::path(
    delete,
    path = "/api/analysis/upload/{field}",
    tag = "Analysis",
    params(("field" = String, Path, description = "resume, transcript or certificate")),
    responses(
        (status = 200, description = "Stored document removed"),
        (status = 400, description = "Unknown field"),
        (status = 404, description = "Nothing stored for this field")
    ),
    security(("cookie_auth" = []))
)]
pub async fn delete_upload(
    state: web::Data<AppState>,
    claims: web::ReqData<Claims>,
    field: web::Path<String>,
) -> HttpResponse {
    log::info!("🗑️  DELETE /analysis/upload/{} - user: {}", field, claims.sub);

    let user_id = match claims.user_id() {
        Ok(id) => id,
        Err(e) => return e.error_response(),
    };
    let dir = upload_service::user_dir(&state.config.uploads_dir, claims.display_label(), &user_id);
    match upload_service::delete_document(&dir, &field).await {
        Ok(removed) => HttpResponse::Ok().json(serde_json::json!({
            "message": format!("{} deleted", field),
            "removed": removed
        })),
        Err(e) => {
            log::warn!("❌ Delete failed for {}: {}", claims.sub, e);
            e.error_response()
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/analysis/latest",
    tag = "Analysis",
    responses(
        (status = 200, description = "The user's analysis document", body = AnalysisResponse),
        (status = 404, description = "No analysis found")
    ),
    security(("cookie_auth" = []))
)]
pub async fn latest(state: web::Data<AppState>, claims: web::ReqData<Claims>) -> HttpResponse {
    log::info!("📋 GET /analysis/latest - user: {}", claims.sub);

    let user_id = match claims.user_id() {
        Ok(id) => id,
        Err(e) => return e.error_response(),
    };

    match analysis_service::latest(&state, &user_id).await {
        Ok(analysis) => HttpResponse::Ok().json(AnalysisResponse::from(analysis)),
        Err(e) => e.error_response(),
    }
}

#[utoipa::path(
    get,
    path = "/api/analysis/personality/instructions",
    tag = "Analysis",
    responses(
        (status = 200, description = "Instructions printed by the personality script")
    ),
    security(("cookie_auth" = []))
)]
pub async fn personality_instructions(state: web::Data<AppState>, claims: web::ReqData<Claims>) -> HttpResponse {
    log::info!("📖 GET /analysis/personality/instructions - user: {}", claims.sub);

    match analysis_service::personality_instructions(&state).await {
        Ok(instructions) => HttpResponse::Ok().json(instructions),
        Err(e) => e.error_response(),
    }
}

#[utoipa::path(
    post,
    path = "/api/analysis/personality",
    tag = "Analysis",
    request_body = PersonalityRequest,
    responses(
        (status = 200, description = "Personality summary stored"),
        (status = 400, description = "Missing or malformed riasecCode")
    ),
    security(("cookie_auth" = []))
)]
pub async fn personality(
    state: web::Data<AppState>,
    claims: web::ReqData<Claims>,
    request: Option<web::Json<PersonalityRequest>>,
) -> HttpResponse {
    log::info!("🧭 POST /analysis/personality - user: {}", claims.sub);

    let user_id = match claims.user_id() {
        Ok(id) => id,
        Err(e) => return e.error_response(),
    };
    let code = request.and_then(|r| r.into_inner().riasec_code);

    match analysis_service::personality_review(&state, &user_id, code.as_ref()).await {
        Ok(result) => HttpResponse::Ok().json(serde_json::json!({
            "message": "Personality summary saved",
            "personalityResult": result
        })),
        Err(e) => {
            log::warn!("❌ Personality review failed for {}: {}", claims.sub, e);
            e.error_response()
        }
    }
}
