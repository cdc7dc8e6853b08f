use actix_web::{web, HttpResponse, ResponseError};
use serde::Deserialize;
use serde_json::Value;

use crate::middleware::Claims;
use crate::models::StudentResultResponse;
use crate::services::student_service;
use crate::state::AppState;

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct SkillPathwayRequest {
    #[serde(rename = "targetCareer")]
    #[schema(value_type = Option<String>, example = "Data Scientist")]
    pub target_career: Option<Value>,
}

fn success(key: &str, value: Value) -> HttpResponse {
    let mut body = serde_json::Map::new();
    body.insert("status".to_string(), Value::from("success"));
    body.insert(key.to_string(), value);
    HttpResponse::Ok().json(Value::Object(body))
}

#[utoipa::path(
    post,
    path = "/api/students/analyse-five",
    tag = "Students",
    responses(
        (status = 200, description = "Merged profile stored; returns the raw model reply"),
        (status = 404, description = "No analysis found for user"),
        (status = 500, description = "Model not configured or unavailable")
    ),
    security(("cookie_auth" = []))
)]
pub async fn analyse_five(state: web::Data<AppState>, claims: web::ReqData<Claims>) -> HttpResponse {
    log::info!("🧠 POST /students/analyse-five - user: {}", claims.sub);

    let user_id = match claims.user_id() {
        Ok(id) => id,
        Err(e) => return e.error_response(),
    };

    match student_service::analyse_five(&state, &user_id).await {
        Ok(result) => {
            log::info!("✅ Five-source merge stored for {}", claims.sub);
            success("rawResponse", Value::String(result.raw_response))
        }
        Err(e) => {
            log::warn!("❌ Five-source merge failed for {}: {}", claims.sub, e);
            e.error_response()
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/students/latest",
    tag = "Students",
    responses(
        (status = 200, description = "Stored merge result", body = StudentResultResponse),
        (status = 404, description = "No student result found")
    ),
    security(("cookie_auth" = []))
)]
pub async fn latest(state: web::Data<AppState>, claims: web::ReqData<Claims>) -> HttpResponse {
    log::info!("📋 GET /students/latest - user: {}", claims.sub);

    let user_id = match claims.user_id() {
        Ok(id) => id,
        Err(e) => return e.error_response(),
    };

    match student_service::latest(&state, &user_id).await {
        Ok(result) => HttpResponse::Ok().json(StudentResultResponse::from(result)),
        Err(e) => e.error_response(),
    }
}

#[utoipa::path(
    post,
    path = "/api/students/skill-pathway",
    tag = "Students",
    request_body = SkillPathwayRequest,
    responses(
        (status = 200, description = "Skill pathway towards the target career"),
        (status = 400, description = "targetCareer missing or no text report"),
        (status = 404, description = "Five-source merge not run yet")
    ),
    security(("cookie_auth" = []))
)]
pub async fn skill_pathway(
    state: web::Data<AppState>,
    claims: web::ReqData<Claims>,
    request: Option<web::Json<SkillPathwayRequest>>,
) -> HttpResponse {
    log::info!("🛤️  POST /students/skill-pathway - user: {}", claims.sub);

    let user_id = match claims.user_id() {
        Ok(id) => id,
        Err(e) => return e.error_response(),
    };
    let target = request.and_then(|r| r.into_inner().target_career);

    match student_service::skill_pathway(&state, &user_id, target.as_ref()).await {
        Ok(pathway) => success("pathway", pathway),
        Err(e) => {
            log::warn!("❌ Skill pathway failed for {}: {}", claims.sub, e);
            e.error_response()
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/students/course-recommendations",
    tag = "Students",
    responses(
        (status = 200, description = "Course recommendations from the model"),
        (status = 400, description = "No text report in the stored merge"),
        (status = 404, description = "Five-source merge not run yet"),
        (status = 500, description = "Model not configured or reply unreadable")
    ),
    security(("cookie_auth" = []))
)]
pub async fn course_recommendations(state: web::Data<AppState>, claims: web::ReqData<Claims>) -> HttpResponse {
    log::info!("📚 POST /students/course-recommendations - user: {}", claims.sub);

    let user_id = match claims.user_id() {
        Ok(id) => id,
        Err(e) => return e.error_response(),
    };

    match student_service::course_recommendations(&state, &user_id).await {
        Ok(recommendations) => success("recommendations", recommendations),
        Err(e) => {
            log::warn!("❌ Course recommendations failed for {}: {}", claims.sub, e);
            e.error_response()
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/students/portfolio-builder",
    tag = "Students",
    responses(
        (status = 200, description = "Portfolio guide"),
        (status = 400, description = "No text report in the stored merge"),
        (status = 404, description = "Five-source merge not run yet")
    ),
    security(("cookie_auth" = []))
)]
pub async fn portfolio_builder(state: web::Data<AppState>, claims: web::ReqData<Claims>) -> HttpResponse {
    log::info!("🗂️  POST /students/portfolio-builder - user: {}", claims.sub);

    let user_id = match claims.user_id() {
        Ok(id) => id,
        Err(e) => return e.error_response(),
    };

    match student_service::portfolio_builder(&state, &user_id).await {
        Ok(portfolio) => success("portfolio", portfolio),
        Err(e) => {
            log::warn!("❌ Portfolio builder failed for {}: {}", claims.sub, e);
            e.error_response()
        }
    }
}
