use actix_web::{web, HttpResponse, ResponseError};

use super::industry_demand::LocationRequest;
use crate::middleware::Claims;
use crate::services::{career_role_service, industry_demand_service};
use crate::state::AppState;

#[utoipa::path(
    post,
    path = "/api/career-role/suggest",
    tag = "Career Role",
    request_body = LocationRequest,
    responses(
        (status = 200, description = "Suggested roles for the user in this market"),
        (status = 404, description = "Industry demand or merged profile missing"),
        (status = 500, description = "Matching script failed")
    ),
    security(("cookie_auth" = []))
)]
pub async fn suggest(
    state: web::Data<AppState>,
    claims: web::ReqData<Claims>,
    request: Option<web::Json<LocationRequest>>,
) -> HttpResponse {
    log::info!("🎯 POST /career-role/suggest - user: {}", claims.sub);

    let user_id = match claims.user_id() {
        Ok(id) => id,
        Err(e) => return e.error_response(),
    };
    let requested = request.and_then(|r| r.into_inner().location);
    let location = match industry_demand_service::resolve_location(requested.as_deref()) {
        Ok(location) => location,
        Err(e) => return e.error_response(),
    };

    match career_role_service::suggest(&state, &user_id, &location).await {
        Ok(roles) => HttpResponse::Ok().json(serde_json::json!({
            "message": "Career roles generated successfully",
            "suggested_roles": roles
        })),
        Err(e) => {
            log::warn!("❌ Career role suggestion failed for {}: {}", claims.sub, e);
            e.error_response()
        }
    }
}
