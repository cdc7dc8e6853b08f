use actix_web::{web, HttpResponse, ResponseError};
use serde::Deserialize;

use crate::middleware::Claims;
use crate::models::IndustryDemandResponse;
use crate::services::industry_demand_service;
use crate::state::AppState;

#[derive(Debug, Deserialize, utoipa::ToSchema, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct LocationRequest {
    /// Defaults to `India`.
    pub location: Option<String>,
}

#[utoipa::path(
    post,
    path = "/api/industry-demand/run",
    tag = "Industry Demand",
    request_body = LocationRequest,
    responses(
        (status = 200, description = "New snapshot stored", body = IndustryDemandResponse),
        (status = 400, description = "Location too long"),
        (status = 500, description = "Market scan failed")
    ),
    security(("cookie_auth" = []))
)]
pub async fn run(
    state: web::Data<AppState>,
    claims: web::ReqData<Claims>,
    request: Option<web::Json<LocationRequest>>,
) -> HttpResponse {
    log::info!("📈 POST /industry-demand/run - user: {}", claims.sub);

    let user_id = match claims.user_id() {
        Ok(id) => id,
        Err(e) => return e.error_response(),
    };
    let requested = request.and_then(|r| r.into_inner().location);
    let location = match industry_demand_service::resolve_location(requested.as_deref()) {
        Ok(location) => location,
        Err(e) => return e.error_response(),
    };

    match industry_demand_service::run(&state, &user_id, location).await {
        Ok(snapshot) => HttpResponse::Ok().json(serde_json::json!({
            "message": "Industry demand updated",
            "data": IndustryDemandResponse::from(snapshot)
        })),
        Err(e) => {
            log::warn!("❌ Industry demand scan failed for {}: {}", claims.sub, e);
            e.error_response()
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/industry-demand/latest",
    tag = "Industry Demand",
    params(LocationRequest),
    responses(
        (status = 200, description = "Newest snapshot for the location"),
        (status = 404, description = "No data found")
    ),
    security(("cookie_auth" = []))
)]
pub async fn latest(
    state: web::Data<AppState>,
    claims: web::ReqData<Claims>,
    query: web::Query<LocationRequest>,
) -> HttpResponse {
    let user_id = match claims.user_id() {
        Ok(id) => id,
        Err(e) => return e.error_response(),
    };
    let location = match industry_demand_service::resolve_location(query.location.as_deref()) {
        Ok(location) => location,
        Err(e) => return e.error_response(),
    };

    log::info!("📋 GET /industry-demand/latest - user: {}, location: {}", claims.sub, location);

    match industry_demand_service::latest(&state, &user_id, &location).await {
        Ok(snapshot) => HttpResponse::Ok().json(serde_json::json!({
            "data": IndustryDemandResponse::from(snapshot)
        })),
        Err(e) => e.error_response(),
    }
}
