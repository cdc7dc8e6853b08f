use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::OpenApi;

use crate::services::auth_service::SESSION_COOKIE;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "CareerGap Service API",
        version = "1.0.0",
        description = "Career analysis backend. \n\n**Authentication:** protected endpoints require the HTTP-only `jwt` session cookie set by signup or login.\n\n**Features:**\n- Document analysis (resume, transcript, certificate, GitHub)\n- Personality review\n- Five-source profile merge with a generative model\n- Skill pathways, course recommendations and portfolio guides\n- Industry demand snapshots and career role suggestions"
    ),
    paths(
        // Auth
        crate::api::auth::signup,
        crate::api::auth::login,
        crate::api::auth::logout,
        crate::api::auth::check,

        // Health & Metrics
        crate::api::health::health_check,
        crate::api::metrics::get_metrics,

        // Analysis
        crate::api::analysis::upload,
        crate::api::analysis::process,
        crate::api::analysis::delete_upload,
        crate::api::analysis::latest,
        crate::api::analysis::personality_instructions,
        crate::api::analysis::personality,

        // Students
        crate::api::students::analyse_five,
        crate::api::students::latest,
        crate::api::students::skill_pathway,
        crate::api::students::course_recommendations,
        crate::api::students::portfolio_builder,

        // Industry demand & career roles
        crate::api::industry_demand::run,
        crate::api::industry_demand::latest,
        crate::api::career_role::suggest,
    ),
    components(
        schemas(
            crate::services::auth_service::SignupRequest,
            crate::services::auth_service::LoginRequest,
            crate::services::auth_service::SessionUser,
            crate::models::UserResponse,
            crate::models::AuthMethod,

            crate::api::health::HealthResponse,
            crate::python::InvokerStatsSnapshot,

            crate::api::analysis::UploadForm,
            crate::api::analysis::ProcessRequest,
            crate::api::analysis::PersonalityRequest,
            crate::models::AnalysisResponse,

            crate::api::students::SkillPathwayRequest,
            crate::models::StudentResultResponse,

            crate::api::industry_demand::LocationRequest,
            crate::models::IndustryDemandResponse,
        )
    ),
    tags(
        (name = "Auth", description = "Password signup and login backed by an HTTP-only session cookie."),
        (name = "Health", description = "Health check and script pool metrics."),
        (name = "Analysis", description = "Document uploads, the four document analyses and the personality review."),
        (name = "Students", description = "Five-source profile merge and the follow-up guides built on it."),
        (name = "Industry Demand", description = "Job market snapshots per location."),
        (name = "Career Role", description = "Career roles matched against the latest market snapshot."),
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "cookie_auth",
                SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::with_description(
                    SESSION_COOKIE,
                    "Session token set by /api/auth/signup and /api/auth/login",
                ))),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_lists_protected_routes() {
        let doc = ApiDoc::openapi();
        let paths = &doc.paths.paths;

        assert!(paths.contains_key("/api/analysis/upload"));
        assert!(paths.contains_key("/api/students/analyse-five"));
        assert!(paths.contains_key("/api/career-role/suggest"));
        assert!(doc
            .components
            .as_ref()
            .map(|c| c.security_schemes.contains_key("cookie_auth"))
            .unwrap_or(false));
    }
}
