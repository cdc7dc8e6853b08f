pub mod analysis;
pub mod auth;
pub mod career_role;
pub mod health;
pub mod industry_demand;
pub mod metrics;
pub mod students;
pub mod swagger;

use actix_web::{error, web};

use crate::middleware::AuthMiddleware;
use crate::utils::AppError;

/// Malformed JSON bodies get the same `{"message"}` shape as other 400s.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(1024 * 1024)
        .error_handler(|err, _req| {
            log::warn!("❌ Rejected JSON body: {}", err);
            error::Error::from(AppError::Validation(format!("Invalid JSON body: {}", err)))
        })
}

/// Registers every route of the service.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(json_config())
        // Health check
        .route("/health", web::get().to(health::health_check))
        // Metrics
        .route("/metrics", web::get().to(metrics::get_metrics))
        // Auth: session cookie issued here, only /check is protected
        .service(
            web::scope("/api/auth")
                .route("/signup", web::post().to(auth::signup))
                .route("/login", web::post().to(auth::login))
                .route("/logout", web::post().to(auth::logout))
                .service(
                    web::resource("/check")
                        .wrap(AuthMiddleware)
                        .route(web::get().to(auth::check)),
                ),
        )
        // Document analysis and personality review
        .service(
            web::scope("/api/analysis")
                .wrap(AuthMiddleware)
                .route("/upload", web::post().to(analysis::upload))
                .route("/upload/{field}", web::delete().to(analysis::delete_upload))
                .route("/process", web::post().to(analysis::process))
                .route("/latest", web::get().to(analysis::latest))
                .route(
                    "/personality/instructions",
                    web::get().to(analysis::personality_instructions),
                )
                .route("/personality", web::post().to(analysis::personality)),
        )
        // Five-source merge and follow-up guides
        .service(
            web::scope("/api/students")
                .wrap(AuthMiddleware)
                .route("/analyse-five", web::post().to(students::analyse_five))
                .route("/latest", web::get().to(students::latest))
                .route("/skill-pathway", web::post().to(students::skill_pathway))
                .route(
                    "/course-recommendations",
                    web::post().to(students::course_recommendations),
                )
                .route("/portfolio-builder", web::post().to(students::portfolio_builder)),
        )
        // Market snapshots
        .service(
            web::scope("/api/industry-demand")
                .wrap(AuthMiddleware)
                .route("/run", web::post().to(industry_demand::run))
                .route("/latest", web::get().to(industry_demand::latest)),
        )
        .service(
            web::scope("/api/career-role")
                .wrap(AuthMiddleware)
                .route("/suggest", web::post().to(career_role::suggest)),
        );
}
