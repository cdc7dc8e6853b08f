use mongodb::bson::oid::ObjectId;
use serde_json::Value;

use crate::state::AppState;
use crate::utils::{text, AppError};

/// Matches the user's merged profile against the latest market snapshot for
/// `location` and returns the suggested roles (`[]` when none).
pub async fn suggest(state: &AppState, user_id: &ObjectId, location: &str) -> Result<Value, AppError> {
    let demand = state
        .store
        .latest_industry_demand(user_id, location)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(
                "No industry demand data found. Please generate industry demand data first.".into(),
            )
        })?;

    let student = state
        .store
        .find_student_result(user_id)
        .await?
        .filter(|r| !r.raw_response.is_empty())
        .ok_or_else(|| {
            AppError::NotFound(
                "No student profile found. Please generate your profile first using 'Analyse five'."
                    .into(),
            )
        })?;

    let job_analysis = demand.job_analysis().to_string();
    let user_profile = text::structured_profile(&student.raw_response).to_string();

    log::info!("🎯 Suggesting career roles in '{}' for user {}", location, user_id);

    let output = state
        .invoker
        .run_json(&state.config.scripts.career_role, &[job_analysis, user_profile])
        .await?;

    Ok(output
        .get("suggested_roles")
        .filter(|roles| !roles.is_null())
        .cloned()
        .unwrap_or_else(|| Value::Array(Vec::new())))
}
