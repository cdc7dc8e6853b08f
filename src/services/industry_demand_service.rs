use mongodb::bson::oid::ObjectId;

use crate::models::IndustryDemand;
use crate::state::AppState;
use crate::utils::AppError;

pub const DEFAULT_LOCATION: &str = "India";
const MAX_LOCATION_CHARS: usize = 100;

/// Trimmed location, `India` when absent or blank.
pub fn resolve_location(location: Option<&str>) -> Result<String, AppError> {
    let location = location.map(str::trim).filter(|l| !l.is_empty()).unwrap_or(DEFAULT_LOCATION);
    if location.chars().count() > MAX_LOCATION_CHARS {
        return Err(AppError::Validation(format!(
            "location must be at most {} characters",
            MAX_LOCATION_CHARS
        )));
    }
    Ok(location.to_string())
}

/// Runs the market scan for `location` and appends a new snapshot.
pub async fn run(state: &AppState, user_id: &ObjectId, location: String) -> Result<IndustryDemand, AppError> {
    log::info!("📈 Industry demand scan for '{}' (user {})", location, user_id);

    let output = state
        .invoker
        .run_json(&state.config.scripts.job_demand, &[location.clone()])
        .await?;

    let snapshot = IndustryDemand::from_script_output(*user_id, location, &output);
    state.store.insert_industry_demand(snapshot).await
}

pub async fn latest(state: &AppState, user_id: &ObjectId, location: &str) -> Result<IndustryDemand, AppError> {
    state
        .store
        .latest_industry_demand(user_id, location)
        .await?
        .ok_or_else(|| AppError::NotFound("No data found".into()))
}
