use std::path::{Path, PathBuf};

use mongodb::bson::oid::ObjectId;
use serde_json::Value;

use super::upload_service::{self, AnalysisInput, DocumentKind};
use crate::models::{Analysis, AnalysisField, AnalysisUpdate};
use crate::state::AppState;
use crate::utils::AppError;

const MISSING_INPUTS: &str = "Resume, Transcript, Certificate, and GitHub URL are required";

fn arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

fn required(input: &AnalysisInput, kind: DocumentKind) -> Result<PathBuf, AppError> {
    input
        .documents
        .get(&kind)
        .cloned()
        .ok_or_else(|| AppError::Validation(MISSING_INPUTS.into()))
}

/// Runs the four document analyses and stores them in one upsert.
///
/// Documents missing from `input` are taken from `dir`. Nothing is written
/// unless every script succeeds.
pub async fn analyze_documents(
    state: &AppState,
    user_id: &ObjectId,
    dir: &Path,
    mut input: AnalysisInput,
) -> Result<Analysis, AppError> {
    upload_service::fill_from_disk(dir, &mut input).await;

    let resume = required(&input, DocumentKind::Resume)?;
    let transcript = required(&input, DocumentKind::Transcript)?;
    let certificate = required(&input, DocumentKind::Certificate)?;
    let github_url = input
        .github_url
        .clone()
        .ok_or_else(|| AppError::Validation(MISSING_INPUTS.into()))?;

    log::info!("🔬 Running document analysis for user {}", user_id);

    let scripts = &state.config.scripts;
    let invoker = &state.invoker;
    let resume_args = [arg(&resume)];
    let transcript_args = [arg(&transcript)];
    let certificate_args = [arg(&certificate)];
    let github_args = [github_url];
    let (resume, transcript, certificate, github) = tokio::try_join!(
        invoker.run_json(&scripts.resume, &resume_args),
        invoker.run_json(&scripts.transcript, &transcript_args),
        invoker.run_json(&scripts.certificate, &certificate_args),
        invoker.run_json(&scripts.github, &github_args),
    )?;

    let update = AnalysisUpdate::from([
        (AnalysisField::Resume, resume),
        (AnalysisField::Transcript, transcript),
        (AnalysisField::Certificate, certificate),
        (AnalysisField::Github, github),
    ]);

    let analysis = state.store.upsert_analysis(user_id, update).await?;
    log::info!("✅ Analysis saved for user {}", user_id);
    Ok(analysis)
}

pub async fn latest(state: &AppState, user_id: &ObjectId) -> Result<Analysis, AppError> {
    state
        .store
        .find_analysis(user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("No analysis found".into()))
}

pub async fn personality_instructions(state: &AppState) -> Result<Value, AppError> {
    let output = state
        .invoker
        .run_json(&state.config.scripts.personality, &["--instructions".to_string()])
        .await?;
    Ok(output)
}

/// Normalizes a RIASEC code: exactly three of R, I, A, S, E, C, upper-cased.
pub fn normalize_riasec(code: &str) -> Option<String> {
    let code = code.trim().to_ascii_uppercase();
    let valid = code.chars().count() == 3 && code.chars().all(|c| "RIASEC".contains(c));
    valid.then_some(code)
}

/// Runs the personality review and stores it as `personalityResult`.
pub async fn personality_review(
    state: &AppState,
    user_id: &ObjectId,
    riasec_code: Option<&Value>,
) -> Result<Value, AppError> {
    let raw = riasec_code
        .and_then(Value::as_str)
        .filter(|code| !code.is_empty())
        .ok_or_else(|| AppError::Validation("riasecCode is required".into()))?;

    let code = normalize_riasec(raw).ok_or_else(|| {
        AppError::Validation("riasecCode must be three letters from R, I, A, S, E, C".into())
    })?;

    log::info!("🧭 Personality review {} for user {}", code, user_id);

    let result = state
        .invoker
        .run_json(&state.config.scripts.personality, &[code])
        .await?;

    let analysis = state
        .store
        .upsert_analysis(user_id, AnalysisUpdate::from([(AnalysisField::Personality, result)]))
        .await?;

    Ok(analysis.personality_result.unwrap_or(Value::Null))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_riasec() {
        assert_eq!(normalize_riasec("ias").as_deref(), Some("IAS"));
        assert_eq!(normalize_riasec(" RIC ").as_deref(), Some("RIC"));
        assert!(normalize_riasec("RI").is_none());
        assert!(normalize_riasec("RIAS").is_none());
        assert!(normalize_riasec("RIX").is_none());
        assert!(normalize_riasec("R;C").is_none());
    }
}
