use std::path::Path;

use mongodb::bson::oid::ObjectId;
use serde_json::Value;

use crate::models::{Analysis, StudentResult};
use crate::state::AppState;
use crate::utils::{text, AppError};

const STUDENT_SCHEMA: &str = r#"{
  "studentProfile": {
    "personalInformation": {
      "name": "",
      "email": "",
      "phone": "",
      "location": "",
      "linkedin": "",
      "github": "",
      "summary": ""
    },
    "academicInformation": {
      "university": "",
      "degree": "",
      "branch": "",
      "yearOfStudy": "",
      "cgpa": "",
      "academicHistory": []
    },
    "skills": {
      "technicalSkills": [],
      "nonTechnicalSkills": [],
      "skillGaps": [],
      "skillInsights": ""
    },
    "projects": [],
    "achievements": [],
    "certifications": [],
    "personalityProfile": {
      "riasecType": "",
      "dominantTraits": [],
      "traitScores": {},
      "careerPersonalityFit": []
    },
    "githubAnalysis": {
      "username": "",
      "repositoriesAnalyzed": [],
      "languagesUsed": [],
      "contributionActivity": "",
      "githubInsights": ""
    },
    "careerRecommendations": {
      "suggestedCareerPaths": [],
      "recommendedCourses": [],
      "recommendedInternships": []
    },
    "portfolioSummary": {
      "strengths": [],
      "weaknesses": [],
      "overallEvaluation": "",
      "profileCompletenessScore": ""
    },
    "metadata": {
      "dataSources": ["Resume", "Transcript", "Certificates", "GitHub", "Personality Test"],
      "lastUpdated": "",
      "dataVersion": "v1.0"
    }
  }
}"#;

const NO_RAW_RESPONSE: &str = "No student raw response found. Run 'Analyse five' first.";

fn merge_prompt() -> String {
    format!(
        "You are an expert AI career and profile analysis system. You are provided with 5 datasets about a student:

1. Resume content
2. Academic transcript
3. Certificates and achievements
4. GitHub profile analysis
5. Personality assessment

Your job:
- Merge and summarize all information.
- Eliminate redundant or duplicate data.
- Output in TWO sections:
  1. \"structured_profile\": a detailed JSON matching this schema:
  {}
  2. \"text_report\": a concise human-readable summary of the student's strengths, profile, and career readiness.

Rules:
- Use exact JSON format (valid JSON).
- Fill as many fields as possible based on given input.
- If data is missing, leave values as empty strings or arrays.
- Ensure \"structured_profile\" and \"text_report\" are valid JSON keys.",
        STUDENT_SCHEMA
    )
}

fn course_prompt(report: &str) -> String {
    format!(
        "You are a senior learning architect. Based on the following student profile summary, propose a prioritized list of 8-12 course recommendations with clear rationale.

Student text report:

{}

Return strict JSON with keys:
{{
  \"courses\": [
    {{ \"title\": \"\", \"level\": \"Beginner|Intermediate|Advanced\", \"provider\": \"\", \"topics\": [], \"why\": \"\" }}
  ],
  \"summary\": \"\"
}}",
        report
    )
}

/// Merges the five analysis sources with the generative model and stores the
/// raw reply, replacing any previous one.
pub async fn analyse_five(state: &AppState, user_id: &ObjectId) -> Result<StudentResult, AppError> {
    let model = state.model()?;

    let analysis: Analysis = state
        .store
        .find_analysis(user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("No analysis found for user".into()))?;

    let combined = serde_json::to_string_pretty(&analysis.combined_input())
        .map_err(|e| AppError::Internal(format!("Failed to encode analysis: {}", e)))?;

    log::info!("🧠 Merging five sources for user {}", user_id);
    let reply = model.generate(&[merge_prompt(), combined]).await?;

    state.store.upsert_student_result(user_id, &reply).await
}

pub async fn latest(state: &AppState, user_id: &ObjectId) -> Result<StudentResult, AppError> {
    state
        .store
        .find_student_result(user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("No student result found".into()))
}

/// Text report of the stored merge, or the error a follow-up step reports.
async fn stored_report(state: &AppState, user_id: &ObjectId) -> Result<String, AppError> {
    let result = state
        .store
        .find_student_result(user_id)
        .await?
        .filter(|r| !r.raw_response.is_empty())
        .ok_or_else(|| AppError::NotFound(NO_RAW_RESPONSE.into()))?;

    let report = text::text_report(&result.raw_response);
    if report.is_empty() {
        return Err(AppError::Validation("text_report not found in rawResponse".into()));
    }
    Ok(report)
}

/// Runs `script` with the report written to a temporary file in `tmp_dir`;
/// the file is removed once the script returns.
async fn run_with_report_file(
    state: &AppState,
    script: &Path,
    leading_args: Vec<String>,
    prefix: &str,
    report: &str,
) -> Result<Value, AppError> {
    let tmp_dir = &state.config.tmp_dir;
    tokio::fs::create_dir_all(tmp_dir).await?;

    let file = tempfile::Builder::new()
        .prefix(prefix)
        .suffix(".txt")
        .tempfile_in(tmp_dir)?;
    tokio::fs::write(file.path(), report).await?;

    let mut args = leading_args;
    args.push(file.path().to_string_lossy().into_owned());

    let output = state.invoker.run_json(script, &args).await?;
    Ok(output)
}

pub async fn skill_pathway(
    state: &AppState,
    user_id: &ObjectId,
    target_career: Option<&Value>,
) -> Result<Value, AppError> {
    let target = target_career
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::Validation("targetCareer is required".into()))?
        .to_string();

    let report = stored_report(state, user_id).await?;

    log::info!("🛤️  Skill pathway to '{}' for user {}", target, user_id);
    run_with_report_file(
        state,
        &state.config.scripts.skill_path,
        vec![target],
        "userdoc_",
        &report,
    )
    .await
}

/// Asks the model for course recommendations in strict JSON.
///
/// A reply without any `{...}` slice yields `{}`; a slice that is not valid
/// JSON is an error.
pub async fn course_recommendations(state: &AppState, user_id: &ObjectId) -> Result<Value, AppError> {
    let model = state.model()?;
    let report = stored_report(state, user_id).await?;

    log::info!("📚 Course recommendations for user {}", user_id);
    let reply = model.generate(&[course_prompt(&report)]).await?;

    match text::extract_json_object(&reply) {
        Some(Ok(value)) => Ok(value),
        Some(Err(e)) => Err(AppError::Generative(format!(
            "course recommendations are not valid JSON: {}",
            e
        ))),
        None => Ok(Value::Object(Default::default())),
    }
}

pub async fn portfolio_builder(state: &AppState, user_id: &ObjectId) -> Result<Value, AppError> {
    let report = stored_report(state, user_id).await?;

    log::info!("🗂️  Portfolio guide for user {}", user_id);
    run_with_report_file(
        state,
        &state.config.scripts.portfolio_builder,
        Vec::new(),
        "portfolio_",
        &report,
    )
    .await
}
