use std::collections::BTreeMap;
use std::fmt;

use mongodb::bson::{oid::ObjectId, DateTime as BsonDateTime};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::rfc3339;

/// One result slot of the per-user analysis document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AnalysisField {
    Resume,
    Transcript,
    Certificate,
    Github,
    Personality,
}

impl AnalysisField {
    /// Field name in the stored document.
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisField::Resume => "resumeResult",
            AnalysisField::Transcript => "transcriptResult",
            AnalysisField::Certificate => "certificateResult",
            AnalysisField::Github => "githubResult",
            AnalysisField::Personality => "personalityResult",
        }
    }
}

impl fmt::Display for AnalysisField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fields to `$set` in a single atomic upsert.
pub type AnalysisUpdate = BTreeMap<AnalysisField, Value>;

/// Per-user aggregate of script results (`analyses` collection, unique by user).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Analysis {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub user_id: ObjectId,
    #[serde(default)]
    pub resume_result: Option<Value>,
    #[serde(default)]
    pub transcript_result: Option<Value>,
    #[serde(default)]
    pub certificate_result: Option<Value>,
    #[serde(default)]
    pub github_result: Option<Value>,
    #[serde(default)]
    pub personality_result: Option<Value>,
    pub created_at: BsonDateTime,
    pub updated_at: BsonDateTime,
}

impl Analysis {
    pub fn empty(user_id: ObjectId) -> Self {
        let now = BsonDateTime::now();
        Self {
            id: Some(ObjectId::new()),
            user_id,
            resume_result: None,
            transcript_result: None,
            certificate_result: None,
            github_result: None,
            personality_result: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn get(&self, field: AnalysisField) -> Option<&Value> {
        match field {
            AnalysisField::Resume => self.resume_result.as_ref(),
            AnalysisField::Transcript => self.transcript_result.as_ref(),
            AnalysisField::Certificate => self.certificate_result.as_ref(),
            AnalysisField::Github => self.github_result.as_ref(),
            AnalysisField::Personality => self.personality_result.as_ref(),
        }
    }

    pub fn set(&mut self, field: AnalysisField, value: Value) {
        let slot = match field {
            AnalysisField::Resume => &mut self.resume_result,
            AnalysisField::Transcript => &mut self.transcript_result,
            AnalysisField::Certificate => &mut self.certificate_result,
            AnalysisField::Github => &mut self.github_result,
            AnalysisField::Personality => &mut self.personality_result,
        };
        *slot = Some(value);
    }

    /// The five sources in the shape sent to the profile merge prompt.
    pub fn combined_input(&self) -> Value {
        serde_json::json!({
            "resume": self.resume_result,
            "transcript": self.transcript_result,
            "certificate": self.certificate_result,
            "github": self.github_result,
            "personality": self.personality_result,
        })
    }
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResponse {
    #[serde(rename = "_id")]
    pub id: String,
    pub user_id: String,
    #[schema(value_type = Option<Object>)]
    pub resume_result: Option<Value>,
    #[schema(value_type = Option<Object>)]
    pub transcript_result: Option<Value>,
    #[schema(value_type = Option<Object>)]
    pub certificate_result: Option<Value>,
    #[schema(value_type = Option<Object>)]
    pub github_result: Option<Value>,
    #[schema(value_type = Option<Object>)]
    pub personality_result: Option<Value>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Analysis> for AnalysisResponse {
    fn from(analysis: Analysis) -> Self {
        AnalysisResponse {
            id: analysis.id.map(|id| id.to_hex()).unwrap_or_default(),
            user_id: analysis.user_id.to_hex(),
            created_at: rfc3339(&analysis.created_at),
            updated_at: rfc3339(&analysis.updated_at),
            resume_result: analysis.resume_result,
            transcript_result: analysis.transcript_result,
            certificate_result: analysis.certificate_result,
            github_result: analysis.github_result,
            personality_result: analysis.personality_result,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_set_only_touches_named_field() {
        let mut analysis = Analysis::empty(ObjectId::new());
        analysis.set(AnalysisField::Github, json!({"analysis": "active"}));

        assert_eq!(analysis.get(AnalysisField::Github), Some(&json!({"analysis": "active"})));
        assert!(analysis.get(AnalysisField::Resume).is_none());
    }

    #[test]
    fn test_stored_field_names() {
        let analysis = Analysis::empty(ObjectId::new());
        let doc = mongodb::bson::to_document(&analysis).unwrap();
        for field in [
            AnalysisField::Resume,
            AnalysisField::Transcript,
            AnalysisField::Certificate,
            AnalysisField::Github,
            AnalysisField::Personality,
        ] {
            assert!(doc.contains_key(field.as_str()), "missing {}", field);
        }
        assert!(doc.contains_key("userId"));
    }
}
