use mongodb::bson::{oid::ObjectId, DateTime as BsonDateTime};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::rfc3339;

/// One market-data snapshot; many per (user, location), newest wins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndustryDemand {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    #[serde(rename = "userId")]
    pub user_id: ObjectId,
    pub location: String,
    #[serde(default = "empty_object")]
    pub job_demand_data: Value,
    #[serde(default = "empty_object")]
    pub salary_data: Value,
    #[serde(default = "empty_object")]
    pub skills_data: Value,
    #[serde(default = "empty_object")]
    pub summary: Value,
    #[serde(rename = "createdAt")]
    pub created_at: BsonDateTime,
    #[serde(rename = "updatedAt")]
    pub updated_at: BsonDateTime,
}

fn empty_object() -> Value {
    Value::Object(Default::default())
}

impl IndustryDemand {
    /// Builds a snapshot from `jobDemand.py` output; missing sections become `{}`.
    pub fn from_script_output(user_id: ObjectId, location: String, output: &Value) -> Self {
        let section = |key: &str| output.get(key).cloned().unwrap_or_else(empty_object);
        let now = BsonDateTime::now();
        Self {
            id: None,
            user_id,
            location,
            job_demand_data: section("job_demand_data"),
            salary_data: section("salary_data"),
            skills_data: section("skills_data"),
            summary: section("summary"),
            created_at: now,
            updated_at: now,
        }
    }

    /// Input shape expected by `CareerRole.py`.
    pub fn job_analysis(&self) -> Value {
        serde_json::json!({
            "job_demand_data": self.job_demand_data,
            "salary_data": self.salary_data,
            "skills_data": self.skills_data,
            "summary": self.summary,
            "location": self.location,
        })
    }
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct IndustryDemandResponse {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "userId")]
    pub user_id: String,
    pub location: String,
    #[schema(value_type = Object)]
    pub job_demand_data: Value,
    #[schema(value_type = Object)]
    pub salary_data: Value,
    #[schema(value_type = Object)]
    pub skills_data: Value,
    #[schema(value_type = Object)]
    pub summary: Value,
    #[serde(rename = "createdAt")]
    pub created_at: String,
    #[serde(rename = "updatedAt")]
    pub updated_at: String,
}

impl From<IndustryDemand> for IndustryDemandResponse {
    fn from(doc: IndustryDemand) -> Self {
        IndustryDemandResponse {
            id: doc.id.map(|id| id.to_hex()).unwrap_or_default(),
            user_id: doc.user_id.to_hex(),
            created_at: rfc3339(&doc.created_at),
            updated_at: rfc3339(&doc.updated_at),
            location: doc.location,
            job_demand_data: doc.job_demand_data,
            salary_data: doc.salary_data,
            skills_data: doc.skills_data,
            summary: doc.summary,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_missing_sections_default_to_empty_objects() {
        let output = json!({"job_demand_data": {"rust": 120}});
        let doc = IndustryDemand::from_script_output(ObjectId::new(), "Pune".into(), &output);

        assert_eq!(doc.job_demand_data, json!({"rust": 120}));
        assert_eq!(doc.salary_data, json!({}));
        assert_eq!(doc.summary, json!({}));
    }

    #[test]
    fn test_job_analysis_includes_location() {
        let doc = IndustryDemand::from_script_output(ObjectId::new(), "India".into(), &json!({}));
        assert_eq!(doc.job_analysis()["location"], "India");
    }
}
