use mongodb::bson::{oid::ObjectId, DateTime as BsonDateTime};
use serde::{Deserialize, Serialize};

use super::rfc3339;

/// Raw text returned by the five-source merge (`studentresults`, unique by user).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentResult {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub user_id: ObjectId,
    #[serde(default)]
    pub raw_response: String,
    pub created_at: BsonDateTime,
    pub updated_at: BsonDateTime,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StudentResultResponse {
    #[serde(rename = "_id")]
    pub id: String,
    pub user_id: String,
    pub raw_response: String,
    pub created_at: String,
    pub updated_at: String,
}

impl From<StudentResult> for StudentResultResponse {
    fn from(result: StudentResult) -> Self {
        StudentResultResponse {
            id: result.id.map(|id| id.to_hex()).unwrap_or_default(),
            user_id: result.user_id.to_hex(),
            created_at: rfc3339(&result.created_at),
            updated_at: rfc3339(&result.updated_at),
            raw_response: result.raw_response,
        }
    }
}
