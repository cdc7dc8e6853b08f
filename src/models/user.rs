use mongodb::bson::{oid::ObjectId, DateTime as BsonDateTime};
use serde::{Deserialize, Serialize};

use super::rfc3339;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum AuthMethod {
    #[default]
    Password,
    Google,
}

/// Account stored in the `users` collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub name: String,
    pub email: String,
    /// bcrypt hash; absent for federated accounts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default)]
    pub profile_image: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub google_id: Option<String>,
    #[serde(default)]
    pub auth_method: AuthMethod,
    #[serde(default)]
    pub is_verified: bool,
    pub created_at: BsonDateTime,
}

impl User {
    pub fn with_password(name: String, email: String, password_hash: String) -> Self {
        Self {
            id: None,
            name,
            email,
            password: Some(password_hash),
            profile_image: String::new(),
            google_id: None,
            auth_method: AuthMethod::Password,
            is_verified: false,
            created_at: BsonDateTime::now(),
        }
    }

    pub fn id_hex(&self) -> String {
        self.id.map(|id| id.to_hex()).unwrap_or_default()
    }
}

/// User as returned by the API (never includes the password hash).
#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub email: String,
    pub profile_image: String,
    pub auth_method: AuthMethod,
    pub is_verified: bool,
    pub created_at: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        UserResponse {
            id: user.id_hex(),
            created_at: rfc3339(&user.created_at),
            name: user.name,
            email: user.email,
            profile_image: user.profile_image,
            auth_method: user.auth_method,
            is_verified: user.is_verified,
        }
    }
}
