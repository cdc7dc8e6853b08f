//! In-memory `ProfileStore` for route tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use mongodb::bson::{oid::ObjectId, DateTime as BsonDateTime};

use super::ProfileStore;
use crate::models::{Analysis, AnalysisUpdate, IndustryDemand, StudentResult, User};
use crate::utils::AppError;

#[derive(Default)]
struct Collections {
    users: Vec<User>,
    analyses: HashMap<ObjectId, Analysis>,
    student_results: HashMap<ObjectId, StudentResult>,
    industry_demands: Vec<IndustryDemand>,
}

#[derive(Default)]
pub struct MemoryProfileStore {
    inner: Mutex<Collections>,
}

impl MemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn analysis_count(&self) -> usize {
        self.inner.lock().unwrap().analyses.len()
    }

    pub fn student_result_count(&self) -> usize {
        self.inner.lock().unwrap().student_results.len()
    }

    pub fn industry_demand_count(&self) -> usize {
        self.inner.lock().unwrap().industry_demands.len()
    }
}

#[async_trait]
impl ProfileStore for MemoryProfileStore {
    async fn ping(&self) -> Result<(), AppError> {
        Ok(())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.users.iter().find(|u| u.email == email).cloned())
    }

    async fn find_user_by_id(&self, user_id: &ObjectId) -> Result<Option<User>, AppError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.users.iter().find(|u| u.id.as_ref() == Some(user_id)).cloned())
    }

    async fn insert_user(&self, mut user: User) -> Result<User, AppError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.users.iter().any(|u| u.email == user.email) {
            return Err(AppError::Validation("Email already exists".into()));
        }
        user.id = Some(ObjectId::new());
        inner.users.push(user.clone());
        Ok(user)
    }

    async fn upsert_analysis(
        &self,
        user_id: &ObjectId,
        fields: AnalysisUpdate,
    ) -> Result<Analysis, AppError> {
        let mut inner = self.inner.lock().unwrap();
        let analysis = inner
            .analyses
            .entry(*user_id)
            .or_insert_with(|| Analysis::empty(*user_id));
        for (field, value) in fields {
            analysis.set(field, value);
        }
        analysis.updated_at = BsonDateTime::now();
        Ok(analysis.clone())
    }

    async fn find_analysis(&self, user_id: &ObjectId) -> Result<Option<Analysis>, AppError> {
        Ok(self.inner.lock().unwrap().analyses.get(user_id).cloned())
    }

    async fn upsert_student_result(
        &self,
        user_id: &ObjectId,
        raw_response: &str,
    ) -> Result<StudentResult, AppError> {
        let mut inner = self.inner.lock().unwrap();
        let now = BsonDateTime::now();
        let result = inner
            .student_results
            .entry(*user_id)
            .or_insert_with(|| StudentResult {
                id: Some(ObjectId::new()),
                user_id: *user_id,
                raw_response: String::new(),
                created_at: now,
                updated_at: now,
            });
        result.raw_response = raw_response.to_string();
        result.updated_at = now;
        Ok(result.clone())
    }

    async fn find_student_result(
        &self,
        user_id: &ObjectId,
    ) -> Result<Option<StudentResult>, AppError> {
        Ok(self.inner.lock().unwrap().student_results.get(user_id).cloned())
    }

    async fn insert_industry_demand(
        &self,
        mut snapshot: IndustryDemand,
    ) -> Result<IndustryDemand, AppError> {
        snapshot.id = Some(ObjectId::new());
        self.inner.lock().unwrap().industry_demands.push(snapshot.clone());
        Ok(snapshot)
    }

    async fn latest_industry_demand(
        &self,
        user_id: &ObjectId,
        location: &str,
    ) -> Result<Option<IndustryDemand>, AppError> {
        let inner = self.inner.lock().unwrap();
        // Em empate no timestamp (ms), vence o último inserido
        Ok(inner
            .industry_demands
            .iter()
            .enumerate()
            .filter(|(_, d)| &d.user_id == user_id && d.location == location)
            .max_by_key(|(i, d)| (d.created_at.timestamp_millis(), *i))
            .map(|(_, d)| d.clone()))
    }
}
