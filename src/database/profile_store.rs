use async_trait::async_trait;
use mongodb::bson::{doc, oid::ObjectId, to_bson, DateTime as BsonDateTime, Document};
use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::options::ReturnDocument;

use super::{MongoDB, ANALYSES, INDUSTRY_DEMANDS, STUDENT_RESULTS, USERS};
use crate::models::{Analysis, AnalysisUpdate, IndustryDemand, StudentResult, User};
use crate::utils::AppError;

/// Persistence used by the route handlers.
///
/// Every per-user write is a single atomic document operation; callers never
/// read-modify-write.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn ping(&self) -> Result<(), AppError>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError>;
    async fn find_user_by_id(&self, user_id: &ObjectId) -> Result<Option<User>, AppError>;
    /// Fails with `Validation("Email already exists")` on a duplicate e-mail.
    async fn insert_user(&self, user: User) -> Result<User, AppError>;

    /// Insert-if-absent, else `$set` only the given fields.
    async fn upsert_analysis(
        &self,
        user_id: &ObjectId,
        fields: AnalysisUpdate,
    ) -> Result<Analysis, AppError>;
    async fn find_analysis(&self, user_id: &ObjectId) -> Result<Option<Analysis>, AppError>;

    async fn upsert_student_result(
        &self,
        user_id: &ObjectId,
        raw_response: &str,
    ) -> Result<StudentResult, AppError>;
    async fn find_student_result(&self, user_id: &ObjectId)
        -> Result<Option<StudentResult>, AppError>;

    async fn insert_industry_demand(&self, snapshot: IndustryDemand)
        -> Result<IndustryDemand, AppError>;
    async fn latest_industry_demand(
        &self,
        user_id: &ObjectId,
        location: &str,
    ) -> Result<Option<IndustryDemand>, AppError>;
}

pub struct MongoProfileStore {
    db: MongoDB,
}

impl MongoProfileStore {
    pub fn new(db: MongoDB) -> Self {
        Self { db }
    }
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    matches!(
        *err.kind,
        ErrorKind::Write(WriteFailure::WriteError(ref write_error)) if write_error.code == 11000
    )
}

#[async_trait]
impl ProfileStore for MongoProfileStore {
    async fn ping(&self) -> Result<(), AppError> {
        self.db.health_check().await?;
        Ok(())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let users = self.db.collection::<User>(USERS);
        Ok(users.find_one(doc! { "email": email }).await?)
    }

    async fn find_user_by_id(&self, user_id: &ObjectId) -> Result<Option<User>, AppError> {
        let users = self.db.collection::<User>(USERS);
        Ok(users.find_one(doc! { "_id": user_id }).await?)
    }

    async fn insert_user(&self, mut user: User) -> Result<User, AppError> {
        let users = self.db.collection::<User>(USERS);
        let id = ObjectId::new();
        user.id = Some(id);

        match users.insert_one(&user).await {
            Ok(_) => Ok(user),
            Err(e) if is_duplicate_key(&e) => Err(AppError::Validation("Email already exists".into())),
            Err(e) => Err(e.into()),
        }
    }

    async fn upsert_analysis(
        &self,
        user_id: &ObjectId,
        fields: AnalysisUpdate,
    ) -> Result<Analysis, AppError> {
        let analyses = self.db.collection::<Analysis>(ANALYSES);
        let now = BsonDateTime::now();

        let mut set = Document::new();
        for (field, value) in fields {
            set.insert(field.as_str(), to_bson(&value)?);
        }
        set.insert("updatedAt", now);

        analyses
            .find_one_and_update(
                doc! { "userId": user_id },
                doc! {
                    "$set": set,
                    "$setOnInsert": { "userId": user_id, "createdAt": now },
                },
            )
            .upsert(true)
            .return_document(ReturnDocument::After)
            .await?
            .ok_or_else(|| AppError::Database("analysis upsert returned no document".into()))
    }

    async fn find_analysis(&self, user_id: &ObjectId) -> Result<Option<Analysis>, AppError> {
        let analyses = self.db.collection::<Analysis>(ANALYSES);
        Ok(analyses.find_one(doc! { "userId": user_id }).await?)
    }

    async fn upsert_student_result(
        &self,
        user_id: &ObjectId,
        raw_response: &str,
    ) -> Result<StudentResult, AppError> {
        let results = self.db.collection::<StudentResult>(STUDENT_RESULTS);
        let now = BsonDateTime::now();

        results
            .find_one_and_update(
                doc! { "userId": user_id },
                doc! {
                    "$set": { "rawResponse": raw_response, "updatedAt": now },
                    "$setOnInsert": { "userId": user_id, "createdAt": now },
                },
            )
            .upsert(true)
            .return_document(ReturnDocument::After)
            .await?
            .ok_or_else(|| AppError::Database("student result upsert returned no document".into()))
    }

    async fn find_student_result(
        &self,
        user_id: &ObjectId,
    ) -> Result<Option<StudentResult>, AppError> {
        let results = self.db.collection::<StudentResult>(STUDENT_RESULTS);
        Ok(results.find_one(doc! { "userId": user_id }).await?)
    }

    async fn insert_industry_demand(
        &self,
        mut snapshot: IndustryDemand,
    ) -> Result<IndustryDemand, AppError> {
        let snapshots = self.db.collection::<IndustryDemand>(INDUSTRY_DEMANDS);
        snapshot.id = Some(ObjectId::new());
        snapshots.insert_one(&snapshot).await?;
        Ok(snapshot)
    }

    async fn latest_industry_demand(
        &self,
        user_id: &ObjectId,
        location: &str,
    ) -> Result<Option<IndustryDemand>, AppError> {
        let snapshots = self.db.collection::<IndustryDemand>(INDUSTRY_DEMANDS);
        Ok(snapshots
            .find_one(doc! { "userId": user_id, "location": location })
            .sort(doc! { "createdAt": -1 })
            .await?)
    }
}
