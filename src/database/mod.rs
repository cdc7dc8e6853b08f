pub mod profile_store;
#[cfg(test)]
pub mod memory;

pub use profile_store::{MongoProfileStore, ProfileStore};

use mongodb::{Client, Collection, Database};
use std::error::Error;

pub const USERS: &str = "users";
pub const ANALYSES: &str = "analyses";
pub const STUDENT_RESULTS: &str = "studentresults";
pub const INDUSTRY_DEMANDS: &str = "industrydemands";

#[derive(Clone)]
pub struct MongoDB {
    db: Database,
}

impl MongoDB {
    pub async fn new(uri: &str, db_name: Option<&str>) -> Result<Self, Box<dyn Error>> {
        let mut client_options = mongodb::options::ClientOptions::parse(uri).await?;

        client_options.max_pool_size = Some(20);
        client_options.min_pool_size = Some(2);
        client_options.max_idle_time = Some(std::time::Duration::from_secs(300));

        client_options.connect_timeout = Some(std::time::Duration::from_secs(5));
        client_options.server_selection_timeout = Some(std::time::Duration::from_secs(5));

        // Nome explícito, senão o database da URI, senão o padrão
        let db_name = db_name
            .map(str::to_string)
            .or_else(|| client_options.default_database.clone())
            .unwrap_or_else(|| "careergap".to_string());

        let client = Client::with_options(client_options)?;
        let db = client.database(&db_name);

        // Testa a conexão
        db.list_collection_names().await?;
        log::info!("✅ Connected to MongoDB database: {}", db_name);

        let mongodb = Self { db };
        mongodb.ensure_indexes().await?;

        Ok(mongodb)
    }

    /// Creates the indexes the per-user invariants rely on.
    async fn ensure_indexes(&self) -> Result<(), Box<dyn Error>> {
        use mongodb::bson::{doc, Document};
        use mongodb::options::IndexOptions;
        use mongodb::IndexModel;

        log::info!("🔧 Creating database indexes...");

        let unique = || IndexOptions::builder().unique(true).build();

        let indexes: Vec<(&str, IndexModel, &str)> = vec![
            (
                USERS,
                IndexModel::builder().keys(doc! { "email": 1 }).options(unique()).build(),
                "users(email) unique",
            ),
            (
                ANALYSES,
                IndexModel::builder().keys(doc! { "userId": 1 }).options(unique()).build(),
                "analyses(userId) unique",
            ),
            (
                STUDENT_RESULTS,
                IndexModel::builder().keys(doc! { "userId": 1 }).options(unique()).build(),
                "studentresults(userId) unique",
            ),
            (
                INDUSTRY_DEMANDS,
                IndexModel::builder()
                    .keys(doc! { "userId": 1, "location": 1, "createdAt": -1 })
                    .build(),
                "industrydemands(userId, location, createdAt desc)",
            ),
        ];

        for (collection, index, label) in indexes {
            match self.collection::<Document>(collection).create_index(index).await {
                Ok(_) => log::info!("   ✅ Index ready: {}", label),
                Err(e) => {
                    // Índices únicos garantem um documento por usuário
                    log::error!("   ❌ Failed to create index {}: {}", label, e);
                    return Err(Box::new(e));
                }
            }
        }

        log::info!("✅ Database indexes ready");

        Ok(())
    }

    pub fn collection<T: Send + Sync>(&self, name: &str) -> Collection<T> {
        self.db.collection(name)
    }

    pub async fn health_check(&self) -> Result<bool, mongodb::error::Error> {
        self.db.run_command(mongodb::bson::doc! { "ping": 1 }).await?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    #[ignore] // Requires MongoDB to be running
    async fn test_mongodb_connection() {
        dotenv::dotenv().ok();
        let uri = std::env::var("MONGODB_URI").unwrap_or_else(|_| "mongodb://localhost:27017".into());

        let db = MongoDB::new(&uri, Some("careergap_test")).await;
        assert!(db.is_ok());
        assert!(db.unwrap().health_check().await.unwrap());
    }
}
