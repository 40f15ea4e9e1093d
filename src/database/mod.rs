use crate::utils::AppError;
use mongodb::{Client, Collection, Database};

pub const ENFORCEMENT_EVENTS: &str = "enforcement_events";
pub const CAMPAIGN_STATES: &str = "campaign_states";

#[derive(Clone)]
pub struct MongoDB {
    db: Database,
}

impl MongoDB {
    pub async fn new(uri: &str) -> Result<Self, AppError> {
        let mut client_options = mongodb::options::ClientOptions::parse(uri).await?;

        client_options.max_pool_size = Some(10);
        client_options.min_pool_size = Some(1);
        client_options.max_idle_time = Some(std::time::Duration::from_secs(300));
        client_options.connect_timeout = Some(std::time::Duration::from_secs(5));
        client_options.server_selection_timeout = Some(std::time::Duration::from_secs(5));

        let client = Client::with_options(client_options)?;

        // Extract database name from URI or use default
        let db_name = uri
            .rsplit('/')
            .next()
            .and_then(|s| s.split('?').next())
            .filter(|s| !s.is_empty() && !s.contains(':'))
            .unwrap_or("ozobid");

        let db = client.database(db_name);

        // Test connection
        db.list_collection_names().await?;

        let mongodb = Self { db };
        mongodb.ensure_indexes().await?;

        Ok(mongodb)
    }

    /// Unique (campaign_id, date, action) is what makes enforcement side effects once-per-day
    async fn ensure_indexes(&self) -> Result<(), AppError> {
        use mongodb::bson::doc;
        use mongodb::options::IndexOptions;
        use mongodb::IndexModel;

        log::info!("🔧 Creating database indexes...");

        let events = self.collection::<mongodb::bson::Document>(ENFORCEMENT_EVENTS);
        let dedup_index = IndexModel::builder()
            .keys(doc! { "campaign_id": 1, "date": 1, "action": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();
        events.create_index(dedup_index).await?;
        log::info!("   ✅ Index ready: enforcement_events(campaign_id, date, action) unique");

        let user_index = IndexModel::builder()
            .keys(doc! { "user_id": 1, "date": -1 })
            .build();
        match events.create_index(user_index).await {
            Ok(_) => log::info!("   ✅ Index ready: enforcement_events(user_id, date)"),
            Err(e) => log::debug!("   ℹ️  Index already exists: {}", e),
        }

        let states = self.collection::<mongodb::bson::Document>(CAMPAIGN_STATES);
        let state_index = IndexModel::builder()
            .keys(doc! { "user_id": 1, "campaign_id": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();
        states.create_index(state_index).await?;
        log::info!("   ✅ Index ready: campaign_states(user_id, campaign_id) unique");

        Ok(())
    }

    pub fn collection<T: Send + Sync>(&self, name: &str) -> Collection<T> {
        self.db.collection(name)
    }

    pub async fn health_check(&self) -> Result<bool, AppError> {
        self.db.list_collection_names().await?;
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
        let uri = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "mongodb://localhost:27017/ozobid_test".to_string());

        let db = MongoDB::new(&uri).await;
        assert!(db.is_ok());
        assert!(db.unwrap().health_check().await.unwrap());
    }
}
