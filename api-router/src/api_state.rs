use std::sync::Arc;

use common::{
    storage::{db::SurrealDbClient, store::StorageManager},
    utils::{config::AppConfig, llm::CompletionClient},
};
use ingestion_pipeline::IngestionPipeline;

#[derive(Clone)]
pub struct ApiState {
    pub db: Arc<SurrealDbClient>,
    pub config: AppConfig,
    pub storage: StorageManager,
    pub pipeline: Arc<IngestionPipeline>,
}

impl ApiState {
    pub async fn new(
        config: &AppConfig,
        storage: StorageManager,
        completion_client: Arc<dyn CompletionClient>,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let surreal_db_client = Arc::new(
            SurrealDbClient::new(
                &config.surrealdb_address,
                &config.surrealdb_username,
                &config.surrealdb_password,
                &config.surrealdb_namespace,
                &config.surrealdb_database,
            )
            .await?,
        );

        surreal_db_client.ensure_initialized().await?;

        Ok(Self::from_parts(
            surreal_db_client,
            config.clone(),
            storage,
            completion_client,
        ))
    }

    /// Assemble state around an already connected database.
    pub fn from_parts(
        db: Arc<SurrealDbClient>,
        config: AppConfig,
        storage: StorageManager,
        completion_client: Arc<dyn CompletionClient>,
    ) -> Self {
        let pipeline = Arc::new(IngestionPipeline::new(
            Arc::clone(&db),
            completion_client,
            &config,
        ));

        Self {
            db,
            config,
            storage,
            pipeline,
        }
    }
}
