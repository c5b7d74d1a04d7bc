use std::sync::Arc;

use api_router::{api_routes_v1, api_state::ApiState, file_routes};
use axum::{extract::FromRef, Router};
use common::{
    storage::store::StorageManager,
    utils::{config::get_config, llm::OpenAiCompletionClient},
};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main(flavor = "multi_thread", worker_threads = 2)]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Set up tracing
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env())
        .try_init()
        .ok();

    let config = get_config()?;

    let storage = StorageManager::new(&config).await?;
    info!(backend = ?storage.backend_kind(), "Storage initialized");

    let completion_client = Arc::new(OpenAiCompletionClient::from_config(&config));
    info!(model = %config.processing_model, "Completion client initialized");

    let api_state = ApiState::new(&config, storage, completion_client).await?;

    let app = app(AppState { api_state });

    info!("Starting server listening on 0.0.0.0:{}", config.http_port);
    let serve_address = format!("0.0.0.0:{}", config.http_port);
    let listener = tokio::net::TcpListener::bind(serve_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn app(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1", api_routes_v1(&state.api_state))
        .merge(file_routes())
        .with_state(state)
}

#[derive(Clone, FromRef)]
struct AppState {
    api_state: ApiState,
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request, http::StatusCode};
    use common::storage::db::SurrealDbClient;
    use common::utils::config::{AppConfig, StorageKind};
    use std::path::Path;
    use tower::ServiceExt;
    use uuid::Uuid;

    fn smoke_test_config(namespace: &str, database: &str, data_dir: &Path) -> AppConfig {
        AppConfig {
            openai_api_key: "test-key".into(),
            surrealdb_address: "mem://".into(),
            surrealdb_username: "root".into(),
            surrealdb_password: "root".into(),
            surrealdb_namespace: namespace.into(),
            surrealdb_database: database.into(),
            data_dir: data_dir.to_string_lossy().into_owned(),
            http_port: 0,
            openai_base_url: "https://example.com".into(),
            storage: StorageKind::Local,
            ..Default::default()
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn smoke_startup_with_in_memory_surrealdb() {
        let namespace = "test_ns";
        let database = format!("test_db_{}", Uuid::new_v4());
        let data_dir = std::env::temp_dir().join(format!("studypal_smoke_{}", Uuid::new_v4()));
        tokio::fs::create_dir_all(&data_dir)
            .await
            .expect("failed to create temp data directory");

        let config = smoke_test_config(namespace, &database, &data_dir);
        let db = Arc::new(
            SurrealDbClient::memory(namespace, &database)
                .await
                .expect("failed to start in-memory surrealdb"),
        );
        db.ensure_initialized()
            .await
            .expect("failed to initialize schema");

        let storage = StorageManager::new(&config)
            .await
            .expect("failed to build storage manager");
        let completion_client = Arc::new(OpenAiCompletionClient::from_config(&config));

        let api_state = ApiState::from_parts(db, config, storage, completion_client);
        let app = app(AppState { api_state });

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/api/v1/live")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("router response");
        assert_eq!(response.status(), StatusCode::OK);

        let ready_response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/api/v1/ready")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("ready response");
        assert_eq!(ready_response.status(), StatusCode::OK);

        let protected = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/notes")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("notes response");
        assert_eq!(protected.status(), StatusCode::UNAUTHORIZED);

        tokio::fs::remove_dir_all(&data_dir).await.ok();
    }
}
