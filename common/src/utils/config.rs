use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Clone, Deserialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    Local,
    Memory,
}

/// What the ingestion pipeline does with a note when a completion call fails mid-way.
#[derive(Clone, Copy, Deserialize, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Leave the note without enrichment and mark it failed.
    #[default]
    Abort,
    /// Commit what was accumulated before the failing chunk and mark the note partial.
    CommitPartial,
}

fn default_storage_kind() -> StorageKind {
    StorageKind::Local
}

#[derive(Clone, Deserialize, Debug)]
pub struct AppConfig {
    pub openai_api_key: String,
    pub surrealdb_address: String,
    pub surrealdb_username: String,
    pub surrealdb_password: String,
    pub surrealdb_namespace: String,
    pub surrealdb_database: String,
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    pub http_port: u16,
    #[serde(default = "default_base_url")]
    pub openai_base_url: String,
    #[serde(default = "default_processing_model")]
    pub processing_model: String,
    #[serde(default = "default_public_base_url")]
    pub public_base_url: String,
    #[serde(default = "default_storage_kind")]
    pub storage: StorageKind,
    #[serde(default = "default_ingest_max_body_bytes")]
    pub ingest_max_body_bytes: usize,
    #[serde(default = "default_chunk_max_chars")]
    pub chunk_max_chars: usize,
    #[serde(default = "default_chunk_concurrency")]
    pub chunk_concurrency: usize,
    #[serde(default = "default_llm_timeout_secs")]
    pub llm_timeout_secs: u64,
    #[serde(default)]
    pub failure_policy: FailurePolicy,
}

fn default_data_dir() -> String {
    "./data".to_string()
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_processing_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_public_base_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_ingest_max_body_bytes() -> usize {
    10 * 1024 * 1024
}

// Keeps a chunk comfortably below the processing model's context window.
fn default_chunk_max_chars() -> usize {
    40_000
}

fn default_chunk_concurrency() -> usize {
    1
}

fn default_llm_timeout_secs() -> u64 {
    120
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            openai_api_key: String::new(),
            surrealdb_address: String::new(),
            surrealdb_username: String::new(),
            surrealdb_password: String::new(),
            surrealdb_namespace: String::new(),
            surrealdb_database: String::new(),
            data_dir: default_data_dir(),
            http_port: 0,
            openai_base_url: default_base_url(),
            processing_model: default_processing_model(),
            public_base_url: default_public_base_url(),
            storage: default_storage_kind(),
            ingest_max_body_bytes: default_ingest_max_body_bytes(),
            chunk_max_chars: default_chunk_max_chars(),
            chunk_concurrency: default_chunk_concurrency(),
            llm_timeout_secs: default_llm_timeout_secs(),
            failure_policy: FailurePolicy::default(),
        }
    }
}

pub fn get_config() -> Result<AppConfig, ConfigError> {
    let config = Config::builder()
        .add_source(File::with_name("config").required(false))
        .add_source(Environment::default())
        .build()?;

    config.try_deserialize()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_optional_fields() {
        let config: AppConfig = Config::builder()
            .set_override("openai_api_key", "sk-test")
            .and_then(|b| b.set_override("surrealdb_address", "mem://"))
            .and_then(|b| b.set_override("surrealdb_username", "root"))
            .and_then(|b| b.set_override("surrealdb_password", "root"))
            .and_then(|b| b.set_override("surrealdb_namespace", "ns"))
            .and_then(|b| b.set_override("surrealdb_database", "db"))
            .and_then(|b| b.set_override("http_port", 3000))
            .expect("overrides")
            .build()
            .expect("config builds")
            .try_deserialize()
            .expect("config deserializes");

        assert_eq!(config.chunk_max_chars, 40_000);
        assert_eq!(config.chunk_concurrency, 1);
        assert_eq!(config.processing_model, "gpt-4o-mini");
        assert_eq!(config.storage, StorageKind::Local);
        assert_eq!(config.failure_policy, FailurePolicy::Abort);
        assert_eq!(config.ingest_max_body_bytes, 10 * 1024 * 1024);
    }

    #[test]
    fn failure_policy_reads_snake_case() {
        let config: AppConfig = Config::builder()
            .set_override("openai_api_key", "sk-test")
            .and_then(|b| b.set_override("surrealdb_address", "mem://"))
            .and_then(|b| b.set_override("surrealdb_username", "root"))
            .and_then(|b| b.set_override("surrealdb_password", "root"))
            .and_then(|b| b.set_override("surrealdb_namespace", "ns"))
            .and_then(|b| b.set_override("surrealdb_database", "db"))
            .and_then(|b| b.set_override("http_port", 3000))
            .and_then(|b| b.set_override("failure_policy", "commit_partial"))
            .and_then(|b| b.set_override("storage", "memory"))
            .expect("overrides")
            .build()
            .expect("config builds")
            .try_deserialize()
            .expect("config deserializes");

        assert_eq!(config.failure_policy, FailurePolicy::CommitPartial);
        assert_eq!(config.storage, StorageKind::Memory);
    }
}
