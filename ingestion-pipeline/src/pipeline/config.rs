use common::utils::config::{AppConfig, FailurePolicy};

#[derive(Debug, Clone)]
pub struct IngestionTuning {
    pub chunk_max_chars: usize,
    pub chunk_concurrency: usize,
    pub commit_attempts: usize,
    pub commit_backoff_base_ms: u64,
    pub commit_max_backoff_ms: u64,
}

impl Default for IngestionTuning {
    fn default() -> Self {
        Self {
            chunk_max_chars: 40_000,
            chunk_concurrency: 1,
            commit_attempts: 3,
            commit_backoff_base_ms: 50,
            commit_max_backoff_ms: 800,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct IngestionConfig {
    pub tuning: IngestionTuning,
    pub failure_policy: FailurePolicy,
}

impl IngestionConfig {
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            tuning: IngestionTuning {
                chunk_max_chars: config.chunk_max_chars,
                chunk_concurrency: config.chunk_concurrency.max(1),
                ..IngestionTuning::default()
            },
            failure_policy: config.failure_policy,
        }
    }
}
