pub mod auth;
pub mod files;
pub mod ingest;
pub mod liveness;
pub mod notes;
pub mod readiness;
