use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

use crate::api_state::ApiState;

const STORAGE_PROBE_LOCATION: &str = "readiness-probe";

/// Readiness probe: returns 200 if the database and object storage answer, else 503.
pub async fn ready(State(state): State<ApiState>) -> impl IntoResponse {
    let db = state.db.client.query("RETURN true").await.err();
    let storage = state.storage.exists(STORAGE_PROBE_LOCATION).await.err();

    if db.is_none() && storage.is_none() {
        return (
            StatusCode::OK,
            Json(json!({
                "status": "ok",
                "checks": { "db": "ok", "storage": "ok" }
            })),
        );
    }

    let check = |failed: bool| if failed { "fail" } else { "ok" };
    let checks = json!({
        "db": check(db.is_some()),
        "storage": check(storage.is_some()),
    });
    let reason = db
        .map(|e| format!("db: {e}"))
        .into_iter()
        .chain(storage.map(|e| format!("storage: {e}")))
        .collect::<Vec<_>>()
        .join("; ");

    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(json!({
            "status": "error",
            "checks": checks,
            "reason": reason
        })),
    )
}
