use api_state::ApiState;
use axum::{
    extract::{DefaultBodyLimit, FromRef},
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use middleware_api_auth::api_auth;
use routes::{
    auth::{login, logout, signup},
    files::serve_file,
    ingest::{create_note, summarise, upload_note},
    liveness::live,
    notes::{delete_note, download_note, get_flashcards, get_note, list_notes, update_note},
    readiness::ready,
};

pub mod api_state;
pub mod error;
mod middleware_api_auth;
mod routes;

/// Router for API functionality, version 1
pub fn api_routes_v1<S>(app_state: &ApiState) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
    ApiState: FromRef<S>,
{
    // Public, unauthenticated endpoints (probes and account entry points)
    let public = Router::new()
        .route("/ready", get(ready))
        .route("/live", get(live))
        .route("/signup", post(signup))
        .route("/login", post(login));

    // Protected API endpoints (require auth)
    let protected = Router::new()
        .route("/notes", get(list_notes).post(create_note))
        .route("/notes/summarise", post(summarise))
        .route(
            "/notes/upload",
            post(upload_note).layer(DefaultBodyLimit::max(
                app_state.config.ingest_max_body_bytes,
            )),
        )
        .route(
            "/notes/{id}",
            get(get_note).patch(update_note).delete(delete_note),
        )
        .route("/notes/{id}/flashcards", get(get_flashcards))
        .route("/notes/{id}/download", get(download_note))
        .route("/logout", post(logout))
        .route_layer(from_fn_with_state(app_state.clone(), api_auth));

    public.merge(protected)
}

/// Public routes serving stored documents at the URLs notes reference.
pub fn file_routes<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
    ApiState: FromRef<S>,
{
    Router::new().route(
        &format!("/{}/{{*location}}", common::storage::store::FILES_ROUTE_PREFIX),
        get(serve_file),
    )
}
