use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};

use common::storage::types::user::User;
use tracing::debug;

use crate::{api_state::ApiState, error::ApiError};

const API_KEY_HEADER: &str = "X-API-Key";

/// Resolve the caller from an API key and make the [`User`] available as an extension.
pub async fn api_auth(
    State(state): State<ApiState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(api_key) = extract_api_key(&request) else {
        debug!(path = %request.uri().path(), "request without api key");
        return Err(ApiError::Unauthorized("Missing API key".to_string()));
    };

    let user = User::find_by_api_key(&api_key, &state.db)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Invalid API key".to_string()))?;

    request.extensions_mut().insert(user);

    Ok(next.run(request).await)
}

fn extract_api_key(request: &Request) -> Option<String> {
    request
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .or_else(|| {
            request
                .headers()
                .get(AUTHORIZATION)
                .and_then(|v| v.to_str().ok())
                .and_then(|auth| auth.strip_prefix("Bearer ").map(str::trim))
        })
        .filter(|key| !key.is_empty())
        .map(String::from)
}
