use axum::{extract::State, http::StatusCode, response::IntoResponse, Extension, Json};
use common::storage::types::user::User;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::{api_state::ApiState, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct SignupParams {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginParams {
    pub email: String,
    pub password: String,
}

pub async fn signup(
    State(state): State<ApiState>,
    Json(params): Json<SignupParams>,
) -> Result<impl IntoResponse, ApiError> {
    let user = User::create_new(params.name, params.email, params.password, &state.db).await?;

    info!(user_id = %user.id, "User signed up");

    Ok((StatusCode::CREATED, Json(json!({ "user_id": user.id }))))
}

/// Check credentials and hand out a fresh API key.
pub async fn login(
    State(state): State<ApiState>,
    Json(params): Json<LoginParams>,
) -> Result<impl IntoResponse, ApiError> {
    let user = User::authenticate(&params.email, &params.password, &state.db).await?;
    let api_key = User::set_api_key(&user.id, &state.db).await?;

    info!(user_id = %user.id, "User logged in");

    Ok(Json(json!({
        "api_key": api_key,
        "user_id": user.id,
        "name": user.name,
    })))
}

pub async fn logout(
    State(state): State<ApiState>,
    Extension(user): Extension<User>,
) -> Result<impl IntoResponse, ApiError> {
    User::revoke_api_key(&user.id, &state.db).await?;

    info!(user_id = %user.id, "User logged out");

    Ok(StatusCode::NO_CONTENT)
}
