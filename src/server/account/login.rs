use std::sync::Arc;

use axum::{Json, extract::State, extract::rejection::JsonRejection, response::IntoResponse};

use crate::auth::helpers::{authenticate, issue_token};
use crate::server::AppState;
use crate::server::dto::{AccessTokenResponse, LoginRequest};
use crate::server::response::{ApiError, ApiResponse, StoreResultExt};

pub async fn login_access_token(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload?;

    let user = authenticate(&state, &req.email, &req.password)
        .api_err("Failed to check credentials")?
        .ok_or_else(|| ApiError::unauthorized("Incorrect email or password"))?;

    if !user.is_active {
        return Err(ApiError::bad_request("Inactive user"));
    }

    let (raw_token, token) = issue_token(&state, &user).api_err("Failed to issue token")?;

    tracing::info!(user_id = user.id, "Issued access token");

    Ok(Json(ApiResponse::success(AccessTokenResponse {
        access_token: raw_token,
        token_type: "bearer",
        expires_at: token.expires_at,
    })))
}
