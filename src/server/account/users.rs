use std::sync::Arc;

use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    extract::{Path, Query, State},
    response::IntoResponse,
};

use crate::auth::{CurrentUser, PasswordHasher, RequireSuperuser};
use crate::error::Error;
use crate::server::AppState;
use crate::server::dto::{CreateUserRequest, PageParams};
use crate::server::response::{ApiError, ApiResponse, StoreOptionExt, StoreResultExt};
use crate::server::validation::validate_email;
use crate::types::NewUser;

pub async fn read_user_me(CurrentUser(user): CurrentUser) -> impl IntoResponse {
    Json(ApiResponse::success(user))
}

pub async fn list_users(
    _admin: RequireSuperuser,
    State(state): State<Arc<AppState>>,
    params: Result<Query<PageParams>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Query(params) = params?;

    let users = state
        .store
        .list_users(params.page())
        .api_err("Failed to list users")?;

    Ok(Json(ApiResponse::success(users)))
}

pub async fn create_user(
    _admin: RequireSuperuser,
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CreateUserRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload?;

    validate_email(&req.email)?;
    if req.password.is_empty() {
        return Err(ApiError::unprocessable("Password cannot be empty"));
    }

    let hashed_password = PasswordHasher::new()
        .hash(&req.password)
        .api_err("Failed to hash password")?;

    let user = state
        .store
        .create_user(&NewUser {
            email: req.email,
            full_name: req.full_name,
            hashed_password,
            is_active: req.is_active,
            is_superuser: req.is_superuser,
        })
        .map_err(|e| match e {
            Error::AlreadyExists => {
                ApiError::conflict("The user with this email already exists in the system")
            }
            other => ApiError::from(other),
        })?;

    tracing::info!(user_id = user.id, "Created user");

    Ok(Json(ApiResponse::success(user)))
}

/// Users may read themselves; anyone else needs a superuser.
pub async fn read_user_by_id(
    CurrentUser(current): CurrentUser,
    State(state): State<Arc<AppState>>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Path(id) = id?;
    if current.id == id {
        return Ok(Json(ApiResponse::success(current)));
    }

    if !current.is_superuser {
        return Err(ApiError::bad_request(
            "The user doesn't have enough privileges",
        ));
    }

    let user = state
        .store
        .get_user(id)
        .api_err("Failed to get user")?
        .or_not_found("User not found")?;

    Ok(Json(ApiResponse::success(user)))
}
