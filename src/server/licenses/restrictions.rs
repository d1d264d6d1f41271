use std::sync::Arc;

use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    extract::{Path, Query, State},
    response::IntoResponse,
};

use crate::auth::{OptionalUser, RequireSuperuser};
use crate::error::Error;
use crate::server::AppState;
use crate::server::dto::RestrictionListParams;
use crate::server::response::{ApiError, ApiResponse, StoreOptionExt, StoreResultExt};
use crate::store::{Filter, Page, Store};
use crate::types::{NewRestriction, RestrictionPatch};

fn check_references(
    store: &dyn Store,
    domain_id: Option<i64>,
    source_id: Option<i64>,
) -> Result<(), ApiError> {
    if let Some(id) = domain_id {
        store
            .domains()
            .get(&id)
            .api_err("Failed to get domain")?
            .or_not_found("License Domain not found")?;
    }
    if let Some(id) = source_id {
        store
            .sources()
            .get(&id)
            .api_err("Failed to get source")?
            .or_not_found("License Source not found")?;
    }
    Ok(())
}

fn validate_text(text: &str) -> Result<(), ApiError> {
    if text.trim().is_empty() {
        return Err(ApiError::unprocessable("Restriction text cannot be empty"));
    }
    Ok(())
}

pub async fn list_restrictions(
    caller: OptionalUser,
    State(state): State<Arc<AppState>>,
    params: Result<Query<RestrictionListParams>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Query(params) = params?;

    let filter = Filter::new()
        .eq_opt("domain_id", params.domain_id)
        .eq_opt("source_id", params.source_id);
    let filter = if caller.is_superuser() {
        filter.eq_opt("approved", params.approved)
    } else {
        filter.eq("approved", true)
    };

    let restrictions = state
        .store
        .restrictions()
        .get_multi(Page::new(params.skip, params.limit), &filter)
        .api_err("Failed to list restrictions")?;

    Ok(Json(ApiResponse::success(restrictions)))
}

pub async fn get_restriction(
    caller: OptionalUser,
    State(state): State<Arc<AppState>>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Path(id) = id?;
    let restriction = state
        .store
        .restrictions()
        .get(&id)
        .api_err("Failed to get restriction")?
        .filter(|r| r.approved || caller.is_superuser())
        .or_not_found("License Restriction not found")?;

    Ok(Json(ApiResponse::success(restriction)))
}

pub async fn create_restriction(
    _admin: RequireSuperuser,
    State(state): State<Arc<AppState>>,
    payload: Result<Json<NewRestriction>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(input) = payload?;
    validate_text(&input.text)?;
    check_references(state.store.as_ref(), Some(input.domain_id), Some(input.source_id))?;

    let restriction = state
        .store
        .restrictions()
        .create(&input)
        .api_err("Failed to create restriction")?;

    tracing::info!(id = restriction.id, approved = restriction.approved, "Created restriction");

    Ok(Json(ApiResponse::success(restriction)))
}

pub async fn update_restriction(
    _admin: RequireSuperuser,
    State(state): State<Arc<AppState>>,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<RestrictionPatch>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Path(id) = id?;
    let Json(patch) = payload?;
    if let Some(text) = &patch.text {
        validate_text(text)?;
    }
    check_references(state.store.as_ref(), patch.domain_id, patch.source_id)?;

    let restriction = state
        .store
        .restrictions()
        .update(&id, &patch)
        .api_err("Failed to update restriction")?
        .or_not_found("License Restriction not found")?;

    Ok(Json(ApiResponse::success(restriction)))
}

pub async fn delete_restriction(
    _admin: RequireSuperuser,
    State(state): State<Arc<AppState>>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Path(id) = id?;
    let restriction = state
        .store
        .restrictions()
        .remove(&id)
        .map_err(|e| match e {
            Error::ForeignKey => {
                ApiError::conflict("The restriction is used by one or more licenses")
            }
            other => ApiError::from(other),
        })?
        .or_not_found("License Restriction not found")?;

    tracing::info!(id, "Deleted restriction");

    Ok(Json(ApiResponse::success(restriction)))
}
