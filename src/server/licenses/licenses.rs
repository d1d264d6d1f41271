use std::sync::Arc;

use axum::{
    Json,
    extract::rejection::{JsonRejection, QueryRejection},
    extract::{Path, Query, State},
    response::IntoResponse,
};
use chrono::Utc;
use uuid::Uuid;

use crate::auth::RequireSuperuser;
use crate::license::templates::HEAD;
use crate::server::AppState;
use crate::server::dto::{LicenseCreate, PageParams};
use crate::server::rate_limit::CreateLicenseQuota;
use crate::server::response::{ApiError, ApiResponse, StoreOptionExt, StoreResultExt};
use crate::server::validation::{dedupe_ids, validate_artifacts, validate_license_name};
use crate::store::{Filter, Store};
use crate::types::{LicensePatch, NewLicense};

const RESTRICTIONS_NOT_FOUND: &str =
    "One or more restrictions not found. Please check that you have the correct restriction ids.";
const DOMAINS_NOT_FOUND: &str =
    "One or more domains not found. Please check that you have the correct domain ids.";

pub(super) fn parse_license_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::unprocessable("License id must be a UUID"))
}

/// Every id must name a restriction; with `require_approved`, an approved one.
fn check_restrictions(
    store: &dyn Store,
    ids: &[i64],
    require_approved: bool,
) -> Result<(), ApiError> {
    for id in ids {
        let found = store
            .restrictions()
            .get(id)
            .api_err("Failed to get restriction")?
            .is_some_and(|r| r.approved || !require_approved);

        if !found {
            return Err(ApiError::not_found(RESTRICTIONS_NOT_FOUND));
        }
    }
    Ok(())
}

fn check_domains(store: &dyn Store, ids: &[i64]) -> Result<(), ApiError> {
    for id in ids {
        store
            .domains()
            .get(id)
            .api_err("Failed to get domain")?
            .or_not_found(DOMAINS_NOT_FOUND)?;
    }
    Ok(())
}

pub async fn list_licenses(
    _admin: RequireSuperuser,
    State(state): State<Arc<AppState>>,
    params: Result<Query<PageParams>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Query(params) = params?;

    let licenses = state
        .store
        .licenses()
        .get_multi(params.page(), &Filter::new())
        .api_err("Failed to list licenses")?;

    Ok(Json(ApiResponse::success(licenses)))
}

pub async fn create_license(
    _quota: CreateLicenseQuota,
    State(state): State<Arc<AppState>>,
    payload: Result<Json<LicenseCreate>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload?;

    validate_license_name(&req.name)?;
    validate_artifacts(req.application || req.model || req.sourcecode || req.data)?;
    if req.restriction_ids.is_empty() {
        return Err(ApiError::unprocessable(
            "A license needs at least one restriction",
        ));
    }

    let restriction_ids = dedupe_ids(&req.restriction_ids);
    let domain_ids = dedupe_ids(&req.domain_ids);
    check_restrictions(state.store.as_ref(), &restriction_ids, true)?;
    check_domains(state.store.as_ref(), &domain_ids)?;

    let templates = state.templates.clone();
    let resolved = tokio::task::spawn_blocking(move || templates.current_version()).await;
    let template_version = match resolved {
        Ok(Ok(version)) => version,
        Ok(Err(e)) => {
            tracing::warn!("Could not resolve template revision, recording head: {e}");
            HEAD.to_string()
        }
        Err(e) => {
            tracing::warn!("Template revision task failed, recording head: {e}");
            HEAD.to_string()
        }
    };

    let license = state
        .store
        .licenses()
        .create(&NewLicense {
            id: Uuid::new_v4(),
            timestamp: req.timestamp.unwrap_or_else(Utc::now),
            name: req.name,
            family: req.license,
            application: req.application,
            model: req.model,
            sourcecode: req.sourcecode,
            data: req.data,
            template_version,
            restriction_ids,
            domain_ids,
        })
        .api_err("Failed to create license")?;

    tracing::info!(
        id = %license.id,
        family = %license.family,
        restrictions = license.restrictions.len(),
        "Created license"
    );

    Ok(Json(ApiResponse::success(license)))
}

pub async fn get_license(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_license_id(&id)?;

    let license = state
        .store
        .licenses()
        .get(&id)
        .api_err("Failed to get license")?
        .or_not_found("License not found")?;

    Ok(Json(ApiResponse::success(license)))
}

pub async fn update_license(
    _admin: RequireSuperuser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    payload: Result<Json<LicensePatch>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_license_id(&id)?;
    let Json(mut patch) = payload?;

    let existing = state
        .store
        .licenses()
        .get(&id)
        .api_err("Failed to get license")?
        .or_not_found("License not found")?;

    if let Some(name) = &patch.name {
        validate_license_name(name)?;
    }
    validate_artifacts(
        patch.application.unwrap_or(existing.application)
            || patch.model.unwrap_or(existing.model)
            || patch.sourcecode.unwrap_or(existing.sourcecode)
            || patch.data.unwrap_or(existing.data),
    )?;

    if let Some(ids) = patch.restriction_ids.take() {
        if ids.is_empty() {
            return Err(ApiError::unprocessable(
                "A license needs at least one restriction",
            ));
        }
        let ids = dedupe_ids(&ids);
        check_restrictions(state.store.as_ref(), &ids, false)?;
        patch.restriction_ids = Some(ids);
    }
    if let Some(ids) = patch.domain_ids.take() {
        let ids = dedupe_ids(&ids);
        check_domains(state.store.as_ref(), &ids)?;
        patch.domain_ids = Some(ids);
    }

    let license = state
        .store
        .licenses()
        .update(&id, &patch)
        .api_err("Failed to update license")?
        .or_not_found("License not found")?;

    Ok(Json(ApiResponse::success(license)))
}

pub async fn delete_license(
    _admin: RequireSuperuser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_license_id(&id)?;

    let license = state
        .store
        .licenses()
        .remove(&id)
        .api_err("Failed to delete license")?
        .or_not_found("License not found")?;

    tracing::info!(id = %license.id, "Deleted license");

    Ok(Json(ApiResponse::success(license)))
}
