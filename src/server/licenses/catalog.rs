use std::sync::Arc;

use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    extract::{Path, Query, State},
};
use serde::Serialize;

use crate::auth::RequireSuperuser;
use crate::error::Error;
use crate::server::AppState;
use crate::server::dto::PageParams;
use crate::server::response::{ApiError, ApiResponse, StoreResultExt};
use crate::server::validation::validate_catalog_name;
use crate::store::{Entity, Filter, Repository, Store};
use crate::types::{LicenseDomain, LicenseSource, NamePatch, NewName};

pub trait CatalogEntity:
    Entity<Id = i64, Create = NewName, Update = NamePatch> + Serialize + 'static
{
    fn repository(store: &dyn Store) -> &dyn Repository<Self>;
}

impl CatalogEntity for LicenseDomain {
    fn repository(store: &dyn Store) -> &dyn Repository<Self> {
        store.domains()
    }
}

impl CatalogEntity for LicenseSource {
    fn repository(store: &dyn Store) -> &dyn Repository<Self> {
        store.sources()
    }
}

fn not_found<E: Entity>() -> ApiError {
    ApiError::not_found(format!("{} not found", E::NAME))
}

fn map_write<E: Entity>(err: Error) -> ApiError {
    match err {
        Error::AlreadyExists => {
            ApiError::conflict(format!("A {} with this name already exists", E::NAME))
        }
        Error::ForeignKey => ApiError::conflict(format!(
            "The {} is still referenced by restrictions or licenses",
            E::NAME
        )),
        other => ApiError::from(other),
    }
}

pub async fn list<E: CatalogEntity>(
    State(state): State<Arc<AppState>>,
    params: Result<Query<PageParams>, QueryRejection>,
) -> Result<Json<ApiResponse<Vec<E>>>, ApiError> {
    let Query(params) = params?;

    let rows = E::repository(state.store.as_ref())
        .get_multi(params.page(), &Filter::new())
        .api_err("Failed to list catalog entries")?;

    Ok(Json(ApiResponse::success(rows)))
}

pub async fn get<E: CatalogEntity>(
    State(state): State<Arc<AppState>>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<ApiResponse<E>>, ApiError> {
    let Path(id) = id?;
    let row = E::repository(state.store.as_ref())
        .get(&id)
        .api_err("Failed to get catalog entry")?
        .ok_or_else(not_found::<E>)?;

    Ok(Json(ApiResponse::success(row)))
}

pub async fn create<E: CatalogEntity>(
    _admin: RequireSuperuser,
    State(state): State<Arc<AppState>>,
    payload: Result<Json<NewName>, JsonRejection>,
) -> Result<Json<ApiResponse<E>>, ApiError> {
    let Json(input) = payload?;
    validate_catalog_name(&input.name, E::NAME)?;

    let row = E::repository(state.store.as_ref())
        .create(&input)
        .map_err(map_write::<E>)?;

    tracing::info!("Created {} '{}'", E::NAME, input.name);

    Ok(Json(ApiResponse::success(row)))
}

pub async fn update<E: CatalogEntity>(
    _admin: RequireSuperuser,
    State(state): State<Arc<AppState>>,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<NamePatch>, JsonRejection>,
) -> Result<Json<ApiResponse<E>>, ApiError> {
    let Path(id) = id?;
    let Json(patch) = payload?;
    if let Some(name) = &patch.name {
        validate_catalog_name(name, E::NAME)?;
    }

    let row = E::repository(state.store.as_ref())
        .update(&id, &patch)
        .map_err(map_write::<E>)?
        .ok_or_else(not_found::<E>)?;

    Ok(Json(ApiResponse::success(row)))
}

pub async fn remove<E: CatalogEntity>(
    _admin: RequireSuperuser,
    State(state): State<Arc<AppState>>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<ApiResponse<E>>, ApiError> {
    let Path(id) = id?;
    let row = E::repository(state.store.as_ref())
        .remove(&id)
        .map_err(map_write::<E>)?
        .ok_or_else(not_found::<E>)?;

    tracing::info!("Deleted {} {id}", E::NAME);

    Ok(Json(ApiResponse::success(row)))
}
