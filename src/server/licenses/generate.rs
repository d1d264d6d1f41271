use std::sync::Arc;

use axum::{
    body::Body,
    extract::rejection::QueryRejection,
    extract::{Path, Query, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use tokio_util::io::ReaderStream;

use super::licenses::parse_license_id;
use crate::license::{
    Document, LicenseContext, TempFileReader, TemplateError, TemplateVersion, filename, render,
};
use crate::server::AppState;
use crate::server::dto::GenerateParams;
use crate::server::rate_limit::GenerateQuota;
use crate::server::response::{ApiError, StoreOptionExt, StoreResultExt};

impl From<TemplateError> for ApiError {
    fn from(err: TemplateError) -> Self {
        match err {
            TemplateError::HistoryUnavailable
            | TemplateError::RevisionNotFound(_)
            | TemplateError::FileNotFound(_) => ApiError::not_found(err.to_string()),
            other => {
                tracing::error!("{other}");
                ApiError::internal("Failed to load license template")
            }
        }
    }
}

/// Renders a stored license and returns it as a download.
pub async fn generate_license(
    _quota: GenerateQuota,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    params: Result<Query<GenerateParams>, QueryRejection>,
) -> Result<Response, ApiError> {
    let id = parse_license_id(&id)?;
    let Query(params) = params?;

    let license = state
        .store
        .licenses()
        .get(&id)
        .api_err("Failed to get license")?
        .or_not_found("License not found")?;

    let clauses = state
        .store
        .license_clauses(&license.id)
        .api_err("Failed to load license restrictions")?;

    let revision = params
        .git_sha
        .clone()
        .unwrap_or_else(|| license.template_version.clone());
    let templates = state.templates.clone();
    let family = license.family;
    let source = tokio::task::spawn_blocking(move || {
        templates.load(family, TemplateVersion::parse(&revision))
    })
    .await
    .map_err(|e| ApiError::internal(format!("Template task failed: {e}")))??;

    let context = LicenseContext::for_license(&license, clauses);
    let markdown = render(&source, &context).map_err(|e| {
        tracing::error!(license = %license.id, "Failed to render license: {e}");
        ApiError::internal("Failed to render license")
    })?;

    let media_type = params.media_type;
    let download = format!(
        "{}.{}",
        filename::download_stem(&license.name, license.family),
        media_type.extension()
    );
    let disposition = filename::content_disposition(&download)
        .and_then(|bytes| HeaderValue::from_bytes(&bytes).ok())
        .ok_or_else(|| {
            tracing::warn!(license = %license.id, "Could not encode download name '{download}'");
            ApiError::unprocessable(
                "The license name could not be encoded correctly. Please check the license name for special characters and contact the maintainers.",
            )
        })?;

    let document = state
        .converter
        .convert(markdown, media_type)
        .await
        .map_err(|e| {
            tracing::error!(license = %license.id, "Failed to convert license: {e}");
            ApiError::internal("Failed to convert license document")
        })?;

    let body = match document {
        Document::Bytes(bytes) => Body::from(bytes),
        Document::File(path) => {
            let reader = TempFileReader::open(path)
                .await
                .api_err("Failed to open converted document")?;
            Body::from_stream(ReaderStream::new(reader))
        }
    };

    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(media_type.content_type()),
    );
    headers.insert(header::CONTENT_DISPOSITION, disposition);

    Ok((StatusCode::OK, headers, body).into_response())
}
