use std::sync::Arc;

use axum::{
    Json,
    extract::FromRequestParts,
    http::{HeaderValue, StatusCode, header::AUTHORIZATION, header::WWW_AUTHENTICATE, request::Parts},
    response::{IntoResponse, Response},
};
use serde_json::json;

use super::helpers::{TokenValidationError, extract_token_from_header, validate_token};
use crate::server::AppState;
use crate::types::User;

/// Extractor that requires an authenticated, active user
pub struct CurrentUser(pub User);

/// Extractor that requires an active superuser
pub struct RequireSuperuser(pub User);

/// Resolves the caller if credentials are sent; anonymous otherwise.
/// Credentials that are sent but invalid still reject.
pub struct OptionalUser(pub Option<User>);

impl OptionalUser {
    #[must_use]
    pub fn is_superuser(&self) -> bool {
        self.0.as_ref().is_some_and(|user| user.is_superuser)
    }
}

#[derive(Debug)]
pub enum AuthError {
    MissingAuth,
    InvalidScheme,
    InvalidToken,
    TokenExpired,
    InactiveUser,
    NotSuperuser,
    InternalError,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AuthError::MissingAuth => (StatusCode::UNAUTHORIZED, "Not authenticated"),
            AuthError::InvalidScheme => (StatusCode::UNAUTHORIZED, "Invalid authorization scheme"),
            AuthError::InvalidToken => (StatusCode::UNAUTHORIZED, "Could not validate credentials"),
            AuthError::TokenExpired => (StatusCode::UNAUTHORIZED, "Token expired"),
            AuthError::InactiveUser => (StatusCode::BAD_REQUEST, "Inactive user"),
            AuthError::NotSuperuser => (
                StatusCode::BAD_REQUEST,
                "The user doesn't have enough privileges",
            ),
            AuthError::InternalError => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        };

        let body = json!({ "data": null, "error": message });

        let mut response = (status, Json(body)).into_response();

        if status == StatusCode::UNAUTHORIZED {
            response
                .headers_mut()
                .insert(WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }

        response
    }
}

impl FromRequestParts<Arc<AppState>> for CurrentUser {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let user = extract_and_validate_user(parts, state)?.ok_or(AuthError::MissingAuth)?;
        active(user).map(CurrentUser)
    }
}

impl FromRequestParts<Arc<AppState>> for RequireSuperuser {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let CurrentUser(user) = CurrentUser::from_request_parts(parts, state).await?;

        if !user.is_superuser {
            return Err(AuthError::NotSuperuser);
        }

        Ok(RequireSuperuser(user))
    }
}

impl FromRequestParts<Arc<AppState>> for OptionalUser {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        match extract_and_validate_user(parts, state)? {
            Some(user) => active(user).map(|user| OptionalUser(Some(user))),
            None => Ok(OptionalUser(None)),
        }
    }
}

fn active(user: User) -> Result<User, AuthError> {
    if user.is_active {
        Ok(user)
    } else {
        Err(AuthError::InactiveUser)
    }
}

fn extract_and_validate_user(
    parts: &Parts,
    state: &Arc<AppState>,
) -> Result<Option<User>, AuthError> {
    let auth_header = parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let Some(raw_token) = extract_token_from_header(auth_header).map_err(map_validation)? else {
        return Ok(None);
    };

    let validated = validate_token(state, &raw_token).map_err(map_validation)?;

    Ok(Some(validated.user))
}

fn map_validation(e: TokenValidationError) -> AuthError {
    match e {
        TokenValidationError::InvalidScheme => AuthError::InvalidScheme,
        TokenValidationError::InvalidToken => AuthError::InvalidToken,
        TokenValidationError::TokenExpired => AuthError::TokenExpired,
        TokenValidationError::InternalError => AuthError::InternalError,
    }
}
