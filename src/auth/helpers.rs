use std::sync::Arc;

use chrono::Utc;

use super::{PasswordHasher, TokenGenerator, parse_token};
use crate::error::{Error, Result};
use crate::server::AppState;
use crate::types::{Token, User};

const MAX_TOKEN_ATTEMPTS: usize = 3;

#[derive(Debug)]
pub enum TokenValidationError {
    InvalidScheme,
    InvalidToken,
    TokenExpired,
    InternalError,
}

pub struct ValidatedToken {
    pub token: Token,
    pub user: User,
}

/// Validates a raw token string against the store and resolves its owner.
pub fn validate_token(
    state: &Arc<AppState>,
    raw_token: &str,
) -> std::result::Result<ValidatedToken, TokenValidationError> {
    let (lookup, _secret) = parse_token(raw_token).map_err(|_| TokenValidationError::InvalidToken)?;

    let token = state
        .store
        .get_token_by_lookup(&lookup)
        .map_err(|_| TokenValidationError::InternalError)?
        .ok_or(TokenValidationError::InvalidToken)?;

    let generator = TokenGenerator::new();
    if !generator
        .verify(raw_token, &token.token_hash)
        .map_err(|_| TokenValidationError::InternalError)?
    {
        return Err(TokenValidationError::InvalidToken);
    }

    if let Some(expires_at) = &token.expires_at {
        if expires_at < &Utc::now() {
            return Err(TokenValidationError::TokenExpired);
        }
    }

    let user = state
        .store
        .get_user(token.user_id)
        .map_err(|_| TokenValidationError::InternalError)?
        .ok_or(TokenValidationError::InvalidToken)?;

    if let Err(e) = state.store.update_token_last_used(&token.id) {
        tracing::warn!("Failed to update token last_used_at: {e}");
    }

    Ok(ValidatedToken { token, user })
}

/// Extracts a bearer token from the Authorization header.
/// Returns None if no auth header is present.
/// Returns Err if the auth scheme is unsupported.
pub fn extract_token_from_header(
    auth_header: Option<&str>,
) -> std::result::Result<Option<String>, TokenValidationError> {
    match auth_header {
        Some(header) => header
            .strip_prefix("Bearer ")
            .map(|token| Some(token.trim().to_string()))
            .ok_or(TokenValidationError::InvalidScheme),
        None => Ok(None),
    }
}

/// Checks an email/password pair. `None` when either is wrong.
pub fn authenticate(state: &AppState, email: &str, password: &str) -> Result<Option<User>> {
    let Some(user) = state.store.get_user_by_email(email)? else {
        return Ok(None);
    };

    if PasswordHasher::new().verify(password, &user.hashed_password)? {
        Ok(Some(user))
    } else {
        Ok(None)
    }
}

/// Issues a bearer token for the user, returning the raw token once.
pub fn issue_token(state: &AppState, user: &User) -> Result<(String, Token)> {
    let generator = TokenGenerator::new();

    for _ in 0..MAX_TOKEN_ATTEMPTS {
        let (raw_token, lookup, hash) = generator.generate()?;
        let now = Utc::now();
        let token = Token {
            id: uuid::Uuid::new_v4().to_string(),
            token_hash: hash,
            token_lookup: lookup,
            user_id: user.id,
            created_at: now,
            expires_at: Some(now + state.token_lifetime),
            last_used_at: None,
        };

        match state.store.create_token(&token) {
            Ok(()) => return Ok((raw_token, token)),
            Err(Error::TokenLookupCollision) => {
                tracing::debug!("Token lookup collision, regenerating");
            }
            Err(e) => return Err(e),
        }
    }

    Err(Error::TokenLookupCollision)
}
