use crate::server::response::ApiError;

const MAX_CATALOG_NAME_LEN: usize = 255;
const MAX_LICENSE_NAME_LEN: usize = 255;
const MAX_EMAIL_LEN: usize = 254;

fn validate_name(name: &str, entity: &str, max_len: usize) -> Result<(), String> {
    if name.trim().is_empty() {
        return Err(format!("{entity} name cannot be empty"));
    }
    if name.chars().count() > max_len {
        return Err(format!("{entity} name cannot exceed {max_len} characters"));
    }
    if name.chars().any(char::is_control) {
        return Err(format!("{entity} name cannot contain control characters"));
    }
    Ok(())
}

pub fn validate_catalog_name(name: &str, entity: &str) -> Result<(), ApiError> {
    validate_name(name, entity, MAX_CATALOG_NAME_LEN).map_err(ApiError::unprocessable)
}

pub fn validate_license_name(name: &str) -> Result<(), ApiError> {
    validate_name(name, "License", MAX_LICENSE_NAME_LEN).map_err(ApiError::unprocessable)
}

pub fn validate_email(email: &str) -> Result<(), ApiError> {
    let valid = email.len() <= MAX_EMAIL_LEN
        && !email.contains(char::is_whitespace)
        && email
            .split_once('@')
            .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));

    if valid {
        Ok(())
    } else {
        Err(ApiError::unprocessable("Invalid email address"))
    }
}

pub fn validate_artifacts(any_selected: bool) -> Result<(), ApiError> {
    if any_selected {
        Ok(())
    } else {
        Err(ApiError::unprocessable(
            "At least one of application, model, sourcecode or data must be licensed",
        ))
    }
}

/// Drops repeated ids, keeping the first occurrence of each.
#[must_use]
pub fn dedupe_ids(ids: &[i64]) -> Vec<i64> {
    let mut seen = std::collections::HashSet::with_capacity(ids.len());
    ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}
