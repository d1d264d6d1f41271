use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::license::MediaType;
use crate::store::Page;
use crate::types::LicenseFamily;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AccessTokenResponse {
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub full_name: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub is_superuser: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
    #[serde(default)]
    pub skip: Option<u32>,
    #[serde(default)]
    pub limit: Option<u32>,
}

impl PageParams {
    #[must_use]
    pub fn page(&self) -> Page {
        Page::new(self.skip, self.limit)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct RestrictionListParams {
    #[serde(default)]
    pub skip: Option<u32>,
    #[serde(default)]
    pub limit: Option<u32>,
    #[serde(default)]
    pub domain_id: Option<i64>,
    #[serde(default)]
    pub source_id: Option<i64>,
    /// Honored for superusers only; everyone else sees approved rows.
    #[serde(default)]
    pub approved: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct LicenseCreate {
    pub name: String,
    pub license: LicenseFamily,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub application: bool,
    #[serde(default)]
    pub model: bool,
    #[serde(default)]
    pub sourcecode: bool,
    #[serde(default)]
    pub data: bool,
    pub restriction_ids: Vec<i64>,
    #[serde(default)]
    pub domain_ids: Vec<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct GenerateParams {
    #[serde(default)]
    pub media_type: MediaType,
    #[serde(default)]
    pub git_sha: Option<String>,
}
