use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Artifact, LicenseFamily};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct License {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub name: String,
    #[serde(rename = "license")]
    pub family: LicenseFamily,
    pub application: bool,
    pub model: bool,
    pub sourcecode: bool,
    pub data: bool,
    /// Template revision the license was created against: a commit id, or
    /// `head` when templates were not under version control.
    pub template_version: String,
    pub restrictions: Vec<LicenseRestriction>,
    pub domains: Vec<LicenseDomain>,
}

impl License {
    /// Covered artifacts in document order. `data` counts toward the
    /// artifact requirement but never appears in the document.
    #[must_use]
    pub fn artifacts(&self) -> Vec<Artifact> {
        artifacts_from_flags(self.application, self.model, self.sourcecode)
    }
}

#[must_use]
pub fn artifacts_from_flags(application: bool, model: bool, sourcecode: bool) -> Vec<Artifact> {
    [
        (application, Artifact::Application),
        (model, Artifact::Model),
        (sourcecode, Artifact::SourceCode),
    ]
    .into_iter()
    .filter_map(|(enabled, artifact)| enabled.then_some(artifact))
    .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LicenseDomain {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LicenseSource {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LicenseRestriction {
    pub id: i64,
    pub text: String,
    pub domain_id: i64,
    pub source_id: i64,
    pub approved: bool,
}

/// A restriction as it appears in a generated document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Clause {
    pub domain: String,
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub full_name: String,
    #[serde(skip)]
    pub hashed_password: String,
    pub is_active: bool,
    pub is_superuser: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Token {
    pub id: String,
    #[serde(skip)]
    pub token_hash: String,
    #[serde(skip)]
    pub token_lookup: String,
    pub user_id: i64,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_used_at: Option<DateTime<Utc>>,
}

// Store inputs. Handlers validate before these reach the store.

#[derive(Debug, Clone)]
pub struct NewLicense {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub name: String,
    pub family: LicenseFamily,
    pub application: bool,
    pub model: bool,
    pub sourcecode: bool,
    pub data: bool,
    pub template_version: String,
    pub restriction_ids: Vec<i64>,
    pub domain_ids: Vec<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LicensePatch {
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "license")]
    pub family: Option<LicenseFamily>,
    #[serde(default)]
    pub application: Option<bool>,
    #[serde(default)]
    pub model: Option<bool>,
    #[serde(default)]
    pub sourcecode: Option<bool>,
    #[serde(default)]
    pub data: Option<bool>,
    #[serde(default)]
    pub restriction_ids: Option<Vec<i64>>,
    #[serde(default)]
    pub domain_ids: Option<Vec<i64>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewRestriction {
    pub text: String,
    pub domain_id: i64,
    pub source_id: i64,
    #[serde(default)]
    pub approved: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RestrictionPatch {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub domain_id: Option<i64>,
    #[serde(default)]
    pub source_id: Option<i64>,
    #[serde(default)]
    pub approved: Option<bool>,
}

/// Create payload shared by domains and sources.
#[derive(Debug, Clone, Deserialize)]
pub struct NewName {
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NamePatch {
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub full_name: String,
    pub hashed_password: String,
    pub is_active: bool,
    pub is_superuser: bool,
}
