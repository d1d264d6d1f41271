use serde::Serialize;

use crate::types::{Artifact, Clause, License};

/// Restriction texts of one domain, labelled in insertion order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RestrictionGroup {
    pub domain: String,
    pub clauses: Vec<LabeledClause>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LabeledClause {
    pub label: String,
    pub text: String,
}

/// Per-domain clause label: `a`..`z`, then `aa`, `ab`, ...
#[must_use]
pub fn clause_label(index: usize) -> String {
    let mut n = index + 1;
    let mut label = Vec::new();
    while n > 0 {
        n -= 1;
        label.push(b'a' + (n % 26) as u8);
        n /= 26;
    }
    label.reverse();
    String::from_utf8(label).unwrap_or_default()
}

/// Groups clauses by domain, keeping domains in order of first appearance
/// and clauses in the order given.
#[must_use]
pub fn group_clauses(clauses: Vec<Clause>) -> Vec<RestrictionGroup> {
    let mut groups: Vec<RestrictionGroup> = Vec::new();

    for clause in clauses {
        let index = match groups.iter().position(|g| g.domain == clause.domain) {
            Some(index) => index,
            None => {
                groups.push(RestrictionGroup {
                    domain: clause.domain,
                    clauses: Vec::new(),
                });
                groups.len() - 1
            }
        };

        let group = &mut groups[index];
        group.clauses.push(LabeledClause {
            label: clause_label(group.clauses.len()),
            text: clause.text,
        });
    }

    groups
}

/// Initials of the covered artifacts, e.g. `AMS`.
#[must_use]
pub fn short_artifact_name(artifacts: &[Artifact]) -> String {
    artifacts.iter().map(|a| a.initial()).collect()
}

/// Everything a license template can refer to.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct LicenseContext {
    pub artifacts: Vec<&'static str>,
    pub short_artifact_name: String,
    pub license_name: String,
    pub license_family: &'static str,
    pub restrictions: Vec<RestrictionGroup>,
    pub license_timestamp: String,
    pub license_id: String,
    pub license_template_version: String,
}

impl LicenseContext {
    /// Builds the context for a stored license from its approved clauses.
    #[must_use]
    pub fn for_license(license: &License, clauses: Vec<Clause>) -> Self {
        let artifacts = license.artifacts();

        Self {
            artifacts: artifacts.iter().map(|a| a.label()).collect(),
            short_artifact_name: short_artifact_name(&artifacts),
            license_name: license.name.clone(),
            license_family: license.family.as_str(),
            restrictions: group_clauses(clauses),
            license_timestamp: license.timestamp.to_rfc3339(),
            license_id: license.id.to_string(),
            license_template_version: license.template_version.clone(),
        }
    }
}
