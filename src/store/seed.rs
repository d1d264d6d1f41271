use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use super::{Filter, Page, Store};
use crate::error::{Error, Result};
use crate::types::{NewName, NewRestriction};

/// A catalog export in the row-indexed JSON format.
///
/// ```json
/// {
///   "Source": {"0": "Standards Body"},
///   "Domain": {"0": "Privacy"},
///   "Restriction": {"0": "Do not track individuals"}
/// }
/// ```
///
/// Entry `i` of `Restriction` belongs to the source and domain at the same
/// index. Imported restrictions are approved.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SeedCatalog {
    pub source: HashMap<String, String>,
    pub domain: HashMap<String, String>,
    pub restriction: HashMap<String, String>,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SeedReport {
    pub sources: usize,
    pub domains: usize,
    pub restrictions: usize,
}

impl SeedCatalog {
    pub fn from_json(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).map_err(|e| Error::Validation(format!("invalid seed file: {e}")))
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    /// Restriction rows sorted by numeric index, paired with their source
    /// and domain names.
    fn rows(&self) -> Result<Vec<(&str, &str, &str)>> {
        let mut keys: Vec<(u64, &String)> = self
            .restriction
            .keys()
            .map(|key| {
                key.parse::<u64>()
                    .map(|index| (index, key))
                    .map_err(|_| Error::Validation(format!("invalid seed index '{key}'")))
            })
            .collect::<Result<_>>()?;
        keys.sort_unstable();

        keys.into_iter()
            .map(|(_, key)| {
                let source = self.source.get(key).ok_or_else(|| {
                    Error::Validation(format!("restriction {key} has no source"))
                })?;
                let domain = self.domain.get(key).ok_or_else(|| {
                    Error::Validation(format!("restriction {key} has no domain"))
                })?;
                Ok((self.restriction[key].as_str(), source.as_str(), domain.as_str()))
            })
            .collect()
    }
}

/// Imports the catalog, reusing domains and sources that already exist by
/// name. Restrictions already present with the same text, domain and source
/// are skipped, so applying a file twice is harmless.
pub fn apply(store: &dyn Store, catalog: &SeedCatalog) -> Result<SeedReport> {
    let rows = catalog.rows()?;
    let mut report = SeedReport::default();

    let mut domain_ids: HashMap<&str, i64> = HashMap::new();
    let mut source_ids: HashMap<&str, i64> = HashMap::new();

    for (text, source, domain) in rows {
        let source_id = match source_ids.get(source) {
            Some(id) => *id,
            None => {
                let id = match store.get_source_by_name(source)? {
                    Some(existing) => existing.id,
                    None => {
                        report.sources += 1;
                        store
                            .sources()
                            .create(&NewName {
                                name: source.to_string(),
                            })?
                            .id
                    }
                };
                source_ids.insert(source, id);
                id
            }
        };

        let domain_id = match domain_ids.get(domain) {
            Some(id) => *id,
            None => {
                let id = match store.get_domain_by_name(domain)? {
                    Some(existing) => existing.id,
                    None => {
                        report.domains += 1;
                        store
                            .domains()
                            .create(&NewName {
                                name: domain.to_string(),
                            })?
                            .id
                    }
                };
                domain_ids.insert(domain, id);
                id
            }
        };

        let existing = store.restrictions().get_multi(
            Page::new(None, Some(crate::store::crud::MAX_PAGE_LIMIT)),
            &Filter::new()
                .eq("domain_id", domain_id)
                .eq("source_id", source_id),
        )?;
        if existing.iter().any(|r| r.text == text) {
            continue;
        }

        store.restrictions().create(&NewRestriction {
            text: text.to_string(),
            domain_id,
            source_id,
            approved: true,
        })?;
        report.restrictions += 1;
    }

    tracing::info!(
        sources = report.sources,
        domains = report.domains,
        restrictions = report.restrictions,
        "Seeded license catalog"
    );

    Ok(report)
}
