use std::path::PathBuf;

use git2::{ObjectType, Repository};
use thiserror::Error;

use crate::types::LicenseFamily;

/// Marker for "the template as it is on disk right now".
pub const HEAD: &str = "head";

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("Template history is not available")]
    HistoryUnavailable,

    #[error("Template revision not found: {0}")]
    RevisionNotFound(String),

    #[error("Template not found: {0}")]
    FileNotFound(String),

    #[error("Template is not valid UTF-8: {0}")]
    Encoding(String),

    #[error("failed to read template: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to read template history: {0}")]
    Git(#[from] git2::Error),
}

impl From<TemplateError> for crate::error::Error {
    fn from(err: TemplateError) -> Self {
        crate::error::Error::Template(err.to_string())
    }
}

/// Which revision of a template to load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateVersion<'a> {
    Head,
    Commit(&'a str),
}

impl<'a> TemplateVersion<'a> {
    #[must_use]
    pub fn parse(value: &'a str) -> Self {
        if value == HEAD {
            Self::Head
        } else {
            Self::Commit(value)
        }
    }
}

/// Where license templates live: a directory on disk and, optionally, the
/// git repository that tracks them.
///
/// Cheap to clone. The repository is opened per lookup.
#[derive(Debug, Clone)]
pub struct TemplateStore {
    template_dir: PathBuf,
    repository: Option<PathBuf>,
    repo_prefix: PathBuf,
}

impl TemplateStore {
    #[must_use]
    pub fn new(template_dir: impl Into<PathBuf>) -> Self {
        Self {
            template_dir: template_dir.into(),
            repository: None,
            repo_prefix: PathBuf::new(),
        }
    }

    /// Enables history lookups. `prefix` is the template directory's path
    /// inside the repository tree.
    #[must_use]
    pub fn with_history(mut self, repository: impl Into<PathBuf>, prefix: &str) -> Self {
        self.repository = Some(repository.into());
        self.repo_prefix = PathBuf::from(prefix.trim_matches('/'));
        self
    }

    #[must_use]
    pub fn has_history(&self) -> bool {
        self.repository.is_some()
    }

    fn open(&self) -> Result<Repository, TemplateError> {
        let path = self
            .repository
            .as_ref()
            .ok_or(TemplateError::HistoryUnavailable)?;

        Repository::open(path).map_err(|e| {
            tracing::warn!("Failed to open template repository {}: {e}", path.display());
            TemplateError::HistoryUnavailable
        })
    }

    /// Commit id of the repository HEAD, or [`HEAD`] when templates are not
    /// under version control.
    pub fn current_version(&self) -> Result<String, TemplateError> {
        if self.repository.is_none() {
            return Ok(HEAD.to_string());
        }

        let repo = self.open()?;
        let commit = repo.head()?.peel_to_commit()?;
        Ok(commit.id().to_string())
    }

    /// Loads the template source for a family at the given revision.
    pub fn load(
        &self,
        family: LicenseFamily,
        version: TemplateVersion<'_>,
    ) -> Result<String, TemplateError> {
        match version {
            TemplateVersion::Head => self.load_from_disk(family),
            TemplateVersion::Commit(rev) => self.load_from_history(family, rev),
        }
    }

    fn load_from_disk(&self, family: LicenseFamily) -> Result<String, TemplateError> {
        let path = self.template_dir.join(family.template_file());

        std::fs::read_to_string(&path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => {
                TemplateError::FileNotFound(family.template_file().to_string())
            }
            _ => TemplateError::Io(e),
        })
    }

    fn load_from_history(&self, family: LicenseFamily, rev: &str) -> Result<String, TemplateError> {
        let repo = self.open()?;

        let commit = repo
            .revparse_single(rev)
            .and_then(|object| object.peel_to_commit())
            .map_err(|_| TemplateError::RevisionNotFound(rev.to_string()))?;

        let path = self.repo_prefix.join(family.template_file());
        let tree = commit.tree()?;
        let entry = tree
            .get_path(&path)
            .map_err(|_| TemplateError::FileNotFound(path.display().to_string()))?;

        if entry.kind() != Some(ObjectType::Blob) {
            return Err(TemplateError::FileNotFound(path.display().to_string()));
        }

        let blob = entry
            .to_object(&repo)?
            .into_blob()
            .map_err(|_| TemplateError::FileNotFound(path.display().to_string()))?;

        String::from_utf8(blob.content().to_vec())
            .map_err(|_| TemplateError::Encoding(path.display().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use git2::{Oid, Signature};
    use tempfile::TempDir;

    const FILE: &str = "templates/OpenRAIL-AMS.jinja";

    fn commit_file(repo: &Repository, root: &Path, content: &str) -> Oid {
        std::fs::create_dir_all(root.join("templates")).unwrap();
        std::fs::write(root.join(FILE), content).unwrap();

        let mut index = repo.index().unwrap();
        index.add_path(Path::new(FILE)).unwrap();
        index.write().unwrap();
        let tree = repo.find_tree(index.write_tree().unwrap()).unwrap();

        let sig = Signature::now("Test", "test@example.com").unwrap();
        let parent = repo.head().ok().and_then(|h| h.peel_to_commit().ok());
        let parents: Vec<&git2::Commit<'_>> = parent.iter().collect();

        repo.commit(Some("HEAD"), &sig, &sig, "update template", &tree, &parents)
            .unwrap()
    }

    fn history() -> (TempDir, TemplateStore, Oid, Oid) {
        let temp = TempDir::new().unwrap();
        let repo = Repository::init(temp.path()).unwrap();
        let first = commit_file(&repo, temp.path(), "version one");
        let second = commit_file(&repo, temp.path(), "version two");

        let store = TemplateStore::new(temp.path().join("templates"))
            .with_history(temp.path(), "/templates/");
        (temp, store, first, second)
    }

    #[test]
    fn test_load_from_commit() {
        let (_temp, store, first, second) = history();

        let old = store
            .load(LicenseFamily::OpenRail, TemplateVersion::Commit(&first.to_string()))
            .unwrap();
        assert_eq!(old, "version one");

        let abbreviated = second.to_string()[..7].to_string();
        let new = store
            .load(LicenseFamily::OpenRail, TemplateVersion::Commit(&abbreviated))
            .unwrap();
        assert_eq!(new, "version two");
    }

    #[test]
    fn test_head_reads_working_tree() {
        let (temp, store, _, _) = history();
        std::fs::write(temp.path().join(FILE), "uncommitted").unwrap();

        let text = store
            .load(LicenseFamily::OpenRail, TemplateVersion::parse(HEAD))
            .unwrap();
        assert_eq!(text, "uncommitted");
    }

    #[test]
    fn test_current_version_is_head_commit() {
        let (_temp, store, _, second) = history();
        assert_eq!(store.current_version().unwrap(), second.to_string());

        let plain = TemplateStore::new("templates");
        assert_eq!(plain.current_version().unwrap(), HEAD);
    }

    #[test]
    fn test_unknown_revision() {
        let (_temp, store, _, _) = history();
        let result = store.load(LicenseFamily::OpenRail, TemplateVersion::Commit("0badc0de"));
        assert!(matches!(result, Err(TemplateError::RevisionNotFound(_))));
    }

    #[test]
    fn test_missing_file_in_commit() {
        let (_temp, store, first, _) = history();
        let result = store.load(LicenseFamily::Rail, TemplateVersion::Commit(&first.to_string()));
        assert!(matches!(result, Err(TemplateError::FileNotFound(_))));
    }

    #[test]
    fn test_commit_without_history() {
        let store = TemplateStore::new("templates");
        let result = store.load(LicenseFamily::Rail, TemplateVersion::Commit("abc1234"));
        assert!(matches!(result, Err(TemplateError::HistoryUnavailable)));
    }
}
