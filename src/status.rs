use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::paths::to_absolute;
use crate::repo::RepoHandle;
use crate::types::{ChangeSet, FileStatus, StatusEntry};
use crate::vcs::Vcs;

/// Statuses excluded from local changes unless a query says otherwise.
///
/// Deleted files no longer exist to act upon; ignored files are out of scope.
pub const DEFAULT_EXCLUDED: [FileStatus; 2] = [FileStatus::Deleted, FileStatus::Ignored];

type Predicate = Box<dyn Fn(&StatusEntry) -> bool + Send + Sync>;

/// Which working-tree entries count as local changes.
pub struct StatusQuery {
    /// An entry is dropped when either of its status columns is listed here.
    pub exclude: Vec<FileStatus>,
    /// Read status against this metadata directory instead of the
    /// repository's own.
    pub git_dir: Option<PathBuf>,
    predicate: Option<Predicate>,
}

impl Default for StatusQuery {
    fn default() -> Self {
        Self {
            exclude: DEFAULT_EXCLUDED.to_vec(),
            git_dir: None,
            predicate: None,
        }
    }
}

impl fmt::Debug for StatusQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StatusQuery")
            .field("exclude", &self.exclude)
            .field("git_dir", &self.git_dir)
            .field("predicate", &self.predicate.is_some())
            .finish()
    }
}

impl StatusQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the exclusion set.
    pub fn exclude(mut self, statuses: &[FileStatus]) -> Self {
        self.exclude = statuses.to_vec();
        self
    }

    /// Additionally require `predicate` to accept an entry.
    pub fn predicate<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&StatusEntry) -> bool + Send + Sync + 'static,
    {
        self.predicate = Some(Box::new(predicate));
        self
    }

    /// Read status against an alternate metadata directory.
    pub fn git_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.git_dir = Some(dir.into());
        self
    }

    /// Whether `entry` is a local change under this query.
    pub fn accepts(&self, entry: &StatusEntry) -> bool {
        if entry.has_any(&self.exclude) {
            return false;
        }
        self.predicate.as_ref().map_or(true, |p| p(entry))
    }
}

/// Repository-relative paths with uncommitted changes.
///
/// Keeps every status entry whose index and working-directory statuses are
/// both outside `query.exclude` and that `query`'s predicate accepts.
/// Renamed files contribute their destination path only.
///
/// # Errors
/// [`Error::LocalChangeFailed`] wrapping the backend failure, or a
/// version-gate error on first use of the handle.
pub fn local_changes<V: Vcs>(repo: &RepoHandle<V>, query: &StatusQuery) -> Result<BTreeSet<String>> {
    let vcs = repo.vcs()?;
    let entries = vcs
        .status(query.git_dir.as_deref())
        .map_err(Error::local_change_failed)?;

    let total = entries.len();
    let paths: BTreeSet<String> = entries
        .into_iter()
        .filter(|entry| {
            let keep = query.accepts(entry);
            log::trace!(
                "{}{} {} -> {}",
                entry.index.code(),
                entry.working_dir.code(),
                entry.path,
                if keep { "keep" } else { "skip" }
            );
            keep
        })
        .map(|entry| entry.path)
        .collect();
    log::debug!("status: kept {} of {} entries", paths.len(), total);
    Ok(paths)
}

// ---------------------------------------------------------------------------
// Deploy selection
// ---------------------------------------------------------------------------

/// Location of an org's source-tracking store inside a project.
pub fn tracking_git_dir(project_dir: &Path, org_id: &str) -> PathBuf {
    project_dir
        .join(".sf")
        .join("orgs")
        .join(org_id)
        .join("localSourceTracking")
}

/// Which tracked changes are candidates for deployment.
#[derive(Debug, Clone)]
pub struct DeployQuery {
    pub org_id: String,
    /// Required file-name suffix.
    pub extension: String,
    /// Accepted working-directory statuses.
    pub statuses: Vec<FileStatus>,
}

impl DeployQuery {
    /// Modified, added, renamed or copied `.cls` files for `org_id`.
    pub fn new(org_id: impl Into<String>) -> Self {
        Self {
            org_id: org_id.into(),
            extension: ".cls".into(),
            statuses: vec![
                FileStatus::Modified,
                FileStatus::Added,
                FileStatus::Renamed,
                FileStatus::Copied,
            ],
        }
    }

    pub fn extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }
}

/// Absolute paths of files the org's source-tracking store reports as changed.
///
/// Status is read against [`tracking_git_dir`] with the handle's directory as
/// the working tree, and results are resolved against that directory.
pub fn deployable<V: Vcs>(repo: &RepoHandle<V>, query: &DeployQuery) -> Result<ChangeSet> {
    let project_dir = if repo.dir().is_absolute() {
        repo.dir().to_path_buf()
    } else {
        std::env::current_dir()
            .map_err(Error::local_change_failed)?
            .join(repo.dir())
    };

    let extension = query.extension.clone();
    let statuses = query.statuses.clone();
    let status_query = StatusQuery::new()
        .git_dir(tracking_git_dir(&project_dir, &query.org_id))
        .predicate(move |entry| {
            entry.path.ends_with(&extension) && statuses.contains(&entry.working_dir)
        });

    let paths = local_changes(repo, &status_query)?;
    Ok(to_absolute(&project_dir, paths))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_excludes_deleted_and_ignored() {
        let query = StatusQuery::default();
        assert!(!query.accepts(&StatusEntry::new("a", FileStatus::Deleted, FileStatus::Unmodified)));
        assert!(!query.accepts(&StatusEntry::new("a", FileStatus::Unmodified, FileStatus::Deleted)));
        assert!(!query.accepts(&StatusEntry::new("a", FileStatus::Ignored, FileStatus::Ignored)));
        assert!(!query.accepts(&StatusEntry::new("a", FileStatus::Added, FileStatus::Deleted)));
        assert!(query.accepts(&StatusEntry::new("a", FileStatus::Unmodified, FileStatus::Modified)));
        assert!(query.accepts(&StatusEntry::new("a", FileStatus::Untracked, FileStatus::Untracked)));
    }

    #[test]
    fn predicate_narrows() {
        let query = StatusQuery::new().predicate(|e| e.path.ends_with(".cls"));
        assert!(query.accepts(&StatusEntry::new("A.cls", FileStatus::Modified, FileStatus::Unmodified)));
        assert!(!query.accepts(&StatusEntry::new("A.txt", FileStatus::Modified, FileStatus::Unmodified)));
    }

    #[test]
    fn empty_exclusion_keeps_deletes() {
        let query = StatusQuery::new().exclude(&[]);
        assert!(query.accepts(&StatusEntry::new("a", FileStatus::Deleted, FileStatus::Unmodified)));
    }

    #[test]
    fn tracking_dir_layout() {
        let dir = tracking_git_dir(Path::new("/proj"), "00D000000000001");
        assert_eq!(
            dir,
            PathBuf::from("/proj/.sf/orgs/00D000000000001/localSourceTracking")
        );
    }

    #[test]
    fn deploy_query_defaults() {
        let query = DeployQuery::new("org");
        assert_eq!(query.extension, ".cls");
        assert_eq!(query.statuses.len(), 4);
        assert!(!query.statuses.contains(&FileStatus::Deleted));
    }
}
