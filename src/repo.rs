use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use crate::changes;
use crate::cli::GitCli;
use crate::error::{Error, Result};
use crate::libgit::LibGit2;
use crate::merge_base::{self, WalkOptions};
use crate::status::{self, DeployQuery, StatusQuery};
use crate::types::{ChangeSet, OpenOptions, VersionPolicy, VersionTriple};
use crate::vcs::Vcs;

/// Internal state shared via `Arc`.
struct RepoHandleInner<V> {
    vcs: V,
    dir: PathBuf,
    remote: String,
    policy: VersionPolicy,
    checked: OnceLock<VersionTriple>,
    init: Mutex<()>,
}

/// A version-gated connection to the repository containing one directory.
///
/// The VCS version is checked before the first command issued through the
/// handle and never again afterwards; concurrent first use still runs the
/// check once. Cheap to clone (`Arc` internally); clones share the gate.
pub struct RepoHandle<V: Vcs = LibGit2> {
    inner: Arc<RepoHandleInner<V>>,
}

impl<V: Vcs> Clone for RepoHandle<V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl RepoHandle<LibGit2> {
    /// Open `dir` through libgit2.
    ///
    /// Nothing is read until the first operation.
    pub fn open(dir: impl AsRef<Path>, options: OpenOptions) -> Self {
        let dir = dir.as_ref().to_path_buf();
        Self::with_vcs(LibGit2::new(dir.clone()), dir, options)
    }
}

impl RepoHandle<GitCli> {
    /// Open `dir` through the `git` executable on `PATH`.
    pub fn open_cli(dir: impl AsRef<Path>, options: OpenOptions) -> Self {
        let dir = dir.as_ref().to_path_buf();
        Self::with_vcs(GitCli::new(dir.clone()), dir, options)
    }
}

impl<V: Vcs> RepoHandle<V> {
    /// Wrap an arbitrary backend bound to `dir`.
    pub fn with_vcs(vcs: V, dir: impl Into<PathBuf>, options: OpenOptions) -> Self {
        let policy = options.version_policy.unwrap_or(V::DEFAULT_POLICY);
        Self {
            inner: Arc::new(RepoHandleInner {
                vcs,
                dir: dir.into(),
                remote: options.remote,
                policy,
                checked: OnceLock::new(),
                init: Mutex::new(()),
            }),
        }
    }

    /// The backend, after the version gate has passed.
    ///
    /// # Errors
    /// [`Error::NotInstalled`] or [`Error::UnsupportedVersion`]. A failed
    /// gate is not remembered; the next call checks again.
    pub fn vcs(&self) -> Result<&V> {
        if self.inner.checked.get().is_some() {
            return Ok(&self.inner.vcs);
        }

        let _guard = self
            .inner
            .init
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if self.inner.checked.get().is_none() {
            let tool = self.inner.vcs.version().map_err(|e| {
                log::warn!("version query failed: {}", e);
                Error::NotInstalled
            })?;
            crate::version::check(&tool, &self.inner.policy)?;
            log::debug!(
                "vcs version {} accepted (minimum {})",
                tool.version,
                self.inner.policy.minimum
            );
            let _ = self.inner.checked.set(tool.version);
        }
        Ok(&self.inner.vcs)
    }

    /// The backend without running the version gate.
    pub fn backend(&self) -> &V {
        &self.inner.vcs
    }

    /// The version accepted by the gate, once it has run.
    pub fn checked_version(&self) -> Option<VersionTriple> {
        self.inner.checked.get().copied()
    }

    /// Directory this handle was opened for.
    pub fn dir(&self) -> &Path {
        &self.inner.dir
    }

    /// Remote whose `HEAD` names the default branch.
    pub fn remote(&self) -> &str {
        &self.inner.remote
    }

    /// The version policy in force.
    pub fn policy(&self) -> &VersionPolicy {
        &self.inner.policy
    }

    /// Short name of the remote's default branch, e.g. `origin/main`.
    pub fn default_branch(&self) -> Result<String> {
        crate::branch::default_branch(self)
    }

    /// Relative paths changed on `to` since it diverged from `from`.
    pub fn range_diff(&self, from: &str, to: &str) -> Result<BTreeSet<String>> {
        crate::range::diff(self, from, to)
    }

    /// Relative paths with uncommitted changes matching `query`.
    pub fn local_changes(&self, query: &StatusQuery) -> Result<BTreeSet<String>> {
        status::local_changes(self, query)
    }

    /// Relative paths changed between `merge-base(from, to)` and `to`, by tree walk.
    pub fn merge_base_changes(
        &self,
        from: &str,
        to: &str,
        options: &WalkOptions,
    ) -> Result<BTreeSet<String>> {
        merge_base::changes(self, from, to, options)
    }

    /// Everything changed since the default branch, up to `reference`,
    /// plus uncommitted changes.
    pub fn changes_since(&self, reference: &str) -> Result<ChangeSet> {
        changes::changes_since(self, reference)
    }

    /// [`changes_since`](Self::changes_since) with `HEAD`.
    pub fn changes_since_head(&self) -> Result<ChangeSet> {
        changes::changes_since(self, "HEAD")
    }

    /// Range diff `from...to` plus uncommitted changes.
    pub fn changes_between(&self, from: &str, to: &str) -> Result<ChangeSet> {
        changes::changes_between(self, from, to)
    }

    /// Files the source-tracking store considers deployable.
    pub fn deployable(&self, query: &DeployQuery) -> Result<ChangeSet> {
        status::deployable(self, query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_uses_backend_default_policy() {
        let handle = RepoHandle::open("/nonexistent", OpenOptions::default());
        assert_eq!(*handle.policy(), LibGit2::DEFAULT_POLICY);
        assert_eq!(handle.remote(), "origin");
        assert!(handle.checked_version().is_none());
    }

    #[test]
    fn explicit_policy_overrides_default() {
        let options = OpenOptions {
            remote: "upstream".into(),
            version_policy: Some(VersionPolicy::patch(2, 37, 0)),
        };
        let handle = RepoHandle::open_cli("/nonexistent", options);
        assert_eq!(*handle.policy(), VersionPolicy::patch(2, 37, 0));
        assert_eq!(handle.remote(), "upstream");
        assert_eq!(handle.dir(), Path::new("/nonexistent"));
    }

    #[test]
    fn libgit2_gate_passes_without_repository() {
        let handle = RepoHandle::open("/nonexistent", OpenOptions::default());
        assert!(handle.vcs().is_ok());
        assert!(handle.checked_version().is_some());
    }
}
