//! The contract branchdiff needs from a version-control backend.
//!
//! Every resolution stage talks to git exclusively through [`Vcs`]. Two
//! adapters ship with the crate: [`LibGit2`](crate::libgit::LibGit2)
//! (embedded, via `git2`) and [`GitCli`](crate::cli::GitCli) (spawns the
//! `git` binary). Tests substitute scripted doubles.

use std::path::{Path, PathBuf};

use crate::error::VcsError;
use crate::types::{StatusEntry, ToolVersion, TreeEntry, VersionPolicy};

/// A version-control backend bound to one working directory.
///
/// Every method is a blocking query; none of them mutate the repository.
/// Implementations must be `Send + Sync` so independent queries can run on
/// separate threads.
pub trait Vcs: Send + Sync {
    /// Version policy applied when the caller does not configure one.
    const DEFAULT_POLICY: VersionPolicy;

    /// Report whether the tool is available and which version it is.
    ///
    /// A missing tool is reported as `installed: false`, not as an error.
    fn version(&self) -> Result<ToolVersion, VcsError>;

    /// Resolve a symbolic ref one level and return its target in short form.
    ///
    /// `symbolic_ref("refs/remotes/origin/HEAD")` returns e.g. `"origin/main"`.
    /// Fails when the ref does not exist or is not symbolic.
    fn symbolic_ref(&self, name: &str) -> Result<String, VcsError>;

    /// Leaf paths changed on `to` since it diverged from `from`
    /// (`git diff --name-only from...to`).
    fn diff_names(&self, from: &str, to: &str) -> Result<Vec<String>, VcsError>;

    /// The full working-tree status, untracked files included.
    ///
    /// With `git_dir` set, status is read against that metadata directory
    /// while using [`root`](Self::root) as the working tree.
    fn status(&self, git_dir: Option<&Path>) -> Result<Vec<StatusEntry>, VcsError>;

    /// Absolute path of the working-tree root.
    fn root(&self) -> Result<PathBuf, VcsError>;

    /// Best common ancestor of two commits, or `None` for unrelated histories.
    fn merge_base(&self, a: git2::Oid, b: git2::Oid) -> Result<Option<git2::Oid>, VcsError>;

    /// Resolve a commit-ish to the id of the commit it names.
    fn resolve_ref(&self, reference: &str) -> Result<git2::Oid, VcsError>;

    /// Id of the root tree of `commit`.
    fn commit_tree(&self, commit: git2::Oid) -> Result<git2::Oid, VcsError>;

    /// Entries of a single tree object (not recursive).
    fn read_tree(&self, tree: git2::Oid) -> Result<Vec<TreeEntry>, VcsError>;
}
