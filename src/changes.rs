use std::collections::BTreeSet;
use std::path::Path;
use std::time::Instant;

use crate::error::{Error, Result};
use crate::paths::to_absolute;
use crate::range::RangeDiff;
use crate::repo::RepoHandle;
use crate::status::{DeployQuery, StatusQuery};
use crate::types::{ChangeSet, OpenOptions};
use crate::vcs::Vcs;

/// How the committed half of a change set is computed.
///
/// [`RangeDiff`] is the fast path; [`MergeBaseWalk`](crate::MergeBaseWalk)
/// anchors explicitly at the merge base and walks trees. A single call uses
/// exactly one of them.
pub trait CommittedDiff {
    /// Repository-relative paths changed on `to` relative to `from`.
    fn changed_paths<V: Vcs>(
        &self,
        repo: &RepoHandle<V>,
        from: &str,
        to: &str,
    ) -> Result<BTreeSet<String>>;
}

/// Everything changed since the remote's default branch, up to `reference`,
/// plus uncommitted changes in the working tree.
///
/// Uses the range-diff strategy. Paths are absolute, rooted at the
/// repository root.
///
/// # Errors
/// The first failing stage's error; no partial set is returned.
pub fn changes_since<V: Vcs>(repo: &RepoHandle<V>, reference: &str) -> Result<ChangeSet> {
    changes_since_with(repo, reference, &RangeDiff)
}

/// [`changes_since`] with an explicit committed-diff strategy.
pub fn changes_since_with<V: Vcs, D: CommittedDiff>(
    repo: &RepoHandle<V>,
    reference: &str,
    strategy: &D,
) -> Result<ChangeSet> {
    repo.vcs()?;
    let branch = crate::branch::default_branch(repo)?;
    collect(repo, strategy, &branch, reference)
}

/// Range diff `from...to` plus uncommitted changes, as absolute paths.
pub fn changes_between<V: Vcs>(repo: &RepoHandle<V>, from: &str, to: &str) -> Result<ChangeSet> {
    repo.vcs()?;
    collect(repo, &RangeDiff, from, to)
}

/// Run the committed and local stages side by side, then union and absolutize.
fn collect<V: Vcs, D: CommittedDiff>(
    repo: &RepoHandle<V>,
    strategy: &D,
    from: &str,
    to: &str,
) -> Result<ChangeSet> {
    let started = Instant::now();

    let (committed, local) = std::thread::scope(|s| {
        let worker = s.spawn(|| crate::status::local_changes(repo, &StatusQuery::default()));
        let committed = strategy.changed_paths(repo, from, to);
        let local = worker
            .join()
            .unwrap_or_else(|_| Err(Error::local_change_failed("status worker panicked")));
        (committed, local)
    });
    let committed = committed?;
    let local = local?;
    log::debug!(
        "{}...{}: {} committed, {} local in {:?}",
        from,
        to,
        committed.len(),
        local.len(),
        started.elapsed()
    );

    let root = repo.backend().root().map_err(Error::diff_failed)?;
    Ok(to_absolute(&root, committed.into_iter().chain(local)))
}

// ---------------------------------------------------------------------------
// One-shot entry points
// ---------------------------------------------------------------------------

/// Changes since `origin`'s default branch, up to `HEAD`, for the repository
/// containing `dir`.
pub fn default_branch_diff(dir: impl AsRef<Path>) -> Result<ChangeSet> {
    RepoHandle::open(dir, OpenOptions::default()).changes_since_head()
}

/// Changes since `origin`'s default branch, up to `reference`.
pub fn default_branch_diff_by_ref(dir: impl AsRef<Path>, reference: &str) -> Result<ChangeSet> {
    RepoHandle::open(dir, OpenOptions::default()).changes_since(reference)
}

/// Absolute paths changed on `to` since it diverged from `from`. Uncommitted
/// changes are not included.
pub fn diff_range(dir: impl AsRef<Path>, from: &str, to: &str) -> Result<ChangeSet> {
    let repo = RepoHandle::open(dir, OpenOptions::default());
    let paths = repo.range_diff(from, to)?;
    let root = repo.backend().root().map_err(Error::diff_failed)?;
    Ok(to_absolute(&root, paths))
}

/// Absolute paths with uncommitted changes.
pub fn local_changes(dir: impl AsRef<Path>) -> Result<ChangeSet> {
    let repo = RepoHandle::open(dir, OpenOptions::default());
    let paths = repo.local_changes(&StatusQuery::default())?;
    let root = repo.backend().root().map_err(Error::local_change_failed)?;
    Ok(to_absolute(&root, paths))
}

/// `.cls` files the org's source-tracking store reports as changed.
pub fn deployable_classes(project_dir: impl AsRef<Path>, org_id: &str) -> Result<ChangeSet> {
    RepoHandle::open(project_dir, OpenOptions::default()).deployable(&DeployQuery::new(org_id))
}
