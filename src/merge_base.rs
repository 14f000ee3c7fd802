use std::collections::BTreeSet;
use std::fmt;

use crate::changes::CommittedDiff;
use crate::error::{Error, Result};
use crate::filter::{AllPaths, PathFilter};
use crate::repo::RepoHandle;
use crate::tree::{compare_trees, ChangeKind};
use crate::vcs::Vcs;

/// Options for [`changes`].
#[derive(Default)]
pub struct WalkOptions {
    /// Restricts which paths are walked and reported. `None` walks everything.
    pub filter: Option<Box<dyn PathFilter>>,
    /// Report paths removed on the `to` side as well.
    pub include_deleted: bool,
}

impl fmt::Debug for WalkOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WalkOptions")
            .field("filter", &self.filter.is_some())
            .field("include_deleted", &self.include_deleted)
            .finish()
    }
}

impl WalkOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, filter: impl PathFilter + 'static) -> Self {
        self.filter = Some(Box::new(filter));
        self
    }

    pub fn include_deleted(mut self, include: bool) -> Self {
        self.include_deleted = include;
        self
    }
}

/// Paths changed between the merge base of `from` and `to`, and `to`.
///
/// Both references are resolved to commits and their best common ancestor
/// is found; the ancestor's tree and `to`'s tree are then compared by
/// [`compare_trees`]. Unlike [`range::diff`](crate::range::diff) the anchor
/// is explicit, and subtrees outside `options.filter` are never read.
///
/// # Errors
/// [`Error::NoMergeBase`] when the histories are unrelated (never an empty
/// set), [`Error::DiffFailed`] when a reference cannot be resolved or a tree
/// cannot be read.
pub fn changes<V: Vcs>(
    repo: &RepoHandle<V>,
    from: &str,
    to: &str,
    options: &WalkOptions,
) -> Result<BTreeSet<String>> {
    let vcs = repo.vcs()?;
    crate::range::check_range(from, to)?;

    let from_id = vcs.resolve_ref(from).map_err(Error::diff_failed)?;
    let to_id = vcs.resolve_ref(to).map_err(Error::diff_failed)?;
    let base = vcs
        .merge_base(from_id, to_id)
        .map_err(Error::diff_failed)?
        .ok_or_else(|| Error::no_merge_base(from, to))?;
    log::debug!("merge base of {} and {} is {}", from, to, base);

    let base_tree = vcs.commit_tree(base).map_err(Error::diff_failed)?;
    let to_tree = vcs.commit_tree(to_id).map_err(Error::diff_failed)?;

    let filter: &dyn PathFilter = match &options.filter {
        Some(filter) => filter.as_ref(),
        None => &AllPaths,
    };
    let walked = compare_trees(vcs, Some(base_tree), Some(to_tree), filter)
        .map_err(Error::diff_failed)?;

    let total = walked.len();
    let paths: BTreeSet<String> = walked
        .into_iter()
        .filter(|c| options.include_deleted || c.kind != ChangeKind::Deleted)
        .map(|c| c.path)
        .collect();
    log::debug!(
        "tree walk {}..{}: {} changed, {} reported",
        base,
        to,
        total,
        paths.len()
    );
    Ok(paths)
}

/// The divergence-tolerant strategy: explicit merge base plus tree walk.
#[derive(Debug, Default)]
pub struct MergeBaseWalk {
    pub options: WalkOptions,
}

impl MergeBaseWalk {
    pub fn new(options: WalkOptions) -> Self {
        Self { options }
    }
}

impl CommittedDiff for MergeBaseWalk {
    fn changed_paths<V: Vcs>(
        &self,
        repo: &RepoHandle<V>,
        from: &str,
        to: &str,
    ) -> Result<BTreeSet<String>> {
        changes(repo, from, to, &self.options)
    }
}
