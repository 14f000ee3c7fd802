use std::collections::BTreeSet;

use crate::changes::CommittedDiff;
use crate::error::{Error, Result};
use crate::repo::RepoHandle;
use crate::vcs::Vcs;

/// Paths changed on `to` since it diverged from `from`.
///
/// This is `git diff --name-only from...to`: the comparison is anchored at
/// the merge base of the two references, so commits that landed on `from`
/// after `to` branched off do not show up. Only leaf paths are returned.
/// Deleted files are included, as git lists them.
///
/// # Errors
/// [`Error::DiffFailed`] wrapping the backend failure, or a version-gate
/// error on first use of the handle.
pub fn diff<V: Vcs>(repo: &RepoHandle<V>, from: &str, to: &str) -> Result<BTreeSet<String>> {
    let vcs = repo.vcs()?;
    check_range(from, to)?;

    let names = vcs.diff_names(from, to).map_err(Error::diff_failed)?;
    let paths: BTreeSet<String> = names
        .into_iter()
        .filter(|name| !name.is_empty() && !name.ends_with('/'))
        .collect();
    log::debug!("{}...{}: {} changed paths", from, to, paths.len());
    Ok(paths)
}

/// Reject references a backend could misread: empty ones, and ones that
/// start with `-` and would be taken for an option.
pub(crate) fn check_range(from: &str, to: &str) -> Result<()> {
    for reference in [from, to] {
        if reference.trim().is_empty() {
            return Err(Error::diff_failed(format!(
                "invalid range '{}...{}': references must not be empty",
                from, to
            )));
        }
        if reference.starts_with('-') {
            return Err(Error::diff_failed(format!(
                "invalid reference '{}': must not start with '-'",
                reference
            )));
        }
    }
    Ok(())
}

/// The range-diff strategy: one backend diff, anchored at the implicit merge base.
#[derive(Debug, Clone, Copy, Default)]
pub struct RangeDiff;

impl CommittedDiff for RangeDiff {
    fn changed_paths<V: Vcs>(
        &self,
        repo: &RepoHandle<V>,
        from: &str,
        to: &str,
    ) -> Result<BTreeSet<String>> {
        diff(repo, from, to)
    }
}
