use crate::error::{Error, Result};
use crate::paths::remote_head_ref;
use crate::repo::RepoHandle;
use crate::vcs::Vcs;

/// Discover the remote's default branch from `refs/remotes/<remote>/HEAD`.
///
/// Returns the short name, e.g. `origin/main`.
///
/// # Errors
/// [`Error::NoDefaultBranch`] when the symbolic ref is missing (the message
/// names the lookup path and carries the backend's message) or when it points
/// outside `<remote>/`.
pub fn default_branch<V: Vcs>(repo: &RepoHandle<V>) -> Result<String> {
    let vcs = repo.vcs()?;
    let lookup = remote_head_ref(repo.remote());

    let branch = vcs.symbolic_ref(&lookup).map_err(|e| {
        Error::no_default_branch(format!(
            "Failed to find symbolic ref {} with message: '{}'",
            lookup,
            e.to_string().trim()
        ))
    })?;
    let branch = branch.trim();

    let prefix = format!("{}/", repo.remote());
    match branch.strip_prefix(&prefix) {
        Some(name) if !name.is_empty() => {
            log::debug!("default branch of {} is {}", repo.remote(), branch);
            Ok(branch.to_string())
        }
        _ => Err(Error::no_default_branch(format!(
            "Expected default branch '{}' to start with '{}'",
            branch, prefix
        ))),
    }
}
