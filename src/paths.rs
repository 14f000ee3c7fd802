use std::path::Path;

use path_clean::PathClean;

use crate::types::ChangeSet;

/// Resolve repository-relative paths against `root`.
///
/// Each path is joined to `root` and normalized lexically: `.` segments are
/// dropped, `..` segments consume their parent, repeated separators collapse.
/// Nothing touches the filesystem and malformed input simply normalizes.
/// Duplicates (including ones that only become equal after normalization)
/// collapse into one entry.
///
/// # Arguments
/// * `root` - Absolute path of the repository root.
/// * `paths` - Repository-relative paths as reported by the VCS.
pub fn to_absolute<I, P>(root: &Path, paths: I) -> ChangeSet
where
    I: IntoIterator<Item = P>,
    P: AsRef<Path>,
{
    paths
        .into_iter()
        .map(|p| root.join(p.as_ref()).clean())
        .collect()
}

/// Shorten a full ref name the way `git symbolic-ref --short` prints it.
///
/// Strips `refs/heads/`, `refs/tags/`, `refs/remotes/` or a bare `refs/`
/// prefix; anything else is returned unchanged.
pub fn shorten_ref_name(name: &str) -> String {
    const PREFIXES: [&str; 4] = ["refs/heads/", "refs/tags/", "refs/remotes/", "refs/"];
    let name = name.trim();
    for prefix in PREFIXES {
        if let Some(short) = name.strip_prefix(prefix) {
            if !short.is_empty() {
                return short.to_string();
            }
        }
    }
    name.to_string()
}

/// Split NUL-delimited VCS output into its non-empty items.
///
/// File names may contain any character except NUL, so items are never
/// trimmed.
pub fn split_nul(output: &[u8]) -> Vec<String> {
    output
        .split(|b| *b == 0)
        .filter(|item| !item.is_empty())
        .map(|item| String::from_utf8_lossy(item).into_owned())
        .collect()
}

/// The ref that names a remote's default branch, e.g. `refs/remotes/origin/HEAD`.
pub fn remote_head_ref(remote: &str) -> String {
    format!("refs/remotes/{}/HEAD", remote)
}
