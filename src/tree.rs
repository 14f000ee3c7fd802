use std::collections::BTreeMap;

use git2::Oid;

use crate::error::VcsError;
use crate::filter::PathFilter;
use crate::types::TreeEntry;
use crate::vcs::Vcs;

/// How a leaf path differs between two trees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ChangeKind {
    Added,
    Modified,
    Deleted,
}

/// One leaf path whose content differs between two trees.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct TreeChange {
    /// Slash-separated path from the tree root (e.g. `"dir/sub/file.txt"`).
    pub path: String,
    pub kind: ChangeKind,
}

/// Compare two trees structurally, returning every changed leaf path.
///
/// Both trees are walked in lock-step by entry name. Subtrees with the same
/// id on both sides are skipped without being read, and subtrees the filter
/// declines to [`descend`](PathFilter::descend) into are never visited. A
/// leaf is changed when its id or type differs, or when it exists on one
/// side only. `None` stands for an empty tree.
///
/// Results are in walk order: siblings sorted by name, depth first.
pub fn compare_trees<V: Vcs>(
    vcs: &V,
    old: Option<Oid>,
    new: Option<Oid>,
    filter: &dyn PathFilter,
) -> Result<Vec<TreeChange>, VcsError> {
    let mut results = Vec::new();
    compare_recursive(vcs, old, new, "", filter, &mut results)?;
    Ok(results)
}

fn compare_recursive<V: Vcs>(
    vcs: &V,
    old: Option<Oid>,
    new: Option<Oid>,
    prefix: &str,
    filter: &dyn PathFilter,
    results: &mut Vec<TreeChange>,
) -> Result<(), VcsError> {
    if old == new {
        return Ok(());
    }

    let mut by_name: BTreeMap<String, (Option<TreeEntry>, Option<TreeEntry>)> = BTreeMap::new();
    if let Some(oid) = old {
        for e in vcs.read_tree(oid)? {
            let name = e.name.clone();
            by_name.entry(name).or_default().0 = Some(e);
        }
    }
    if let Some(oid) = new {
        for e in vcs.read_tree(oid)? {
            let name = e.name.clone();
            by_name.entry(name).or_default().1 = Some(e);
        }
    }

    for (name, (before, after)) in by_name {
        let full_path = if prefix.is_empty() {
            name
        } else {
            format!("{}/{}", prefix, name)
        };

        let (old_dir, old_leaf) = split_side(before.as_ref());
        let (new_dir, new_leaf) = split_side(after.as_ref());

        // a path can be a tree on one side and a leaf on the other
        if (old_dir.is_some() || new_dir.is_some()) && filter.descend(&full_path) {
            compare_recursive(vcs, old_dir, new_dir, &full_path, filter, results)?;
        }

        let kind = match (old_leaf, new_leaf) {
            (None, None) => None,
            (None, Some(_)) => Some(ChangeKind::Added),
            (Some(_), None) => Some(ChangeKind::Deleted),
            (Some(a), Some(b)) if a.oid != b.oid || a.file_type != b.file_type => {
                Some(ChangeKind::Modified)
            }
            (Some(_), Some(_)) => None,
        };
        if let Some(kind) = kind {
            if filter.matches(&full_path) {
                results.push(TreeChange {
                    path: full_path,
                    kind,
                });
            }
        }
    }
    Ok(())
}

/// Split an optional entry into its subtree id or its leaf.
fn split_side(entry: Option<&TreeEntry>) -> (Option<Oid>, Option<&TreeEntry>) {
    match entry {
        Some(e) if e.file_type.is_dir() => (Some(e.oid), None),
        Some(e) => (None, Some(e)),
        None => (None, None),
    }
}
