use crate::glob::glob_match;

/// Decides which paths a tree walk visits and reports.
///
/// Paths are repository-relative and `/`-separated.
pub trait PathFilter: Send + Sync {
    /// Whether anything under directory `dir` could match. Returning `false`
    /// skips the whole subtree.
    fn descend(&self, dir: &str) -> bool {
        let _ = dir;
        true
    }

    /// Whether the leaf at `path` is reported.
    fn matches(&self, path: &str) -> bool;
}

/// Accepts everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllPaths;

impl PathFilter for AllPaths {
    fn matches(&self, _path: &str) -> bool {
        true
    }
}

/// Plain predicates filter leaves but cannot prune subtrees.
impl<F> PathFilter for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn matches(&self, path: &str) -> bool {
        self(path)
    }
}

/// Restricts a walk to one subtree and, optionally, to file names matching a glob.
///
/// ```
/// use branchdiff::PathScope;
/// use branchdiff::filter::PathFilter;
///
/// let scope = PathScope::under("force-app/main").with_pattern("*.cls");
/// assert!(scope.descend("force-app"));
/// assert!(!scope.descend("docs"));
/// assert!(scope.matches("force-app/main/classes/Account.cls"));
/// assert!(!scope.matches("force-app/main/classes/Account.cls-meta.xml"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathScope {
    prefix: String,
    pattern: Option<String>,
}

impl PathScope {
    /// Everything below `prefix`. Leading/trailing slashes are ignored.
    pub fn under(prefix: &str) -> Self {
        Self {
            prefix: prefix.trim_matches('/').to_string(),
            pattern: None,
        }
    }

    /// Files anywhere whose name matches `pattern`.
    pub fn matching(pattern: &str) -> Self {
        Self::default().with_pattern(pattern)
    }

    pub fn with_pattern(mut self, pattern: &str) -> Self {
        self.pattern = Some(pattern.to_string());
        self
    }

    /// Whether `path` lies at or below the prefix.
    fn within(&self, path: &str) -> bool {
        self.prefix.is_empty()
            || path == self.prefix
            || path
                .strip_prefix(self.prefix.as_str())
                .is_some_and(|rest| rest.starts_with('/'))
    }
}

impl PathFilter for PathScope {
    fn descend(&self, dir: &str) -> bool {
        // dir is either inside the prefix or an ancestor on the way to it
        self.within(dir)
            || self
                .prefix
                .strip_prefix(dir)
                .is_some_and(|rest| rest.starts_with('/'))
    }

    fn matches(&self, path: &str) -> bool {
        if !self.within(path) || path == self.prefix {
            return false;
        }
        match &self.pattern {
            Some(pattern) => {
                let name = path.rsplit('/').next().unwrap_or(path);
                glob_match(pattern, name)
            }
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_paths() {
        assert!(AllPaths.descend("anything"));
        assert!(AllPaths.matches("a/b/c"));
    }

    #[test]
    fn closure_filter() {
        let filter = |p: &str| p.ends_with(".cls");
        assert!(filter.descend("src"));
        assert!(PathFilter::matches(&filter, "src/A.cls"));
        assert!(!PathFilter::matches(&filter, "src/A.txt"));
    }

    #[test]
    fn scope_descend_prunes_siblings() {
        let scope = PathScope::under("/force-app/main/");
        assert!(scope.descend("force-app"));
        assert!(scope.descend("force-app/main"));
        assert!(scope.descend("force-app/main/default"));
        assert!(!scope.descend("force-app/test"));
        assert!(!scope.descend("force"));
        assert!(!scope.descend("docs"));
    }

    #[test]
    fn scope_matches_under_prefix_only() {
        let scope = PathScope::under("src");
        assert!(scope.matches("src/lib.rs"));
        assert!(scope.matches("src/a/b.rs"));
        assert!(!scope.matches("srcx/lib.rs"));
        assert!(!scope.matches("README.md"));
    }

    #[test]
    fn pattern_without_prefix() {
        let scope = PathScope::matching("*.cls");
        assert!(scope.descend("any/dir"));
        assert!(scope.matches("a/b/Account.cls"));
        assert!(!scope.matches("a/b/Account.trigger"));
    }
}
