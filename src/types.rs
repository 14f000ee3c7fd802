use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::VcsError;

// ---------------------------------------------------------------------------
// Mode constants
// ---------------------------------------------------------------------------

pub const MODE_BLOB: u32 = 0o100644;
pub const MODE_BLOB_EXEC: u32 = 0o100755;
pub const MODE_LINK: u32 = 0o120000;
pub const MODE_TREE: u32 = 0o040000;
pub const MODE_COMMIT: u32 = 0o160000;

// ---------------------------------------------------------------------------
// FileType
// ---------------------------------------------------------------------------

/// The type of a git tree entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileType {
    Blob,
    Executable,
    Link,
    Tree,
    /// A submodule gitlink.
    Commit,
}

impl FileType {
    /// Convert a raw git mode to a `FileType`.
    pub fn from_mode(mode: u32) -> Option<Self> {
        match mode {
            MODE_BLOB => Some(Self::Blob),
            MODE_BLOB_EXEC => Some(Self::Executable),
            MODE_LINK => Some(Self::Link),
            MODE_TREE => Some(Self::Tree),
            MODE_COMMIT => Some(Self::Commit),
            _ => None,
        }
    }

    /// Whether this entry is walked into rather than compared as a leaf.
    pub fn is_dir(self) -> bool {
        matches!(self, Self::Tree)
    }
}

// ---------------------------------------------------------------------------
// TreeEntry
// ---------------------------------------------------------------------------

/// One entry of a tree object, as returned by [`Vcs::read_tree`](crate::vcs::Vcs::read_tree).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    pub name: String,
    pub oid: git2::Oid,
    pub file_type: FileType,
}

// ---------------------------------------------------------------------------
// FileStatus / StatusEntry
// ---------------------------------------------------------------------------

/// Status of a path in one of the two porcelain status columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileStatus {
    Unmodified,
    Modified,
    TypeChanged,
    Added,
    Deleted,
    Renamed,
    Copied,
    Updated,
    Untracked,
    Ignored,
}

impl FileStatus {
    /// Map a porcelain status character.
    pub fn from_code(code: char) -> Option<Self> {
        match code {
            ' ' => Some(Self::Unmodified),
            'M' => Some(Self::Modified),
            'T' => Some(Self::TypeChanged),
            'A' => Some(Self::Added),
            'D' => Some(Self::Deleted),
            'R' => Some(Self::Renamed),
            'C' => Some(Self::Copied),
            'U' => Some(Self::Updated),
            '?' => Some(Self::Untracked),
            '!' => Some(Self::Ignored),
            _ => None,
        }
    }

    /// The porcelain status character.
    pub fn code(self) -> char {
        match self {
            Self::Unmodified => ' ',
            Self::Modified => 'M',
            Self::TypeChanged => 'T',
            Self::Added => 'A',
            Self::Deleted => 'D',
            Self::Renamed => 'R',
            Self::Copied => 'C',
            Self::Updated => 'U',
            Self::Untracked => '?',
            Self::Ignored => '!',
        }
    }
}

/// A path with its index and working-directory status.
///
/// For renames and copies `path` is the destination and `orig_path` the
/// source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusEntry {
    pub path: String,
    pub index: FileStatus,
    pub working_dir: FileStatus,
    pub orig_path: Option<String>,
}

impl StatusEntry {
    pub fn new(path: impl Into<String>, index: FileStatus, working_dir: FileStatus) -> Self {
        Self {
            path: path.into(),
            index,
            working_dir,
            orig_path: None,
        }
    }

    /// Record the source path of a rename or copy.
    pub fn renamed_from(mut self, orig: impl Into<String>) -> Self {
        self.orig_path = Some(orig.into());
        self
    }

    /// `true` when either status column is one of `statuses`.
    pub fn has_any(&self, statuses: &[FileStatus]) -> bool {
        statuses.contains(&self.index) || statuses.contains(&self.working_dir)
    }
}

// ---------------------------------------------------------------------------
// Versions
// ---------------------------------------------------------------------------

/// A `major.minor.patch` tool version. Ordered lexicographically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct VersionTriple {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl VersionTriple {
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }
}

impl fmt::Display for VersionTriple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl FromStr for VersionTriple {
    type Err = VcsError;

    /// Parse `"2"`, `"2.39"` or `"2.39.3"`. Missing components are zero.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = [0u32; 3];
        let mut count = 0;
        for (i, seg) in s.trim().split('.').enumerate() {
            if i >= 3 {
                break;
            }
            parts[i] = seg
                .parse()
                .map_err(|_| VcsError::parse("version", s))?;
            count += 1;
        }
        if count == 0 {
            return Err(VcsError::parse("version", s));
        }
        Ok(Self::new(parts[0], parts[1], parts[2]))
    }
}

/// What an adapter reports about the VCS tool it drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolVersion {
    pub installed: bool,
    pub version: VersionTriple,
}

impl ToolVersion {
    pub fn installed(version: VersionTriple) -> Self {
        Self {
            installed: true,
            version,
        }
    }

    pub fn missing() -> Self {
        Self {
            installed: false,
            version: VersionTriple::default(),
        }
    }
}

/// Minimum tool version a handle accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionPolicy {
    pub minimum: VersionTriple,
    /// Compare the patch component too. When `false` only `major.minor`
    /// is gated.
    pub gate_patch: bool,
}

impl VersionPolicy {
    /// Gate on `major.minor` only.
    pub const fn minor(major: u32, minor: u32) -> Self {
        Self {
            minimum: VersionTriple::new(major, minor, 0),
            gate_patch: false,
        }
    }

    /// Gate on the full triple.
    pub const fn patch(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            minimum: VersionTriple::new(major, minor, patch),
            gate_patch: true,
        }
    }
}

// ---------------------------------------------------------------------------
// ChangeSet
// ---------------------------------------------------------------------------

/// A deduplicated set of absolute file paths.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct ChangeSet {
    paths: BTreeSet<PathBuf>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a path; returns `false` if it was already present.
    pub fn insert(&mut self, path: impl Into<PathBuf>) -> bool {
        self.paths.insert(path.into())
    }

    pub fn contains(&self, path: impl AsRef<Path>) -> bool {
        self.paths.contains(path.as_ref())
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Iterate in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &PathBuf> {
        self.paths.iter()
    }

    /// Merge `other` into `self`.
    pub fn union(mut self, other: ChangeSet) -> Self {
        self.paths.extend(other.paths);
        self
    }

    pub fn into_inner(self) -> BTreeSet<PathBuf> {
        self.paths
    }
}

impl FromIterator<PathBuf> for ChangeSet {
    fn from_iter<I: IntoIterator<Item = PathBuf>>(iter: I) -> Self {
        Self {
            paths: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for ChangeSet {
    type Item = PathBuf;
    type IntoIter = std::collections::btree_set::IntoIter<PathBuf>;

    fn into_iter(self) -> Self::IntoIter {
        self.paths.into_iter()
    }
}

impl<'a> IntoIterator for &'a ChangeSet {
    type Item = &'a PathBuf;
    type IntoIter = std::collections::btree_set::Iter<'a, PathBuf>;

    fn into_iter(self) -> Self::IntoIter {
        self.paths.iter()
    }
}

// ---------------------------------------------------------------------------
// OpenOptions
// ---------------------------------------------------------------------------

/// Options for opening a [`RepoHandle`](crate::repo::RepoHandle).
#[derive(Debug, Clone)]
pub struct OpenOptions {
    /// Remote whose `HEAD` names the default branch.
    pub remote: String,
    /// Version gate; `None` uses the adapter's default policy.
    pub version_policy: Option<VersionPolicy>,
}

impl Default for OpenOptions {
    fn default() -> Self {
        Self {
            remote: "origin".into(),
            version_policy: None,
        }
    }
}
