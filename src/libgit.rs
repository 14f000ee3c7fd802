//! `git2`-backed implementation of [`Vcs`].

use std::path::{Path, PathBuf};

use git2::{Delta, DiffFindOptions, ErrorCode, ObjectType, Oid, Repository, StatusOptions};
use path_clean::PathClean;

use crate::error::VcsError;
use crate::paths::shorten_ref_name;
use crate::types::{FileStatus, FileType, StatusEntry, ToolVersion, TreeEntry, VersionPolicy, VersionTriple};
use crate::vcs::Vcs;

/// A [`Vcs`] adapter that calls libgit2 in-process.
///
/// The repository is discovered from `dir` on every operation, so the
/// adapter holds no open handle and is freely shareable across threads.
#[derive(Debug, Clone)]
pub struct LibGit2 {
    dir: PathBuf,
}

impl LibGit2 {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The directory this adapter was created for.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn open(&self) -> Result<Repository, VcsError> {
        Ok(Repository::discover(&self.dir)?)
    }

    /// Open `git_dir` as the metadata store with `self.dir` as its working tree.
    fn open_with_git_dir(&self, git_dir: &Path) -> Result<Repository, VcsError> {
        let repo = Repository::open(git_dir)?;
        repo.set_workdir(&self.dir, false)?;
        Ok(repo)
    }
}

impl Vcs for LibGit2 {
    const DEFAULT_POLICY: VersionPolicy = VersionPolicy::patch(1, 0, 0);

    fn version(&self) -> Result<ToolVersion, VcsError> {
        let (major, minor, patch) = git2::Version::get().libgit2_version();
        Ok(ToolVersion::installed(VersionTriple::new(major, minor, patch)))
    }

    fn symbolic_ref(&self, name: &str) -> Result<String, VcsError> {
        let repo = self.open()?;
        let reference = repo.find_reference(name)?;
        let target = reference
            .symbolic_target()
            .ok_or_else(|| VcsError::not_found(format!("ref {} is not a symbolic ref", name)))?;
        Ok(shorten_ref_name(target))
    }

    fn diff_names(&self, from: &str, to: &str) -> Result<Vec<String>, VcsError> {
        let repo = self.open()?;
        let from_commit = repo.revparse_single(from)?.peel_to_commit()?;
        let to_commit = repo.revparse_single(to)?.peel_to_commit()?;
        let base = repo.merge_base(from_commit.id(), to_commit.id())?;
        let base_tree = repo.find_commit(base)?.tree()?;
        let to_tree = to_commit.tree()?;

        let mut diff = repo.diff_tree_to_tree(Some(&base_tree), Some(&to_tree), None)?;
        // git diff detects renames by default; name-only then lists the new path
        diff.find_similar(Some(DiffFindOptions::new().renames(true)))?;

        let mut names = Vec::with_capacity(diff.deltas().len());
        for delta in diff.deltas() {
            let file = match delta.status() {
                Delta::Deleted => delta.old_file(),
                _ => delta.new_file(),
            };
            if let Some(path) = file.path() {
                names.push(path.to_string_lossy().into_owned());
            }
        }
        Ok(names)
    }

    fn status(&self, git_dir: Option<&Path>) -> Result<Vec<StatusEntry>, VcsError> {
        let repo = match git_dir {
            Some(dir) => self.open_with_git_dir(dir)?,
            None => self.open()?,
        };

        let mut opts = StatusOptions::new();
        opts.include_untracked(true)
            .recurse_untracked_dirs(true)
            .include_ignored(false)
            .renames_head_to_index(true)
            .renames_index_to_workdir(true);

        let statuses = repo.statuses(Some(&mut opts))?;
        let mut entries = Vec::with_capacity(statuses.len());
        for entry in statuses.iter() {
            match convert_status(&entry) {
                Some(converted) => entries.push(converted),
                None => log::warn!(
                    "skipping status entry with unreadable path: {:?}",
                    String::from_utf8_lossy(entry.path_bytes())
                ),
            }
        }
        Ok(entries)
    }

    fn root(&self) -> Result<PathBuf, VcsError> {
        let repo = self.open()?;
        let workdir = repo
            .workdir()
            .ok_or_else(|| VcsError::not_found("repository has no working directory"))?;
        Ok(workdir.clean())
    }

    fn merge_base(&self, a: Oid, b: Oid) -> Result<Option<Oid>, VcsError> {
        let repo = self.open()?;
        match repo.merge_base(a, b) {
            Ok(oid) => Ok(Some(oid)),
            Err(e) if e.code() == ErrorCode::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn resolve_ref(&self, reference: &str) -> Result<Oid, VcsError> {
        let repo = self.open()?;
        let commit = repo.revparse_single(reference)?.peel_to_commit()?;
        Ok(commit.id())
    }

    fn commit_tree(&self, commit: Oid) -> Result<Oid, VcsError> {
        let repo = self.open()?;
        let commit = repo.find_commit(commit)?;
        Ok(commit.tree_id())
    }

    fn read_tree(&self, tree: Oid) -> Result<Vec<TreeEntry>, VcsError> {
        let repo = self.open()?;
        let tree = repo.find_tree(tree)?;
        let entries = tree
            .iter()
            .map(|e| TreeEntry {
                name: String::from_utf8_lossy(e.name_bytes()).into_owned(),
                oid: e.id(),
                file_type: entry_file_type(e.filemode(), e.kind()),
            })
            .collect();
        Ok(entries)
    }
}

/// Map a raw tree mode, falling back to the object kind for legacy modes
/// such as `100664`.
fn entry_file_type(filemode: i32, kind: Option<ObjectType>) -> FileType {
    if let Some(file_type) = u32::try_from(filemode).ok().and_then(FileType::from_mode) {
        return file_type;
    }
    match kind {
        Some(ObjectType::Tree) => FileType::Tree,
        Some(ObjectType::Commit) => FileType::Commit,
        _ => FileType::Blob,
    }
}

/// Translate a libgit2 status entry into porcelain-style columns.
///
/// Returns `None` when the entry carries no valid UTF-8 path.
fn convert_status(entry: &git2::StatusEntry<'_>) -> Option<StatusEntry> {
    let s = entry.status();

    let (index, working_dir) = if s.is_ignored() {
        (FileStatus::Ignored, FileStatus::Ignored)
    } else if s.is_conflicted() {
        (FileStatus::Updated, FileStatus::Updated)
    } else if s.is_wt_new() && !s.intersects(INDEX_FLAGS) {
        (FileStatus::Untracked, FileStatus::Untracked)
    } else {
        (index_status(s), worktree_status(s))
    };

    let head_to_index = entry.head_to_index();
    let index_to_workdir = entry.index_to_workdir();

    // Destination path: the workdir side wins, it reflects the latest name.
    let path = index_to_workdir
        .as_ref()
        .and_then(|d| d.new_file().path())
        .or_else(|| head_to_index.as_ref().and_then(|d| d.new_file().path()))
        .map(|p| p.to_string_lossy().into_owned())
        .or_else(|| entry.path().map(str::to_owned))?;

    let orig_path = [head_to_index.as_ref(), index_to_workdir.as_ref()]
        .into_iter()
        .flatten()
        .find(|d| matches!(d.status(), Delta::Renamed | Delta::Copied))
        .and_then(|d| d.old_file().path())
        .map(|p| p.to_string_lossy().into_owned());

    let mut converted = StatusEntry::new(path, index, working_dir);
    converted.orig_path = orig_path;
    Some(converted)
}

const INDEX_FLAGS: git2::Status = git2::Status::INDEX_NEW
    .union(git2::Status::INDEX_MODIFIED)
    .union(git2::Status::INDEX_DELETED)
    .union(git2::Status::INDEX_RENAMED)
    .union(git2::Status::INDEX_TYPECHANGE);

fn index_status(s: git2::Status) -> FileStatus {
    if s.is_index_new() {
        FileStatus::Added
    } else if s.is_index_deleted() {
        FileStatus::Deleted
    } else if s.is_index_renamed() {
        FileStatus::Renamed
    } else if s.is_index_typechange() {
        FileStatus::TypeChanged
    } else if s.is_index_modified() {
        FileStatus::Modified
    } else {
        FileStatus::Unmodified
    }
}

fn worktree_status(s: git2::Status) -> FileStatus {
    if s.is_wt_new() {
        FileStatus::Untracked
    } else if s.is_wt_deleted() {
        FileStatus::Deleted
    } else if s.is_wt_renamed() {
        FileStatus::Renamed
    } else if s.is_wt_typechange() {
        FileStatus::TypeChanged
    } else if s.is_wt_modified() {
        FileStatus::Modified
    } else {
        FileStatus::Unmodified
    }
}
