#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Condvar, Mutex};
use std::time::Duration;

use branchdiff::{
    OpenOptions, RepoHandle, StatusEntry, ToolVersion, TreeEntry, Vcs, VcsError, VersionPolicy,
    VersionTriple,
};
use git2::{IndexAddOption, Oid, Repository, RepositoryInitOptions, Signature};
use tempfile::TempDir;

// ---------------------------------------------------------------------------
// Throw-away repositories
// ---------------------------------------------------------------------------

/// A non-bare repository in a temp directory, initialized on `main`.
pub struct Fixture {
    pub dir: TempDir,
    pub repo: Repository,
}

impl Fixture {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let repo = init_repo(dir.path());
        Self { dir, repo }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn write(&self, rel: &str, content: &str) {
        write_file(self.path(), rel, content);
    }

    pub fn remove(&self, rel: &str) {
        std::fs::remove_file(self.path().join(rel)).unwrap();
    }

    pub fn rename(&self, from: &str, to: &str) {
        std::fs::rename(self.path().join(from), self.path().join(to)).unwrap();
    }

    /// Stage everything (deletions included) and commit on `HEAD`.
    pub fn commit_all(&self, message: &str) -> Oid {
        commit_all(&self.repo, message)
    }

    /// Point `origin/main` at the current `HEAD` and make it the remote's
    /// default branch.
    pub fn publish_main(&self) {
        let head = self.repo.head().unwrap().peel_to_commit().unwrap();
        self.repo
            .reference("refs/remotes/origin/main", head.id(), true, "publish")
            .unwrap();
        self.repo
            .reference_symbolic(
                "refs/remotes/origin/HEAD",
                "refs/remotes/origin/main",
                true,
                "remote head",
            )
            .unwrap();
    }

    /// Create `name` at `HEAD` and switch to it. The working tree is untouched.
    pub fn checkout_new_branch(&self, name: &str) {
        let head = self.repo.head().unwrap().peel_to_commit().unwrap();
        self.repo.branch(name, &head, false).unwrap();
        self.repo.set_head(&format!("refs/heads/{}", name)).unwrap();
    }

    /// Commit `files` as a root commit on `branch` without touching `HEAD`.
    pub fn orphan_commit(&self, branch: &str, files: &[(&str, &str)]) -> Oid {
        let mut builder = self.repo.treebuilder(None).unwrap();
        for (name, content) in files {
            let blob = self.repo.blob(content.as_bytes()).unwrap();
            builder.insert(*name, blob, 0o100644).unwrap();
        }
        let tree = self.repo.find_tree(builder.write().unwrap()).unwrap();
        let sig = signature();
        let oid = self
            .repo
            .commit(None, &sig, &sig, "orphan", &tree, &[])
            .unwrap();
        self.repo
            .reference(&format!("refs/heads/{}", branch), oid, true, "orphan")
            .unwrap();
        oid
    }

    /// Commit top-level `files` on top of `branch` without touching `HEAD`
    /// or the working tree.
    pub fn commit_on(&self, branch: &str, files: &[(&str, &str)]) -> Oid {
        let refname = format!("refs/heads/{}", branch);
        let parent = self
            .repo
            .find_reference(&refname)
            .unwrap()
            .peel_to_commit()
            .unwrap();
        let base = parent.tree().unwrap();
        let mut builder = self.repo.treebuilder(Some(&base)).unwrap();
        for (name, content) in files {
            let blob = self.repo.blob(content.as_bytes()).unwrap();
            builder.insert(*name, blob, 0o100644).unwrap();
        }
        let tree = self.repo.find_tree(builder.write().unwrap()).unwrap();
        let sig = signature();
        self.repo
            .commit(Some(refname.as_str()), &sig, &sig, "side commit", &tree, &[&parent])
            .unwrap()
    }

    pub fn handle(&self) -> RepoHandle {
        RepoHandle::open(self.path(), OpenOptions::default())
    }

    /// The working-tree root as the backend reports it.
    pub fn root(&self) -> PathBuf {
        self.handle().backend().root().unwrap()
    }
}

/// A committed `main` with `tracked.txt`, published as `origin/main`, and a
/// checked-out `dev` branch at the same commit.
pub fn repo_on_dev() -> Fixture {
    let fx = Fixture::new();
    fx.write("tracked.txt", "one\n");
    fx.write("src/lib.txt", "lib\n");
    fx.commit_all("initial");
    fx.publish_main();
    fx.checkout_new_branch("dev");
    fx
}

pub fn init_repo(path: &Path) -> Repository {
    let mut opts = RepositoryInitOptions::new();
    opts.initial_head("main");
    let repo = Repository::init_opts(path, &opts).unwrap();
    {
        let mut config = repo.config().unwrap();
        config.set_str("user.name", "Test").unwrap();
        config.set_str("user.email", "test@example.com").unwrap();
    }
    repo
}

pub fn write_file(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, content).unwrap();
}

pub fn commit_all(repo: &Repository, message: &str) -> Oid {
    let mut index = repo.index().unwrap();
    index
        .add_all(["*"].iter(), IndexAddOption::DEFAULT, None)
        .unwrap();
    index.update_all(["*"].iter(), None).unwrap();
    index.write().unwrap();
    let tree = repo.find_tree(index.write_tree().unwrap()).unwrap();
    let sig = signature();
    let parent = repo.head().ok().and_then(|h| h.peel_to_commit().ok());
    let parents: Vec<&git2::Commit> = parent.iter().collect();
    repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)
        .unwrap()
}

fn signature() -> Signature<'static> {
    Signature::now("Test", "test@example.com").unwrap()
}

/// Whether a usable `git` executable is on `PATH`.
pub fn git_available() -> bool {
    std::process::Command::new("git")
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

// ---------------------------------------------------------------------------
// Scripted backend
// ---------------------------------------------------------------------------

/// A [`Vcs`] whose answers are fixed up front. Counts version queries.
#[derive(Debug, Default)]
pub struct FakeVcs {
    /// `None` reports the tool as missing.
    pub version: Option<VersionTriple>,
    pub version_error: bool,
    /// Delay inside `version()`, to widen first-use races.
    pub version_delay: Option<Duration>,
    /// Target of `refs/remotes/origin/HEAD`; `None` means absent.
    pub remote_head: Option<String>,
    pub diff: Vec<String>,
    pub diff_error: Option<String>,
    pub status: Vec<StatusEntry>,
    pub status_error: Option<String>,
    pub version_calls: AtomicUsize,
    pub diff_ranges: Mutex<Vec<(String, String)>>,
    /// When set, `diff_names` and `status` each wait here for the other.
    pub rendezvous: Option<Rendezvous>,
}

/// Meeting point for two calls that must be in flight at the same time.
#[derive(Debug, Default)]
pub struct Rendezvous {
    arrived: Mutex<usize>,
    all_here: Condvar,
}

impl Rendezvous {
    /// Wait up to `timeout` for the other party. `false` if it never came.
    pub fn meet(&self, timeout: Duration) -> bool {
        let mut arrived = self.arrived.lock().unwrap();
        *arrived += 1;
        if *arrived >= 2 {
            self.all_here.notify_all();
            return true;
        }
        let (arrived, _) = self
            .all_here
            .wait_timeout_while(arrived, timeout, |n| *n < 2)
            .unwrap();
        *arrived >= 2
    }
}

impl FakeVcs {
    pub fn installed(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            version: Some(VersionTriple::new(major, minor, patch)),
            ..Default::default()
        }
    }

    pub fn version_calls(&self) -> usize {
        self.version_calls.load(Ordering::SeqCst)
    }

    fn wait_for_peer(&self, who: &str) -> Result<(), VcsError> {
        match &self.rendezvous {
            Some(r) if !r.meet(Duration::from_secs(5)) => {
                Err(VcsError::not_found(format!("{} ran alone", who)))
            }
            _ => Ok(()),
        }
    }
}

pub const FAKE_ROOT: &str = "/work/repo";

impl Vcs for FakeVcs {
    const DEFAULT_POLICY: VersionPolicy = VersionPolicy::minor(2, 20);

    fn version(&self) -> Result<ToolVersion, VcsError> {
        self.version_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.version_delay {
            std::thread::sleep(delay);
        }
        if self.version_error {
            return Err(VcsError::parse("version", "garbage"));
        }
        Ok(match self.version {
            Some(v) => ToolVersion::installed(v),
            None => ToolVersion::missing(),
        })
    }

    fn symbolic_ref(&self, name: &str) -> Result<String, VcsError> {
        self.remote_head
            .clone()
            .ok_or_else(|| VcsError::not_found(format!("reference '{}' not found", name)))
    }

    fn diff_names(&self, from: &str, to: &str) -> Result<Vec<String>, VcsError> {
        self.diff_ranges
            .lock()
            .unwrap()
            .push((from.to_string(), to.to_string()));
        self.wait_for_peer("diff")?;
        match &self.diff_error {
            Some(msg) => Err(VcsError::not_found(msg.clone())),
            None => Ok(self.diff.clone()),
        }
    }

    fn status(&self, _git_dir: Option<&Path>) -> Result<Vec<StatusEntry>, VcsError> {
        self.wait_for_peer("status")?;
        match &self.status_error {
            Some(msg) => Err(VcsError::not_found(msg.clone())),
            None => Ok(self.status.clone()),
        }
    }

    fn root(&self) -> Result<PathBuf, VcsError> {
        Ok(PathBuf::from(FAKE_ROOT))
    }

    fn merge_base(&self, _a: Oid, _b: Oid) -> Result<Option<Oid>, VcsError> {
        Ok(None)
    }

    fn resolve_ref(&self, reference: &str) -> Result<Oid, VcsError> {
        Err(VcsError::not_found(reference))
    }

    fn commit_tree(&self, commit: Oid) -> Result<Oid, VcsError> {
        Err(VcsError::not_found(commit.to_string()))
    }

    fn read_tree(&self, tree: Oid) -> Result<Vec<TreeEntry>, VcsError> {
        Err(VcsError::not_found(tree.to_string()))
    }
}

pub fn fake_handle(vcs: FakeVcs) -> RepoHandle<FakeVcs> {
    RepoHandle::with_vcs(vcs, FAKE_ROOT, OpenOptions::default())
}
