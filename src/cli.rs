//! [`Vcs`] adapter that drives the `git` executable.
//!
//! All listings are requested NUL-delimited (`-z`) so file names containing
//! whitespace or newlines survive parsing.

use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::str::FromStr;

use git2::Oid;
use path_clean::PathClean;

use crate::error::VcsError;
use crate::paths::split_nul;
use crate::types::{FileStatus, FileType, StatusEntry, ToolVersion, TreeEntry, VersionPolicy, VersionTriple};
use crate::vcs::Vcs;

/// A [`Vcs`] adapter that spawns `git` once per operation.
#[derive(Debug, Clone)]
pub struct GitCli {
    dir: PathBuf,
    program: OsString,
}

impl GitCli {
    /// Use the `git` found on `PATH`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self::with_program(dir, "git")
    }

    /// Use a specific executable.
    pub fn with_program(dir: impl Into<PathBuf>, program: impl Into<OsString>) -> Self {
        Self {
            dir: dir.into(),
            program: program.into(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn command<I, S>(&self, args: I) -> Command
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let mut cmd = Command::new(&self.program);
        cmd.current_dir(&self.dir)
            .env("GIT_OPTIONAL_LOCKS", "0")
            .env("LC_ALL", "C")
            .args(args);
        cmd
    }

    fn output<I, S>(&self, args: I) -> Result<Output, VcsError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let mut cmd = self.command(args);
        log::trace!("running {:?}", cmd);
        cmd.output().map_err(VcsError::Io)
    }

    /// Run and return stdout, failing on a non-zero exit.
    fn run<I, S>(&self, args: I) -> Result<Vec<u8>, VcsError>
    where
        I: IntoIterator<Item = S> + Clone,
        S: AsRef<OsStr>,
    {
        let out = self.output(args.clone())?;
        if out.status.success() {
            return Ok(out.stdout);
        }
        Err(command_error(args, &out))
    }

    fn run_text<I, S>(&self, args: I) -> Result<String, VcsError>
    where
        I: IntoIterator<Item = S> + Clone,
        S: AsRef<OsStr>,
    {
        let stdout = self.run(args)?;
        Ok(String::from_utf8_lossy(&stdout).trim().to_string())
    }

    fn run_oid(&self, spec: &str) -> Result<Oid, VcsError> {
        let text = self.run_text(["rev-parse", "--verify", spec])?;
        Oid::from_str(&text).map_err(|_| VcsError::parse("object id", text))
    }
}

fn command_error<I, S>(args: I, out: &Output) -> VcsError
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let command = std::iter::once("git".to_string())
        .chain(args.into_iter().map(|a| a.as_ref().to_string_lossy().into_owned()))
        .collect::<Vec<_>>()
        .join(" ");
    VcsError::Command {
        command,
        status: out.status.to_string(),
        stderr: String::from_utf8_lossy(&out.stderr).trim().to_string(),
    }
}

impl Vcs for GitCli {
    const DEFAULT_POLICY: VersionPolicy = VersionPolicy::minor(2, 20);

    fn version(&self) -> Result<ToolVersion, VcsError> {
        let out = match Command::new(&self.program).arg("--version").output() {
            Ok(out) => out,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(ToolVersion::missing());
            }
            Err(e) => return Err(VcsError::Io(e)),
        };
        if !out.status.success() {
            return Err(command_error(["--version"], &out));
        }
        let text = String::from_utf8_lossy(&out.stdout);
        Ok(ToolVersion::installed(parse_version(&text)?))
    }

    fn symbolic_ref(&self, name: &str) -> Result<String, VcsError> {
        self.run_text(["symbolic-ref", "--short", name])
    }

    fn diff_names(&self, from: &str, to: &str) -> Result<Vec<String>, VcsError> {
        let range = format!("{}...{}", from, to);
        let stdout = self.run(["diff", "--name-only", "-z", range.as_str(), "--"])?;
        Ok(split_nul(&stdout))
    }

    fn status(&self, git_dir: Option<&Path>) -> Result<Vec<StatusEntry>, VcsError> {
        let mut args: Vec<OsString> = Vec::new();
        if let Some(dir) = git_dir {
            let mut git_dir_arg = OsString::from("--git-dir=");
            git_dir_arg.push(dir);
            let mut work_tree_arg = OsString::from("--work-tree=");
            work_tree_arg.push(&self.dir);
            args.push(git_dir_arg);
            args.push(work_tree_arg);
        }
        args.extend(
            ["status", "--porcelain=v1", "-z", "--untracked-files=all"]
                .into_iter()
                .map(OsString::from),
        );
        let stdout = self.run(args)?;
        parse_porcelain(&stdout)
    }

    fn root(&self) -> Result<PathBuf, VcsError> {
        let text = self.run_text(["rev-parse", "--show-toplevel"])?;
        Ok(PathBuf::from(text).clean())
    }

    fn merge_base(&self, a: Oid, b: Oid) -> Result<Option<Oid>, VcsError> {
        let (a, b) = (a.to_string(), b.to_string());
        let args = ["merge-base", a.as_str(), b.as_str()];
        let out = self.output(args)?;
        let text = String::from_utf8_lossy(&out.stdout).trim().to_string();
        // exit 1 with no output: the histories share no commit
        if out.status.code() == Some(1) && text.is_empty() && out.stderr.is_empty() {
            return Ok(None);
        }
        if !out.status.success() {
            return Err(command_error(args, &out));
        }
        Oid::from_str(&text)
            .map(Some)
            .map_err(|_| VcsError::parse("object id", text))
    }

    fn resolve_ref(&self, reference: &str) -> Result<Oid, VcsError> {
        self.run_oid(&format!("{}^{{commit}}", reference))
    }

    fn commit_tree(&self, commit: Oid) -> Result<Oid, VcsError> {
        self.run_oid(&format!("{}^{{tree}}", commit))
    }

    fn read_tree(&self, tree: Oid) -> Result<Vec<TreeEntry>, VcsError> {
        let tree = tree.to_string();
        let stdout = self.run(["ls-tree", "-z", tree.as_str()])?;
        parse_ls_tree(&stdout)
    }
}

/// Extract the version from `git --version` output.
///
/// Accepts vendor suffixes such as `git version 2.39.3 (Apple Git-146)` or
/// `git version 2.45.1.windows.1`.
pub fn parse_version(text: &str) -> Result<VersionTriple, VcsError> {
    let token = text
        .split_whitespace()
        .find(|t| t.starts_with(|c: char| c.is_ascii_digit()))
        .ok_or_else(|| VcsError::parse("git version", text.trim()))?;
    let numeric: Vec<&str> = token
        .split('.')
        .take_while(|seg| !seg.is_empty() && seg.bytes().all(|b| b.is_ascii_digit()))
        .take(3)
        .collect();
    VersionTriple::from_str(&numeric.join("."))
        .map_err(|_| VcsError::parse("git version", text.trim()))
}

/// Parse `git status --porcelain=v1 -z` output.
///
/// Each record is `XY <path>`; rename and copy records are followed by an
/// extra field holding the source path.
pub fn parse_porcelain(output: &[u8]) -> Result<Vec<StatusEntry>, VcsError> {
    let mut entries = Vec::new();
    let mut fields = output.split(|b| *b == 0).filter(|f| !f.is_empty());

    while let Some(record) = fields.next() {
        let record = String::from_utf8_lossy(record);
        let mut chars = record.chars();
        let (x, y) = match (chars.next(), chars.next(), chars.next()) {
            (Some(x), Some(y), Some(' ')) => (x, y),
            _ => return Err(VcsError::parse("status record", record.to_string())),
        };
        let index = FileStatus::from_code(x)
            .ok_or_else(|| VcsError::parse("index status", record.to_string()))?;
        let working_dir = FileStatus::from_code(y)
            .ok_or_else(|| VcsError::parse("worktree status", record.to_string()))?;
        let path = chars.as_str().to_string();

        let mut entry = StatusEntry::new(path, index, working_dir);
        if entry.has_any(&[FileStatus::Renamed, FileStatus::Copied]) {
            let orig = fields
                .next()
                .ok_or_else(|| VcsError::parse("rename source", record.to_string()))?;
            entry = entry.renamed_from(String::from_utf8_lossy(orig));
        }
        entries.push(entry);
    }
    Ok(entries)
}

/// Parse `git ls-tree -z <tree>` output: `<mode> <type> <oid>\t<name>`.
pub fn parse_ls_tree(output: &[u8]) -> Result<Vec<TreeEntry>, VcsError> {
    let mut entries = Vec::new();
    for record in output.split(|b| *b == 0).filter(|r| !r.is_empty()) {
        let record = String::from_utf8_lossy(record);
        let (meta, name) = record
            .split_once('\t')
            .ok_or_else(|| VcsError::parse("tree entry", record.to_string()))?;
        let mut parts = meta.split(' ');
        let (mode, kind, oid) = match (parts.next(), parts.next(), parts.next()) {
            (Some(mode), Some(kind), Some(oid)) => (mode, kind, oid),
            _ => return Err(VcsError::parse("tree entry", record.to_string())),
        };
        let mode = u32::from_str_radix(mode, 8)
            .map_err(|_| VcsError::parse("tree entry mode", record.to_string()))?;
        let file_type = FileType::from_mode(mode).unwrap_or(match kind {
            "tree" => FileType::Tree,
            "commit" => FileType::Commit,
            _ => FileType::Blob,
        });
        let oid = Oid::from_str(oid).map_err(|_| VcsError::parse("object id", oid))?;
        entries.push(TreeEntry {
            name: name.to_string(),
            oid,
            file_type,
        });
    }
    Ok(entries)
}
