use std::fmt;

use crate::types::VersionTriple;

/// Stage of change-set resolution an [`Error`] was raised in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    VersionGate,
    DefaultBranch,
    CommittedDiff,
    LocalChanges,
    MergeBase,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::VersionGate => "version gate",
            Self::DefaultBranch => "default branch",
            Self::CommittedDiff => "committed diff",
            Self::LocalChanges => "local changes",
            Self::MergeBase => "merge base",
        };
        f.write_str(name)
    }
}

/// All errors produced by branchdiff.
///
/// Each variant belongs to exactly one [`Stage`]. Failures reported by the
/// VCS adapter are wrapped once, at the stage boundary, and keep the
/// adapter's message as `cause`.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("\"git\" is not installed or available on the PATH")]
    NotInstalled,

    #[error("Unsupported version of git {found}. Min version must be {minimum}")]
    UnsupportedVersion {
        found: VersionTriple,
        minimum: VersionTriple,
    },

    #[error("Local branch operation failed. Cause: '{cause}'")]
    NoDefaultBranch { cause: String },

    #[error("Getting diff operation failed. Cause: '{cause}'")]
    DiffFailed { cause: String },

    #[error("Getting local changes operation failed. Cause: '{cause}'")]
    LocalChangeFailed { cause: String },

    #[error("No merge base found between {from} and {to}")]
    NoMergeBase { from: String, to: String },
}

pub type Result<T> = std::result::Result<T, Error>;

// ---------------------------------------------------------------------------
// Convenience constructors
// ---------------------------------------------------------------------------

impl Error {
    pub fn unsupported_version(found: VersionTriple, minimum: VersionTriple) -> Self {
        Self::UnsupportedVersion { found, minimum }
    }

    pub fn no_default_branch(cause: impl fmt::Display) -> Self {
        Self::NoDefaultBranch {
            cause: cause.to_string().trim().to_string(),
        }
    }

    pub fn diff_failed(cause: impl fmt::Display) -> Self {
        Self::DiffFailed {
            cause: cause.to_string().trim().to_string(),
        }
    }

    pub fn local_change_failed(cause: impl fmt::Display) -> Self {
        Self::LocalChangeFailed {
            cause: cause.to_string().trim().to_string(),
        }
    }

    pub fn no_merge_base(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self::NoMergeBase {
            from: from.into(),
            to: to.into(),
        }
    }

    /// The stage this error was raised in.
    pub fn stage(&self) -> Stage {
        match self {
            Self::NotInstalled | Self::UnsupportedVersion { .. } => Stage::VersionGate,
            Self::NoDefaultBranch { .. } => Stage::DefaultBranch,
            Self::DiffFailed { .. } => Stage::CommittedDiff,
            Self::LocalChangeFailed { .. } => Stage::LocalChanges,
            Self::NoMergeBase { .. } => Stage::MergeBase,
        }
    }

    /// The wrapped adapter message, if this error carries one.
    pub fn cause(&self) -> Option<&str> {
        match self {
            Self::NoDefaultBranch { cause }
            | Self::DiffFailed { cause }
            | Self::LocalChangeFailed { cause } => Some(cause),
            _ => None,
        }
    }
}

/// Errors raised by a [`Vcs`](crate::vcs::Vcs) adapter.
///
/// These never reach callers of the resolution functions directly; each
/// stage wraps them into its own [`Error`] variant.
#[derive(Debug, thiserror::Error)]
pub enum VcsError {
    #[error("{0}")]
    Git(#[from] git2::Error),

    #[error("{command} exited with {status}: {stderr}")]
    Command {
        command: String,
        status: String,
        stderr: String,
    },

    #[error("could not parse {what}: {input:?}")]
    Parse { what: &'static str, input: String },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl VcsError {
    pub fn parse(what: &'static str, input: impl Into<String>) -> Self {
        Self::Parse {
            what,
            input: input.into(),
        }
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }
}
