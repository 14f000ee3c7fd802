//! Changed-file sets for a git working copy.
//!
//! `branchdiff` answers one question: which files differ between the
//! remote's default branch and what is in front of me right now? The answer
//! is the union of the commits made since the branch diverged and the
//! uncommitted changes in the working tree, as absolute paths.
//!
//! # Key types
//!
//! - [`RepoHandle`]: a version-gated connection to one repository. All
//!   resolution operations hang off it; clones share the gate.
//! - [`Vcs`]: the backend contract. [`LibGit2`] (in-process, the default)
//!   and [`GitCli`] (spawns `git`) implement it.
//! - [`ChangeSet`]: a deduplicated, ordered set of absolute paths.
//! - [`CommittedDiff`]: strategy for the committed half: [`RangeDiff`]
//!   (`from...to`) or [`MergeBaseWalk`] (explicit merge base + tree walk).
//! - [`Error`]: one variant per failure class, each tagged with its
//!   [`Stage`].
//!
//! # Quick example
//!
//! ```rust,no_run
//! use branchdiff::{OpenOptions, RepoHandle};
//!
//! let repo = RepoHandle::open(".", OpenOptions::default());
//! println!("default branch: {}", repo.default_branch().unwrap());
//! for path in &repo.changes_since_head().unwrap() {
//!     println!("{}", path.display());
//! }
//! ```

pub mod branch;
pub mod changes;
pub mod cli;
pub mod error;
pub mod filter;
pub mod glob;
pub mod libgit;
pub mod merge_base;
pub mod paths;
pub mod range;
pub mod repo;
pub mod status;
pub mod tree;
pub mod types;
pub mod vcs;
pub mod version;

// Re-export primary public types at crate root.
pub use changes::{
    default_branch_diff, default_branch_diff_by_ref, deployable_classes, diff_range,
    local_changes, CommittedDiff,
};
pub use cli::GitCli;
pub use error::{Error, Result, Stage, VcsError};
pub use filter::{AllPaths, PathFilter, PathScope};
pub use libgit::LibGit2;
pub use merge_base::{MergeBaseWalk, WalkOptions};
pub use range::RangeDiff;
pub use repo::RepoHandle;
pub use status::{DeployQuery, StatusQuery};
pub use types::*;
pub use vcs::Vcs;
