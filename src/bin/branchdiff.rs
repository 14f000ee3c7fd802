use std::collections::BTreeSet;
use std::path::PathBuf;
use std::process::ExitCode;

use branchdiff::{
    ChangeSet, DeployQuery, MergeBaseWalk, OpenOptions, PathScope, RepoHandle, StatusQuery, Vcs,
    WalkOptions,
};
use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(
    name = "branchdiff",
    version,
    about = "List files changed since the default branch",
    long_about = "Lists files changed between the remote's default branch and the working tree: \
    commits made since the branch diverged plus uncommitted changes, as absolute paths."
)]
struct Cli {
    /// Run as if started in this directory
    #[arg(short = 'C', long = "dir", global = true, default_value = ".")]
    dir: PathBuf,

    /// Remote whose HEAD names the default branch
    #[arg(long, global = true, env = "BRANCHDIFF_REMOTE", default_value = "origin")]
    remote: String,

    /// How to talk to git
    #[arg(long, global = true, env = "BRANCHDIFF_BACKEND", value_enum, default_value_t = Backend::Libgit2)]
    backend: Backend,

    /// Print results as a JSON array
    #[arg(long, global = true)]
    json: bool,

    /// More logging (-v debug, -vv trace). RUST_LOG takes precedence.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Backend {
    /// In-process libgit2
    Libgit2,
    /// The git executable on PATH
    Cli,
}

#[derive(Subcommand)]
enum Commands {
    /// Changes since the default branch up to REF, plus local changes
    Since {
        #[arg(default_value = "HEAD")]
        reference: String,
        /// Anchor at the merge base with an explicit tree walk
        #[arg(long)]
        walk: bool,
    },
    /// Range diff FROM...TO plus local changes
    Between { from: String, to: String },
    /// Committed changes on TO since it diverged from FROM (relative paths)
    Range { from: String, to: String },
    /// Uncommitted changes (relative paths)
    Local {
        /// Keep deleted files
        #[arg(long)]
        include_deleted: bool,
    },
    /// Tree-walk changes between merge-base(FROM, TO) and TO (relative paths)
    MergeBase {
        from: String,
        to: String,
        /// Only report files under this directory
        #[arg(long)]
        under: Option<String>,
        /// Only report file names matching this glob
        #[arg(long)]
        pattern: Option<String>,
        #[arg(long)]
        include_deleted: bool,
    },
    /// Files the org's source tracking considers deployable
    Deployable {
        org_id: String,
        #[arg(long, default_value = ".cls")]
        extension: String,
    },
    /// Print the remote's default branch
    DefaultBranch,
    /// Print the backend version after checking it against the policy
    Version,
}

enum Output {
    Paths(ChangeSet),
    Names(BTreeSet<String>),
    Text(String),
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let options = OpenOptions {
        remote: cli.remote.clone(),
        ..OpenOptions::default()
    };
    let result = match cli.backend {
        Backend::Libgit2 => run(&RepoHandle::open(&cli.dir, options), cli.command),
        Backend::Cli => run(&RepoHandle::open_cli(&cli.dir, options), cli.command),
    };

    match result.and_then(|out| print(out, cli.json).map_err(|e| e.to_string())) {
        Ok(()) => ExitCode::SUCCESS,
        Err(msg) => {
            eprintln!("branchdiff: {}", msg);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

fn run<V: Vcs>(repo: &RepoHandle<V>, command: Commands) -> Result<Output, String> {
    let stage = |e: branchdiff::Error| format!("{} failed: {}", e.stage(), e);

    let out = match command {
        Commands::Since { reference, walk } => {
            let set = if walk {
                branchdiff::changes::changes_since_with(
                    repo,
                    &reference,
                    &MergeBaseWalk::default(),
                )
            } else {
                repo.changes_since(&reference)
            };
            Output::Paths(set.map_err(stage)?)
        }
        Commands::Between { from, to } => {
            Output::Paths(repo.changes_between(&from, &to).map_err(stage)?)
        }
        Commands::Range { from, to } => {
            Output::Names(repo.range_diff(&from, &to).map_err(stage)?)
        }
        Commands::Local { include_deleted } => {
            let mut query = StatusQuery::new();
            if include_deleted {
                query = query.exclude(&[branchdiff::FileStatus::Ignored]);
            }
            Output::Names(repo.local_changes(&query).map_err(stage)?)
        }
        Commands::MergeBase {
            from,
            to,
            under,
            pattern,
            include_deleted,
        } => {
            let mut options = WalkOptions::new().include_deleted(include_deleted);
            if under.is_some() || pattern.is_some() {
                let mut scope = PathScope::under(under.as_deref().unwrap_or(""));
                if let Some(pattern) = &pattern {
                    scope = scope.with_pattern(pattern);
                }
                options = options.filter(scope);
            }
            Output::Names(repo.merge_base_changes(&from, &to, &options).map_err(stage)?)
        }
        Commands::Deployable { org_id, extension } => {
            let query = DeployQuery::new(org_id).extension(extension);
            Output::Paths(repo.deployable(&query).map_err(stage)?)
        }
        Commands::DefaultBranch => Output::Text(repo.default_branch().map_err(stage)?),
        Commands::Version => {
            repo.vcs().map_err(stage)?;
            let version = repo
                .checked_version()
                .map(|v| v.to_string())
                .unwrap_or_default();
            Output::Text(version)
        }
    };
    Ok(out)
}

fn print(out: Output, json: bool) -> serde_json::Result<()> {
    if json {
        let text = match &out {
            Output::Paths(set) => serde_json::to_string_pretty(set)?,
            Output::Names(names) => serde_json::to_string_pretty(names)?,
            Output::Text(text) => serde_json::to_string(text)?,
        };
        println!("{}", text);
        return Ok(());
    }

    match out {
        Output::Paths(set) => {
            for path in &set {
                println!("{}", path.display());
            }
        }
        Output::Names(names) => {
            for name in names {
                println!("{}", name);
            }
        }
        Output::Text(text) => println!("{}", text),
    }
    Ok(())
}
