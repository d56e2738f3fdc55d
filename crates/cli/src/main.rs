//! dcosign command-line tool.
//!
//! Provides subcommands for installing and removing the commit-msg hook,
//! processing a single commit message (as the hook, or as a message filter
//! for history rewrites), and retroactively signing a branch.

mod style;

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use dcosign_core::errors::SignError;
use dcosign_core::hooks::{self, HookStatus};
use dcosign_core::signer::{BranchSigner, RewriteReport};
use dcosign_core::signoff::SignoffProcessor;
use dcosign_core::{GitClient, Identity};

// ---------------------------------------------------------------------------
// CLI argument definitions
// ---------------------------------------------------------------------------

/// DCO sign-off automation for Git repositories.
#[derive(Parser, Debug)]
#[command(
    name = "dcosign",
    version,
    about = "Manage DCO sign-off trailers on Git commits"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Install the commit-msg hook that signs new commits.
    Enable {
        /// Approve the installation.
        #[arg(short = 'y', long = "yes")]
        yes: bool,
    },

    /// Remove the commit-msg hook if dcosign installed it.
    Disable,

    /// Ensure a commit message carries a sign-off trailer.
    ///
    /// With FILE (hook mode) the message file is rewritten in place and the
    /// author comes from GIT_AUTHOR_NAME / GIT_AUTHOR_EMAIL. Without it
    /// (filter mode) the message is read from stdin and written to stdout,
    /// suitable for `git filter-branch --msg-filter`.
    #[command(name = "process_commit_message")]
    ProcessCommitMessage {
        /// Path to the commit message file (omit to filter stdin to stdout).
        file: Option<PathBuf>,

        /// Path to the repository (defaults to the current directory).
        #[arg(long)]
        repo: Option<PathBuf>,

        /// Approval URL for signing on another author's behalf.
        #[arg(long)]
        behalf: Option<String>,
    },

    /// Rewrite a branch so every commit carries a sign-off trailer.
    Sign {
        /// Approve the history rewrite.
        #[arg(short = 'y', long = "yes")]
        yes: bool,

        /// Approval URL for signing on other authors' behalf.
        #[arg(short = 'b', long = "behalf")]
        behalf: Option<String>,

        /// Branch to sign (defaults to the checked-out branch).
        target_branch: Option<String>,

        /// Base reference excluded from signing (defaults to the upstream).
        base_branch: Option<String>,
    },
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> ExitCode {
    // Logs go to stderr; filter mode owns stdout.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Enable { yes } => cmd_enable(yes),
        Commands::Disable => cmd_disable(),
        Commands::ProcessCommitMessage { file, repo, behalf } => {
            cmd_process_commit_message(file.as_deref(), repo.as_deref(), behalf)
        }
        Commands::Sign {
            yes,
            behalf,
            target_branch,
            base_branch,
        } => cmd_sign(yes, behalf, target_branch.as_deref(), base_branch.as_deref()),
    }
}

// ---------------------------------------------------------------------------
// Subcommand implementations
// ---------------------------------------------------------------------------

fn cmd_enable(yes: bool) -> Result<()> {
    let client = open_client(None)?;
    let status = hooks::install(&client, yes)?;
    let message = match status {
        HookStatus::AlreadyInstalled => "commit-msg hook already installed",
        _ => "commit-msg hook installed",
    };
    println!("{}", style::success(message));
    Ok(())
}

fn cmd_disable() -> Result<()> {
    let client = open_client(None)?;
    match hooks::remove(&client)? {
        HookStatus::NotInstalled => {
            println!("{}", style::warn("no commit-msg hook installed"));
        }
        _ => println!("{}", style::success("commit-msg hook removed")),
    }
    Ok(())
}

fn cmd_process_commit_message(
    file: Option<&Path>,
    repo: Option<&Path>,
    behalf: Option<String>,
) -> Result<()> {
    let client = open_client(repo)?;
    let committer = client.committer_identity()?;
    let processor = SignoffProcessor::new(committer.clone(), behalf);

    match file {
        Some(path) => {
            // Hook mode: rewrite the message file in place.
            debug!(path = %path.display(), "processing commit message file");
            let message = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read '{}'", path.display()))?;
            let author = author_from_env().unwrap_or(committer);
            let processed = processor.process(&message, &author)?;
            if processed != message {
                std::fs::write(path, processed)
                    .with_context(|| format!("failed to write '{}'", path.display()))?;
            }
        }
        None => {
            // Filter mode: stdin to stdout.
            debug!("processing commit message from stdin");
            let mut message = String::new();
            std::io::stdin()
                .read_to_string(&mut message)
                .context("failed to read message from stdin")?;
            let processed = match std::env::var("GIT_COMMIT") {
                Ok(commit) => processor
                    .process(&message, &committer)
                    .with_context(|| format!("failed to sign commit {}", commit))?,
                Err(_) => processor.process(&message, &committer)?,
            };
            print!("{}", processed);
        }
    }
    Ok(())
}

fn cmd_sign(
    yes: bool,
    behalf: Option<String>,
    target: Option<&str>,
    base: Option<&str>,
) -> Result<()> {
    let client = open_client(None)?;
    let committer = client.committer_identity()?;
    let signer = BranchSigner::new(&client, committer, behalf);

    match signer.sign(target, base, yes) {
        Ok(report) => {
            print_report(&report, true);
            Ok(())
        }
        Err(SignError::NotApproved(report)) => {
            print_report(&report, false);
            Err(SignError::NotApproved(report).into())
        }
        Err(e) => Err(e.into()),
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn open_client(repo: Option<&Path>) -> Result<GitClient> {
    let start = match repo {
        Some(path) => path.to_path_buf(),
        None => std::env::current_dir().context("failed to determine current directory")?,
    };
    Ok(GitClient::discover(&start)?)
}

/// Author identity for hook mode, from git's hook environment.
fn author_from_env() -> Option<Identity> {
    let name = std::env::var("GIT_AUTHOR_NAME").ok()?;
    let email = std::env::var("GIT_AUTHOR_EMAIL").ok()?;
    Some(Identity::new(&name, &email))
}

fn print_report(report: &RewriteReport, signed: bool) {
    let heading = if signed {
        format!("Signed commits on '{}':", report.branch)
    } else {
        format!("Commits needing sign-off on '{}':", report.branch)
    };
    println!("{}", style::header(&heading));
    println!();
    for entry in &report.entries {
        println!(
            "  {}  {}  {}",
            style::dim(&entry.short_id),
            entry.author,
            entry.subject
        );
    }
    println!();
    if signed {
        let summary = format!("{} commit(s) signed", report.entries.len());
        println!("{}", style::success(&summary));
        if let Some(tip) = &report.new_tip {
            println!("{}", style::dim(&format!("branch tip is now {}", tip)));
        }
    } else {
        println!("{} commit(s) would be signed", report.entries.len());
    }
}
