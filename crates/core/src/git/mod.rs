//! Git repository access for dcosign.

pub mod client;

pub use client::{CommitInfo, GitClient, ResolvedRef};
