//! dcosign core library.
//!
//! This crate provides the building blocks for DCO sign-off automation:
//! commit-message trailer parsing, sign-off processing, commit-msg hook
//! management, repository access, and the branch history rewriter.

pub mod errors;
pub mod git;
pub mod hooks;
pub mod identity;
pub mod signer;
pub mod signoff;
pub mod trailer;

// Re-exports for convenience.
pub use errors::CoreError;
pub use git::GitClient;
pub use identity::Identity;
pub use signer::{BranchSigner, RewriteReport};
pub use signoff::SignoffProcessor;
