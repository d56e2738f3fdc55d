//! Error types for the dcosign core library.
//!
//! Each subsystem has its own error type derived with `thiserror`, and a
//! top-level [`CoreError`] enum unifies them all for callers that want a
//! single error type.

use thiserror::Error;

use crate::signer::RewriteReport;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Unified error type for the entire core library.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Git(#[from] GitError),

    #[error(transparent)]
    Hook(#[from] HookError),

    #[error(transparent)]
    Signoff(#[from] SignoffError),

    #[error(transparent)]
    Sign(#[from] SignError),
}

// ---------------------------------------------------------------------------
// Git errors
// ---------------------------------------------------------------------------

/// Errors from local Git (git2) operations.
#[derive(Debug, Error)]
pub enum GitError {
    /// The path is not inside a git repository.
    #[error("git repository not found at '{0}'")]
    RepositoryNotFound(String),

    /// The repository metadata directory cannot be written.
    #[error("git repository is read-only at '{0}'")]
    RepositoryReadOnly(String),

    /// A ref (branch, tag, SHA) could not be resolved.
    #[error("git ref not found: {0}")]
    RefNotFound(String),

    /// The branch has no configured upstream to use as a base.
    #[error("branch '{0}' has no upstream; pass a base branch explicitly")]
    NoUpstream(String),

    /// HEAD is detached or unborn, so there is no current branch.
    #[error("no branch is currently checked out: {0}")]
    NoCurrentBranch(String),

    /// `user.name` / `user.email` are not configured.
    #[error("committer identity is not configured: {0}")]
    IdentityUnset(String),

    /// A `git2` library error.
    #[error("git2 error: {0}")]
    Git2Error(#[from] git2::Error),

    /// Generic I/O wrapper.
    #[error("git I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Hook errors
// ---------------------------------------------------------------------------

/// Errors from commit-msg hook installation and removal.
#[derive(Debug, Error)]
pub enum HookError {
    /// Installing would overwrite a hook from another tool.
    #[error("commit-msg hook at '{0}' was not installed by dcosign")]
    Conflict(String),

    /// Removing would delete a hook from another tool.
    #[error("hook is external, not removing: '{0}'")]
    ExternalHook(String),

    /// Installation requires explicit approval.
    #[error("not enabling without approval (pass -y to confirm)")]
    NotApproved,

    /// Underlying Git error locating the repository.
    #[error("hook Git error: {0}")]
    GitError(#[from] GitError),

    /// Generic I/O wrapper.
    #[error("hook I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Sign-off errors
// ---------------------------------------------------------------------------

/// Errors from single-message sign-off processing.
#[derive(Debug, Error)]
pub enum SignoffError {
    /// The committer is not the commit's author and no approval URL was given.
    #[error(
        "committer '{committer}' does not match author '{author}' \
         (pass --behalf to sign on another author's behalf)"
    )]
    AuthorMismatch {
        committer: String,
        author: String,
    },
}

// ---------------------------------------------------------------------------
// Branch signing errors
// ---------------------------------------------------------------------------

/// Errors from the branch history rewriter.
#[derive(Debug, Error)]
pub enum SignError {
    /// Base and target resolve to the same reference.
    #[error("cannot use '{0}' for both the base and target branch")]
    InvalidRange(String),

    /// The range is empty once signed and backed-up commits are excluded.
    #[error("nothing to sign on '{0}': every commit in range is already signed or backed up")]
    NothingToSign(String),

    /// The range contains other authors' commits and no approval URL was given.
    #[error(
        "branch '{branch}' has commits authored by '{author}'; \
         pass --behalf to sign on their behalf"
    )]
    UnauthorizedAuthor {
        branch: String,
        author: String,
    },

    /// A backup pointer from a previous run exists and no confirmation was given.
    #[error("backup pointer '{0}' exists from a previous run (pass -y to sign newer commits)")]
    BackupPresent(String),

    /// The backup pointer is no longer an ancestor of the branch tip.
    #[error(
        "backup pointer '{backup}' is not an ancestor of '{branch}'; \
         the branch was rewritten outside dcosign"
    )]
    BackupDiverged {
        branch: String,
        backup: String,
    },

    /// The rewrite was not confirmed; carries the pending report.
    #[error("refusing to rewrite history without approval (pass -y to confirm)")]
    NotApproved(RewriteReport),

    /// Sign-off processing failed for a commit in the range.
    #[error("sign-off failed: {0}")]
    SignoffError(#[from] SignoffError),

    /// Underlying Git error during the rewrite.
    #[error("sign Git error: {0}")]
    GitError(#[from] GitError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_messages() {
        let err = GitError::RepositoryNotFound("/tmp/repo".into());
        assert_eq!(err.to_string(), "git repository not found at '/tmp/repo'");

        let err = SignError::InvalidRange("refs/heads/main".into());
        assert_eq!(
            err.to_string(),
            "cannot use 'refs/heads/main' for both the base and target branch"
        );

        let err = SignoffError::AuthorMismatch {
            committer: "other@example.com".into(),
            author: "asmithee@example.com".into(),
        };
        assert!(err.to_string().contains("does not match author"));

        let err = SignError::BackupDiverged {
            branch: "feature".into(),
            backup: "refs/dcosign/feature".into(),
        };
        assert!(err.to_string().contains("not an ancestor"));

        let err = HookError::NotApproved;
        assert!(err.to_string().starts_with("not enabling without approval"));
    }

    #[test]
    fn test_core_error_from_subsystem() {
        let git_err = GitError::RefNotFound("feature".into());
        let core_err: CoreError = git_err.into();
        assert!(matches!(core_err, CoreError::Git(_)));

        let hook_err = HookError::NotApproved;
        let core_err: CoreError = hook_err.into();
        assert!(matches!(core_err, CoreError::Hook(_)));
    }
}
