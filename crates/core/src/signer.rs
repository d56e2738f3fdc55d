//! Retroactive branch signing: the history rewriter.
//!
//! [`BranchSigner`] walks the commits a branch adds on top of a base
//! reference, appends sign-off trailers where they are missing, and rewrites
//! the branch to the new history while preserving parent topology, trees,
//! and timestamps. A backup pointer under `refs/dcosign/` records the last
//! signed tip so repeated runs only touch commits added since.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::errors::SignError;
use crate::git::{CommitInfo, GitClient};
use crate::identity::Identity;
use crate::signoff::SignoffProcessor;
use crate::trailer;

/// Namespace for backup pointers recorded after a rewrite.
const BACKUP_REF_PREFIX: &str = "refs/dcosign/";

// ---------------------------------------------------------------------------
// Report model
// ---------------------------------------------------------------------------

/// One line of a signing report: a commit that needs (or received) a
/// sign-off.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportEntry {
    pub short_id: String,
    pub author: Identity,
    pub subject: String,
}

/// Outcome of a signing run (or dry run) over a branch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewriteReport {
    /// Name of the branch that was (or would be) rewritten.
    pub branch: String,
    /// Commits needing sign-off, newest first.
    pub entries: Vec<ReportEntry>,
    /// Tip of the rewritten branch; `None` for a dry run.
    pub new_tip: Option<String>,
}

// ---------------------------------------------------------------------------
// Signer
// ---------------------------------------------------------------------------

/// Rewrites branch history so every commit carries a sign-off trailer.
pub struct BranchSigner<'a> {
    client: &'a GitClient,
    committer: Identity,
    behalf: Option<String>,
}

impl<'a> BranchSigner<'a> {
    pub fn new(client: &'a GitClient, committer: Identity, behalf: Option<String>) -> Self {
        Self {
            client,
            committer,
            behalf,
        }
    }

    /// Sign every unsigned commit `target` adds on top of `base`.
    ///
    /// `target` defaults to the checked-out branch, `base` to that branch's
    /// configured upstream. Without `confirmed` no ref is touched: the
    /// pending commits are reported through [`SignError::NotApproved`].
    /// With confirmation the branch is rewritten bottom-up and both the
    /// branch and its backup pointer advance to the new tip.
    ///
    /// Failures before the rewrite leave the repository untouched; a failure
    /// during it leaves only unreachable objects behind, never a partially
    /// moved branch.
    #[instrument(skip(self))]
    pub fn sign(
        &self,
        target: Option<&str>,
        base: Option<&str>,
        confirmed: bool,
    ) -> Result<RewriteReport, SignError> {
        // -------------------------------------------------------------------
        // Resolve the range
        // -------------------------------------------------------------------
        let branch = match target {
            Some(name) => name.to_string(),
            None => self.client.current_branch()?,
        };
        let base_name = match base {
            Some(name) => name.to_string(),
            None => self.client.upstream_branch(&branch)?,
        };
        let target_ref = self.client.resolve_ref(&branch)?;
        let base_ref = self.client.resolve_ref(&base_name)?;
        if target_ref.refname == base_ref.refname {
            return Err(SignError::InvalidRange(target_ref.refname));
        }
        info!(branch = %branch, base = %base_name, "resolved signing range");

        // -------------------------------------------------------------------
        // Backup pointer gating
        // -------------------------------------------------------------------
        let backup_ref = backup_refname(&target_ref.refname);
        let backup = self.client.reference_target(&backup_ref)?;
        let mut exclude = vec![base_ref.target.clone()];
        if let Some(backup_tip) = &backup {
            if !confirmed {
                return Err(SignError::BackupPresent(backup_ref));
            }
            if !self.client.is_ancestor(backup_tip, &target_ref.target)? {
                return Err(SignError::BackupDiverged {
                    branch,
                    backup: backup_ref,
                });
            }
            debug!(backup = %backup_tip, "resuming after backup pointer");
            exclude.push(backup_tip.clone());
        }

        // -------------------------------------------------------------------
        // Collect and vet candidates
        // -------------------------------------------------------------------
        let candidates = self.client.commits_between(&target_ref.target, &exclude)?;
        let unsigned: Vec<&CommitInfo> = candidates
            .iter()
            .filter(|c| !trailer::contains_signoff(&c.message))
            .collect();
        if unsigned.is_empty() {
            return Err(SignError::NothingToSign(branch));
        }

        if self.behalf.is_none() {
            if let Some(other) = unsigned
                .iter()
                .find(|c| !self.committer.same_author(&c.author))
            {
                return Err(SignError::UnauthorizedAuthor {
                    branch,
                    author: other.author.to_string(),
                });
            }
        }

        let entries: Vec<ReportEntry> = unsigned
            .iter()
            .rev()
            .map(|c| ReportEntry {
                short_id: c.short_id.clone(),
                author: c.author.clone(),
                subject: c.subject.clone(),
            })
            .collect();

        if !confirmed {
            info!(pending = entries.len(), "dry run, not rewriting");
            return Err(SignError::NotApproved(RewriteReport {
                branch,
                entries,
                new_tip: None,
            }));
        }

        // -------------------------------------------------------------------
        // Rewrite oldest to newest
        // -------------------------------------------------------------------
        // New commits stay dangling until the whole chain exists; the refs
        // only move once every object has been created.
        let processor = SignoffProcessor::new(self.committer.clone(), self.behalf.clone());
        let mut rewritten: HashMap<String, String> = HashMap::new();
        for commit in &candidates {
            let needs_signoff = !trailer::contains_signoff(&commit.message);
            let new_parents: Vec<String> = commit
                .parent_ids
                .iter()
                .map(|p| rewritten.get(p).cloned().unwrap_or_else(|| p.clone()))
                .collect();
            if !needs_signoff && new_parents == commit.parent_ids {
                // Untouched and no rewritten ancestor: keeps its identity.
                continue;
            }

            let message = if needs_signoff {
                processor.process(&commit.message, &commit.author)?
            } else {
                commit.message.clone()
            };
            let new_id = self
                .client
                .rewrite_commit(&commit.id, &message, &new_parents)?;
            rewritten.insert(commit.id.clone(), new_id);
        }

        let new_tip = rewritten
            .get(&target_ref.target)
            .cloned()
            .unwrap_or_else(|| target_ref.target.clone());

        // Branch first, backup second: if the second update never happens,
        // the next run walks the already-signed commits and reports nothing
        // to sign instead of double-signing.
        self.client
            .set_reference(&target_ref.refname, &new_tip, "dcosign: sign branch")?;
        self.client
            .force_reference(&backup_ref, &new_tip, "dcosign: backup pointer")?;
        info!(branch = %branch, new_tip = %new_tip, signed = entries.len(), "branch signed");

        Ok(RewriteReport {
            branch,
            entries,
            new_tip: Some(new_tip),
        })
    }
}

/// Backup pointer name for a branch refname.
fn backup_refname(refname: &str) -> String {
    let short = refname.strip_prefix("refs/heads/").unwrap_or(refname);
    format!("{}{}", BACKUP_REF_PREFIX, short)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backup_refname_strips_heads_prefix() {
        assert_eq!(backup_refname("refs/heads/main"), "refs/dcosign/main");
        assert_eq!(
            backup_refname("refs/heads/feature/x"),
            "refs/dcosign/feature/x"
        );
    }
}
