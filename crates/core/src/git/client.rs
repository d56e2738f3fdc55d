//! Local Git repository operations via `git2`.

use std::path::{Path, PathBuf};

use git2::{BranchType, Oid, Repository};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::errors::GitError;
use crate::identity::Identity;

/// High-level Git client wrapping a `git2::Repository`.
pub struct GitClient {
    repo: Repository,
    repo_path: PathBuf,
}

/// Information about a single commit in a signing range.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitInfo {
    pub id: String,
    pub short_id: String,
    pub message: String,
    pub author: Identity,
    pub subject: String,
    pub parent_ids: Vec<String>,
    pub commit_time: i64,
}

/// A resolved reference: canonical name plus the commit it points at.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolvedRef {
    pub refname: String,
    pub target: String,
}

impl GitClient {
    /// Open the repository containing `path`, searching upward like git does.
    pub fn discover<P: AsRef<Path>>(path: P) -> Result<Self, GitError> {
        let path = path.as_ref();
        debug!(path = %path.display(), "discovering git repository");
        let repo = Repository::discover(path)
            .map_err(|_| GitError::RepositoryNotFound(path.display().to_string()))?;
        let repo_path = repo.workdir().unwrap_or(repo.path()).to_path_buf();
        Ok(Self { repo, repo_path })
    }

    pub fn repo_path(&self) -> &Path {
        &self.repo_path
    }

    pub fn repo(&self) -> &Repository {
        &self.repo
    }

    /// The repository metadata directory (`.git`).
    pub fn git_dir(&self) -> &Path {
        self.repo.path()
    }

    /// The configured committer identity (`user.name` / `user.email`).
    pub fn committer_identity(&self) -> Result<Identity, GitError> {
        let sig = self
            .repo
            .signature()
            .map_err(|e| GitError::IdentityUnset(e.message().to_string()))?;
        let name = sig.name().unwrap_or("").to_string();
        let email = sig.email().unwrap_or("").to_string();
        if name.is_empty() || email.is_empty() {
            return Err(GitError::IdentityUnset(
                "user.name and user.email must both be set".into(),
            ));
        }
        Ok(Identity { name, email })
    }

    /// Shorthand name of the currently checked-out branch.
    pub fn current_branch(&self) -> Result<String, GitError> {
        let head = self
            .repo
            .head()
            .map_err(|e| GitError::NoCurrentBranch(e.message().to_string()))?;
        if !head.is_branch() {
            return Err(GitError::NoCurrentBranch("HEAD is detached".into()));
        }
        head.shorthand()
            .map(str::to_string)
            .ok_or_else(|| GitError::NoCurrentBranch("HEAD name is not valid UTF-8".into()))
    }

    /// Shorthand name of the upstream configured for a local branch.
    pub fn upstream_branch(&self, name: &str) -> Result<String, GitError> {
        let branch = self
            .repo
            .find_branch(name, BranchType::Local)
            .map_err(|_| GitError::RefNotFound(name.to_string()))?;
        let upstream = branch
            .upstream()
            .map_err(|_| GitError::NoUpstream(name.to_string()))?;
        match upstream.name()? {
            Some(shorthand) => Ok(shorthand.to_string()),
            None => Err(GitError::NoUpstream(name.to_string())),
        }
    }

    /// Resolve a branch or ref shorthand to its canonical name and tip.
    pub fn resolve_ref(&self, name: &str) -> Result<ResolvedRef, GitError> {
        let reference = self
            .repo
            .resolve_reference_from_short_name(name)
            .map_err(|_| GitError::RefNotFound(name.to_string()))?;
        let refname = reference
            .name()
            .ok_or_else(|| GitError::RefNotFound(name.to_string()))?
            .to_string();
        let target = reference.peel_to_commit()?.id().to_string();
        Ok(ResolvedRef { refname, target })
    }

    /// The commit a reference points at, or `None` if the ref does not exist.
    pub fn reference_target(&self, refname: &str) -> Result<Option<String>, GitError> {
        match self.repo.find_reference(refname) {
            Ok(reference) => Ok(Some(reference.peel_to_commit()?.id().to_string())),
            Err(e) if e.code() == git2::ErrorCode::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Whether `ancestor` is an ancestor of (or equal to) `tip`.
    pub fn is_ancestor(&self, ancestor: &str, tip: &str) -> Result<bool, GitError> {
        let ancestor = Oid::from_str(ancestor)?;
        let tip = Oid::from_str(tip)?;
        Ok(ancestor == tip || self.repo.graph_descendant_of(tip, ancestor)?)
    }

    /// Commits reachable from `tip` but not from any of `exclude`, in
    /// topological order, oldest first.
    pub fn commits_between(
        &self,
        tip: &str,
        exclude: &[String],
    ) -> Result<Vec<CommitInfo>, GitError> {
        let mut revwalk = self.repo.revwalk()?;
        revwalk.push(Oid::from_str(tip)?)?;
        for oid in exclude {
            revwalk.hide(Oid::from_str(oid)?)?;
        }
        revwalk.set_sorting(git2::Sort::TOPOLOGICAL | git2::Sort::REVERSE)?;
        let mut commits = Vec::new();
        for oid_result in revwalk {
            let oid = oid_result?;
            commits.push(self.commit_info(oid)?);
        }
        debug!(count = commits.len(), "collected commits in range");
        Ok(commits)
    }

    /// Create a new commit object carrying `message`, reusing the original
    /// commit's tree and author/committer signatures (timestamps included).
    ///
    /// The new commit is dangling: no reference is updated.
    #[instrument(skip(self, message))]
    pub fn rewrite_commit(
        &self,
        original_id: &str,
        message: &str,
        parent_ids: &[String],
    ) -> Result<String, GitError> {
        let original = self.repo.find_commit(Oid::from_str(original_id)?)?;
        let tree = original.tree()?;
        let mut parents = Vec::with_capacity(parent_ids.len());
        for pid in parent_ids {
            parents.push(self.repo.find_commit(Oid::from_str(pid)?)?);
        }
        let parent_refs: Vec<&git2::Commit> = parents.iter().collect();
        let new_id = self.repo.commit(
            None,
            &original.author(),
            &original.committer(),
            message,
            &tree,
            &parent_refs,
        )?;
        debug!(original = %original.id(), rewritten = %new_id, "rewrote commit");
        Ok(new_id.to_string())
    }

    /// Move an existing reference to a new target.
    #[instrument(skip(self))]
    pub fn set_reference(
        &self,
        refname: &str,
        target: &str,
        log_message: &str,
    ) -> Result<(), GitError> {
        let oid = Oid::from_str(target)?;
        let mut reference = self
            .repo
            .find_reference(refname)
            .map_err(|_| GitError::RefNotFound(refname.to_string()))?;
        reference.set_target(oid, log_message)?;
        info!(refname, target, "updated reference");
        Ok(())
    }

    /// Create or move a reference, overwriting any previous target.
    #[instrument(skip(self))]
    pub fn force_reference(
        &self,
        refname: &str,
        target: &str,
        log_message: &str,
    ) -> Result<(), GitError> {
        let oid = Oid::from_str(target)?;
        self.repo.reference(refname, oid, true, log_message)?;
        info!(refname, target, "created reference");
        Ok(())
    }

    fn commit_info(&self, oid: Oid) -> Result<CommitInfo, GitError> {
        let commit = self.repo.find_commit(oid)?;
        let id = oid.to_string();
        let short_id = commit
            .as_object()
            .short_id()?
            .as_str()
            .unwrap_or(&id[..7])
            .to_string();
        // The signature borrows `commit` and must be dropped before it.
        let author = commit.author();
        Ok(CommitInfo {
            short_id,
            message: String::from_utf8_lossy(commit.message_bytes()).into_owned(),
            author: Identity::new(
                author.name().unwrap_or(""),
                author.email().unwrap_or(""),
            ),
            subject: commit.summary().unwrap_or("").to_string(),
            parent_ids: commit.parent_ids().map(|p| p.to_string()).collect(),
            commit_time: commit.time().seconds(),
            id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use git2::Signature;

    fn add_commit(repo: &Repository, file: &str, message: &str) -> Oid {
        std::fs::write(repo.workdir().unwrap().join(file), message).unwrap();
        let mut index = repo.index().unwrap();
        index.add_path(Path::new(file)).unwrap();
        index.write().unwrap();
        let tree_oid = index.write_tree().unwrap();
        let tree = repo.find_tree(tree_oid).unwrap();
        let sig = Signature::now("Test", "test@test.com").unwrap();
        let parent = match repo.head() {
            Ok(head) => Some(head.peel_to_commit().unwrap()),
            Err(_) => None,
        };
        let parents: Vec<&git2::Commit> = parent.iter().collect();
        repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)
            .unwrap()
    }

    #[test]
    fn test_discover_not_found() {
        assert!(matches!(
            GitClient::discover("/nonexistent"),
            Err(GitError::RepositoryNotFound(_))
        ));
    }

    #[test]
    fn test_committer_identity_from_config() {
        let dir = tempfile::tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        let mut config = repo.config().unwrap();
        config.set_str("user.name", "Test User").unwrap();
        config.set_str("user.email", "test@test.com").unwrap();

        let client = GitClient::discover(dir.path()).unwrap();
        let identity = client.committer_identity().unwrap();
        assert_eq!(identity.name, "Test User");
        assert_eq!(identity.email, "test@test.com");
    }

    #[test]
    fn test_commits_between_oldest_first() {
        let dir = tempfile::tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        let first = add_commit(&repo, "a.txt", "first");
        add_commit(&repo, "b.txt", "second");
        let third = add_commit(&repo, "c.txt", "third");

        let client = GitClient::discover(dir.path()).unwrap();
        let commits = client
            .commits_between(&third.to_string(), &[first.to_string()])
            .unwrap();
        assert_eq!(commits.len(), 2);
        assert_eq!(commits[0].subject, "second");
        assert_eq!(commits[0].author.name, "Test");
        assert_eq!(commits[0].author.email, "test@test.com");
        assert_eq!(commits[1].subject, "third");
        assert_eq!(commits[1].parent_ids.len(), 1);
    }

    #[test]
    fn test_rewrite_commit_preserves_tree_and_author() {
        let dir = tempfile::tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        let oid = add_commit(&repo, "a.txt", "original message");

        let client = GitClient::discover(dir.path()).unwrap();
        let new_id = client
            .rewrite_commit(&oid.to_string(), "rewritten message\n", &[])
            .unwrap();
        assert_ne!(new_id, oid.to_string());

        let original = repo.find_commit(oid).unwrap();
        let rewritten = repo.find_commit(Oid::from_str(&new_id).unwrap()).unwrap();
        assert_eq!(rewritten.tree_id(), original.tree_id());
        assert_eq!(rewritten.author().email(), original.author().email());
        assert_eq!(rewritten.time().seconds(), original.time().seconds());
        assert_eq!(rewritten.message(), Some("rewritten message\n"));

        // The branch still points at the original commit.
        assert_eq!(repo.head().unwrap().target(), Some(oid));
    }

    #[test]
    fn test_reference_target_missing_is_none() {
        let dir = tempfile::tempdir().unwrap();
        Repository::init(dir.path()).unwrap();
        let client = GitClient::discover(dir.path()).unwrap();
        assert_eq!(client.reference_target("refs/dcosign/main").unwrap(), None);
    }

    #[test]
    fn test_current_branch_unborn_head() {
        let dir = tempfile::tempdir().unwrap();
        Repository::init(dir.path()).unwrap();
        let client = GitClient::discover(dir.path()).unwrap();
        assert!(matches!(
            client.current_branch(),
            Err(GitError::NoCurrentBranch(_))
        ));
    }
}
