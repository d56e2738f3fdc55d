//! Commit-msg hook installation and management.

use std::fs;
use std::io;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::errors::{GitError, HookError};
use crate::git::GitClient;

/// Marker identifying a hook written by this tool.
const HOOK_MARKER: &str = "installed by dcosign";

/// Commit-msg hook script content.
const COMMIT_MSG_HOOK: &str = r#"#!/bin/sh
# commit-msg hook installed by dcosign
exec dcosign process_commit_message "$1"
"#;

/// Outcome of a hook install or remove request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookStatus {
    Installed,
    AlreadyInstalled,
    Removed,
    NotInstalled,
}

/// Path of the commit-msg hook inside the repository.
pub fn hook_path(client: &GitClient) -> PathBuf {
    client.git_dir().join("hooks").join("commit-msg")
}

/// Install the commit-msg hook.
///
/// Requires `confirmed`. Re-installing over our own hook is an idempotent
/// success; any other existing hook is left untouched and reported as a
/// conflict.
pub fn install(client: &GitClient, confirmed: bool) -> Result<HookStatus, HookError> {
    if !confirmed {
        return Err(HookError::NotApproved);
    }
    let hooks_dir = client.git_dir().join("hooks");
    let path = hooks_dir.join("commit-msg");

    if path.exists() {
        if is_ours(&path)? {
            debug!(path = %path.display(), "hook already installed");
            return Ok(HookStatus::AlreadyInstalled);
        }
        return Err(HookError::Conflict(path.display().to_string()));
    }

    fs::create_dir_all(&hooks_dir).map_err(|e| map_io(e, &hooks_dir))?;
    fs::write(&path, COMMIT_MSG_HOOK).map_err(|e| map_io(e, &path))?;
    let mut perms = fs::metadata(&path)
        .map_err(|e| map_io(e, &path))?
        .permissions();
    perms.set_mode(0o755);
    fs::set_permissions(&path, perms).map_err(|e| map_io(e, &path))?;

    info!(path = %path.display(), "installed commit-msg hook");
    Ok(HookStatus::Installed)
}

/// Remove the commit-msg hook if it is ours.
///
/// A missing hook is a no-op success; a hook from another tool is left
/// untouched.
pub fn remove(client: &GitClient) -> Result<HookStatus, HookError> {
    let path = hook_path(client);
    if !path.exists() {
        debug!(path = %path.display(), "no commit-msg hook installed");
        return Ok(HookStatus::NotInstalled);
    }
    if !is_ours(&path)? {
        return Err(HookError::ExternalHook(path.display().to_string()));
    }
    fs::remove_file(&path).map_err(|e| map_io(e, &path))?;
    info!(path = %path.display(), "removed commit-msg hook");
    Ok(HookStatus::Removed)
}

fn is_ours(path: &Path) -> Result<bool, HookError> {
    let content = fs::read_to_string(path)?;
    Ok(content.contains(HOOK_MARKER))
}

fn map_io(e: io::Error, path: &Path) -> HookError {
    if e.kind() == io::ErrorKind::PermissionDenied {
        HookError::GitError(GitError::RepositoryReadOnly(path.display().to_string()))
    } else {
        HookError::IoError(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use git2::Repository;

    fn test_client() -> (tempfile::TempDir, GitClient) {
        let dir = tempfile::tempdir().unwrap();
        Repository::init(dir.path()).unwrap();
        let client = GitClient::discover(dir.path()).unwrap();
        (dir, client)
    }

    #[test]
    fn test_install_requires_approval() {
        let (_dir, client) = test_client();
        let err = install(&client, false).unwrap_err();
        assert!(matches!(err, HookError::NotApproved));
        assert!(!hook_path(&client).exists());
    }

    #[test]
    fn test_install_writes_executable_hook() {
        let (_dir, client) = test_client();
        assert_eq!(install(&client, true).unwrap(), HookStatus::Installed);

        let path = hook_path(&client);
        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains(HOOK_MARKER));
        assert!(content.contains("process_commit_message"));

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_ne!(mode & 0o111, 0, "hook must be executable");
    }

    #[test]
    fn test_reinstall_is_idempotent() {
        let (_dir, client) = test_client();
        install(&client, true).unwrap();
        assert_eq!(install(&client, true).unwrap(), HookStatus::AlreadyInstalled);
    }

    #[test]
    fn test_install_refuses_foreign_hook() {
        let (_dir, client) = test_client();
        let path = hook_path(&client);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "#!/bin/sh\nexit 0\n").unwrap();

        let err = install(&client, true).unwrap_err();
        assert!(matches!(err, HookError::Conflict(_)));
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "#!/bin/sh\nexit 0\n",
            "foreign hook must not be touched"
        );
    }

    #[test]
    fn test_remove_only_removes_ours() {
        let (_dir, client) = test_client();
        install(&client, true).unwrap();
        assert_eq!(remove(&client).unwrap(), HookStatus::Removed);
        assert!(!hook_path(&client).exists());
    }

    #[test]
    fn test_remove_refuses_foreign_hook() {
        let (_dir, client) = test_client();
        let path = hook_path(&client);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "#!/bin/sh\nexit 0\n").unwrap();

        let err = remove(&client).unwrap_err();
        assert!(matches!(err, HookError::ExternalHook(_)));
        assert!(err.to_string().contains("hook is external, not removing"));
        assert!(path.exists());
    }

    #[test]
    fn test_remove_missing_hook_is_noop() {
        let (_dir, client) = test_client();
        assert_eq!(remove(&client).unwrap(), HookStatus::NotInstalled);
    }
}
