use crate::error::{PkgScoreError, Result};
use async_trait::async_trait;
use std::path::Path;
use tokio::process::Command;

#[async_trait]
pub trait RepoCloner: Send + Sync {
    /// Depth-1, single-branch clone of `branch` into `dest`.
    async fn shallow_clone(&self, url: &str, branch: &str, dest: &Path) -> Result<()>;
}

/// Shells out to the `git` binary on `PATH`.
#[derive(Debug, Default, Clone, Copy)]
pub struct GitCli;

#[async_trait]
impl RepoCloner for GitCli {
    async fn shallow_clone(&self, url: &str, branch: &str, dest: &Path) -> Result<()> {
        let output = Command::new("git")
            .arg("clone")
            .arg("--depth")
            .arg("1")
            .arg("--single-branch")
            .arg("--branch")
            .arg(branch)
            .arg("--quiet")
            .arg(url)
            .arg(dest)
            .env("GIT_TERMINAL_PROMPT", "0")
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| PkgScoreError::CloneFailed {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(PkgScoreError::CloneFailed {
                url: url.to_string(),
                reason: stderr.trim().to_string(),
            });
        }
        Ok(())
    }
}

pub fn clone_url(owner: &str, repo: &str) -> String {
    format!("https://github.com/{owner}/{repo}.git")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn clone_url_points_at_github_https() {
        assert_eq!(clone_url("o", "r"), "https://github.com/o/r.git");
    }

    #[tokio::test]
    async fn clone_of_missing_local_repo_fails_with_context() {
        let scratch = TempDir::new().expect("temp dir should be created");
        let missing = scratch.path().join("does-not-exist");
        let dest = scratch.path().join("checkout");

        let err = GitCli
            .shallow_clone(&missing.display().to_string(), "main", &dest)
            .await
            .expect_err("cloning a missing path should fail");
        assert!(matches!(err, PkgScoreError::CloneFailed { .. }));
    }
}
