//! Version control adapter over the `git` CLI.
//!
//! Every command runs with a fixed synthetic identity so commits made by the
//! orchestrator never borrow the host user's name, and with signing off so
//! no key or agent is required.

use std::collections::HashMap;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use std::sync::{Arc, Mutex, Weak};

use thiserror::Error;
use tokio::process::Command;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::{debug, info};

/// Author and committer name for orchestrator commits.
pub const GIT_IDENTITY_NAME: &str = "Fanout Orchestrator";

/// Author and committer email for orchestrator commits.
pub const GIT_IDENTITY_EMAIL: &str = "orchestrator@fanout.invalid";

/// Git adapter errors.
#[derive(Debug, Error)]
pub enum GitError {
    #[error("Failed to run git: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("git {command} exited with code {code}: {stderr}")]
    Command {
        command: String,
        code: i32,
        stderr: String,
    },
}

/// Thin async wrapper around the git binary.
///
/// Git keeps shared state in the repository (`config`, `worktrees/`, ref
/// locks) that concurrent `branch`/`worktree add` calls can trip over.
/// Callers creating branches or worktrees hold [`GitCli::lock_repository`]
/// for the repository while they do; the lock covers only those steps.
#[derive(Debug)]
pub struct GitCli {
    git_path: String,
    repo_locks: Mutex<HashMap<PathBuf, Weak<AsyncMutex<()>>>>,
}

impl GitCli {
    /// Create an adapter using the given git binary.
    pub fn new(git_path: impl Into<String>) -> Self {
        Self {
            git_path: git_path.into(),
            repo_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Take the per-repository lock for branch/worktree creation.
    pub async fn lock_repository(&self, repo: &Path) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = match self.repo_locks.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            locks.retain(|_, weak| weak.strong_count() > 0);
            match locks.get(repo).and_then(Weak::upgrade) {
                Some(lock) => lock,
                None => {
                    let lock = Arc::new(AsyncMutex::new(()));
                    locks.insert(repo.to_path_buf(), Arc::downgrade(&lock));
                    lock
                }
            }
        };
        lock.lock_owned().await
    }

    /// Initialize a repository in `dir` with the given initial branch.
    pub async fn init_repository(&self, dir: &Path, initial_branch: &str) -> Result<(), GitError> {
        self.run(dir, ["init", "--quiet", "--initial-branch", initial_branch])
            .await?;
        info!(dir = %dir.display(), branch = %initial_branch, "Initialized git repository");
        Ok(())
    }

    /// Stage everything and commit. Returns the new commit id.
    pub async fn commit_all(&self, dir: &Path, message: &str) -> Result<String, GitError> {
        self.run(dir, ["add", "--all"]).await?;
        self.run(dir, ["commit", "--quiet", "--message", message])
            .await?;
        self.head_commit(dir).await
    }

    /// Commit id of HEAD.
    pub async fn head_commit(&self, dir: &Path) -> Result<String, GitError> {
        self.run(dir, ["rev-parse", "HEAD"]).await
    }

    /// Whether a local branch exists.
    pub async fn branch_exists(&self, repo: &Path, branch: &str) -> Result<bool, GitError> {
        let reference = format!("refs/heads/{}", branch);
        let output = self
            .output(repo, ["rev-parse", "--verify", "--quiet", reference.as_str()])
            .await?;
        Ok(output.status.success())
    }

    /// Create a branch at `start_point`. Fails if it already exists.
    pub async fn create_branch(
        &self,
        repo: &Path,
        branch: &str,
        start_point: &str,
    ) -> Result<(), GitError> {
        self.run(repo, ["branch", "--no-track", branch, start_point])
            .await?;
        debug!(repo = %repo.display(), branch = %branch, "Created branch");
        Ok(())
    }

    /// Check out an existing branch into a new worktree at `path`.
    pub async fn add_worktree(&self, repo: &Path, path: &Path, branch: &str) -> Result<(), GitError> {
        self.run(
            repo,
            [
                OsStr::new("worktree"),
                OsStr::new("add"),
                OsStr::new("--quiet"),
                path.as_os_str(),
                OsStr::new(branch),
            ],
        )
        .await?;
        debug!(path = %path.display(), branch = %branch, "Added worktree");
        Ok(())
    }

    /// Remove a worktree, discarding any changes in it. The branch stays.
    pub async fn remove_worktree(&self, repo: &Path, path: &Path) -> Result<(), GitError> {
        self.run(
            repo,
            [
                OsStr::new("worktree"),
                OsStr::new("remove"),
                OsStr::new("--force"),
                path.as_os_str(),
            ],
        )
        .await?;
        debug!(path = %path.display(), "Removed worktree");
        Ok(())
    }

    /// Run git and require success. Returns trimmed stdout.
    async fn run<I, S>(&self, dir: &Path, args: I) -> Result<String, GitError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let args: Vec<_> = args.into_iter().map(|a| a.as_ref().to_owned()).collect();
        let output = self.output(dir, &args).await?;

        if !output.status.success() {
            return Err(GitError::Command {
                command: args
                    .first()
                    .map(|a| a.to_string_lossy().into_owned())
                    .unwrap_or_default(),
                code: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    /// Run git and return its raw output whatever the exit status.
    async fn output<I, S>(&self, dir: &Path, args: I) -> Result<Output, GitError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let output = Command::new(&self.git_path)
            .arg("-c")
            .arg("commit.gpgsign=false")
            .args(args)
            .current_dir(dir)
            .env("GIT_AUTHOR_NAME", GIT_IDENTITY_NAME)
            .env("GIT_AUTHOR_EMAIL", GIT_IDENTITY_EMAIL)
            .env("GIT_COMMITTER_NAME", GIT_IDENTITY_NAME)
            .env("GIT_COMMITTER_EMAIL", GIT_IDENTITY_EMAIL)
            .env("GIT_TERMINAL_PROMPT", "0")
            .stdin(Stdio::null())
            .output()
            .await?;
        Ok(output)
    }
}

impl Default for GitCli {
    fn default() -> Self {
        Self::new("git")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn seeded_repo(git: &GitCli) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        git.init_repository(dir.path(), "main").await.unwrap();
        std::fs::write(dir.path().join("README.md"), "seed\n").unwrap();
        git.commit_all(dir.path(), "Seed").await.unwrap();
        dir
    }

    #[tokio::test]
    async fn test_commit_uses_synthetic_identity() {
        let git = GitCli::default();
        let repo = seeded_repo(&git).await;

        let author = git
            .run(repo.path(), ["log", "-1", "--format=%an <%ae>|%cn <%ce>"])
            .await
            .unwrap();
        let expected = format!("{} <{}>", GIT_IDENTITY_NAME, GIT_IDENTITY_EMAIL);
        assert_eq!(author, format!("{}|{}", expected, expected));

        let branch = git
            .run(repo.path(), ["symbolic-ref", "--short", "HEAD"])
            .await
            .unwrap();
        assert_eq!(branch, "main");
    }

    #[tokio::test]
    async fn test_branch_and_worktree() {
        let git = GitCli::default();
        let repo = seeded_repo(&git).await;
        let head = git.head_commit(repo.path()).await.unwrap();

        assert!(!git.branch_exists(repo.path(), "agent-1").await.unwrap());
        git.create_branch(repo.path(), "agent-1", &head).await.unwrap();
        assert!(git.branch_exists(repo.path(), "agent-1").await.unwrap());

        let wt = repo.path().join("worktrees").join("agent-1");
        git.add_worktree(repo.path(), &wt, "agent-1").await.unwrap();
        assert!(wt.join("README.md").exists());

        let checked_out = git
            .run(&wt, ["symbolic-ref", "--short", "HEAD"])
            .await
            .unwrap();
        assert_eq!(checked_out, "agent-1");

        git.remove_worktree(repo.path(), &wt).await.unwrap();
        assert!(!wt.exists());
        assert!(git.branch_exists(repo.path(), "agent-1").await.unwrap());
    }

    #[tokio::test]
    async fn test_duplicate_branch_fails() {
        let git = GitCli::default();
        let repo = seeded_repo(&git).await;
        let head = git.head_commit(repo.path()).await.unwrap();

        git.create_branch(repo.path(), "agent-1", &head).await.unwrap();
        let err = git
            .create_branch(repo.path(), "agent-1", &head)
            .await
            .unwrap_err();
        assert!(matches!(err, GitError::Command { ref command, .. } if command == "branch"));
    }

    #[tokio::test]
    async fn test_missing_git_binary() {
        let git = GitCli::new("/nonexistent/git");
        let dir = tempfile::tempdir().unwrap();
        let err = git.init_repository(dir.path(), "main").await.unwrap_err();
        assert!(matches!(err, GitError::Spawn(_)));
    }

    #[tokio::test]
    async fn test_repository_lock_is_shared_per_repo() {
        let git = Arc::new(GitCli::default());
        let repo = PathBuf::from("/tmp/some-repo");

        let guard = git.lock_repository(&repo).await;
        let contender = {
            let git = git.clone();
            let repo = repo.clone();
            tokio::spawn(async move {
                let _guard = git.lock_repository(&repo).await;
            })
        };

        // Another repository is not blocked.
        let _other = git.lock_repository(Path::new("/tmp/other-repo")).await;

        tokio::task::yield_now().await;
        assert!(!contender.is_finished());

        drop(guard);
        contender.await.unwrap();
    }
}
