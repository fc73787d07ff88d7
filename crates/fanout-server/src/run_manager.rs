//! Run creation: directory, repository, seed commit.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};

use fanout_core::run::WORKTREES_DIR;
use fanout_core::{Run, RunId};

use crate::git::{GitCli, GitError};

/// Branch the seed commit lands on.
pub const SEED_BRANCH: &str = "main";

/// Attempts at finding an unused run directory before giving up.
const MAX_CREATE_ATTEMPTS: usize = 5;

/// Errors creating a run. All are fatal for the request.
#[derive(Debug, Error)]
pub enum RunCreationError {
    #[error("Failed to create run directory {path}: {source}")]
    Directory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Run id collided {0} times in a row")]
    IdCollision(usize),

    #[error("Failed to initialize run repository: {0}")]
    Repository(#[from] GitError),
}

/// Creates runs under the workspace store. Runs are never removed here.
pub struct RunManager {
    runs_root: PathBuf,
    git: Arc<GitCli>,
}

impl RunManager {
    /// Create a run manager storing runs under `runs_root`.
    pub fn new(runs_root: impl Into<PathBuf>, git: Arc<GitCli>) -> Self {
        Self {
            runs_root: runs_root.into(),
            git,
        }
    }

    /// Create a new run: a fresh directory holding a repository with one
    /// seed commit on `main`.
    pub async fn create_run(&self) -> Result<Run, RunCreationError> {
        tokio::fs::create_dir_all(&self.runs_root)
            .await
            .map_err(|source| RunCreationError::Directory {
                path: self.runs_root.clone(),
                source,
            })?;
        let runs_root = tokio::fs::canonicalize(&self.runs_root)
            .await
            .map_err(|source| RunCreationError::Directory {
                path: self.runs_root.clone(),
                source,
            })?;

        let (run_id, run_dir) = self.reserve_dir(&runs_root).await?;
        info!(run_id = %run_id, run_dir = %run_dir.display(), "Created run directory");

        self.seed(&run_id, &run_dir).await?;

        Ok(Run {
            run_id,
            run_dir,
            git_initialized: true,
        })
    }

    /// Claim an unused run directory. `create_dir` fails on an existing
    /// path, so a claimed directory belongs to this call alone even when
    /// other replicas share the store.
    async fn reserve_dir(&self, runs_root: &Path) -> Result<(RunId, PathBuf), RunCreationError> {
        for attempt in 1..=MAX_CREATE_ATTEMPTS {
            let run_id = RunId::generate();
            let run_dir = runs_root.join(run_id.dir_name());

            match tokio::fs::create_dir(&run_dir).await {
                Ok(()) => return Ok((run_id, run_dir)),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    warn!(run_id = %run_id, attempt, "Run id collision, retrying");
                }
                Err(source) => {
                    return Err(RunCreationError::Directory {
                        path: run_dir,
                        source,
                    })
                }
            }
        }
        Err(RunCreationError::IdCollision(MAX_CREATE_ATTEMPTS))
    }

    /// Initialize the repository and make the seed commit.
    async fn seed(&self, run_id: &RunId, run_dir: &Path) -> Result<(), RunCreationError> {
        let readme = format!(
            "# Run {run_id}\n\nEach agent works on its own `agent-<n>` branch, checked out under `{WORKTREES_DIR}/agent-<n>`.\n"
        );
        write_seed_file(run_dir, "README.md", readme).await?;
        write_seed_file(run_dir, ".gitignore", format!("/{}/\n", WORKTREES_DIR)).await?;

        self.git.init_repository(run_dir, SEED_BRANCH).await?;
        let commit = self
            .git
            .commit_all(run_dir, &format!("Initialize run {}", run_id))
            .await?;
        info!(run_id = %run_id, commit = %commit, "Seeded run repository");
        Ok(())
    }
}

async fn write_seed_file(
    run_dir: &Path,
    name: &str,
    contents: String,
) -> Result<(), RunCreationError> {
    let path = run_dir.join(name);
    tokio::fs::write(&path, contents)
        .await
        .map_err(|source| RunCreationError::Directory { path, source })
}
