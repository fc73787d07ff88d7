//! Per-agent prompt enhancement.

use std::path::Path;

use crate::AgentId;

/// Prefix a user's prompt with the agent's identity, its workspace
/// confinement, and the mandatory closing commit.
///
/// The commit instruction is unconditional: an agent's committed tree is the
/// only record of its work that survives the run.
pub fn enhance(raw_prompt: &str, agent_id: AgentId, branch_name: &str, worktree_path: &Path) -> String {
    let path = worktree_path.display();
    format!(
        r#"You are agent {agent_id}, working on git branch `{branch_name}`.

## Workspace
Your working directory is: {path}
Create, modify, and delete files only inside this directory. It is a git worktree checked out to branch `{branch_name}`. Do not switch branches and do not touch any other directory.

## Required final step
When the task is done, your final action MUST be to stage and commit all of your changes from {path}:

    git add -A && git commit -m "<descriptive message of what you changed>"

Uncommitted work is lost. Do this even if the task only partially succeeded.

## Task
{raw_prompt}"#
    )
}
