use crate::error::VesError;
use crate::index::{Index, with_index};
use crate::repository::Repository;
use crate::util::{absolutize, worktree_relative};

use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;

use anyhow::Result;

/// Remove paths from the index and, when `delete` is set, from disk.
pub fn rm(repo: &Repository, paths: &[PathBuf], delete: bool, skip_missing: bool) -> Result<()> {
    with_index(repo, |index| rm_in_memory(index, repo, paths, delete, skip_missing))
}

/// In-memory half of `rm`, shared with `add` (which drops stale entries
/// before re-staging). Paths outside the worktree are rejected; paths
/// missing from the index are an error unless `skip_missing`.
pub fn rm_in_memory(
    index: &mut Index,
    repo: &Repository,
    paths: &[PathBuf],
    delete: bool,
    skip_missing: bool,
) -> Result<()> {
    let mut names = HashSet::new();
    for path in paths {
        let abs = absolutize(path)?;
        names.insert(worktree_relative(repo, &abs)?);
    }

    let mut removed = Vec::new();
    index.entries.retain(|e| {
        if names.remove(&e.name) {
            removed.push(e.name.clone());
            false
        } else {
            true
        }
    });

    if !names.is_empty() && !skip_missing {
        let mut missing: Vec<String> = names.into_iter().collect();
        missing.sort();
        return Err(VesError::NotInIndex(missing).into());
    }

    if delete {
        for name in &removed {
            fs::remove_file(repo.worktree.join(name))?;
        }
    }

    Ok(())
}
