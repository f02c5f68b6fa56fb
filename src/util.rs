use crate::error::VesError;
use crate::repository::Repository;

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use anyhow::Result;
use xxhash_rust::xxh3::Xxh3DefaultBuilder;

pub type Xxh3HashSet<K> = HashSet<K, Xxh3DefaultBuilder>;
pub type Xxh3HashMap<K, V> = HashMap<K, V, Xxh3DefaultBuilder>;

/// Directory part of a `/`-separated relative path. Root-level names map to `""`.
#[inline]
#[must_use]
pub fn dirname(path: &str) -> &str {
    match path.rfind('/') {
        Some(i) => &path[..i],
        None => "",
    }
}

/// Final component of a `/`-separated relative path.
#[inline]
#[must_use]
pub fn basename(path: &str) -> &str {
    match path.rfind('/') {
        Some(i) => &path[i + 1..],
        None => path,
    }
}

/// Join two `/`-separated relative path fragments, either of which may be empty.
#[inline]
#[must_use]
pub fn join_rel(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        let mut s = String::with_capacity(prefix.len() + 1 + name.len());
        s.push_str(prefix);
        s.push('/');
        s.push_str(name);
        s
    }
}

/// Anchor a possibly-relative CLI path at the current directory. The
/// final component is kept as-is so symlinks are not resolved away.
pub fn absolutize(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}

/// Worktree-relative `/`-separated form of an absolute path; paths that
/// do not descend from the worktree are rejected.
pub fn worktree_relative(repo: &Repository, abs: &Path) -> Result<String> {
    let rel = abs
        .strip_prefix(&repo.worktree)
        .map_err(|_| VesError::PathOutsideWorktree(abs.to_path_buf()))?;
    let rel = rel
        .to_str()
        .ok_or_else(|| anyhow::anyhow!("non-utf8 path: {}", abs.display()))?;
    Ok(rel.replace('\\', "/"))
}
