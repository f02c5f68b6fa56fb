//! Three-way status: branch line, HEAD vs index (staged), index vs
//! worktree (unstaged + untracked).

use crate::error::is_no_such_reference;
use crate::ignore::{check_ignore, ignore_read};
use crate::index::Index;
use crate::object::FMT_BLOB;
use crate::repository::Repository;
use crate::storage::{object_find, object_hash};
use crate::tree::tree_to_dict;
use crate::util::Xxh3HashSet;

use std::collections::HashMap;
use std::fs;
use std::io::Write;

use anyhow::Result;
use walkdir::WalkDir;

pub struct StatusReport {
    /// Active branch, or `None` when HEAD is detached.
    pub branch: Option<String>,
    /// What HEAD resolves to, if anything.
    pub head_sha: Option<String>,
    pub staged_modified: Vec<String>,
    pub staged_added: Vec<String>,
    pub staged_deleted: Vec<String>,
    pub wt_modified: Vec<String>,
    pub wt_deleted: Vec<String>,
    /// Untracked paths after the directory-collapse pass; collapsed
    /// directories carry a trailing `/`.
    pub untracked: Vec<String>,
}

/// Name of the branch HEAD points at, or `None` when detached.
pub fn branch_get_active(repo: &Repository) -> Result<Option<String>> {
    let head = fs::read_to_string(repo.repo_path("HEAD"))?;
    Ok(head
        .strip_prefix("ref: refs/heads/")
        .map(|name| name.trim_end_matches('\n').to_string()))
}

pub fn collect_status(repo: &Repository) -> Result<StatusReport> {
    let index = Index::read(repo)?;

    let branch = branch_get_active(repo)?;
    let head_sha = match object_find(repo, "HEAD", None, true) {
        Ok(sha) => sha,
        Err(e) if is_no_such_reference(&e) => None,
        Err(e) => return Err(e),
    };

    // HEAD <-> index. A repo with no commits diffs against an empty tree.
    let mut head = match tree_to_dict(repo, "HEAD") {
        Ok(map) => map,
        Err(e) if is_no_such_reference(&e) => HashMap::new(),
        Err(e) => return Err(e),
    };

    let mut staged_modified = Vec::new();
    let mut staged_added = Vec::new();
    for entry in &index.entries {
        match head.remove(&entry.name) {
            Some(sha) if sha != entry.sha => staged_modified.push(entry.name.clone()),
            Some(_) => {}
            None => staged_added.push(entry.name.clone()),
        }
    }
    // Whatever HEAD paths the index never matched were deleted.
    let mut staged_deleted: Vec<String> = head.into_keys().collect();

    // Index <-> worktree.
    let ignore = ignore_read(repo)?;
    let mut all_files: Vec<String> = Vec::new();
    for entry in WalkDir::new(&repo.worktree)
        .into_iter()
        .filter_entry(|e| e.file_name() != ".ves")
        .filter_map(std::result::Result::ok)
    {
        let ft = entry.file_type();
        if !ft.is_file() && !(ft.is_symlink() && !entry.path().is_dir()) {
            continue;
        }
        let Ok(rel) = entry.path().strip_prefix(&repo.worktree) else {
            continue;
        };
        let rel = rel.to_string_lossy().replace('\\', "/");
        if !rel.is_empty() {
            all_files.push(rel);
        }
    }
    let mut remaining: Xxh3HashSet<&str> =
        all_files.iter().map(String::as_str).collect();

    let mut wt_modified = Vec::new();
    let mut wt_deleted = Vec::new();
    for entry in &index.entries {
        let full = repo.worktree.join(&entry.name);

        if !full.exists() {
            wt_deleted.push(entry.name.clone());
        } else {
            let meta = fs::metadata(&full)?;
            let (ctime_ns, mtime_ns) = stat_times_ns(&meta);
            let entry_ctime_ns = i128::from(entry.ctime.0) * 1_000_000_000 + i128::from(entry.ctime.1);
            let entry_mtime_ns = i128::from(entry.mtime.0) * 1_000_000_000 + i128::from(entry.mtime.1);

            // Timestamps agree: assume clean. Otherwise re-hash to see
            // whether the content really changed.
            if ctime_ns != entry_ctime_ns || mtime_ns != entry_mtime_ns {
                let is_link = full.symlink_metadata()?.file_type().is_symlink();
                let data = if is_link {
                    fs::read_link(&full)?.to_string_lossy().into_owned().into_bytes()
                } else {
                    fs::read(&full)?
                };
                let new_sha = object_hash(&data, FMT_BLOB, None)?;
                if new_sha != entry.sha {
                    wt_modified.push(entry.name.clone());
                }
            }
        }

        remaining.remove(entry.name.as_str());
    }

    let mut untracked_files: Vec<&str> = Vec::new();
    for path in remaining.iter().copied() {
        if !check_ignore(&ignore, path)? {
            untracked_files.push(path);
        }
    }
    untracked_files.sort_unstable();
    let untracked = collapse_untracked(&all_files, &untracked_files);

    staged_modified.sort();
    staged_added.sort();
    staged_deleted.sort();
    wt_modified.sort();
    wt_deleted.sort();

    Ok(StatusReport {
        branch,
        head_sha,
        staged_modified,
        staged_added,
        staged_deleted,
        wt_modified,
        wt_deleted,
        untracked,
    })
}

/// Collapse a first-level directory to `name/` when every worktree file
/// beneath it is untracked; root-level files always print individually.
fn collapse_untracked(all_files: &[String], untracked: &[&str]) -> Vec<String> {
    let untracked_set: Xxh3HashSet<&str> = untracked.iter().copied().collect();

    let mut by_dir: HashMap<&str, Vec<&str>> = HashMap::new();
    for path in all_files {
        if let Some(slash) = path.find('/') {
            by_dir.entry(&path[..slash]).or_default().push(path);
        }
    }

    let mut out = Vec::new();
    let mut collapsed: Xxh3HashSet<&str> = Xxh3HashSet::default();

    for &path in untracked {
        let Some(slash) = path.find('/') else {
            out.push(path.to_string());
            continue;
        };
        let dir = &path[..slash];
        if collapsed.contains(dir) {
            continue;
        }

        let group = &by_dir[dir];
        if group.iter().all(|p| untracked_set.contains(p)) {
            out.push(format!("{dir}/"));
            collapsed.insert(dir);
        } else {
            out.push(path.to_string());
        }
    }

    out
}

#[cfg(unix)]
fn stat_times_ns(meta: &fs::Metadata) -> (i128, i128) {
    use std::os::unix::fs::MetadataExt;
    (
        i128::from(meta.ctime()) * 1_000_000_000 + i128::from(meta.ctime_nsec()),
        i128::from(meta.mtime()) * 1_000_000_000 + i128::from(meta.mtime_nsec()),
    )
}

#[cfg(not(unix))]
fn stat_times_ns(meta: &fs::Metadata) -> (i128, i128) {
    let mtime = meta
        .modified()
        .ok()
        .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
        .map_or(0, |d| d.as_nanos() as i128);
    (mtime, mtime)
}

pub fn print_status(report: &StatusReport, out: &mut impl Write) -> Result<()> {
    match (&report.branch, &report.head_sha) {
        (Some(branch), _) => writeln!(out, "On branch {branch}.")?,
        (None, Some(sha)) => writeln!(out, "HEAD detached at {sha}")?,
        (None, None) => writeln!(out, "HEAD detached")?,
    }

    writeln!(out, "Changes to be committed:")?;
    for name in &report.staged_modified {
        writeln!(out, "  modified: {name}")?;
    }
    for name in &report.staged_added {
        writeln!(out, "  added:    {name}")?;
    }
    for name in &report.staged_deleted {
        writeln!(out, "  deleted:  {name}")?;
    }

    writeln!(out)?;
    writeln!(out, "Changes not staged for commit:")?;
    for name in &report.wt_modified {
        writeln!(out, "  modified: {name}")?;
    }
    for name in &report.wt_deleted {
        writeln!(out, "  deleted:  {name}")?;
    }

    writeln!(out)?;
    writeln!(out, "Untracked files:")?;
    for name in &report.untracked {
        writeln!(out, "  {name}")?;
    }

    Ok(())
}

pub fn status(repo: &Repository, out: &mut impl Write) -> Result<()> {
    let report = collect_status(repo)?;
    print_status(&report, out)
}
