use crate::config::user_identity;
use crate::error::is_no_such_reference;
use crate::index::Index;
use crate::kvlm::Kvlm;
use crate::object::{Commit, Object};
use crate::repository::Repository;
use crate::status::branch_get_active;
use crate::storage::{object_find, object_write};
use crate::tree::tree_from_index;

use std::fs;

use anyhow::Result;
use chrono::{DateTime, Local};

/// Build and store a commit object. Keys land in the canonical order:
/// tree, parent (if any), author, committer, then the message.
pub fn commit_create(
    repo: &Repository,
    tree: &str,
    parent: Option<&str>,
    author: &str,
    timestamp: DateTime<Local>,
    message: &str,
) -> Result<String> {
    let mut kvlm = Kvlm::new();
    kvlm.set(b"tree", tree.as_bytes().to_vec());
    if let Some(parent) = parent {
        kvlm.set(b"parent", parent.as_bytes().to_vec());
    }

    let author_line = format!("{author} {} {}", timestamp.timestamp(), tz_offset(&timestamp));
    kvlm.set(b"author", author_line.clone().into_bytes());
    kvlm.set(b"committer", author_line.into_bytes());

    kvlm.set_message(format!("{}\n", message.trim()).into_bytes());

    object_write(&Object::Commit(Commit { kvlm }), Some(repo))
}

/// `±HHMM` for the timestamp's UTC offset.
fn tz_offset(timestamp: &DateTime<Local>) -> String {
    let seconds = timestamp.offset().local_minus_utc();
    let sign = if seconds >= 0 { '+' } else { '-' };
    let abs = seconds.abs();
    format!("{sign}{:02}{:02}", abs / 3600, (abs % 3600) / 60)
}

/// The full `commit` flow: tree from the index, parent from HEAD,
/// identity from the user config, then advance the active branch (or
/// HEAD itself when detached).
pub fn commit(repo: &Repository, message: &str) -> Result<String> {
    let index = Index::read(repo)?;
    let tree = tree_from_index(repo, &index)?;

    let parent = match object_find(repo, "HEAD", None, true) {
        Ok(sha) => sha,
        Err(e) if is_no_such_reference(&e) => None, // first commit
        Err(e) => return Err(e),
    };

    let author = user_identity()?;
    let sha = commit_create(repo, &tree, parent.as_deref(), &author, Local::now(), message)?;

    match branch_get_active(repo)? {
        Some(branch) => {
            let path = repo.repo_file(format!("refs/heads/{branch}"), true)?;
            fs::write(path, format!("{sha}\n"))?;
        }
        None => {
            fs::write(repo.repo_path("HEAD"), format!("{sha}\n"))?;
        }
    }

    Ok(sha)
}
