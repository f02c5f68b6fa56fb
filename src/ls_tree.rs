use crate::object::FMT_TREE;
use crate::repository::Repository;
use crate::storage::{object_find, object_read};
use crate::util::join_rel;

use std::io::Write;

use anyhow::{Result, bail};

/// Print `{mode} {type} {sha}\t{path}` per leaf, recursing into
/// subtrees when asked.
pub fn ls_tree(repo: &Repository, reference: &str, recursive: bool, out: &mut impl Write) -> Result<()> {
    ls_tree_at(repo, reference, recursive, "", out)
}

fn ls_tree_at(
    repo: &Repository,
    reference: &str,
    recursive: bool,
    prefix: &str,
    out: &mut impl Write,
) -> Result<()> {
    let Some(sha) = object_find(repo, reference, Some(FMT_TREE), true)? else {
        return Ok(());
    };
    let tree = object_read(repo, &sha)?.try_into_tree()?;

    for leaf in &tree.leaves {
        let kind = match leaf.kind() {
            b"04" => "tree",
            b"10" | b"12" => "blob", // symlink payloads are blobs too
            b"16" => "commit",       // submodule reference
            _ => bail!("weird tree leaf mode {}", String::from_utf8_lossy(&leaf.mode)),
        };

        let path = join_rel(prefix, &leaf.path);

        if recursive && kind == "tree" {
            ls_tree_at(repo, &leaf.sha, recursive, &path, out)?;
        } else {
            let mode = std::str::from_utf8(&leaf.mode)?;
            writeln!(out, "{mode} {kind} {}\t{path}", leaf.sha)?;
        }
    }

    Ok(())
}
