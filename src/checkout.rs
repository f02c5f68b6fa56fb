use crate::object::Object;
use crate::repository::Repository;
use crate::storage::{object_find, object_read};
use crate::tree::tree_checkout;

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};

/// Materialize a commit's tree (or a bare tree) into `dest`, which must
/// be an empty directory or not exist yet.
pub fn checkout(repo: &Repository, name: &str, dest: &Path) -> Result<()> {
    let sha = object_find(repo, name, None, true)?
        .with_context(|| format!("cannot resolve {name}"))?;

    let tree = match object_read(repo, &sha)? {
        Object::Commit(commit) => {
            let tree_sha = commit
                .kvlm
                .get(b"tree")
                .context("commit has no tree field")?;
            let tree_sha = std::str::from_utf8(tree_sha)?;
            object_read(repo, tree_sha)?.try_into_tree()?
        }
        Object::Tree(tree) => tree,
        other => bail!(
            "{name} is a {}, not a commit or tree",
            String::from_utf8_lossy(other.fmt())
        ),
    };

    if dest.exists() {
        if !dest.is_dir() {
            bail!("not a directory: {}", dest.display());
        }
        if fs::read_dir(dest)?.next().is_some() {
            bail!("not empty: {}", dest.display());
        }
    } else {
        fs::create_dir_all(dest)?;
    }

    tree_checkout(repo, &tree, &dest.canonicalize()?)
}
