use crate::index::{Index, IndexEntry};
use crate::object::{FMT_TREE, MODE_TREE, Object, Tree, TreeLeaf};
use crate::repository::Repository;
use crate::storage::{object_find, object_read, object_write};
use crate::util::{basename, dirname, join_rel};

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::Result;

/// What a directory bucket holds while building trees from the index:
/// file entries straight from the index, or subtrees already written.
enum BucketItem {
    File { mode: [u8; 6], name: String, sha: String },
    Subdir { name: String, sha: String },
}

/// Build the root tree for a flat index, writing every intermediate tree
/// to the object store. Deepest directories are written first so parents
/// can reference their SHAs; the root (`""`) comes last.
pub fn tree_from_index(repo: &Repository, index: &Index) -> Result<String> {
    let mut contents: HashMap<String, Vec<BucketItem>> = HashMap::new();
    contents.insert(String::new(), Vec::new());

    for entry in &index.entries {
        let dir = dirname(&entry.name);

        let mut key = dir;
        while !key.is_empty() {
            contents.entry(key.to_string()).or_default();
            key = dirname(key);
        }

        contents.entry(dir.to_string()).or_default().push(BucketItem::File {
            mode: entry_mode(entry),
            name: basename(&entry.name).to_string(),
            sha: entry.sha.clone(),
        });
    }

    let mut dirs: Vec<String> = contents.keys().cloned().collect();
    dirs.sort_by_key(|d| std::cmp::Reverse(d.len()));

    let mut root_sha = String::new();
    for dir in dirs {
        let items = contents.remove(&dir).unwrap_or_default();

        let leaves = items
            .into_iter()
            .map(|item| match item {
                BucketItem::File { mode, name, sha } => TreeLeaf { mode, path: name, sha },
                BucketItem::Subdir { name, sha } => {
                    TreeLeaf { mode: MODE_TREE, path: name, sha }
                }
            })
            .collect();

        let sha = object_write(&Object::Tree(Tree { leaves }), Some(repo))?;

        if dir.is_empty() {
            root_sha = sha;
        } else {
            let parent = contents
                .get_mut(dirname(&dir))
                .expect("ancestor buckets exist for every directory");
            parent.push(BucketItem::Subdir { name: basename(&dir).to_string(), sha });
        }
    }

    Ok(root_sha)
}

/// Index entry mode as the six octal digits a tree leaf carries, e.g.
/// regular 0644 becomes `100644`.
fn entry_mode(entry: &IndexEntry) -> [u8; 6] {
    let s = format!("{:02o}{:04o}", entry.mode_type, entry.mode_perms);
    s.as_bytes().try_into().expect("mode formats to six digits")
}

/// Flatten a tree-ish reference to a `path -> sha` map over all
/// non-directory leaves.
pub fn tree_to_dict(repo: &Repository, reference: &str) -> Result<HashMap<String, String>> {
    let mut ret = HashMap::new();
    if let Some(sha) = object_find(repo, reference, Some(FMT_TREE), true)? {
        flatten_into(repo, &sha, "", &mut ret)?;
    }
    Ok(ret)
}

fn flatten_into(
    repo: &Repository,
    sha: &str,
    prefix: &str,
    out: &mut HashMap<String, String>,
) -> Result<()> {
    let tree = object_read(repo, sha)?.try_into_tree()?;

    for leaf in tree.leaves {
        let full = join_rel(prefix, &leaf.path);
        if leaf.kind() == b"04" {
            flatten_into(repo, &leaf.sha, &full, out)?;
        } else {
            out.insert(full, leaf.sha);
        }
    }
    Ok(())
}

/// Materialize `tree` under `dest`, which must already exist. Subtrees
/// become directories, `12`-mode blobs become symlinks, gitlinks are
/// skipped.
pub fn tree_checkout(repo: &Repository, tree: &Tree, dest: &Path) -> Result<()> {
    for leaf in &tree.leaves {
        let target = dest.join(&leaf.path);

        match leaf.kind() {
            b"04" => {
                fs::create_dir(&target)?;
                let sub = object_read(repo, &leaf.sha)?.try_into_tree()?;
                tree_checkout(repo, &sub, &target)?;
            }
            b"12" => {
                let obj = object_read(repo, &leaf.sha)?;
                let link = String::from_utf8(obj.try_as_blob()?.data.clone())?;
                make_symlink(&link, &target)?;
            }
            b"16" => {} // gitlink: nothing to materialize
            _ => {
                let obj = object_read(repo, &leaf.sha)?;
                fs::write(&target, &obj.try_as_blob()?.data)?;
            }
        }
    }
    Ok(())
}

#[cfg(unix)]
fn make_symlink(target: &str, at: &Path) -> Result<()> {
    std::os::unix::fs::symlink(target, at)?;
    Ok(())
}

#[cfg(not(unix))]
fn make_symlink(target: &str, at: &Path) -> Result<()> {
    // Fall back to a plain file carrying the link target.
    fs::write(at, target)?;
    Ok(())
}
