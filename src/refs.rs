use crate::kvlm::Kvlm;
use crate::object::{Object, Tag};
use crate::repository::Repository;
use crate::storage::{object_find, object_write};

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result, bail};

/// Symbolic chains longer than this are treated as malformed rather than
/// followed further.
const MAX_SYMBOLIC_DEPTH: usize = 16;

const TAG_MESSAGE: &[u8] =
    b"A tag generated by ves, which won't let you customize the message!\n";
const TAG_IDENTITY: &[u8] = b"Ves <ves@example.com>";

/// Nested, alphabetically ordered view of the refs directory.
#[derive(Debug)]
pub enum RefNode {
    /// A ref file and the SHA it resolves to (`None` if unresolvable).
    Direct(Option<String>),
    Dir(BTreeMap<String, RefNode>),
}

/// Follow a ref to a direct SHA. `r` is a path relative to `.ves`, e.g.
/// `HEAD` or `refs/heads/master`. Missing files yield `None`.
pub fn ref_resolve(repo: &Repository, r: &str) -> Result<Option<String>> {
    let mut current = r.to_string();

    for _ in 0..MAX_SYMBOLIC_DEPTH {
        let path = repo.repo_path(&current);
        if !path.is_file() {
            return Ok(None);
        }

        let data = fs::read_to_string(&path)
            .with_context(|| format!("cannot read ref {}", path.display()))?;
        let data = data.strip_suffix('\n').unwrap_or(&data);

        match data.strip_prefix("ref: ") {
            Some(target) => current = target.to_string(),
            None => return Ok(Some(data.to_string())),
        }
    }

    bail!("too many levels of symbolic references resolving {r}");
}

/// Write `<sha>\n` into `refs/<name>`, creating intermediate directories.
pub fn ref_create(repo: &Repository, name: &str, sha: &str) -> Result<()> {
    let path = repo.repo_file(Path::new("refs").join(name), true)?;
    fs::write(path, format!("{sha}\n"))?;
    Ok(())
}

/// Alphabetically sorted recursive listing, starting at `refs`.
pub fn ref_list(repo: &Repository) -> Result<BTreeMap<String, RefNode>> {
    ref_list_dir(repo, &repo.repo_path("refs"))
}

fn ref_list_dir(repo: &Repository, dir: &Path) -> Result<BTreeMap<String, RefNode>> {
    let mut ret = BTreeMap::new();
    if !dir.is_dir() {
        return Ok(ret);
    }

    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        let path = entry.path();

        if path.is_dir() {
            ret.insert(name, RefNode::Dir(ref_list_dir(repo, &path)?));
        } else {
            let rel = path
                .strip_prefix(&repo.ves_dir)
                .expect("ref path lives under the repo dir")
                .to_string_lossy()
                .into_owned();
            ret.insert(name, RefNode::Direct(ref_resolve(repo, &rel)?));
        }
    }

    Ok(ret)
}

/// Print a ref listing as `show-ref` does: `<sha> <prefix>/<name>` per
/// resolvable ref, recursing into subdirectories.
pub fn show_refs(
    refs: &BTreeMap<String, RefNode>,
    with_hash: bool,
    prefix: &str,
    out: &mut impl Write,
) -> Result<()> {
    for (name, node) in refs {
        let full = if prefix.is_empty() {
            name.clone()
        } else {
            format!("{prefix}/{name}")
        };

        match node {
            RefNode::Direct(Some(sha)) => {
                if with_hash {
                    writeln!(out, "{sha} {full}")?;
                } else {
                    writeln!(out, "{full}")?;
                }
            }
            RefNode::Direct(None) => {} // unresolvable, skip
            RefNode::Dir(inner) => show_refs(inner, with_hash, &full, out)?,
        }
    }
    Ok(())
}

/// Create a tag named `name` pointing at `target`. Lightweight tags are
/// a plain ref; annotated tags write a tag object first and point the
/// ref at it.
pub fn tag_create(repo: &Repository, name: &str, target: &str, annotated: bool) -> Result<()> {
    let sha = object_find(repo, target, None, true)?
        .with_context(|| format!("cannot resolve {target}"))?;

    if !annotated {
        return ref_create(repo, &format!("tags/{name}"), &sha);
    }

    let mut kvlm = Kvlm::new();
    kvlm.set(b"object", sha.into_bytes());
    kvlm.set(b"type", b"commit".to_vec());
    kvlm.set(b"tag", name.as_bytes().to_vec());
    kvlm.set(b"tagger", TAG_IDENTITY.to_vec());
    kvlm.set_message(TAG_MESSAGE.to_vec());

    let tag_sha = object_write(&Object::Tag(Tag { kvlm }), Some(repo))?;
    ref_create(repo, &format!("tags/{name}"), &tag_sha)
}
