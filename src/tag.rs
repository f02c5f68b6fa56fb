use crate::refs::{RefNode, ref_list, show_refs, tag_create};
use crate::repository::Repository;

use std::io::Write;

use anyhow::Result;

/// `tag` with a name creates (lightweight by default, annotated with
/// `-a`); without a name it lists existing tags.
pub fn tag(
    repo: &Repository,
    name: Option<&str>,
    target: &str,
    annotated: bool,
    out: &mut impl Write,
) -> Result<()> {
    match name {
        Some(name) => tag_create(repo, name, target, annotated),
        None => tag_list(repo, out),
    }
}

pub fn tag_list(repo: &Repository, out: &mut impl Write) -> Result<()> {
    let refs = ref_list(repo)?;
    if let Some(RefNode::Dir(tags)) = refs.get("tags") {
        show_refs(tags, false, "", out)?;
    }
    Ok(())
}
