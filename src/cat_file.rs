use crate::repository::Repository;
use crate::storage::{object_find, object_read};

use std::io::Write;

use anyhow::Result;

/// Write an object's serialized payload to `out`.
pub fn cat_file(
    repo: &Repository,
    name: &str,
    fmt: Option<&[u8]>,
    out: &mut impl Write,
) -> Result<()> {
    let Some(sha) = object_find(repo, name, fmt, true)? else {
        return Ok(());
    };

    let obj = object_read(repo, &sha)?;
    out.write_all(&obj.serialize())?;
    Ok(())
}
