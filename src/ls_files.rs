use crate::index::{Index, MODE_TYPE_GITLINK, MODE_TYPE_REGULAR, MODE_TYPE_SYMLINK};
use crate::repository::Repository;

use std::io::Write;

use anyhow::Result;

/// List index entry names; verbose mode adds the recorded metadata.
pub fn ls_files(repo: &Repository, verbose: bool, out: &mut impl Write) -> Result<()> {
    let index = Index::read(repo)?;

    for e in &index.entries {
        writeln!(out, "{}", e.name)?;
        if !verbose {
            continue;
        }

        let entry_type = match e.mode_type {
            MODE_TYPE_REGULAR => "regular file",
            MODE_TYPE_SYMLINK => "symlink",
            MODE_TYPE_GITLINK => "git link",
            _ => "unknown",
        };

        writeln!(out, "  {entry_type} with perms: {:o}", e.mode_perms)?;
        writeln!(out, "  on blob: {}", e.sha)?;
        writeln!(
            out,
            "  created: {}.{}, modified: {}.{}",
            format_timestamp(e.ctime.0),
            e.ctime.1,
            format_timestamp(e.mtime.0),
            e.mtime.1
        )?;
        writeln!(out, "  device: {}, inode: {}", e.dev, e.ino)?;
        writeln!(out, "  user: {}  group: {}", e.uid, e.gid)?;
        writeln!(
            out,
            "  flags: stage={} assume_valid={}",
            e.flag_stage >> 12,
            e.flag_assume_valid
        )?;
    }

    Ok(())
}

fn format_timestamp(secs: u32) -> String {
    chrono::DateTime::from_timestamp(i64::from(secs), 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_default()
}
