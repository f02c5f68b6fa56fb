use crate::error::VesError;
use crate::index::{IndexEntry, MODE_TYPE_REGULAR, MODE_TYPE_SYMLINK, with_index};
use crate::object::FMT_BLOB;
use crate::remove::rm_in_memory;
use crate::repository::Repository;
use crate::storage::object_hash;
use crate::util::{absolutize, worktree_relative};

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Result;

/// Stage files into the index. The whole batch runs inside one index
/// session: read once, mutate, written only if every path stages.
pub fn add(repo: &Repository, paths: &[PathBuf]) -> Result<()> {
    with_index(repo, |index| {
        // Drop stale entries for these paths first; files stay on disk.
        rm_in_memory(index, repo, paths, false, true)?;

        for path in paths {
            let abs = absolutize(path)?;
            let name = worktree_relative(repo, &abs)?;
            index.entries.push(stage_one(repo, &abs, name)?);
        }

        Ok(())
    })
}

fn stage_one(repo: &Repository, abs: &Path, name: String) -> Result<IndexEntry> {
    let meta = fs::symlink_metadata(abs)
        .map_err(|_| VesError::NotAFileOrSymlink(abs.to_path_buf()))?;

    let is_link = meta.file_type().is_symlink();
    if !is_link && !meta.is_file() {
        return Err(VesError::NotAFileOrSymlink(abs.to_path_buf()).into());
    }

    // Symlinks store their target text as the blob and carry no
    // permission bits; regular files are recorded with 0644.
    let (sha, mode_type, mode_perms) = if is_link {
        let target = fs::read_link(abs)?;
        let sha = object_hash(
            target.to_string_lossy().as_bytes(),
            FMT_BLOB,
            Some(repo),
        )?;
        (sha, MODE_TYPE_SYMLINK, 0)
    } else {
        let data = fs::read(abs)?;
        (object_hash(&data, FMT_BLOB, Some(repo))?, MODE_TYPE_REGULAR, 0o644)
    };

    let stat = StatFields::from_meta(&meta);

    Ok(IndexEntry {
        ctime: stat.ctime,
        mtime: stat.mtime,
        dev: stat.dev,
        ino: stat.ino,
        mode_type,
        mode_perms,
        uid: stat.uid,
        gid: stat.gid,
        fsize: meta.len() as u32,
        sha,
        flag_assume_valid: false,
        flag_stage: 0,
        name,
    })
}

/// Filesystem metadata narrowed to the u32 fields the index records.
struct StatFields {
    ctime: (u32, u32),
    mtime: (u32, u32),
    dev: u32,
    ino: u32,
    uid: u32,
    gid: u32,
}

impl StatFields {
    #[cfg(unix)]
    fn from_meta(meta: &fs::Metadata) -> Self {
        use std::os::unix::fs::MetadataExt;
        Self {
            ctime: (meta.ctime() as u32, meta.ctime_nsec() as u32),
            mtime: (meta.mtime() as u32, meta.mtime_nsec() as u32),
            dev: meta.dev() as u32,
            ino: meta.ino() as u32,
            uid: meta.uid(),
            gid: meta.gid(),
        }
    }

    #[cfg(not(unix))]
    fn from_meta(meta: &fs::Metadata) -> Self {
        let secs = meta
            .modified()
            .ok()
            .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
            .map_or(0, |d| d.as_secs() as u32);
        Self {
            ctime: (secs, 0),
            mtime: (secs, 0),
            dev: 0,
            ino: 0,
            uid: 0,
            gid: 0,
        }
    }
}
