//! The staging area: a packed binary file (signature `DIRC`, version 2,
//! big-endian) listing the files that will make up the next commit.

use crate::error::VesError;
use crate::repository::Repository;

use std::fs;

use anyhow::{Context, Result};

pub const MODE_TYPE_REGULAR: u16 = 0b1000;
pub const MODE_TYPE_SYMLINK: u16 = 0b1010;
pub const MODE_TYPE_GITLINK: u16 = 0b1110;

const SIGNATURE: &[u8; 4] = b"DIRC";
const VERSION: u32 = 2;

/// Fixed-size prefix of every entry, before the name.
const ENTRY_FIXED: usize = 62;
/// Name lengths at or above this are stored as a sentinel and recovered
/// by scanning for the NUL terminator.
const NAME_LEN_MAX: usize = 0xFFF;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    pub ctime: (u32, u32),
    pub mtime: (u32, u32),
    pub dev: u32,
    pub ino: u32,
    /// 0b1000 regular, 0b1010 symlink, 0b1110 gitlink.
    pub mode_type: u16,
    /// Low nine permission bits.
    pub mode_perms: u16,
    pub uid: u32,
    pub gid: u32,
    pub fsize: u32,
    /// 40-char lowercase hex.
    pub sha: String,
    pub flag_assume_valid: bool,
    /// Merge stage, kept pre-shifted (`stage << 12`) as stored on disk.
    pub flag_stage: u16,
    /// Worktree-relative path, `/`-separated.
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Index {
    pub version: u32,
    pub entries: Vec<IndexEntry>,
}

impl Default for Index {
    fn default() -> Self {
        Self { version: VERSION, entries: Vec::new() }
    }
}

impl Index {
    /// Read the index file; a repository without one gets an empty index.
    pub fn read(repo: &Repository) -> Result<Self> {
        let path = repo.repo_path("index");
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = fs::read(&path)
            .with_context(|| format!("cannot read index {}", path.display()))?;
        let index = Self::decode(&raw)?;
        log::debug!("read index: {} entries", index.entries.len());
        Ok(index)
    }

    pub fn write(&self, repo: &Repository) -> Result<()> {
        let path = repo.repo_path("index");
        fs::write(&path, self.encode())
            .with_context(|| format!("cannot write index {}", path.display()))?;
        log::debug!("wrote index: {} entries", self.entries.len());
        Ok(())
    }

    #[must_use]
    pub fn find(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.name == name)
    }

    pub fn decode(raw: &[u8]) -> Result<Self> {
        let malformed = |reason: &str| VesError::MalformedIndex(reason.to_string());

        if raw.len() < 12 {
            return Err(malformed("truncated header").into());
        }
        if &raw[..4] != SIGNATURE {
            return Err(malformed("bad signature").into());
        }
        let version = read_u32(raw, 4);
        if version != VERSION {
            return Err(malformed(&format!("unsupported version {version}")).into());
        }
        let count = read_u32(raw, 8) as usize;

        let content = &raw[12..];
        let mut entries = Vec::with_capacity(count);
        let mut idx = 0;

        for _ in 0..count {
            if content.len() < idx + ENTRY_FIXED {
                return Err(malformed("truncated entry").into());
            }

            let ctime = (read_u32(content, idx), read_u32(content, idx + 4));
            let mtime = (read_u32(content, idx + 8), read_u32(content, idx + 12));
            let dev = read_u32(content, idx + 16);
            let ino = read_u32(content, idx + 20);

            let unused = read_u16(content, idx + 24);
            if unused != 0 {
                return Err(malformed("nonzero unused field").into());
            }

            let mode = read_u16(content, idx + 26);
            let mode_type = mode >> 12;
            if ![MODE_TYPE_REGULAR, MODE_TYPE_SYMLINK, MODE_TYPE_GITLINK].contains(&mode_type) {
                return Err(malformed(&format!("bad mode type {mode_type:#b}")).into());
            }
            let mode_perms = mode & 0o777;

            let uid = read_u32(content, idx + 28);
            let gid = read_u32(content, idx + 32);
            let fsize = read_u32(content, idx + 36);
            let sha = hex::encode(&content[idx + 40..idx + 60]);

            let flags = read_u16(content, idx + 60);
            let flag_assume_valid = flags & 0x8000 != 0;
            if flags & 0x4000 != 0 {
                return Err(malformed("extended flag set").into());
            }
            let flag_stage = flags & 0x3000;
            let name_length = (flags & 0xFFF) as usize;

            idx += ENTRY_FIXED;

            let raw_name = if name_length < NAME_LEN_MAX {
                if content.get(idx + name_length) != Some(&0) {
                    return Err(malformed("entry name not NUL-terminated").into());
                }
                let raw_name = &content[idx..idx + name_length];
                idx += name_length + 1;
                raw_name
            } else {
                // Long-name sentinel: the real name runs to the next NUL
                // at or after the sentinel length.
                let scan_from = idx + NAME_LEN_MAX;
                let nul = content
                    .get(scan_from..)
                    .and_then(|tail| tail.iter().position(|&b| b == 0))
                    .map(|i| scan_from + i)
                    .ok_or_else(|| malformed("unterminated long entry name"))?;
                let raw_name = &content[idx..nul];
                idx = nul + 1;
                raw_name
            };

            let name = std::str::from_utf8(raw_name)
                .map_err(|_| malformed("entry name is not valid utf-8"))?
                .to_string();

            // Entries start on 8-byte boundaries within the entry region.
            idx = idx.next_multiple_of(8);

            entries.push(IndexEntry {
                ctime,
                mtime,
                dev,
                ino,
                mode_type,
                mode_perms,
                uid,
                gid,
                fsize,
                sha,
                flag_assume_valid,
                flag_stage,
                name,
            });
        }

        Ok(Self { version, entries })
    }

    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();

        out.extend_from_slice(SIGNATURE);
        out.extend_from_slice(&self.version.to_be_bytes());
        out.extend_from_slice(&(self.entries.len() as u32).to_be_bytes());

        let mut idx = 0;
        for e in &self.entries {
            out.extend_from_slice(&e.ctime.0.to_be_bytes());
            out.extend_from_slice(&e.ctime.1.to_be_bytes());
            out.extend_from_slice(&e.mtime.0.to_be_bytes());
            out.extend_from_slice(&e.mtime.1.to_be_bytes());
            out.extend_from_slice(&e.dev.to_be_bytes());
            out.extend_from_slice(&e.ino.to_be_bytes());
            out.extend_from_slice(&0u16.to_be_bytes());

            let mode = (e.mode_type << 12) | e.mode_perms;
            out.extend_from_slice(&mode.to_be_bytes());

            out.extend_from_slice(&e.uid.to_be_bytes());
            out.extend_from_slice(&e.gid.to_be_bytes());
            out.extend_from_slice(&e.fsize.to_be_bytes());

            let oid = hex::decode(&e.sha).expect("index entry sha is valid hex");
            out.extend_from_slice(&oid);

            let name_bytes = e.name.as_bytes();
            let name_length = name_bytes.len().min(NAME_LEN_MAX) as u16;
            let assume_valid = if e.flag_assume_valid { 0x8000 } else { 0 };
            let flags = assume_valid | e.flag_stage | name_length;
            out.extend_from_slice(&flags.to_be_bytes());

            out.extend_from_slice(name_bytes);
            out.push(0);

            idx += ENTRY_FIXED + name_bytes.len() + 1;
            let pad = idx.next_multiple_of(8) - idx;
            out.extend_from_slice(&[0u8; 8][..pad]);
            idx += pad;
        }

        out
    }
}

/// Scoped index session: read once, hand the in-memory index to `f`,
/// write back only when it succeeds. An error leaves the on-disk index
/// untouched.
pub fn with_index<T>(repo: &Repository, f: impl FnOnce(&mut Index) -> Result<T>) -> Result<T> {
    let mut index = Index::read(repo)?;
    let ret = f(&mut index)?;
    index.write(repo)?;
    Ok(ret)
}

#[inline]
fn read_u32(raw: &[u8], off: usize) -> u32 {
    u32::from_be_bytes(raw[off..off + 4].try_into().expect("4 bytes"))
}

#[inline]
fn read_u16(raw: &[u8], off: usize) -> u16 {
    u16::from_be_bytes(raw[off..off + 2].try_into().expect("2 bytes"))
}
