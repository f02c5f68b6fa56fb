//! Loose object store: zlib-compressed framed objects addressed by the
//! SHA-1 of their uncompressed representation, living at
//! `objects/<sha[0..2]>/<sha[2..]>`.

use crate::error::VesError;
use crate::object::{FMT_TREE, Object};
use crate::refs::ref_resolve;
use crate::repository::Repository;

use std::fs;
use std::io::{Read, Write};
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use flate2::Compression;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use regex::Regex;
use smallvec::SmallVec;

/// Candidate SHAs for a name. Nearly always zero or one entry.
pub type Candidates = SmallVec<[String; 2]>;

fn object_path(repo: &Repository, sha: &str) -> PathBuf {
    repo.repo_path(PathBuf::from("objects").join(&sha[..2]).join(&sha[2..]))
}

/// Read and decode the object stored under `sha`.
pub fn object_read(repo: &Repository, sha: &str) -> Result<Object> {
    let path = object_path(repo, sha);
    if !path.is_file() {
        bail!("object {sha} not found");
    }

    let compressed = fs::read(&path)
        .with_context(|| format!("cannot read object {}", path.display()))?;

    let mut raw = Vec::new();
    ZlibDecoder::new(compressed.as_slice())
        .read_to_end(&mut raw)
        .map_err(|e| VesError::MalformedObject {
            sha: sha.to_string(),
            reason: format!("zlib: {e}"),
        })?;

    log::debug!("read object {sha} ({} bytes)", raw.len());
    Object::decode(&raw, sha)
}

/// Hash an object; when a repository is given, also compress and store
/// it. Content addressing makes the write idempotent: an existing file
/// is left alone.
pub fn object_write(obj: &Object, repo: Option<&Repository>) -> Result<String> {
    let framed = obj.encode();
    let sha = obj.hash();

    let Some(repo) = repo else {
        return Ok(sha);
    };

    let path = object_path(repo, &sha);
    if path.exists() {
        return Ok(sha);
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&framed)?;
    let compressed = encoder.finish()?;
    fs::write(&path, compressed)
        .with_context(|| format!("cannot write object {}", path.display()))?;

    log::debug!("wrote object {sha}");
    Ok(sha)
}

/// Hash raw payload bytes as an object of type `fmt`, optionally storing
/// the result. Backs `hash-object` and blob staging.
pub fn object_hash(data: &[u8], fmt: &[u8], repo: Option<&Repository>) -> Result<String> {
    let obj = Object::from_payload(fmt, data)?;
    object_write(&obj, repo)
}

/// Collect every SHA a user-supplied name could refer to: `HEAD`, a
/// 4..40-char hex prefix, or a tag/head/remote ref, in that order.
pub fn object_resolve(repo: &Repository, name: &str) -> Result<Candidates> {
    let mut candidates = Candidates::new();

    let name = name.trim();
    if name.is_empty() {
        return Ok(candidates);
    }

    if name == "HEAD" {
        if let Some(sha) = ref_resolve(repo, "HEAD")? {
            candidates.push(sha);
        }
        return Ok(candidates);
    }

    let hash_re = Regex::new("^[0-9A-Fa-f]{4,40}$").expect("valid literal regex");
    if hash_re.is_match(name) {
        let name = name.to_lowercase();
        let prefix = &name[..2];
        let rest = &name[2..];

        if let Some(dir) = repo.repo_dir(PathBuf::from("objects").join(prefix), false)? {
            for entry in fs::read_dir(dir)? {
                let file_name = entry?.file_name().to_string_lossy().into_owned();
                if file_name.starts_with(rest) {
                    candidates.push(format!("{prefix}{file_name}"));
                }
            }
        }
    }

    for namespace in ["refs/tags", "refs/heads", "refs/remotes"] {
        if let Some(sha) = ref_resolve(repo, &format!("{namespace}/{name}"))? {
            candidates.push(sha);
        }
    }

    Ok(candidates)
}

/// Resolve a name to exactly one SHA, optionally constrained to an
/// object type. With `follow`, tags are peeled to their target and
/// commits to their tree when a tree is wanted.
pub fn object_find(
    repo: &Repository,
    name: &str,
    fmt: Option<&[u8]>,
    follow: bool,
) -> Result<Option<String>> {
    let candidates = object_resolve(repo, name)?;

    if candidates.is_empty() {
        return Err(VesError::NoSuchReference(name.to_string()).into());
    }
    if candidates.len() > 1 {
        return Err(VesError::AmbiguousReference {
            name: name.to_string(),
            candidates: candidates.to_vec(),
        }
        .into());
    }

    let mut sha = candidates.into_iter().next().expect("one candidate");
    let Some(fmt) = fmt else {
        return Ok(Some(sha));
    };

    loop {
        let obj = object_read(repo, &sha)?;
        if obj.fmt() == fmt {
            return Ok(Some(sha));
        }
        if !follow {
            return Ok(None);
        }

        // Peel indirections: tag -> object, commit -> tree.
        sha = match &obj {
            Object::Tag(tag) => field_as_sha(tag.kvlm.get(b"object"), &sha, "object")?,
            Object::Commit(commit) if fmt == FMT_TREE => {
                field_as_sha(commit.kvlm.get(b"tree"), &sha, "tree")?
            }
            _ => return Ok(None),
        };
    }
}

fn field_as_sha(value: Option<&[u8]>, holder: &str, key: &str) -> Result<String> {
    let value = value.ok_or_else(|| anyhow::anyhow!("{holder} has no {key} field"))?;
    Ok(std::str::from_utf8(value)?.to_string())
}
