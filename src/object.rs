use crate::error::VesError;
use crate::hash::{hash_bytes, hex_to_oid, oid_to_hex};
use crate::kvlm::Kvlm;

use anyhow::{Result, bail};

pub const FMT_BLOB: &[u8] = b"blob";
pub const FMT_TREE: &[u8] = b"tree";
pub const FMT_COMMIT: &[u8] = b"commit";
pub const FMT_TAG: &[u8] = b"tag";

/// Mode bytes for a subdirectory leaf inside a tree payload.
pub const MODE_TREE: [u8; 6] = *b"040000";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Object {
    Blob(Blob),
    Tree(Tree),
    Commit(Commit),
    Tag(Tag),
}

impl Object {
    #[inline]
    #[must_use]
    pub fn fmt(&self) -> &'static [u8] {
        match self {
            Self::Blob(_) => FMT_BLOB,
            Self::Tree(_) => FMT_TREE,
            Self::Commit(_) => FMT_COMMIT,
            Self::Tag(_) => FMT_TAG,
        }
    }

    #[inline]
    pub fn try_as_blob(&self) -> Result<&Blob> {
        match self {
            Self::Blob(b) => Ok(b),
            _ => bail!("not a blob"),
        }
    }

    #[inline]
    pub fn try_as_tree(&self) -> Result<&Tree> {
        match self {
            Self::Tree(t) => Ok(t),
            _ => bail!("not a tree"),
        }
    }

    #[inline]
    pub fn try_as_commit(&self) -> Result<&Commit> {
        match self {
            Self::Commit(c) => Ok(c),
            _ => bail!("not a commit"),
        }
    }

    #[inline]
    pub fn try_into_tree(self) -> Result<Tree> {
        match self {
            Self::Tree(t) => Ok(t),
            _ => bail!("not a tree"),
        }
    }

    /// Build a typed object from raw payload bytes.
    pub fn from_payload(fmt: &[u8], payload: &[u8]) -> Result<Self> {
        match fmt {
            FMT_BLOB => Ok(Self::Blob(Blob { data: payload.to_vec() })),
            FMT_TREE => Ok(Self::Tree(Tree::parse(payload)?)),
            FMT_COMMIT => Ok(Self::Commit(Commit { kvlm: Kvlm::parse(payload)? })),
            FMT_TAG => Ok(Self::Tag(Tag { kvlm: Kvlm::parse(payload)? })),
            _ => bail!("unknown object type {}", String::from_utf8_lossy(fmt)),
        }
    }

    /// Serialize the payload only (what `cat-file` prints).
    #[must_use]
    pub fn serialize(&self) -> Vec<u8> {
        match self {
            Self::Blob(b) => b.data.clone(),
            Self::Tree(t) => t.serialize(),
            Self::Commit(c) => c.kvlm.serialize(),
            Self::Tag(t) => t.kvlm.serialize(),
        }
    }

    /// Frame the payload as `{type} {size}\0{payload}` — the bytes that
    /// get hashed and (compressed) stored.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let payload = self.serialize();
        let mut out = Vec::with_capacity(payload.len() + 16);
        out.extend_from_slice(self.fmt());
        out.push(b' ');
        out.extend_from_slice(payload.len().to_string().as_bytes());
        out.push(0);
        out.extend_from_slice(&payload);
        out
    }

    /// Parse a framed object. `sha` is only used for error reporting.
    pub fn decode(raw: &[u8], sha: &str) -> Result<Self> {
        let malformed = |reason: &str| VesError::MalformedObject {
            sha: sha.to_string(),
            reason: reason.to_string(),
        };

        let spc = raw
            .iter()
            .position(|&b| b == b' ')
            .ok_or_else(|| malformed("missing type terminator"))?;
        let fmt = &raw[..spc];

        let nul = raw[spc..]
            .iter()
            .position(|&b| b == 0)
            .map(|i| spc + i)
            .ok_or_else(|| malformed("missing size terminator"))?;

        let size: usize = std::str::from_utf8(&raw[spc + 1..nul])
            .ok()
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| malformed("bad size field"))?;

        let payload = &raw[nul + 1..];
        if size != payload.len() {
            return Err(malformed("bad length").into());
        }

        match fmt {
            FMT_BLOB | FMT_TREE | FMT_COMMIT | FMT_TAG => Self::from_payload(fmt, payload),
            _ => Err(malformed(&format!(
                "unknown type {}",
                String::from_utf8_lossy(fmt)
            ))
            .into()),
        }
    }

    /// Hex SHA-1 of the framed representation.
    #[must_use]
    pub fn hash(&self) -> String {
        oid_to_hex(&hash_bytes(&self.encode()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commit {
    pub kvlm: Kvlm,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    pub kvlm: Kvlm,
}

/// One entry of a tree payload: `{mode} {path}\0{sha-20-raw}` on disk.
/// Modes are normalized to six ASCII digits in memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeLeaf {
    pub mode: [u8; 6],
    pub path: String,
    pub sha: String,
}

impl TreeLeaf {
    /// First two mode digits: `04` tree, `10` regular, `12` symlink,
    /// `16` gitlink.
    #[inline]
    #[must_use]
    pub fn kind(&self) -> &[u8] {
        &self.mode[..2]
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tree {
    pub leaves: Vec<TreeLeaf>,
}

impl Tree {
    pub fn parse(raw: &[u8]) -> Result<Self> {
        let mut leaves = Vec::new();
        let mut pos = 0;

        while pos < raw.len() {
            let (next, leaf) = parse_leaf(raw, pos)?;
            leaves.push(leaf);
            pos = next;
        }

        Ok(Self { leaves })
    }

    /// Serialize with the canonical ordering: directories sort as if their
    /// name carried a trailing `/`.
    #[must_use]
    pub fn serialize(&self) -> Vec<u8> {
        let mut leaves: Vec<&TreeLeaf> = self.leaves.iter().collect();
        leaves.sort_by_key(|leaf| leaf_sort_key(leaf));

        let mut out = Vec::new();
        for leaf in leaves {
            out.extend_from_slice(&leaf.mode);
            out.push(b' ');
            out.extend_from_slice(leaf.path.as_bytes());
            out.push(0);
            // Leaves are built from hex SHAs we produced or parsed; a bad
            // one here is a programming error, not user input.
            let oid = hex_to_oid(&leaf.sha).expect("tree leaf sha is valid hex");
            out.extend_from_slice(&oid);
        }
        out
    }
}

#[must_use]
pub fn leaf_sort_key(leaf: &TreeLeaf) -> String {
    if leaf.mode.starts_with(b"10") {
        leaf.path.clone()
    } else {
        format!("{}/", leaf.path)
    }
}

fn parse_leaf(raw: &[u8], start: usize) -> Result<(usize, TreeLeaf)> {
    let spc = raw[start..]
        .iter()
        .position(|&b| b == b' ')
        .map(|i| start + i)
        .ok_or_else(|| anyhow::anyhow!("tree leaf: missing mode terminator"))?;

    let mode_len = spc - start;
    if mode_len != 5 && mode_len != 6 {
        bail!("tree leaf: mode is {mode_len} bytes, expected 5 or 6");
    }

    // Normalize five-digit modes by left-padding with '0'.
    let mut mode = *b"000000";
    mode[6 - mode_len..].copy_from_slice(&raw[start..spc]);

    let nul = raw[spc..]
        .iter()
        .position(|&b| b == 0)
        .map(|i| spc + i)
        .ok_or_else(|| anyhow::anyhow!("tree leaf: missing path terminator"))?;
    let path = std::str::from_utf8(&raw[spc + 1..nul])?.to_string();

    let sha_end = nul + 21;
    if raw.len() < sha_end {
        bail!("tree leaf: truncated sha");
    }
    let mut oid = [0u8; 20];
    oid.copy_from_slice(&raw[nul + 1..sha_end]);

    Ok((sha_end, TreeLeaf { mode, path, sha: oid_to_hex(&oid) }))
}
