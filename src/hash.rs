use anyhow::Result;
use sha1::{Digest, Sha1};

/// Raw object id: 20 SHA-1 bytes. Hex form is a 40-char lowercase string.
pub type Oid = [u8; 20];

#[must_use]
pub fn hash_bytes(data: &[u8]) -> Oid {
    let mut hasher = Sha1::new();
    hasher.update(data);
    hasher.finalize().into()
}

#[must_use]
pub fn oid_to_hex(oid: &Oid) -> String {
    hex::encode(oid)
}

pub fn hex_to_oid(s: &str) -> Result<Oid> {
    let bytes = hex::decode(s)?;
    bytes
        .try_into()
        .map_err(|_| anyhow::anyhow!("invalid object id length"))
}
