//! Key-Value List with Message: the line-oriented encoding inside commit
//! and tag payloads. Keys map to one or more byte values (duplicates keep
//! insertion order); the trailing message lives after a blank line.

use anyhow::{Result, bail};
use indexmap::IndexMap;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Kvlm {
    fields: IndexMap<Vec<u8>, Vec<Vec<u8>>>,
    message: Vec<u8>,
}

impl Kvlm {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// First value for `key`, if any.
    #[must_use]
    pub fn get(&self, key: &[u8]) -> Option<&[u8]> {
        self.fields.get(key).and_then(|vs| vs.first()).map(Vec::as_slice)
    }

    /// Every value recorded for `key`, in insertion order.
    #[must_use]
    pub fn get_all(&self, key: &[u8]) -> &[Vec<u8>] {
        self.fields.get(key).map_or(&[], Vec::as_slice)
    }

    #[must_use]
    pub fn contains(&self, key: &[u8]) -> bool {
        self.fields.contains_key(key)
    }

    /// Set `key` to a single value, replacing any previous values.
    pub fn set(&mut self, key: &[u8], value: Vec<u8>) {
        self.fields.insert(key.to_vec(), vec![value]);
    }

    /// Append a value under `key`, keeping earlier ones.
    pub fn push(&mut self, key: &[u8], value: Vec<u8>) {
        self.fields.entry(key.to_vec()).or_default().push(value);
    }

    #[must_use]
    pub fn message(&self) -> &[u8] {
        &self.message
    }

    pub fn set_message(&mut self, message: Vec<u8>) {
        self.message = message;
    }

    pub fn parse(raw: &[u8]) -> Result<Self> {
        let mut kvlm = Self::new();
        let mut start = 0;

        loop {
            if start >= raw.len() {
                break;
            }

            let spc = find_byte(raw, b' ', start);
            let nl = find_byte(raw, b'\n', start);

            // A newline before any space means the header section is over
            // and the rest is the message.
            let header_done = match (spc, nl) {
                (None, _) => true,
                (Some(s), Some(n)) => n < s,
                (Some(_), None) => false,
            };

            if header_done {
                if raw[start] != b'\n' {
                    bail!("kvlm: expected blank line before message");
                }
                kvlm.message = raw[start + 1..].to_vec();
                break;
            }

            let spc = spc.unwrap();
            let key = raw[start..spc].to_vec();

            // The value runs to the first newline not followed by a space;
            // continuation lines begin with one.
            let mut end = start;
            loop {
                end = match find_byte(raw, b'\n', end + 1) {
                    Some(e) => e,
                    None => bail!("kvlm: unterminated value"),
                };
                if raw.get(end + 1) != Some(&b' ') {
                    break;
                }
            }

            let value = unfold(&raw[spc + 1..end]);
            kvlm.fields.entry(key).or_default().push(value);

            start = end + 1;
        }

        Ok(kvlm)
    }

    #[must_use]
    pub fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::new();

        for (key, values) in &self.fields {
            for value in values {
                out.extend_from_slice(key);
                out.push(b' ');
                out.extend_from_slice(&fold(value));
                out.push(b'\n');
            }
        }

        out.push(b'\n');
        out.extend_from_slice(&self.message);
        out
    }
}

#[inline]
fn find_byte(raw: &[u8], byte: u8, from: usize) -> Option<usize> {
    raw.get(from..)?.iter().position(|&b| b == byte).map(|i| from + i)
}

/// Strip the leading space off continuation lines: `\n ` becomes `\n`.
fn unfold(value: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(value.len());
    let mut i = 0;
    while i < value.len() {
        out.push(value[i]);
        if value[i] == b'\n' && value.get(i + 1) == Some(&b' ') {
            i += 1; // skip the continuation space
        }
        i += 1;
    }
    out
}

/// Inverse of `unfold`: prefix every embedded newline with a space.
fn fold(value: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(value.len());
    for &b in value {
        out.push(b);
        if b == b'\n' {
            out.push(b' ');
        }
    }
    out
}
