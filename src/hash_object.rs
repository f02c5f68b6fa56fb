use crate::repository::Repository;
use crate::storage::object_hash;

use std::fs;
use std::path::Path;

use anyhow::Result;

/// Hash a file as an object of type `fmt`; stores it when a repository
/// is given. Returns the hex SHA.
pub fn hash_object(repo: Option<&Repository>, path: &Path, fmt: &[u8]) -> Result<String> {
    let data = fs::read(path)?;
    object_hash(&data, fmt, repo)
}
