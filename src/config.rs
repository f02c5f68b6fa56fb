//! User-level configuration: identity for commits and the location of
//! the global ignore file. `XDG_CONFIG_HOME` overrides `~/.config`.

use crate::error::VesError;

use std::path::PathBuf;

use anyhow::Result;
use ini::Ini;

#[must_use]
pub fn config_home() -> PathBuf {
    match std::env::var_os("XDG_CONFIG_HOME") {
        Some(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => home_dir().join(".config"),
    }
}

fn home_dir() -> PathBuf {
    std::env::var_os("HOME").map_or_else(|| PathBuf::from("/"), PathBuf::from)
}

#[must_use]
pub fn global_ignore_file() -> PathBuf {
    config_home().join("ves").join("ignore")
}

/// Resolve the committer identity as `Name <email>` from
/// `$XDG_CONFIG_HOME/ves/config` then `~/.vesconfig` (`[user]` section,
/// later files override earlier ones).
pub fn user_identity() -> Result<String> {
    let files = [config_home().join("ves").join("config"), home_dir().join(".vesconfig")];

    let mut name = None;
    let mut email = None;

    for file in files {
        if !file.is_file() {
            continue;
        }
        let Ok(conf) = Ini::load_from_file(&file) else {
            continue;
        };
        if let Some(v) = conf.get_from(Some("user"), "name") {
            name = Some(v.to_string());
        }
        if let Some(v) = conf.get_from(Some("user"), "email") {
            email = Some(v.to_string());
        }
    }

    match (name, email) {
        (Some(name), Some(email)) => Ok(format!("{name} <{email}>")),
        _ => Err(VesError::UserIdentityMissing.into()),
    }
}
