//! Layered ignore rules. Absolute rule sets come from `info/exclude`
//! and the global ignore file; scoped sets come from `.vesignore` blobs
//! tracked in the index and bind to their containing directory.
//!
//! Precedence: the innermost scoped ruleset with any match decides;
//! within one ruleset the last matching rule wins; across absolute
//! rulesets the first set with a match wins.

use crate::config::global_ignore_file;
use crate::index::Index;
use crate::repository::Repository;
use crate::storage::object_read;
use crate::util::dirname;

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::{Result, bail};
use glob::Pattern;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IgnoreRule {
    pub pattern: String,
    /// `true` ignores matching paths, `false` un-ignores them.
    pub ignore: bool,
}

#[derive(Debug, Default)]
pub struct Ignore {
    pub absolute: Vec<Vec<IgnoreRule>>,
    pub scoped: HashMap<String, Vec<IgnoreRule>>,
}

pub fn ignore_read(repo: &Repository) -> Result<Ignore> {
    let mut ret = Ignore::default();

    let exclude = repo.repo_path("info").join("exclude");
    if exclude.is_file() {
        ret.absolute.push(parse_rules(&fs::read_to_string(exclude)?));
    }

    let global = global_ignore_file();
    if global.is_file() {
        ret.absolute.push(parse_rules(&fs::read_to_string(global)?));
    }

    let index = Index::read(repo)?;
    for entry in &index.entries {
        if entry.name == ".vesignore" || entry.name.ends_with("/.vesignore") {
            let obj = object_read(repo, &entry.sha)?;
            let text = String::from_utf8_lossy(&obj.try_as_blob()?.data).into_owned();
            ret.scoped.insert(dirname(&entry.name).to_string(), parse_rules(&text));
        }
    }

    Ok(ret)
}

/// `#` starts a comment, `!` negates, `\` escapes a literal `#` or `!`.
fn parse_line(raw: &str) -> Option<IgnoreRule> {
    let raw = raw.trim();

    if raw.is_empty() || raw.starts_with('#') {
        return None;
    }
    if let Some(rest) = raw.strip_prefix('!') {
        return Some(IgnoreRule { pattern: rest.to_string(), ignore: false });
    }
    if let Some(rest) = raw.strip_prefix('\\') {
        return Some(IgnoreRule { pattern: rest.to_string(), ignore: true });
    }
    Some(IgnoreRule { pattern: raw.to_string(), ignore: true })
}

#[must_use]
pub fn parse_rules(text: &str) -> Vec<IgnoreRule> {
    text.lines().filter_map(parse_line).collect()
}

/// Evaluate one ruleset; the last matching rule decides.
fn check_rules(rules: &[IgnoreRule], path: &str) -> Option<bool> {
    let mut result = None;
    for rule in rules {
        let matched = Pattern::new(&rule.pattern)
            .map(|p| p.matches(path))
            .unwrap_or(false);
        if matched {
            result = Some(rule.ignore);
        }
    }
    result
}

fn check_scoped(scoped: &HashMap<String, Vec<IgnoreRule>>, path: &str) -> Option<bool> {
    let mut parent = dirname(path);
    loop {
        if let Some(rules) = scoped.get(parent) {
            if let Some(result) = check_rules(rules, path) {
                return Some(result);
            }
        }
        if parent.is_empty() {
            break;
        }
        parent = dirname(parent);
    }
    None
}

fn check_absolute(absolute: &[Vec<IgnoreRule>], path: &str) -> bool {
    for ruleset in absolute {
        if let Some(result) = check_rules(ruleset, path) {
            return result;
        }
    }
    false
}

/// Whether a worktree-relative path is ignored. Absolute paths are a
/// caller bug.
pub fn check_ignore(ignore: &Ignore, path: &str) -> Result<bool> {
    if Path::new(path).is_absolute() {
        bail!("check-ignore requires paths relative to the worktree: {path}");
    }

    if let Some(result) = check_scoped(&ignore.scoped, path) {
        return Ok(result);
    }
    Ok(check_absolute(&ignore.absolute, path))
}
