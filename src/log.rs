use crate::repository::Repository;
use crate::storage::{object_find, object_read};

use std::collections::HashSet;
use std::io::Write;

use anyhow::{Context, Result};

/// Emit the commit history reachable from `name` as a Graphviz DOT
/// graph: one node per commit, one edge per parent link.
pub fn log(repo: &Repository, name: &str, out: &mut impl Write) -> Result<()> {
    writeln!(out, "digraph veslog{{")?;
    writeln!(out, "  node[shape=rect]")?;

    let sha = object_find(repo, name, None, true)?
        .with_context(|| format!("cannot resolve {name}"))?;

    let mut seen = HashSet::new();
    let mut stack = vec![sha];

    while let Some(sha) = stack.pop() {
        if !seen.insert(sha.clone()) {
            continue;
        }

        let obj = object_read(repo, &sha)?;
        let commit = obj.try_as_commit()?;

        let message = String::from_utf8_lossy(commit.kvlm.message())
            .trim()
            .replace('\\', "\\\\")
            .replace('"', "\\\"");
        let first_line = message.lines().next().unwrap_or("");

        writeln!(out, "  c_{sha} [label=\"{}: {first_line}\"]", &sha[..7])?;

        for parent in commit.kvlm.get_all(b"parent") {
            let parent = std::str::from_utf8(parent)?;
            writeln!(out, "  c_{sha} -> c_{parent};")?;
            stack.push(parent.to_string());
        }
    }

    writeln!(out, "}}")?;
    Ok(())
}
