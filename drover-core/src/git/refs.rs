//! Ref inspection for mirror clones and remotes

use std::collections::BTreeMap;
use std::path::Path;

use git2::Repository;

use crate::{Error, Result};

/// Ref name to object id (hex)
pub type RefMap = BTreeMap<String, String>;

fn open(path: &Path) -> Result<Repository> {
    Repository::open(path).map_err(|e| {
        Error::Git(format!(
            "Failed to open repository {}: {}",
            path.display(),
            e.message()
        ))
    })
}

/// All refs under `refs/` in the repository at `path`
///
/// Symbolic refs are resolved to the object they point at.
pub fn local_refs(path: &Path) -> Result<RefMap> {
    let repo = open(path)?;
    let mut refs = RefMap::new();

    for reference in repo.references()? {
        let reference = reference?;
        let Some(name) = reference.name() else {
            continue;
        };
        if !name.starts_with("refs/") {
            continue;
        }

        let resolved = reference.resolve()?;
        if let Some(oid) = resolved.target() {
            refs.insert(name.to_string(), oid.to_string());
        }
    }

    Ok(refs)
}

/// Delete every ref whose name starts with one of `prefixes`
///
/// Returns the number of refs deleted.
pub fn prune_refs(path: &Path, prefixes: &[String]) -> Result<usize> {
    if prefixes.is_empty() {
        return Ok(0);
    }

    let repo = open(path)?;
    let doomed: Vec<String> = repo
        .references()?
        .filter_map(|r| r.ok())
        .filter_map(|r| r.name().map(str::to_string))
        .filter(|name| is_excluded(name, prefixes))
        .collect();

    for name in &doomed {
        repo.find_reference(name)?.delete()?;
    }

    Ok(doomed.len())
}

/// Whether `name` falls under one of the excluded prefixes
pub fn is_excluded(name: &str, prefixes: &[String]) -> bool {
    prefixes.iter().any(|p| name.starts_with(p.as_str()))
}

/// Parse `git ls-remote` output
///
/// `HEAD` and peeled tag entries (`^{}`) are skipped.
pub fn parse_ls_remote(output: &str) -> RefMap {
    output
        .lines()
        .filter_map(|line| line.split_once('\t'))
        .map(|(oid, name)| (oid.trim(), name.trim()))
        .filter(|(_, name)| name.starts_with("refs/") && !name.ends_with("^{}"))
        .map(|(oid, name)| (name.to_string(), oid.to_string()))
        .collect()
}

/// Describe every ref that differs between `expected` and `actual`
pub fn diff_refs(expected: &RefMap, actual: &RefMap) -> Vec<String> {
    let mut differences = Vec::new();

    for (name, oid) in expected {
        match actual.get(name) {
            None => differences.push(format!("missing {}", name)),
            Some(other) if other != oid => {
                differences.push(format!("{} is {} instead of {}", name, other, oid))
            }
            Some(_) => {}
        }
    }

    for name in actual.keys() {
        if !expected.contains_key(name) {
            differences.push(format!("unexpected {}", name));
        }
    }

    differences
}
