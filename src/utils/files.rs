//! Local files turned into commit contents

use crate::types::CommitFile;
use anyhow::{Context, Result, anyhow};
use std::path::Path;
use walkdir::WalkDir;

/// Remote path for `relative` under `prefix`, always with `/` separators
fn remote_path(prefix: Option<&str>, relative: &Path) -> String {
    let relative = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/");

    match prefix.map(|p| p.trim_matches('/')).filter(|p| !p.is_empty()) {
        Some(prefix) => format!("{}/{}", prefix, relative),
        None => relative,
    }
}

/// Every regular file under `dir`, placed under `prefix` remotely.
/// `.git` directories are skipped and the result is sorted by path.
pub fn collect_dir(dir: &Path, prefix: Option<&str>) -> Result<Vec<CommitFile>> {
    if !dir.is_dir() {
        return Err(anyhow!("'{}' is not a directory", dir.display()));
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .into_iter()
        .filter_entry(|e| e.file_name() != ".git")
    {
        let entry = entry.with_context(|| format!("Failed to walk '{}'", dir.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }

        let relative = entry.path().strip_prefix(dir)?;
        let content = std::fs::read_to_string(entry.path())
            .with_context(|| format!("Failed to read '{}'", entry.path().display()))?;
        files.push(CommitFile::write(remote_path(prefix, relative), content));
    }

    files.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(files)
}

/// Split `<local>:<remote>`; a missing remote half means the local path
pub fn parse_file_mapping(mapping: &str) -> Result<(String, String)> {
    let (local, remote) = match mapping.split_once(':') {
        Some((local, remote)) => (local, remote),
        None => (mapping, mapping),
    };

    let remote = remote.trim_start_matches('/');
    if local.trim().is_empty() || remote.trim().is_empty() {
        return Err(anyhow!(
            "Invalid file mapping '{}', expected <local>:<remote>",
            mapping
        ));
    }
    Ok((local.to_string(), remote.to_string()))
}

/// Read the local half of a `<local>:<remote>` mapping
pub fn read_file_mapping(mapping: &str) -> Result<CommitFile> {
    let (local, remote) = parse_file_mapping(mapping)?;
    let content =
        std::fs::read_to_string(&local).with_context(|| format!("Failed to read '{}'", local))?;
    Ok(CommitFile::write(remote, content))
}
