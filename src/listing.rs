use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListedEntry {
    pub name: String,
    pub is_file: bool,
}

/// Top-level view of a source folder. Entries come back in enumeration order.
pub trait DirectoryListing {
    fn root(&self) -> &Path;
    fn entries(&self) -> Result<Vec<ListedEntry>>;
}

pub struct FsDirectory {
    root: PathBuf,
}

impl FsDirectory {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl DirectoryListing for FsDirectory {
    fn root(&self) -> &Path {
        &self.root
    }

    fn entries(&self) -> Result<Vec<ListedEntry>> {
        let mut listed = Vec::new();

        let entries = fs::read_dir(&self.root)
            .with_context(|| format!("failed to read {}", self.root.display()))?;

        for entry in entries {
            let entry =
                entry.with_context(|| format!("failed to read entry in {}", self.root.display()))?;
            let path = entry.path();

            let Some(name) = entry.file_name().to_str().map(ToOwned::to_owned) else {
                warn!(path = %path.display(), "skipping non-UTF-8 file name");
                continue;
            };

            let is_file = entry
                .file_type()
                .with_context(|| format!("failed to inspect file type: {}", path.display()))?
                .is_file();

            listed.push(ListedEntry { name, is_file });
        }

        Ok(listed)
    }
}

#[cfg(test)]
pub struct FakeDirectory {
    pub root: PathBuf,
    pub entries: Vec<ListedEntry>,
}

#[cfg(test)]
impl FakeDirectory {
    pub fn files(names: &[&str]) -> Self {
        Self {
            root: PathBuf::from("/intake"),
            entries: names
                .iter()
                .map(|name| ListedEntry {
                    name: (*name).to_string(),
                    is_file: true,
                })
                .collect(),
        }
    }
}

#[cfg(test)]
impl DirectoryListing for FakeDirectory {
    fn root(&self) -> &Path {
        &self.root
    }

    fn entries(&self) -> Result<Vec<ListedEntry>> {
        Ok(self.entries.clone())
    }
}
