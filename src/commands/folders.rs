use std::path::{Path, PathBuf};

use anyhow::Result;
use chrono::NaiveDate;

use crate::model::LayoutPaths;
use crate::util::ensure_directory;

pub const TAG_FILE_NAME: &str = "xjmtr.txt";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderLayout {
    pub root: PathBuf,
    pub data: PathBuf,
    pub documents: PathBuf,
}

impl FolderLayout {
    pub fn tag_file(&self) -> PathBuf {
        self.root.join(TAG_FILE_NAME)
    }

    pub fn manifest_dir(&self) -> PathBuf {
        self.root.join("manifests")
    }

    pub fn paths(&self) -> LayoutPaths {
        LayoutPaths {
            root: self.root.display().to_string(),
            data: self.data.display().to_string(),
            documents: self.documents.display().to_string(),
            tag_file: self.tag_file().display().to_string(),
        }
    }
}

/// Creates `<base>/<YYYYMMDD>/{Data,Documents}`; safe to call repeatedly.
pub fn create_folder_structure(base_dir: &Path, run_date: NaiveDate) -> Result<FolderLayout> {
    let root = base_dir.join(run_date.format("%Y%m%d").to_string());
    let layout = FolderLayout {
        data: root.join("Data"),
        documents: root.join("Documents"),
        root,
    };

    for folder in [&layout.root, &layout.data, &layout.documents] {
        ensure_directory(folder)?;
    }

    Ok(layout)
}
