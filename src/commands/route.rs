use std::path::{Path, PathBuf};

use anyhow::Result;
use tracing::{debug, info};

use crate::commands::folders::FolderLayout;
use crate::commands::tag::write_judgment_tags;
use crate::listing::DirectoryListing;
use crate::model::{JudgmentTag, MovedFile, RoutedKind};
use crate::util::{ensure_directory, move_file, sha256_file};

const SPREADSHEET_EXTENSIONS: [&str; 3] = ["xlsx", "xls", "csv"];
const UNKNOWN_FOLDER: &str = "Unknown";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutePlan {
    pub kind: RoutedKind,
    pub subfolder: String,
    pub target_name: String,
}

#[derive(Debug, Default)]
pub struct RouteReport {
    pub tags: Vec<JudgmentTag>,
    pub moved: Vec<MovedFile>,
    pub skipped: Vec<String>,
}

impl RouteReport {
    pub fn spreadsheets(&self) -> impl Iterator<Item = PathBuf> + '_ {
        self.moved
            .iter()
            .filter(|moved| moved.kind == RoutedKind::Spreadsheet)
            .map(|moved| PathBuf::from(&moved.to))
    }
}

/// Where a file with this name belongs, or `None` when it stays in place.
///
/// Spreadsheets go under the stem prefix before the first underscore and keep
/// their name. PDFs go under the second underscore-separated stem segment and
/// have every underscore replaced by a space.
pub fn plan_route(file_name: &str) -> Option<RoutePlan> {
    let path = Path::new(file_name);
    let extension = path.extension()?.to_str()?.to_ascii_lowercase();
    let stem = path.file_stem()?.to_str()?;

    if SPREADSHEET_EXTENSIONS.contains(&extension.as_str()) {
        let prefix = stem.split('_').next().unwrap_or_default();
        return Some(RoutePlan {
            kind: RoutedKind::Spreadsheet,
            subfolder: folder_or_unknown(prefix),
            target_name: file_name.to_string(),
        });
    }

    if extension == "pdf" {
        let segment = stem.split('_').nth(1).unwrap_or(UNKNOWN_FOLDER);
        return Some(RoutePlan {
            kind: RoutedKind::Document,
            subfolder: folder_or_unknown(segment),
            target_name: file_name.replace('_', " "),
        });
    }

    None
}

fn folder_or_unknown(segment: &str) -> String {
    if segment.is_empty() {
        UNKNOWN_FOLDER.to_string()
    } else {
        segment.to_string()
    }
}

/// Writes the judgment tag file, then moves every routable top-level file of
/// the source folder into the layout.
pub fn route_files(
    listing: &dyn DirectoryListing,
    layout: &FolderLayout,
    tag_path: &Path,
) -> Result<RouteReport> {
    let tags = write_judgment_tags(listing, tag_path)?;
    info!(path = %tag_path.display(), tags = tags.len(), "wrote judgment tag file");

    let mut report = RouteReport {
        tags,
        ..RouteReport::default()
    };

    for entry in listing.entries()? {
        if !entry.is_file {
            continue;
        }

        let Some(plan) = plan_route(&entry.name) else {
            debug!(file = %entry.name, "left in place");
            report.skipped.push(entry.name);
            continue;
        };

        let base = match plan.kind {
            RoutedKind::Spreadsheet => &layout.data,
            RoutedKind::Document => &layout.documents,
        };
        let folder = base.join(&plan.subfolder);
        ensure_directory(&folder)?;

        let from = listing.root().join(&entry.name);
        let to = folder.join(&plan.target_name);
        let sha256 = sha256_file(&from)?;
        move_file(&from, &to)?;

        info!(from = %from.display(), to = %to.display(), "moved file");
        report.moved.push(MovedFile {
            kind: plan.kind,
            from: from.display().to_string(),
            to: to.display().to_string(),
            sha256,
        });
    }

    Ok(report)
}
