use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use chrono::{Local, NaiveDate, Utc};
use tracing::{info, warn};

use crate::cli::RunArgs;
use crate::commands::classify::{Classifier, DefendantLookup, SqlDefendantLookup, write_exports};
use crate::commands::folders::{FolderLayout, create_folder_structure};
use crate::commands::route::{RouteReport, route_files};
use crate::config::resolve_database_config;
use crate::listing::FsDirectory;
use crate::model::{Classification, ClassificationSummary, IntakeRunManifest};
use crate::util::{now_utc_string, utc_compact_string, write_json_pretty};

/// Asks the operator which folder to process. `None` means they declined.
pub trait FolderPrompt {
    fn select_folder(&mut self) -> Result<Option<PathBuf>>;
}

pub struct StdinPrompt;

impl FolderPrompt for StdinPrompt {
    fn select_folder(&mut self) -> Result<Option<PathBuf>> {
        eprint!("Select folder with files: ");
        io::stderr().flush().context("failed to flush prompt")?;

        let mut line = String::new();
        io::stdin()
            .lock()
            .read_line(&mut line)
            .context("failed to read folder selection")?;

        let answer = line.trim();
        if answer.is_empty() {
            Ok(None)
        } else {
            Ok(Some(PathBuf::from(answer)))
        }
    }
}

#[derive(Debug)]
pub struct IntakeOutcome {
    pub layout: FolderLayout,
    pub report: RouteReport,
    pub classification: Option<Classification>,
    pub manifest_path: PathBuf,
}

pub fn run(args: RunArgs) -> Result<()> {
    let database = resolve_database_config(&args.database)?;

    let Some(source) = select_source(args.source, &mut StdinPrompt)? else {
        info!("no folder selected");
        return Ok(());
    };

    let lookup = database.map(SqlDefendantLookup::new);
    let lookup = lookup
        .as_ref()
        .map(|lookup| lookup as &dyn DefendantLookup);

    let outcome = run_intake(&source, Local::now().date_naive(), lookup)?;

    info!(
        root = %outcome.layout.root.display(),
        moved = outcome.report.moved.len(),
        tags = outcome.report.tags.len(),
        accepted_events = outcome
            .classification
            .as_ref()
            .map_or(0, Classification::len),
        manifest = %outcome.manifest_path.display(),
        "processing complete"
    );

    Ok(())
}

pub fn select_source(
    explicit: Option<PathBuf>,
    prompt: &mut dyn FolderPrompt,
) -> Result<Option<PathBuf>> {
    match explicit {
        Some(source) => Ok(Some(source)),
        None => prompt.select_folder(),
    }
}

/// Organizes `source` into the dated layout for `run_date`, classifies the
/// routed spreadsheets when a roster is available, and records the run.
pub fn run_intake(
    source: &Path,
    run_date: NaiveDate,
    lookup: Option<&dyn DefendantLookup>,
) -> Result<IntakeOutcome> {
    if !source.is_dir() {
        bail!("source folder does not exist: {}", source.display());
    }

    let started_ts = Utc::now();
    let started_at = now_utc_string();
    let run_id = format!("intake-{}", utc_compact_string(started_ts));
    info!(source = %source.display(), run_id = %run_id, "starting intake");

    let layout = create_folder_structure(source, run_date)?;
    let report = route_files(&FsDirectory::new(source), &layout, &layout.tag_file())?;

    let (classification, summary) = match lookup {
        Some(lookup) => {
            let (classification, summary) = classify_routed(&layout, &report, lookup)?;
            (Some(classification), Some(summary))
        }
        None => {
            warn!("no case database configured; skipping service-event classification");
            (None, None)
        }
    };

    let manifest = IntakeRunManifest {
        manifest_version: 1,
        run_id,
        started_at,
        completed_at: now_utc_string(),
        source_directory: source.display().to_string(),
        layout: layout.paths(),
        judgment_tags: report.tags.len(),
        moved: report.moved.clone(),
        skipped: report.skipped.clone(),
        classification: summary,
    };
    let manifest_path = layout.manifest_dir().join(format!(
        "intake_run_{}.json",
        utc_compact_string(started_ts)
    ));
    write_json_pretty(&manifest_path, &manifest)?;
    info!(path = %manifest_path.display(), "wrote run manifest");

    Ok(IntakeOutcome {
        layout,
        report,
        classification,
        manifest_path,
    })
}

fn classify_routed(
    layout: &FolderLayout,
    report: &RouteReport,
    lookup: &dyn DefendantLookup,
) -> Result<(Classification, ClassificationSummary)> {
    let mut classifier = Classifier::new(lookup);
    let mut classification = Classification::default();
    let mut spreadsheets = 0;

    for path in report.spreadsheets() {
        classification.extend(classifier.classify_file(&path)?);
        spreadsheets += 1;
    }

    let exports = write_exports(&layout.root, &classification)?;
    if classification.is_empty() {
        info!(spreadsheets, "no service events accepted");
    } else {
        info!(
            spreadsheets,
            accepted = classification.len(),
            events = %exports.events.display(),
            "wrote service event exports"
        );
    }

    let summary = ClassificationSummary {
        spreadsheets,
        accepted_events: classification.len(),
        events_path: exports.events.display().to_string(),
        notes_path: exports.notes.display().to_string(),
    };
    Ok((classification, summary))
}
