use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::{Result, bail};
use tracing::{debug, info, warn};

use crate::cli::ClassifyArgs;
use crate::config::resolve_database_config;
use crate::model::{Classification, EventRow, LlCode, NoteRow, ServiceEvent, ServiceType};
use crate::util::{ensure_directory, write_tab_delimited};

mod lookup;
mod sheet;

#[cfg(test)]
pub use lookup::LookupError;
pub use lookup::{DefendantLookup, SqlDefendantLookup};
pub use sheet::{Sheet, load_sheet};

pub const SUMMONS_AND_COMPLAINT: &str = "Summons and Complaint";
pub const EVENTS_FILE_NAME: &str = "service_events.txt";
pub const NOTES_FILE_NAME: &str = "service_notes.txt";

const DOCUMENT_CATEGORY: &str = "Document Category";

pub fn run(args: ClassifyArgs) -> Result<()> {
    let Some(config) = resolve_database_config(&args.database)? else {
        bail!("classify needs a case database: pass --config or --db-server and --db-name");
    };

    let lookup = SqlDefendantLookup::new(config);
    let classification = Classifier::new(&lookup).classify_file(&args.spreadsheet)?;

    ensure_directory(&args.output_dir)?;
    let exports = write_exports(&args.output_dir, &classification)?;

    info!(
        spreadsheet = %args.spreadsheet.display(),
        accepted = classification.len(),
        events = %exports.events.display(),
        notes = %exports.notes.display(),
        "classification completed"
    );

    Ok(())
}

/// Column positions of a service-records sheet.
#[derive(Debug, Clone, Copy)]
pub struct ServiceColumns {
    file_no: usize,
    person_served: usize,
    service_type: usize,
    date_of_service: usize,
    address: usize,
    category: usize,
    note: Option<usize>,
}

impl ServiceColumns {
    /// Locates every required column, or names the first one missing.
    pub fn locate(sheet: &Sheet) -> Result<Self, &'static str> {
        let require = |name: &'static str| sheet.column(name).ok_or(name);

        Ok(Self {
            category: require(DOCUMENT_CATEGORY)?,
            file_no: require("FileNo")?,
            person_served: require("Person Served")?,
            service_type: require("Service Type")?,
            date_of_service: require("Date of Service")?,
            address: require("Service Street Address")?,
            note: sheet.column("Note"),
        })
    }

    /// Raw category cell; compared exactly, without trimming.
    fn category<'a>(&self, row: &'a [String]) -> &'a str {
        cell(row, self.category)
    }

    fn event(&self, row: &[String]) -> ServiceEvent {
        ServiceEvent {
            file_no: cell(row, self.file_no).trim().to_string(),
            person_served: cell(row, self.person_served).trim().to_string(),
            service_type: ServiceType::parse(cell(row, self.service_type)),
            date_of_service: cell(row, self.date_of_service).to_string(),
            address: cell(row, self.address).to_string(),
            note: self
                .note
                .map(|index| cell(row, index))
                .unwrap_or_default()
                .to_string(),
        }
    }
}

fn cell(row: &[String], index: usize) -> &str {
    row.get(index).map(String::as_str).unwrap_or_default()
}

/// Classifies service events across one or more spreadsheets.
///
/// The dedup state lives as long as the classifier, so a (case id, person
/// served) pair is accepted at most once over every sheet it is fed.
pub struct Classifier<'a> {
    lookup: &'a dyn DefendantLookup,
    accepted: HashSet<(String, String)>,
    // Lookups depend only on the person served, so an unmatched pair stays
    // unmatched for the classifier's lifetime.
    unmatched: HashSet<(String, String)>,
}

impl<'a> Classifier<'a> {
    pub fn new(lookup: &'a dyn DefendantLookup) -> Self {
        Self {
            lookup,
            accepted: HashSet::new(),
            unmatched: HashSet::new(),
        }
    }

    /// Classifies one spreadsheet. A sheet without the expected columns
    /// yields an empty classification rather than an error.
    pub fn classify_file(&mut self, path: &Path) -> Result<Classification> {
        let sheet = load_sheet(path)?;

        let columns = match ServiceColumns::locate(&sheet) {
            Ok(columns) => columns,
            Err(missing) => {
                warn!(
                    file = %path.display(),
                    column = missing,
                    "required column missing; skipping spreadsheet"
                );
                return Ok(Classification::default());
            }
        };

        let classification = self.classify_sheet(&sheet, columns)?;
        info!(
            file = %path.display(),
            accepted = classification.len(),
            "classified service events"
        );
        Ok(classification)
    }

    pub fn classify_sheet(
        &mut self,
        sheet: &Sheet,
        columns: ServiceColumns,
    ) -> Result<Classification> {
        let mut classification = Classification::default();

        for row in sheet.rows() {
            if columns.category(row) != SUMMONS_AND_COMPLAINT {
                continue;
            }

            let event = columns.event(row);
            if event.person_served.is_empty() {
                debug!(file_no = %event.file_no, "row without person served skipped");
                continue;
            }

            let pair = (event.file_no.clone(), event.person_served.clone());
            if self.accepted.contains(&pair) || self.unmatched.contains(&pair) {
                continue;
            }

            let Some(case) = self.lookup.find_case(&event.person_served)? else {
                debug!(
                    file_no = %event.file_no,
                    person = %event.person_served,
                    "no defendant match"
                );
                self.unmatched.insert(pair);
                continue;
            };

            let slot = case.slot_of(&event.person_served);
            let Some(code) = LlCode::for_event(&event.service_type, slot) else {
                debug!(
                    file_no = %event.file_no,
                    service_type = event.service_type.as_str(),
                    "no code for service event"
                );
                continue;
            };

            classification.events.push(EventRow {
                file_no: event.file_no.clone(),
                ll_code: code.to_string(),
                person_served: event.person_served.clone(),
                date_of_service: event.date_of_service.clone(),
                address: event.address.clone(),
                service_type: event.service_type.as_str().to_string(),
            });
            classification
                .notes
                .push(NoteRow::new(&event.file_no, &event.note));
            self.accepted.insert(pair);
        }

        Ok(classification)
    }
}

#[derive(Debug, Clone)]
pub struct ExportPaths {
    pub events: PathBuf,
    pub notes: PathBuf,
}

/// Writes both row-sets into `dir`: the events file with a header line, the
/// notes file headerless in the import format.
pub fn write_exports(dir: &Path, classification: &Classification) -> Result<ExportPaths> {
    let exports = ExportPaths {
        events: dir.join(EVENTS_FILE_NAME),
        notes: dir.join(NOTES_FILE_NAME),
    };

    write_tab_delimited(
        &exports.events,
        Some(&EventRow::HEADER[..]),
        classification.events.iter().map(EventRow::fields),
    )?;
    write_tab_delimited(
        &exports.notes,
        None,
        classification.notes.iter().map(NoteRow::fields),
    )?;

    Ok(exports)
}
