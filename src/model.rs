use std::fmt;

use serde::Serialize;

pub const JUDGMENT_CODE: &str = "XJMTR";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JudgmentTag {
    pub file_no: String,
}

impl JudgmentTag {
    pub fn code(&self) -> &'static str {
        JUDGMENT_CODE
    }
}

/// A case record from the defendant roster, with each slot already trimmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseDefendants {
    pub file_no: String,
    pub defendants: [Option<String>; 3],
}

impl CaseDefendants {
    /// 1-based position of `person` among the defendant slots, lowest first.
    pub fn slot_of(&self, person: &str) -> Option<u8> {
        self.defendants
            .iter()
            .position(|slot| slot.as_deref() == Some(person))
            .map(|index| index as u8 + 1)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceType {
    NonService,
    Substituted,
    Personal,
    Other(String),
}

impl ServiceType {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "N" => Self::NonService,
            "S" => Self::Substituted,
            "P" => Self::Personal,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::NonService => "N",
            Self::Substituted => "S",
            Self::Personal => "P",
            Self::Other(raw) => raw.as_str(),
        }
    }

    fn code_prefix(&self) -> Option<&'static str> {
        match self {
            Self::NonService => Some("XSNG"),
            Self::Substituted => Some("XSUBS"),
            Self::Personal => Some("XPS"),
            Self::Other(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LlCode {
    prefix: &'static str,
    slot: u8,
}

impl LlCode {
    pub fn for_event(service_type: &ServiceType, slot: Option<u8>) -> Option<Self> {
        let prefix = service_type.code_prefix()?;
        Some(Self {
            prefix,
            slot: slot?,
        })
    }
}

impl fmt::Display for LlCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.prefix, self.slot)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceEvent {
    pub file_no: String,
    pub person_served: String,
    pub service_type: ServiceType,
    pub date_of_service: String,
    pub address: String,
    pub note: String,
}

/// Row of the service events export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventRow {
    pub file_no: String,
    pub ll_code: String,
    pub person_served: String,
    pub date_of_service: String,
    pub address: String,
    pub service_type: String,
}

impl EventRow {
    pub const HEADER: [&'static str; 6] = [
        "FILENO",
        "LLCODE",
        "PERSON_SERVED",
        "DATE_OF_SERVICE",
        "ADDRESS",
        "SERVICE_TYPE",
    ];

    pub fn fields(&self) -> [&str; 6] {
        [
            self.file_no.as_str(),
            self.ll_code.as_str(),
            self.person_served.as_str(),
            self.date_of_service.as_str(),
            self.address.as_str(),
            self.service_type.as_str(),
        ]
    }
}

/// Row of the non-service notes export. Everything but the case id and the
/// note text is a fixed literal of the downstream import format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteRow {
    pub file_no: String,
    pub note: String,
}

impl NoteRow {
    pub fn new(file_no: &str, raw_note: &str) -> Self {
        Self {
            file_no: file_no.to_string(),
            note: raw_note.replace(['\r', '\n'], " "),
        }
    }

    pub fn fields(&self) -> [&str; 7] {
        [
            "109",
            "D",
            self.file_no.as_str(),
            "XNSRV",
            "MWC",
            self.note.as_str(),
            "#",
        ]
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classification {
    pub events: Vec<EventRow>,
    pub notes: Vec<NoteRow>,
}

impl Classification {
    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn extend(&mut self, other: Classification) {
        self.events.extend(other.events);
        self.notes.extend(other.notes);
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RoutedKind {
    Spreadsheet,
    Document,
}

#[derive(Debug, Clone, Serialize)]
pub struct MovedFile {
    pub kind: RoutedKind,
    pub from: String,
    pub to: String,
    pub sha256: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LayoutPaths {
    pub root: String,
    pub data: String,
    pub documents: String,
    pub tag_file: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClassificationSummary {
    pub spreadsheets: usize,
    pub accepted_events: usize,
    pub events_path: String,
    pub notes_path: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct IntakeRunManifest {
    pub manifest_version: u32,
    pub run_id: String,
    pub started_at: String,
    pub completed_at: String,
    pub source_directory: String,
    pub layout: LayoutPaths,
    pub judgment_tags: usize,
    pub moved: Vec<MovedFile>,
    pub skipped: Vec<String>,
    pub classification: Option<ClassificationSummary>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn case(d1: &str, d2: Option<&str>, d3: Option<&str>) -> CaseDefendants {
        CaseDefendants {
            file_no: "42".to_string(),
            defendants: [
                Some(d1.to_string()),
                d2.map(ToOwned::to_owned),
                d3.map(ToOwned::to_owned),
            ],
        }
    }

    #[test]
    fn slot_of_prefers_lowest_matching_slot() {
        let defendants = case("A", Some("B"), Some("B"));
        assert_eq!(defendants.slot_of("A"), Some(1));
        assert_eq!(defendants.slot_of("B"), Some(2));
        assert_eq!(defendants.slot_of("C"), None);
    }

    #[test]
    fn ll_code_combines_prefix_and_slot() {
        let code = LlCode::for_event(&ServiceType::parse("S"), Some(2)).expect("code");
        assert_eq!(code.to_string(), "XSUBS2");
        let code = LlCode::for_event(&ServiceType::parse("N"), Some(1)).expect("code");
        assert_eq!(code.to_string(), "XSNG1");
        let code = LlCode::for_event(&ServiceType::parse("P"), Some(3)).expect("code");
        assert_eq!(code.to_string(), "XPS3");
    }

    #[test]
    fn ll_code_requires_known_type_and_slot() {
        assert!(LlCode::for_event(&ServiceType::parse("X"), Some(1)).is_none());
        assert!(LlCode::for_event(&ServiceType::parse("n"), Some(1)).is_none());
        assert!(LlCode::for_event(&ServiceType::parse("P"), None).is_none());
    }

    #[test]
    fn note_row_replaces_line_breaks_with_spaces() {
        let row = NoteRow::new("7", "left at door\r\nno answer\nretry");
        assert_eq!(row.note, "left at door  no answer retry");
        assert_eq!(
            row.fields(),
            ["109", "D", "7", "XNSRV", "MWC", "left at door  no answer retry", "#"]
        );
    }
}
