use std::path::Path;

use anyhow::Result;
use tracing::info;

use crate::cli::TagArgs;
use crate::commands::folders::TAG_FILE_NAME;
use crate::listing::{DirectoryListing, FsDirectory};
use crate::model::JudgmentTag;
use crate::util::write_tab_delimited;

const TAG_FILE_HEADER: [&str; 2] = ["FILENO", "LLCODE"];
const JUDGMENT_MARKER: &str = "judgment";

pub fn run(args: TagArgs) -> Result<()> {
    let output = args
        .output
        .unwrap_or_else(|| args.source.join(TAG_FILE_NAME));

    let tags = write_judgment_tags(&FsDirectory::new(&args.source), &output)?;
    info!(path = %output.display(), tags = tags.len(), "judgment tagging completed");

    Ok(())
}

/// Case id for a judgment PDF name, if the name qualifies.
///
/// The name must end in `.pdf` and mention `judgment` (both case-insensitive),
/// and everything before the first underscore must be ASCII digits.
pub fn judgment_tag_for(file_name: &str) -> Option<JudgmentTag> {
    let lowered = file_name.to_lowercase();
    if !lowered.ends_with(".pdf") || !lowered.contains(JUDGMENT_MARKER) {
        return None;
    }

    let prefix = file_name.split('_').next().unwrap_or_default();
    if prefix.is_empty() || !prefix.chars().all(|ch| ch.is_ascii_digit()) {
        return None;
    }

    Some(JudgmentTag {
        file_no: prefix.to_string(),
    })
}

pub fn collect_judgment_tags(listing: &dyn DirectoryListing) -> Result<Vec<JudgmentTag>> {
    let tags = listing
        .entries()?
        .iter()
        .filter_map(|entry| judgment_tag_for(&entry.name))
        .collect();
    Ok(tags)
}

/// Writes the tag file (header always present) and returns the tags written.
pub fn write_judgment_tags(
    listing: &dyn DirectoryListing,
    output: &Path,
) -> Result<Vec<JudgmentTag>> {
    let tags = collect_judgment_tags(listing)?;

    for tag in &tags {
        info!(file_no = %tag.file_no, code = tag.code(), "added judgment tag");
    }

    write_tab_delimited(
        output,
        Some(&TAG_FILE_HEADER[..]),
        tags.iter().map(|tag| [tag.file_no.as_str(), tag.code()]),
    )?;

    Ok(tags)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::listing::FakeDirectory;

    #[test]
    fn judgment_tag_requires_pdf_marker_and_numeric_prefix() {
        let tag = judgment_tag_for("123_Judgment_2024.PDF").expect("tag");
        assert_eq!(tag.file_no, "123");

        assert!(judgment_tag_for("123_judgment.docx").is_none());
        assert!(judgment_tag_for("123_summons.pdf").is_none());
        assert!(judgment_tag_for("A12_judgment.pdf").is_none());
        assert!(judgment_tag_for("_judgment.pdf").is_none());
        assert!(judgment_tag_for("500judgment.pdf").is_none());
    }

    #[test]
    fn judgment_marker_may_appear_anywhere_in_the_name() {
        let tag = judgment_tag_for("77_default-JUDGMENTS.pdf").expect("tag");
        assert_eq!(tag.file_no, "77");
    }

    #[test]
    fn collect_keeps_enumeration_order() {
        let listing = FakeDirectory::files(&[
            "9_judgment.pdf",
            "notes.txt",
            "3_judgment_final.pdf",
            "abc_judgment.pdf",
        ]);
        let tags = collect_judgment_tags(&listing).expect("tags");
        let ids: Vec<_> = tags.iter().map(|tag| tag.file_no.as_str()).collect();
        assert_eq!(ids, vec!["9", "3"]);
    }

    #[test]
    fn tag_file_has_header_even_without_pdfs() {
        let dir = tempfile::tempdir().expect("tmp");
        let output = dir.path().join("xjmtr.txt");

        let tags = write_judgment_tags(&FakeDirectory::files(&[]), &output).expect("write");

        assert!(tags.is_empty());
        assert_eq!(fs::read_to_string(&output).expect("read"), "FILENO\tLLCODE\n");
    }

    #[test]
    fn tag_file_lists_each_accepted_pdf_once() {
        let dir = tempfile::tempdir().expect("tmp");
        let output = dir.path().join("xjmtr.txt");
        let listing = FakeDirectory::files(&["500_judgment.pdf", "500_cover.xlsx"]);

        write_judgment_tags(&listing, &output).expect("write");

        assert_eq!(
            fs::read_to_string(&output).expect("read"),
            "FILENO\tLLCODE\n500\tXJMTR\n"
        );
    }

    #[test]
    fn tag_file_overwrites_previous_contents() {
        let dir = tempfile::tempdir().expect("tmp");
        let output = dir.path().join("xjmtr.txt");
        fs::write(&output, "stale\n").expect("seed");

        write_judgment_tags(&FakeDirectory::files(&["1_judgment.pdf"]), &output).expect("write");

        assert_eq!(
            fs::read_to_string(&output).expect("read"),
            "FILENO\tLLCODE\n1\tXJMTR\n"
        );
    }
}
