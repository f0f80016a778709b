//! Reader for archive text produced by the backend.
//!
//! The engine treats archive text as opaque when storing and seeding it.
//! This module only inspects it: it locates the marker-bounded block, splits
//! the labelled sections and their `|`-delimited entries, and pulls the
//! metadata fields out of `[META]`.

use super::level::CompressionLevel;
use super::prompt::{
    ARCHIVE_END_MARKER, ARCHIVE_START_MARKER, SECTION_CHARACTERS, SECTION_COMMITMENTS,
    SECTION_CONFLICTS, SECTION_EVENTS, SECTION_META, SECTION_OVERALL,
};

const KNOWN_SECTIONS: [&str; 6] = [
    SECTION_META,
    SECTION_CHARACTERS,
    SECTION_EVENTS,
    SECTION_COMMITMENTS,
    SECTION_CONFLICTS,
    SECTION_OVERALL,
];

/// One labelled section and its entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveSection {
    pub header: String,
    pub entries: Vec<String>,
}

/// Fields recorded in `[META]`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArchiveMetadata {
    pub scenario: Option<String>,
    pub scene: Option<String>,
    pub prior_archive_incorporated: Option<bool>,
    pub level: Option<CompressionLevel>,
    pub omission: Option<String>,
}

/// A parsed archive block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveDocument {
    pub metadata: ArchiveMetadata,
    pub sections: Vec<ArchiveSection>,
}

impl ArchiveDocument {
    /// Parse the first marker-bounded block in `text`.
    ///
    /// Returns `None` when either marker is missing.
    pub fn parse(text: &str) -> Option<Self> {
        let start = text.find(ARCHIVE_START_MARKER)? + ARCHIVE_START_MARKER.len();
        let end = start + text[start..].find(ARCHIVE_END_MARKER)?;
        let body = &text[start..end];

        let mut sections: Vec<ArchiveSection> = Vec::new();
        for line in body.lines().map(str::trim).filter(|l| !l.is_empty()) {
            if KNOWN_SECTIONS.contains(&line) {
                sections.push(ArchiveSection {
                    header: line.to_string(),
                    entries: Vec::new(),
                });
                continue;
            }
            // Text before the first header has nowhere to go.
            if let Some(section) = sections.last_mut() {
                section.entries.extend(
                    line.split('|')
                        .map(str::trim)
                        .filter(|e| !e.is_empty())
                        .map(String::from),
                );
            }
        }

        let metadata = sections
            .iter()
            .find(|s| s.header == SECTION_META)
            .map(|s| parse_metadata(&s.entries))
            .unwrap_or_default();

        Some(Self { metadata, sections })
    }

    /// Entries of a section, by header (e.g. `"[KEY EVENTS]"`).
    pub fn section(&self, header: &str) -> Option<&[String]> {
        self.sections
            .iter()
            .find(|s| s.header == header)
            .map(|s| s.entries.as_slice())
    }

    /// Whether every expected section is present.
    pub fn is_complete(&self) -> bool {
        KNOWN_SECTIONS.iter().all(|h| self.section(h).is_some())
    }
}

fn parse_metadata(entries: &[String]) -> ArchiveMetadata {
    let mut meta = ArchiveMetadata::default();
    for entry in entries {
        let Some((key, value)) = entry.split_once(':') else {
            continue;
        };
        let value = value.trim();
        match key.trim().to_ascii_lowercase().as_str() {
            "scenario" => meta.scenario = Some(value.to_string()),
            "scene" => meta.scene = Some(value.to_string()),
            "prior_archive" => {
                meta.prior_archive_incorporated = match value.to_ascii_uppercase().as_str() {
                    "Y" | "YES" => Some(true),
                    "N" | "NO" => Some(false),
                    _ => None,
                }
            }
            "level" => {
                meta.level = value
                    .parse::<f64>()
                    .ok()
                    .map(CompressionLevel::clamped)
            }
            "omission" => meta.omission = Some(value.to_ascii_uppercase()),
            _ => {}
        }
    }
    meta
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> String {
        format!(
            "Here is the archive.\n\n{ARCHIVE_START_MARKER}\n\n\
             [META]\nscenario:heist | scene:vault door | prior_archive:Y | level:7 | omission:off\n\n\
             [CHARACTERS]\nMira(state:tense; relations:Dax/trust up) | Dax(state:calm; relations:Mira/allies)\n\n\
             [KEY EVENTS]\nbreak-in: Mira -> cut the alarm -> guards unaware | betrayal: Dax -> kept the key -> Mira stranded\n\n\
             [COMMITMENTS]\nsplit the take(with:Mira, Dax; status:promise-open)\n\n\
             [CONFLICTS]\n\n\
             [OVERALL]\nrelations:strained | situation:inside the vault | next:escape\n\n\
             {ARCHIVE_END_MARKER}\ntrailing chatter"
        )
    }

    #[test]
    fn test_parse_sections_and_entries() {
        let doc = ArchiveDocument::parse(&sample()).unwrap();
        assert!(doc.is_complete());
        assert_eq!(doc.section(SECTION_CHARACTERS).unwrap().len(), 2);
        let events = doc.section(SECTION_EVENTS).unwrap();
        assert_eq!(events[1], "betrayal: Dax -> kept the key -> Mira stranded");
        assert!(doc.section(SECTION_CONFLICTS).unwrap().is_empty());
        assert_eq!(doc.section(SECTION_OVERALL).unwrap().len(), 3);
    }

    #[test]
    fn test_parse_metadata_fields() {
        let doc = ArchiveDocument::parse(&sample()).unwrap();
        let meta = &doc.metadata;
        assert_eq!(meta.scenario.as_deref(), Some("heist"));
        assert_eq!(meta.scene.as_deref(), Some("vault door"));
        assert_eq!(meta.prior_archive_incorporated, Some(true));
        assert_eq!(meta.level, Some(CompressionLevel::from(7)));
        assert_eq!(meta.omission.as_deref(), Some("OFF"));
    }

    #[test]
    fn test_missing_end_marker_is_none() {
        let text = format!("{ARCHIVE_START_MARKER}\n[META]\nlevel:5");
        assert!(ArchiveDocument::parse(&text).is_none());
        assert!(ArchiveDocument::parse("ARCHIVE_X").is_none());
    }

    #[test]
    fn test_partial_archive_is_incomplete() {
        let text = format!("{ARCHIVE_START_MARKER}\n[META]\nlevel:5\n{ARCHIVE_END_MARKER}");
        let doc = ArchiveDocument::parse(&text).unwrap();
        assert!(!doc.is_complete());
        assert_eq!(doc.metadata.level, Some(CompressionLevel::from(5)));
    }
}
