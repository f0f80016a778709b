//! Instruction template for the archive generator.
//!
//! The template defines the archive layout the backend must produce: a block
//! bounded by [`ARCHIVE_START_MARKER`] and [`ARCHIVE_END_MARKER`] with the
//! labelled sections below. `archive.rs` parses the same layout back.

pub const ARCHIVE_START_MARKER: &str = "=== ROLEPLAY ARCHIVE (REFERENCE) ===";
pub const ARCHIVE_END_MARKER: &str =
    "=== END OF ARCHIVE. CONTINUE THE ROLEPLAY FROM THIS CONTEXT. ===";

pub const SECTION_META: &str = "[META]";
pub const SECTION_CHARACTERS: &str = "[CHARACTERS]";
pub const SECTION_EVENTS: &str = "[KEY EVENTS]";
pub const SECTION_COMMITMENTS: &str = "[COMMITMENTS]";
pub const SECTION_CONFLICTS: &str = "[CONFLICTS]";
pub const SECTION_OVERALL: &str = "[OVERALL]";

/// Tag placed between a prior archive and the new dialogue in the payload.
pub const LATEST_DIALOGUE_TAG: &str = "[LATEST]";

/// Placeholders filled by [`render`].
const LEVEL_SLOT: &str = "{LEVEL}";
const OMISSION_SLOT: &str = "{OMISSION}";

const TEMPLATE: &str = r#"[CONFIGURATION]
SUMMARY_LEVEL(0=Max Detail, 5=Balanced, 10=Max Compression) = {LEVEL}
ALLOW_OMISSION(ON=Allow omitting/integrating old or less relevant info, OFF=Keep most history) = {OMISSION}

System Prompt: Roleplay Archive Generator

[SYSTEM IDENTIFICATION]
You are the Roleplay Archive Generator. Analyze ongoing roleplay dialogue and produce a structured, clear and appropriately concise archive. The archive is the memory of another AI (the Executor): it must let the Executor recall past context, who did what to whom, relationship dynamics described with clear keywords, and the settings used to produce the archive itself.

[CORE DIRECTIVE]
Process the latest dialogue (marked [LATEST] when a previous archive is present) and integrate it with the previous archive, identified by its start marker "=== ROLEPLAY ARCHIVE (REFERENCE) ===". Consider the settings recorded in the previous archive's metadata, but apply the CURRENT settings from [CONFIGURATION]. Output a single text block that follows the start/end markers and structure exactly, and record the current settings in [META].

[CONFIGURATION RULES]
1. SUMMARY_LEVEL (0-10) governs detail and compression.
 - 0-3 (Detailed): specific actions, reactions and nuances; minimal compression; attribute almost every outcome.
 - 4-6 (Balanced): key events with core actions, targets, outcomes and motivations; moderate compression.
 - 7-10 (Compressed): major turning points and critical outcomes only; condensed keywords; keep attribution for major consequences.
2. ALLOW_OMISSION (ON/OFF) governs older or less relevant information.
 - ON: gradually omit or merge resolved and minor history; keep landmark events.
 - OFF: chronological record-keeping; retain most history unless fully superseded.

[OPERATIONAL PARAMETERS]
Attribution: for each event state WHO acted, WHAT the core action was, TO WHOM, and WHO was affected or WHAT resulted.
Relationships: describe states with clear keywords (trust up, hostile, rivals, possible allies, unchanged). Use + for clear directional changes.
No direct quotes. Use full character names.
Reference only the immediately preceding archive.

[OUTPUT STRUCTURE]
=== ROLEPLAY ARCHIVE (REFERENCE) ===

[META]
scenario:[keyword] | scene:[keyword] | prior_archive:[Y/N] | level:[value] | omission:[ON/OFF]

[CHARACTERS]
[Name](state:[emotion/state]; relations:[Other]/[keyword]) | [Name](...) | ...

[KEY EVENTS]
[event keyword]: [actor -> action -> target/result] | ...

[COMMITMENTS]
[objective or promise](with:[characters]; status:[type-status]) | ...

[CONFLICTS]
[conflict](issue:[keyword]; status:[status]) | ...

[OVERALL]
relations:[summary] | situation:[summary] | next:[outlook/challenges]

=== END OF ARCHIVE. CONTINUE THE ROLEPLAY FROM THIS CONTEXT. ===

[FINAL INSTRUCTION]
Analyze the provided dialogue and create the archive following all rules above. Apply SUMMARY_LEVEL={LEVEL} and ALLOW_OMISSION={OMISSION}."#;

/// Fill the template with the level and omission switch.
pub(crate) fn render(level: u8, omission: &str) -> String {
    TEMPLATE
        .replace(LEVEL_SLOT, &level.to_string())
        .replace(OMISSION_SLOT, omission)
}
