//! Plain text rendering for chunk records.

use super::record::ChunkRecord;

/// Separator line between records.
const RECORD_SEPARATOR: &str = "\n\n---\n\n";

/// Convert records to plain text, one block per record.
pub fn to_text(records: &[ChunkRecord]) -> String {
    records
        .iter()
        .map(|r| r.content.trim())
        .collect::<Vec<_>>()
        .join(RECORD_SEPARATOR)
}
