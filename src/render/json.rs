//! JSON rendering for chunk records.

use crate::error::{Error, Result};

use super::record::ChunkRecord;

/// JSON output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JsonFormat {
    /// Pretty-printed JSON with indentation
    #[default]
    Pretty,
    /// Compact JSON without extra whitespace
    Compact,
}

/// Convert records to a JSON array.
pub fn to_json(records: &[ChunkRecord], format: JsonFormat) -> Result<String> {
    let result = match format {
        JsonFormat::Pretty => serde_json::to_string_pretty(records),
        JsonFormat::Compact => serde_json::to_string(records),
    };

    result.map_err(|e| Error::Render(format!("JSON serialization error: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn records() -> Vec<ChunkRecord> {
        vec![ChunkRecord {
            content: "Hello".to_string(),
            content_with_tags: "Hello".to_string(),
            page_num_int: vec![1],
            position_int: vec![(1, 0, 10, 20, 30)],
            top_int: vec![20],
            ..Default::default()
        }]
    }

    #[test]
    fn test_to_json_pretty() {
        let json = to_json(&records(), JsonFormat::Pretty).unwrap();
        assert!(json.contains("\"content\""));
        assert!(json.contains("Hello"));
        assert!(json.contains('\n')); // Pretty has newlines
    }

    #[test]
    fn test_to_json_compact() {
        let json = to_json(&records(), JsonFormat::Compact).unwrap();
        assert!(!json.contains('\n')); // Compact has no newlines
        assert!(json.contains("\"position_int\":[[1,0,10,20,30]]"));
    }
}
