//! Chunking statistics.

use serde::{Deserialize, Serialize};

use super::record::ChunkRecord;

/// Statistics collected over a set of chunk records.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkStats {
    /// Number of records
    pub record_count: usize,

    /// Number of records carrying an image
    pub image_count: usize,

    /// Number of child records
    pub child_count: usize,

    /// Number of distinct source pages
    pub page_count: usize,

    /// Summed token count of parent chunks
    pub token_count: usize,
}

impl ChunkStats {
    /// Collect statistics from records.
    pub fn from_records(records: &[ChunkRecord]) -> Self {
        let mut pages: Vec<usize> = records
            .iter()
            .flat_map(|r| r.page_num_int.iter().copied())
            .collect();
        pages.sort_unstable();
        pages.dedup();

        let mut stats = Self {
            record_count: records.len(),
            page_count: pages.len(),
            ..Default::default()
        };

        let mut last_parent: Option<&str> = None;
        for record in records {
            if record.has_image() {
                stats.image_count += 1;
            }
            match record.parent.as_deref() {
                Some(parent) => {
                    stats.child_count += 1;
                    if last_parent != Some(parent) {
                        stats.token_count += record.token_count;
                    }
                    last_parent = Some(parent);
                }
                None => {
                    stats.token_count += record.token_count;
                    last_parent = None;
                }
            }
        }
        stats
    }
}
