//! Index-ready chunk records.

use serde::{Deserialize, Serialize};

use crate::chunk::Delimiter;
use crate::model::Chunk;
use crate::position;
use crate::raster::SharedImage;

/// One chunk wrapped for indexing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChunkRecord {
    /// Text without position tags
    pub content: String,

    /// Original chunk text, tags included
    pub content_with_tags: String,

    /// Chunk image
    #[serde(skip)]
    pub image: Option<SharedImage>,

    /// Identifier of the stored image, assigned by whoever stores it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub img_id: Option<String>,

    /// 1-based page of every source box
    pub page_num_int: Vec<usize>,

    /// `(page, left, right, top, bottom)` of every source box, page 1-based
    pub position_int: Vec<(usize, u32, u32, u32, u32)>,

    /// Top of every source box
    pub top_int: Vec<u32>,

    /// Token count of the chunk
    pub token_count: usize,

    /// Full parent text when this record is a child split of a chunk
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
}

impl ChunkRecord {
    /// Build a record from a chunk.
    pub fn from_chunk(chunk: &Chunk) -> Self {
        let mut record = Self {
            content: position::strip_tags(&chunk.text),
            content_with_tags: chunk.text.clone(),
            image: chunk.image.clone(),
            token_count: chunk.token_count,
            ..Default::default()
        };
        for pos in &chunk.positions {
            record.page_num_int.push(pos.page + 1);
            record.top_int.push(pos.top);
            record
                .position_int
                .push((pos.page + 1, pos.x0, pos.x1, pos.top, pos.bottom));
        }
        record
    }

    /// Check if the record carries an image.
    pub fn has_image(&self) -> bool {
        self.image.is_some()
    }
}

/// Build records for chunks, skipping blank ones.
///
/// With a child delimiter every chunk is split on its markers into several
/// records that keep the whole chunk text in `parent`. A marker stays
/// attached to the piece it ends.
pub fn build_records(chunks: &[Chunk], child_delimiter: Option<&Delimiter>) -> Vec<ChunkRecord> {
    let splitter = child_delimiter.and_then(Delimiter::split_regex);
    let mut records = Vec::with_capacity(chunks.len());

    for chunk in chunks.iter().filter(|c| !c.is_blank()) {
        let record = ChunkRecord::from_chunk(chunk);
        let Some(re) = &splitter else {
            records.push(record);
            continue;
        };

        let parent = record.content.clone();
        let mut start = 0;
        let mut pieces = Vec::new();
        for m in re.find_iter(&parent) {
            pieces.push(&parent[start..m.end()]);
            start = m.end();
        }
        pieces.push(&parent[start..]);

        for piece in pieces.into_iter().filter(|p| !p.trim().is_empty()) {
            records.push(ChunkRecord {
                content: piece.to_string(),
                parent: Some(parent.clone()),
                ..record.clone()
            });
        }
    }

    log::debug!(
        "built {} records from {} chunks",
        records.len(),
        chunks.len()
    );
    records
}
