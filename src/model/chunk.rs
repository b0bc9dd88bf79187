//! Pre-chunk records and merged chunks.

use super::unit::DocType;
use crate::position::{DecodedRegion, NORMALIZED_EXTENT};
use crate::raster::SharedImage;
use serde::{Deserialize, Serialize};

/// A source box of a chunk, in page pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkPosition {
    /// 0-based page index within the document
    pub page: usize,
    /// Left edge
    pub x0: u32,
    /// Right edge
    pub x1: u32,
    /// Top edge
    pub top: u32,
    /// Bottom edge
    pub bottom: u32,
}

impl ChunkPosition {
    /// Create a position from `[x0, x1, top, bottom]`.
    pub fn from_bounds(page: usize, bounds: [u32; 4]) -> Self {
        let [x0, x1, top, bottom] = bounds;
        Self {
            page,
            x0,
            x1,
            top,
            bottom,
        }
    }

    /// Expand a decoded tag into one position per page it covers.
    ///
    /// A single-page tag keeps its box. A tag spanning pages runs from its
    /// top to the end of the first page, covers the middle pages whole and
    /// ends at its bottom on the last page. `page_height` gives the height of
    /// a document page in the tag's coordinate space; pages it does not know
    /// fall back to the 0-1000 normalized extent. Coordinates are truncated
    /// to whole pixels.
    pub fn spans(
        region: &DecodedRegion,
        page_height: impl Fn(usize) -> Option<u32>,
    ) -> Vec<Self> {
        let x0 = region.x0.max(0.0) as u32;
        let x1 = region.x1.max(0.0) as u32;
        let top = region.top.max(0.0) as u32;
        let bottom = region.bottom.max(0.0) as u32;

        let last = region.pages.len().saturating_sub(1);
        region
            .pages
            .iter()
            .enumerate()
            .map(|(i, &page)| {
                let height = || page_height(page).unwrap_or(NORMALIZED_EXTENT as u32);
                let (from, to) = match (i == 0, i == last) {
                    (true, true) => (top, bottom),
                    (true, false) => (top, height().max(top)),
                    (false, true) => (0, bottom),
                    (false, false) => (0, height()),
                };
                Self::from_bounds(page, [x0, x1, from, to])
            })
            .collect()
    }
}

/// Positions of every tag in a text, expanded per page.
pub fn positions_in(
    text: &str,
    page_height: impl Fn(usize) -> Option<u32>,
) -> Vec<ChunkPosition> {
    crate::position::decode(text)
        .iter()
        .flat_map(|region| ChunkPosition::spans(region, &page_height))
        .collect()
}

/// A unit ready for merging: text, optional image and its source boxes.
#[derive(Debug, Clone, Default)]
pub struct Bbox {
    /// Unit text
    pub text: String,
    /// Cropped or analyzer-provided image
    pub image: Option<SharedImage>,
    /// Source boxes in reading order
    pub positions: Vec<ChunkPosition>,
    /// Figure or table marker
    pub doc_type: Option<DocType>,
}

impl Bbox {
    /// Create a plain text record.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    /// Set the image.
    pub fn with_image(mut self, image: SharedImage) -> Self {
        self.image = Some(image);
        self
    }

    /// Set the doc type.
    pub fn with_doc_type(mut self, doc_type: DocType) -> Self {
        self.doc_type = Some(doc_type);
        self
    }

    /// Set the source boxes.
    pub fn with_positions(mut self, positions: Vec<ChunkPosition>) -> Self {
        self.positions = positions;
        self
    }

    /// Check if this record stands for a figure.
    ///
    /// Records with an image and no text count as figures too.
    pub fn is_image(&self) -> bool {
        self.doc_type == Some(DocType::Image)
            || (self.image.is_some() && self.text.trim().is_empty())
    }

    /// Check if this record stands for a table.
    pub fn is_table(&self) -> bool {
        self.doc_type == Some(DocType::Table)
    }

    /// Check if this record is plain text.
    pub fn is_text(&self) -> bool {
        !self.is_image() && !self.is_table()
    }

    /// Get the reading-order key `(page, top, x0)` of the first box.
    pub fn reading_key(&self) -> Option<(usize, u32, u32)> {
        self.positions.first().map(|p| (p.page, p.top, p.x0))
    }
}

/// A merged, token-budgeted chunk.
#[derive(Debug, Clone, Default)]
pub struct Chunk {
    /// Chunk text with embedded position tags
    pub text: String,
    /// Composed image of every image-bearing unit in the chunk
    pub image: Option<SharedImage>,
    /// Source boxes decoded from the embedded tags
    pub positions: Vec<ChunkPosition>,
    /// Summed token count of the merged units, overlap excluded
    pub token_count: usize,
}

impl Chunk {
    /// Check if the chunk carries no visible text.
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }

    /// Get the chunk text without position tags.
    pub fn plain_text(&self) -> String {
        crate::position::strip_tags(&self.text)
    }
}
