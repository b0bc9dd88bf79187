//! Data model for the chunking pipeline.
//!
//! Analyzer blocks come in, content units are derived from them, units
//! become [`Bbox`] records once their images are known, and the merger turns
//! records into [`Chunk`]s.

mod block;
mod chunk;
mod unit;

pub use block::{AnalyzerBlock, BlockContent, BlockKind};
pub use chunk::{positions_in, Bbox, Chunk, ChunkPosition};
pub use unit::{ContentUnit, DocType, Region, FAILED_TABLE_TEXT};
