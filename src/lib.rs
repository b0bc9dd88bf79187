//! # layoutchunk
//!
//! Layout-aware chunking of analyzed PDF documents for retrieval.
//!
//! This library takes the typed content blocks a layout analyzer produces
//! for a PDF (text, tables, figures, equations, code, lists, each with a
//! bounding box) and turns them into token-budgeted chunks. Every chunk
//! carries position tags pointing back at its source regions and, when page
//! rasters are available, one composed image of its figures and tables.
//!
//! ## Quick Start
//!
//! ```no_run
//! use layoutchunk::{chunk_file, render, ChunkOptions, PageRasters};
//!
//! fn main() -> layoutchunk::Result<()> {
//!     let rasters = PageRasters::load_dir("pages/")?;
//!     let options = ChunkOptions::new().with_token_budget(256);
//!
//!     let records = chunk_file("out/doc/auto/doc_content_list.json", &rasters, &options)?;
//!     println!("{}", render::to_json(&records, render::JsonFormat::Pretty)?);
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Position tags**: compact, text-embeddable source regions
//! - **Region cropping**: cross-page stitching with dimmed context strips
//! - **Context attachment**: neighboring text for figures and tables
//! - **Token-budget merging**: overlap, hard delimiters, image stacking
//! - **Parallel batches**: Uses Rayon across documents

pub mod chunk;
pub mod error;
pub mod model;
pub mod parser;
pub mod pipeline;
pub mod position;
pub mod raster;
pub mod render;

// Re-export commonly used types
pub use chunk::{
    merge_text, merge_with_images, ChunkOptions, Delimiter, EstimateCounter, MergeOutput,
    Section, TokenCounter,
};
pub use error::{Error, Result};
pub use model::{
    AnalyzerBlock, Bbox, BlockContent, BlockKind, Chunk, ChunkPosition, ContentUnit, DocType,
    Region,
};
pub use parser::{
    parse_content_list, read_content_list, ContentList, ContentListParser, CropScope, ErrorMode,
    ParseOptions, SectionLayout,
};
pub use pipeline::{process_batch, DocumentInput, DocumentOutput, LayoutSection, Pipeline};
pub use position::{DecodedRegion, PositionTag};
pub use raster::{PageRasters, SharedImage};
pub use render::{ChunkRecord, ChunkStats, JsonFormat};

use std::path::Path;

/// Chunk a content list file into records.
///
/// # Arguments
///
/// * `path` - Path to the analyzer's `*_content_list.json`
/// * `rasters` - Rendered pages, may be empty
/// * `options` - Chunking options
///
/// # Example
///
/// ```no_run
/// use layoutchunk::{chunk_file, ChunkOptions, PageRasters};
///
/// let records = chunk_file("doc_content_list.json", &PageRasters::default(), &ChunkOptions::default()).unwrap();
/// println!("Records: {}", records.len());
/// ```
pub fn chunk_file<P: AsRef<Path>>(
    path: P,
    rasters: &PageRasters,
    options: &ChunkOptions,
) -> Result<Vec<ChunkRecord>> {
    chunk_file_with_options(path, rasters, options, ParseOptions::default())
}

/// Chunk a content list file with custom parse options.
pub fn chunk_file_with_options<P: AsRef<Path>>(
    path: P,
    rasters: &PageRasters,
    options: &ChunkOptions,
    parse_options: ParseOptions,
) -> Result<Vec<ChunkRecord>> {
    let content = ContentListParser::open_with_options(path, parse_options.clone())?.parse()?;
    Pipeline::new(options.clone(), parse_options).records(&content, rasters)
}

/// Chunk an in-memory content list into records.
///
/// # Example
///
/// ```
/// use layoutchunk::{chunk_json, ChunkOptions, PageRasters};
///
/// let json = r#"[{"type": "text", "text": "Hello", "bbox": [0, 0, 100, 20], "page_idx": 0}]"#;
/// let records = chunk_json(json, &PageRasters::default(), &ChunkOptions::default()).unwrap();
/// assert_eq!(records[0].content, "\nHello");
/// ```
pub fn chunk_json(
    json: &str,
    rasters: &PageRasters,
    options: &ChunkOptions,
) -> Result<Vec<ChunkRecord>> {
    let content = parse_content_list(json)?;
    Pipeline::new(options.clone(), ParseOptions::default()).records(&content, rasters)
}

/// Decode every position tag found in a text.
///
/// # Example
///
/// ```
/// let regions = layoutchunk::extract_positions("a@@2\t1.0\t2.0\t3.0\t4.0##b");
/// assert_eq!(regions[0].pages, vec![1]);
/// ```
pub fn extract_positions(text: &str) -> Vec<DecodedRegion> {
    position::decode(text)
}

/// Strip every position tag from a text.
pub fn remove_tags(text: &str) -> String {
    position::strip_tags(text)
}
