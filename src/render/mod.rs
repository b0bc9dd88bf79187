//! Rendering module for turning chunks into index-ready records.

mod json;
mod record;
mod result;
mod text;

pub use json::{to_json, JsonFormat};
pub use record::{build_records, ChunkRecord};
pub use result::ChunkStats;
pub use text::to_text;
