//! Chunking: options, token counting, context attachment and merging.

pub mod context;
pub mod merge;
mod options;
mod tokenizer;

pub use context::attach;
pub use merge::{merge_text, merge_with_images, MergeOutput, Section, MIN_TAGGED_TOKENS};
pub use options::{ChunkOptions, Delimiter, DEFAULT_DELIMITER, DEFAULT_TOKEN_BUDGET};
pub use tokenizer::{EstimateCounter, TokenCounter};
