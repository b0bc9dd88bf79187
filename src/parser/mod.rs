//! Analyzer output parsing module.

mod content_list;
mod options;

pub use content_list::{ContentList, ContentListParser, CONTENT_LIST_SUFFIX};
pub use options::{CropScope, ErrorMode, ParseOptions, SectionLayout};

use std::path::Path;

use crate::error::Result;

/// Find and parse the content list in an analyzer output directory.
pub fn read_content_list<P: AsRef<Path>>(
    output_dir: P,
    file_stem: &str,
    method: &str,
) -> Result<ContentList> {
    ContentListParser::locate(output_dir, file_stem, method, ParseOptions::default())?.parse()
}

/// Parse an in-memory content list.
pub fn parse_content_list(json: &str) -> Result<ContentList> {
    ContentListParser::from_bytes(json.as_bytes()).parse()
}
