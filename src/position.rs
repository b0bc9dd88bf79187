//! Position tags embedded in chunk text.
//!
//! A position tag records where a piece of text came from:
//!
//! ```text
//! @@<page>[-<page>...]\t<x0>\t<x1>\t<top>\t<bottom>##
//! ```
//!
//! Pages are 1-based in the tag and 0-based once decoded. Coordinates are
//! absolute pixels of the rendered page when the page size is known, and the
//! analyzer's 0-1000 normalized values otherwise. Tags are plain text, so
//! they survive concatenation and can be recovered from any chunk.
//!
//! # Example
//!
//! ```
//! use layoutchunk::position::{decode, PositionTag};
//!
//! let tag = PositionTag::new(vec![3], 10.0, 110.0, 20.0, 40.0);
//! assert_eq!(tag.encode(), "@@3\t10.0\t110.0\t20.0\t40.0##");
//!
//! let regions = decode(&format!("Some text{}", tag));
//! assert_eq!(regions[0].pages, vec![2]);
//! ```

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::model::Region;

/// Side of the analyzer's normalized coordinate space.
pub const NORMALIZED_EXTENT: f32 = 1000.0;

fn tag_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"@@[0-9-]+\t[0-9.\t]+##").unwrap())
}

fn strip_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"@@[\t0-9.-]+?##").unwrap())
}

/// A bounding-region descriptor that can be embedded in text.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionTag {
    /// 1-based page numbers; more than one means a region spanning pages
    pub pages: Vec<usize>,
    /// Left edge
    pub x0: f32,
    /// Right edge
    pub x1: f32,
    /// Top edge
    pub top: f32,
    /// Bottom edge
    pub bottom: f32,
}

impl PositionTag {
    /// Create a tag from 1-based page numbers and coordinates.
    pub fn new(pages: Vec<usize>, x0: f32, x1: f32, top: f32, bottom: f32) -> Self {
        Self {
            pages,
            x0,
            x1,
            top,
            bottom,
        }
    }

    /// Create a tag for a normalized region.
    ///
    /// When `page_size` (`(width, height)` in pixels) is given, coordinates
    /// are rescaled from the 0-1000 space to pixels.
    pub fn from_region(region: &Region, page_size: Option<(u32, u32)>) -> Self {
        let (mut x0, mut x1, mut top, mut bottom) =
            (region.x0, region.x1, region.top, region.bottom);

        if let Some((width, height)) = page_size {
            let (width, height) = (width as f32, height as f32);
            x0 = x0 / NORMALIZED_EXTENT * width;
            x1 = x1 / NORMALIZED_EXTENT * width;
            top = top / NORMALIZED_EXTENT * height;
            bottom = bottom / NORMALIZED_EXTENT * height;
        }

        Self::new(vec![region.page_index + 1], x0, x1, top, bottom)
    }

    /// Serialize to the tag string.
    pub fn encode(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for PositionTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pages = self
            .pages
            .iter()
            .map(|p| p.to_string())
            .collect::<Vec<_>>()
            .join("-");
        write!(
            f,
            "@@{}\t{:.1}\t{:.1}\t{:.1}\t{:.1}##",
            pages, self.x0, self.x1, self.top, self.bottom
        )
    }
}

/// A region recovered from a position tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecodedRegion {
    /// 0-based page indices
    pub pages: Vec<usize>,
    /// Left edge
    pub x0: f32,
    /// Right edge
    pub x1: f32,
    /// Top edge
    pub top: f32,
    /// Bottom edge
    pub bottom: f32,
}

impl DecodedRegion {
    /// Width of the region.
    pub fn width(&self) -> f32 {
        self.x1 - self.x0
    }

    /// Height of the region on its first page.
    pub fn height(&self) -> f32 {
        self.bottom - self.top
    }

    /// Turn the region back into a tag.
    pub fn to_tag(&self) -> PositionTag {
        PositionTag::new(
            self.pages.iter().map(|p| p + 1).collect(),
            self.x0,
            self.x1,
            self.top,
            self.bottom,
        )
    }
}

/// Find and decode every position tag in `text`, in order of appearance.
///
/// Anything that does not parse is ignored. Page number `0` has no 0-based
/// index and is dropped from the page list.
pub fn decode(text: &str) -> Vec<DecodedRegion> {
    tag_regex()
        .find_iter(text)
        .filter_map(|m| parse_tag(m.as_str()))
        .collect()
}

fn parse_tag(tag: &str) -> Option<DecodedRegion> {
    let body = tag.trim_start_matches('@').trim_end_matches('#');
    let fields: Vec<&str> = body.split('\t').collect();
    if fields.len() != 5 {
        return None;
    }

    let mut pages = Vec::new();
    for page in fields[0].split('-') {
        let page: usize = page.parse().ok()?;
        if let Some(index) = page.checked_sub(1) {
            pages.push(index);
        }
    }

    let x0 = fields[1].parse().ok()?;
    let x1 = fields[2].parse().ok()?;
    let top = fields[3].parse().ok()?;
    let bottom = fields[4].parse().ok()?;

    Some(DecodedRegion {
        pages,
        x0,
        x1,
        top,
        bottom,
    })
}

/// Remove every position tag from `text`.
pub fn strip_tags(text: &str) -> String {
    strip_regex().replace_all(text, "").into_owned()
}

/// Check if `text` contains at least one position tag.
pub fn has_tag(text: &str) -> bool {
    tag_regex().is_match(text)
}
