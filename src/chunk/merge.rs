//! Token-budgeted merging of units into chunks.
//!
//! The merger folds an ordered sequence of `(text, tag, image)` units into
//! chunks. Each unit contributes `"\n" + text`, its position tag (when the
//! unit is long enough to deserve one) and its image. A chunk stays open
//! while its token count is within the budget; the unit that pushes it over
//! still lands in it, and the next unit opens a new chunk.
//!
//! When the delimiter carries literal markers the merger switches to
//! hard-split mode instead: every unit is cut on the markers and no two units
//! ever share a chunk.

use regex::Regex;

use super::options::ChunkOptions;
use super::tokenizer::TokenCounter;
use crate::error::{Error, Result};
use crate::model::{positions_in, Chunk};
use crate::position;
use crate::raster::{self, SharedImage};

/// Units shorter than this many tokens do not carry a position tag.
pub const MIN_TAGGED_TOKENS: usize = 8;

/// One unit handed to the merger.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Section {
    /// Unit text
    pub text: String,
    /// Encoded position tag, empty when unknown
    pub tag: String,
}

impl Section {
    /// Create a section.
    pub fn new(text: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            tag: tag.into(),
        }
    }

    /// Create a section without a position tag.
    pub fn untagged(text: impl Into<String>) -> Self {
        Self::new(text, String::new())
    }
}

impl<T: Into<String>, U: Into<String>> From<(T, U)> for Section {
    fn from((text, tag): (T, U)) -> Self {
        Self::new(text, tag)
    }
}

/// Result of a merge.
#[derive(Debug, Clone, Default)]
pub struct MergeOutput {
    /// Chunks in output order
    pub chunks: Vec<Chunk>,
}

impl MergeOutput {
    /// Number of chunks.
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Check if no chunk was produced.
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Get the chunk texts.
    pub fn texts(&self) -> Vec<&str> {
        self.chunks.iter().map(|c| c.text.as_str()).collect()
    }

    /// Recompute chunk positions with known page heights.
    ///
    /// Only tags spanning several pages depend on the heights.
    pub fn locate(&mut self, page_height: impl Fn(usize) -> Option<u32>) {
        for chunk in &mut self.chunks {
            chunk.positions = positions_in(&chunk.text, &page_height);
        }
    }

    /// Split into parallel text and image lists.
    pub fn into_parts(self) -> (Vec<String>, Vec<Option<SharedImage>>) {
        self.chunks.into_iter().map(|c| (c.text, c.image)).unzip()
    }
}

/// Merge sections and their images into chunks.
///
/// `sections` and `images` are parallel; a length mismatch is an error and
/// nothing is produced.
pub fn merge_with_images(
    sections: &[Section],
    images: &[Option<SharedImage>],
    options: &ChunkOptions,
    counter: &dyn TokenCounter,
) -> Result<MergeOutput> {
    if sections.len() != images.len() {
        return Err(Error::LengthMismatch {
            texts: sections.len(),
            images: images.len(),
        });
    }
    options.validate()?;

    if sections.is_empty() {
        return Ok(MergeOutput::default());
    }

    let units = sections.iter().zip(images.iter().map(Option::as_ref));
    let chunks = if let Some(markers) = options.delimiter.marker_regex() {
        split_hard(units, &markers, counter)
    } else if options.per_unit {
        units
            .map(|(section, image)| single_chunk(&section.text, &section.tag, image, counter))
            .collect()
    } else {
        units
            .fold(Accumulator::new(options), |acc, (section, image)| {
                acc.push(section, image, counter)
            })
            .finish()
    };

    log::debug!(
        "merged {} sections into {} chunks",
        sections.len(),
        chunks.len()
    );

    Ok(MergeOutput {
        chunks: chunks.into_iter().map(with_positions).collect(),
    })
}

/// Merge sections without images.
pub fn merge_text(
    sections: &[Section],
    options: &ChunkOptions,
    counter: &dyn TokenCounter,
) -> Result<MergeOutput> {
    let images = vec![None; sections.len()];
    merge_with_images(sections, &images, options, counter)
}

/// Running state of the token-budget fold.
struct Accumulator {
    chunks: Vec<Chunk>,
    threshold: f64,
    overlap_percent: u8,
}

impl Accumulator {
    fn new(options: &ChunkOptions) -> Self {
        Self {
            chunks: Vec::new(),
            threshold: options.threshold(),
            overlap_percent: options.overlap_percent,
        }
    }

    fn push(
        mut self,
        section: &Section,
        image: Option<&SharedImage>,
        counter: &dyn TokenCounter,
    ) -> Self {
        let mut piece = format!("\n{}", section.text);
        let tokens = counter.count_tokens(&piece);
        let tag = if tokens < MIN_TAGGED_TOKENS {
            ""
        } else {
            section.tag.as_str()
        };

        let open = self
            .chunks
            .last()
            .is_some_and(|c| c.token_count as f64 <= self.threshold);

        if open {
            if let Some(current) = self.chunks.last_mut() {
                if !tag.is_empty() && !current.text.contains(tag) {
                    piece.push_str(tag);
                }
                current.text.push_str(&piece);
                current.token_count += tokens;
                current.image = raster::stack(current.image.as_ref(), image);
            }
            return self;
        }

        if self.overlap_percent > 0 {
            if let Some(previous) = self.chunks.last() {
                piece = format!("{}{}", overlap_tail(&previous.text, self.overlap_percent), piece);
            }
        }
        if !tag.is_empty() && !piece.contains(tag) {
            piece.push_str(tag);
        }
        self.chunks.push(Chunk {
            text: piece,
            image: image.cloned(),
            positions: Vec::new(),
            token_count: tokens,
        });
        self
    }

    fn finish(self) -> Vec<Chunk> {
        self.chunks
    }
}

/// Trailing `percent`% of the tag-free text, measured in characters.
fn overlap_tail(text: &str, percent: u8) -> String {
    let plain = position::strip_tags(text);
    let len = plain.chars().count();
    let start = (len as f64 * f64::from(100 - percent.min(100)) / 100.0) as usize;
    plain.chars().skip(start).collect()
}

fn split_hard<'a>(
    units: impl Iterator<Item = (&'a Section, Option<&'a SharedImage>)>,
    markers: &Regex,
    counter: &dyn TokenCounter,
) -> Vec<Chunk> {
    units
        .flat_map(|(section, image)| {
            markers
                .split(&section.text)
                .map(|segment| single_chunk(segment, &section.tag, image, counter))
                .collect::<Vec<_>>()
        })
        .collect()
}

fn single_chunk(
    text: &str,
    tag: &str,
    image: Option<&SharedImage>,
    counter: &dyn TokenCounter,
) -> Chunk {
    let mut text = format!("\n{}", text);
    let tokens = counter.count_tokens(&text);
    if tokens >= MIN_TAGGED_TOKENS && !tag.is_empty() && !text.contains(tag) {
        text.push_str(tag);
    }
    Chunk {
        text,
        image: image.cloned(),
        positions: Vec::new(),
        token_count: tokens,
    }
}

fn with_positions(mut chunk: Chunk) -> Chunk {
    chunk.positions = positions_in(&chunk.text, |_| None);
    chunk
}
