//! End-to-end processing of one or many documents.
//!
//! For every document the pipeline derives content units from the analyzer
//! blocks, tags each unit with its position, crops unit images out of the
//! page rasters, optionally attaches neighboring text to figures and tables,
//! and finally merges everything into chunks.

use std::sync::Arc;

use rayon::prelude::*;

use crate::chunk::{self, ChunkOptions, EstimateCounter, MergeOutput, Section, TokenCounter};
use crate::error::Result;
use crate::model::{positions_in, Bbox, BlockKind, ContentUnit};
use crate::parser::ContentList;
use crate::position::PositionTag;
use crate::raster::{self, PageRasters, SharedImage};
use crate::render::{build_records, ChunkRecord};

pub use crate::parser::{CropScope, ParseOptions, SectionLayout};

/// A unit shaped for downstream consumers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayoutSection {
    /// Text and tag side by side
    Raw {
        /// Unit text
        text: String,
        /// Position tag
        tag: String,
    },
    /// Text, block kind and tag
    Manual {
        /// Unit text
        text: String,
        /// Block kind
        kind: BlockKind,
        /// Position tag
        tag: String,
    },
    /// Text with the tag inline, and block kind
    Paper {
        /// Unit text followed by its tag
        text: String,
        /// Block kind
        kind: BlockKind,
    },
}

impl LayoutSection {
    /// Shape a unit's text and tag.
    ///
    /// Units with empty text always take the raw shape.
    pub fn new(layout: SectionLayout, text: &str, kind: BlockKind, tag: &str) -> Self {
        match layout {
            SectionLayout::Manual if !text.is_empty() => Self::Manual {
                text: text.to_string(),
                kind,
                tag: tag.to_string(),
            },
            SectionLayout::Paper if !text.is_empty() => Self::Paper {
                text: format!("{}{}", text, tag),
                kind,
            },
            _ => Self::Raw {
                text: text.to_string(),
                tag: tag.to_string(),
            },
        }
    }

    /// Get the section text.
    pub fn text(&self) -> &str {
        match self {
            Self::Raw { text, .. } | Self::Manual { text, .. } | Self::Paper { text, .. } => text,
        }
    }

    /// Get the separate tag, empty for the paper shape.
    pub fn tag(&self) -> &str {
        match self {
            Self::Raw { tag, .. } | Self::Manual { tag, .. } => tag,
            Self::Paper { .. } => "",
        }
    }

    /// Convert to a merger section.
    pub fn to_section(&self) -> Section {
        Section::new(self.text(), self.tag())
    }
}

/// Encode the position tag of a unit.
///
/// Coordinates are scaled to pixels when the unit's page is rendered.
pub fn unit_tag(unit: &ContentUnit, rasters: &PageRasters) -> String {
    unit.regions
        .iter()
        .map(|region| {
            let size = rasters.page(region.page_index).map(|page| page.dimensions());
            PositionTag::from_region(region, size).encode()
        })
        .collect()
}

/// One document of a batch.
#[derive(Debug, Clone)]
pub struct DocumentInput {
    /// Document name, used in logs and outputs
    pub name: String,
    /// Analyzer output
    pub content: ContentList,
    /// Rendered pages
    pub rasters: PageRasters,
}

impl DocumentInput {
    /// Create a document input.
    pub fn new(name: impl Into<String>, content: ContentList, rasters: PageRasters) -> Self {
        Self {
            name: name.into(),
            content,
            rasters,
        }
    }
}

/// Chunks of one document of a batch.
#[derive(Debug, Clone)]
pub struct DocumentOutput {
    /// Document name
    pub name: String,
    /// Merged chunks
    pub chunks: MergeOutput,
}

/// Chunking pipeline with a fixed configuration.
pub struct Pipeline<C = EstimateCounter> {
    chunk_options: ChunkOptions,
    parse_options: ParseOptions,
    counter: C,
}

impl Pipeline<EstimateCounter> {
    /// Create a pipeline using the heuristic token counter.
    pub fn new(chunk_options: ChunkOptions, parse_options: ParseOptions) -> Self {
        Self {
            chunk_options,
            parse_options,
            counter: EstimateCounter,
        }
    }
}

impl Default for Pipeline<EstimateCounter> {
    fn default() -> Self {
        Self::new(ChunkOptions::default(), ParseOptions::default())
    }
}

impl<C: TokenCounter> Pipeline<C> {
    /// Replace the token counter.
    pub fn with_counter<D: TokenCounter>(self, counter: D) -> Pipeline<D> {
        Pipeline {
            chunk_options: self.chunk_options,
            parse_options: self.parse_options,
            counter,
        }
    }

    /// Get the chunk options.
    pub fn chunk_options(&self) -> &ChunkOptions {
        &self.chunk_options
    }

    /// Get the parse options.
    pub fn parse_options(&self) -> &ParseOptions {
        &self.parse_options
    }

    /// Shape the document's units in the configured layout.
    pub fn sections(&self, content: &ContentList, rasters: &PageRasters) -> Vec<LayoutSection> {
        content
            .units(&self.parse_options)
            .iter()
            .map(|unit| {
                LayoutSection::new(
                    self.parse_options.layout,
                    &unit.text,
                    unit.kind,
                    &unit_tag(unit, rasters),
                )
            })
            .collect()
    }

    /// Merge a document into chunks.
    pub fn process(&self, content: &ContentList, rasters: &PageRasters) -> Result<MergeOutput> {
        process_document(
            content,
            rasters,
            &self.chunk_options,
            &self.parse_options,
            &self.counter,
        )
    }

    /// Merge a document and wrap the chunks as records.
    pub fn records(&self, content: &ContentList, rasters: &PageRasters) -> Result<Vec<ChunkRecord>> {
        let output = self.process(content, rasters)?;
        Ok(build_records(
            &output.chunks,
            self.chunk_options.child_delimiter.as_ref(),
        ))
    }
}

/// Merge one document into chunks.
pub fn process_document(
    content: &ContentList,
    rasters: &PageRasters,
    chunk_options: &ChunkOptions,
    parse_options: &ParseOptions,
    counter: &dyn TokenCounter,
) -> Result<MergeOutput> {
    chunk_options.validate()?;

    let units = content.units(parse_options);
    let tags: Vec<String> = units.iter().map(|u| unit_tag(u, rasters)).collect();

    let mut bboxes: Vec<Bbox> = units
        .iter()
        .zip(&tags)
        .map(|(unit, tag)| unit_bbox(unit, tag, content, rasters, parse_options))
        .collect();

    if chunk_options.attaches_context() {
        chunk::attach(
            &mut bboxes,
            chunk_options.table_context_budget,
            chunk_options.image_context_budget,
            counter,
        );
    }

    let sections: Vec<Section> = units
        .iter()
        .zip(&bboxes)
        .zip(&tags)
        .map(|((unit, bbox), tag)| {
            LayoutSection::new(parse_options.layout, &bbox.text, unit.kind, tag).to_section()
        })
        .collect();
    let images: Vec<Option<SharedImage>> = bboxes.into_iter().map(|b| b.image).collect();

    let mut output = chunk::merge_with_images(&sections, &images, chunk_options, counter)?;
    output.locate(page_height(rasters));
    Ok(output)
}

/// Height of a rendered document page, in the pixel space of its tags.
fn page_height(rasters: &PageRasters) -> impl Fn(usize) -> Option<u32> + '_ {
    move |page| rasters.page(page).map(|image| image.height())
}

/// Merge independent documents, in parallel unless disabled.
///
/// Results keep the input order. A failing document does not affect the
/// others.
pub fn process_batch(
    documents: &[DocumentInput],
    chunk_options: &ChunkOptions,
    parse_options: &ParseOptions,
    counter: &dyn TokenCounter,
) -> Vec<Result<DocumentOutput>> {
    let run = |doc: &DocumentInput| {
        log::debug!("processing {}", doc.name);
        process_document(
            &doc.content,
            &doc.rasters,
            chunk_options,
            parse_options,
            counter,
        )
        .map(|chunks| DocumentOutput {
            name: doc.name.clone(),
            chunks,
        })
    };

    if parse_options.parallel {
        documents.par_iter().map(run).collect()
    } else {
        documents.iter().map(run).collect()
    }
}

fn unit_bbox(
    unit: &ContentUnit,
    tag: &str,
    content: &ContentList,
    rasters: &PageRasters,
    options: &ParseOptions,
) -> Bbox {
    let mut bbox = Bbox::text(unit.text.as_str());
    bbox.doc_type = unit.doc_type();

    let wants_crop = match options.crop_scope {
        CropScope::Off => false,
        CropScope::Visual => unit.is_visual(),
        CropScope::All => true,
    };
    if wants_crop && !rasters.is_empty() {
        if let Some(result) = raster::crop(tag, rasters) {
            bbox.image = Some(Arc::new(result.image));
            bbox.positions = result.positions;
            return bbox;
        }
    }

    bbox.positions = positions_in(tag, page_height(rasters));
    bbox.image = unit
        .img_path()
        .and_then(|path| content.resolve_image(path, options))
        .and_then(|path| match image::open(&path) {
            Ok(img) => Some(Arc::new(img.to_rgb8())),
            Err(e) => {
                log::warn!("failed to read unit image {}: {}", path.display(), e);
                None
            }
        });
    bbox
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AnalyzerBlock, BlockContent};
    use image::{Rgb, RgbImage};

    fn words(text: &str) -> usize {
        text.split_whitespace().count()
    }

    fn figure(page_idx: usize, bbox: [f32; 4], caption: &str) -> AnalyzerBlock {
        AnalyzerBlock::new(
            BlockContent::Image {
                image_caption: vec![caption.to_string()],
                image_footnote: Vec::new(),
                img_path: None,
            },
            page_idx,
            bbox,
        )
    }

    #[test]
    fn test_layout_section_shapes() {
        let tag = "@@1\t1.0\t2.0\t3.0\t4.0##";
        let raw = LayoutSection::new(SectionLayout::Raw, "t", BlockKind::Text, tag);
        assert_eq!(raw.to_section(), Section::new("t", tag));

        let paper = LayoutSection::new(SectionLayout::Paper, "t", BlockKind::Text, tag);
        assert_eq!(paper.text(), format!("t{}", tag));
        assert_eq!(paper.tag(), "");

        let manual = LayoutSection::new(SectionLayout::Manual, "t", BlockKind::Table, tag);
        assert!(matches!(manual, LayoutSection::Manual { kind: BlockKind::Table, .. }));

        let empty = LayoutSection::new(SectionLayout::Paper, "", BlockKind::Text, tag);
        assert!(matches!(empty, LayoutSection::Raw { .. }));
    }

    #[test]
    fn test_unit_tag_scales_with_raster() {
        let unit = ContentUnit::from_block(&AnalyzerBlock::text("x", 0, [100.0, 200.0, 500.0, 400.0]))
            .unwrap();

        let rasters = PageRasters::new(vec![RgbImage::new(1000, 2000)]);
        assert_eq!(unit_tag(&unit, &rasters), "@@1\t100.0\t500.0\t400.0\t800.0##");
        assert_eq!(
            unit_tag(&unit, &PageRasters::default()),
            "@@1\t100.0\t500.0\t200.0\t400.0##"
        );
    }

    #[test]
    fn test_process_crops_visual_units() {
        let content = ContentList::new(vec![
            AnalyzerBlock::text("one two three four five six seven eight", 0, [100.0, 100.0, 900.0, 200.0]),
            figure(0, [100.0, 300.0, 600.0, 500.0], "Figure 1"),
        ]);
        let rasters = PageRasters::new(vec![RgbImage::from_pixel(1000, 1000, Rgb([200, 200, 200]))]);
        let options = ChunkOptions::new().with_token_budget(100);

        let output = Pipeline::new(options, ParseOptions::default())
            .with_counter(words)
            .process(&content, &rasters)
            .unwrap();

        assert_eq!(output.len(), 1);
        let chunk = &output.chunks[0];
        assert!(chunk.text.contains("Figure 1"));
        // Only the long text unit earns a tag
        assert_eq!(chunk.positions.len(), 1);
        // Figure crop is 500 px wide
        assert_eq!(chunk.image.as_ref().unwrap().width(), 500);
    }

    #[test]
    fn test_process_without_rasters() {
        let content = ContentList::new(vec![figure(0, [0.0, 0.0, 10.0, 10.0], "Fig")]);
        let output = Pipeline::default()
            .process(&content, &PageRasters::default())
            .unwrap();
        assert_eq!(output.len(), 1);
        assert!(output.chunks[0].image.is_none());
    }

    #[test]
    fn test_unreadable_img_path_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("broken.png"), b"garbage").unwrap();

        let block = AnalyzerBlock::new(
            BlockContent::Image {
                image_caption: vec!["Fig".to_string()],
                image_footnote: Vec::new(),
                img_path: Some("broken.png".to_string()),
            },
            0,
            [0.0, 0.0, 10.0, 10.0],
        );
        let content = ContentList::new(vec![block]);
        let parse = ParseOptions::new().with_image_root(dir.path());

        let output = Pipeline::new(ChunkOptions::default(), parse)
            .process(&content, &PageRasters::default())
            .unwrap();
        assert_eq!(output.len(), 1);
        assert!(output.chunks[0].image.is_none());
    }

    #[test]
    fn test_context_attached_before_merge() {
        let content = ContentList::new(vec![
            AnalyzerBlock::text("alpha beta", 0, [0.0, 0.0, 100.0, 10.0]),
            figure(0, [0.0, 20.0, 100.0, 30.0], "Fig"),
        ]);
        let options = ChunkOptions::new().with_image_context(10).per_unit();
        let parse = ParseOptions::new().with_crop_scope(CropScope::Off);

        let output = Pipeline::new(options, parse)
            .with_counter(words)
            .process(&content, &PageRasters::default())
            .unwrap();

        assert_eq!(output.texts()[0], "\nalpha beta");
        assert!(output.texts()[1].starts_with("\nalpha beta\nFig\n"));
    }

    #[test]
    fn test_batch_keeps_order() {
        let docs: Vec<DocumentInput> = (0..4)
            .map(|i| {
                DocumentInput::new(
                    format!("doc{}", i),
                    ContentList::new(vec![AnalyzerBlock::text(format!("text {}", i), 0, [0.0; 4])]),
                    PageRasters::default(),
                )
            })
            .collect();

        let results = process_batch(&docs, &ChunkOptions::default(), &ParseOptions::default(), &words);
        assert_eq!(results.len(), 4);
        for (i, result) in results.iter().enumerate() {
            let doc = result.as_ref().unwrap();
            assert_eq!(doc.name, format!("doc{}", i));
            assert_eq!(doc.chunks.texts(), vec![format!("\ntext {}", i)]);
        }
    }
}
