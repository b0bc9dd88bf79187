//! Content units derived from analyzer blocks.

use super::block::{AnalyzerBlock, BlockContent, BlockKind};
use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;

/// Placeholder text for tables the analyzer returned without any content.
pub const FAILED_TABLE_TEXT: &str = "FAILED TO PARSE TABLE";

/// A page-relative region in the analyzer's 0-1000 normalized space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Region {
    /// Zero-based page index
    pub page_index: usize,
    /// Left edge
    pub x0: f32,
    /// Top edge
    pub top: f32,
    /// Right edge
    pub x1: f32,
    /// Bottom edge
    pub bottom: f32,
}

impl Region {
    /// Create a region from an analyzer bbox `[x0, top, x1, bottom]`.
    pub fn from_bbox(page_index: usize, bbox: [f32; 4]) -> Self {
        let [x0, top, x1, bottom] = bbox;
        Self {
            page_index,
            x0,
            top,
            x1,
            bottom,
        }
    }
}

/// Which visual kind a unit represents, for context attachment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocType {
    /// A figure
    Image,
    /// A table
    Table,
}

/// One analyzer block turned into text plus placement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentUnit {
    /// Block kind (never `Discarded`)
    pub kind: BlockKind,

    /// Text derived from the kind-specific fields
    pub text: String,

    /// Regions covered by the block, in order
    pub regions: Vec<Region>,

    /// Raw kind-specific fields
    pub content: BlockContent,
}

impl ContentUnit {
    /// Build a unit from an analyzer block.
    ///
    /// Returns `None` for discarded blocks.
    pub fn from_block(block: &AnalyzerBlock) -> Option<Self> {
        if block.is_discarded() {
            return None;
        }

        Some(Self {
            kind: block.kind(),
            text: derive_text(&block.content),
            regions: vec![Region::from_bbox(block.page_idx, block.bbox)],
            content: block.content.clone(),
        })
    }

    /// Normalize the unit text to Unicode NFC.
    pub fn normalize_text(&mut self) {
        self.text = self.text.nfc().collect();
    }

    /// Get the doc type used by context attachment.
    pub fn doc_type(&self) -> Option<DocType> {
        match self.kind {
            BlockKind::Image => Some(DocType::Image),
            BlockKind::Table => Some(DocType::Table),
            _ => None,
        }
    }

    /// Check if this unit is a figure or a table.
    pub fn is_visual(&self) -> bool {
        self.doc_type().is_some()
    }

    /// Get the analyzer's own image path, if any.
    pub fn img_path(&self) -> Option<&str> {
        match &self.content {
            BlockContent::Image { img_path, .. } => img_path.as_deref(),
            _ => None,
        }
    }
}

fn derive_text(content: &BlockContent) -> String {
    match content {
        BlockContent::Text { text, .. } | BlockContent::Equation { text } => text.clone(),
        BlockContent::Table {
            table_body,
            table_caption,
            table_footnote,
        } => {
            let text = format!(
                "{}{}{}",
                table_body,
                table_caption.join("\n"),
                table_footnote.join("\n")
            );
            if text.trim().is_empty() {
                FAILED_TABLE_TEXT.to_string()
            } else {
                text
            }
        }
        BlockContent::Image {
            image_caption,
            image_footnote,
            ..
        } => format!("{}\n{}", image_caption.concat(), image_footnote.concat()),
        BlockContent::Code {
            code_body,
            code_caption,
        } => format!("{}{}", code_body, code_caption.join("\n")),
        BlockContent::List { list_items } => list_items.join("\n"),
        BlockContent::Discarded { .. } | BlockContent::Unsupported => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_unit() {
        let block = AnalyzerBlock::text("Hello world", 1, [0.0, 10.0, 500.0, 20.0]);
        let unit = ContentUnit::from_block(&block).unwrap();
        assert_eq!(unit.kind, BlockKind::Text);
        assert_eq!(unit.text, "Hello world");
        assert_eq!(unit.regions.len(), 1);
        assert_eq!(unit.regions[0].page_index, 1);
        assert_eq!(unit.regions[0].x1, 500.0);
        assert!(unit.doc_type().is_none());
    }

    #[test]
    fn test_discarded_block_is_dropped() {
        let block = AnalyzerBlock::new(
            BlockContent::Discarded {
                text: "Page 3".to_string(),
            },
            0,
            [0.0; 4],
        );
        assert!(ContentUnit::from_block(&block).is_none());
    }

    #[test]
    fn test_empty_table_placeholder() {
        let block = AnalyzerBlock::new(
            BlockContent::Table {
                table_body: "  ".to_string(),
                table_caption: vec![],
                table_footnote: vec![],
            },
            0,
            [0.0; 4],
        );
        let unit = ContentUnit::from_block(&block).unwrap();
        assert_eq!(unit.text, FAILED_TABLE_TEXT);
        assert_eq!(unit.doc_type(), Some(DocType::Table));
    }

    #[test]
    fn test_table_text_joins_captions() {
        let block = AnalyzerBlock::new(
            BlockContent::Table {
                table_body: "<table/>".to_string(),
                table_caption: vec!["Table 1".to_string(), "Results".to_string()],
                table_footnote: vec!["* p < 0.05".to_string()],
            },
            0,
            [0.0; 4],
        );
        let unit = ContentUnit::from_block(&block).unwrap();
        assert_eq!(unit.text, "<table/>Table 1\nResults* p < 0.05");
    }

    #[test]
    fn test_image_text_and_path() {
        let block = AnalyzerBlock::new(
            BlockContent::Image {
                image_caption: vec!["Figure 2: ".to_string(), "Architecture".to_string()],
                image_footnote: vec!["Source: vendor".to_string()],
                img_path: Some("images/fig2.jpg".to_string()),
            },
            0,
            [0.0; 4],
        );
        let unit = ContentUnit::from_block(&block).unwrap();
        assert_eq!(unit.text, "Figure 2: Architecture\nSource: vendor");
        assert_eq!(unit.img_path(), Some("images/fig2.jpg"));
        assert!(unit.is_visual());
    }

    #[test]
    fn test_code_and_list_text() {
        let code = AnalyzerBlock::new(
            BlockContent::Code {
                code_body: "fn main() {}\n".to_string(),
                code_caption: vec!["Listing 1".to_string()],
            },
            0,
            [0.0; 4],
        );
        assert_eq!(
            ContentUnit::from_block(&code).unwrap().text,
            "fn main() {}\nListing 1"
        );

        let list = AnalyzerBlock::new(
            BlockContent::List {
                list_items: vec!["- one".to_string(), "- two".to_string()],
            },
            0,
            [0.0; 4],
        );
        assert_eq!(ContentUnit::from_block(&list).unwrap().text, "- one\n- two");
    }

    #[test]
    fn test_normalize_text() {
        let block = AnalyzerBlock::text("e\u{301}", 0, [0.0; 4]);
        let mut unit = ContentUnit::from_block(&block).unwrap();
        unit.normalize_text();
        assert_eq!(unit.text, "\u{e9}");
    }
}
