//! Analyzer output blocks.
//!
//! These types mirror one element of the layout analyzer's content list:
//! a `type` discriminator, kind-specific fields, a normalized bounding box
//! in the 0-1000 space and a zero-based page index.

use serde::{Deserialize, Serialize};

/// One element of the analyzer's content list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzerBlock {
    /// Kind-specific content
    #[serde(flatten)]
    pub content: BlockContent,

    /// Bounding box `[x0, top, x1, bottom]` in 0-1000 normalized space
    #[serde(default)]
    pub bbox: [f32; 4],

    /// Zero-based page index
    #[serde(default)]
    pub page_idx: usize,
}

impl AnalyzerBlock {
    /// Create a block from content and placement.
    pub fn new(content: BlockContent, page_idx: usize, bbox: [f32; 4]) -> Self {
        Self {
            content,
            bbox,
            page_idx,
        }
    }

    /// Create a plain text block.
    pub fn text(text: impl Into<String>, page_idx: usize, bbox: [f32; 4]) -> Self {
        Self::new(
            BlockContent::Text {
                text: text.into(),
                text_level: None,
            },
            page_idx,
            bbox,
        )
    }

    /// Get the kind of this block.
    pub fn kind(&self) -> BlockKind {
        self.content.kind()
    }

    /// Check if the analyzer marked this block as discarded.
    pub fn is_discarded(&self) -> bool {
        matches!(
            self.content,
            BlockContent::Discarded { .. } | BlockContent::Unsupported
        )
    }
}

/// Kind-specific fields of an analyzer block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BlockContent {
    /// Running text (paragraphs, titles)
    Text {
        /// The text content
        #[serde(default)]
        text: String,
        /// Title level when the analyzer detected a heading
        #[serde(default, skip_serializing_if = "Option::is_none")]
        text_level: Option<u8>,
    },

    /// A table
    Table {
        /// Table body, usually HTML
        #[serde(default)]
        table_body: String,
        /// Caption lines
        #[serde(default)]
        table_caption: Vec<String>,
        /// Footnote lines
        #[serde(default)]
        table_footnote: Vec<String>,
    },

    /// A figure
    Image {
        /// Caption lines
        #[serde(default)]
        image_caption: Vec<String>,
        /// Footnote lines
        #[serde(default)]
        image_footnote: Vec<String>,
        /// Path of the analyzer's own crop, relative to its output directory
        #[serde(default, skip_serializing_if = "Option::is_none")]
        img_path: Option<String>,
    },

    /// A display equation
    Equation {
        /// Equation source (usually LaTeX)
        #[serde(default)]
        text: String,
    },

    /// A code listing
    Code {
        /// Code text
        #[serde(default)]
        code_body: String,
        /// Caption lines
        #[serde(default)]
        code_caption: Vec<String>,
    },

    /// A list
    List {
        /// Item texts in order
        #[serde(default)]
        list_items: Vec<String>,
    },

    /// Headers, footers, page numbers and other dropped content
    Discarded {
        /// Whatever text the analyzer kept
        #[serde(default)]
        text: String,
    },

    /// Any block type this crate does not know about
    #[serde(other)]
    Unsupported,
}

impl BlockContent {
    /// Get the kind of this content.
    pub fn kind(&self) -> BlockKind {
        match self {
            BlockContent::Text { .. } => BlockKind::Text,
            BlockContent::Table { .. } => BlockKind::Table,
            BlockContent::Image { .. } => BlockKind::Image,
            BlockContent::Equation { .. } => BlockKind::Equation,
            BlockContent::Code { .. } => BlockKind::Code,
            BlockContent::List { .. } => BlockKind::List,
            BlockContent::Discarded { .. } | BlockContent::Unsupported => BlockKind::Discarded,
        }
    }
}

/// Content block kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockKind {
    /// Running text
    Text,
    /// Table
    Table,
    /// Figure
    Image,
    /// Display equation
    Equation,
    /// Code listing
    Code,
    /// List
    List,
    /// Dropped content
    Discarded,
}

impl BlockKind {
    /// Get the analyzer's name for this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            BlockKind::Text => "text",
            BlockKind::Table => "table",
            BlockKind::Image => "image",
            BlockKind::Equation => "equation",
            BlockKind::Code => "code",
            BlockKind::List => "list",
            BlockKind::Discarded => "discarded",
        }
    }
}

impl std::fmt::Display for BlockKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
