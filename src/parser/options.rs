//! Parsing options and configuration.

use std::path::PathBuf;

/// Options for turning analyzer output into merge-ready sections.
#[derive(Debug, Clone)]
pub struct ParseOptions {
    /// Error handling mode
    pub error_mode: ErrorMode,

    /// Shape of the produced sections
    pub layout: SectionLayout,

    /// Which units get a cropped image
    pub crop_scope: CropScope,

    /// Directory relative `img_path` values resolve against
    pub image_root: Option<PathBuf>,

    /// Whether to normalize unit text to Unicode NFC
    pub normalize_unicode: bool,

    /// Whether to use parallel processing
    pub parallel: bool,
}

impl ParseOptions {
    /// Create new parse options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set error mode.
    pub fn with_error_mode(mut self, mode: ErrorMode) -> Self {
        self.error_mode = mode;
        self
    }

    /// Enable lenient mode (skip blocks that fail to deserialize).
    pub fn lenient(mut self) -> Self {
        self.error_mode = ErrorMode::Lenient;
        self
    }

    /// Set the section layout.
    pub fn with_layout(mut self, layout: SectionLayout) -> Self {
        self.layout = layout;
        self
    }

    /// Set the crop scope.
    pub fn with_crop_scope(mut self, scope: CropScope) -> Self {
        self.crop_scope = scope;
        self
    }

    /// Set the image root.
    pub fn with_image_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.image_root = Some(root.into());
        self
    }

    /// Enable or disable NFC normalization.
    pub fn with_normalization(mut self, normalize: bool) -> Self {
        self.normalize_unicode = normalize;
        self
    }

    /// Disable parallel processing.
    pub fn sequential(mut self) -> Self {
        self.parallel = false;
        self
    }
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            error_mode: ErrorMode::Strict,
            layout: SectionLayout::Raw,
            crop_scope: CropScope::Visual,
            image_root: None,
            normalize_unicode: false,
            parallel: true,
        }
    }
}

/// Error handling mode during parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorMode {
    /// Fail on any malformed block
    #[default]
    Strict,
    /// Skip malformed blocks and continue
    Lenient,
}

/// Shape of the sections produced from units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SectionLayout {
    /// `(text, tag)`
    #[default]
    Raw,
    /// `(text, kind, tag)`
    Manual,
    /// `text + tag`, with the tag inline
    Paper,
}

/// Which units get an image cropped from the page rasters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CropScope {
    /// No cropping
    Off,
    /// Figures and tables only
    #[default]
    Visual,
    /// Every unit
    All,
}
