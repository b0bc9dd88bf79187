//! Layout analyzer content list reader.

use std::io::Read;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::model::{AnalyzerBlock, BlockContent, ContentUnit};

use super::options::{ErrorMode, ParseOptions};

/// File name suffix of the analyzer's content list.
pub const CONTENT_LIST_SUFFIX: &str = "_content_list.json";

/// Parsed analyzer output.
#[derive(Debug, Clone, Default)]
pub struct ContentList {
    /// Blocks in analyzer order
    pub blocks: Vec<AnalyzerBlock>,

    /// Directory the list was read from
    pub base_dir: Option<PathBuf>,
}

impl ContentList {
    /// Create a content list from blocks.
    pub fn new(blocks: Vec<AnalyzerBlock>) -> Self {
        Self {
            blocks,
            base_dir: None,
        }
    }

    /// Number of blocks, discarded ones included.
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Check if the list has no blocks.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Derive content units, dropping discarded blocks.
    pub fn units(&self, options: &ParseOptions) -> Vec<ContentUnit> {
        let units: Vec<ContentUnit> = self
            .blocks
            .iter()
            .filter_map(ContentUnit::from_block)
            .map(|mut unit| {
                if options.normalize_unicode {
                    unit.normalize_text();
                }
                unit
            })
            .collect();

        log::debug!(
            "derived {} units from {} blocks",
            units.len(),
            self.blocks.len()
        );
        units
    }

    /// Resolve an analyzer `img_path`.
    ///
    /// Absolute paths are kept; relative ones resolve against the configured
    /// image root, then against the directory the list was read from.
    pub fn resolve_image(&self, img_path: &str, options: &ParseOptions) -> Option<PathBuf> {
        let path = Path::new(img_path);
        if path.is_absolute() {
            return Some(path.to_path_buf());
        }
        options
            .image_root
            .as_deref()
            .or(self.base_dir.as_deref())
            .map(|root| root.join(path))
    }
}

/// Content list parser.
pub struct ContentListParser {
    data: Vec<u8>,
    base_dir: Option<PathBuf>,
    options: ParseOptions,
}

impl ContentListParser {
    /// Open a content list file.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with_options(path, ParseOptions::default())
    }

    /// Open a content list file with custom options.
    pub fn open_with_options<P: AsRef<Path>>(path: P, options: ParseOptions) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read(path)?;
        Ok(Self {
            data,
            base_dir: path.parent().map(Path::to_path_buf),
            options,
        })
    }

    /// Find and open the content list in an analyzer output directory.
    ///
    /// Looks under `<dir>/<stem>/<method>`, `<dir>/<stem>/vlm`,
    /// `<dir>/<stem>/auto`, `<dir>/<stem>` and `<dir>`, in that order.
    pub fn locate<P: AsRef<Path>>(
        output_dir: P,
        file_stem: &str,
        method: &str,
        options: ParseOptions,
    ) -> Result<Self> {
        let output_dir = output_dir.as_ref();
        let file_name = format!("{}{}", file_stem, CONTENT_LIST_SUFFIX);

        for dir in candidate_dirs(output_dir, file_stem, method) {
            let path = dir.join(&file_name);
            if path.is_file() {
                log::debug!("found content list at {}", path.display());
                return Self::open_with_options(path, options);
            }
        }

        Err(Error::ContentListNotFound(output_dir.join(file_name)))
    }

    /// Parse a content list from bytes.
    pub fn from_bytes(data: &[u8]) -> Self {
        Self::from_bytes_with_options(data, ParseOptions::default())
    }

    /// Parse a content list from bytes with custom options.
    pub fn from_bytes_with_options(data: &[u8], options: ParseOptions) -> Self {
        Self {
            data: data.to_vec(),
            base_dir: None,
            options,
        }
    }

    /// Parse a content list from a reader.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        Self::from_reader_with_options(reader, ParseOptions::default())
    }

    /// Parse a content list from a reader with custom options.
    pub fn from_reader_with_options<R: Read>(mut reader: R, options: ParseOptions) -> Result<Self> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        Ok(Self::from_bytes_with_options(&data, options))
    }

    /// Get the parse options.
    pub fn options(&self) -> &ParseOptions {
        &self.options
    }

    /// Parse the blocks.
    ///
    /// In strict mode any malformed block fails the whole list; in lenient
    /// mode it is logged and skipped. Blocks of an unknown type are kept as
    /// unsupported in both modes and logged.
    pub fn parse(&self) -> Result<ContentList> {
        let values: Vec<serde_json::Value> = serde_json::from_slice(&self.data)?;
        let total = values.len();
        let mut blocks = Vec::with_capacity(total);

        for (i, value) in values.into_iter().enumerate() {
            let kind = block_type(&value).to_string();
            let block: AnalyzerBlock = match serde_json::from_value(value) {
                Ok(block) => block,
                Err(e) if self.options.error_mode == ErrorMode::Lenient => {
                    log::warn!("skipping malformed block {}: {}", i, e);
                    continue;
                }
                Err(e) => return Err(e.into()),
            };
            if block.content == BlockContent::Unsupported {
                log::warn!("ignoring block {} of unsupported type {:?}", i, kind);
            }
            blocks.push(block);
        }

        if blocks.len() < total {
            log::warn!("kept {} of {} blocks", blocks.len(), total);
        }
        Ok(ContentList {
            blocks,
            base_dir: self.base_dir.clone(),
        })
    }
}

/// The `type` field of a raw block, empty when absent.
fn block_type(value: &serde_json::Value) -> &str {
    value
        .get("type")
        .and_then(serde_json::Value::as_str)
        .unwrap_or_default()
}

fn candidate_dirs(output_dir: &Path, file_stem: &str, method: &str) -> Vec<PathBuf> {
    let stem_dir = output_dir.join(file_stem);
    let mut dirs: Vec<PathBuf> = Vec::new();
    let mut add = |dir: PathBuf| {
        if !dirs.contains(&dir) {
            dirs.push(dir);
        }
    };

    if !method.is_empty() {
        add(stem_dir.join(method));
    }
    add(stem_dir.join("vlm"));
    add(stem_dir.join("auto"));
    add(stem_dir);
    add(output_dir.to_path_buf());
    dirs
}
