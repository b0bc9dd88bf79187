//! Chunking options and delimiter configuration.

use std::convert::Infallible;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;

use crate::error::{Error, Result};

/// Default delimiter: newline and CJK sentence punctuation.
pub const DEFAULT_DELIMITER: &str = "\n。；！？";

/// Default token budget per chunk.
pub const DEFAULT_TOKEN_BUDGET: usize = 128;

/// Delimiter configuration.
///
/// Parsed from a string in which backtick-quoted substrings are literal
/// hard-split markers and every other character is a token boundary:
///
/// ```
/// use layoutchunk::Delimiter;
///
/// let delimiter: Delimiter = "\n。`##`".parse().unwrap();
/// assert!(delimiter.is_hard_split());
/// assert_eq!(delimiter.markers(), &["##".to_string()]);
/// assert_eq!(delimiter.boundaries(), &["\n".to_string(), "。".to_string()]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delimiter {
    boundaries: Vec<String>,
    markers: Vec<String>,
}

impl Delimiter {
    /// Create a delimiter from boundary characters only.
    pub fn boundaries_only(chars: &str) -> Self {
        Self {
            boundaries: chars.chars().map(String::from).collect(),
            markers: Vec::new(),
        }
    }

    /// Create a delimiter from literal hard-split markers.
    pub fn hard_split<I, S>(markers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            boundaries: Vec::new(),
            markers: markers
                .into_iter()
                .map(Into::into)
                .filter(|m: &String| !m.is_empty())
                .collect(),
        }
    }

    /// Check if this delimiter selects hard-split mode.
    pub fn is_hard_split(&self) -> bool {
        !self.markers.is_empty()
    }

    /// Get the literal hard-split markers.
    pub fn markers(&self) -> &[String] {
        &self.markers
    }

    /// Get the token-boundary markers.
    pub fn boundaries(&self) -> &[String] {
        &self.boundaries
    }

    /// Build a regex matching any hard-split marker, longest first.
    pub fn marker_regex(&self) -> Option<Regex> {
        alternation(self.markers.iter())
    }

    /// Build a regex matching any marker or boundary, longest first.
    pub fn split_regex(&self) -> Option<Regex> {
        alternation(self.markers.iter().chain(self.boundaries.iter()))
    }
}

fn alternation<'a>(parts: impl Iterator<Item = &'a String>) -> Option<Regex> {
    let mut parts: Vec<&String> = parts.filter(|p| !p.is_empty()).collect();
    parts.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
    parts.dedup();
    if parts.is_empty() {
        return None;
    }

    let pattern = parts
        .iter()
        .map(|p| regex::escape(p))
        .collect::<Vec<_>>()
        .join("|");
    // Escaped literals always form a valid pattern.
    Regex::new(&pattern).ok()
}

fn marker_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"`([^`]+)`").unwrap())
}

impl FromStr for Delimiter {
    type Err = Infallible;

    /// Backticks that do not enclose a non-empty marker are plain
    /// boundary characters, so parsing never fails.
    fn from_str(s: &str) -> std::result::Result<Self, Infallible> {
        let mut boundaries = Vec::new();
        let mut markers = Vec::new();
        let mut start = 0;

        for caps in marker_pattern().captures_iter(s) {
            let (Some(whole), Some(marker)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            boundaries.extend(s[start..whole.start()].chars().map(String::from));
            markers.push(marker.as_str().to_string());
            start = whole.end();
        }
        boundaries.extend(s[start..].chars().map(String::from));

        Ok(Self {
            boundaries,
            markers,
        })
    }
}

impl Default for Delimiter {
    fn default() -> Self {
        Self::boundaries_only(DEFAULT_DELIMITER)
    }
}

/// Options for merging units into chunks.
#[derive(Debug, Clone)]
pub struct ChunkOptions {
    /// Token budget per chunk
    pub token_budget: usize,

    /// Share of a finished chunk carried into the next one (0-100)
    pub overlap_percent: u8,

    /// Boundary markers, or literal markers selecting hard-split mode
    pub delimiter: Delimiter,

    /// Context tokens gathered on each side of a table (0 = disabled)
    pub table_context_budget: usize,

    /// Context tokens gathered on each side of a figure (0 = disabled)
    pub image_context_budget: usize,

    /// Emit exactly one chunk per unit, without merging
    pub per_unit: bool,

    /// Split each chunk again into child records on these markers
    pub child_delimiter: Option<Delimiter>,
}

impl ChunkOptions {
    /// Create new chunk options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the token budget.
    pub fn with_token_budget(mut self, budget: usize) -> Self {
        self.token_budget = budget;
        self
    }

    /// Set the overlap percentage.
    pub fn with_overlap(mut self, percent: u8) -> Self {
        self.overlap_percent = percent;
        self
    }

    /// Set the delimiter.
    pub fn with_delimiter(mut self, delimiter: Delimiter) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Set the table context budget.
    pub fn with_table_context(mut self, budget: usize) -> Self {
        self.table_context_budget = budget;
        self
    }

    /// Set the image context budget.
    pub fn with_image_context(mut self, budget: usize) -> Self {
        self.image_context_budget = budget;
        self
    }

    /// Emit one chunk per unit.
    pub fn per_unit(mut self) -> Self {
        self.per_unit = true;
        self
    }

    /// Set the child delimiter.
    pub fn with_child_delimiter(mut self, delimiter: Delimiter) -> Self {
        self.child_delimiter = Some(delimiter);
        self
    }

    /// Check if context attachment is enabled.
    pub fn attaches_context(&self) -> bool {
        self.table_context_budget > 0 || self.image_context_budget > 0
    }

    /// Token count above which the current chunk is closed.
    pub fn threshold(&self) -> f64 {
        self.token_budget as f64 * f64::from(100 - self.overlap_percent.min(100)) / 100.0
    }

    /// Validate option ranges.
    pub fn validate(&self) -> Result<()> {
        if self.overlap_percent > 100 {
            return Err(Error::InvalidConfig(format!(
                "overlap_percent must be within 0-100, got {}",
                self.overlap_percent
            )));
        }
        Ok(())
    }
}

impl Default for ChunkOptions {
    fn default() -> Self {
        Self {
            token_budget: DEFAULT_TOKEN_BUDGET,
            overlap_percent: 0,
            delimiter: Delimiter::default(),
            table_context_budget: 0,
            image_context_budget: 0,
            per_unit: false,
            child_delimiter: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_options_builder() {
        let options = ChunkOptions::new()
            .with_token_budget(512)
            .with_overlap(20)
            .with_table_context(64)
            .per_unit();

        assert_eq!(options.token_budget, 512);
        assert_eq!(options.overlap_percent, 20);
        assert!(options.attaches_context());
        assert!(options.per_unit);
        assert!((options.threshold() - 409.6).abs() < 1e-9);
    }

    #[test]
    fn test_default_options() {
        let options = ChunkOptions::default();
        assert_eq!(options.token_budget, 128);
        assert!(!options.delimiter.is_hard_split());
        assert!(!options.attaches_context());
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_validate_overlap() {
        let options = ChunkOptions::new().with_overlap(101);
        assert!(matches!(options.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_parse_delimiter_markers() {
        let delimiter: Delimiter = "`---`\n`##`".parse().unwrap();
        assert_eq!(delimiter.markers(), &["---".to_string(), "##".to_string()]);
        assert_eq!(delimiter.boundaries(), &["\n".to_string()]);
    }

    #[test]
    fn test_parse_stray_backticks_as_boundaries() {
        let delimiter: Delimiter = "ab`cd".parse().unwrap();
        assert!(!delimiter.is_hard_split());
        assert_eq!(delimiter.boundaries().len(), 5);
        assert!(delimiter.boundaries().contains(&"`".to_string()));

        let delimiter: Delimiter = "``x`".parse().unwrap();
        assert_eq!(delimiter.markers(), &["x".to_string()]);
        assert_eq!(delimiter.boundaries(), &["`".to_string()]);
    }

    #[test]
    fn test_marker_regex_prefers_longest() {
        let delimiter = Delimiter::hard_split(["#", "###", "#"]);
        let re = delimiter.marker_regex().unwrap();
        let parts: Vec<&str> = re.split("a###b#c").collect();
        assert_eq!(parts, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_split_regex_includes_boundaries() {
        let delimiter: Delimiter = "。`##`".parse().unwrap();
        let re = delimiter.split_regex().unwrap();
        let parts: Vec<&str> = re.split("一。二##三").collect();
        assert_eq!(parts, vec!["一", "二", "三"]);
        assert!(Delimiter::boundaries_only("").split_regex().is_none());
    }
}
