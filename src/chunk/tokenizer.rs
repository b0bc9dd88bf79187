//! Token counting.

use unicode_segmentation::UnicodeSegmentation;

/// Counts tokens in a piece of text.
///
/// Any `Fn(&str) -> usize` closure works as a counter:
///
/// ```
/// use layoutchunk::TokenCounter;
///
/// let words = |text: &str| text.split_whitespace().count();
/// assert_eq!(words.count_tokens("a b c"), 3);
/// ```
pub trait TokenCounter: Send + Sync {
    /// Count the tokens in `text`.
    fn count_tokens(&self, text: &str) -> usize;
}

impl<F> TokenCounter for F
where
    F: Fn(&str) -> usize + Send + Sync,
{
    fn count_tokens(&self, text: &str) -> usize {
        self(text)
    }
}

/// Heuristic counter approximating a subword tokenizer.
///
/// Text is split on Unicode word boundaries. Every CJK character is one
/// token, other words cost one token per four characters, and each
/// punctuation mark is one token. Whitespace is free.
#[derive(Debug, Clone, Copy, Default)]
pub struct EstimateCounter;

impl TokenCounter for EstimateCounter {
    fn count_tokens(&self, text: &str) -> usize {
        text.split_word_bounds().map(segment_tokens).sum()
    }
}

fn segment_tokens(segment: &str) -> usize {
    if segment.trim().is_empty() {
        return 0;
    }
    let chars = segment.chars().count();
    if segment.chars().any(is_cjk) {
        chars
    } else {
        chars.div_ceil(4)
    }
}

fn is_cjk(c: char) -> bool {
    matches!(c as u32,
        0x3040..=0x30FF     // Hiragana, Katakana
        | 0x3400..=0x4DBF   // CJK Extension A
        | 0x4E00..=0x9FFF   // CJK Unified Ideographs
        | 0xAC00..=0xD7AF   // Hangul syllables
        | 0xF900..=0xFAFF   // CJK Compatibility Ideographs
        | 0x20000..=0x2FA1F // Supplementary ideographs
    )
}
