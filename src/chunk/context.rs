//! Neighboring-text context for figures and tables.
//!
//! A figure or a table on its own embeds poorly: a caption rarely says what
//! the figure is about. Attaching the text around it, in reading order and
//! within a token budget, gives it the context a reader would have.

use super::tokenizer::TokenCounter;
use crate::model::Bbox;

/// Characters that end a sentence when trimming context.
const SENTENCE_ENDS: &[char] = &['.', '。', '！', '？', '!', '?', '；', ';', '：', ':', '\n'];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Before,
    After,
}

/// Attach neighboring text to table and figure records.
///
/// Does nothing unless a budget is non-zero. Records are neither added,
/// removed nor reordered; only the text of tables and figures changes.
pub fn attach(
    bboxes: &mut [Bbox],
    table_budget: usize,
    image_budget: usize,
    counter: &dyn TokenCounter,
) {
    if bboxes.is_empty() || (table_budget == 0 && image_budget == 0) {
        return;
    }

    let order = reading_order(bboxes);
    let mut updates = Vec::new();

    for (slot, &index) in order.iter().enumerate() {
        let bbox = &bboxes[index];
        let budget = if bbox.is_image() {
            image_budget
        } else if bbox.is_table() {
            table_budget
        } else {
            0
        };
        if budget == 0 {
            continue;
        }

        let mut before = gather(
            order[..slot].iter().rev(),
            bboxes,
            budget,
            Direction::Before,
            counter,
        );
        let after = gather(
            order[slot + 1..].iter(),
            bboxes,
            budget,
            Direction::After,
            counter,
        );
        if before.is_empty() && after.is_empty() {
            continue;
        }

        before.reverse();
        let mut parts = before;
        if !bbox.text.is_empty() {
            parts.push(bbox.text.clone());
        }
        parts.extend(after);
        updates.push((index, parts.join("\n")));
    }

    log::debug!("attached context to {} records", updates.len());
    for (index, text) in updates {
        bboxes[index].text = text;
    }
}

/// Indices of `bboxes` in approximate reading order.
///
/// Records with a position are sorted by `(page, top, x0, index)` among the
/// slots positioned records occupy; the others keep their slot.
fn reading_order(bboxes: &[Bbox]) -> Vec<usize> {
    let mut positioned: Vec<((usize, u32, u32), usize)> = bboxes
        .iter()
        .enumerate()
        .filter_map(|(i, b)| b.reading_key().map(|key| (key, i)))
        .collect();
    let slots: Vec<usize> = positioned.iter().map(|&(_, i)| i).collect();
    positioned.sort();

    let mut order: Vec<usize> = (0..bboxes.len()).collect();
    for (slot, (_, index)) in slots.into_iter().zip(positioned) {
        order[slot] = index;
    }
    order
}

/// Collect text from neighbors until the budget is used up.
///
/// The scan stops at the first figure or table.
fn gather<'a>(
    neighbors: impl Iterator<Item = &'a usize>,
    bboxes: &[Bbox],
    budget: usize,
    direction: Direction,
    counter: &dyn TokenCounter,
) -> Vec<String> {
    let mut remaining = budget;
    let mut pieces = Vec::new();

    for &index in neighbors {
        if remaining == 0 {
            break;
        }
        let neighbor = &bboxes[index];
        if !neighbor.is_text() {
            break;
        }
        if neighbor.text.trim().is_empty() {
            continue;
        }

        let tokens = counter.count_tokens(&neighbor.text);
        if tokens == 0 {
            continue;
        }
        if tokens <= remaining {
            pieces.push(neighbor.text.clone());
            remaining -= tokens;
            continue;
        }

        let trimmed = trim_to_tokens(&neighbor.text, remaining, direction, counter);
        if !trimmed.is_empty() {
            pieces.push(trimmed);
        }
        break;
    }
    pieces
}

/// Trim `text` to at most `budget` tokens, keeping the side closest to the
/// record the context is attached to.
fn trim_to_tokens(
    text: &str,
    budget: usize,
    direction: Direction,
    counter: &dyn TokenCounter,
) -> String {
    let mut sentences = split_sentences(text);
    if direction == Direction::Before {
        sentences.reverse();
    }

    let mut kept: Vec<&str> = Vec::new();
    let mut remaining = budget;
    for sentence in sentences {
        let tokens = counter.count_tokens(sentence);
        if tokens <= remaining {
            kept.push(sentence);
            remaining -= tokens;
            continue;
        }
        // Cut inside a sentence only when no whole sentence fits.
        if kept.is_empty() {
            let cut = cut_to_tokens(sentence, remaining, direction, counter);
            if !cut.is_empty() {
                kept.push(cut);
            }
        }
        break;
    }

    if direction == Direction::Before {
        kept.reverse();
    }
    kept.concat().trim().to_string()
}

/// Split after every sentence-ending character, keeping the punctuation.
fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    for (i, c) in text.char_indices() {
        if SENTENCE_ENDS.contains(&c) {
            let end = i + c.len_utf8();
            sentences.push(&text[start..end]);
            start = end;
        }
    }
    if start < text.len() {
        sentences.push(&text[start..]);
    }
    sentences
}

/// Longest prefix (after) or suffix (before) of `text` within `budget`.
fn cut_to_tokens<'a>(
    text: &'a str,
    budget: usize,
    direction: Direction,
    counter: &dyn TokenCounter,
) -> &'a str {
    let bounds: Vec<usize> = text
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()))
        .collect();
    let chars = bounds.len() - 1;

    let piece = |n: usize| match direction {
        Direction::After => &text[..bounds[n]],
        Direction::Before => &text[bounds[chars - n]..],
    };

    // Largest n with count(piece(n)) <= budget
    let (mut lo, mut hi) = (0, chars);
    while lo < hi {
        let mid = (lo + hi + 1) / 2;
        if counter.count_tokens(piece(mid)) <= budget {
            lo = mid;
        } else {
            hi = mid - 1;
        }
    }
    piece(lo)
}
