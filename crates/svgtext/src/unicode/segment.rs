//! Segmentation adapter: per-character break and justification flags
//! from the Unicode classifiers.
//!
//! The classifier crates report byte offsets; everything here is
//! re-indexed to flattened-text character indices, which is what the
//! rest of the pipeline addresses by.

use unicode_linebreak::{linebreaks, BreakOpportunity};
use unicode_segmentation::UnicodeSegmentation;

use crate::unicode::css::is_word_separator;

/// Line break class for the position after a character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineBreakClass {
    MustBreak,
    AllowBreak,
    #[default]
    NoBreak,
}

/// Per-character segmentation flags for the flattened text.
///
/// All vectors have one entry per `char`; "after" flags describe the
/// boundary between a character and its successor.
#[derive(Debug, Clone, Default)]
pub struct Segmentation {
    pub line: Vec<LineBreakClass>,
    pub word_break_after: Vec<bool>,
    pub grapheme_break_after: Vec<bool>,
    /// (justify-before, justify-after) expansion opportunities.
    pub justify: Vec<(bool, bool)>,
}

/// Forced break characters (BK/CR/LF/NL per UAX-14).
fn is_forced_break(c: char) -> bool {
    matches!(c, '\n' | '\r' | '\u{000B}' | '\u{000C}' | '\u{0085}' | '\u{2028}' | '\u{2029}')
}

/// CJK characters that justify on both sides.
fn is_cjk_justifiable(c: char) -> bool {
    matches!(
        c as u32,
        0x3041..=0x30FF      // kana
        | 0x3400..=0x4DBF    // CJK extension A
        | 0x4E00..=0x9FFF    // CJK unified
        | 0xF900..=0xFAFF    // CJK compatibility
    )
}

/// Run all classifiers over the flattened text.
pub fn segment_text(text: &str) -> Segmentation {
    let n = text.chars().count();
    let mut seg = Segmentation {
        line: vec![LineBreakClass::NoBreak; n],
        word_break_after: vec![false; n],
        grapheme_break_after: vec![false; n],
        justify: vec![(false, false); n],
    };
    if n == 0 {
        return seg;
    }

    // Byte start per char, for mapping classifier offsets back.
    let starts: Vec<usize> = text.char_indices().map(|(b, _)| b).collect();
    let char_ending_at = |offset: usize| -> Option<usize> {
        // The char whose end is `offset` is the one before the first
        // char starting at or after it.
        let idx = starts.partition_point(|&s| s < offset);
        idx.checked_sub(1)
    };

    let last_char = text.chars().next_back().unwrap_or('\0');
    for (offset, opportunity) in linebreaks(text) {
        let Some(i) = char_ending_at(offset) else {
            continue;
        };
        if offset == text.len() {
            // UAX-14 reports the end of text as mandatory; only a real
            // forced break character produces a trailing empty line.
            if opportunity == BreakOpportunity::Mandatory && is_forced_break(last_char) {
                seg.line[i] = LineBreakClass::MustBreak;
            }
            continue;
        }
        seg.line[i] = match opportunity {
            BreakOpportunity::Mandatory => LineBreakClass::MustBreak,
            BreakOpportunity::Allowed => LineBreakClass::AllowBreak,
        };
    }

    for (start, word) in text.split_word_bound_indices() {
        let end = start + word.len();
        if let Some(i) = char_ending_at(end) {
            seg.word_break_after[i] = true;
        }
    }

    for (start, grapheme) in text.grapheme_indices(true) {
        let end = start + grapheme.len();
        if let Some(i) = char_ending_at(end) {
            seg.grapheme_break_after[i] = true;
        }
    }

    for (i, c) in text.chars().enumerate() {
        if is_word_separator(c) {
            seg.justify[i].1 = true;
        } else if is_cjk_justifiable(c) {
            seg.justify[i] = (true, true);
        }
    }

    seg
}

/// Replace forced-break characters with plain spaces in the text handed
/// to bidi/shaping. Bidi treats hard breaks as paragraph separators and
/// stops reordering at them, which is wrong for multi-line SVG text; the
/// break classes were computed before this substitution and keep the
/// real break positions.
pub fn substitute_hard_breaks(text: &str, line: &[LineBreakClass]) -> String {
    text.chars()
        .enumerate()
        .map(|(i, c)| {
            if line.get(i) == Some(&LineBreakClass::MustBreak) && is_forced_break(c) {
                ' '
            } else {
                c
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arrays_align_with_char_count() {
        let text = "a\u{0301}b c";
        let seg = segment_text(text);
        let n = text.chars().count();
        assert_eq!(seg.line.len(), n);
        assert_eq!(seg.word_break_after.len(), n);
        assert_eq!(seg.grapheme_break_after.len(), n);
        assert_eq!(seg.justify.len(), n);
    }

    #[test]
    fn newline_is_must_break() {
        let seg = segment_text("ab\ncd");
        assert_eq!(seg.line[2], LineBreakClass::MustBreak);
    }

    #[test]
    fn end_of_text_is_not_a_hard_break() {
        let seg = segment_text("abc");
        assert_ne!(seg.line[2], LineBreakClass::MustBreak);
    }

    #[test]
    fn trailing_newline_is_a_hard_break() {
        let seg = segment_text("abc\n");
        assert_eq!(seg.line[3], LineBreakClass::MustBreak);
    }

    #[test]
    fn space_allows_break() {
        let seg = segment_text("a b");
        assert_eq!(seg.line[1], LineBreakClass::AllowBreak);
    }

    #[test]
    fn combining_mark_does_not_end_grapheme() {
        // 'a' + COMBINING ACUTE: the boundary is after the mark.
        let seg = segment_text("a\u{0301}b");
        assert!(!seg.grapheme_break_after[0]);
        assert!(seg.grapheme_break_after[1]);
    }

    #[test]
    fn substitution_replaces_only_hard_breaks() {
        let text = "a\nb";
        let seg = segment_text(text);
        let substituted = substitute_hard_breaks(text, &seg.line);
        assert_eq!(substituted, "a b");
        // Classes stay untouched by design; they were computed first.
        assert_eq!(seg.line[1], LineBreakClass::MustBreak);
    }
}
