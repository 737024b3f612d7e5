//! CSS text processing helpers: white-space collapsing, hanging
//! punctuation classes, bidi control characters.

use crate::style::{TextCollapse, UnicodeBidi};

/// Characters that collapse under `white-space-collapse: collapse`.
fn is_collapsible(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n' | '\r')
}

/// Segment break characters that survive `preserve-breaks`.
fn is_segment_break(c: char) -> bool {
    matches!(c, '\n' | '\r' | '\u{000B}' | '\u{000C}' | '\u{0085}' | '\u{2028}' | '\u{2029}')
}

/// Apply white-space collapsing to the flattened text.
///
/// The returned string has the same number of characters as the input so
/// all indices stay stable: collapsed characters are flagged in the
/// returned mask and later marked non-addressable, while kept collapsible
/// characters are transformed to plain spaces where the mode says so.
pub fn collapse_spaces(text: &str, mode: TextCollapse) -> (String, Vec<bool>) {
    let mut out = String::with_capacity(text.len());
    let mut collapsed = vec![false; text.chars().count()];

    match mode {
        TextCollapse::Preserve | TextCollapse::BreakSpaces => {
            out.push_str(text);
        }
        TextCollapse::Collapse => {
            // A leading sequence collapses entirely, later sequences keep
            // their first character as a space.
            let mut prev_spacey = true;
            for (i, c) in text.chars().enumerate() {
                if is_collapsible(c) {
                    if prev_spacey {
                        collapsed[i] = true;
                        out.push(c);
                    } else {
                        out.push(' ');
                    }
                    prev_spacey = true;
                } else {
                    out.push(c);
                    prev_spacey = false;
                }
            }
        }
        TextCollapse::PreserveBreaks => {
            let mut prev_spacey = true;
            for (i, c) in text.chars().enumerate() {
                if is_segment_break(c) {
                    out.push(c);
                    prev_spacey = true;
                } else if is_collapsible(c) {
                    if prev_spacey {
                        collapsed[i] = true;
                        out.push(c);
                    } else {
                        out.push(' ');
                    }
                    prev_spacey = true;
                } else {
                    out.push(c);
                    prev_spacey = false;
                }
            }
        }
    }

    (out, collapsed)
}

/// Whether a soft-wrap opportunity character disappears when it ends up
/// at a line edge.
pub fn collapse_last_space(c: char, mode: TextCollapse) -> bool {
    c == ' ' && matches!(mode, TextCollapse::Collapse | TextCollapse::PreserveBreaks)
}

/// Whether a trailing space hangs instead of collapsing. Returns the
/// hang force flag when the character hangs at all.
pub fn hang_last_space(
    c: char,
    mode: TextCollapse,
    followed_by_forced_break: bool,
) -> Option<bool> {
    if mode == TextCollapse::BreakSpaces && c == ' ' {
        Some(followed_by_forced_break)
    } else {
        None
    }
}

/// Position classes for `hanging-punctuation`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HangClass {
    First,
    Last,
    End,
}

/// Whether the character may hang at the given line edge.
pub fn character_can_hang(c: char, class: HangClass) -> bool {
    match class {
        HangClass::First => matches!(
            c,
            '(' | '[' | '{' | '«' | '\u{2018}' | '\u{201C}' | '\'' | '"' | '\u{FF08}'
                | '\u{300C}' | '\u{300E}' | '\u{3008}' | '\u{300A}'
        ),
        HangClass::Last | HangClass::End => matches!(
            c,
            ',' | '.' | ';' | ':' | '!' | '?' | ')' | ']' | '}' | '»' | '\u{2019}'
                | '\u{201D}' | '\'' | '"' | '\u{3001}' | '\u{3002}' | '\u{FF0C}'
                | '\u{FF0E}' | '\u{FF09}' | '\u{300D}' | '\u{300F}' | '\u{3009}'
                | '\u{300B}'
        ),
    }
}

/// Word separators per CSS Text, the characters `word-spacing` applies to.
pub fn is_word_separator(c: char) -> bool {
    matches!(
        c as u32,
        0x0020 | 0x00A0 | 0x1361 | 0x010100 | 0x010101 | 0x01039F | 0x01091F
    )
}

/// Unicode bidi control characters (embeddings, overrides, isolates).
pub fn is_bidi_control(c: char) -> bool {
    matches!(c, '\u{202A}'..='\u{202E}' | '\u{2066}'..='\u{2069}')
}

/// Control characters opening a directional span for a `unicode-bidi`
/// value, inserted by the collector before the span's text.
pub fn bidi_opening(ltr: bool, bidi: UnicodeBidi) -> &'static str {
    match bidi {
        UnicodeBidi::Normal => "",
        UnicodeBidi::Embed => {
            if ltr {
                "\u{202A}"
            } else {
                "\u{202B}"
            }
        }
        UnicodeBidi::BidiOverride => {
            if ltr {
                "\u{202D}"
            } else {
                "\u{202E}"
            }
        }
        UnicodeBidi::Isolate => {
            if ltr {
                "\u{2066}"
            } else {
                "\u{2067}"
            }
        }
        UnicodeBidi::IsolateOverride => {
            if ltr {
                "\u{2068}\u{202D}"
            } else {
                "\u{2068}\u{202E}"
            }
        }
        UnicodeBidi::Plaintext => "\u{2068}",
    }
}

/// Matching closing controls, inserted after the span's text.
pub fn bidi_closing(bidi: UnicodeBidi) -> &'static str {
    match bidi {
        UnicodeBidi::Normal => "",
        UnicodeBidi::Embed | UnicodeBidi::BidiOverride => "\u{202C}",
        UnicodeBidi::Isolate | UnicodeBidi::Plaintext => "\u{2069}",
        UnicodeBidi::IsolateOverride => "\u{202C}\u{2069}",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapse_keeps_char_count() {
        let text = "a  b\n c";
        let (out, collapsed) = collapse_spaces(text, TextCollapse::Collapse);
        assert_eq!(out.chars().count(), text.chars().count());
        assert_eq!(collapsed.len(), text.chars().count());
    }

    #[test]
    fn collapse_flags_runs_and_leading_space() {
        let (out, collapsed) = collapse_spaces("  a  b", TextCollapse::Collapse);
        assert_eq!(collapsed, vec![true, true, false, false, true, false]);
        // The kept space of the interior run is a plain space.
        assert_eq!(out.chars().nth(3), Some(' '));
    }

    #[test]
    fn preserve_breaks_keeps_newlines() {
        let (out, collapsed) = collapse_spaces("a \n b", TextCollapse::PreserveBreaks);
        assert_eq!(out.chars().nth(2), Some('\n'));
        assert!(!collapsed[2]);
        // The space after the break collapses.
        assert!(collapsed[3]);
    }

    #[test]
    fn preserve_collapses_nothing() {
        let (_, collapsed) = collapse_spaces("a    b", TextCollapse::Preserve);
        assert!(collapsed.iter().all(|c| !c));
    }

    #[test]
    fn bidi_controls_roundtrip() {
        for bidi in [
            UnicodeBidi::Embed,
            UnicodeBidi::Isolate,
            UnicodeBidi::BidiOverride,
            UnicodeBidi::IsolateOverride,
            UnicodeBidi::Plaintext,
        ] {
            let opening = bidi_opening(true, bidi);
            let closing = bidi_closing(bidi);
            assert!(!opening.is_empty());
            assert!(!closing.is_empty());
            assert!(opening.chars().all(is_bidi_control));
            assert!(closing.chars().all(is_bidi_control));
        }
        assert_eq!(bidi_opening(false, UnicodeBidi::Normal), "");
    }

    #[test]
    fn hang_classes() {
        assert!(character_can_hang('(', HangClass::First));
        assert!(character_can_hang('.', HangClass::End));
        assert!(!character_can_hang('a', HangClass::End));
    }
}
