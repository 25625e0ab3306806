//! Visual ordering of mixed-direction text.
//!
//! Levels and runs come from the Unicode bidi algorithm (`unicode-bidi`).
//! Right-to-left runs are handed to the shaper as-is; [`visual_order`] is the
//! character-level rendition used by the built-in face, which mirrors paired
//! punctuation such as brackets inside reversed runs.

use unicode_bidi::{BidiInfo, Level};

use crate::template::Direction;

/// A same-level slice of the input, listed in left-to-right display order.
/// `text` itself stays in logical order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisualRun {
    pub text: String,
    pub rtl: bool,
}

/// Split `text` into directional runs ordered for display under the given
/// paragraph direction.
pub fn visual_runs(text: &str, direction: Direction) -> Vec<VisualRun> {
    if text.is_empty() {
        return Vec::new();
    }
    let base = match direction {
        Direction::Ltr => Level::ltr(),
        Direction::Rtl => Level::rtl(),
    };
    let info = BidiInfo::new(text, Some(base));
    let mut runs = Vec::new();
    for para in &info.paragraphs {
        let (levels, ranges) = info.visual_runs(para, para.range.clone());
        for range in ranges {
            if range.is_empty() {
                continue;
            }
            runs.push(VisualRun {
                rtl: levels[range.start].is_rtl(),
                text: text[range].to_string(),
            });
        }
    }
    runs
}

/// Reorder `text` from logical to visual (left-to-right display) order for
/// the given paragraph direction.
pub fn visual_order(text: &str, direction: Direction) -> String {
    let mut out = String::with_capacity(text.len());
    for run in visual_runs(text, direction) {
        if run.rtl {
            out.extend(run.text.chars().rev().map(mirror));
        } else {
            out.push_str(&run.text);
        }
    }
    out
}

fn mirror(ch: char) -> char {
    unicode_bidi_mirroring::get_mirrored(ch).unwrap_or(ch)
}
