//! Line Breaker and Shape Flow.
//!
//! Both algorithms share one state machine: accumulate characters in
//! visual order into words delimited by soft break opportunities, commit
//! a line when the next word would not fit (or unconditionally at a hard
//! break). Simple wrapping measures against a single inline size; shape
//! flow derives per-line segments by intersecting the candidate line
//! strip with the provided region polygons.

use kurbo::{BezPath, PathEl, Point, Vec2};

use crate::layout::metrics::line_height_contribution;
use crate::layout::result::{BreakType, CharacterResult, LineEdge};

/// A contiguous index run within one line belonging to one region
/// segment (simple wrapping produces one chunk per line).
#[derive(Debug, Clone, Default)]
pub struct LineChunk {
    pub indices: Vec<usize>,
}

/// One laid-out line.
#[derive(Debug, Clone, Default)]
pub struct LineBox {
    pub chunks: Vec<LineChunk>,
    /// Vector from the line's baseline to its top edge.
    pub baseline_top: Vec2,
    /// Vector from the line's baseline to its bottom edge.
    pub baseline_bottom: Vec2,
}

impl LineBox {
    fn from_indices(indices: Vec<usize>, ascent: f64, descent: f64, horizontal: bool) -> Self {
        let (baseline_top, baseline_bottom) = if horizontal {
            (Vec2::new(0.0, -ascent), Vec2::new(0.0, descent))
        } else {
            (Vec2::new(ascent, 0.0), Vec2::new(-descent, 0.0))
        };
        LineBox {
            chunks: vec![LineChunk { indices }],
            baseline_top,
            baseline_bottom,
        }
    }
}

/// Parameters shared by both line breaking algorithms.
#[derive(Debug, Clone)]
pub struct LineParams {
    pub horizontal: bool,
    /// Block-axis direction sign; -1 for vertical-rl columns.
    pub block_sign: f64,
    /// Available inline size; `None` wraps nothing.
    pub inline_size: Option<f64>,
    pub start_pos: Point,
}

/// A word: an uncommitted run between soft break opportunities.
#[derive(Debug, Default)]
struct Word {
    indices: Vec<usize>,
    width: f64,
}

fn line_metrics(result: &[CharacterResult], indices: &[usize], horizontal: bool) -> (f64, f64) {
    let mut ascent: f64 = 0.0;
    let mut descent: f64 = 0.0;
    for &i in indices {
        let (a, d) = line_height_contribution(&result[i], horizontal);
        ascent = ascent.max(a);
        descent = descent.max(d);
    }
    (ascent, descent)
}

/// Width a word adds for the fit check: trailing characters that would
/// collapse or hang at the line edge do not count (force-hung included;
/// only characters that stay inside the box count).
fn fit_width(result: &[CharacterResult], word: &Word, horizontal: bool) -> f64 {
    let mut width = word.width;
    for &i in word.indices.iter().rev() {
        match result[i].line_end {
            LineEdge::Collapse | LineEdge::ConditionallyHang | LineEdge::ForceHang => {
                width -= result[i].inline_advance(horizontal).abs();
            }
            LineEdge::NoChange => break,
        }
    }
    width
}

/// Hide trailing edge characters of a committed line that collapse.
fn collapse_line_edges(result: &mut [CharacterResult], indices: &[usize], strip_start: bool) {
    for &i in indices.iter().rev() {
        if result[i].line_end == LineEdge::Collapse {
            result[i].hidden = true;
        } else {
            break;
        }
    }
    if strip_start {
        for &i in indices {
            if result[i].line_start == LineEdge::Collapse {
                result[i].hidden = true;
            } else {
                break;
            }
        }
    }
}

/// Position one committed line's characters and return its box.
fn commit_line(
    result: &mut [CharacterResult],
    indices: Vec<usize>,
    params: &LineParams,
    block_cursor: &mut f64,
    first_line: bool,
) -> LineBox {
    collapse_line_edges(result, &indices, !first_line);

    let (ascent, descent) = line_metrics(result, &indices, params.horizontal);
    if !first_line {
        *block_cursor += params.block_sign * ascent;
    }
    let baseline = *block_cursor;
    *block_cursor += params.block_sign * descent;

    let mut inline_cursor = if params.horizontal {
        params.start_pos.x
    } else {
        params.start_pos.y
    };
    for &i in &indices {
        let base = if params.horizontal {
            Point::new(inline_cursor, baseline)
        } else {
            Point::new(baseline, inline_cursor)
        };
        let cr = &mut result[i];
        cr.css_position = base + cr.baseline_offset;
        cr.final_position = cr.css_position;
        if !cr.hidden {
            inline_cursor += cr.inline_advance(params.horizontal);
        }
    }

    LineBox::from_indices(indices, ascent, descent, params.horizontal)
}

/// Mid-cluster characters take their geometry from the cluster leader.
pub fn fixup_middles(result: &mut [CharacterResult]) {
    let mut leader: Option<usize> = None;
    for i in 0..result.len() {
        if !result[i].addressable {
            continue;
        }
        if result[i].middle {
            if let Some(l) = leader {
                result[i].css_position = result[l].css_position + result[l].advance;
                result[i].final_position = result[i].css_position;
            }
        } else {
            leader = Some(i);
        }
    }
}

/// Simple wrapping over a single inline size.
///
/// `visual_order` lists the addressable cluster leaders (and the
/// trailing dummy, if any) sorted by shaped visual index.
pub fn break_lines(
    result: &mut [CharacterResult],
    visual_order: &[usize],
    params: &LineParams,
) -> Vec<LineBox> {
    let avail = params.inline_size.unwrap_or(f64::INFINITY);
    let mut lines = Vec::new();
    let mut block_cursor = if params.horizontal {
        params.start_pos.y
    } else {
        params.start_pos.x
    };

    let mut current: Vec<usize> = Vec::new();
    let mut current_width = 0.0;
    let mut word = Word::default();

    let mut flush_word =
        |result: &mut [CharacterResult],
         word: &mut Word,
         current: &mut Vec<usize>,
         current_width: &mut f64,
         lines: &mut Vec<LineBox>,
         block_cursor: &mut f64| {
            if word.indices.is_empty() {
                return;
            }
            let fits = *current_width + fit_width(result, word, params.horizontal) <= avail;
            if !fits && !current.is_empty() {
                let committed = std::mem::take(current);
                lines.push(commit_line(
                    result,
                    committed,
                    params,
                    block_cursor,
                    lines.is_empty(),
                ));
                *current_width = 0.0;
            }
            current.append(&mut word.indices);
            *current_width += word.width;
            word.width = 0.0;
        };

    for &i in visual_order {
        if !result[i].addressable {
            continue;
        }
        word.indices.push(i);
        word.width += result[i].inline_advance(params.horizontal).abs();

        match result[i].break_type {
            BreakType::HardBreak => {
                flush_word(
                    result,
                    &mut word,
                    &mut current,
                    &mut current_width,
                    &mut lines,
                    &mut block_cursor,
                );
                let committed = std::mem::take(&mut current);
                lines.push(commit_line(
                    result,
                    committed,
                    params,
                    &mut block_cursor,
                    lines.is_empty(),
                ));
                current_width = 0.0;
            }
            BreakType::SoftBreak => {
                flush_word(
                    result,
                    &mut word,
                    &mut current,
                    &mut current_width,
                    &mut lines,
                    &mut block_cursor,
                );
            }
            BreakType::NoBreak => {}
        }
    }
    flush_word(
        result,
        &mut word,
        &mut current,
        &mut current_width,
        &mut lines,
        &mut block_cursor,
    );
    if !current.is_empty() {
        let committed = std::mem::take(&mut current);
        lines.push(commit_line(
            result,
            committed,
            params,
            &mut block_cursor,
            lines.is_empty(),
        ));
    }

    fixup_middles(result);
    lines
}

// ---------------------------------------------------------------------------
// Shape flow
// ---------------------------------------------------------------------------

/// Sorted, disjoint x-intervals.
type Intervals = Vec<(f64, f64)>;

/// Even-odd crossings of the horizontal line `y` with a flattened path.
fn scanline_intervals(path: &BezPath, y: f64) -> Intervals {
    let mut crossings: Vec<f64> = Vec::new();
    let mut start = Point::ZERO;
    let mut prev = Point::ZERO;
    let mut segment = |p0: Point, p1: Point| {
        if (p0.y <= y) != (p1.y <= y) {
            let t = (y - p0.y) / (p1.y - p0.y);
            crossings.push(p0.x + t * (p1.x - p0.x));
        }
    };
    kurbo::flatten(path.elements().iter().copied(), 0.25, |el| match el {
        PathEl::MoveTo(p) => {
            start = p;
            prev = p;
        }
        PathEl::LineTo(p) => {
            segment(prev, p);
            prev = p;
        }
        PathEl::ClosePath => {
            segment(prev, start);
            prev = start;
        }
        // flatten only emits the three element kinds above.
        _ => {}
    });
    crossings.sort_by(|a, b| a.total_cmp(b));
    crossings
        .chunks_exact(2)
        .map(|pair| (pair[0], pair[1]))
        .collect()
}

fn intersect_intervals(a: &Intervals, b: &Intervals) -> Intervals {
    let mut out = Vec::new();
    for &(a0, a1) in a {
        for &(b0, b1) in b {
            let lo = a0.max(b0);
            let hi = a1.min(b1);
            if lo < hi {
                out.push((lo, hi));
            }
        }
    }
    out
}

fn subtract_intervals(a: &Intervals, b: &Intervals) -> Intervals {
    let mut out = Vec::new();
    for &(mut a0, a1) in a {
        let mut dead = false;
        for &(b0, b1) in b {
            if b1 <= a0 || b0 >= a1 {
                continue;
            }
            if b0 > a0 {
                out.push((a0, b0));
            }
            a0 = a0.max(b1);
            if a0 >= a1 {
                dead = true;
                break;
            }
        }
        if !dead {
            out.push((a0, a1));
        }
    }
    out.retain(|(lo, hi)| hi > lo);
    out.sort_by(|x, y| x.0.total_cmp(&y.0));
    out
}

/// Usable x-intervals for a line strip `[top, bottom]`: inside some
/// region over the strip's whole height, minus the subtracted regions.
fn strip_intervals(shapes: &[BezPath], subtract: &[BezPath], top: f64, bottom: f64) -> Intervals {
    let mut available: Intervals = Vec::new();
    for shape in shapes {
        let strip = intersect_intervals(
            &scanline_intervals(shape, top),
            &scanline_intervals(shape, bottom),
        );
        available.extend(strip);
    }
    available.sort_by(|a, b| a.0.total_cmp(&b.0));
    for cut in subtract {
        let mut blocked = scanline_intervals(cut, top);
        blocked.extend(scanline_intervals(cut, bottom));
        blocked.sort_by(|a, b| a.0.total_cmp(&b.0));
        available = subtract_intervals(&available, &blocked);
    }
    available
}

/// Flow the text into the given regions instead of wrapping against a
/// single inline size. Only the horizontal flow is defined; regions are
/// polygons in the same coordinate space as the text.
pub fn flow_text_in_shapes(
    result: &mut [CharacterResult],
    visual_order: &[usize],
    shapes: &[BezPath],
    subtract: &[BezPath],
    params: &LineParams,
) -> Vec<LineBox> {
    use kurbo::Shape;

    let mut bbox = kurbo::Rect::ZERO;
    for (i, shape) in shapes.iter().enumerate() {
        let b = shape.bounding_box();
        bbox = if i == 0 { b } else { bbox.union(b) };
    }

    // Gather words first; the flow fills them into strip segments.
    let mut words: Vec<(Word, BreakType)> = Vec::new();
    let mut word = Word::default();
    for &i in visual_order {
        if !result[i].addressable {
            continue;
        }
        word.indices.push(i);
        word.width += result[i].inline_advance(params.horizontal).abs();
        match result[i].break_type {
            BreakType::HardBreak => {
                words.push((std::mem::take(&mut word), BreakType::HardBreak));
            }
            BreakType::SoftBreak => {
                words.push((std::mem::take(&mut word), BreakType::SoftBreak));
            }
            BreakType::NoBreak => {}
        }
    }
    if !word.indices.is_empty() {
        words.push((std::mem::take(&mut word), BreakType::NoBreak));
    }

    let mut lines = Vec::new();
    let mut y = bbox.y0;
    let mut w = 0;
    while w < words.len() {
        // Line height estimated from the next pending word.
        let (ascent, descent) = line_metrics(result, &words[w].0.indices, params.horizontal);
        let height = (ascent + descent).max(1e-6);
        let mut segments = strip_intervals(shapes, subtract, y, y + height);
        // Sunken geometry can leave no room; step down and retry until
        // the regions are exhausted.
        while segments.is_empty() && y < bbox.y1 {
            y += height;
            segments = strip_intervals(shapes, subtract, y, y + height);
        }
        if segments.is_empty() {
            // Out of regions: overflow everything left on one line.
            segments.push((bbox.x0, f64::INFINITY));
        }

        let baseline = y + ascent;
        let mut chunks: Vec<LineChunk> = Vec::new();
        let mut committed_any = false;
        'segments: for (seg_start, seg_end) in segments {
            let mut inline_cursor = seg_start;
            let mut chunk = LineChunk::default();
            while w < words.len() {
                let (ref pending, brk) = words[w];
                let fits = inline_cursor + fit_width(result, pending, params.horizontal)
                    <= seg_end;
                if !fits && !chunk.indices.is_empty() {
                    break;
                }
                if !fits && chunk.indices.is_empty() && pending.width <= seg_end - seg_start {
                    break;
                }
                for &i in &pending.indices {
                    let cr = &mut result[i];
                    cr.css_position =
                        Point::new(inline_cursor, baseline) + cr.baseline_offset;
                    cr.final_position = cr.css_position;
                    if !cr.hidden {
                        inline_cursor += cr.inline_advance(params.horizontal);
                    }
                    chunk.indices.push(i);
                }
                w += 1;
                committed_any = true;
                if brk == BreakType::HardBreak {
                    if !chunk.indices.is_empty() {
                        collapse_line_edges(result, &chunk.indices, !lines.is_empty());
                        chunks.push(std::mem::take(&mut chunk));
                    }
                    break 'segments;
                }
            }
            if !chunk.indices.is_empty() {
                collapse_line_edges(result, &chunk.indices, !lines.is_empty());
                chunks.push(chunk);
            }
            if w >= words.len() {
                break;
            }
        }

        if committed_any {
            let (baseline_top, baseline_bottom) = (
                Vec2::new(0.0, -ascent),
                Vec2::new(0.0, descent),
            );
            lines.push(LineBox {
                chunks,
                baseline_top,
                baseline_bottom,
            });
        }
        y += height;
    }

    fixup_middles(result);
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::font::FontMetrics;

    fn ch(advance: f64, break_type: BreakType) -> CharacterResult {
        CharacterResult {
            advance: Vec2::new(advance, 0.0),
            break_type,
            visual_index: Some(0),
            metrics: FontMetrics {
                ascent: 8.0,
                descent: 2.0,
                ..FontMetrics::empty()
            },
            ..CharacterResult::default()
        }
    }

    fn params(inline_size: Option<f64>) -> LineParams {
        LineParams {
            horizontal: true,
            block_sign: 1.0,
            inline_size,
            start_pos: Point::ZERO,
        }
    }

    #[test]
    fn no_wrap_single_line_positions_accumulate() {
        let mut result = vec![ch(5.0, BreakType::NoBreak), ch(7.0, BreakType::NoBreak)];
        let lines = break_lines(&mut result, &[0, 1], &params(None));
        assert_eq!(lines.len(), 1);
        assert_eq!(result[0].css_position.x, 0.0);
        assert_eq!(result[1].css_position.x, 5.0);
        assert_eq!(lines[0].baseline_top, Vec2::new(0.0, -8.0));
    }

    #[test]
    fn hard_break_commits_unconditionally() {
        let mut result = vec![
            ch(5.0, BreakType::NoBreak),
            ch(5.0, BreakType::HardBreak),
            ch(5.0, BreakType::NoBreak),
        ];
        let lines = break_lines(&mut result, &[0, 1, 2], &params(None));
        assert_eq!(lines.len(), 2);
        // Second line baseline drops by descent + ascent.
        assert_eq!(result[2].css_position.y, 10.0);
        assert_eq!(result[2].css_position.x, 0.0);
    }

    #[test]
    fn soft_break_wraps_when_width_exceeded() {
        // "aa bb": five chars, the space allows a break and collapses at
        // the line edge.
        let mut result = vec![
            ch(4.0, BreakType::NoBreak),
            ch(4.0, BreakType::NoBreak),
            ch(4.0, BreakType::SoftBreak),
            ch(4.0, BreakType::NoBreak),
            ch(4.0, BreakType::NoBreak),
        ];
        result[2].line_end = LineEdge::Collapse;
        let lines = break_lines(&mut result, &[0, 1, 2, 3, 4], &params(Some(13.0)));
        assert_eq!(lines.len(), 2);
        assert!(result[2].hidden);
        assert_eq!(result[3].css_position.y, 10.0);
        assert_eq!(result[3].css_position.x, 0.0);
    }

    #[test]
    fn force_hang_does_not_count_toward_width() {
        let mut result = vec![
            ch(6.0, BreakType::NoBreak),
            ch(6.0, BreakType::SoftBreak),
            ch(6.0, BreakType::NoBreak),
        ];
        result[1].line_end = LineEdge::ForceHang;
        // 6 + 6 > 10, but the hanging char does not count.
        let lines = break_lines(&mut result, &[0, 1, 2], &params(Some(10.0)));
        assert_eq!(lines.len(), 2);
        assert!(!result[1].hidden);
    }

    #[test]
    fn trailing_empty_line_from_dummy() {
        let mut result = vec![ch(5.0, BreakType::HardBreak), ch(0.0, BreakType::NoBreak)];
        let lines = break_lines(&mut result, &[0, 1], &params(None));
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1].chunks[0].indices, vec![1]);
    }

    #[test]
    fn scanline_on_rectangle() {
        let mut path = BezPath::new();
        path.move_to((0.0, 0.0));
        path.line_to((100.0, 0.0));
        path.line_to((100.0, 50.0));
        path.line_to((0.0, 50.0));
        path.close_path();
        let ivals = scanline_intervals(&path, 25.0);
        assert_eq!(ivals.len(), 1);
        assert!((ivals[0].0 - 0.0).abs() < 1e-6);
        assert!((ivals[0].1 - 100.0).abs() < 1e-6);
        assert!(scanline_intervals(&path, 60.0).is_empty());
    }

    #[test]
    fn interval_subtraction() {
        let a = vec![(0.0, 10.0)];
        let b = vec![(4.0, 6.0)];
        assert_eq!(subtract_intervals(&a, &b), vec![(0.0, 4.0), (6.0, 10.0)]);
    }

    #[test]
    fn flow_places_text_inside_rectangle() {
        let mut shape = BezPath::new();
        shape.move_to((10.0, 0.0));
        shape.line_to((40.0, 0.0));
        shape.line_to((40.0, 100.0));
        shape.line_to((10.0, 100.0));
        shape.close_path();

        // Two words of width 12 each; the region is 30 wide so both fit
        // on the first strip.
        let mut result = vec![
            ch(6.0, BreakType::NoBreak),
            ch(6.0, BreakType::SoftBreak),
            ch(6.0, BreakType::NoBreak),
            ch(6.0, BreakType::NoBreak),
        ];
        let lines = flow_text_in_shapes(
            &mut result,
            &[0, 1, 2, 3],
            &[shape],
            &[],
            &params(None),
        );
        assert_eq!(lines.len(), 1);
        assert!(result[0].css_position.x >= 10.0);
        assert!(result[3].css_position.x + 6.0 <= 40.0 + 1e-6);
        // Baseline sits one ascent below the region top.
        assert_eq!(result[0].css_position.y, 8.0);
    }

    #[test]
    fn flow_wraps_into_second_strip_when_narrow() {
        let mut shape = BezPath::new();
        shape.move_to((0.0, 0.0));
        shape.line_to((13.0, 0.0));
        shape.line_to((13.0, 100.0));
        shape.line_to((0.0, 100.0));
        shape.close_path();

        let mut result = vec![
            ch(6.0, BreakType::NoBreak),
            ch(6.0, BreakType::SoftBreak),
            ch(6.0, BreakType::NoBreak),
            ch(6.0, BreakType::NoBreak),
        ];
        result[1].line_end = LineEdge::Collapse;
        let lines = flow_text_in_shapes(
            &mut result,
            &[0, 1, 2, 3],
            &[shape],
            &[],
            &params(None),
        );
        assert_eq!(lines.len(), 2);
        assert!(result[2].css_position.y > result[0].css_position.y);
    }
}
