//! Text-On-Path Mapper.
//!
//! Path-anchored subtrees live only at the top level (nesting textPath
//! is undefined and unsupported). Character mid-advance points map to
//! arc-length positions on the path; glyphs reposition along the local
//! tangent frame and optionally warp their outlines when the stretch
//! method is requested.

use kurbo::{BezPath, ParamCurve, ParamCurveArclen, ParamCurveDeriv, PathEl, PathSeg, Point, Vec2};

use crate::layout::result::{CharacterResult, Glyph};
use crate::style::{Direction, TextAnchor, TextPathMethod, TextPathSide};
use crate::tree::IndexedTree;

const ARCLEN_ACCURACY: f64 = 1e-3;

/// Arc-length parameterization of a path.
#[derive(Debug, Clone)]
pub struct PathSampler {
    segs: Vec<PathSeg>,
    /// Cumulative length at the start of each segment.
    cum: Vec<f64>,
    total: f64,
    closed: bool,
}

impl PathSampler {
    /// Build the parameterization; `None` for degenerate paths.
    /// `reversed` flips the direction for `side="right"`.
    pub fn new(path: &BezPath, reversed: bool) -> Option<Self> {
        let mut segs: Vec<PathSeg> = path.segments().collect();
        if segs.is_empty() {
            return None;
        }
        if reversed {
            segs.reverse();
            for seg in &mut segs {
                *seg = seg.reverse();
            }
        }

        let mut cum = Vec::with_capacity(segs.len());
        let mut total = 0.0;
        for seg in &segs {
            cum.push(total);
            total += seg.arclen(ARCLEN_ACCURACY);
        }
        if total <= 0.0 {
            return None;
        }

        let mut subpaths = 0;
        let mut has_close = false;
        for el in path.elements() {
            match el {
                PathEl::MoveTo(_) => subpaths += 1,
                PathEl::ClosePath => has_close = true,
                _ => {}
            }
        }

        Some(PathSampler {
            segs,
            cum,
            total,
            closed: has_close && subpaths == 1,
        })
    }

    pub fn length(&self) -> f64 {
        self.total
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn start_point(&self) -> Point {
        self.segs[0].eval(0.0)
    }

    pub fn end_point(&self) -> Point {
        self.segs[self.segs.len() - 1].eval(1.0)
    }

    /// Point and unit tangent at arc length `s`, clamped to the path.
    pub fn sample(&self, s: f64) -> (Point, Vec2) {
        let s = s.clamp(0.0, self.total);
        let i = self.cum.partition_point(|&c| c <= s).saturating_sub(1);
        let seg = self.segs[i];
        let local = (s - self.cum[i]).max(0.0);
        let t = seg.inv_arclen(local, ARCLEN_ACCURACY);
        let pos = seg.eval(t);
        let tangent = match seg {
            PathSeg::Line(line) => line.p1 - line.p0,
            PathSeg::Quad(quad) => quad.deriv().eval(t).to_vec2(),
            PathSeg::Cubic(cubic) => cubic.deriv().eval(t).to_vec2(),
        };
        let len = tangent.hypot();
        let tangent = if len > 0.0 {
            tangent / len
        } else {
            Vec2::new(1.0, 0.0)
        };
        (pos, tangent)
    }
}

/// Map a character's mid-advance point to an arc-length offset and hide
/// characters whose anchor-relative position falls off the path. Closed
/// paths wrap modulo the length, open paths clamp.
pub fn character_on_path(
    cr: &mut CharacterResult,
    length: f64,
    offset: f64,
    horizontal: bool,
    closed: bool,
) -> f64 {
    let rtl = cr.direction == Direction::Rtl;
    let mut mid = if horizontal {
        cr.final_position.x + cr.advance.x * 0.5 + offset
    } else {
        cr.final_position.y + cr.advance.y * 0.5 + offset
    };

    if closed {
        let anchored_start = (cr.anchor == TextAnchor::Start && !rtl)
            || (cr.anchor == TextAnchor::End && rtl);
        let anchored_end =
            (cr.anchor == TextAnchor::End && !rtl) || (cr.anchor == TextAnchor::Start && rtl);
        if anchored_start {
            if mid - offset < 0.0 || mid - offset > length {
                cr.hidden = true;
            }
        } else if anchored_end {
            if mid - offset < -length || mid - offset > 0.0 {
                cr.hidden = true;
            }
        } else if mid - offset < -(length * 0.5) || mid - offset > length * 0.5 {
            cr.hidden = true;
        }
        if mid < 0.0 {
            mid += length;
        }
        mid %= length;
    } else if mid < 0.0 || mid > length {
        cr.hidden = true;
    }
    mid
}

/// Warp a glyph outline onto the path: every control point maps through
/// the tangent frame at its own inline position.
pub fn stretch_glyph_on_path(
    glyph: &BezPath,
    sampler: &PathSampler,
    horizontal: bool,
    offset: f64,
) -> BezPath {
    let length = sampler.length();
    let closed = sampler.is_closed();

    let warp = |p: Point| -> Point {
        let raw = if horizontal { p.x } else { p.y } + offset;
        let (mid, unbound) = if closed {
            let mut m = raw;
            if m < 0.0 {
                m += length;
            }
            m %= length;
            (m, m)
        } else {
            (raw.clamp(0.0, length), raw)
        };
        let (pos, tangent) = sampler.sample(mid);
        let overhang = mid - unbound;
        if horizontal {
            let normal = Vec2::new(-tangent.y, tangent.x);
            pos - overhang * tangent + p.y * normal
        } else {
            let normal = Vec2::new(tangent.y, -tangent.x);
            pos - overhang * tangent + p.x * normal
        }
    };

    let mut out = BezPath::new();
    for el in glyph.elements() {
        match *el {
            PathEl::MoveTo(p) => out.move_to(warp(p)),
            PathEl::LineTo(p) => out.line_to(warp(p)),
            PathEl::QuadTo(p1, p2) => out.quad_to(warp(p1), warp(p2)),
            PathEl::CurveTo(p1, p2, p3) => out.curve_to(warp(p1), warp(p2), warp(p3)),
            PathEl::ClosePath => out.close_path(),
        }
    }
    out
}

/// Bend the final glyph positions of path-anchored top-level subtrees
/// onto their paths. Later non-path siblings carry the path end point
/// forward as a constant offset until the next anchored chunk.
pub fn apply_text_path(
    tree: &IndexedTree<'_>,
    result: &mut [CharacterResult],
    horizontal: bool,
    start_pos: &mut Point,
) {
    let root_children: Vec<usize> = tree.nodes[0].children.clone();
    let mut in_path = false;
    let mut after_path = false;
    let mut path_end = Point::ZERO;
    let mut carry = Vec2::ZERO;

    for (child_pos, child_id) in root_children.iter().enumerate() {
        let indexed = &tree.nodes[*child_id];
        let range = indexed.range.clone();

        let sampler = indexed
            .node
            .text_path
            .as_ref()
            .and_then(|tp| PathSampler::new(&tp.path, tp.side == TextPathSide::Right));

        if let (Some(tp), Some(sampler)) = (indexed.node.text_path.as_ref(), sampler) {
            in_path = true;
            let length = sampler.length();
            let closed = sampler.is_closed();
            let offset = if tp.start_offset_is_percentage {
                length * 0.01 * tp.start_offset
            } else {
                tp.start_offset
            };
            let stretch = tp.method == TextPathMethod::Stretch;

            if child_pos == 0 {
                *start_pos = sampler.sample(offset).0;
            }

            for i in range.clone() {
                if i >= result.len() || result[i].middle {
                    continue;
                }
                let mid = {
                    let cr = &mut result[i];
                    character_on_path(cr, length, offset, horizontal, closed)
                };
                if result[i].hidden {
                    continue;
                }

                // Stretch warps outlines in document space; the glyph's
                // own transform comes off first and goes back on after,
                // so it is not applied twice.
                if stretch {
                    let tf = result[i].final_transform();
                    if let Glyph::Outline(path) = &result[i].glyph {
                        let warped =
                            stretch_glyph_on_path(&(tf * path.clone()), &sampler, horizontal, offset);
                        result[i].glyph = Glyph::Outline(warped);
                    }
                }

                let (pos, tangent) = sampler.sample(mid);
                let cr = &mut result[i];
                if horizontal {
                    cr.rotate = Some(cr.rotate.unwrap_or(0.0) + tangent.y.atan2(tangent.x));
                    let normal = Vec2::new(-tangent.y, tangent.x);
                    let overhang = cr.advance.x * 0.5;
                    cr.final_position =
                        pos - overhang * tangent + cr.final_position.y * normal;
                } else {
                    cr.rotate = Some(
                        cr.rotate.unwrap_or(0.0) + tangent.y.atan2(tangent.x)
                            - std::f64::consts::FRAC_PI_2,
                    );
                    let normal = Vec2::new(tangent.y, -tangent.x);
                    let overhang = cr.advance.y * 0.5;
                    cr.final_position =
                        pos - overhang * tangent + cr.final_position.x * normal;
                }

                if stretch {
                    let tf = result[i].final_transform();
                    if let Glyph::Outline(path) = &result[i].glyph {
                        result[i].glyph = Glyph::Outline(tf.inverse() * path.clone());
                    }
                }
            }
            path_end = sampler.end_point();
        } else {
            if in_path {
                in_path = false;
                after_path = true;
                let anchor = result
                    .get(range.start)
                    .map(|cr| cr.final_position)
                    .unwrap_or(Point::ZERO);
                carry = path_end - anchor;
            }
            if after_path {
                for i in range.clone() {
                    if i >= result.len() {
                        break;
                    }
                    if result[i].anchored_chunk {
                        after_path = false;
                        break;
                    }
                    result[i].final_position += carry;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line_path() -> BezPath {
        let mut path = BezPath::new();
        path.move_to((0.0, 0.0));
        path.line_to((100.0, 0.0));
        path
    }

    #[test]
    fn sampler_measures_straight_line() {
        let sampler = PathSampler::new(&line_path(), false).unwrap();
        assert!((sampler.length() - 100.0).abs() < 1e-6);
        let (pos, tangent) = sampler.sample(40.0);
        assert!((pos.x - 40.0).abs() < 1e-6);
        assert!(pos.y.abs() < 1e-6);
        assert!((tangent.x - 1.0).abs() < 1e-6);
    }

    #[test]
    fn reversed_sampler_runs_backwards() {
        let sampler = PathSampler::new(&line_path(), true).unwrap();
        let (pos, tangent) = sampler.sample(10.0);
        assert!((pos.x - 90.0).abs() < 1e-6);
        assert!((tangent.x + 1.0).abs() < 1e-6);
    }

    #[test]
    fn open_path_hides_outside_characters() {
        let mut cr = CharacterResult {
            final_position: Point::new(95.0, 0.0),
            advance: Vec2::new(20.0, 0.0),
            ..CharacterResult::default()
        };
        // Mid-advance at 105 is past the end of a 100-long path.
        character_on_path(&mut cr, 100.0, 0.0, true, false);
        assert!(cr.hidden);

        let mut cr2 = CharacterResult {
            final_position: Point::new(10.0, 0.0),
            advance: Vec2::new(20.0, 0.0),
            ..CharacterResult::default()
        };
        character_on_path(&mut cr2, 100.0, 0.0, true, false);
        assert!(!cr2.hidden);
    }

    #[test]
    fn closed_path_wraps_offsets() {
        let mut cr = CharacterResult {
            final_position: Point::new(-30.0, 0.0),
            advance: Vec2::new(20.0, 0.0),
            ..CharacterResult::default()
        };
        let mid = character_on_path(&mut cr, 100.0, 0.0, true, true);
        // -20 wraps to 80 on a closed path.
        assert!((mid - 80.0).abs() < 1e-9);
    }

    #[test]
    fn quarter_circle_tangent_rotates() {
        let mut path = BezPath::new();
        path.move_to((0.0, 0.0));
        // Quarter arc approximated by a cubic, curving down to (50, 50).
        path.curve_to((27.6, 0.0), (50.0, 22.4), (50.0, 50.0));
        let sampler = PathSampler::new(&path, false).unwrap();
        let (_, t_start) = sampler.sample(0.0);
        let (_, t_end) = sampler.sample(sampler.length());
        assert!(t_start.x > 0.9);
        assert!(t_end.y > 0.9);
    }
}
