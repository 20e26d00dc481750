//! Edge routing between two measured node rectangles.

use serde::Serialize;
use tether_core::NodeRect;
use tether_core::geom::{Point, point};

/// Which pair of box edges an edge leaves from and arrives at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnchorPair {
    /// Source right-center to target left-center.
    LeftRight,
    /// Source bottom-center to target top-center, used when the target starts left of the
    /// source's right edge.
    TopBottom,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CubicBezier {
    pub start: Point,
    pub control1: Point,
    pub control2: Point,
    pub end: Point,
}

impl CubicBezier {
    pub fn eval(&self, t: f64) -> Point {
        let u = 1.0 - t;
        let (a, b, c, d) = (u * u * u, 3.0 * u * u * t, 3.0 * u * t * t, t * t * t);
        point(
            a * self.start.x + b * self.control1.x + c * self.control2.x + d * self.end.x,
            a * self.start.y + b * self.control1.y + c * self.control2.y + d * self.end.y,
        )
    }

    /// Polyline approximation with `segments + 1` points, endpoints included.
    pub fn sample(&self, segments: usize) -> Vec<Point> {
        let segments = segments.max(1);
        (0..=segments)
            .map(|i| self.eval(i as f64 / segments as f64))
            .collect()
    }

    /// SVG path data: `M{start} C{control1} {control2} {end}`.
    pub fn path_d(&self) -> String {
        let mut out = String::with_capacity(64);
        self.write_path_d(&mut out);
        out
    }

    pub fn write_path_d(&self, out: &mut String) {
        emit_pair(out, Some('M'), self.start);
        out.push(' ');
        emit_pair(out, Some('C'), self.control1);
        out.push(' ');
        emit_pair(out, None, self.control2);
        out.push(' ');
        emit_pair(out, None, self.end);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EdgeRoute {
    pub anchors: AnchorPair,
    pub path: CubicBezier,
    /// Mean of the two anchors. Badge placement uses this rather than the curve's true midpoint.
    pub midpoint: Point,
}

impl EdgeRoute {
    pub fn start(&self) -> Point {
        self.path.start
    }

    pub fn end(&self) -> Point {
        self.path.end
    }
}

/// Routes an edge from `source` to `target`. Pure; depends on nothing but the two rectangles.
pub fn route(source: &NodeRect, target: &NodeRect) -> EdgeRoute {
    if target.x < source.right() {
        let start = source.bottom_center();
        let end = target.top_center();
        let mid_y = (start.y + end.y) / 2.0;
        return EdgeRoute {
            anchors: AnchorPair::TopBottom,
            path: CubicBezier {
                start,
                control1: point(start.x, mid_y),
                control2: point(end.x, mid_y),
                end,
            },
            midpoint: start.lerp(end, 0.5),
        };
    }

    let start = source.right_center();
    let end = target.left_center();
    let mid_x = (start.x + end.x) / 2.0;
    EdgeRoute {
        anchors: AnchorPair::LeftRight,
        path: CubicBezier {
            start,
            control1: point(mid_x, start.y),
            control2: point(mid_x, end.y),
            end,
        },
        midpoint: start.lerp(end, 0.5),
    }
}

fn emit_pair(out: &mut String, cmd: Option<char>, p: Point) {
    if let Some(cmd) = cmd {
        out.push(cmd);
    }
    fmt_path_into(out, p.x);
    out.push(',');
    fmt_path_into(out, p.y);
}

/// Path coordinates use at most 3 fractional digits, trailing zeros trimmed.
pub(crate) fn fmt_path_into(out: &mut String, v: f64) {
    use std::fmt::Write as _;

    if !v.is_finite() {
        out.push('0');
        return;
    }
    let k = (v * 1000.0).round() as i64;
    if k == 0 {
        out.push('0');
        return;
    }
    if k < 0 {
        out.push('-');
    }
    let abs = k.unsigned_abs();
    let _ = write!(out, "{}", abs / 1000);
    let frac = abs % 1000;
    if frac == 0 {
        return;
    }
    let digits = format!("{frac:03}");
    out.push('.');
    out.push_str(digits.trim_end_matches('0'));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect(id: &str, x: f64, y: f64) -> NodeRect {
        NodeRect::new(id, x, y, 100.0, 40.0)
    }

    #[test]
    fn left_to_right_uses_side_anchors() {
        let r = route(&rect("a", 0.0, 0.0), &rect("b", 300.0, 0.0));
        assert_eq!(r.anchors, AnchorPair::LeftRight);
        assert_eq!(r.start(), point(100.0, 20.0));
        assert_eq!(r.end(), point(300.0, 20.0));
        assert_eq!(r.path.control1, point(200.0, 20.0));
        assert_eq!(r.path.control2, point(200.0, 20.0));
        assert_eq!(r.midpoint, point(200.0, 20.0));
        assert_eq!(r.path.path_d(), "M100,20 C200,20 200,20 300,20");
    }

    #[test]
    fn backward_target_switches_to_vertical_anchors() {
        let r = route(&rect("b", 300.0, 0.0), &rect("a", 0.0, 0.0));
        assert_eq!(r.anchors, AnchorPair::TopBottom);
        assert_eq!(r.start(), point(350.0, 40.0));
        assert_eq!(r.end(), point(50.0, 0.0));
        assert_eq!(r.path.control1, point(350.0, 20.0));
        assert_eq!(r.path.control2, point(50.0, 20.0));
        assert_eq!(r.midpoint, point(200.0, 20.0));
    }

    #[test]
    fn overlapping_columns_count_as_backward() {
        // Target starts inside the source's horizontal span.
        let r = route(&rect("a", 0.0, 0.0), &rect("b", 60.0, 200.0));
        assert_eq!(r.anchors, AnchorPair::TopBottom);
        // Touching edges are not backward.
        let r = route(&rect("a", 0.0, 0.0), &rect("b", 100.0, 200.0));
        assert_eq!(r.anchors, AnchorPair::LeftRight);
    }

    #[test]
    fn forward_route_stays_between_the_boxes() {
        let source = rect("a", 0.0, 0.0);
        let target = NodeRect::new("b", 250.0, 180.0, 80.0, 30.0);
        let r = route(&source, &target);
        for p in r.path.sample(64) {
            assert!(p.x >= source.right() - 1e-9 && p.x <= target.x + 1e-9);
        }
    }

    #[test]
    fn bezier_eval_hits_endpoints() {
        let r = route(&rect("a", 0.0, 0.0), &rect("b", 300.0, 100.0));
        assert_eq!(r.path.eval(0.0), r.start());
        assert_eq!(r.path.eval(1.0), r.end());
        assert_eq!(r.path.sample(4).len(), 5);
    }

    #[test]
    fn path_numbers_are_trimmed() {
        let mut out = String::new();
        for v in [12.5, -0.25, 3.0004, 1.23456, -0.0001] {
            fmt_path_into(&mut out, v);
            out.push(' ');
        }
        assert_eq!(out, "12.5 -0.25 3 1.235 0 ");
    }
}
