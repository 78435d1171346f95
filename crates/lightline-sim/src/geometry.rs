//! Trail segment construction and point containment.
//!
//! A segment is a quad stored as 8 numbers in point order `[H1, H2, L2, L1]`:
//! `H` is the high side (left-hand normal of the travel direction), `L` the
//! low side, `1` the trailing centreline point and `2` the leading one. The
//! trailing edge is `[H1, L1]`, the leading edge `[H2, L2]`.

use serde::{Deserialize, Serialize};

pub type Point = [f32; 2];

/// Unit left-hand normal of the direction `from -> to`.
fn normal(from: Point, to: Point) -> Point {
    let dx = to[0] - from[0];
    let dy = to[1] - from[1];
    let len = (dx * dx + dy * dy).sqrt();
    if len < 1e-6 {
        return [1.0, 0.0];
    }
    [-dy / len, dx / len]
}

fn offset(p: Point, n: Point, half: f32) -> (Point, Point) {
    (
        [p[0] + n[0] * half, p[1] + n[1] * half],
        [p[0] - n[0] * half, p[1] - n[1] * half],
    )
}

/// Fresh quad between two centreline points with a thickness at each end.
pub fn build_start_segment(p1: Point, p2: Point, thickness1: f32, thickness2: f32) -> [f32; 8] {
    let n = normal(p1, p2);
    let (h1, l1) = offset(p1, n, thickness1 * 0.5);
    let (h2, l2) = offset(p2, n, thickness2 * 0.5);
    [h1[0], h1[1], h2[0], h2[1], l2[0], l2[1], l1[0], l1[1]]
}

/// Quad that continues a strip: its trailing edge is `previous_end`
/// (`[Hx, Hy, Lx, Ly]` of the previous quad's leading edge).
pub fn build_continuation_segment(
    point: Point,
    thickness: f32,
    previous_end: [f32; 4],
    last_point: Point,
) -> [f32; 8] {
    let n = normal(last_point, point);
    let (h2, l2) = offset(point, n, thickness * 0.5);
    [
        previous_end[0],
        previous_end[1],
        h2[0],
        h2[1],
        l2[0],
        l2[1],
        previous_end[2],
        previous_end[3],
    ]
}

/// Leading edge `[H2x, H2y, L2x, L2y]` of a segment.
pub fn segment_end(vertices: &[f32; 8]) -> [f32; 4] {
    [vertices[2], vertices[3], vertices[4], vertices[5]]
}

/// Even-odd ray cast over a flat `[x0, y0, x1, y1, ...]` ring.
pub fn point_in_polygon(points: &[f32], x: f32, y: f32) -> bool {
    let n = points.len() / 2;
    if n < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let (xi, yi) = (points[i * 2], points[i * 2 + 1]);
        let (xj, yj) = (points[j * 2], points[j * 2 + 1]);
        if (yi > y) != (yj > y) && x < (xj - xi) * (y - yi) / (yj - yi) + xi {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// Containment test for a strip stored as consecutive cross edges
/// `[hx, hy, lx, ly, ...]`. Each pair of neighbouring edges closes one quad.
pub fn point_in_strip(edges: &[f32], x: f32, y: f32) -> bool {
    let count = edges.len() / 4;
    for i in 1..count {
        let a = &edges[(i - 1) * 4..i * 4];
        let b = &edges[i * 4..(i + 1) * 4];
        let quad = [a[0], a[1], b[0], b[1], b[2], b[3], a[2], a[3]];
        if point_in_polygon(&quad, x, y) {
            return true;
        }
    }
    false
}

/// Axis-aligned box that starts empty and grows to fit points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_x: f32,
    pub min_y: f32,
    pub max_x: f32,
    pub max_y: f32,
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self::empty()
    }
}

impl BoundingBox {
    pub fn empty() -> Self {
        Self {
            min_x: f32::INFINITY,
            min_y: f32::INFINITY,
            max_x: f32::NEG_INFINITY,
            max_y: f32::NEG_INFINITY,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.min_x > self.max_x || self.min_y > self.max_y
    }

    pub fn extend(&mut self, x: f32, y: f32) {
        self.min_x = self.min_x.min(x);
        self.min_y = self.min_y.min(y);
        self.max_x = self.max_x.max(x);
        self.max_y = self.max_y.max(y);
    }

    /// Grow to fit every point of a flat coordinate list.
    pub fn extend_flat(&mut self, points: &[f32]) {
        for p in points.chunks_exact(2) {
            self.extend(p[0], p[1]);
        }
    }

    pub fn contains(&self, x: f32, y: f32) -> bool {
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-5;

    // ================================================================
    // Segment construction
    // ================================================================

    #[test]
    fn start_segment_point_order() {
        // Travelling +x: the left-hand normal (-dy, dx) is +y.
        let v = build_start_segment([0.0, 0.0], [10.0, 0.0], 4.0, 4.0);
        assert_eq!(v, [0.0, 2.0, 10.0, 2.0, 10.0, -2.0, 0.0, -2.0]);
    }

    #[test]
    fn start_segment_tapers_with_thickness() {
        let v = build_start_segment([0.0, 0.0], [0.0, 10.0], 2.0, 6.0);
        // Travelling +y: high side is -x.
        assert!((v[0] + 1.0).abs() < EPS);
        assert!((v[2] + 3.0).abs() < EPS);
        assert!((v[4] - 3.0).abs() < EPS);
        assert!((v[6] - 1.0).abs() < EPS);
    }

    #[test]
    fn degenerate_segment_stays_finite() {
        let v = build_start_segment([5.0, 5.0], [5.0, 5.0], 4.0, 4.0);
        assert!(v.iter().all(|c| c.is_finite()));
    }

    #[test]
    fn continuation_reuses_previous_end() {
        let first = build_start_segment([0.0, 0.0], [10.0, 0.0], 4.0, 4.0);
        let end = segment_end(&first);
        let next = build_continuation_segment([20.0, 1.0], 4.0, end, [10.0, 0.0]);
        assert_eq!([next[0], next[1], next[6], next[7]], end);
    }

    // ================================================================
    // Containment
    // ================================================================

    #[test]
    fn polygon_contains_centre_not_outside() {
        let square = [0.0, 0.0, 10.0, 0.0, 10.0, 10.0, 0.0, 10.0];
        assert!(point_in_polygon(&square, 5.0, 5.0));
        assert!(!point_in_polygon(&square, 15.0, 5.0));
        assert!(!point_in_polygon(&square, 5.0, -0.1));
    }

    #[test]
    fn polygon_needs_three_points() {
        assert!(!point_in_polygon(&[0.0, 0.0, 1.0, 1.0], 0.5, 0.5));
    }

    #[test]
    fn concave_polygon() {
        // U shape open at the top.
        let u = [
            0.0, 0.0, 9.0, 0.0, 9.0, 9.0, 6.0, 9.0, 6.0, 3.0, 3.0, 3.0, 3.0, 9.0, 0.0, 9.0,
        ];
        assert!(point_in_polygon(&u, 1.5, 6.0));
        assert!(!point_in_polygon(&u, 4.5, 6.0));
    }

    #[test]
    fn strip_covers_each_quad() {
        // Three edges along the x axis, width 4.
        let edges = [
            0.0, 2.0, 0.0, -2.0, 10.0, 2.0, 10.0, -2.0, 20.0, 2.0, 20.0, -2.0,
        ];
        assert!(point_in_strip(&edges, 5.0, 0.0));
        assert!(point_in_strip(&edges, 15.0, 1.5));
        assert!(!point_in_strip(&edges, 25.0, 0.0));
        assert!(!point_in_strip(&edges, 5.0, 3.0));
    }

    #[test]
    fn single_edge_strip_is_empty() {
        assert!(!point_in_strip(&[0.0, 2.0, 0.0, -2.0], 0.0, 0.0));
    }

    #[test]
    fn bounding_box_grows() {
        let mut bbox = BoundingBox::empty();
        assert!(bbox.is_empty());
        assert!(!bbox.contains(0.0, 0.0));
        bbox.extend_flat(&[1.0, 2.0, -3.0, 4.0]);
        assert!(!bbox.is_empty());
        assert!(bbox.contains(0.0, 3.0));
        assert!(!bbox.contains(2.0, 3.0));
    }

    // ================================================================
    // Properties
    // ================================================================

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn continuation_shares_edge_exactly(
                x1 in -500.0f32..500.0, y1 in -500.0f32..500.0,
                a in 0.0f32..std::f32::consts::TAU, b in -0.5f32..0.5,
                step in 0.5f32..5.0, t in 1.0f32..12.0,
            ) {
                let p2 = [x1 + a.sin() * step, y1 - a.cos() * step];
                let first = build_start_segment([x1, y1], p2, t, t);
                let p3 = [p2[0] + (a + b).sin() * step, p2[1] - (a + b).cos() * step];
                let next = build_continuation_segment(p3, t, segment_end(&first), p2);
                prop_assert_eq!([next[0], next[1], next[6], next[7]], segment_end(&first));
            }

            #[test]
            fn segment_midpoint_is_inside(
                x1 in -500.0f32..500.0, y1 in -500.0f32..500.0,
                a in 0.0f32..std::f32::consts::TAU,
                step in 1.0f32..5.0, t in 1.0f32..12.0,
            ) {
                let p2 = [x1 + a.sin() * step, y1 - a.cos() * step];
                let v = build_start_segment([x1, y1], p2, t, t);
                let (mx, my) = ((x1 + p2[0]) * 0.5, (y1 + p2[1]) * 0.5);
                prop_assert!(point_in_polygon(&v, mx, my));
                let mut bbox = BoundingBox::empty();
                bbox.extend_flat(&v);
                prop_assert!(bbox.contains(mx, my));
            }
        }
    }
}
