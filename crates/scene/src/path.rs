//! Bezier paths with optional variable-width strokes
//!
//! A path is a chain of points tagged as vertices or control handles.
//! `HandleOut` follows the vertex it belongs to, `HandleIn` precedes it.
//! Any vertex may drop either handle, in which case the segment degrades
//! toward a straight line.

use serde::{Deserialize, Serialize};

use crate::geometry::{Affine, BBox, Point};

/// Number of line pieces each cubic segment is split into by `flatten`
const CURVE_STEPS: usize = 16;

/// What a point in a path chain stands for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PointRole {
    #[default]
    Vertex,
    HandleOut,
    HandleIn,
}

/// One point of a path chain
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PathPoint {
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub role: PointRole,
}

impl PathPoint {
    pub fn vertex(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            role: PointRole::Vertex,
        }
    }

    pub fn handle_out(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            role: PointRole::HandleOut,
        }
    }

    pub fn handle_in(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            role: PointRole::HandleIn,
        }
    }

    pub fn point(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

/// Stroke width sample at vertex parameter `t`.
///
/// `t` counts vertices: 1.5 is halfway between the second and third vertex.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PathWeight {
    pub t: f64,
    pub width: f64,
    #[serde(default)]
    pub offset: f64,
}

/// A drawable piece between two consecutive vertices
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Segment {
    Line {
        from: Point,
        to: Point,
    },
    Cubic {
        from: Point,
        c1: Point,
        c2: Point,
        to: Point,
    },
}

impl Segment {
    pub fn start(&self) -> Point {
        match self {
            Segment::Line { from, .. } | Segment::Cubic { from, .. } => *from,
        }
    }

    pub fn end(&self) -> Point {
        match self {
            Segment::Line { to, .. } | Segment::Cubic { to, .. } => *to,
        }
    }

    /// Point at local parameter `t` in 0..=1
    pub fn eval(&self, t: f64) -> Point {
        match *self {
            Segment::Line { from, to } => from.lerp(to, t),
            Segment::Cubic { from, c1, c2, to } => {
                let mt = 1.0 - t;
                let a = mt * mt * mt;
                let b = 3.0 * mt * mt * t;
                let c = 3.0 * mt * t * t;
                let d = t * t * t;
                Point::new(
                    a * from.x + b * c1.x + c * c2.x + d * to.x,
                    a * from.y + b * c1.y + c * c2.y + d * to.y,
                )
            }
        }
    }
}

/// A point produced by `Path::flatten`, tagged with its vertex parameter
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlatPoint {
    pub point: Point,
    pub t: f64,
}

/// A single subpath
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Path {
    pub points: Vec<PathPoint>,
    #[serde(default)]
    pub closed: bool,
    #[serde(default)]
    pub weights: Vec<PathWeight>,
}

impl Path {
    /// Path through `points` joined by straight lines
    pub fn polyline(points: &[Point], closed: bool) -> Self {
        Self {
            points: points.iter().map(|p| PathPoint::vertex(p.x, p.y)).collect(),
            closed,
            weights: Vec::new(),
        }
    }

    /// Axis-aligned closed rectangle
    pub fn rectangle(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self::polyline(
            &[
                Point::new(x, y),
                Point::new(x + width, y),
                Point::new(x + width, y + height),
                Point::new(x, y + height),
            ],
            true,
        )
    }

    pub fn is_weighted(&self) -> bool {
        !self.weights.is_empty()
    }

    pub fn vertex_count(&self) -> usize {
        self.points
            .iter()
            .filter(|p| p.role == PointRole::Vertex)
            .count()
    }

    /// Copy of this path with every point run through `m`
    pub fn transformed(&self, m: &Affine) -> Path {
        let points = self
            .points
            .iter()
            .map(|p| {
                let q = m.transform_point(p.point());
                PathPoint {
                    x: q.x,
                    y: q.y,
                    role: p.role,
                }
            })
            .collect();
        Path {
            points,
            closed: self.closed,
            weights: self.weights.clone(),
        }
    }

    /// Vertex-to-vertex segments, including the wrap segment when closed
    pub fn segments(&self) -> Vec<Segment> {
        struct Knot {
            at: Point,
            handle_in: Option<Point>,
            handle_out: Option<Point>,
        }

        let mut knots: Vec<Knot> = Vec::new();
        let mut pending_in: Option<Point> = None;
        for p in &self.points {
            match p.role {
                PointRole::Vertex => knots.push(Knot {
                    at: p.point(),
                    handle_in: pending_in.take(),
                    handle_out: None,
                }),
                PointRole::HandleIn => pending_in = Some(p.point()),
                PointRole::HandleOut => {
                    if let Some(last) = knots.last_mut() {
                        last.handle_out = Some(p.point());
                    }
                }
            }
        }
        // A trailing in-handle belongs to the first vertex of a closed path
        if let (Some(handle), Some(first)) = (pending_in, knots.first_mut()) {
            if first.handle_in.is_none() {
                first.handle_in = Some(handle);
            }
        }

        let n = knots.len();
        if n < 2 {
            return Vec::new();
        }
        let count = if self.closed { n } else { n - 1 };
        (0..count)
            .map(|i| {
                let a = &knots[i];
                let b = &knots[(i + 1) % n];
                match (a.handle_out, b.handle_in) {
                    (None, None) => Segment::Line {
                        from: a.at,
                        to: b.at,
                    },
                    (c1, c2) => Segment::Cubic {
                        from: a.at,
                        c1: c1.unwrap_or(a.at),
                        c2: c2.unwrap_or(b.at),
                        to: b.at,
                    },
                }
            })
            .collect()
    }

    /// Polyline approximation. For closed paths the start point is not repeated.
    pub fn flatten(&self) -> Vec<FlatPoint> {
        let segments = self.segments();
        let mut out: Vec<FlatPoint> = Vec::new();
        if segments.is_empty() {
            if let Some(p) = self.points.iter().find(|p| p.role == PointRole::Vertex) {
                out.push(FlatPoint {
                    point: p.point(),
                    t: 0.0,
                });
            }
            return out;
        }

        let mut push = |point: Point, t: f64| {
            if out.last().map_or(true, |last| last.point.distance(point) > 1e-12) {
                out.push(FlatPoint { point, t });
            }
        };
        push(segments[0].start(), 0.0);
        for (i, seg) in segments.iter().enumerate() {
            let steps = match seg {
                Segment::Line { .. } => 1,
                Segment::Cubic { .. } => CURVE_STEPS,
            };
            for step in 1..=steps {
                let local = step as f64 / steps as f64;
                push(seg.eval(local), i as f64 + local);
            }
        }
        if self.closed && out.len() > 1 {
            let first = out[0].point;
            if out.last().map_or(false, |last| last.point.distance(first) <= 1e-9) {
                out.pop();
            }
        }
        out
    }

    /// Stroke width and center offset at vertex parameter `t`
    pub fn weight_at(&self, t: f64, line_width: f64) -> (f64, f64) {
        let mut sorted: Vec<&PathWeight> = self.weights.iter().collect();
        sorted.sort_by(|a, b| a.t.total_cmp(&b.t));
        match sorted.as_slice() {
            [] => (line_width, 0.0),
            [only] => (only.width, only.offset),
            [first, ..] if t <= first.t => (first.width, first.offset),
            [.., last] if t >= last.t => (last.width, last.offset),
            _ => {
                let i = sorted.iter().position(|w| w.t > t).unwrap_or(sorted.len() - 1);
                let (a, b) = (sorted[i - 1], sorted[i]);
                let span = b.t - a.t;
                let f = if span > 0.0 { (t - a.t) / span } else { 0.0 };
                (
                    a.width + (b.width - a.width) * f,
                    a.offset + (b.offset - a.offset) * f,
                )
            }
        }
    }

    fn normals(&self, flat: &[FlatPoint]) -> Vec<Point> {
        let n = flat.len();
        (0..n)
            .map(|i| {
                let (prev, next) = if self.closed {
                    (flat[(i + n - 1) % n].point, flat[(i + 1) % n].point)
                } else {
                    (
                        flat[i.saturating_sub(1)].point,
                        flat[(i + 1).min(n - 1)].point,
                    )
                };
                let (tx, ty) = (next.x - prev.x, next.y - prev.y);
                let len = (tx * tx + ty * ty).sqrt();
                if len < 1e-12 {
                    Point::new(0.0, 0.0)
                } else {
                    Point::new(-ty / len, tx / len)
                }
            })
            .collect()
    }

    /// Flattened center line, shifted by the weight offsets
    pub fn center_polygon(&self, line_width: f64) -> Vec<Point> {
        let flat = self.flatten();
        let normals = self.normals(&flat);
        flat.iter()
            .zip(normals)
            .map(|(fp, n)| {
                let (_, offset) = self.weight_at(fp.t, line_width);
                Point::new(fp.point.x + n.x * offset, fp.point.y + n.y * offset)
            })
            .collect()
    }

    /// Outline of the variable-width stroke.
    ///
    /// Open paths give one ring running up one side and back the other.
    /// Closed paths give an outer and an inner ring, meant to be filled
    /// with the even-odd rule.
    pub fn outline_polygons(&self, line_width: f64) -> Vec<Vec<Point>> {
        let flat = self.flatten();
        if flat.len() < 2 {
            return Vec::new();
        }
        let normals = self.normals(&flat);
        let mut left = Vec::with_capacity(flat.len());
        let mut right = Vec::with_capacity(flat.len());
        for (fp, n) in flat.iter().zip(normals) {
            let (width, offset) = self.weight_at(fp.t, line_width);
            let l = offset + width / 2.0;
            let r = offset - width / 2.0;
            left.push(Point::new(fp.point.x + n.x * l, fp.point.y + n.y * l));
            right.push(Point::new(fp.point.x + n.x * r, fp.point.y + n.y * r));
        }
        if self.closed {
            vec![left, right]
        } else {
            right.reverse();
            left.extend(right);
            vec![left]
        }
    }

    /// Total length of the flattened path
    pub fn length(&self) -> f64 {
        let flat = self.flatten();
        let mut total: f64 = flat
            .windows(2)
            .map(|w| w[0].point.distance(w[1].point))
            .sum();
        if self.closed && flat.len() > 1 {
            total += flat[flat.len() - 1].point.distance(flat[0].point);
        }
        total
    }

    /// Position and tangent angle (radians) at arc length `distance`.
    /// `None` when the distance falls outside the path.
    pub fn point_at_length(&self, distance: f64) -> Option<(Point, f64)> {
        let mut flat: Vec<Point> = self.flatten().into_iter().map(|f| f.point).collect();
        if self.closed {
            if let Some(first) = flat.first().copied() {
                flat.push(first);
            }
        }
        if distance < 0.0 {
            return None;
        }
        let mut walked = 0.0;
        for w in flat.windows(2) {
            let len = w[0].distance(w[1]);
            if len <= 0.0 {
                continue;
            }
            if walked + len >= distance {
                let p = w[0].lerp(w[1], (distance - walked) / len);
                let angle = (w[1].y - w[0].y).atan2(w[1].x - w[0].x);
                return Some((p, angle));
            }
            walked += len;
        }
        None
    }

    pub fn bbox(&self) -> Option<BBox> {
        BBox::from_points(self.points.iter().map(PathPoint::point))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> Path {
        Path::rectangle(0.0, 0.0, 2.0, 2.0)
    }

    #[test]
    fn test_segments_open_and_closed() {
        let mut path = square();
        assert_eq!(path.segments().len(), 4);
        path.closed = false;
        assert_eq!(path.segments().len(), 3);
        assert!(matches!(path.segments()[0], Segment::Line { .. }));
    }

    #[test]
    fn test_segments_with_handles() {
        let path = Path {
            points: vec![
                PathPoint::vertex(0.0, 0.0),
                PathPoint::handle_out(0.0, 1.0),
                PathPoint::handle_in(1.0, 1.0),
                PathPoint::vertex(1.0, 0.0),
                PathPoint::vertex(2.0, 0.0),
            ],
            closed: false,
            weights: Vec::new(),
        };
        let segs = path.segments();
        assert_eq!(segs.len(), 2);
        assert_eq!(
            segs[0],
            Segment::Cubic {
                from: Point::new(0.0, 0.0),
                c1: Point::new(0.0, 1.0),
                c2: Point::new(1.0, 1.0),
                to: Point::new(1.0, 0.0),
            }
        );
        assert!(matches!(segs[1], Segment::Line { .. }));
    }

    #[test]
    fn test_missing_handle_uses_vertex() {
        let path = Path {
            points: vec![
                PathPoint::vertex(0.0, 0.0),
                PathPoint::handle_out(0.5, 1.0),
                PathPoint::vertex(1.0, 0.0),
            ],
            closed: false,
            weights: Vec::new(),
        };
        match path.segments()[0] {
            Segment::Cubic { c2, to, .. } => assert_eq!(c2, to),
            other => panic!("expected cubic, got {other:?}"),
        }
    }

    #[test]
    fn test_flatten_closed_does_not_repeat_start() {
        let flat = square().flatten();
        assert_eq!(flat.len(), 4);
        assert_eq!(flat[3].t, 3.0);
    }

    #[test]
    fn test_weight_interpolation() {
        let path = Path {
            weights: vec![
                PathWeight {
                    t: 2.0,
                    width: 1.0,
                    offset: 0.0,
                },
                PathWeight {
                    t: 0.0,
                    width: 0.0,
                    offset: 0.0,
                },
            ],
            ..square()
        };
        assert_eq!(path.weight_at(1.0, 9.0).0, 0.5);
        assert_eq!(path.weight_at(-1.0, 9.0).0, 0.0);
        assert_eq!(path.weight_at(3.5, 9.0).0, 1.0);
        assert_eq!(Path::default().weight_at(1.0, 9.0), (9.0, 0.0));
    }

    #[test]
    fn test_outline_rings() {
        let mut path = square();
        path.weights.push(PathWeight {
            t: 0.0,
            width: 0.2,
            offset: 0.0,
        });
        let rings = path.outline_polygons(0.0);
        assert_eq!(rings.len(), 2);
        assert_eq!(rings[0].len(), 4);

        path.closed = false;
        let rings = path.outline_polygons(0.0);
        assert_eq!(rings.len(), 1);
        assert_eq!(rings[0].len(), 8);
    }

    #[test]
    fn test_outline_width_of_straight_line() {
        let path = Path {
            weights: vec![PathWeight {
                t: 0.0,
                width: 0.5,
                offset: 0.0,
            }],
            ..Path::polyline(&[Point::new(0.0, 0.0), Point::new(4.0, 0.0)], false)
        };
        let ring = &path.outline_polygons(0.0)[0];
        assert!((ring[0].y - 0.25).abs() < 1e-9);
        assert!((ring[3].y + 0.25).abs() < 1e-9);
    }

    #[test]
    fn test_point_at_length() {
        let path = Path::polyline(&[Point::new(0.0, 0.0), Point::new(3.0, 0.0), Point::new(3.0, 4.0)], false);
        assert_eq!(path.length(), 7.0);
        let (p, angle) = path.point_at_length(5.0).unwrap();
        assert!((p.x - 3.0).abs() < 1e-9 && (p.y - 2.0).abs() < 1e-9);
        assert!((angle - std::f64::consts::FRAC_PI_2).abs() < 1e-9);
        assert!(path.point_at_length(7.5).is_none());
    }
}
