use serde::{Deserialize, Serialize};

pub type NodeId = u32;
pub type EdgeId = u32;

/// A 2D coordinate. Whether it is graph-space or screen-space depends on
/// context; conversion always goes through a `PlaneTransform`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Point {
        Point { x, y }
    }
    pub fn add(self, o: Point) -> Point {
        Point { x: self.x + o.x, y: self.y + o.y }
    }
    pub fn sub(self, o: Point) -> Point {
        Point { x: self.x - o.x, y: self.y - o.y }
    }
    pub fn scaled(self, k: f64) -> Point {
        Point { x: self.x * k, y: self.y * k }
    }
    pub fn length(self) -> f64 {
        (self.x * self.x + self.y * self.y).sqrt()
    }
    /// 90 degree counter-clockwise rotation (graph orientation, y up).
    pub fn rot90(self) -> Point {
        Point { x: -self.y, y: self.x }
    }
    pub fn dist(self, o: Point) -> f64 {
        self.sub(o).length()
    }
}

/// Axis-aligned box in graph space (y up, so `bottom <= top`).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub left: f64,
    pub bottom: f64,
    pub right: f64,
    pub top: f64,
}

impl Rect {
    pub fn new(left: f64, bottom: f64, right: f64, top: f64) -> Rect {
        Rect { left, bottom, right, top }
    }
    pub fn from_points(a: Point, b: Point) -> Rect {
        Rect {
            left: a.x.min(b.x),
            bottom: a.y.min(b.y),
            right: a.x.max(b.x),
            top: a.y.max(b.y),
        }
    }
    pub fn width(&self) -> f64 {
        self.right - self.left
    }
    pub fn height(&self) -> f64 {
        self.top - self.bottom
    }
    pub fn center(&self) -> Point {
        Point::new(0.5 * (self.left + self.right), 0.5 * (self.bottom + self.top))
    }
    pub fn union(self, o: Rect) -> Rect {
        Rect {
            left: self.left.min(o.left),
            bottom: self.bottom.min(o.bottom),
            right: self.right.max(o.right),
            top: self.top.max(o.top),
        }
    }
    pub fn expand(self, pad: f64) -> Rect {
        Rect {
            left: self.left - pad,
            bottom: self.bottom - pad,
            right: self.right + pad,
            top: self.top + pad,
        }
    }
    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.left && p.x <= self.right && p.y >= self.bottom && p.y <= self.top
    }
}

/// Geometric curve primitives as produced by the layout engine.
///
/// The set is closed: tessellation matches exhaustively, so adding a
/// variant is a compile-time decision rather than a runtime fallthrough.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Curve {
    /// Straight segment from start to end.
    Segment(Point, Point),
    /// Cubic Bezier with all four control points.
    Bezier {
        p0: Point,
        p1: Point,
        p2: Point,
        p3: Point,
    },
    /// Elliptical arc: point(t) = center + cos(t)*axis_a + sin(t)*axis_b
    /// for t in [par_start, par_end]. Oriented counter-clockwise iff
    /// (axis_a, axis_b) is a right-handed pair.
    Arc {
        center: Point,
        axis_a: Point,
        axis_b: Point,
        par_start: f64,
        par_end: f64,
    },
    /// Straight-line chain, at least two points, no duplicate
    /// consecutive points.
    Polyline(Vec<Point>),
    /// Contiguous sequence of leaf curves (Segment/Bezier/Arc only);
    /// each child's end coincides with the next child's start.
    Composite(Vec<Curve>),
}

impl Curve {
    pub fn variant_name(&self) -> &'static str {
        match self {
            Curve::Segment(..) => "segment",
            Curve::Bezier { .. } => "bezier",
            Curve::Arc { .. } => "arc",
            Curve::Polyline(_) => "polyline",
            Curve::Composite(_) => "composite",
        }
    }

    pub fn start(&self) -> Point {
        match self {
            Curve::Segment(a, _) => *a,
            Curve::Bezier { p0, .. } => *p0,
            Curve::Arc { .. } => self.arc_point(self.par_start()),
            Curve::Polyline(pts) => pts[0],
            Curve::Composite(segs) => segs[0].start(),
        }
    }

    pub fn end(&self) -> Point {
        match self {
            Curve::Segment(_, b) => *b,
            Curve::Bezier { p3, .. } => *p3,
            Curve::Arc { .. } => self.arc_point(self.par_end()),
            Curve::Polyline(pts) => pts[pts.len() - 1],
            Curve::Composite(segs) => segs[segs.len() - 1].end(),
        }
    }

    fn par_start(&self) -> f64 {
        match self {
            Curve::Arc { par_start, .. } => *par_start,
            _ => 0.0,
        }
    }

    fn par_end(&self) -> f64 {
        match self {
            Curve::Arc { par_end, .. } => *par_end,
            _ => 0.0,
        }
    }

    /// Evaluate an `Arc` at parameter `t`; zero for other variants.
    pub fn arc_point(&self, t: f64) -> Point {
        if let Curve::Arc { center, axis_a, axis_b, .. } = self {
            Point::new(
                center.x + t.cos() * axis_a.x + t.sin() * axis_b.x,
                center.y + t.cos() * axis_a.y + t.sin() * axis_b.y,
            )
        } else {
            Point::new(0.0, 0.0)
        }
    }

    /// An `Arc` is counter-clockwise when its axis pair is right-handed.
    pub fn arc_ccw(&self) -> bool {
        if let Curve::Arc { axis_a, axis_b, .. } = self {
            axis_a.x * axis_b.y - axis_a.y * axis_b.x > 0.0
        } else {
            false
        }
    }

    /// Structural invariants serde cannot enforce: a polyline carries at
    /// least two points and a composite at least one child. Checked at
    /// every deserialization boundary; the rest of the crate assumes it.
    pub fn is_well_formed(&self) -> bool {
        match self {
            Curve::Segment(..) | Curve::Bezier { .. } | Curve::Arc { .. } => true,
            Curve::Polyline(pts) => pts.len() >= 2,
            Curve::Composite(segs) => {
                !segs.is_empty() && segs.iter().all(Curve::is_well_formed)
            }
        }
    }

    pub fn translated(&self, d: Point) -> Curve {
        match self {
            Curve::Segment(a, b) => Curve::Segment(a.add(d), b.add(d)),
            Curve::Bezier { p0, p1, p2, p3 } => Curve::Bezier {
                p0: p0.add(d),
                p1: p1.add(d),
                p2: p2.add(d),
                p3: p3.add(d),
            },
            Curve::Arc { center, axis_a, axis_b, par_start, par_end } => Curve::Arc {
                center: center.add(d),
                axis_a: *axis_a,
                axis_b: *axis_b,
                par_start: *par_start,
                par_end: *par_end,
            },
            Curve::Polyline(pts) => Curve::Polyline(pts.iter().map(|p| p.add(d)).collect()),
            Curve::Composite(segs) => {
                Curve::Composite(segs.iter().map(|c| c.translated(d)).collect())
            }
        }
    }
}

/// Where an arrow tip sits and how long its spike is, both graph-space.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Arrowhead {
    pub tip: Point,
    pub length: f64,
}

/// Routing geometry of an edge, owned by the edge for its lifetime and
/// replaced wholesale when the layout engine re-routes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EdgeGeometry {
    pub curve: Option<Curve>,
    pub source_arrowhead: Option<Arrowhead>,
    pub target_arrowhead: Option<Arrowhead>,
    pub line_width: f64,
}

impl EdgeGeometry {
    pub fn is_well_formed(&self) -> bool {
        self.curve.as_ref().map_or(true, Curve::is_well_formed)
    }
}

impl Default for EdgeGeometry {
    fn default() -> Self {
        EdgeGeometry {
            curve: None,
            source_arrowhead: None,
            target_arrowhead: None,
            line_width: 1.0,
        }
    }
}

/// Label box attached to an edge, graph-space center and extents.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct EdgeLabel {
    pub center: Point,
    pub width: f64,
    pub height: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Node {
    pub center: Point,
    pub boundary: Curve,
    pub label: Option<String>,
    pub z: i32,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Edge {
    pub a: NodeId,
    pub b: NodeId,
    pub geometry: EdgeGeometry,
    pub label: Option<EdgeLabel>,
    pub z: i32,
}

/// Physical display parameters, passed explicitly wherever inch-based
/// sizing is needed instead of living in process-wide statics.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DisplayMetrics {
    pub dpi_x: f64,
    pub dpi_y: f64,
}

impl Default for DisplayMetrics {
    fn default() -> Self {
        DisplayMetrics { dpi_x: 96.0, dpi_y: 96.0 }
    }
}
