//! Node boundary curves computed from measured label sizes.
//!
//! The UI layer measures a node's label text and hands the size back
//! here; the layout engine then works against the produced curve.

use crate::model::{Curve, Point};
use serde::{Deserialize, Serialize};
use std::f64::consts::{FRAC_PI_2, PI, TAU};

/// Side length used for nodes with no label at all.
const EMPTY_LABEL_SIZE: f64 = 10.0;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum NodeShape {
    Box,
    RoundedBox { radius: f64 },
    Ellipse,
}

fn quarter_arc(corner_center: Point, r: f64, par_start: f64) -> Curve {
    Curve::Arc {
        center: corner_center,
        axis_a: Point::new(r, 0.0),
        axis_b: Point::new(0.0, r),
        par_start,
        par_end: par_start + FRAC_PI_2,
    }
}

/// Boundary curve of a node of the given outer size, centered on
/// `center`, traversed counter-clockwise.
pub fn node_boundary(shape: NodeShape, width: f64, height: f64, center: Point) -> Curve {
    let hw = width / 2.0;
    let hh = height / 2.0;
    let (cx, cy) = (center.x, center.y);
    match shape {
        NodeShape::Box => Curve::Polyline(vec![
            Point::new(cx - hw, cy - hh),
            Point::new(cx + hw, cy - hh),
            Point::new(cx + hw, cy + hh),
            Point::new(cx - hw, cy + hh),
            Point::new(cx - hw, cy - hh),
        ]),
        NodeShape::RoundedBox { radius } => {
            let r = radius.min(hw).min(hh);
            if r <= 0.0 {
                return node_boundary(NodeShape::Box, width, height, center);
            }
            fn side(segs: &mut Vec<Curve>, a: Point, b: Point) {
                // a fully rounded side leaves no straight run
                if a.dist(b) > 0.0 {
                    segs.push(Curve::Segment(a, b));
                }
            }
            let mut segs: Vec<Curve> = Vec::with_capacity(8);
            side(&mut segs, Point::new(cx - hw + r, cy - hh), Point::new(cx + hw - r, cy - hh));
            segs.push(quarter_arc(Point::new(cx + hw - r, cy - hh + r), r, -FRAC_PI_2));
            side(&mut segs, Point::new(cx + hw, cy - hh + r), Point::new(cx + hw, cy + hh - r));
            segs.push(quarter_arc(Point::new(cx + hw - r, cy + hh - r), r, 0.0));
            side(&mut segs, Point::new(cx + hw - r, cy + hh), Point::new(cx - hw + r, cy + hh));
            segs.push(quarter_arc(Point::new(cx - hw + r, cy + hh - r), r, FRAC_PI_2));
            side(&mut segs, Point::new(cx - hw, cy + hh - r), Point::new(cx - hw, cy - hh + r));
            segs.push(quarter_arc(Point::new(cx - hw + r, cy - hh + r), r, PI));
            Curve::Composite(segs)
        }
        NodeShape::Ellipse => Curve::Composite(vec![
            Curve::Arc {
                center,
                axis_a: Point::new(hw, 0.0),
                axis_b: Point::new(0.0, hh),
                par_start: 0.0,
                par_end: PI,
            },
            Curve::Arc {
                center,
                axis_a: Point::new(hw, 0.0),
                axis_b: Point::new(0.0, hh),
                par_start: PI,
                par_end: TAU,
            },
        ]),
    }
}

/// Boundary curve from a measured label size plus margins, clamped to
/// the graph's minimum node size. `label_size` of `None` means the node
/// has no label text.
pub fn boundary_from_label(
    shape: NodeShape,
    label_size: Option<(f64, f64)>,
    label_margin: f64,
    min_width: f64,
    min_height: f64,
    center: Point,
) -> Curve {
    let (mut w, mut h) = label_size.unwrap_or((EMPTY_LABEL_SIZE, EMPTY_LABEL_SIZE));
    w += 2.0 * label_margin;
    h += 2.0 * label_margin;
    if w < min_width {
        w = min_width;
    }
    if h < min_height {
        h = min_height;
    }
    node_boundary(shape, w, h, center)
}
