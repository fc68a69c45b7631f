use super::math::dist_point_to_seg_sq;
use super::tolerance::{EPS_LEN, MAX_FLATTEN_DEPTH};
use crate::model::{Curve, Point, Rect};

pub fn flatten_cubic(
    points: &mut Vec<Point>,
    p0: Point,
    p1: Point,
    p2: Point,
    p3: Point,
    tol: f64,
    depth: u32,
) {
    let d1 = dist_point_to_seg_sq(p1.x, p1.y, p0.x, p0.y, p3.x, p3.y);
    let d2 = dist_point_to_seg_sq(p2.x, p2.y, p0.x, p0.y, p3.x, p3.y);
    let tol2 = tol * tol;
    if d1.max(d2) <= tol2 || depth > MAX_FLATTEN_DEPTH {
        points.push(p3);
        return;
    }
    let mid = |a: Point, b: Point| Point::new(0.5 * (a.x + b.x), 0.5 * (a.y + b.y));
    let p01 = mid(p0, p1);
    let p12 = mid(p1, p2);
    let p23 = mid(p2, p3);
    let p012 = mid(p01, p12);
    let p123 = mid(p12, p23);
    let p0123 = mid(p012, p123);
    flatten_cubic(points, p0, p01, p012, p0123, tol, depth + 1);
    flatten_cubic(points, p0123, p123, p23, p3, tol, depth + 1);
}

fn flatten_arc(points: &mut Vec<Point>, arc: &Curve) {
    if let Curve::Arc { axis_a, axis_b, par_start, par_end, .. } = arc {
        let sweep = (par_end - par_start).abs();
        let r = axis_a.length().max(axis_b.length());
        // enough steps that the chord error stays small for this radius
        let per_circle = if r > EPS_LEN { (r.sqrt() * 16.0).clamp(16.0, 128.0) } else { 16.0 };
        let n = ((sweep / std::f64::consts::TAU * per_circle).ceil() as usize).max(2);
        for i in 1..=n {
            let t = par_start + (par_end - par_start) * (i as f64 / n as f64);
            points.push(arc.arc_point(t));
        }
    }
}

/// Flatten any curve into a polyline, including its start point.
pub fn flatten_curve(curve: &Curve, tol: f64) -> Vec<Point> {
    let mut pts = vec![curve.start()];
    append_flattened(&mut pts, curve, tol);
    pts
}

fn append_flattened(pts: &mut Vec<Point>, curve: &Curve, tol: f64) {
    match curve {
        Curve::Segment(_, b) => pts.push(*b),
        Curve::Bezier { p0, p1, p2, p3 } => flatten_cubic(pts, *p0, *p1, *p2, *p3, tol, 0),
        Curve::Arc { .. } => flatten_arc(pts, curve),
        Curve::Polyline(points) => pts.extend(points.iter().skip(1).copied()),
        Curve::Composite(segs) => {
            for seg in segs {
                append_flattened(pts, seg, tol);
            }
        }
    }
}

/// Bounding box of the full ellipse an `Arc` lies on. For axis-aligned
/// axes this is exact; for rotated axes it stays conservative.
pub fn arc_full_box(center: Point, axis_a: Point, axis_b: Point) -> Rect {
    let ex = axis_a.x.hypot(axis_b.x);
    let ey = axis_a.y.hypot(axis_b.y);
    Rect::new(center.x - ex, center.y - ey, center.x + ex, center.y + ey)
}

/// Graph-space bounding box of a curve. Bezier boxes use the control
/// hull; arcs use the full ellipse box. Both are conservative, which is
/// what dirty-region and fit computations need.
pub fn curve_bbox(curve: &Curve) -> Rect {
    match curve {
        Curve::Segment(a, b) => Rect::from_points(*a, *b),
        Curve::Bezier { p0, p1, p2, p3 } => Rect::from_points(*p0, *p1)
            .union(Rect::from_points(*p2, *p3)),
        Curve::Arc { center, axis_a, axis_b, .. } => arc_full_box(*center, *axis_a, *axis_b),
        Curve::Polyline(pts) => pts
            .iter()
            .skip(1)
            .fold(Rect::from_points(pts[0], pts[0]), |r, p| {
                r.union(Rect::from_points(*p, *p))
            }),
        Curve::Composite(segs) => segs
            .iter()
            .map(curve_bbox)
            .reduce(Rect::union)
            .unwrap_or(Rect::new(0.0, 0.0, 0.0, 0.0)),
    }
}
