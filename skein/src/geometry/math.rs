use super::tolerance::EPS_DENOM;
use crate::model::Point;

/// Squared distance from (px,py) to the segment (x1,y1)-(x2,y2) and the
/// clamped parameter of the closest point.
pub fn seg_distance_sq(px: f64, py: f64, x1: f64, y1: f64, x2: f64, y2: f64) -> (f64, f64) {
    let vx = x2 - x1;
    let vy = y2 - y1;
    let wx = px - x1;
    let wy = py - y1;
    let vv = vx * vx + vy * vy;
    let mut t = if vv > EPS_DENOM { (wx * vx + wy * vy) / vv } else { 0.0 };
    if t < 0.0 {
        t = 0.0;
    } else if t > 1.0 {
        t = 1.0;
    }
    let projx = x1 + t * vx;
    let projy = y1 + t * vy;
    let dx = px - projx;
    let dy = py - projy;
    (dx * dx + dy * dy, t)
}

pub fn dist_point_to_seg_sq(px: f64, py: f64, x1: f64, y1: f64, x2: f64, y2: f64) -> f64 {
    let (d2, _) = seg_distance_sq(px, py, x1, y1, x2, y2);
    d2
}

pub fn cubic_point(t: f64, p0: Point, p1: Point, p2: Point, p3: Point) -> Point {
    let u = 1.0 - t;
    let tt = t * t;
    let uu = u * u;
    let uuu = uu * u;
    let ttt = tt * t;
    Point::new(
        uuu * p0.x + 3.0 * uu * t * p1.x + 3.0 * u * tt * p2.x + ttt * p3.x,
        uuu * p0.y + 3.0 * uu * t * p1.y + 3.0 * u * tt * p2.y + ttt * p3.y,
    )
}

/// Distance from a polyline (consecutive points) to a point, with the
/// normalized arc-length parameter of the closest spot.
pub fn polyline_distance_sq(pts: &[Point], px: f64, py: f64) -> (f64, f64) {
    let mut best_d2 = f64::INFINITY;
    let mut best_at = 0.0;
    let mut total = 0.0;
    let mut lens = Vec::with_capacity(pts.len().saturating_sub(1));
    for w in pts.windows(2) {
        let l = w[0].dist(w[1]);
        lens.push(l);
        total += l;
    }
    let mut acc = 0.0;
    for (i, w) in pts.windows(2).enumerate() {
        let (d2, t) = seg_distance_sq(px, py, w[0].x, w[0].y, w[1].x, w[1].y);
        if d2 < best_d2 {
            best_d2 = d2;
            best_at = if total > EPS_DENOM { (acc + t * lens[i]) / total } else { 0.0 };
        }
        acc += lens[i];
    }
    (best_d2, best_at)
}

/// Even-odd point-in-polygon test over a closed ring (last point joins
/// back to the first implicitly).
pub fn point_in_polygon(pts: &[Point], px: f64, py: f64) -> bool {
    let n = pts.len();
    if n < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let (xi, yi) = (pts[i].x, pts[i].y);
        let (xj, yj) = (pts[j].x, pts[j].y);
        if ((yi > py) != (yj > py))
            && px < (xj - xi) * (py - yi) / (yj - yi) + xi
        {
            inside = !inside;
        }
        j = i;
    }
    inside
}
