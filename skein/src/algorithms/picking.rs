//! Screen-point hit-testing.
//!
//! The tolerance disk has a fixed apparent size on screen: its
//! graph-space radius is divided by the current scale, so picking feels
//! the same at every zoom level. Point-like targets (nodes, labels)
//! always beat line-like targets (edges); within a class the highest
//! z wins, with the latest-added entity breaking exact ties.

use crate::geometry::flatten::{curve_bbox, flatten_curve};
use crate::geometry::math::{point_in_polygon, polyline_distance_sq};
use crate::geometry::tolerance::{FLATTEN_TOL, HIT_TOLERANCE_INCHES};
use crate::geometry::transform::PlaneTransform;
use crate::model::{DisplayMetrics, Point, Rect};
use crate::Scene;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum Pick {
    #[serde(rename = "node")]
    Node { id: u32, dist: f64 },
    #[serde(rename = "label")]
    Label { edge: u32, dist: f64 },
    #[serde(rename = "edge")]
    Edge { id: u32, t: f64, dist: f64 },
}

/// Zoom-invariant hit tolerance in graph units.
pub fn hit_tolerance(metrics: &DisplayMetrics, scale: f64) -> f64 {
    HIT_TOLERANCE_INCHES * metrics.dpi_x / scale
}

pub fn pick_impl(
    scene: &Scene,
    screen: Point,
    transform: &PlaneTransform,
    metrics: &DisplayMetrics,
) -> Option<Pick> {
    let p = transform.apply_inverse(screen);
    let tol = hit_tolerance(metrics, transform.scale);
    let tol2 = tol * tol;

    // point-like candidates: (z, id, pick)
    let mut best_point: Option<(i32, u32, Pick)> = None;
    let mut consider_point = |z: i32, id: u32, pick: Pick| {
        let better = match &best_point {
            None => true,
            Some((bz, bid, _)) => (z, id) > (*bz, *bid),
        };
        if better {
            best_point = Some((z, id, pick));
        }
    };

    for (i, n) in scene.nodes.iter().enumerate() {
        let Some(n) = n else { continue };
        let bbox = curve_bbox(&n.boundary).expand(tol);
        if !bbox.contains(p) {
            continue;
        }
        let ring = flatten_curve(&n.boundary, FLATTEN_TOL);
        let (d2, _) = polyline_distance_sq(&ring, p.x, p.y);
        if d2 <= tol2 || point_in_polygon(&ring, p.x, p.y) {
            consider_point(n.z, i as u32, Pick::Node { id: i as u32, dist: d2.sqrt() });
        }
    }

    for (i, e) in scene.edges.iter().enumerate() {
        let Some(e) = e else { continue };
        let Some(label) = e.label else { continue };
        let r = Rect::new(
            label.center.x - label.width / 2.0,
            label.center.y - label.height / 2.0,
            label.center.x + label.width / 2.0,
            label.center.y + label.height / 2.0,
        )
        .expand(tol);
        if r.contains(p) {
            consider_point(e.z, i as u32, Pick::Label { edge: i as u32, dist: p.dist(label.center) });
        }
    }

    if let Some((_, _, pick)) = best_point {
        return Some(pick);
    }

    let mut best_edge: Option<(i32, u32, Pick)> = None;
    for (i, e) in scene.edges.iter().enumerate() {
        let Some(e) = e else { continue };
        let Some(curve) = &e.geometry.curve else { continue };
        if !curve_bbox(curve).expand(tol).contains(p) {
            continue;
        }
        let pts = flatten_curve(curve, FLATTEN_TOL);
        let (d2, t) = polyline_distance_sq(&pts, p.x, p.y);
        if d2 <= tol2 {
            let better = match &best_edge {
                None => true,
                Some((bz, bid, _)) => (e.z, i as u32) > (*bz, *bid),
            };
            if better {
                best_edge = Some((e.z, i as u32, Pick::Edge { id: i as u32, t, dist: d2.sqrt() }));
            }
        }
    }
    best_edge.map(|(_, _, pick)| pick)
}
