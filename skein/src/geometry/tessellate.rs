//! Curve-to-path tessellation and arrowhead construction.
//!
//! Converts layout-engine curve primitives into screen-space path
//! commands through the view transform. The command list is rebuilt
//! wholesale on every invalidation; nothing here keeps state.

use super::flatten::arc_full_box;
use super::path::{transform_commands, PathCommand, Sweep};
use super::tolerance::{HALF_ARROW_ANGLE_COS, HALF_ARROW_ANGLE_TAN, MIN_ARROW_LEN};
use super::transform::PlaneTransform;
use crate::model::{Curve, Point};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GeometryError {
    /// A composite carried a child the tessellator has no dispatch for.
    /// The curve set is closed and engine-controlled, so hitting this
    /// means an engine/renderer version mismatch; the tessellation pass
    /// aborts loudly instead of dropping geometry.
    #[error("composite curves may only contain segment, bezier, or arc children (found {found})")]
    UnsupportedComposite { found: &'static str },
}

/// Signed sweep angle of an arc: positive when the arc is oriented
/// counter-clockwise in graph space.
pub fn arc_sweep_angle(arc: &Curve) -> f64 {
    if let Curve::Arc { par_start, par_end, .. } = arc {
        let sweep = par_end - par_start;
        if arc.arc_ccw() {
            sweep
        } else {
            -sweep
        }
    } else {
        0.0
    }
}

fn arc_command(arc: &Curve) -> PathCommand {
    let (center, axis_a, axis_b) = match arc {
        Curve::Arc { center, axis_a, axis_b, .. } => (*center, *axis_a, *axis_b),
        _ => unreachable!("arc_command is only called on Arc"),
    };
    let sweep = arc_sweep_angle(arc);
    let bbox = arc_full_box(center, axis_a, axis_b);
    PathCommand::ArcTo {
        end: arc.end(),
        radii: (bbox.width() / 2.0, bbox.height() / 2.0),
        rotation: axis_a.y.atan2(axis_a.x),
        large_arc: sweep.abs() >= std::f64::consts::PI,
        // A clockwise graph-space arc is also clockwise in SVG screen
        // coordinates once the y flip is applied.
        sweep: if sweep < 0.0 { Sweep::Clockwise } else { Sweep::Counterclockwise },
    }
}

/// Graph-space command for a leaf curve (everything but the MoveTo).
fn leaf_command(curve: &Curve) -> Result<PathCommand, GeometryError> {
    match curve {
        Curve::Segment(_, b) => Ok(PathCommand::LineTo(*b)),
        Curve::Bezier { p1, p2, p3, .. } => Ok(PathCommand::CubicTo(*p1, *p2, *p3)),
        Curve::Arc { .. } => Ok(arc_command(curve)),
        Curve::Polyline(_) | Curve::Composite(_) => Err(GeometryError::UnsupportedComposite {
            found: curve.variant_name(),
        }),
    }
}

/// Tessellate a curve into graph-space path commands, starting with a
/// `MoveTo` at the curve's start.
pub fn tessellate_graph_space(curve: &Curve) -> Result<Vec<PathCommand>, GeometryError> {
    let mut cmds = vec![PathCommand::MoveTo(curve.start())];
    match curve {
        Curve::Polyline(pts) => {
            for p in pts.iter().skip(1) {
                cmds.push(PathCommand::LineTo(*p));
            }
        }
        Curve::Composite(segs) => {
            for seg in segs {
                cmds.push(leaf_command(seg)?);
            }
        }
        leaf => cmds.push(leaf_command(leaf)?),
    }
    Ok(cmds)
}

/// Tessellate a curve into screen-space path commands.
pub fn tessellate(curve: &Curve, t: &PlaneTransform) -> Result<Vec<PathCommand>, GeometryError> {
    Ok(transform_commands(&tessellate_graph_space(curve)?, t))
}

/// Build the filled arrowhead shape for an arrow whose spike runs from
/// `base` (where the curve ends) to `tip`, graph space.
///
/// Two regimes split at a stroke thickness of one unit: at most one the
/// shape is a plain triangle, above it a flag closed by a rounded tip arc.
pub fn arrowhead_path(base: Point, tip: Point, thickness: f64) -> Option<Vec<PathCommand>> {
    let dir = tip.sub(base);
    let dl = dir.length();
    if dl < MIN_ARROW_LEN {
        // no direction to point in
        return None;
    }

    if thickness > 1.0 {
        // flag shape with a rounded tip arc
        let unit = dir.scaled(1.0 / dl);
        let perp = unit.rot90();
        let w = 0.5 * thickness;
        let s0 = perp.scaled(w);
        let s = perp.scaled(w + dl * HALF_ARROW_ANGLE_TAN);
        let rad = w / HALF_ARROW_ANGLE_COS;
        Some(vec![
            PathCommand::MoveTo(base.add(s)),
            PathCommand::LineTo(base.sub(s)),
            PathCommand::LineTo(tip.sub(s0)),
            PathCommand::ArcTo {
                end: tip.add(s0),
                radii: (rad, rad),
                rotation: 0.0,
                large_arc: false,
                sweep: Sweep::Counterclockwise,
            },
        ])
    } else {
        // plain triangle; pull the tip back so a thin arrow does not
        // overshoot the line it caps
        let delta = (dl / 2.0).min(1.5 * thickness);
        let spike = dir.scaled((dl - delta) / dl);
        let end = base.add(spike);
        let s = spike.rot90().scaled(HALF_ARROW_ANGLE_TAN);
        Some(vec![
            PathCommand::MoveTo(base.add(s)),
            PathCommand::LineTo(end),
            PathCommand::LineTo(base.sub(s)),
        ])
    }
}

/// Screen-space arrowhead.
pub fn tessellate_arrowhead(
    base: Point,
    tip: Point,
    thickness: f64,
    t: &PlaneTransform,
) -> Option<Vec<PathCommand>> {
    arrowhead_path(base, tip, thickness).map(|cmds| transform_commands(&cmds, t))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn ident() -> PlaneTransform {
        PlaneTransform { scale: 1.0, dx: 0.0, dy: 0.0 }
    }

    #[test]
    fn composite_emits_move_line_cubic_in_order() {
        let c = Curve::Composite(vec![
            Curve::Segment(Point::new(0.0, 0.0), Point::new(1.0, 0.0)),
            Curve::Bezier {
                p0: Point::new(1.0, 0.0),
                p1: Point::new(1.5, 1.0),
                p2: Point::new(2.5, 1.0),
                p3: Point::new(3.0, 0.0),
            },
        ]);
        let cmds = tessellate_graph_space(&c).unwrap();
        assert_eq!(cmds.len(), 3);
        assert!(matches!(cmds[0], PathCommand::MoveTo(p) if p == Point::new(0.0, 0.0)));
        assert!(matches!(cmds[1], PathCommand::LineTo(_)));
        assert!(matches!(cmds[2], PathCommand::CubicTo(..)));
    }

    #[test]
    fn nested_composite_is_rejected() {
        let c = Curve::Composite(vec![Curve::Composite(vec![Curve::Segment(
            Point::new(0.0, 0.0),
            Point::new(1.0, 0.0),
        )])]);
        assert_eq!(
            tessellate_graph_space(&c),
            Err(GeometryError::UnsupportedComposite { found: "composite" })
        );
    }

    #[test]
    fn polyline_child_is_rejected() {
        let c = Curve::Composite(vec![Curve::Polyline(vec![
            Point::new(0.0, 0.0),
            Point::new(1.0, 0.0),
        ])]);
        assert_eq!(
            tessellate_graph_space(&c),
            Err(GeometryError::UnsupportedComposite { found: "polyline" })
        );
    }

    #[test]
    fn polyline_emits_line_per_point_after_first() {
        let c = Curve::Polyline(vec![
            Point::new(0.0, 0.0),
            Point::new(1.0, 0.0),
            Point::new(1.0, 2.0),
            Point::new(3.0, 2.0),
        ]);
        let cmds = tessellate(&c, &ident()).unwrap();
        assert_eq!(cmds.len(), 4);
        assert!(cmds.iter().skip(1).all(|c| matches!(c, PathCommand::LineTo(_))));
    }

    fn quarter_arc(ccw: bool) -> Curve {
        Curve::Arc {
            center: Point::new(0.0, 0.0),
            axis_a: Point::new(2.0, 0.0),
            axis_b: Point::new(0.0, if ccw { 2.0 } else { -2.0 }),
            par_start: 0.0,
            par_end: PI / 2.0,
        }
    }

    #[test]
    fn clockwise_arc_gets_clockwise_sweep() {
        let cmds = tessellate_graph_space(&quarter_arc(false)).unwrap();
        match cmds[1] {
            PathCommand::ArcTo { sweep, large_arc, .. } => {
                assert_eq!(sweep, Sweep::Clockwise);
                assert!(!large_arc);
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn counterclockwise_arc_gets_counterclockwise_sweep() {
        let cmds = tessellate_graph_space(&quarter_arc(true)).unwrap();
        match cmds[1] {
            PathCommand::ArcTo { sweep, .. } => assert_eq!(sweep, Sweep::Counterclockwise),
            _ => unreachable!(),
        }
    }

    #[test]
    fn large_arc_flag_at_half_turn() {
        let arc = Curve::Arc {
            center: Point::new(0.0, 0.0),
            axis_a: Point::new(1.0, 0.0),
            axis_b: Point::new(0.0, 1.0),
            par_start: 0.0,
            par_end: PI,
        };
        let cmds = tessellate_graph_space(&arc).unwrap();
        match cmds[1] {
            PathCommand::ArcTo { large_arc, .. } => assert!(large_arc),
            _ => unreachable!(),
        }
    }

    #[test]
    fn arc_radii_are_half_the_full_box() {
        let arc = Curve::Arc {
            center: Point::new(5.0, 5.0),
            axis_a: Point::new(3.0, 0.0),
            axis_b: Point::new(0.0, 2.0),
            par_start: 0.0,
            par_end: 1.0,
        };
        let cmds = tessellate_graph_space(&arc).unwrap();
        match cmds[1] {
            PathCommand::ArcTo { radii, .. } => assert_eq!(radii, (3.0, 2.0)),
            _ => unreachable!(),
        }
    }

    #[test]
    fn degenerate_arrow_emits_nothing() {
        let p = Point::new(4.0, 4.0);
        assert!(arrowhead_path(p, p, 2.0).is_none());
        assert!(arrowhead_path(p, p, 0.5).is_none());
        assert!(arrowhead_path(p, Point::new(4.0, 4.0005), 2.0).is_none());
    }

    #[test]
    fn thin_regime_at_exactly_one() {
        let cmds = arrowhead_path(Point::new(0.0, 0.0), Point::new(10.0, 0.0), 1.0).unwrap();
        assert_eq!(cmds.len(), 3);
        assert!(cmds.iter().all(|c| !matches!(c, PathCommand::ArcTo { .. })));
    }

    #[test]
    fn thick_regime_just_above_one() {
        let cmds = arrowhead_path(Point::new(0.0, 0.0), Point::new(10.0, 0.0), 1.0001).unwrap();
        assert_eq!(cmds.len(), 4);
        assert!(matches!(cmds[3], PathCommand::ArcTo { large_arc: false, .. }));
    }

    #[test]
    fn thin_arrow_pulls_the_tip_back() {
        let cmds = arrowhead_path(Point::new(0.0, 0.0), Point::new(10.0, 0.0), 1.0).unwrap();
        match cmds[1] {
            // delta = min(10/2, 1.5) = 1.5, so the spike stops at x = 8.5
            PathCommand::LineTo(p) => assert!((p.x - 8.5).abs() < 1e-12 && p.y.abs() < 1e-12),
            _ => unreachable!(),
        }
    }

    #[test]
    fn thick_arrow_base_uses_half_angle_tangent() {
        let cmds = arrowhead_path(Point::new(0.0, 0.0), Point::new(10.0, 0.0), 4.0).unwrap();
        let expected = 2.0 + 10.0 * HALF_ARROW_ANGLE_TAN;
        match cmds[0] {
            PathCommand::MoveTo(p) => assert!((p.y - expected).abs() < 1e-12),
            _ => unreachable!(),
        }
    }

    #[test]
    fn tessellation_applies_the_view_transform() {
        let c = Curve::Segment(Point::new(0.0, 0.0), Point::new(1.0, 1.0));
        let t = PlaneTransform { scale: 10.0, dx: 5.0, dy: 100.0 };
        let cmds = tessellate(&c, &t).unwrap();
        assert!(matches!(cmds[0], PathCommand::MoveTo(p) if p == Point::new(5.0, 100.0)));
        assert!(matches!(cmds[1], PathCommand::LineTo(p) if p == Point::new(15.0, 90.0)));
    }
}
