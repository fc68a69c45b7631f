use super::transform::PlaneTransform;
use crate::model::Point;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sweep {
    Clockwise,
    Counterclockwise,
}

/// One renderable drawing instruction. A tessellated curve is a sequence
/// of these, screen-space, starting with a `MoveTo`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum PathCommand {
    MoveTo(Point),
    LineTo(Point),
    CubicTo(Point, Point, Point),
    ArcTo {
        end: Point,
        radii: (f64, f64),
        rotation: f64,
        large_arc: bool,
        sweep: Sweep,
    },
}

impl PathCommand {
    /// Map a graph-space command through the view transform. Radii scale
    /// uniformly; the sweep flag is already expressed in the screen
    /// (SVG, y-down) sense and does not flip.
    pub fn transformed(&self, t: &PlaneTransform) -> PathCommand {
        match *self {
            PathCommand::MoveTo(p) => PathCommand::MoveTo(t.apply(p)),
            PathCommand::LineTo(p) => PathCommand::LineTo(t.apply(p)),
            PathCommand::CubicTo(a, b, c) => {
                PathCommand::CubicTo(t.apply(a), t.apply(b), t.apply(c))
            }
            PathCommand::ArcTo { end, radii, rotation, large_arc, sweep } => PathCommand::ArcTo {
                end: t.apply(end),
                radii: (radii.0 * t.scale, radii.1 * t.scale),
                rotation,
                large_arc,
                sweep,
            },
        }
    }
}

pub fn transform_commands(commands: &[PathCommand], t: &PlaneTransform) -> Vec<PathCommand> {
    commands.iter().map(|c| c.transformed(t)).collect()
}

fn fmt_num(n: f64) -> String {
    // trim the trailing .0 the same way canvas path strings usually do
    if n == n.trunc() && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

/// Emit an SVG path `d` string for a command sequence.
pub fn path_to_svg(commands: &[PathCommand]) -> String {
    let mut d = String::new();
    for cmd in commands {
        if !d.is_empty() {
            d.push(' ');
        }
        match cmd {
            PathCommand::MoveTo(p) => {
                d.push_str(&format!("M {} {}", fmt_num(p.x), fmt_num(p.y)));
            }
            PathCommand::LineTo(p) => {
                d.push_str(&format!("L {} {}", fmt_num(p.x), fmt_num(p.y)));
            }
            PathCommand::CubicTo(a, b, c) => {
                d.push_str(&format!(
                    "C {} {}, {} {}, {} {}",
                    fmt_num(a.x),
                    fmt_num(a.y),
                    fmt_num(b.x),
                    fmt_num(b.y),
                    fmt_num(c.x),
                    fmt_num(c.y)
                ));
            }
            PathCommand::ArcTo { end, radii, rotation, large_arc, sweep } => {
                d.push_str(&format!(
                    "A {} {} {} {} {} {} {}",
                    fmt_num(radii.0),
                    fmt_num(radii.1),
                    fmt_num(rotation.to_degrees()),
                    u8::from(*large_arc),
                    if *sweep == Sweep::Clockwise { 1 } else { 0 },
                    fmt_num(end.x),
                    fmt_num(end.y)
                ));
            }
        }
    }
    d
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn svg_emission_basic() {
        let cmds = [
            PathCommand::MoveTo(Point::new(0.0, 0.0)),
            PathCommand::LineTo(Point::new(10.0, 0.0)),
            PathCommand::CubicTo(
                Point::new(10.0, 5.0),
                Point::new(15.0, 5.0),
                Point::new(15.0, 0.0),
            ),
        ];
        assert_eq!(path_to_svg(&cmds), "M 0 0 L 10 0 C 10 5, 15 5, 15 0");
    }

    #[test]
    fn svg_arc_flags() {
        let cmds = [
            PathCommand::MoveTo(Point::new(0.0, 0.0)),
            PathCommand::ArcTo {
                end: Point::new(4.0, 0.0),
                radii: (2.0, 2.0),
                rotation: 0.0,
                large_arc: true,
                sweep: Sweep::Clockwise,
            },
        ];
        assert_eq!(path_to_svg(&cmds), "M 0 0 A 2 2 0 1 1 4 0");
    }

    #[test]
    fn transform_scales_radii_and_flips_points() {
        let t = PlaneTransform { scale: 2.0, dx: 0.0, dy: 100.0 };
        let arc = PathCommand::ArcTo {
            end: Point::new(1.0, 1.0),
            radii: (3.0, 4.0),
            rotation: 0.0,
            large_arc: false,
            sweep: Sweep::Counterclockwise,
        };
        match arc.transformed(&t) {
            PathCommand::ArcTo { end, radii, sweep, .. } => {
                assert_eq!(end, Point::new(2.0, 98.0));
                assert_eq!(radii, (6.0, 8.0));
                assert_eq!(sweep, Sweep::Counterclockwise);
            }
            _ => unreachable!(),
        }
    }
}
