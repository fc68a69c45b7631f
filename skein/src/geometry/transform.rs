use super::tolerance::{safe_div, scale_out_of_range};
use crate::model::{Point, Rect};
use serde::{Deserialize, Serialize};

/// Similarity transform from graph space to screen space:
/// `screen = (scale*x + dx, -scale*y + dy)`.
///
/// The y axis flips because graph space is mathematically oriented
/// (up = increasing y) while screens are top-down. The form is closed
/// under inversion, so `inverse()` is a `PlaneTransform` too.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlaneTransform {
    pub scale: f64,
    pub dx: f64,
    pub dy: f64,
}

impl Default for PlaneTransform {
    fn default() -> Self {
        PlaneTransform { scale: 1.0, dx: 0.0, dy: 0.0 }
    }
}

impl PlaneTransform {
    /// Returns `None` when the scale is out of range; an invalid
    /// transform never comes into existence.
    pub fn new(scale: f64, dx: f64, dy: f64) -> Option<PlaneTransform> {
        if scale_out_of_range(scale) {
            None
        } else {
            Some(PlaneTransform { scale, dx, dy })
        }
    }

    pub fn apply(&self, p: Point) -> Point {
        Point::new(self.scale * p.x + self.dx, -self.scale * p.y + self.dy)
    }

    pub fn apply_inverse(&self, p: Point) -> Point {
        Point::new((p.x - self.dx) / self.scale, (self.dy - p.y) / self.scale)
    }

    /// The screen-to-graph transform, in the same form.
    pub fn inverse(&self) -> PlaneTransform {
        PlaneTransform {
            scale: 1.0 / self.scale,
            dx: -self.dx / self.scale,
            dy: self.dy / self.scale,
        }
    }

    /// Uniform scale that fits `content` into `viewport` preserving the
    /// aspect ratio; `1.0` for degenerate content.
    pub fn fit_factor(viewport: (f64, f64), content: Rect) -> f64 {
        let (vw, vh) = viewport;
        let cw = content.width();
        let ch = content.height();
        if cw == 0.0 || ch == 0.0 {
            return 1.0;
        }
        (vw / cw).min(vh / ch)
    }

    /// Offsets such that `center` maps to the middle of the viewport.
    pub fn centering(scale: f64, center: Point, viewport: (f64, f64)) -> PlaneTransform {
        PlaneTransform {
            scale,
            dx: viewport.0 / 2.0 - scale * center.x,
            dy: viewport.1 / 2.0 + scale * center.y,
        }
    }

    /// Pin `graph_point` to `screen_point` keeping the current scale.
    /// This is the pan primitive.
    pub fn pinned(&self, graph_point: Point, screen_point: Point) -> PlaneTransform {
        PlaneTransform {
            scale: self.scale,
            dx: screen_point.x - self.scale * graph_point.x,
            dy: screen_point.y + self.scale * graph_point.y,
        }
    }

    /// Change the scale while keeping the graph point currently under
    /// `anchor_screen` exactly there. Returns `None` for an out-of-range
    /// scale, leaving the decision to keep the old transform to the
    /// caller.
    pub fn zoomed_about(&self, new_scale: f64, anchor_screen: Point) -> Option<PlaneTransform> {
        if scale_out_of_range(new_scale) {
            return None;
        }
        let anchor_graph = self.apply_inverse(anchor_screen);
        Some(PlaneTransform {
            scale: new_scale,
            dx: anchor_screen.x - new_scale * anchor_graph.x,
            dy: anchor_screen.y + new_scale * anchor_graph.y,
        })
    }

    /// Rescale after a viewport resize so the zoom level relative to the
    /// fit factor stays the same.
    pub fn rescaled_for_viewport(
        &self,
        old_viewport: (f64, f64),
        new_viewport: (f64, f64),
        content: Rect,
    ) -> PlaneTransform {
        let old_fit = Self::fit_factor(old_viewport, content);
        let new_fit = Self::fit_factor(new_viewport, content);
        let fraction = safe_div(new_fit, old_fit, 1.0);
        PlaneTransform {
            scale: self.scale * fraction,
            dx: self.dx * fraction,
            dy: self.dy * fraction,
        }
    }
}
