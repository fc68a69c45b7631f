pub mod model;
pub mod layout;
pub mod geometry {
    pub mod boundary;
    pub mod flatten;
    pub mod math;
    pub mod path;
    pub mod tessellate;
    pub mod tolerance;
    pub mod transform;
}
pub mod algorithms {
    pub mod picking;
}

pub use algorithms::picking::Pick;
pub use geometry::tessellate::GeometryError;

use geometry::flatten::curve_bbox;
use geometry::path::PathCommand;
use geometry::tessellate::{tessellate, tessellate_arrowhead};
use geometry::tolerance::{clamp, DASH_SIZE_INCHES, MAX_SCALE, MIN_SCALE, PATH_THICKNESS_INCHES};
use geometry::transform::PlaneTransform;
use layout::{
    LayoutBusy, LayoutDriver, LayoutEngine, LayoutHandle, LayoutInput, LayoutOutcome, LayoutOutput,
};
use model::{
    Curve, DisplayMetrics, Edge, EdgeGeometry, EdgeId, EdgeLabel, Node, NodeId, Point, Rect,
};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, warn};

#[derive(Clone, Debug, Default)]
pub struct DirtyState {
    pub since_ver: u64,
    pub nodes_added: HashSet<NodeId>,
    pub nodes_removed: HashSet<NodeId>,
    pub nodes_moved: HashSet<NodeId>,
    pub edges_added: HashSet<EdgeId>,
    pub edges_removed: HashSet<EdgeId>,
    pub edges_modified: HashSet<EdgeId>,
    pub bbox: Option<Rect>,
    pub full: bool,
}

/// The displayed graph: nodes with boundary curves plus edges with
/// routed geometry, both produced by the layout engine and replaced
/// wholesale when it re-runs.
///
/// Entities live in slot vectors; an id is its index for the life of
/// the scene and removal leaves a hole rather than shifting ids.
pub struct Scene {
    pub(crate) nodes: Vec<Option<Node>>,
    pub(crate) edges: Vec<Option<Edge>>,
    pub(crate) dirty: DirtyState,
    pub(crate) geom_ver: u64,
}

impl Default for Scene {
    fn default() -> Self {
        Scene::new()
    }
}

impl Scene {
    pub fn new() -> Scene {
        Scene {
            nodes: Vec::new(),
            edges: Vec::new(),
            dirty: DirtyState { since_ver: 1, ..Default::default() },
            geom_ver: 1,
        }
    }

    pub fn geom_version(&self) -> u64 {
        self.geom_ver
    }

    fn bump(&mut self) {
        self.geom_ver = self.geom_ver.wrapping_add(1);
    }

    fn expand_dirty_bbox(&mut self, r: Rect) {
        self.dirty.bbox = Some(match self.dirty.bbox {
            Some(b) => b.union(r),
            None => r,
        });
    }

    pub(crate) fn clear_dirty_flags(&mut self) {
        self.dirty = DirtyState { since_ver: self.geom_ver, ..Default::default() };
    }

    fn mark_full_dirty(&mut self) {
        self.dirty.full = true;
        self.dirty.bbox = None;
    }

    // Nodes

    pub fn add_node(&mut self, boundary: Curve, label: Option<String>, z: i32) -> NodeId {
        let id = self.nodes.len() as NodeId;
        let bbox = curve_bbox(&boundary);
        self.nodes.push(Some(Node { center: bbox.center(), boundary, label, z }));
        self.dirty.nodes_added.insert(id);
        self.expand_dirty_bbox(bbox);
        self.bump();
        id
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id as usize).and_then(|n| n.as_ref())
    }

    /// Translate a node, carrying its boundary along. Edges touching it
    /// keep their routed geometry until the next layout pass.
    pub fn move_node(&mut self, id: NodeId, center: Point) -> bool {
        if !center.x.is_finite() || !center.y.is_finite() {
            return false;
        }
        let old_bbox = {
            let Some(Some(n)) = self.nodes.get_mut(id as usize) else {
                return false;
            };
            let old = curve_bbox(&n.boundary);
            let d = center.sub(n.center);
            n.boundary = n.boundary.translated(d);
            n.center = center;
            old
        };
        self.dirty.nodes_moved.insert(id);
        for (eid, e) in self.edges.iter().enumerate() {
            if let Some(e) = e {
                if e.a == id || e.b == id {
                    self.dirty.edges_modified.insert(eid as EdgeId);
                }
            }
        }
        self.expand_dirty_bbox(old_bbox);
        if let Some(Some(n)) = self.nodes.get(id as usize) {
            let new_bbox = curve_bbox(&n.boundary);
            self.expand_dirty_bbox(new_bbox);
        }
        self.bump();
        true
    }

    pub fn set_node_boundary(&mut self, id: NodeId, boundary: Curve) -> bool {
        let bbox = curve_bbox(&boundary);
        {
            let Some(Some(n)) = self.nodes.get_mut(id as usize) else {
                return false;
            };
            let old = curve_bbox(&n.boundary);
            n.boundary = boundary;
            n.center = bbox.center();
            self.dirty.bbox = Some(match self.dirty.bbox {
                Some(b) => b.union(old),
                None => old,
            });
        }
        self.dirty.nodes_moved.insert(id);
        self.expand_dirty_bbox(bbox);
        self.bump();
        true
    }

    pub fn set_node_z(&mut self, id: NodeId, z: i32) -> bool {
        if let Some(Some(n)) = self.nodes.get_mut(id as usize) {
            n.z = z;
            true
        } else {
            false
        }
    }

    /// Removing a node drops its incident edges as well.
    pub fn remove_node(&mut self, id: NodeId) -> bool {
        let bbox = match self.nodes.get(id as usize).and_then(|n| n.as_ref()) {
            Some(n) => curve_bbox(&n.boundary),
            None => return false,
        };
        let incident: Vec<usize> = self
            .edges
            .iter()
            .enumerate()
            .filter(|(_, e)| e.as_ref().is_some_and(|e| e.a == id || e.b == id))
            .map(|(i, _)| i)
            .collect();
        self.nodes[id as usize] = None;
        for eid in incident {
            if let Some(e) = self.edges[eid].take() {
                if let Some(curve) = &e.geometry.curve {
                    self.expand_dirty_bbox(curve_bbox(curve));
                }
            }
            self.dirty.edges_removed.insert(eid as EdgeId);
        }
        self.dirty.nodes_removed.insert(id);
        self.expand_dirty_bbox(bbox);
        self.bump();
        true
    }

    pub fn node_count(&self) -> u32 {
        self.nodes.iter().filter(|n| n.is_some()).count() as u32
    }

    // Edges

    /// Endpoints must exist; self-edges are allowed and routed like any
    /// other edge by the layout engine.
    pub fn add_edge(&mut self, a: NodeId, b: NodeId) -> Option<EdgeId> {
        if self.node(a).is_none() || self.node(b).is_none() {
            return None;
        }
        let id = self.edges.len() as EdgeId;
        self.edges.push(Some(Edge {
            a,
            b,
            geometry: EdgeGeometry::default(),
            label: None,
            z: 0,
        }));
        self.dirty.edges_added.insert(id);
        self.bump();
        Some(id)
    }

    pub fn edge(&self, id: EdgeId) -> Option<&Edge> {
        self.edges.get(id as usize).and_then(|e| e.as_ref())
    }

    /// Malformed geometry (see `Curve::is_well_formed`) is rejected and
    /// the edge keeps its current route.
    pub fn set_edge_geometry(&mut self, id: EdgeId, geometry: EdgeGeometry) -> bool {
        if !geometry.is_well_formed() {
            warn!(edge = id, "rejected malformed edge geometry");
            return false;
        }
        let old_bbox = {
            let Some(Some(e)) = self.edges.get_mut(id as usize) else {
                return false;
            };
            let old = e.geometry.curve.as_ref().map(curve_bbox);
            e.geometry = geometry;
            old
        };
        if let Some(b) = old_bbox {
            self.expand_dirty_bbox(b);
        }
        if let Some(curve) = self.edges[id as usize].as_ref().and_then(|e| e.geometry.curve.clone())
        {
            self.expand_dirty_bbox(curve_bbox(&curve));
        }
        self.dirty.edges_modified.insert(id);
        self.bump();
        true
    }

    pub fn set_edge_label(&mut self, id: EdgeId, label: Option<EdgeLabel>) -> bool {
        if let Some(Some(e)) = self.edges.get_mut(id as usize) {
            e.label = label;
            self.dirty.edges_modified.insert(id);
            self.bump();
            true
        } else {
            false
        }
    }

    pub fn set_edge_z(&mut self, id: EdgeId, z: i32) -> bool {
        if let Some(Some(e)) = self.edges.get_mut(id as usize) {
            e.z = z;
            true
        } else {
            false
        }
    }

    pub fn remove_edge(&mut self, id: EdgeId) -> bool {
        let Some(slot) = self.edges.get_mut(id as usize) else {
            return false;
        };
        let Some(e) = slot.take() else { return false };
        if let Some(curve) = &e.geometry.curve {
            self.expand_dirty_bbox(curve_bbox(curve));
        }
        self.dirty.edges_removed.insert(id);
        self.bump();
        true
    }

    pub fn edge_count(&self) -> u32 {
        self.edges.iter().filter(|e| e.is_some()).count() as u32
    }

    /// Union of every node boundary and routed edge curve; `None` for an
    /// empty scene.
    pub fn content_bounds(&self) -> Option<Rect> {
        let mut acc: Option<Rect> = None;
        let mut take = |r: Rect| {
            acc = Some(match acc {
                Some(b) => b.union(r),
                None => r,
            });
        };
        for n in self.nodes.iter().flatten() {
            take(curve_bbox(&n.boundary));
        }
        for e in self.edges.iter().flatten() {
            if let Some(curve) = &e.geometry.curve {
                take(curve_bbox(curve));
            }
        }
        acc
    }

    /// Snapshot handed to the layout engine: node sizes and edge
    /// endpoints, nothing about current placement.
    pub fn layout_input(&self) -> LayoutInput {
        let mut input = LayoutInput::default();
        for (i, n) in self.nodes.iter().enumerate() {
            if let Some(n) = n {
                let b = curve_bbox(&n.boundary);
                input.nodes.push(layout::LayoutNode {
                    id: i as NodeId,
                    width: b.width(),
                    height: b.height(),
                });
            }
        }
        for (i, e) in self.edges.iter().enumerate() {
            if let Some(e) = e {
                input.edges.push(layout::LayoutEdge { id: i as EdgeId, a: e.a, b: e.b });
            }
        }
        input
    }

    /// Replace placement and routing with a completed layout pass.
    /// Output carrying malformed curves is rejected wholesale and the
    /// scene left untouched.
    pub fn apply_layout(&mut self, output: &LayoutOutput) -> bool {
        for (id, geometry) in &output.edge_geometry {
            if !geometry.is_well_formed() {
                warn!(edge = *id, "rejected layout output: malformed edge curve");
                return false;
            }
        }
        for &(id, center) in &output.node_centers {
            let Some(Some(n)) = self.nodes.get_mut(id as usize) else {
                continue;
            };
            let d = center.sub(n.center);
            n.boundary = n.boundary.translated(d);
            n.center = center;
            self.dirty.nodes_moved.insert(id);
        }
        for (id, geometry) in &output.edge_geometry {
            if let Some(Some(e)) = self.edges.get_mut(*id as usize) {
                e.geometry = geometry.clone();
                self.dirty.edges_modified.insert(*id);
            }
        }
        self.mark_full_dirty();
        self.bump();
        true
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
        self.edges.clear();
        self.mark_full_dirty();
        self.bump();
    }

    // JSON persistence. The slot vectors serialize as-is so ids survive
    // a round trip, holes included.

    pub fn to_json_value(&self) -> serde_json::Value {
        serde_json::to_value(SceneDoc { nodes: &self.nodes, edges: &self.edges })
            .unwrap_or(serde_json::Value::Null)
    }

    /// Replace the whole scene from a serialized document. Rejects (and
    /// leaves the scene untouched) documents whose edges point at
    /// missing nodes or whose curves are malformed.
    pub fn from_json_value(&mut self, v: serde_json::Value) -> bool {
        let doc: SceneDocOwned = match serde_json::from_value(v) {
            Ok(doc) => doc,
            Err(err) => {
                warn!(%err, "rejected scene document");
                return false;
            }
        };
        let node_exists = |id: NodeId| {
            doc.nodes.get(id as usize).map(|n| n.is_some()).unwrap_or(false)
        };
        for n in doc.nodes.iter().flatten() {
            if !n.boundary.is_well_formed() {
                warn!(
                    curve = n.boundary.variant_name(),
                    "rejected scene document: malformed node boundary"
                );
                return false;
            }
        }
        for e in doc.edges.iter().flatten() {
            if !node_exists(e.a) || !node_exists(e.b) {
                warn!(a = e.a, b = e.b, "rejected scene document: dangling edge endpoint");
                return false;
            }
            if !e.geometry.is_well_formed() {
                warn!(a = e.a, b = e.b, "rejected scene document: malformed edge curve");
                return false;
            }
        }
        self.nodes = doc.nodes;
        self.edges = doc.edges;
        self.mark_full_dirty();
        self.bump();
        true
    }
}

#[derive(Serialize)]
struct SceneDoc<'a> {
    nodes: &'a [Option<Node>],
    edges: &'a [Option<Edge>],
}

#[derive(Deserialize)]
struct SceneDocOwned {
    nodes: Vec<Option<Node>>,
    edges: Vec<Option<Edge>>,
}

/// Screen-space path commands for one node.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NodeVisual {
    pub boundary: Vec<PathCommand>,
}

/// Screen-space path commands for one edge: the routed curve plus
/// filled arrowhead shapes where the edge carries them.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EdgeVisual {
    pub curve: Option<Vec<PathCommand>>,
    pub source_arrow: Option<Vec<PathCommand>>,
    pub target_arrow: Option<Vec<PathCommand>>,
}

/// Tessellated mirror of the scene, indexed like the scene's slot
/// vectors. Rebuilt per-entity when geometry changes and wholesale when
/// the view transform changes, since every command is screen-space.
#[derive(Clone, Debug, Default)]
pub struct RenderPlan {
    pub nodes: Vec<Option<NodeVisual>>,
    pub edges: Vec<Option<EdgeVisual>>,
    pub built_geom_ver: u64,
    pub built_view_ver: u64,
    /// Entities retessellated by the most recent pass.
    pub last_pass_nodes: usize,
    pub last_pass_edges: usize,
}

fn node_visual(node: &Node, t: &PlaneTransform) -> Result<NodeVisual, GeometryError> {
    Ok(NodeVisual { boundary: tessellate(&node.boundary, t)? })
}

fn edge_visual(edge: &Edge, t: &PlaneTransform) -> Result<EdgeVisual, GeometryError> {
    let Some(curve) = &edge.geometry.curve else {
        return Ok(EdgeVisual::default());
    };
    let cmds = tessellate(curve, t)?;
    let w = edge.geometry.line_width;
    let source_arrow = edge
        .geometry
        .source_arrowhead
        .and_then(|a| tessellate_arrowhead(curve.start(), a.tip, w, t));
    let target_arrow = edge
        .geometry
        .target_arrowhead
        .and_then(|a| tessellate_arrowhead(curve.end(), a.tip, w, t));
    Ok(EdgeVisual { curve: Some(cmds), source_arrow, target_arrow })
}

fn grow_to<T>(v: &mut Vec<Option<T>>, len: usize) {
    if v.len() < len {
        v.resize_with(len, || None);
    }
}

impl RenderPlan {
    fn build_full(
        scene: &Scene,
        t: &PlaneTransform,
        view_ver: u64,
    ) -> Result<RenderPlan, GeometryError> {
        let mut plan = RenderPlan {
            built_geom_ver: scene.geom_ver,
            built_view_ver: view_ver,
            ..Default::default()
        };
        for n in &scene.nodes {
            plan.nodes.push(match n {
                Some(n) => Some(node_visual(n, t)?),
                None => None,
            });
        }
        for e in &scene.edges {
            plan.edges.push(match e {
                Some(e) => Some(edge_visual(e, t)?),
                None => None,
            });
        }
        plan.last_pass_nodes = plan.nodes.iter().filter(|n| n.is_some()).count();
        plan.last_pass_edges = plan.edges.iter().filter(|e| e.is_some()).count();
        Ok(plan)
    }

    /// Retessellate only the entities the dirty state names.
    fn update_incremental(
        &mut self,
        scene: &Scene,
        t: &PlaneTransform,
    ) -> Result<(), GeometryError> {
        grow_to(&mut self.nodes, scene.nodes.len());
        grow_to(&mut self.edges, scene.edges.len());
        self.last_pass_nodes = 0;
        self.last_pass_edges = 0;
        for &id in &scene.dirty.nodes_removed {
            self.nodes[id as usize] = None;
        }
        for &id in &scene.dirty.edges_removed {
            self.edges[id as usize] = None;
        }
        for &id in scene.dirty.nodes_added.union(&scene.dirty.nodes_moved) {
            if let Some(n) = scene.node(id) {
                self.nodes[id as usize] = Some(node_visual(n, t)?);
                self.last_pass_nodes += 1;
            }
        }
        for &id in scene.dirty.edges_added.union(&scene.dirty.edges_modified) {
            if let Some(e) = scene.edge(id) {
                self.edges[id as usize] = Some(edge_visual(e, t)?);
                self.last_pass_edges += 1;
            }
        }
        self.built_geom_ver = scene.geom_ver;
        Ok(())
    }
}

/// Events pushed to registered observers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ViewerEvent {
    /// The view transform or viewport changed; everything on screen moved.
    ViewChanged,
    /// Scene content changed; the render plan is stale.
    TopologyChanged,
}

/// A scene together with its view state: transform, viewport, display
/// metrics, render-plan cache, and the layout submission gate.
///
/// Observer callbacks make this type display-thread bound; the layout
/// engine is the only part that runs elsewhere.
pub struct Viewer {
    scene: Scene,
    transform: PlaneTransform,
    viewport: (f64, f64),
    metrics: DisplayMetrics,
    view_ver: u64,
    plan: Mutex<Option<RenderPlan>>,
    observers: Vec<Box<dyn FnMut(ViewerEvent)>>,
    driver: LayoutDriver,
}

impl Viewer {
    pub fn new(viewport: (f64, f64), metrics: DisplayMetrics) -> Viewer {
        Viewer::with_layout_mode(viewport, metrics, true)
    }

    /// `run_async = false` runs layout passes inline on submission,
    /// which tests and headless hosts want.
    pub fn with_layout_mode(
        viewport: (f64, f64),
        metrics: DisplayMetrics,
        run_async: bool,
    ) -> Viewer {
        Viewer {
            scene: Scene::new(),
            transform: PlaneTransform::default(),
            viewport,
            metrics,
            view_ver: 1,
            plan: Mutex::new(None),
            observers: Vec::new(),
            driver: LayoutDriver::new(run_async),
        }
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn transform(&self) -> PlaneTransform {
        self.transform
    }

    pub fn viewport(&self) -> (f64, f64) {
        self.viewport
    }

    pub fn metrics(&self) -> DisplayMetrics {
        self.metrics
    }

    pub fn view_version(&self) -> u64 {
        self.view_ver
    }

    pub fn observe(&mut self, f: impl FnMut(ViewerEvent) + 'static) {
        self.observers.push(Box::new(f));
    }

    fn notify(&mut self, event: ViewerEvent) {
        for obs in &mut self.observers {
            obs(event);
        }
    }

    fn bump_view(&mut self) {
        self.view_ver = self.view_ver.wrapping_add(1);
        self.notify(ViewerEvent::ViewChanged);
    }

    /// Mutate the scene through a closure; observers hear about it once,
    /// after the whole edit.
    pub fn edit<R>(&mut self, f: impl FnOnce(&mut Scene) -> R) -> R {
        let before = self.scene.geom_ver;
        let out = f(&mut self.scene);
        if self.scene.geom_ver != before {
            self.notify(ViewerEvent::TopologyChanged);
        }
        out
    }

    /// Set the view transform directly. An out-of-range scale is
    /// rejected and the current transform kept.
    pub fn set_transform(&mut self, scale: f64, dx: f64, dy: f64) -> bool {
        match PlaneTransform::new(scale, dx, dy) {
            Some(t) => {
                self.transform = t;
                self.bump_view();
                true
            }
            None => {
                warn!(scale, "rejected out-of-range view scale");
                false
            }
        }
    }

    /// Scale at which the whole graph exactly fits the viewport.
    pub fn fit_factor(&self) -> f64 {
        match self.scene.content_bounds() {
            Some(content) => PlaneTransform::fit_factor(self.viewport, content),
            None => 1.0,
        }
    }

    /// Zoom relative to the fit factor: `1.0` means the graph exactly
    /// fills the viewport.
    pub fn zoom_factor(&self) -> f64 {
        self.transform.scale / self.fit_factor()
    }

    /// Change the zoom factor keeping the graph point under
    /// `anchor_screen` fixed. Rejected when the resulting scale leaves
    /// the valid range.
    pub fn set_zoom_factor(&mut self, factor: f64, anchor_screen: Point) -> bool {
        let new_scale = factor * self.fit_factor();
        match self.transform.zoomed_about(new_scale, anchor_screen) {
            Some(t) => {
                self.transform = t;
                self.bump_view();
                true
            }
            None => {
                warn!(factor, new_scale, "rejected out-of-range zoom");
                false
            }
        }
    }

    /// Pan so `graph_point` lands on `screen_point`; the scale stays.
    pub fn pan_to(&mut self, graph_point: Point, screen_point: Point) {
        self.transform = self.transform.pinned(graph_point, screen_point);
        self.bump_view();
    }

    /// Fit and center the whole graph in the viewport.
    pub fn fit_graph(&mut self) {
        let (scale, center) = match self.scene.content_bounds() {
            Some(content) => {
                let f = PlaneTransform::fit_factor(self.viewport, content);
                (clamp(f, MIN_SCALE, MAX_SCALE), content.center())
            }
            None => (1.0, Point::new(0.0, 0.0)),
        };
        self.transform = PlaneTransform::centering(scale, center, self.viewport);
        self.bump_view();
    }

    /// Adopt a new viewport size, keeping the zoom factor (not the raw
    /// scale) so the graph occupies the same fraction of the window.
    pub fn resize_viewport(&mut self, width: f64, height: f64) {
        if let Some(content) = self.scene.content_bounds() {
            self.transform =
                self.transform
                    .rescaled_for_viewport(self.viewport, (width, height), content);
        }
        self.viewport = (width, height);
        self.bump_view();
    }

    pub fn pick(&self, screen: Point) -> Option<Pick> {
        algorithms::picking::pick_impl(&self.scene, screen, &self.transform, &self.metrics)
    }

    pub fn hit_tolerance(&self) -> f64 {
        algorithms::picking::hit_tolerance(&self.metrics, self.transform.scale)
    }

    /// Graph-space stroke thickness that renders at a constant physical
    /// width regardless of zoom.
    pub fn path_thickness(&self) -> f64 {
        PATH_THICKNESS_INCHES * self.metrics.dpi_x / self.transform.scale
    }

    /// Graph-space dash period with the same zoom invariance.
    pub fn dash_size(&self) -> f64 {
        DASH_SIZE_INCHES * self.metrics.dpi_x / self.transform.scale
    }

    /// Run `f` against an up-to-date render plan, rebuilding as little
    /// as the version counters allow. A tessellation error clears the
    /// cached plan so nothing half-built survives.
    pub fn with_render_plan<R>(
        &mut self,
        f: impl FnOnce(&RenderPlan) -> R,
    ) -> Result<R, GeometryError> {
        let mut guard = self.plan.lock();
        let needs_full = match guard.as_ref() {
            Some(plan) => plan.built_view_ver != self.view_ver || self.scene.dirty.full,
            None => true,
        };
        if needs_full {
            let plan = match RenderPlan::build_full(&self.scene, &self.transform, self.view_ver) {
                Ok(plan) => plan,
                Err(err) => {
                    *guard = None;
                    return Err(err);
                }
            };
            debug!(
                nodes = plan.last_pass_nodes,
                edges = plan.last_pass_edges,
                "full render pass"
            );
            *guard = Some(plan);
            self.scene.clear_dirty_flags();
        } else if let Some(plan) = guard.as_mut() {
            if plan.built_geom_ver != self.scene.geom_ver {
                if let Err(err) = plan.update_incremental(&self.scene, &self.transform) {
                    *guard = None;
                    return Err(err);
                }
                debug!(
                    nodes = plan.last_pass_nodes,
                    edges = plan.last_pass_edges,
                    "incremental render pass"
                );
                self.scene.clear_dirty_flags();
            }
        }
        match guard.as_ref() {
            Some(plan) => Ok(f(plan)),
            None => unreachable!("a render plan was just built"),
        }
    }

    pub fn under_layout(&self) -> bool {
        self.driver.under_layout()
    }

    /// Kick off a layout pass over the current scene. At most one pass
    /// may be in flight.
    pub fn run_layout<E>(&self, engine: E) -> Result<LayoutHandle, LayoutBusy>
    where
        E: LayoutEngine + Send + 'static,
    {
        self.driver.submit(engine, self.scene.layout_input())
    }

    /// Fold a finished pass back into the scene. A failed pass clears
    /// the scene so the display never shows a half-laid-out graph.
    pub fn apply_layout_outcome(&mut self, outcome: LayoutOutcome) {
        match outcome {
            LayoutOutcome::Completed(output) => {
                if !self.edit(|scene| scene.apply_layout(&output)) {
                    warn!("discarding layout output with malformed curves");
                }
            }
            LayoutOutcome::Canceled => {
                debug!("discarding canceled layout pass");
            }
            LayoutOutcome::Failed(err) => {
                warn!(%err, "layout failed; clearing scene");
                self.edit(|scene| scene.clear());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::boundary::{node_boundary, NodeShape};

    fn box_node(scene: &mut Scene, cx: f64, cy: f64) -> NodeId {
        let b = node_boundary(NodeShape::Box, 20.0, 10.0, Point::new(cx, cy));
        scene.add_node(b, None, 0)
    }

    #[test]
    fn removing_a_node_drops_incident_edges() {
        let mut scene = Scene::new();
        let a = box_node(&mut scene, 0.0, 0.0);
        let b = box_node(&mut scene, 100.0, 0.0);
        let c = box_node(&mut scene, 0.0, 100.0);
        let ab = scene.add_edge(a, b).unwrap();
        let bc = scene.add_edge(b, c).unwrap();
        assert!(scene.remove_node(b));
        assert!(scene.edge(ab).is_none());
        assert!(scene.edge(bc).is_none());
        assert_eq!(scene.edge_count(), 0);
        assert_eq!(scene.node_count(), 2);
    }

    #[test]
    fn edge_requires_existing_endpoints() {
        let mut scene = Scene::new();
        let a = box_node(&mut scene, 0.0, 0.0);
        assert!(scene.add_edge(a, 99).is_none());
        assert!(scene.add_edge(a, a).is_some());
    }

    #[test]
    fn ids_are_stable_across_removal() {
        let mut scene = Scene::new();
        let a = box_node(&mut scene, 0.0, 0.0);
        let b = box_node(&mut scene, 50.0, 0.0);
        scene.remove_node(a);
        let c = box_node(&mut scene, 100.0, 0.0);
        assert_ne!(c, a);
        assert!(scene.node(b).is_some());
        assert!(scene.node(a).is_none());
    }

    #[test]
    fn move_node_translates_boundary() {
        let mut scene = Scene::new();
        let a = box_node(&mut scene, 0.0, 0.0);
        assert!(scene.move_node(a, Point::new(30.0, 40.0)));
        let n = scene.node(a).unwrap();
        assert_eq!(n.center, Point::new(30.0, 40.0));
        let bbox = curve_bbox(&n.boundary);
        assert_eq!(bbox.center(), Point::new(30.0, 40.0));
        assert!(!scene.move_node(a, Point::new(f64::NAN, 0.0)));
    }

    #[test]
    fn content_bounds_covers_nodes_and_edge_curves() {
        let mut scene = Scene::new();
        let a = box_node(&mut scene, 0.0, 0.0);
        let b = box_node(&mut scene, 100.0, 0.0);
        let e = scene.add_edge(a, b).unwrap();
        scene.set_edge_geometry(
            e,
            EdgeGeometry {
                curve: Some(Curve::Segment(Point::new(0.0, 0.0), Point::new(0.0, 300.0))),
                ..Default::default()
            },
        );
        let bounds = scene.content_bounds().unwrap();
        assert_eq!(bounds.top, 300.0);
        assert_eq!(bounds.right, 110.0);
    }

    #[test]
    fn json_round_trip_preserves_slots() {
        let mut scene = Scene::new();
        let a = box_node(&mut scene, 0.0, 0.0);
        let b = box_node(&mut scene, 100.0, 0.0);
        scene.add_edge(a, b);
        scene.remove_node(a);
        let doc = scene.to_json_value();

        let mut restored = Scene::new();
        assert!(restored.from_json_value(doc));
        assert!(restored.node(a).is_none());
        assert!(restored.node(b).is_some());
        assert_eq!(restored.edge_count(), 0);
        assert_eq!(restored.nodes.len(), scene.nodes.len());
    }

    #[test]
    fn dangling_edge_document_is_rejected() {
        let mut scene = Scene::new();
        let a = box_node(&mut scene, 0.0, 0.0);
        let b = box_node(&mut scene, 100.0, 0.0);
        scene.add_edge(a, b);
        let mut doc = scene.to_json_value();
        doc["nodes"][b as usize] = serde_json::Value::Null;

        let mut restored = Scene::new();
        let before = restored.geom_version();
        assert!(!restored.from_json_value(doc));
        assert_eq!(restored.node_count(), 0);
        assert_eq!(restored.geom_version(), before);
    }

    #[test]
    fn malformed_curve_document_is_rejected() {
        let mut scene = Scene::new();
        let a = box_node(&mut scene, 0.0, 0.0);
        let mut doc = scene.to_json_value();
        doc["nodes"][a as usize]["boundary"] = serde_json::json!({ "Polyline": [] });

        let mut restored = Scene::new();
        assert!(!restored.from_json_value(doc));
        assert!(restored.content_bounds().is_none());

        let mut scene = Scene::new();
        let a = box_node(&mut scene, 0.0, 0.0);
        let b = box_node(&mut scene, 100.0, 0.0);
        scene.add_edge(a, b);
        let mut doc = scene.to_json_value();
        doc["edges"][0]["geometry"]["curve"] = serde_json::json!({ "Composite": [] });
        assert!(!restored.from_json_value(doc));
        assert_eq!(restored.edge_count(), 0);
    }

    #[test]
    fn malformed_edge_geometry_keeps_the_current_route() {
        let mut scene = Scene::new();
        let a = box_node(&mut scene, 0.0, 0.0);
        let b = box_node(&mut scene, 100.0, 0.0);
        let e = scene.add_edge(a, b).unwrap();
        let before = scene.geom_version();
        let bad = EdgeGeometry {
            curve: Some(Curve::Polyline(vec![Point::new(0.0, 0.0)])),
            ..Default::default()
        };
        assert!(!scene.set_edge_geometry(e, bad));
        assert_eq!(scene.geom_version(), before);
        assert!(scene.edge(e).unwrap().geometry.curve.is_none());
    }

    #[test]
    fn layout_output_with_malformed_curve_is_rejected() {
        let mut scene = Scene::new();
        let a = box_node(&mut scene, 0.0, 0.0);
        let b = box_node(&mut scene, 100.0, 0.0);
        let e = scene.add_edge(a, b).unwrap();
        let output = LayoutOutput {
            node_centers: vec![(a, Point::new(500.0, 0.0))],
            edge_geometry: vec![(
                e,
                EdgeGeometry {
                    curve: Some(Curve::Composite(Vec::new())),
                    ..Default::default()
                },
            )],
        };
        assert!(!scene.apply_layout(&output));
        assert_eq!(scene.node(a).unwrap().center, Point::new(0.0, 0.0));
        assert!(scene.edge(e).unwrap().geometry.curve.is_none());
    }

    #[test]
    fn viewer_rejects_invalid_transform_silently() {
        let mut viewer = Viewer::new((800.0, 600.0), DisplayMetrics::default());
        assert!(viewer.set_transform(2.0, 1.0, 1.0));
        let before = viewer.transform();
        assert!(!viewer.set_transform(1e9, 0.0, 0.0));
        assert_eq!(viewer.transform(), before);
        assert!(!viewer.set_transform(f64::NAN, 0.0, 0.0));
        assert_eq!(viewer.transform(), before);
    }

    #[test]
    fn observers_hear_view_and_topology_changes() {
        use std::cell::RefCell;
        use std::rc::Rc;
        let events: Rc<RefCell<Vec<ViewerEvent>>> = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&events);
        let mut viewer = Viewer::new((800.0, 600.0), DisplayMetrics::default());
        viewer.observe(move |e| sink.borrow_mut().push(e));
        viewer.set_transform(2.0, 0.0, 0.0);
        viewer.edit(|scene| {
            box_node(scene, 0.0, 0.0);
        });
        viewer.edit(|_| {});
        assert_eq!(
            *events.borrow(),
            vec![ViewerEvent::ViewChanged, ViewerEvent::TopologyChanged]
        );
    }

    #[test]
    fn failed_layout_clears_the_scene() {
        let mut viewer = Viewer::new((800.0, 600.0), DisplayMetrics::default());
        viewer.edit(|scene| {
            box_node(scene, 0.0, 0.0);
        });
        viewer.apply_layout_outcome(LayoutOutcome::Failed(layout::LayoutError::Engine(
            "boom".into(),
        )));
        assert_eq!(viewer.scene().node_count(), 0);
    }

    #[test]
    fn zoom_factor_is_relative_to_fit() {
        let mut viewer = Viewer::new((200.0, 100.0), DisplayMetrics::default());
        viewer.edit(|scene| {
            let b = node_boundary(NodeShape::Box, 100.0, 100.0, Point::new(50.0, 50.0));
            scene.add_node(b, None, 0);
        });
        viewer.fit_graph();
        assert!((viewer.zoom_factor() - 1.0).abs() < 1e-12);
        assert!(viewer.set_zoom_factor(2.0, Point::new(100.0, 50.0)));
        assert!((viewer.zoom_factor() - 2.0).abs() < 1e-12);
    }

    #[test]
    fn path_thickness_shrinks_with_zoom() {
        let mut viewer = Viewer::new((800.0, 600.0), DisplayMetrics::default());
        viewer.set_transform(1.0, 0.0, 0.0);
        let at_one = viewer.path_thickness();
        assert!((at_one - 0.016 * 96.0).abs() < 1e-12);
        viewer.set_transform(4.0, 0.0, 0.0);
        assert!((viewer.path_thickness() - at_one / 4.0).abs() < 1e-12);
    }
}
