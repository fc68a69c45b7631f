use crate::error;
use crate::interop::{arr_f64, new_obj, set_kv};
use crate::Viewer;
use js_sys::Array;
use skein::geometry::boundary::{boundary_from_label, node_boundary, NodeShape};
use skein::geometry::path::path_to_svg;
use skein::geometry::tolerance::{MAX_SCALE, MIN_SCALE};
use skein::layout::LayoutOutput;
use skein::model::{EdgeGeometry, EdgeLabel, Point};
use wasm_bindgen::prelude::*;
type JsValue = wasm_bindgen::JsValue;

#[wasm_bindgen]
pub fn set_panic_hook() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

fn shape_of(shape: u8, radius: f64) -> Option<NodeShape> {
    match shape {
        0 => Some(NodeShape::Box),
        1 => Some(NodeShape::RoundedBox { radius }),
        2 => Some(NodeShape::Ellipse),
        _ => None,
    }
}

#[wasm_bindgen]
impl Viewer {
    #[wasm_bindgen(constructor)]
    pub fn new(width: f64, height: f64, dpi_x: f64, dpi_y: f64) -> Viewer {
        crate::Viewer::rs_new(width, height, dpi_x, dpi_y)
    }
    pub fn geom_version(&self) -> u64 {
        self.rs_geom_version()
    }
    pub fn view_version(&self) -> u64 {
        self.inner.view_version()
    }

    // Nodes
    pub fn add_node(&mut self, shape: u8, width: f64, height: f64, radius: f64, cx: f64, cy: f64, z: i32) -> u32 {
        let shape = shape_of(shape, radius).unwrap_or(NodeShape::Box);
        let boundary = node_boundary(shape, width, height, Point::new(cx, cy));
        self.inner.edit(|scene| scene.add_node(boundary, None, z))
    }
    pub fn add_node_res(&mut self, shape: u8, width: f64, height: f64, radius: f64, cx: f64, cy: f64, z: i32) -> JsValue {
        for (name, v) in [("width", width), ("height", height), ("radius", radius), ("cx", cx), ("cy", cy)] {
            if !v.is_finite() {
                return error::non_finite(name);
            }
        }
        let Some(shape) = shape_of(shape, radius) else {
            return error::invalid_shape(shape);
        };
        let boundary = node_boundary(shape, width, height, Point::new(cx, cy));
        let id = self.inner.edit(|scene| scene.add_node(boundary, None, z));
        error::ok(JsValue::from_f64(id as f64))
    }
    /// Size the node from a measured label instead of an explicit box.
    pub fn add_node_from_label(
        &mut self,
        shape: u8,
        radius: f64,
        label_w: Option<f64>,
        label_h: Option<f64>,
        margin: f64,
        min_w: f64,
        min_h: f64,
        cx: f64,
        cy: f64,
        z: i32,
    ) -> u32 {
        let shape = shape_of(shape, radius).unwrap_or(NodeShape::Box);
        let label = label_w.zip(label_h);
        let boundary = boundary_from_label(shape, label, margin, min_w, min_h, Point::new(cx, cy));
        self.inner.edit(|scene| scene.add_node(boundary, None, z))
    }
    pub fn move_node(&mut self, id: u32, cx: f64, cy: f64) -> bool {
        self.inner.edit(|scene| scene.move_node(id, Point::new(cx, cy)))
    }
    pub fn move_node_res(&mut self, id: u32, cx: f64, cy: f64) -> JsValue {
        if !cx.is_finite() {
            return error::non_finite("cx");
        }
        if !cy.is_finite() {
            return error::non_finite("cy");
        }
        if self.inner.scene().node(id).is_none() {
            return error::invalid_id("node", id);
        }
        let ok = self.inner.edit(|scene| scene.move_node(id, Point::new(cx, cy)));
        error::ok(JsValue::from_bool(ok))
    }
    pub fn remove_node(&mut self, id: u32) -> bool {
        self.inner.edit(|scene| scene.remove_node(id))
    }
    pub fn remove_node_res(&mut self, id: u32) -> JsValue {
        if self.inner.scene().node(id).is_none() {
            return error::invalid_id("node", id);
        }
        error::ok(JsValue::from_bool(self.inner.edit(|scene| scene.remove_node(id))))
    }
    pub fn set_node_z(&mut self, id: u32, z: i32) -> bool {
        self.inner.edit(|scene| scene.set_node_z(id, z))
    }
    pub fn node_count(&self) -> u32 {
        self.inner.scene().node_count()
    }

    // Edges
    pub fn add_edge(&mut self, a: u32, b: u32) -> Option<u32> {
        self.inner.edit(|scene| scene.add_edge(a, b))
    }
    pub fn add_edge_res(&mut self, a: u32, b: u32) -> JsValue {
        if self.inner.scene().node(a).is_none() {
            return error::invalid_id("node", a);
        }
        if self.inner.scene().node(b).is_none() {
            return error::invalid_id("node", b);
        }
        match self.inner.edit(|scene| scene.add_edge(a, b)) {
            Some(eid) => error::ok(JsValue::from_f64(eid as f64)),
            None => error::err("invalid_edge", "failed to add edge", None),
        }
    }
    pub fn remove_edge(&mut self, id: u32) -> bool {
        self.inner.edit(|scene| scene.remove_edge(id))
    }
    pub fn remove_edge_res(&mut self, id: u32) -> JsValue {
        if self.inner.scene().edge(id).is_none() {
            return error::invalid_id("edge", id);
        }
        error::ok(JsValue::from_bool(self.inner.edit(|scene| scene.remove_edge(id))))
    }
    pub fn set_edge_z(&mut self, id: u32, z: i32) -> bool {
        self.inner.edit(|scene| scene.set_edge_z(id, z))
    }
    pub fn edge_count(&self) -> u32 {
        self.inner.scene().edge_count()
    }

    /// Replace an edge's routed geometry with a serialized
    /// `EdgeGeometry` value.
    pub fn set_edge_geometry(&mut self, id: u32, geometry: JsValue) -> bool {
        match serde_wasm_bindgen::from_value::<EdgeGeometry>(geometry) {
            Ok(g) => self.inner.edit(|scene| scene.set_edge_geometry(id, g)),
            Err(_) => false,
        }
    }
    pub fn set_edge_geometry_res(&mut self, id: u32, geometry: JsValue) -> JsValue {
        if self.inner.scene().edge(id).is_none() {
            return error::invalid_id("edge", id);
        }
        match serde_wasm_bindgen::from_value::<EdgeGeometry>(geometry) {
            Ok(g) => {
                if !g.is_well_formed() {
                    return error::malformed_curve();
                }
                let ok = self.inner.edit(|scene| scene.set_edge_geometry(id, g));
                error::ok(JsValue::from_bool(ok))
            }
            Err(e) => error::err("json_parse", format!("{}", e), None),
        }
    }
    /// Same as `set_edge_geometry` but from a JSON string, for hosts
    /// that already have the route serialized.
    pub fn set_edge_geometry_json(&mut self, id: u32, geometry: &str) -> bool {
        match serde_json::from_str::<EdgeGeometry>(geometry) {
            Ok(g) => self.inner.edit(|scene| scene.set_edge_geometry(id, g)),
            Err(_) => false,
        }
    }
    pub fn set_edge_label(&mut self, id: u32, cx: f64, cy: f64, width: f64, height: f64) -> bool {
        let label = EdgeLabel { center: Point::new(cx, cy), width, height };
        self.inner.edit(|scene| scene.set_edge_label(id, Some(label)))
    }
    pub fn clear_edge_label(&mut self, id: u32) -> bool {
        self.inner.edit(|scene| scene.set_edge_label(id, None))
    }

    // View
    pub fn set_transform(&mut self, scale: f64, dx: f64, dy: f64) -> bool {
        self.inner.set_transform(scale, dx, dy)
    }
    pub fn set_transform_res(&mut self, scale: f64, dx: f64, dy: f64) -> JsValue {
        for (name, v) in [("scale", scale), ("dx", dx), ("dy", dy)] {
            if !v.is_finite() {
                return error::non_finite(name);
            }
        }
        if !self.inner.set_transform(scale, dx, dy) {
            return error::out_of_range("scale", MIN_SCALE, MAX_SCALE, scale);
        }
        error::ok(JsValue::TRUE)
    }
    pub fn transform(&self) -> JsValue {
        let t = self.inner.transform();
        let obj = new_obj();
        set_kv(&obj, "scale", &JsValue::from_f64(t.scale));
        set_kv(&obj, "dx", &JsValue::from_f64(t.dx));
        set_kv(&obj, "dy", &JsValue::from_f64(t.dy));
        obj.into()
    }
    pub fn zoom(&mut self, factor: f64, anchor_x: f64, anchor_y: f64) -> bool {
        self.inner.set_zoom_factor(factor, Point::new(anchor_x, anchor_y))
    }
    pub fn zoom_res(&mut self, factor: f64, anchor_x: f64, anchor_y: f64) -> JsValue {
        for (name, v) in [("factor", factor), ("anchor_x", anchor_x), ("anchor_y", anchor_y)] {
            if !v.is_finite() {
                return error::non_finite(name);
            }
        }
        if !self.inner.set_zoom_factor(factor, Point::new(anchor_x, anchor_y)) {
            let scale = factor * self.inner.fit_factor();
            return error::out_of_range("scale", MIN_SCALE, MAX_SCALE, scale);
        }
        error::ok(JsValue::TRUE)
    }
    pub fn pan(&mut self, graph_x: f64, graph_y: f64, screen_x: f64, screen_y: f64) {
        self.inner.pan_to(Point::new(graph_x, graph_y), Point::new(screen_x, screen_y));
    }
    pub fn fit(&mut self) {
        self.inner.fit_graph();
    }
    pub fn resize(&mut self, width: f64, height: f64) {
        self.inner.resize_viewport(width, height);
    }
    pub fn zoom_factor(&self) -> f64 {
        self.inner.zoom_factor()
    }
    pub fn fit_factor(&self) -> f64 {
        self.inner.fit_factor()
    }
    pub fn screen_to_graph(&self, x: f64, y: f64) -> js_sys::Float64Array {
        let p = self.inner.transform().apply_inverse(Point::new(x, y));
        arr_f64(&[p.x, p.y])
    }
    pub fn graph_to_screen(&self, x: f64, y: f64) -> js_sys::Float64Array {
        let p = self.inner.transform().apply(Point::new(x, y));
        arr_f64(&[p.x, p.y])
    }

    // Inch-based sizing
    pub fn hit_tolerance(&self) -> f64 {
        self.inner.hit_tolerance()
    }
    pub fn path_thickness(&self) -> f64 {
        self.inner.path_thickness()
    }
    pub fn dash_size(&self) -> f64 {
        self.inner.dash_size()
    }

    // Picking
    pub fn pick(&self, x: f64, y: f64) -> JsValue {
        let Some(p) = self.inner.pick(Point::new(x, y)) else {
            return JsValue::NULL;
        };
        let obj = new_obj();
        match p {
            skein::Pick::Node { id, dist } => {
                set_kv(&obj, "kind", &JsValue::from_str("node"));
                set_kv(&obj, "id", &JsValue::from_f64(id as f64));
                set_kv(&obj, "dist", &JsValue::from_f64(dist));
            }
            skein::Pick::Label { edge, dist } => {
                set_kv(&obj, "kind", &JsValue::from_str("label"));
                set_kv(&obj, "edge", &JsValue::from_f64(edge as f64));
                set_kv(&obj, "dist", &JsValue::from_f64(dist));
            }
            skein::Pick::Edge { id, t, dist } => {
                set_kv(&obj, "kind", &JsValue::from_str("edge"));
                set_kv(&obj, "id", &JsValue::from_f64(id as f64));
                set_kv(&obj, "t", &JsValue::from_f64(t));
                set_kv(&obj, "dist", &JsValue::from_f64(dist));
            }
        }
        obj.into()
    }
    pub fn pick_res(&self, x: f64, y: f64) -> JsValue {
        if !x.is_finite() {
            return error::non_finite("x");
        }
        if !y.is_finite() {
            return error::non_finite("y");
        }
        error::ok(self.pick(x, y))
    }

    /// Tessellate the whole scene into SVG path strings:
    /// `{ nodes: [{id, d}], edges: [{id, d, sourceArrow?, targetArrow?}] }`.
    pub fn render_paths(&mut self) -> JsValue {
        let built = self.inner.with_render_plan(|plan| {
            let nodes = Array::new();
            for (i, n) in plan.nodes.iter().enumerate() {
                if let Some(n) = n {
                    let obj = new_obj();
                    set_kv(&obj, "id", &JsValue::from_f64(i as f64));
                    set_kv(&obj, "d", &JsValue::from_str(&path_to_svg(&n.boundary)));
                    nodes.push(&obj.into());
                }
            }
            let edges = Array::new();
            for (i, e) in plan.edges.iter().enumerate() {
                if let Some(e) = e {
                    let obj = new_obj();
                    set_kv(&obj, "id", &JsValue::from_f64(i as f64));
                    if let Some(curve) = &e.curve {
                        set_kv(&obj, "d", &JsValue::from_str(&path_to_svg(curve)));
                    }
                    if let Some(a) = &e.source_arrow {
                        set_kv(&obj, "sourceArrow", &JsValue::from_str(&path_to_svg(a)));
                    }
                    if let Some(a) = &e.target_arrow {
                        set_kv(&obj, "targetArrow", &JsValue::from_str(&path_to_svg(a)));
                    }
                    edges.push(&obj.into());
                }
            }
            let root = new_obj();
            set_kv(&root, "nodes", &nodes.into());
            set_kv(&root, "edges", &edges.into());
            JsValue::from(root)
        });
        match built {
            Ok(v) => v,
            Err(err) => {
                web_sys::console::warn_1(&JsValue::from_str(&err.to_string()));
                JsValue::NULL
            }
        }
    }
    pub fn render_paths_res(&mut self) -> JsValue {
        let v = self.render_paths();
        if v.is_null() {
            // rerun to surface the variant name in the error payload
            match self.inner.with_render_plan(|_| ()) {
                Err(skein::GeometryError::UnsupportedComposite { found }) => {
                    error::unsupported_curve(found.to_string())
                }
                Ok(()) => error::ok(JsValue::NULL),
            }
        } else {
            error::ok(v)
        }
    }

    // Layout results computed elsewhere (a worker, typically) fold back
    // in as a serialized `LayoutOutput`.
    pub fn apply_layout(&mut self, output: JsValue) -> bool {
        match serde_wasm_bindgen::from_value::<LayoutOutput>(output) {
            Ok(out) => self.inner.edit(|scene| scene.apply_layout(&out)),
            Err(_) => false,
        }
    }
    pub fn apply_layout_res(&mut self, output: JsValue) -> JsValue {
        match serde_wasm_bindgen::from_value::<LayoutOutput>(output) {
            Ok(out) => {
                if self.inner.edit(|scene| scene.apply_layout(&out)) {
                    error::ok(JsValue::TRUE)
                } else {
                    error::malformed_curve()
                }
            }
            Err(e) => error::err("json_parse", format!("{}", e), None),
        }
    }
    pub fn layout_input(&self) -> JsValue {
        serde_wasm_bindgen::to_value(&self.inner.scene().layout_input())
            .unwrap_or(JsValue::NULL)
    }

    pub fn content_bounds(&self) -> JsValue {
        match self.inner.scene().content_bounds() {
            Some(r) => serde_wasm_bindgen::to_value(&r).unwrap_or(JsValue::NULL),
            None => JsValue::NULL,
        }
    }

    pub fn clear(&mut self) {
        self.inner.edit(|scene| scene.clear());
    }

    // JSON persistence
    pub fn to_json(&self) -> JsValue {
        serde_wasm_bindgen::to_value(&self.inner.scene().to_json_value())
            .unwrap_or(JsValue::NULL)
    }
    pub fn from_json(&mut self, v: JsValue) -> bool {
        match serde_wasm_bindgen::from_value::<serde_json::Value>(v) {
            Ok(val) => self.inner.edit(|scene| scene.from_json_value(val)),
            Err(_) => false,
        }
    }
    pub fn from_json_res(&mut self, v: JsValue) -> JsValue {
        match serde_wasm_bindgen::from_value::<serde_json::Value>(v) {
            Ok(val) => {
                if self.inner.edit(|scene| scene.from_json_value(val)) {
                    error::ok(JsValue::TRUE)
                } else {
                    error::err("invalid_document", "scene document was rejected", None)
                }
            }
            Err(e) => error::err("json_parse", format!("{}", e), None),
        }
    }
}
