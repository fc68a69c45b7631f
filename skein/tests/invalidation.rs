use skein::geometry::boundary::{node_boundary, NodeShape};
use skein::model::{Curve, DisplayMetrics, EdgeGeometry, Point};
use skein::{GeometryError, Viewer};

fn seeded_viewer() -> Viewer {
    let mut viewer = Viewer::new((800.0, 600.0), DisplayMetrics::default());
    viewer.edit(|scene| {
        for i in 0..4 {
            scene.add_node(
                node_boundary(NodeShape::Box, 20.0, 20.0, Point::new(i as f64 * 60.0, 0.0)),
                None,
                0,
            );
        }
        for i in 0..3u32 {
            let e = scene.add_edge(i, i + 1).unwrap();
            scene.set_edge_geometry(
                e,
                EdgeGeometry {
                    curve: Some(Curve::Segment(
                        Point::new(i as f64 * 60.0 + 10.0, 0.0),
                        Point::new(i as f64 * 60.0 + 50.0, 0.0),
                    )),
                    ..Default::default()
                },
            );
        }
    });
    viewer.set_transform(1.0, 0.0, 300.0);
    viewer
}

#[test]
fn first_pass_is_full() {
    let mut viewer = seeded_viewer();
    viewer
        .with_render_plan(|plan| {
            assert_eq!(plan.last_pass_nodes, 4);
            assert_eq!(plan.last_pass_edges, 3);
        })
        .unwrap();
}

#[test]
fn moving_one_node_retessellates_only_it_and_its_edges() {
    let mut viewer = seeded_viewer();
    viewer.with_render_plan(|_| {}).unwrap();
    viewer.edit(|scene| {
        scene.move_node(1, Point::new(60.0, 40.0));
    });
    viewer
        .with_render_plan(|plan| {
            assert_eq!(plan.last_pass_nodes, 1);
            // both incident edges, nothing else
            assert_eq!(plan.last_pass_edges, 2);
        })
        .unwrap();
}

#[test]
fn unchanged_scene_rebuilds_nothing() {
    let mut viewer = seeded_viewer();
    viewer.with_render_plan(|_| {}).unwrap();
    let first: Vec<_> = viewer
        .with_render_plan(|plan| plan.nodes.clone())
        .unwrap();
    // second access without edits leaves the pass counters untouched
    viewer
        .with_render_plan(|plan| {
            assert_eq!(plan.nodes, first);
        })
        .unwrap();
}

#[test]
fn view_change_forces_a_full_pass() {
    let mut viewer = seeded_viewer();
    viewer.with_render_plan(|_| {}).unwrap();
    viewer.pan_to(Point::new(0.0, 0.0), Point::new(50.0, 50.0));
    viewer
        .with_render_plan(|plan| {
            assert_eq!(plan.last_pass_nodes, 4);
            assert_eq!(plan.last_pass_edges, 3);
        })
        .unwrap();
}

#[test]
fn removal_clears_the_visual_slot() {
    let mut viewer = seeded_viewer();
    viewer.with_render_plan(|_| {}).unwrap();
    viewer.edit(|scene| {
        scene.remove_node(3);
    });
    viewer
        .with_render_plan(|plan| {
            assert!(plan.nodes[3].is_none());
            assert!(plan.edges[2].is_none());
            assert!(plan.nodes[2].is_some());
        })
        .unwrap();
}

#[test]
fn unsupported_composite_aborts_the_pass() {
    let mut viewer = seeded_viewer();
    viewer.with_render_plan(|_| {}).unwrap();
    viewer.edit(|scene| {
        scene.set_edge_geometry(
            0,
            EdgeGeometry {
                curve: Some(Curve::Composite(vec![Curve::Polyline(vec![
                    Point::new(0.0, 0.0),
                    Point::new(10.0, 0.0),
                ])])),
                ..Default::default()
            },
        );
    });
    let err = viewer.with_render_plan(|_| {}).unwrap_err();
    assert_eq!(err, GeometryError::UnsupportedComposite { found: "polyline" });
    // the bad curve keeps failing the next (now full) pass too
    assert!(viewer.with_render_plan(|_| {}).is_err());
    // replacing it with a routable curve recovers
    viewer.edit(|scene| {
        scene.set_edge_geometry(
            0,
            EdgeGeometry {
                curve: Some(Curve::Segment(Point::new(10.0, 0.0), Point::new(50.0, 0.0))),
                ..Default::default()
            },
        );
    });
    viewer
        .with_render_plan(|plan| {
            assert!(plan.edges[0].as_ref().unwrap().curve.is_some());
        })
        .unwrap();
}
