use chart_facade::api::{ChartProps, Facade, FacadeState};
use chart_facade::charts::process_flow::{SeriesLayout, default_config};
use chart_facade::components::CanvasGeometry;
use chart_facade::core::{Accessor, Partition, Viewport};
use chart_facade::render::{MemorySurface, Region};
use chart_facade::{ChartError, ProcessFlow};
use serde_json::json;

fn two_nodes() -> serde_json::Value {
    json!({"nodes": [{"id": "a", "value": 10}, {"id": "b", "value": 20}], "journeys": []})
}

fn facade(surface: MemorySurface) -> Facade<ProcessFlow, MemorySurface> {
    Facade::new(ProcessFlow, surface, ChartProps::new().with_data(two_nodes())).expect("facade init")
}

fn series_layout(facade: &Facade<ProcessFlow, MemorySurface>) -> SeriesLayout {
    facade
        .state()
        .computed_as::<SeriesLayout>("series")
        .expect("readable")
        .expect("series published")
}

fn canvas_geometry(facade: &Facade<ProcessFlow, MemorySurface>) -> CanvasGeometry {
    facade
        .state()
        .computed_as::<CanvasGeometry>("canvas")
        .expect("readable")
        .expect("canvas published")
}

#[test]
fn construction_does_not_touch_the_surface() {
    let facade = facade(MemorySurface::new());

    assert_eq!(facade.lifecycle(), FacadeState::Constructed);
    assert!(facade.is_dirty());
    assert_eq!(facade.backend().created_count, 0);
    assert!(facade.state().snapshot().computed().is_empty());
}

#[test]
fn two_node_scenario_sizes_are_proportional_to_values() {
    let mut facade = facade(MemorySurface::new());
    facade.draw().expect("draw");

    let canvas = canvas_geometry(&facade);
    assert_eq!(canvas.width, 500.0);
    assert_eq!(canvas.height, 1000.0);

    let layout = series_layout(&facade);
    let keys: Vec<&str> = layout.node_layout.keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["a", "b"]);
    let a = &layout.node_layout["a"];
    let b = &layout.node_layout["b"];
    assert!((b.size / a.size - 2.0).abs() <= 1e-9);
    for node in [a, b] {
        assert!(node.x + node.size / 2.0 <= canvas.width);
        assert!(node.y + node.size / 2.0 <= canvas.height);
        assert!(node.x - node.size / 2.0 >= 0.0);
        assert!(node.y - node.size / 2.0 >= 0.0);
    }
    assert_eq!(facade.lifecycle(), FacadeState::Drawn);
    assert!(!facade.is_dirty());
}

#[test]
fn repeated_draw_is_idempotent_and_reuses_regions() {
    let mut facade = facade(MemorySurface::new());
    let first_root = facade.draw().expect("first draw");
    let first_series = facade.element_for("series").expect("series region");
    let first_computed = facade.state().snapshot().computed().to_value_map();
    let created = facade.backend().created_count;

    let second_root = facade.draw().expect("second draw");
    let second_series = facade.element_for("series").expect("series region");

    assert!(Region::ptr_eq(&first_root, &second_root));
    assert!(Region::ptr_eq(&first_series, &second_series));
    assert_eq!(facade.state().snapshot().computed().to_value_map(), first_computed);
    assert_eq!(facade.backend().created_count, created);
}

#[test]
fn redraw_after_update_rerenders_same_regions() {
    let mut facade = facade(MemorySurface::new());
    facade.draw().expect("draw");
    let series = facade.element_for("series").expect("series region");
    let created = facade.backend().created_count;

    facade
        .update(ChartProps::new().with_option("maxNodeSize", 60))
        .expect("update");
    assert_eq!(facade.lifecycle(), FacadeState::Ready);
    facade.draw().expect("redraw");

    assert!(Region::ptr_eq(&series, &facade.element_for("series").expect("series")));
    assert_eq!(facade.backend().created_count, created);
    assert_eq!(series_layout(&facade).node_layout["b"].size, 60.0);
    let recorded = facade
        .backend()
        .region_named("canvas/series")
        .map(|region| region.render_count)
        .expect("series region recorded");
    assert_eq!(recorded, 2);
}

#[test]
fn updates_without_draw_keep_last_value_per_key() {
    let mut facade = facade(MemorySurface::new());
    facade
        .update(ChartProps::new().with_option("width", 600))
        .expect("update width");
    facade
        .update(ChartProps::new().with_option("height", 300))
        .expect("update height");
    facade
        .update(ChartProps::new().with_option("width", 700))
        .expect("update width again");

    let snapshot = facade.state().snapshot();
    assert_eq!(snapshot.config().get("width"), Some(&json!(700)));
    assert_eq!(snapshot.config().get("height"), Some(&json!(300)));
    assert_eq!(snapshot.config().get("nodeColor"), Some(&json!("#1f77b4")));
    assert_eq!(snapshot.data()["nodes"].as_array().map(Vec::len), Some(2));
    assert!(facade.is_dirty());
}

#[test]
fn single_override_leaves_every_other_default_untouched() {
    let mut facade = facade(MemorySurface::new());
    facade
        .update(ChartProps::new().with_option("nodeColor", "#ff0000"))
        .expect("update");
    facade.draw().expect("draw");

    let snapshot = facade.state().snapshot();
    let config = snapshot.config();
    for (key, value) in default_config().iter() {
        if key == "nodeColor" {
            assert_eq!(config.get(key), Some(&json!("#ff0000")));
        } else {
            assert_eq!(config.get(key), Some(value), "default `{key}` changed");
        }
    }
}

#[test]
fn resize_rescales_layout_and_keeps_data() {
    let data = json!({
        "nodes": [{"id": "a", "value": 10}, {"id": "b", "value": 20}],
        "journeys": [{"path": ["a", "b"], "size": 3}]
    });
    let mut facade = Facade::new(
        ProcessFlow,
        MemorySurface::with_container_size(400, 400),
        ChartProps::new().with_data(data),
    )
    .expect("facade init");
    facade.draw().expect("draw");
    let before = series_layout(&facade);
    let data_before = facade.state().snapshot();

    facade
        .backend_mut()
        .set_container_size(Some(Viewport::new(800, 400)));
    facade.resize().expect("resize");

    let canvas = canvas_geometry(&facade);
    assert_eq!(canvas.width, 800.0);
    let after = series_layout(&facade);
    for (id, node) in &before.node_layout {
        assert!((after.node_layout[id].x - node.x * 2.0).abs() <= 1e-9);
        assert!((after.node_layout[id].y - node.y).abs() <= 1e-9);
    }
    let data_after = facade.state().snapshot();
    assert!(data_after.shares_partition_with(&data_before, Partition::Data));
    assert!(data_after.shares_partition_with(&data_before, Partition::Accessors));
    assert_eq!(facade.lifecycle(), FacadeState::Drawn);
}

#[test]
fn resize_after_update_recomputes_canvas_and_applies_pending_data() {
    let mut facade = Facade::new(
        ProcessFlow,
        MemorySurface::with_container_size(400, 400),
        ChartProps::new().with_data(two_nodes()),
    )
    .expect("facade init");
    facade.draw().expect("draw");
    facade
        .update(
            ChartProps::new()
                .with_data(json!({"nodes": [
                    {"id": "a", "value": 10},
                    {"id": "b", "value": 20},
                    {"id": "c", "value": 40}
                ]}))
                .with_option("nodeColor", "#ff0000"),
        )
        .expect("update");

    facade
        .backend_mut()
        .set_container_size(Some(Viewport::new(800, 800)));
    facade.resize().expect("resize");

    let canvas = canvas_geometry(&facade);
    assert_eq!((canvas.width, canvas.height), (800.0, 800.0));
    let layout = series_layout(&facade);
    assert_eq!(layout.node_layout.len(), 3);
    assert!(!facade.is_dirty());
    let backend = facade.backend();
    let scene = &backend.region_named("canvas/series").expect("series").scene;
    assert_eq!(scene.rects.len(), 3);
    assert!(scene.rects.iter().all(|rect| rect.fill.red == 1.0 && rect.fill.blue == 0.0));
}

#[test]
fn resize_before_first_draw_is_deferred() {
    let mut facade = facade(MemorySurface::new());
    facade.resize().expect("resize");

    assert_eq!(facade.lifecycle(), FacadeState::Constructed);
    assert!(facade.is_dirty());
    assert_eq!(facade.backend().created_count, 0);
}

#[test]
fn closed_facade_rejects_every_operation() {
    let mut facade = facade(MemorySurface::new());
    facade.draw().expect("draw");
    facade.close().expect("close");

    assert_eq!(facade.lifecycle(), FacadeState::Closed);
    assert!(matches!(
        facade.update(ChartProps::new()),
        Err(ChartError::FacadeClosed)
    ));
    assert!(matches!(facade.draw(), Err(ChartError::FacadeClosed)));
    assert!(matches!(facade.resize(), Err(ChartError::FacadeClosed)));
    assert!(matches!(facade.close(), Err(ChartError::FacadeClosed)));
    assert!(matches!(facade.element_for("series"), Err(ChartError::FacadeClosed)));
    assert!(matches!(facade.snapshot(), Err(ChartError::FacadeClosed)));
}

#[test]
fn close_releases_regions_listeners_and_handlers() {
    let mut facade = facade(MemorySurface::new());
    let root = facade.draw().expect("draw");
    let bus = facade.events().clone();
    assert!(bus.owner_count("focus") > 0);
    assert!(facade.backend().listener_count() > 0);

    facade.close().expect("close");

    assert_eq!(facade.backend().live_region_count(), 0);
    assert_eq!(facade.backend().listener_count(), 0);
    assert_eq!(bus.owner_count("focus"), 0);
    let delivered = bus
        .emit("node:hover", &json!({"id": "a", "x": 1.0, "y": 2.0}))
        .expect("emit on released bus");
    assert_eq!(delivered, 0);
    assert!(matches!(
        root.render(Default::default()),
        Err(ChartError::HandleClosed)
    ));
}

#[test]
fn accessor_failure_aborts_draw_without_touching_regions() {
    let mut facade = facade(MemorySurface::new());
    facade.draw().expect("draw");
    let series = facade.element_for("series").expect("series region");
    let scene_before = series.scene();
    let renders_before = facade
        .backend()
        .region_named("canvas/series")
        .map(|region| region.render_count);

    facade
        .update(ChartProps::new().with_data(json!({
            "nodes": [{"id": "a", "value": 1}, {"id": "b"}]
        })))
        .expect("update");
    let err = facade.draw().expect_err("missing value");

    assert!(matches!(
        err,
        ChartError::DataAccessError { ref role, index: 1, .. } if role == "node.value"
    ));
    assert_eq!(series.scene(), scene_before);
    assert_eq!(
        facade
            .backend()
            .region_named("canvas/series")
            .map(|region| region.render_count),
        renders_before
    );
    assert_eq!(facade.lifecycle(), FacadeState::Ready);
    assert!(facade.is_dirty());
}

#[test]
fn custom_accessors_replace_defaults_role_by_role() {
    let data = json!({"steps": [{"key": "x", "weight": 2}, {"key": "y", "weight": 6}]});
    let props = ChartProps::new()
        .with_data(data)
        .with_accessor("data.nodes", Accessor::field("steps"))
        .with_accessor("node.id", Accessor::field("key"))
        .with_accessor("node.value", Accessor::field("weight"));
    let mut facade =
        Facade::new(ProcessFlow, MemorySurface::new(), props).expect("facade init");

    facade.draw().expect("draw");

    let layout = series_layout(&facade);
    assert!((layout.node_layout["y"].size / layout.node_layout["x"].size - 3.0).abs() <= 1e-9);
}

#[test]
fn element_for_before_draw_is_a_lifecycle_error() {
    let facade = facade(MemorySurface::new());
    assert!(matches!(
        facade.element_for("series"),
        Err(ChartError::InvalidLifecycle { state: "constructed", .. })
    ));
}

#[test]
fn generated_uids_are_unique_per_facade() {
    let first = facade(MemorySurface::new());
    let second = facade(MemorySurface::new());

    assert_ne!(first.uid(), second.uid());
    for uid in [first.uid(), second.uid()] {
        let suffix = uid.strip_prefix("processflow").expect("visualization prefix");
        assert!(suffix.parse::<u64>().is_ok(), "uid `{uid}` lacks a numeric suffix");
    }
    assert_eq!(
        first.state().snapshot().config().get("uid"),
        Some(&json!(first.uid()))
    );

    let named = Facade::new(
        ProcessFlow,
        MemorySurface::new(),
        ChartProps::new().with_option("uid", "flow-7"),
    )
    .expect("facade init");
    assert_eq!(named.uid(), "flow-7");
}

#[test]
fn zero_event_depth_is_rejected() {
    let result = Facade::new(
        ProcessFlow,
        MemorySurface::new(),
        ChartProps::new().with_option("maxEventDepth", 0),
    );
    assert!(matches!(result, Err(ChartError::InvalidData(_))));
}
