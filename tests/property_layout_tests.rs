use chart_facade::api::{ChartProps, Facade};
use chart_facade::charts::process_flow::SeriesLayout;
use chart_facade::components::CanvasGeometry;
use chart_facade::render::MemorySurface;
use chart_facade::ProcessFlow;
use proptest::prelude::*;
use serde_json::{Value, json};

fn flow_data(values: &[u16], journeys: &[Vec<usize>]) -> Value {
    let nodes: Vec<Value> = values
        .iter()
        .enumerate()
        .map(|(i, v)| json!({"id": format!("n{i}"), "value": v}))
        .collect();
    let journeys: Vec<Value> = journeys
        .iter()
        .map(|path| {
            let ids: Vec<String> = path
                .iter()
                .map(|step| format!("n{}", step % values.len()))
                .collect();
            json!({"path": ids, "size": path.len()})
        })
        .collect();
    json!({"nodes": nodes, "journeys": journeys})
}

fn draw(data: Value, width: u32, height: u32, sort: &str) -> (CanvasGeometry, SeriesLayout) {
    let mut facade = Facade::new(
        ProcessFlow,
        MemorySurface::with_container_size(width, height),
        ChartProps::new().with_data(data).with_option("nodeSort", sort),
    )
    .expect("facade init");
    facade.draw().expect("draw");
    let state = facade.state();
    (
        state.computed_as("canvas").expect("canvas").expect("published"),
        state.computed_as("series").expect("series").expect("published"),
    )
}

proptest! {
    #[test]
    fn nodes_stay_inside_canvas_and_scale_with_value(
        values in prop::collection::vec(1u16..1_000, 1..12),
        journeys in prop::collection::vec(prop::collection::vec(0usize..12, 0..5), 0..6),
        width in 120u32..1_600,
        height in 120u32..1_600,
        sort in prop_oneof![Just("none"), Just("value-asc"), Just("value-desc"), Just("id")]
    ) {
        let (canvas, layout) = draw(flow_data(&values, &journeys), width, height, sort);

        prop_assert_eq!(layout.node_layout.len(), values.len());
        for node in layout.node_layout.values() {
            prop_assert!(node.x >= 0.0 && node.x <= canvas.width);
            prop_assert!(node.y >= 0.0 && node.y <= canvas.height);
            prop_assert!(node.size >= 0.0 && node.size <= 120.0 + 1e-9);
        }
        let mut by_value: Vec<(u16, f64)> = values
            .iter()
            .enumerate()
            .map(|(i, v)| (*v, layout.node_layout[&format!("n{i}")].size))
            .collect();
        by_value.sort_by(|a, b| a.0.cmp(&b.0));
        for pair in by_value.windows(2) {
            prop_assert!(pair[0].1 <= pair[1].1 + 1e-9);
        }
        for link in &layout.link_layout {
            prop_assert!(link.width >= 1.0 - 1e-9 && link.width <= 8.0 + 1e-9);
        }
    }

    #[test]
    fn layout_is_reproducible_for_identical_input(
        values in prop::collection::vec(0u16..50, 1..10),
        journeys in prop::collection::vec(prop::collection::vec(0usize..10, 0..4), 0..4)
    ) {
        let data = flow_data(&values, &journeys);
        let (_, first) = draw(data.clone(), 640, 480, "value-desc");
        let (_, second) = draw(data, 640, 480, "value-desc");
        prop_assert_eq!(first, second);
    }
}
