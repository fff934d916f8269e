use chart_facade::charts::process_flow::{
    LayoutParams, ProcessFlowModel, compute_layout, default_accessors, default_config,
};
use chart_facade::components::CanvasGeometry;
use chart_facade::core::{Margins, Point, Viewport};
use criterion::{Criterion, criterion_group, criterion_main};
use serde_json::{Value, json};
use std::hint::black_box;

fn flow_data(nodes: usize, journeys: usize, depth: usize) -> Value {
    let nodes_json: Vec<Value> = (0..nodes)
        .map(|i| json!({"id": format!("n{i}"), "value": (i * 37) % 101 + 1}))
        .collect();
    let journeys_json: Vec<Value> = (0..journeys)
        .map(|j| {
            let path: Vec<String> = (0..depth)
                .map(|step| format!("n{}", (j * 7 + step * 13) % nodes))
                .collect();
            json!({"path": path, "size": j % 5 + 1})
        })
        .collect();
    json!({"nodes": nodes_json, "journeys": journeys_json})
}

fn canvas() -> CanvasGeometry {
    CanvasGeometry {
        width: 1920.0,
        height: 1080.0,
        margins: Margins::default(),
        origin: Point::new(0.0, 0.0),
        container: Viewport::new(1920, 1080),
    }
}

fn bench_model_from_data_500(c: &mut Criterion) {
    let data = flow_data(500, 2_000, 6);
    let accessors = default_accessors();

    c.bench_function("process_flow_model_500_nodes", |b| {
        b.iter(|| {
            let _ = ProcessFlowModel::from_data(black_box(&data), black_box(&accessors))
                .expect("model should build");
        })
    });
}

fn bench_layout_500(c: &mut Criterion) {
    let data = flow_data(500, 2_000, 6);
    let model = ProcessFlowModel::from_data(&data, &default_accessors()).expect("model");
    let params = LayoutParams::from_config(&default_config()).expect("params");
    let canvas = canvas();

    c.bench_function("process_flow_layout_500_nodes", |b| {
        b.iter(|| {
            let _ = compute_layout(black_box(&model), black_box(&canvas), black_box(&params))
                .expect("layout should succeed");
        })
    });
}

criterion_group!(benches, bench_model_from_data_500, bench_layout_500);
criterion_main!(benches);
