//! Process-flow chart: nodes placed in columns by journey position, links
//! weighted by the journeys that cross them.

mod focus;
mod layout;
mod model;
mod series;

pub use focus::Focus;
pub use layout::{
    LayoutParams, LinkLayout, NodeLayout, NodeSort, SeriesLayout, compute_layout,
};
pub use model::{FlowLink, FlowNode, ProcessFlowModel, roles};
pub use series::Series;

use serde_json::{Value, json};

use crate::api::ChartKind;
use crate::components::ComponentContext;
use crate::core::{Accessor, AccessorTable, ChartConfig};
use crate::error::ChartResult;

pub const VISUALIZATION_NAME: &str = "processflow";

/// Every option the process-flow chart understands, with its default.
///
/// `uid` is absent: the facade generates one per instance.
#[must_use]
pub fn default_config() -> ChartConfig {
    ChartConfig::new()
        .with("duration", 1000)
        .with("height", 1000)
        .with("width", 500)
        .with("highlightColor", "#0000ff")
        .with("labelOffset", 5)
        .with("labelPadding", 5)
        .with("linkStroke", "#aaaaaa")
        .with("maxLinkWidth", 8)
        .with("minLinkWidth", 1)
        .with("maxNodeSize", 120)
        .with("minNodeSize", 4)
        .with("nodeBorderWidth", 10)
        .with("nodeColor", "#1f77b4")
        .with("showLinkFocusLabels", true)
        .with("showNodeFocusLabels", true)
        .with("visualizationName", VISUALIZATION_NAME)
        .with("marginTop", 0)
        .with("marginRight", 0)
        .with("marginBottom", 0)
        .with("marginLeft", 0)
        .with("nodeSort", "none")
        .with("maxEventDepth", 16)
        .with("fontSize", 11)
}

/// Accessors for `{nodes: [{id, value, label?}], journeys: [{path, size?}]}`.
#[must_use]
pub fn default_accessors() -> AccessorTable {
    AccessorTable::new()
        .with(roles::NODES, Accessor::field_or("nodes", json!([])))
        .with(roles::JOURNEYS, Accessor::field_or("journeys", json!([])))
        .with(roles::NODE_ID, Accessor::field("id"))
        .with(roles::NODE_VALUE, Accessor::field("value"))
        .with(roles::NODE_LABEL, Accessor::field_or("label", Value::Null))
        .with(roles::JOURNEY_PATH, Accessor::field("path"))
        .with(roles::JOURNEY_SIZE, Accessor::field_or("size", json!(1)))
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessFlow;

impl ChartKind for ProcessFlow {
    type Series = Series;
    type Focus = Focus;

    fn visualization_name(&self) -> &'static str {
        VISUALIZATION_NAME
    }

    fn default_config(&self) -> ChartConfig {
        default_config()
    }

    fn default_accessors(&self) -> AccessorTable {
        default_accessors()
    }

    fn default_data(&self) -> Value {
        json!({"nodes": [], "journeys": []})
    }

    fn create_series(&self, context: ComponentContext) -> ChartResult<Series> {
        Ok(Series::new(context))
    }

    fn create_focus(&self, context: ComponentContext) -> ChartResult<Focus> {
        Focus::new(context)
    }
}
