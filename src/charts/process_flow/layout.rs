use std::cmp::Reverse;

use indexmap::IndexMap;
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::components::CanvasGeometry;
use crate::core::{ChartConfig, LinearScale};
use crate::error::{ChartError, ChartResult};

use super::model::ProcessFlowModel;

/// Within-column node ordering. Ties always fall back to data order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum NodeSort {
    #[default]
    None,
    ValueAsc,
    ValueDesc,
    Id,
}

impl NodeSort {
    #[must_use]
    pub fn from_option(value: &str) -> Self {
        match value {
            "none" => Self::None,
            "value-asc" => Self::ValueAsc,
            "value-desc" => Self::ValueDesc,
            "id" => Self::Id,
            other => {
                warn!(node_sort = other, "unknown nodeSort, keeping data order");
                Self::None
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutParams {
    pub min_node_size: f64,
    pub max_node_size: f64,
    pub min_link_width: f64,
    pub max_link_width: f64,
    pub sort: NodeSort,
}

impl LayoutParams {
    pub fn from_config(config: &ChartConfig) -> ChartResult<Self> {
        let params = Self {
            min_node_size: config.f64_or("minNodeSize", 4.0),
            max_node_size: config.f64_or("maxNodeSize", 120.0),
            min_link_width: config.f64_or("minLinkWidth", 1.0),
            max_link_width: config.f64_or("maxLinkWidth", 8.0),
            sort: NodeSort::from_option(config.str_or("nodeSort", "none")),
        };
        if params.min_node_size < 0.0 || params.min_node_size > params.max_node_size {
            return Err(ChartError::InvalidData(
                "node sizes must satisfy 0 <= minNodeSize <= maxNodeSize".to_owned(),
            ));
        }
        if params.min_link_width <= 0.0 || params.min_link_width > params.max_link_width {
            return Err(ChartError::InvalidData(
                "link widths must satisfy 0 < minLinkWidth <= maxLinkWidth".to_owned(),
            ));
        }
        Ok(params)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeLayout {
    pub id: String,
    pub label: String,
    pub value: f64,
    pub rank: usize,
    pub row: usize,
    /// Centre in canvas-local coordinates.
    pub x: f64,
    pub y: f64,
    /// Centre in container coordinates (local + canvas origin).
    pub screen_x: f64,
    pub screen_y: f64,
    /// Diameter in pixels.
    pub size: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkLayout {
    pub source: String,
    pub target: String,
    pub value: f64,
    pub width: f64,
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

/// Published under `computed.series`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesLayout {
    pub node_layout: IndexMap<String, NodeLayout>,
    pub link_layout: Vec<LinkLayout>,
}

/// Deterministic column layout: one column per rank, nodes stacked and
/// vertically centred within their column.
pub fn compute_layout(
    model: &ProcessFlowModel,
    canvas: &CanvasGeometry,
    params: &LayoutParams,
) -> ChartResult<SeriesLayout> {
    let rank_count = model.rank_count();
    if rank_count == 0 {
        return Ok(SeriesLayout::default());
    }

    let mut columns: Vec<Vec<usize>> = vec![Vec::new(); rank_count];
    for (position, node) in model.nodes.iter().enumerate() {
        if let Some(column) = columns.get_mut(node.rank) {
            column.push(position);
        }
    }
    for column in &mut columns {
        sort_column(column, model, params.sort);
    }

    let max_population = columns.iter().map(Vec::len).max().unwrap_or(1).max(1);
    let column_width = canvas.width / rank_count as f64;
    let row_height = canvas.height / max_population as f64;
    let extent = params.max_node_size.min(column_width).min(row_height);
    let floor = params.min_node_size.min(extent);
    let max_value = model
        .nodes
        .iter()
        .map(|node| node.value)
        .fold(0.0_f64, f64::max);

    let mut placed: Vec<Option<NodeLayout>> = vec![None; model.nodes.len()];
    for (rank, column) in columns.iter().enumerate() {
        let offset = (max_population - column.len()) as f64 * row_height / 2.0;
        for (row, &position) in column.iter().enumerate() {
            let Some(node) = model.nodes.get(position) else {
                continue;
            };
            let proportional = if max_value > 0.0 {
                node.value / max_value * extent
            } else {
                0.0
            };
            let x = column_width * (rank as f64 + 0.5);
            let y = offset + row_height * (row as f64 + 0.5);
            if let Some(slot) = placed.get_mut(position) {
                *slot = Some(NodeLayout {
                    id: node.id.clone(),
                    label: node.label.clone(),
                    value: node.value,
                    rank,
                    row,
                    x,
                    y,
                    screen_x: x + canvas.origin.x,
                    screen_y: y + canvas.origin.y,
                    size: proportional.max(floor),
                });
            }
        }
    }

    let max_link = model
        .links
        .iter()
        .map(|link| link.value)
        .fold(0.0_f64, f64::max);
    let width_scale = if max_link > 0.0 {
        Some(LinearScale::new(
            0.0,
            max_link,
            params.min_link_width,
            params.max_link_width,
        )?)
    } else {
        None
    };

    let mut link_layout = Vec::with_capacity(model.links.len());
    for link in &model.links {
        let (Some(Some(source)), Some(Some(target))) =
            (placed.get(link.source), placed.get(link.target))
        else {
            continue;
        };
        let width = match width_scale {
            Some(scale) => scale.map(link.value)?,
            None => params.min_link_width,
        };
        link_layout.push(LinkLayout {
            source: source.id.clone(),
            target: target.id.clone(),
            value: link.value,
            width,
            x1: source.x,
            y1: source.y,
            x2: target.x,
            y2: target.y,
        });
    }

    // Data order, not column order, so consumers see the caller's sequence.
    let node_layout = placed
        .into_iter()
        .flatten()
        .map(|node| (node.id.clone(), node))
        .collect();

    Ok(SeriesLayout {
        node_layout,
        link_layout,
    })
}

/// `sort_by_key` is stable, so equal keys keep data order.
fn sort_column(column: &mut [usize], model: &ProcessFlowModel, sort: NodeSort) {
    let value_of = |position: &usize| {
        OrderedFloat(model.nodes.get(*position).map_or(0.0, |node| node.value))
    };
    match sort {
        NodeSort::None => column.sort_by_key(|position| {
            model.nodes.get(*position).map_or(usize::MAX, |node| node.index)
        }),
        NodeSort::ValueAsc => column.sort_by_key(value_of),
        NodeSort::ValueDesc => column.sort_by_key(|position| Reverse(value_of(position))),
        NodeSort::Id => column.sort_by(|a, b| {
            let id = |position: &usize| model.nodes.get(*position).map(|node| node.id.as_str());
            id(a).cmp(&id(b))
        }),
    }
}
