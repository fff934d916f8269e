use indexmap::IndexMap;
use serde_json::Value;
use tracing::debug;

use crate::core::AccessorTable;
use crate::error::{ChartError, ChartResult};

/// Accessor roles read by the process-flow chart.
pub mod roles {
    pub const NODES: &str = "data.nodes";
    pub const JOURNEYS: &str = "data.journeys";
    pub const NODE_ID: &str = "node.id";
    pub const NODE_VALUE: &str = "node.value";
    pub const NODE_LABEL: &str = "node.label";
    pub const JOURNEY_PATH: &str = "journey.path";
    pub const JOURNEY_SIZE: &str = "journey.size";
}

#[derive(Debug, Clone, PartialEq)]
pub struct FlowNode {
    pub id: String,
    pub label: String,
    pub value: f64,
    /// Position in the caller's node list; final tie-breaker for ordering.
    pub index: usize,
    /// Largest position the node takes in any journey path; 0 when unused.
    pub rank: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FlowLink {
    pub source: usize,
    pub target: usize,
    pub value: f64,
}

/// Accessor-evaluated view of the raw data. Holds no geometry.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProcessFlowModel {
    pub nodes: Vec<FlowNode>,
    pub links: Vec<FlowLink>,
}

impl ProcessFlowModel {
    pub fn from_data(data: &Value, accessors: &AccessorTable) -> ChartResult<Self> {
        let raw_nodes = accessors.evaluate_array(roles::NODES, 0, data)?;
        let raw_journeys = accessors.evaluate_array(roles::JOURNEYS, 0, data)?;

        let mut nodes = Vec::with_capacity(raw_nodes.len());
        let mut by_id: IndexMap<String, usize> = IndexMap::with_capacity(raw_nodes.len());
        for (index, element) in raw_nodes.iter().enumerate() {
            let id = accessors.evaluate_key(roles::NODE_ID, index, element)?;
            let value = accessors.evaluate_f64(roles::NODE_VALUE, index, element)?;
            if value < 0.0 {
                return Err(ChartError::DataAccessError {
                    role: roles::NODE_VALUE.to_owned(),
                    index,
                    reason: format!("node value must be >= 0, got {value}"),
                });
            }
            let label = match accessors.get(roles::NODE_LABEL) {
                Some(_) => match accessors.evaluate(roles::NODE_LABEL, index, element)? {
                    Value::String(text) if !text.is_empty() => text,
                    Value::Number(number) => number.to_string(),
                    _ => id.clone(),
                },
                None => id.clone(),
            };
            if by_id.insert(id.clone(), index).is_some() {
                return Err(ChartError::InvalidData(format!("duplicate node id `{id}`")));
            }
            nodes.push(FlowNode {
                id,
                label,
                value,
                index,
                rank: 0,
            });
        }

        let mut link_values: IndexMap<(usize, usize), f64> = IndexMap::new();
        for (journey, element) in raw_journeys.iter().enumerate() {
            let path = accessors.evaluate_array(roles::JOURNEY_PATH, journey, element)?;
            let size = accessors.evaluate_f64(roles::JOURNEY_SIZE, journey, element)?;
            if size < 0.0 {
                return Err(ChartError::DataAccessError {
                    role: roles::JOURNEY_SIZE.to_owned(),
                    index: journey,
                    reason: format!("journey size must be >= 0, got {size}"),
                });
            }

            let mut steps = Vec::with_capacity(path.len());
            for (position, step) in path.iter().enumerate() {
                let id = match step {
                    Value::String(text) => text.clone(),
                    Value::Number(number) => number.to_string(),
                    other => {
                        return Err(ChartError::InvalidData(format!(
                            "journey {journey} has a non-id step {other}"
                        )));
                    }
                };
                let node = by_id.get(&id).copied().ok_or_else(|| {
                    ChartError::InvalidData(format!(
                        "journey {journey} references unknown node `{id}`"
                    ))
                })?;
                if let Some(flow_node) = nodes.get_mut(node) {
                    flow_node.rank = flow_node.rank.max(position);
                }
                steps.push(node);
            }

            for pair in steps.windows(2) {
                let &[source, target] = pair else { continue };
                if source == target {
                    debug!(journey, step = source, "skipping self-loop step");
                    continue;
                }
                *link_values.entry((source, target)).or_insert(0.0) += size;
            }
        }

        let links: Vec<FlowLink> = link_values
            .into_iter()
            .map(|((source, target), value)| FlowLink {
                source,
                target,
                value,
            })
            .collect();

        Ok(Self { nodes, links })
    }

    #[must_use]
    pub fn rank_count(&self) -> usize {
        self.nodes.iter().map(|node| node.rank + 1).max().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::ProcessFlowModel;
    use crate::charts::process_flow::default_accessors;
    use crate::error::ChartError;

    #[test]
    fn journeys_accumulate_link_values_and_ranks() {
        let data = json!({
            "nodes": [
                {"id": "a", "value": 10},
                {"id": "b", "value": 5},
                {"id": "c", "value": 5}
            ],
            "journeys": [
                {"path": ["a", "b", "c"], "size": 2},
                {"path": ["a", "b"], "size": 3}
            ]
        });

        let model = ProcessFlowModel::from_data(&data, &default_accessors()).expect("model");

        assert_eq!(model.links.len(), 2);
        assert_eq!(model.links[0].value, 5.0);
        assert_eq!(model.links[1].value, 2.0);
        let ranks: Vec<usize> = model.nodes.iter().map(|n| n.rank).collect();
        assert_eq!(ranks, vec![0, 1, 2]);
        assert_eq!(model.rank_count(), 3);
    }

    #[test]
    fn revisited_node_takes_its_deepest_position() {
        let data = json!({
            "nodes": [{"id": "a", "value": 1}, {"id": "b", "value": 1}, {"id": "idle", "value": 1}],
            "journeys": [{"path": ["a", "b", "a"], "size": 1}]
        });

        let model = ProcessFlowModel::from_data(&data, &default_accessors()).expect("model");

        let ranks: Vec<usize> = model.nodes.iter().map(|n| n.rank).collect();
        assert_eq!(ranks, vec![2, 1, 0]);
        assert_eq!(model.links.len(), 2);
    }

    #[test]
    fn unknown_journey_node_is_rejected() {
        let data = json!({
            "nodes": [{"id": "a", "value": 1}],
            "journeys": [{"path": ["a", "ghost"], "size": 1}]
        });

        let err = ProcessFlowModel::from_data(&data, &default_accessors()).expect_err("ghost");
        assert!(matches!(err, ChartError::InvalidData(msg) if msg.contains("ghost")));
    }

    #[test]
    fn duplicate_node_ids_are_rejected() {
        let data = json!({"nodes": [{"id": "a", "value": 1}, {"id": "a", "value": 2}]});
        assert!(ProcessFlowModel::from_data(&data, &default_accessors()).is_err());
    }

    #[test]
    fn negative_value_names_the_element() {
        let data = json!({"nodes": [{"id": "a", "value": 1}, {"id": "b", "value": -2}]});
        let err = ProcessFlowModel::from_data(&data, &default_accessors()).expect_err("negative");
        assert!(matches!(err, ChartError::DataAccessError { index: 1, .. }));
    }

    #[test]
    fn label_falls_back_to_id() {
        let data = json!({"nodes": [{"id": 7, "value": 1}, {"id": "b", "value": 1, "label": "Bee"}]});
        let model = ProcessFlowModel::from_data(&data, &default_accessors()).expect("model");
        assert_eq!(model.nodes[0].label, "7");
        assert_eq!(model.nodes[1].label, "Bee");
    }
}
