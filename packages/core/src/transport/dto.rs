//! JSON shapes exchanged with flowchart editors
//!
//! Inbound and outbound payloads share one shape:
//!
//! ```json
//! {
//!   "title": "Onboarding",
//!   "key": "onboarding",
//!   "nodes": [
//!     { "id": "0", "type": "input", "data": { "label": "Start" },
//!       "position": { "x": 0, "y": 0 }, "width": 150, "height": 40,
//!       "selected": false, "positionAbsolute": { "x": 0, "y": 0 }, "dragging": false }
//!   ],
//!   "edges": [ { "id": "1", "source": "0", "target": "1" } ]
//! }
//! ```

use crate::models::{BuildError, Edge, FlowChart, Position, TreeNode};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeDto<R> {
    pub id: String,

    #[serde(rename = "type", default)]
    pub node_type: String,

    pub data: R,

    #[serde(default)]
    pub position: Position,

    #[serde(default)]
    pub width: i16,

    #[serde(default)]
    pub height: i16,

    #[serde(default)]
    pub selected: bool,

    #[serde(default)]
    pub position_absolute: Position,

    #[serde(default)]
    pub dragging: bool,
}

impl<R> NodeDto<R> {
    fn into_tree_node<D>(self, parse: &mut impl FnMut(R) -> D) -> TreeNode<D> {
        TreeNode {
            id: self.id,
            data: parse(self.data),
            node_type: self.node_type,
            position: self.position,
            position_absolute: self.position_absolute,
            width: self.width,
            height: self.height,
            selected: self.selected,
            dragging: self.dragging,
        }
    }
}

impl<D: Clone> From<&TreeNode<D>> for NodeDto<D> {
    fn from(node: &TreeNode<D>) -> Self {
        Self {
            id: node.id.clone(),
            node_type: node.node_type.clone(),
            data: node.data.clone(),
            position: node.position,
            width: node.width,
            height: node.height,
            selected: node.selected,
            position_absolute: node.position_absolute,
            dragging: node.dragging,
        }
    }
}

/// A whole flowchart on the wire
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowChartDto<R> {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default)]
    pub title: String,

    pub key: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,

    #[serde(default = "Vec::new")]
    pub nodes: Vec<NodeDto<R>>,

    #[serde(default, alias = "Edges")]
    pub edges: Vec<Edge>,
}

impl<R> FlowChartDto<R> {
    /// Rebuild the domain tree, converting each wire payload with `parse`
    ///
    /// # Errors
    ///
    /// Any [`BuildError`] raised while assembling the tree.
    pub fn into_domain<D, F>(self, mut parse: F) -> Result<FlowChart<D>, BuildError>
    where
        F: FnMut(R) -> D,
    {
        let nodes = self
            .nodes
            .into_iter()
            .map(|node| node.into_tree_node(&mut parse));
        let mut chart = FlowChart::build(self.title, self.key, nodes, &self.edges)?;
        chart.id = self.id;
        Ok(chart)
    }
}

impl<D: Clone> From<&FlowChart<D>> for FlowChartDto<D> {
    /// Nodes in pre-order, edges derived from parent links
    fn from(chart: &FlowChart<D>) -> Self {
        Self {
            id: chart.id.clone(),
            title: chart.title.clone(),
            key: chart.key.clone(),
            updated_at: chart.updated_at,
            nodes: chart
                .linearize()
                .into_iter()
                .map(|linear| NodeDto::from(linear.node))
                .collect(),
            edges: chart.edges(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{LabelData, UnstructuredData};
    use serde_json::json;

    fn sample_body() -> serde_json::Value {
        json!({
            "title": "Onboarding",
            "key": "onboarding",
            "nodes": [
                { "id": "0", "type": "input", "data": { "label": "Start" },
                  "position": { "x": 10.0, "y": 20.0 }, "width": 150, "height": 40,
                  "selected": true, "positionAbsolute": { "x": 10.0, "y": 20.0 }, "dragging": false },
                { "id": "1", "data": { "label": "Sign contract" } },
                { "id": "2", "data": { "label": "Get laptop", "color": "red" } }
            ],
            "Edges": [
                { "id": "1", "source": "0", "target": "1" },
                { "id": "2", "source": "1", "target": "2" }
            ]
        })
    }

    #[test]
    fn test_deserialize_with_defaults_and_edges_alias() {
        let dto: FlowChartDto<LabelData> = serde_json::from_value(sample_body()).unwrap();

        assert_eq!(dto.nodes.len(), 3);
        assert_eq!(dto.edges.len(), 2);
        assert_eq!(dto.nodes[0].node_type, "input");
        assert!(dto.nodes[0].selected);
        assert_eq!(dto.nodes[1].width, 0);
        assert_eq!(dto.nodes[1].position, Position::default());
        assert_eq!(dto.nodes[2].data, LabelData::new("Get laptop"));
    }

    #[test]
    fn test_into_domain_keeps_geometry() {
        let dto: FlowChartDto<UnstructuredData> = serde_json::from_value(sample_body()).unwrap();
        let chart = dto.into_domain(|data| data).unwrap();

        let root = chart.root_node().unwrap();
        assert_eq!(root.id, "0");
        assert_eq!(root.position, Position::new(10.0, 20.0));
        assert_eq!(root.width, 150);
        let deepest = chart.tree().handle_of("2").unwrap();
        assert_eq!(chart.tree().depth(deepest), 3);
        assert_eq!(chart.tree().get(deepest).unwrap().data["color"], "red");
    }

    #[test]
    fn test_into_domain_converts_payloads() {
        let dto: FlowChartDto<UnstructuredData> = serde_json::from_value(sample_body()).unwrap();
        let chart = dto
            .into_domain(|data| LabelData::new(data["label"].as_str().unwrap_or_default()))
            .unwrap();

        assert_eq!(chart.root_node().unwrap().data.label, "Start");
    }

    #[test]
    fn test_outbound_shape() {
        let dto: FlowChartDto<LabelData> = serde_json::from_value(sample_body()).unwrap();
        let chart = dto.into_domain(|data| data).unwrap();
        let value = serde_json::to_value(FlowChartDto::from(&chart)).unwrap();

        assert!(value.get("id").is_none());
        assert_eq!(value["nodes"][0]["type"], "input");
        assert_eq!(value["nodes"][0]["positionAbsolute"]["x"], 10.0);
        assert_eq!(value["edges"][1], json!({ "id": "2", "source": "1", "target": "2" }));
    }

    #[test]
    fn test_broken_edge_list_is_a_build_error() {
        let mut body = sample_body();
        body["Edges"][1]["source"] = json!("9");
        let dto: FlowChartDto<UnstructuredData> = serde_json::from_value(body).unwrap();

        assert_eq!(
            dto.into_domain(|data| data).unwrap_err(),
            BuildError::ParentNotFound { id: "9".to_string() }
        );
    }
}
