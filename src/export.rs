//! A pure projection of the built [`Graph`] for visualization consumers:
//! node/edge records carrying aggregated per-edge metadata rather than
//! re-deriving it ad hoc at call sites. Not part of detection; never read
//! back by any pipeline stage.

use serde::{Deserialize, Serialize};

use crate::graph::Graph;
use crate::types::round_to;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeExport {
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeExport {
    pub id: String,
    pub source: String,
    pub target: String,
    pub tx_count: usize,
    pub total_amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphExport {
    pub nodes: Vec<NodeExport>,
    pub edges: Vec<EdgeExport>,
}

/// Project `graph` into the visualization-facing node/edge shape.
pub fn export_graph(graph: &Graph) -> GraphExport {
    let nodes = graph
        .nodes()
        .map(|id| NodeExport { id: id.to_string() })
        .collect();

    let edges = graph
        .edges()
        .map(|(source, target, tx_indices)| {
            let total_amount: f64 = tx_indices.iter().map(|&i| graph.tx(i).amount).sum();
            EdgeExport {
                id: format!("{source}__{target}"),
                source: source.to_string(),
                target: target.to_string(),
                tx_count: tx_indices.len(),
                total_amount: round_to(total_amount, 2),
            }
        })
        .collect();

    GraphExport { nodes, edges }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Transaction;

    fn tx(sender: &str, receiver: &str, amount: f64, ts: i64) -> Transaction {
        Transaction {
            id: None,
            sender: sender.to_string(),
            receiver: receiver.to_string(),
            amount,
            timestamp: ts,
        }
    }

    #[test]
    fn exports_nodes_and_aggregated_edges() {
        let txs = vec![tx("A", "B", 10.0, 1), tx("A", "B", 5.5, 2), tx("B", "C", 3.0, 3)];
        let graph = Graph::build(&txs).unwrap();
        let export = export_graph(&graph);
        assert_eq!(export.nodes.len(), 3);
        let ab = export.edges.iter().find(|e| e.id == "A__B").unwrap();
        assert_eq!(ab.tx_count, 2);
        assert_eq!(ab.total_amount, 15.5);
    }

    #[test]
    fn empty_graph_exports_empty() {
        let graph = Graph::build(&[]).unwrap();
        let export = export_graph(&graph);
        assert!(export.nodes.is_empty());
        assert!(export.edges.is_empty());
    }
}
