//! Builds a directed transaction graph from a validated transaction log.
//! Adjacency and per-node transaction indices use `BTreeMap`/`BTreeSet` so
//! iteration order is deterministic without a sort step at every call site.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::types::Transaction;

/// Cheap, additive summary of a built graph, not part of the detection
/// output; used by the CLI's `--pretty` summary and by tests.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GraphStats {
    pub node_count: usize,
    pub edge_count: usize,
    pub total_transactions: usize,
    pub total_amount: f64,
}

/// Directed transaction graph. Built once by [`Graph::build`]; every
/// downstream stage borrows it read-only.
#[derive(Debug, Clone)]
pub struct Graph {
    transactions: Vec<Transaction>,
    nodes: BTreeSet<String>,
    out_adj: BTreeMap<String, BTreeSet<String>>,
    in_adj: BTreeMap<String, BTreeSet<String>>,
    out_tx: BTreeMap<String, Vec<usize>>,
    in_tx: BTreeMap<String, Vec<usize>>,
    edge_tx: BTreeMap<(String, String), Vec<usize>>,
    degree: BTreeMap<String, u64>,
}

impl Graph {
    /// Validate and ingest a transaction sequence.
    ///
    /// Fails fast on the first invalid transaction; no detector ever runs
    /// against a partially-built graph.
    pub fn build(transactions: &[Transaction]) -> Result<Self, EngineError> {
        let mut graph = Self {
            transactions: Vec::with_capacity(transactions.len()),
            nodes: BTreeSet::new(),
            out_adj: BTreeMap::new(),
            in_adj: BTreeMap::new(),
            out_tx: BTreeMap::new(),
            in_tx: BTreeMap::new(),
            edge_tx: BTreeMap::new(),
            degree: BTreeMap::new(),
        };

        for (index, tx) in transactions.iter().enumerate() {
            if tx.sender.is_empty() {
                tracing::warn!(index, "empty sender");
                return Err(EngineError::InputValidation {
                    index,
                    reason: "sender must not be empty".to_string(),
                });
            }
            if tx.receiver.is_empty() {
                tracing::warn!(index, "empty receiver");
                return Err(EngineError::InputValidation {
                    index,
                    reason: "receiver must not be empty".to_string(),
                });
            }
            if !(tx.amount.is_finite() && tx.amount > 0.0) {
                tracing::warn!(index, amount = tx.amount, "non-positive amount");
                return Err(EngineError::InputValidation {
                    index,
                    reason: format!("amount must be positive and finite, got {}", tx.amount),
                });
            }

            graph.nodes.insert(tx.sender.clone());
            graph.nodes.insert(tx.receiver.clone());

            graph
                .out_adj
                .entry(tx.sender.clone())
                .or_default()
                .insert(tx.receiver.clone());
            graph
                .in_adj
                .entry(tx.receiver.clone())
                .or_default()
                .insert(tx.sender.clone());

            graph.out_tx.entry(tx.sender.clone()).or_default().push(index);
            graph.in_tx.entry(tx.receiver.clone()).or_default().push(index);
            graph
                .edge_tx
                .entry((tx.sender.clone(), tx.receiver.clone()))
                .or_default()
                .push(index);

            *graph.degree.entry(tx.sender.clone()).or_insert(0) += 1;
            *graph.degree.entry(tx.receiver.clone()).or_insert(0) += 1;

            graph.transactions.push(tx.clone());
        }

        let by_time = |txs: &[Transaction]| {
            move |&a: &usize, &b: &usize| {
                txs[a]
                    .timestamp
                    .cmp(&txs[b].timestamp)
                    .then_with(|| a.cmp(&b))
            }
        };
        let cmp = by_time(&graph.transactions);
        for list in graph.out_tx.values_mut() {
            list.sort_by(&cmp);
        }
        for list in graph.in_tx.values_mut() {
            list.sort_by(&cmp);
        }
        for list in graph.edge_tx.values_mut() {
            list.sort_by(&cmp);
        }

        tracing::debug!(
            nodes = graph.nodes.len(),
            transactions = graph.transactions.len(),
            "graph built"
        );

        Ok(graph)
    }

    pub fn tx(&self, index: usize) -> &Transaction {
        &self.transactions[index]
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn nodes(&self) -> impl Iterator<Item = &str> {
        self.nodes.iter().map(String::as_str)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn contains_node(&self, node: &str) -> bool {
        self.nodes.contains(node)
    }

    pub fn out_neighbors(&self, node: &str) -> impl Iterator<Item = &str> {
        self.out_adj
            .get(node)
            .into_iter()
            .flat_map(|set| set.iter().map(String::as_str))
    }

    pub fn in_neighbors(&self, node: &str) -> impl Iterator<Item = &str> {
        self.in_adj
            .get(node)
            .into_iter()
            .flat_map(|set| set.iter().map(String::as_str))
    }

    pub fn out_degree(&self, node: &str) -> usize {
        self.out_adj.get(node).map_or(0, |s| s.len())
    }

    pub fn in_degree(&self, node: &str) -> usize {
        self.in_adj.get(node).map_or(0, |s| s.len())
    }

    /// Total degree = count of incident transactions, not the number of
    /// distinct neighbors.
    pub fn total_degree(&self, node: &str) -> u64 {
        self.degree.get(node).copied().unwrap_or(0)
    }

    pub fn out_tx_list(&self, node: &str) -> &[usize] {
        self.out_tx.get(node).map_or(&[], |v| v.as_slice())
    }

    pub fn in_tx_list(&self, node: &str) -> &[usize] {
        self.in_tx.get(node).map_or(&[], |v| v.as_slice())
    }

    pub fn edge_tx_list(&self, sender: &str, receiver: &str) -> &[usize] {
        self.edge_tx
            .get(&(sender.to_string(), receiver.to_string()))
            .map_or(&[], |v| v.as_slice())
    }

    pub fn edges(&self) -> impl Iterator<Item = (&str, &str, &[usize])> {
        self.edge_tx
            .iter()
            .map(|((s, r), txs)| (s.as_str(), r.as_str(), txs.as_slice()))
    }

    pub fn stats(&self) -> GraphStats {
        GraphStats {
            node_count: self.nodes.len(),
            edge_count: self.edge_tx.len(),
            total_transactions: self.transactions.len(),
            total_amount: self.transactions.iter().map(|t| t.amount).sum(),
        }
    }
}
