//! Detects layered shell chains: a multi-hop DFS over strict
//! single-in/single-out pass-through nodes with temporal and amount
//! propagation constraints.

use std::collections::{BTreeSet, HashSet};

use crate::detectors::{add_tag, DetectorOutput};
use crate::evidence::EvidenceTag;
use crate::graph::Graph;
use crate::types::{clamp_score, round1, EvidenceMap, PatternType, RingCandidate};

const MIN_EDGES: usize = 3;
const MAX_EDGES: usize = 6;
const MAX_PATHS_PER_START: usize = 25;
const BACKWARD_SLACK_SECS: i64 = 3_600;
const MAX_GAP_SECS: i64 = 24 * 3_600;
const MAX_AMOUNT_RATIO: f64 = 1.35;

fn is_low_activity(graph: &Graph, node: &str) -> bool {
    let degree = graph.total_degree(node);
    (2..=3).contains(&degree)
}

fn edge_first_timestamp(graph: &Graph, u: &str, v: &str) -> Option<i64> {
    let list = graph.edge_tx_list(u, v);
    list.first().map(|&i| graph.tx(i).timestamp)
}

fn edge_median_amount(graph: &Graph, u: &str, v: &str) -> Option<f64> {
    let list = graph.edge_tx_list(u, v);
    if list.is_empty() {
        return None;
    }
    let mut amounts: Vec<f64> = list.iter().map(|&i| graph.tx(i).amount).collect();
    amounts.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let n = amounts.len();
    Some(if n % 2 == 1 {
        amounts[n / 2]
    } else {
        (amounts[n / 2 - 1] + amounts[n / 2]) / 2.0
    })
}

/// Edge timestamps/medians for every hop of `path`; `None` entries mean the
/// edge unexpectedly had no transactions, and acceptance degrades gracefully.
fn chain_edges(graph: &Graph, path: &[&str]) -> Vec<(Option<i64>, Option<f64>)> {
    path.windows(2)
        .map(|w| {
            (
                edge_first_timestamp(graph, w[0], w[1]),
                edge_median_amount(graph, w[0], w[1]),
            )
        })
        .collect()
}

fn passes_acceptance(graph: &Graph, path: &[&str]) -> bool {
    let l = path.len() - 1; // edge count
    for &intermediate in &path[1..l] {
        if !is_low_activity(graph, intermediate) {
            return false;
        }
        if graph.in_degree(intermediate) != 1 || graph.out_degree(intermediate) != 1 {
            return false;
        }
    }

    let edges = chain_edges(graph, path);
    for i in 1..edges.len() {
        let (Some(t_prev), _) = edges[i - 1] else {
            return false;
        };
        let (Some(t_cur), _) = edges[i] else {
            return false;
        };
        if t_cur + BACKWARD_SLACK_SECS < t_prev {
            return false;
        }
        if (t_cur - t_prev).abs() > MAX_GAP_SECS {
            return false;
        }

        if let (Some(a_prev), Some(a_cur)) = (edges[i - 1].1, edges[i].1) {
            if a_prev > 0.0 && a_cur > 0.0 {
                let ratio = a_prev.max(a_cur) / a_prev.min(a_cur);
                if ratio > MAX_AMOUNT_RATIO {
                    return false;
                }
            }
        }
    }
    true
}

fn chain_span(graph: &Graph, path: &[&str]) -> i64 {
    let mut min_first = i64::MAX;
    let mut max_last = i64::MIN;
    for w in path.windows(2) {
        let list = graph.edge_tx_list(w[0], w[1]);
        if list.is_empty() {
            continue;
        }
        min_first = min_first.min(graph.tx(list[0]).timestamp);
        max_last = max_last.max(graph.tx(*list.last().unwrap()).timestamp);
    }
    if min_first == i64::MAX {
        0
    } else {
        max_last - min_first
    }
}

fn tightness_bonus(span_secs: i64) -> f64 {
    if span_secs <= 7_200 {
        10.0
    } else if span_secs <= 43_200 {
        6.0
    } else if span_secs <= 172_800 {
        3.0
    } else {
        0.0
    }
}

struct Search<'a> {
    graph: &'a Graph,
    seen_signatures: HashSet<String>,
    chains: Vec<Vec<String>>,
}

impl<'a> Search<'a> {
    fn walk(&mut self, path: &mut Vec<&'a str>, visited: &mut BTreeSet<&'a str>, successes: &mut usize) {
        if *successes >= MAX_PATHS_PER_START {
            return;
        }

        let depth = path.len() - 1;
        if depth >= MIN_EDGES && passes_acceptance(self.graph, path) {
            let signature = path.join("|");
            if self.seen_signatures.insert(signature) {
                self.chains.push(path.iter().map(|s| s.to_string()).collect());
                *successes += 1;
                if *successes >= MAX_PATHS_PER_START {
                    return;
                }
            }
        }

        if depth >= MAX_EDGES {
            return;
        }

        let current = *path.last().unwrap();
        for next in self.graph.out_neighbors(current) {
            if visited.contains(next) {
                continue;
            }
            let new_depth = depth + 1;
            if new_depth >= 2 && !is_low_activity(self.graph, next) {
                continue;
            }
            visited.insert(next);
            path.push(next);
            self.walk(path, visited, successes);
            path.pop();
            visited.remove(next);
            if *successes >= MAX_PATHS_PER_START {
                return;
            }
        }
    }
}

/// Detect layered shell chains of 3-6 hops through low-activity
/// pass-through nodes.
pub fn detect(graph: &Graph) -> DetectorOutput {
    let mut search = Search {
        graph,
        seen_signatures: HashSet::new(),
        chains: Vec::new(),
    };

    let mut starts: Vec<&str> = graph.nodes().collect();
    starts.sort_unstable();

    for start in starts {
        let mut path = vec![start];
        let mut visited: BTreeSet<&str> = BTreeSet::from([start]);
        let mut successes = 0usize;
        search.walk(&mut path, &mut visited, &mut successes);
    }

    let mut candidates = Vec::with_capacity(search.chains.len());
    let mut evidence = EvidenceMap::new();

    for chain in &search.chains {
        let refs: Vec<&str> = chain.iter().map(String::as_str).collect();
        let l = refs.len() - 1;
        let span = chain_span(graph, &refs);
        let risk = clamp_score(round1(78.0 + 3.5 * (l as f64 - 3.0) + tightness_bonus(span)));

        for (idx, member) in chain.iter().enumerate() {
            add_tag(&mut evidence, member, EvidenceTag::LayeredShellChain);
            if idx == 0 {
                add_tag(&mut evidence, member, EvidenceTag::SourceFunds);
            } else if idx == l {
                add_tag(&mut evidence, member, EvidenceTag::CashOut);
            } else if idx == l - 1 {
                add_tag(&mut evidence, member, EvidenceTag::PreCashout);
            } else {
                add_tag(&mut evidence, member, EvidenceTag::LowActivityShell);
            }
        }

        candidates.push(RingCandidate {
            pattern: PatternType::LayeredShell,
            members: chain.clone(),
            risk_score: risk,
        });
    }

    tracing::debug!(candidates = candidates.len(), "shell-chain detector complete");
    (candidates, evidence)
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
    fn detects_simple_shell_chain() {
        let base = 1_770_000_000i64;
        let txs = vec![
            tx("S", "X", 1000.0, base),
            tx("X", "Y", 1000.0, base + 3_600),
            tx("Y", "Z", 1020.0, base + 7_200),
            tx("Z", "C", 980.0, base + 10_800),
        ];
        let graph = Graph::build(&txs).unwrap();
        let (candidates, evidence) = detect(&graph);
        assert_eq!(candidates.len(), 1);
        let ring = &candidates[0];
        assert_eq!(ring.pattern, PatternType::LayeredShell);
        assert_eq!(
            ring.members,
            vec!["S", "X", "Y", "Z", "C"]
        );
        assert!(evidence["S"].contains(&EvidenceTag::SourceFunds));
        assert!(evidence["X"].contains(&EvidenceTag::LowActivityShell));
        assert!(evidence["Y"].contains(&EvidenceTag::LowActivityShell));
        assert!(evidence["Z"].contains(&EvidenceTag::PreCashout));
        assert!(evidence["C"].contains(&EvidenceTag::CashOut));
    }

    #[test]
    fn rejects_chain_with_high_activity_intermediate() {
        let base = 1_770_000_000i64;
        let mut txs = vec![
            tx("S", "X", 1000.0, base),
            tx("X", "Y", 1000.0, base + 3_600),
            tx("Y", "Z", 1000.0, base + 7_200),
            tx("Z", "C", 1000.0, base + 10_800),
        ];
        // Give Y extra unrelated activity so its total degree leaves [2,3].
        txs.push(tx("Y", "Q1", 5.0, base + 20));
        txs.push(tx("Q2", "Y", 5.0, base + 30));
        let graph = Graph::build(&txs).unwrap();
        let (candidates, _) = detect(&graph);
        assert!(candidates.is_empty());
    }

    #[test]
    fn empty_graph_has_no_chains() {
        let graph = Graph::build(&[]).unwrap();
        let (candidates, _) = detect(&graph);
        assert!(candidates.is_empty());
    }
}
