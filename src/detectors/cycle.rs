//! Enumerates every simple directed cycle of length 3-5, found exactly
//! once, via canonical-start pruning and rotation dedup.

use std::collections::{BTreeSet, HashMap, HashSet};

use crate::detectors::{add_tag, DetectorOutput};
use crate::evidence::EvidenceTag;
use crate::graph::Graph;
use crate::types::{clamp_score, round1, PatternType, RingCandidate};

const MIN_LEN: usize = 3;
const MAX_LEN: usize = 5;

fn base_risk(len: usize) -> f64 {
    match len {
        3 => 89.3,
        4 => 87.7,
        5 => 85.0,
        _ => unreachable!("cycle length outside [3,5]"),
    }
}

fn tightness_bonus(span_secs: i64) -> f64 {
    if span_secs <= 3_600 {
        10.0
    } else if span_secs <= 21_600 {
        6.0
    } else if span_secs <= 86_400 {
        3.0
    } else {
        0.0
    }
}

/// Lexicographically smallest rotation of `path`, joined by `|`.
fn canonical_rotation_key(path: &[&str]) -> String {
    let n = path.len();
    (0..n)
        .map(|start| {
            (0..n)
                .map(|i| path[(start + i) % n])
                .collect::<Vec<_>>()
                .join("|")
        })
        .min()
        .unwrap_or_default()
}

/// Temporal span across every edge of the cycle: max(last tx) - min(first tx).
fn cycle_span(graph: &Graph, path: &[&str]) -> i64 {
    let n = path.len();
    let mut min_first = i64::MAX;
    let mut max_last = i64::MIN;
    for i in 0..n {
        let u = path[i];
        let v = path[(i + 1) % n];
        let edge = graph.edge_tx_list(u, v);
        if edge.is_empty() {
            continue;
        }
        let first = graph.tx(edge[0]).timestamp;
        let last = graph.tx(*edge.last().unwrap()).timestamp;
        min_first = min_first.min(first);
        max_last = max_last.max(last);
    }
    if min_first == i64::MAX {
        0
    } else {
        max_last - min_first
    }
}

struct Dfs<'a> {
    graph: &'a Graph,
    rank: &'a HashMap<&'a str, usize>,
    start: &'a str,
    seen_keys: &'a mut HashSet<String>,
    cycles: &'a mut Vec<Vec<String>>,
}

impl<'a> Dfs<'a> {
    fn walk(&mut self, current: &'a str, path: &mut Vec<&'a str>, visited: &mut BTreeSet<&'a str>) {
        let start_rank = self.rank[self.start];
        let graph: &'a Graph = self.graph;
        for next in graph.out_neighbors(current) {
            if self.rank.get(next).copied().unwrap_or(usize::MAX) < start_rank {
                continue;
            }
            if next == self.start {
                if path.len() >= MIN_LEN && path.len() <= MAX_LEN {
                    let key = canonical_rotation_key(path);
                    if self.seen_keys.insert(key) {
                        self.cycles.push(path.iter().map(|s| s.to_string()).collect());
                    }
                }
                continue;
            }
            if visited.contains(next) || path.len() >= MAX_LEN {
                continue;
            }
            visited.insert(next);
            path.push(next);
            self.walk(next, path, visited);
            path.pop();
            visited.remove(next);
        }
    }
}

/// Enumerate directed simple cycles of length 3-5 and score them.
pub fn detect(graph: &Graph) -> DetectorOutput {
    let sorted_nodes: Vec<&str> = {
        let mut v: Vec<&str> = graph.nodes().collect();
        v.sort_unstable();
        v
    };
    let rank: HashMap<&str, usize> = sorted_nodes
        .iter()
        .enumerate()
        .map(|(i, n)| (*n, i))
        .collect();

    let mut seen_keys = HashSet::new();
    let mut cycles: Vec<Vec<String>> = Vec::new();

    for &start in &sorted_nodes {
        let mut path = vec![start];
        let mut visited: BTreeSet<&str> = BTreeSet::from([start]);
        let mut dfs = Dfs {
            graph,
            rank: &rank,
            start,
            seen_keys: &mut seen_keys,
            cycles: &mut cycles,
        };
        dfs.walk(start, &mut path, &mut visited);
    }

    let mut candidates = Vec::with_capacity(cycles.len());
    let mut evidence = crate::types::EvidenceMap::new();

    for cycle in &cycles {
        let refs: Vec<&str> = cycle.iter().map(String::as_str).collect();
        let len = refs.len();
        let span = cycle_span(graph, &refs);
        let risk = clamp_score(round1(base_risk(len) + tightness_bonus(span)));

        let mut members = cycle.clone();
        members.sort();

        for member in &members {
            add_tag(&mut evidence, member, EvidenceTag::for_cycle_length(len));
            add_tag(&mut evidence, member, EvidenceTag::Cycle);
        }

        candidates.push(RingCandidate {
            pattern: PatternType::Cycle,
            members,
            risk_score: risk,
        });
    }

    tracing::debug!(candidates = candidates.len(), "cycle detector complete");
    (candidates, evidence)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Transaction;

    fn tx(sender: &str, receiver: &str, ts: i64) -> Transaction {
        Transaction {
            id: None,
            sender: sender.to_string(),
            receiver: receiver.to_string(),
            amount: 50.0,
            timestamp: ts,
        }
    }

    #[test]
    fn detects_pure_three_cycle() {
        let txs = vec![
            tx("A", "B", 1_770_717_600),
            tx("B", "C", 1_770_718_200),
            tx("C", "A", 1_770_718_800),
        ];
        let graph = Graph::build(&txs).unwrap();
        let (candidates, evidence) = detect(&graph);
        assert_eq!(candidates.len(), 1);
        let ring = &candidates[0];
        assert_eq!(ring.pattern, PatternType::Cycle);
        assert_eq!(ring.members, vec!["A", "B", "C"]);
        assert!(ring.risk_score >= 99.0);
        for acc in ["A", "B", "C"] {
            assert!(evidence[acc].contains(&EvidenceTag::Cycle));
            assert!(evidence[acc].contains(&EvidenceTag::CycleLength3));
        }
    }

    #[test]
    fn no_cycles_on_acyclic_graph() {
        let txs = vec![tx("A", "B", 1), tx("B", "C", 2), tx("C", "D", 3)];
        let graph = Graph::build(&txs).unwrap();
        let (candidates, _) = detect(&graph);
        assert!(candidates.is_empty());
    }

    #[test]
    fn empty_graph_has_no_cycles() {
        let graph = Graph::build(&[]).unwrap();
        let (candidates, _) = detect(&graph);
        assert!(candidates.is_empty());
    }

    #[test]
    fn no_duplicate_sorted_member_sets() {
        // A->B->C->D->A plus a direct shortcut B->A to make sure the
        // canonical-start pruning still yields each cycle exactly once.
        let txs = vec![
            tx("A", "B", 1),
            tx("B", "C", 2),
            tx("C", "D", 3),
            tx("D", "A", 4),
            tx("B", "A", 5),
        ];
        let graph = Graph::build(&txs).unwrap();
        let (candidates, _) = detect(&graph);
        let mut seen = HashSet::new();
        for c in &candidates {
            let key: Vec<&str> = c.members.iter().map(String::as_str).collect();
            assert!(seen.insert(key), "duplicate member set emitted");
        }
    }
}
