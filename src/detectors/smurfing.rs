//! Identifies hub accounts with concurrent fan-in/fan-out: a windowed,
//! amount-consistency-checked smurfing detector.

use std::collections::BTreeSet;

use crate::detectors::{add_tag, DetectorOutput};
use crate::evidence::EvidenceTag;
use crate::graph::Graph;
use crate::types::{clamp_score, round1, EvidenceMap, PatternType, RingCandidate};

const WINDOW: i64 = 72 * 3_600;
const MIN_UNIQUE: usize = 10;
const AMOUNT_TOL: f64 = 0.08;
const STRONG_IN: f64 = 0.50;
const STRONG_OUT: f64 = 0.45;

/// The minimal-span window (by transaction index into the node's
/// time-sorted list) that contains every distinct counterparty.
struct Window {
    counterparties: BTreeSet<String>,
    amounts: Vec<f64>,
    min_t: i64,
    max_t: i64,
}

/// Two-pointer search for the smallest-span window containing all distinct
/// counterparties present in `tx_indices` (already time-ascending).
fn best_unique_window(
    graph: &Graph,
    tx_indices: &[usize],
    counterparty: impl Fn(&crate::types::Transaction) -> &str,
) -> Option<Window> {
    let total_unique: usize = {
        let set: BTreeSet<&str> = tx_indices
            .iter()
            .map(|&i| counterparty(graph.tx(i)))
            .collect();
        set.len()
    };
    if total_unique < MIN_UNIQUE {
        return None;
    }

    let mut counts: std::collections::HashMap<&str, usize> = std::collections::HashMap::new();
    let mut unique = 0usize;
    let mut left = 0usize;
    let mut best: Option<(usize, usize, i64)> = None;

    for right in 0..tx_indices.len() {
        let cp = counterparty(graph.tx(tx_indices[right]));
        let entry = counts.entry(cp).or_insert(0);
        *entry += 1;
        if *entry == 1 {
            unique += 1;
        }

        while unique == total_unique {
            let span =
                graph.tx(tx_indices[right]).timestamp - graph.tx(tx_indices[left]).timestamp;
            let better = match best {
                None => true,
                Some((_, _, best_span)) => span < best_span,
            };
            if better {
                best = Some((left, right, span));
            }

            let left_cp = counterparty(graph.tx(tx_indices[left]));
            let e = counts.get_mut(left_cp).unwrap();
            *e -= 1;
            if *e == 0 {
                unique -= 1;
            }
            left += 1;
        }
    }

    best.map(|(l, r, _)| {
        let slice = &tx_indices[l..=r];
        let counterparties = slice
            .iter()
            .map(|&i| counterparty(graph.tx(i)).to_string())
            .collect();
        let amounts = slice.iter().map(|&i| graph.tx(i).amount).collect();
        Window {
            counterparties,
            amounts,
            min_t: graph.tx(tx_indices[l]).timestamp,
            max_t: graph.tx(tx_indices[r]).timestamp,
        }
    })
}

fn median(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let n = sorted.len();
    if n % 2 == 1 {
        sorted[n / 2]
    } else {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    }
}

/// Fraction of `amounts` within `±AMOUNT_TOL * median` of the median.
/// Undefined (treated as 0) for fewer than 6 samples.
fn amount_consistency(amounts: &[f64]) -> f64 {
    if amounts.len() < 6 {
        return 0.0;
    }
    let m = median(amounts);
    let tolerance = AMOUNT_TOL * m;
    let within = amounts
        .iter()
        .filter(|&&a| (a - m).abs() <= tolerance)
        .count();
    within as f64 / amounts.len() as f64
}

fn find_cashout(
    graph: &Graph,
    receivers: &BTreeSet<String>,
    min_t: i64,
    max_t: i64,
) -> Option<(String, usize)> {
    let mut best: Option<(String, usize)> = None;
    for node in graph.nodes() {
        if graph.out_tx_list(node).len() > 2 {
            continue;
        }
        let unique_senders: BTreeSet<&str> = graph
            .in_tx_list(node)
            .iter()
            .map(|&i| graph.tx(i))
            .filter(|t| t.timestamp >= min_t && t.timestamp <= max_t)
            .filter(|t| receivers.contains(t.sender.as_str()))
            .map(|t| t.sender.as_str())
            .collect();
        let count = unique_senders.len();
        if count < MIN_UNIQUE {
            continue;
        }
        let better = match &best {
            None => true,
            Some((_, best_count)) => count > *best_count,
        };
        if better {
            best = Some((node.to_string(), count));
        }
    }
    best
}

/// Identify hub accounts with concurrent fan-in/fan-out.
pub fn detect(graph: &Graph) -> DetectorOutput {
    let mut candidates = Vec::new();
    let mut evidence = EvidenceMap::new();

    let nodes: Vec<&str> = {
        let mut v: Vec<&str> = graph.nodes().collect();
        v.sort_unstable();
        v
    };

    for hub in nodes {
        let in_list = graph.in_tx_list(hub);
        let out_list = graph.out_tx_list(hub);
        if in_list.len() < MIN_UNIQUE || out_list.len() < MIN_UNIQUE {
            continue;
        }

        let Some(in_window) = best_unique_window(graph, in_list, |t| t.sender.as_str()) else {
            continue;
        };
        let Some(out_window) = best_unique_window(graph, out_list, |t| t.receiver.as_str())
        else {
            continue;
        };

        let min_t = in_window.min_t.min(out_window.min_t);
        let max_t = in_window.max_t.max(out_window.max_t);
        if max_t - min_t > WINDOW {
            continue;
        }

        let in_cons = amount_consistency(&in_window.amounts);
        let out_cons = amount_consistency(&out_window.amounts);
        if !(in_cons >= STRONG_IN || out_cons >= STRONG_OUT) {
            continue;
        }

        let cashout = find_cashout(graph, &out_window.counterparties, min_t, max_t);

        let senders: Vec<String> = in_window.counterparties.iter().cloned().collect();
        let receivers: Vec<String> = out_window.counterparties.iter().cloned().collect();

        let mut members = Vec::new();
        let mut seen = BTreeSet::new();
        for m in std::iter::once(hub.to_string())
            .chain(senders.iter().cloned())
            .chain(receivers.iter().cloned())
            .chain(cashout.as_ref().map(|(id, _)| id.clone()))
        {
            if seen.insert(m.clone()) {
                members.push(m);
            }
        }

        let risk = clamp_score(round1(
            70.0 + 1.2 * senders.len() as f64
                + 1.2 * receivers.len() as f64
                + 6.0 * in_cons.max(out_cons)
                + if cashout.is_some() { 4.0 } else { 0.0 },
        ));

        add_tag(&mut evidence, hub, EvidenceTag::SmurfingFanIn);
        add_tag(&mut evidence, hub, EvidenceTag::SmurfingFanOut);
        add_tag(&mut evidence, hub, EvidenceTag::Temporal72h);
        for s in &senders {
            add_tag(&mut evidence, s, EvidenceTag::SmurfingFanIn);
            add_tag(&mut evidence, s, EvidenceTag::Temporal72h);
        }
        for r in &receivers {
            add_tag(&mut evidence, r, EvidenceTag::SmurfingFanOut);
            add_tag(&mut evidence, r, EvidenceTag::Temporal72h);
        }
        if let Some((ref c, _)) = cashout {
            add_tag(&mut evidence, c, EvidenceTag::SmurfingFanOut);
            add_tag(&mut evidence, c, EvidenceTag::Temporal72h);
            add_tag(&mut evidence, c, EvidenceTag::CashOut);
        }

        candidates.push(RingCandidate {
            pattern: PatternType::Smurfing,
            members,
            risk_score: risk,
        });
    }

    tracing::debug!(candidates = candidates.len(), "smurfing detector complete");
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
    fn detects_hub_with_fan_in_and_fan_out() {
        let mut txs = Vec::new();
        let base = 1_770_000_000i64;
        for i in 0..10 {
            txs.push(tx(&format!("S{i}"), "H", 100.0 + (i % 3) as f64, base + i as i64 * 60));
        }
        for i in 0..10 {
            txs.push(tx(
                "H",
                &format!("R{i}"),
                100.0 + (i % 3) as f64,
                base + 3_600 + i as i64 * 60,
            ));
        }
        let graph = Graph::build(&txs).unwrap();
        let (candidates, evidence) = detect(&graph);
        assert_eq!(candidates.len(), 1);
        let ring = &candidates[0];
        assert_eq!(ring.pattern, PatternType::Smurfing);
        assert_eq!(ring.members[0], "H");
        assert!(ring.members.len() >= 21);
        assert!(evidence["H"].contains(&EvidenceTag::SmurfingFanIn));
        assert!(evidence["H"].contains(&EvidenceTag::SmurfingFanOut));
    }

    #[test]
    fn skips_hub_below_minimum_unique() {
        let mut txs = Vec::new();
        for i in 0..5 {
            txs.push(tx(&format!("S{i}"), "H", 100.0, i as i64 * 60));
        }
        for i in 0..5 {
            txs.push(tx("H", &format!("R{i}"), 100.0, 3600 + i as i64 * 60));
        }
        let graph = Graph::build(&txs).unwrap();
        let (candidates, _) = detect(&graph);
        assert!(candidates.is_empty());
    }

    #[test]
    fn median_and_consistency_basic() {
        assert_eq!(median(&[1.0, 2.0, 3.0]), 2.0);
        assert_eq!(median(&[1.0, 2.0, 3.0, 4.0]), 2.5);
        let amounts = vec![100.0; 10];
        assert_eq!(amount_consistency(&amounts), 1.0);
    }
}
