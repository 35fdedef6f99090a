//! Assigns each account a role-aware suspicion score from the highest-risk
//! ring it belongs to, with a small deterministic per-account jitter.

use std::collections::BTreeMap;

use crate::evidence::EvidenceTag;
use crate::graph::Graph;
use crate::types::{clamp_score, round1, AccountScoreState, EvidenceMap, PatternType, RingCandidate};

const FNV_OFFSET_BASIS: u32 = 2_166_136_261;
const FNV_PRIME: u32 = 16_777_619;

/// FNV-1a-32 over `account_id | "|" | pattern_type`, mapped to `[-0.4, 0.4)`.
pub fn deterministic_jitter(account_id: &str, pattern: PatternType) -> f64 {
    let input = format!("{account_id}|{}", pattern.as_str());
    let mut hash: u32 = FNV_OFFSET_BASIS;
    for byte in input.as_bytes() {
        hash ^= *byte as u32;
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    let fraction = hash as f64 / 4_294_967_296.0; // 2^32
    (fraction - 0.5) * 0.8
}

/// Among `rings`, the one with the highest risk score that `account`
/// belongs to; ties broken by the ring's signature, since at this pipeline
/// stage no ring has a `ring_id` yet.
fn best_ring_for<'a>(account: &str, rings: &'a [RingCandidate]) -> Option<&'a RingCandidate> {
    let mut best: Option<&RingCandidate> = None;
    for ring in rings {
        if !ring.members.iter().any(|m| m == account) {
            continue;
        }
        let better = match best {
            None => true,
            Some(current) => {
                ring.risk_score > current.risk_score
                    || (ring.risk_score == current.risk_score
                        && ring.signature() < current.signature())
            }
        };
        if better {
            best = Some(ring);
        }
    }
    best
}

fn role_score(account: &str, ring: &RingCandidate, tags: &std::collections::BTreeSet<EvidenceTag>) -> f64 {
    let risk = ring.risk_score;
    let jitter = deterministic_jitter(account, ring.pattern);

    match ring.pattern {
        PatternType::Cycle => risk - 3.1 + jitter,
        PatternType::Smurfing => {
            let hub = ring.members.first().map(String::as_str).unwrap_or("");
            if account == hub {
                risk + 2.8
            } else if tags.contains(&EvidenceTag::CashOut) {
                risk + 1.7
            } else if tags.contains(&EvidenceTag::SmurfingFanOut) {
                risk - 5.9 + jitter
            } else if tags.contains(&EvidenceTag::SmurfingFanIn) {
                risk - 16.4 + jitter
            } else {
                risk - 10.0 + jitter
            }
        }
        PatternType::LayeredShell => {
            if tags.contains(&EvidenceTag::CashOut) {
                risk + 2.2
            } else if tags.contains(&EvidenceTag::LowActivityShell) {
                risk + 0.4 + jitter
            } else if tags.contains(&EvidenceTag::PreCashout) {
                risk - 1.7 + jitter
            } else if tags.contains(&EvidenceTag::SourceFunds) {
                risk - 5.4 + jitter
            } else {
                risk - 1.0 + jitter
            }
        }
    }
}

/// Initialize every graph node's score state, then assign role-aware scores
/// from each account's best ring. Ring ids are left `None` — the assembler
/// owns that assignment.
pub fn score_accounts(
    graph: &Graph,
    rings: &[RingCandidate],
    evidence: &EvidenceMap,
) -> BTreeMap<String, AccountScoreState> {
    let mut states: BTreeMap<String, AccountScoreState> =
        graph.nodes().map(|n| (n.to_string(), AccountScoreState::new())).collect();

    for (account, state) in states.iter_mut() {
        if let Some(tags) = evidence.get(account) {
            state.patterns = tags.clone();
        }

        let Some(ring) = best_ring_for(account, rings) else {
            continue;
        };

        let score = role_score(account, ring, &state.patterns);
        state.score = clamp_score(round1(score));
    }

    tracing::debug!(accounts = states.len(), "scorer complete");
    states
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PatternType;

    fn ring(pattern: PatternType, members: &[&str], risk: f64) -> RingCandidate {
        RingCandidate {
            pattern,
            members: members.iter().map(|s| s.to_string()).collect(),
            risk_score: risk,
        }
    }

    #[test]
    fn jitter_is_bounded_and_deterministic() {
        let j1 = deterministic_jitter("ACC-1", PatternType::Cycle);
        let j2 = deterministic_jitter("ACC-1", PatternType::Cycle);
        assert_eq!(j1, j2);
        assert!((-0.4..0.4).contains(&j1));
    }

    #[test]
    fn jitter_varies_by_pattern() {
        let j1 = deterministic_jitter("ACC-1", PatternType::Cycle);
        let j2 = deterministic_jitter("ACC-1", PatternType::Smurfing);
        assert_ne!(j1, j2);
    }

    #[test]
    fn cycle_member_scored_below_ring_risk() {
        let txs = vec![];
        let graph = Graph::build(&txs).unwrap();
        let rings = vec![ring(PatternType::Cycle, &["A", "B", "C"], 95.0)];
        let mut evidence = EvidenceMap::new();
        evidence.insert("A".to_string(), std::collections::BTreeSet::from([EvidenceTag::Cycle]));
        // Graph has no nodes (txs empty) but scorer should still work off an
        // explicit account list for unit testing purposes via a tiny graph.
        let txs2 = vec![crate::types::Transaction {
            id: None,
            sender: "A".to_string(),
            receiver: "B".to_string(),
            amount: 1.0,
            timestamp: 0,
        }];
        let graph2 = Graph::build(&txs2).unwrap();
        let states = score_accounts(&graph2, &rings, &evidence);
        let a = &states["A"];
        assert!(a.score < 95.0);
        assert!(a.score > 90.0);
        let _ = graph;
    }

    #[test]
    fn smurfing_hub_scores_highest() {
        let rings = vec![ring(
            PatternType::Smurfing,
            &["H", "S1", "R1"],
            80.0,
        )];
        let txs = vec![
            crate::types::Transaction {
                id: None,
                sender: "S1".to_string(),
                receiver: "H".to_string(),
                amount: 1.0,
                timestamp: 0,
            },
            crate::types::Transaction {
                id: None,
                sender: "H".to_string(),
                receiver: "R1".to_string(),
                amount: 1.0,
                timestamp: 1,
            },
        ];
        let graph = Graph::build(&txs).unwrap();
        let mut evidence = EvidenceMap::new();
        evidence.insert("H".to_string(), std::collections::BTreeSet::from([EvidenceTag::SmurfingFanIn, EvidenceTag::SmurfingFanOut]));
        evidence.insert("S1".to_string(), std::collections::BTreeSet::from([EvidenceTag::SmurfingFanIn]));
        evidence.insert("R1".to_string(), std::collections::BTreeSet::from([EvidenceTag::SmurfingFanOut]));
        let states = score_accounts(&graph, &rings, &evidence);
        assert!(states["H"].score > states["S1"].score);
        assert!(states["H"].score > states["R1"].score);
        assert_eq!(states["H"].score, 82.8);
    }
}
