//! Collects the graph, the merged ring candidates, and the scorer's
//! per-account state into one final report, in one place, with no stage
//! re-entering.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::evidence::sort_tags;
use crate::graph::Graph;
use crate::types::{
    round_to, AccountScoreState, FraudRing, PatternType, RingCandidate, SuspiciousAccount,
};

/// Default suspicious-account score cutoff. [`crate::engine::Config`]
/// exposes this as an overridable value.
pub const DEFAULT_SCORE_CUTOFF: f64 = 60.0;

/// The canonical output document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FraudReport {
    pub summary: Summary,
    pub fraud_rings: Vec<FraudRing>,
    pub suspicious_accounts: Vec<SuspiciousAccount>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub total_accounts_analyzed: usize,
    pub suspicious_accounts_flagged: usize,
    pub fraud_rings_detected: usize,
    pub processing_time_seconds: f64,
}

/// Collapse `rings` to one-per-signature (highest risk wins), order them by
/// pattern priority then sorted-member signature, and assign dense
/// `RING_NNN` ids.
fn canonicalize_rings(rings: &[RingCandidate]) -> Vec<FraudRing> {
    let mut best_by_signature: BTreeMap<String, &RingCandidate> = BTreeMap::new();
    for ring in rings {
        let signature = ring.signature();
        let better = match best_by_signature.get(&signature) {
            None => true,
            Some(current) => ring.risk_score > current.risk_score,
        };
        if better {
            best_by_signature.insert(signature, ring);
        }
    }

    let mut ordered: Vec<&RingCandidate> = best_by_signature.into_values().collect();
    ordered.sort_by(|a, b| {
        a.pattern
            .priority()
            .cmp(&b.pattern.priority())
            .then_with(|| a.signature().cmp(&b.signature()))
    });

    ordered
        .into_iter()
        .enumerate()
        .map(|(i, ring)| FraudRing {
            ring_id: format!("RING_{:03}", i + 1),
            pattern_type: ring.pattern,
            member_accounts: emit_members(ring),
            risk_score: ring.risk_score,
        })
        .collect()
}

/// Cycle members are resorted ascending (rotationally symmetric); smurfing
/// and layered-shell members preserve detector order with duplicates
/// removed by first occurrence.
fn emit_members(ring: &RingCandidate) -> Vec<String> {
    match ring.pattern {
        PatternType::Cycle => {
            let mut members = ring.members.clone();
            members.sort();
            members.dedup();
            members
        }
        PatternType::Smurfing | PatternType::LayeredShell => {
            let mut seen = std::collections::BTreeSet::new();
            ring.members
                .iter()
                .filter(|m| seen.insert((*m).clone()))
                .cloned()
                .collect()
        }
    }
}

/// For each account, the highest-risk ring it belongs to, tie-broken by the
/// ring's signature so this agrees with the scorer's own "best ring per
/// account" choice: both pick the same ring whenever scores tie.
fn best_ring_ids(rings: &[FraudRing]) -> BTreeMap<String, String> {
    let mut best: BTreeMap<String, (f64, String, String)> = BTreeMap::new();
    for ring in rings {
        let signature = ring.signature();
        for member in &ring.member_accounts {
            let candidate = (ring.risk_score, signature.clone(), ring.ring_id.clone());
            match best.get(member) {
                None => {
                    best.insert(member.clone(), candidate);
                }
                Some((current_risk, current_signature, _)) => {
                    if candidate.0 > *current_risk
                        || (candidate.0 == *current_risk && candidate.1 < *current_signature)
                    {
                        best.insert(member.clone(), candidate);
                    }
                }
            }
        }
    }
    best.into_iter().map(|(k, (_, _, id))| (k, id)).collect()
}

/// Assemble the final report from the graph, the merged rings, and the
/// scorer's per-account state.
pub fn assemble(
    graph: &Graph,
    merged_rings: &[RingCandidate],
    scores: &BTreeMap<String, AccountScoreState>,
    processing_time_seconds: f64,
    score_cutoff: f64,
) -> FraudReport {
    let fraud_rings = canonicalize_rings(merged_rings);
    let ring_ids = best_ring_ids(&fraud_rings);

    let mut suspicious_accounts: Vec<SuspiciousAccount> = scores
        .iter()
        .filter(|(_, state)| state.score >= score_cutoff && !state.patterns.is_empty())
        .map(|(account, state)| {
            let mut tags: Vec<_> = state.patterns.iter().copied().collect();
            sort_tags(&mut tags);
            SuspiciousAccount {
                account_id: account.clone(),
                suspicion_score: state.score,
                detected_patterns: tags,
                ring_id: ring_ids.get(account).cloned(),
            }
        })
        .collect();

    suspicious_accounts.sort_by(|a, b| {
        b.suspicion_score
            .partial_cmp(&a.suspicion_score)
            .unwrap()
            .then_with(|| a.account_id.cmp(&b.account_id))
    });

    let summary = Summary {
        total_accounts_analyzed: graph.node_count(),
        suspicious_accounts_flagged: suspicious_accounts.len(),
        fraud_rings_detected: fraud_rings.len(),
        processing_time_seconds: round_to(processing_time_seconds, 3),
    };

    tracing::debug!(
        rings = fraud_rings.len(),
        accounts = suspicious_accounts.len(),
        "output assembler complete"
    );

    FraudReport {
        summary,
        fraud_rings,
        suspicious_accounts,
    }
}
