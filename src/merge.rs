//! Collapses near-duplicate ring candidates of the same pattern type by
//! member-set Jaccard similarity, keeping the highest-risk representative.

use std::collections::BTreeSet;

use crate::types::RingCandidate;

/// Default Jaccard similarity threshold above which two same-pattern rings
/// are treated as the same ring.
pub const MERGE_JACCARD_THRESHOLD: f64 = 0.6;

fn jaccard(a: &BTreeSet<String>, b: &BTreeSet<String>) -> f64 {
    let intersection = a.intersection(b).count();
    let union = a.union(b).count();
    if union == 0 {
        0.0
    } else {
        intersection as f64 / union as f64
    }
}

/// Collapse near-duplicate rings of the same pattern type by member-set
/// Jaccard similarity. Rings of different pattern types are never merged
/// here.
pub fn merge_rings(rings: &[RingCandidate]) -> Vec<RingCandidate> {
    merge_rings_with_threshold(rings, MERGE_JACCARD_THRESHOLD)
}

pub fn merge_rings_with_threshold(rings: &[RingCandidate], threshold: f64) -> Vec<RingCandidate> {
    let mut consumed = vec![false; rings.len()];
    let mut output = Vec::new();

    for i in 0..rings.len() {
        if consumed[i] {
            continue;
        }
        consumed[i] = true;

        let mut representative = rings[i].clone();
        let mut rep_set: BTreeSet<String> = representative.members.iter().cloned().collect();

        for j in (i + 1)..rings.len() {
            if consumed[j] || rings[j].pattern != representative.pattern {
                continue;
            }
            let candidate_set: BTreeSet<String> = rings[j].members.iter().cloned().collect();
            if jaccard(&rep_set, &candidate_set) >= threshold {
                consumed[j] = true;
                if rings[j].risk_score > representative.risk_score {
                    representative = rings[j].clone();
                    rep_set = candidate_set;
                }
            }
        }

        output.push(representative);
    }

    tracing::debug!(
        input = rings.len(),
        output = output.len(),
        "ring merger collapsed near-duplicates"
    );
    output
}
