//! The three independent structural/temporal analyzers.
//!
//! Each detector is a pure function of the read-only [`Graph`](crate::graph::Graph)
//! and produces ring candidates plus a per-account evidence map; detectors
//! never fail — an empty or non-matching graph simply yields no candidates.

pub mod cycle;
pub mod shell_chain;
pub mod smurfing;

use crate::types::{EvidenceMap, RingCandidate};

/// What every detector hands back to the pipeline.
pub type DetectorOutput = (Vec<RingCandidate>, EvidenceMap);

pub(crate) fn add_tag(
    map: &mut EvidenceMap,
    account: &str,
    tag: crate::evidence::EvidenceTag,
) {
    map.entry(account.to_string()).or_default().insert(tag);
}
