//! Core data model shared by every pipeline stage.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::evidence::EvidenceTag;

/// A single directed, timestamped payment between two accounts.
///
/// Constructed and validated upstream (CSV ingestion, timestamp
/// normalization); this crate treats values as immutable once received.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    #[serde(default)]
    pub id: Option<String>,
    pub sender: String,
    pub receiver: String,
    pub amount: f64,
    /// Epoch seconds, UTC.
    pub timestamp: i64,
}

/// Detection pattern produced by one of the three detectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternType {
    Cycle,
    Smurfing,
    LayeredShell,
}

impl PatternType {
    /// Output ordering priority: cycle=1, smurfing=2, layered_shell=3.
    pub fn priority(&self) -> u8 {
        match self {
            PatternType::Cycle => 1,
            PatternType::Smurfing => 2,
            PatternType::LayeredShell => 3,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PatternType::Cycle => "cycle",
            PatternType::Smurfing => "smurfing",
            PatternType::LayeredShell => "layered_shell",
        }
    }
}

/// A ring candidate emitted by a detector, before merge/dedup.
///
/// Ownership passes from the detector that produced it to the merger, and
/// from the merger to the assembler; never mutated after a merge decision
/// picks a representative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RingCandidate {
    pub pattern: PatternType,
    pub members: Vec<String>,
    pub risk_score: f64,
}

impl RingCandidate {
    pub fn member_set(&self) -> BTreeSet<&str> {
        self.members.iter().map(String::as_str).collect()
    }

    /// `<pattern>|<sorted-unique-members-joined-by-comma>`, the identity a
    /// ring candidate is deduped and tie-broken on before it has a `ring_id`.
    pub fn signature(&self) -> String {
        ring_signature(self.pattern, self.members.iter().map(String::as_str))
    }
}

/// Shared identity string for a pattern plus a member set, independent of
/// member order or duplicates. Used to keep ring identity consistent across
/// pipeline stages that see the same ring under different representations.
pub fn ring_signature<'a>(pattern: PatternType, members: impl Iterator<Item = &'a str>) -> String {
    let sorted: BTreeSet<&str> = members.collect();
    format!(
        "{}|{}",
        pattern.as_str(),
        sorted.into_iter().collect::<Vec<_>>().join(",")
    )
}

/// account -> set of evidence tags, unioned across detectors before scoring.
pub type EvidenceMap = BTreeMap<String, BTreeSet<EvidenceTag>>;

/// Per-account mutable scoring state, owned exclusively by the scorer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountScoreState {
    pub score: f64,
    pub patterns: BTreeSet<EvidenceTag>,
    /// Always `None` coming out of the scorer; the assembler owns ring-id
    /// assignment on the final output.
    pub ring_id: Option<String>,
}

impl AccountScoreState {
    pub fn new() -> Self {
        Self {
            score: 0.0,
            patterns: BTreeSet::new(),
            ring_id: None,
        }
    }
}

impl Default for AccountScoreState {
    fn default() -> Self {
        Self::new()
    }
}

/// A finalized, output-ready fraud ring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FraudRing {
    pub ring_id: String,
    pub pattern_type: PatternType,
    pub member_accounts: Vec<String>,
    pub risk_score: f64,
}

impl FraudRing {
    /// Same identity string as the [`RingCandidate`] it was assembled from,
    /// regardless of `ring_id`. Lets later stages agree with earlier ones on
    /// which ring is "the same ring" without depending on id assignment order.
    pub fn signature(&self) -> String {
        ring_signature(self.pattern_type, self.member_accounts.iter().map(String::as_str))
    }
}

/// A finalized, output-ready suspicious account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuspiciousAccount {
    pub account_id: String,
    pub suspicion_score: f64,
    pub detected_patterns: Vec<EvidenceTag>,
    pub ring_id: Option<String>,
}

/// Round to `decimals` places, locale-independent.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Round to one decimal place, locale-independent.
pub fn round1(value: f64) -> f64 {
    round_to(value, 1)
}

/// Clamp to `[0, 100]`.
pub fn clamp_score(value: f64) -> f64 {
    value.clamp(0.0, 100.0)
}
