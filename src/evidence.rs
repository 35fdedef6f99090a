//! The closed evidence-tag vocabulary and its emission rank order.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceTag {
    CycleLength3,
    CycleLength4,
    CycleLength5,
    Cycle,
    SmurfingFanIn,
    SmurfingFanOut,
    Temporal72h,
    LayeredShellChain,
    SourceFunds,
    LowActivityShell,
    PreCashout,
    CashOut,
}

impl EvidenceTag {
    /// Glossary rank order used to sort `detected_patterns` on output.
    /// Lower sorts first; every known tag has a distinct rank.
    pub fn rank(&self) -> u8 {
        match self {
            EvidenceTag::CycleLength3 => 0,
            EvidenceTag::CycleLength4 => 1,
            EvidenceTag::CycleLength5 => 2,
            EvidenceTag::Cycle => 3,
            EvidenceTag::SmurfingFanIn => 4,
            EvidenceTag::SmurfingFanOut => 5,
            EvidenceTag::Temporal72h => 6,
            EvidenceTag::LayeredShellChain => 7,
            EvidenceTag::SourceFunds => 8,
            EvidenceTag::LowActivityShell => 9,
            EvidenceTag::PreCashout => 10,
            EvidenceTag::CashOut => 11,
        }
    }

    pub fn for_cycle_length(len: usize) -> Self {
        match len {
            3 => EvidenceTag::CycleLength3,
            4 => EvidenceTag::CycleLength4,
            5 => EvidenceTag::CycleLength5,
            other => unreachable!("cycle length {other} outside [3,5]"),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EvidenceTag::CycleLength3 => "cycle_length_3",
            EvidenceTag::CycleLength4 => "cycle_length_4",
            EvidenceTag::CycleLength5 => "cycle_length_5",
            EvidenceTag::Cycle => "cycle",
            EvidenceTag::SmurfingFanIn => "smurfing_fan_in",
            EvidenceTag::SmurfingFanOut => "smurfing_fan_out",
            EvidenceTag::Temporal72h => "temporal_72h",
            EvidenceTag::LayeredShellChain => "layered_shell_chain",
            EvidenceTag::SourceFunds => "source_funds",
            EvidenceTag::LowActivityShell => "low_activity_shell",
            EvidenceTag::PreCashout => "pre_cashout",
            EvidenceTag::CashOut => "cash_out",
        }
    }
}

impl fmt::Display for EvidenceTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sort tags by rank, then alphabetically.
pub fn sort_tags(tags: &mut Vec<EvidenceTag>) {
    tags.sort_by(|a, b| a.rank().cmp(&b.rank()).then_with(|| a.as_str().cmp(b.as_str())));
    tags.dedup();
}
