//! # Money-Muling Ring Detection Engine
//!
//! A deterministic, explainable detector for money-muling transaction
//! structures: directed cycles, smurfing fan-in/fan-out hubs, and layered
//! shell chains. Given a time-ordered transaction log, the pipeline builds a
//! directed graph, runs three independent structural/temporal detectors,
//! consolidates overlapping ring candidates, assigns role-aware suspicion
//! scores, and assembles a canonical report.
//!
//! The crate is intentionally narrow: CSV ingestion, timestamp
//! normalization, and HTTP/visualization layers are external collaborators.
//! [`Engine::analyze`] is the single entry point.
//!
//! ```
//! use rust_mule_detect::{Engine, Transaction};
//!
//! let txs = vec![
//!     Transaction { id: None, sender: "A".into(), receiver: "B".into(), amount: 50.0, timestamp: 1_770_717_600 },
//!     Transaction { id: None, sender: "B".into(), receiver: "C".into(), amount: 49.0, timestamp: 1_770_718_200 },
//!     Transaction { id: None, sender: "C".into(), receiver: "A".into(), amount: 48.0, timestamp: 1_770_718_800 },
//! ];
//! let report = Engine::new().analyze(&txs).unwrap();
//! assert_eq!(report.fraud_rings.len(), 1);
//! ```

pub mod assembler;
pub mod detectors;
pub mod engine;
pub mod error;
pub mod evidence;
pub mod export;
pub mod graph;
pub mod merge;
pub mod scoring;
pub mod types;

pub use assembler::{FraudReport, Summary};
pub use engine::{Config, Engine};
pub use error::EngineError;
pub use evidence::EvidenceTag;
pub use export::{export_graph, EdgeExport, GraphExport, NodeExport};
pub use graph::{Graph, GraphStats};
pub use types::{
    AccountScoreState, EvidenceMap, FraudRing, PatternType, RingCandidate, SuspiciousAccount,
    Transaction,
};

#[cfg(test)]
mod tests {
    use super::*;

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
    fn public_api_round_trips_through_serde() {
        let txs = vec![tx("A", "B", 50.0, 1), tx("B", "A", 49.0, 2)];
        let report = Engine::new().analyze(&txs).unwrap();
        let json = serde_json::to_string(&report).unwrap();
        let back: FraudReport = serde_json::from_str(&json).unwrap();
        assert_eq!(report, back);
    }
}
