//! `Engine`/`Config` orchestration: a single entry-point struct wired up
//! once from a config, with one public `analyze` method that runs every
//! stage in order and returns the final report.

use std::time::Instant;

use crate::assembler::{self, FraudReport};
use crate::detectors::{cycle, shell_chain, smurfing};
use crate::error::EngineError;
use crate::graph::Graph;
use crate::merge;
use crate::scoring;
use crate::types::{RingCandidate, Transaction};

/// Tunable pipeline constants. `Config::default()` reproduces the
/// out-of-the-box defaults; overriding them is useful for tests and the
/// CLI's tuning flags.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Ring Merger Jaccard threshold.
    pub merge_jaccard_threshold: f64,
    /// Suspicious-account score cutoff.
    pub score_cutoff: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            merge_jaccard_threshold: merge::MERGE_JACCARD_THRESHOLD,
            score_cutoff: assembler::DEFAULT_SCORE_CUTOFF,
        }
    }
}

/// The pipeline's single entry point.
#[derive(Debug, Clone, Default)]
pub struct Engine {
    config: Config,
}

impl Engine {
    /// Engine with default configuration.
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn with_config(config: Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run the full pipeline: build graph, run the three detectors, merge,
    /// score, assemble. Fails only on a malformed input transaction; every
    /// later stage is infallible.
    #[tracing::instrument(skip(self, transactions), fields(tx_count = transactions.len()))]
    pub fn analyze(&self, transactions: &[Transaction]) -> Result<FraudReport, EngineError> {
        let started = Instant::now();

        let graph = Graph::build(transactions)?;

        let (cycle_rings, cycle_evidence) = cycle::detect(&graph);
        let (smurfing_rings, smurfing_evidence) = smurfing::detect(&graph);
        let (shell_rings, shell_evidence) = shell_chain::detect(&graph);

        let mut all_rings: Vec<RingCandidate> = Vec::new();
        all_rings.extend(cycle_rings);
        all_rings.extend(smurfing_rings);
        all_rings.extend(shell_rings);

        let mut evidence = cycle_evidence;
        for (account, tags) in smurfing_evidence.into_iter().chain(shell_evidence) {
            evidence.entry(account).or_default().extend(tags);
        }

        let merged = merge::merge_rings_with_threshold(&all_rings, self.config.merge_jaccard_threshold);
        let scores = scoring::score_accounts(&graph, &merged, &evidence);

        let elapsed = started.elapsed().as_secs_f64();
        let report = assembler::assemble(&graph, &merged, &scores, elapsed, self.config.score_cutoff);

        tracing::debug!(
            rings = report.fraud_rings.len(),
            accounts = report.suspicious_accounts.len(),
            elapsed_seconds = elapsed,
            "pipeline complete"
        );

        Ok(report)
    }
}

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
    fn empty_input_yields_empty_report() {
        let engine = Engine::new();
        let report = engine.analyze(&[]).unwrap();
        assert_eq!(report.summary.total_accounts_analyzed, 0);
        assert_eq!(report.summary.fraud_rings_detected, 0);
        assert_eq!(report.summary.suspicious_accounts_flagged, 0);
    }

    #[test]
    fn rejects_invalid_transaction() {
        let engine = Engine::new();
        let err = engine
            .analyze(&[tx("", "B", 10.0, 1)])
            .unwrap_err();
        assert!(matches!(err, EngineError::InputValidation { .. }));
    }

    #[test]
    fn pure_three_cycle_end_to_end() {
        let base = 1_770_717_600i64;
        let txs = vec![
            tx("A", "B", 50.0, base),
            tx("B", "C", 49.0, base + 600),
            tx("C", "A", 48.0, base + 1_200),
        ];
        let engine = Engine::new();
        let report = engine.analyze(&txs).unwrap();
        assert_eq!(report.fraud_rings.len(), 1);
        let ring = &report.fraud_rings[0];
        assert_eq!(ring.ring_id, "RING_001");
        assert_eq!(ring.member_accounts, vec!["A", "B", "C"]);
        assert!(ring.risk_score >= 99.0);
        assert_eq!(report.suspicious_accounts.len(), 3);
        for acc in &report.suspicious_accounts {
            assert_eq!(acc.ring_id.as_deref(), Some("RING_001"));
            assert!(acc.suspicion_score >= 60.0);
        }
    }

    #[test]
    fn deterministic_across_repeated_runs() {
        let base = 1_770_717_600i64;
        let txs = vec![
            tx("A", "B", 50.0, base),
            tx("B", "C", 49.0, base + 600),
            tx("C", "A", 48.0, base + 1_200),
        ];
        let engine = Engine::new();
        let r1 = engine.analyze(&txs).unwrap();
        let r2 = engine.analyze(&txs).unwrap();
        assert_eq!(r1.fraud_rings, r2.fraud_rings);
        assert_eq!(r1.suspicious_accounts, r2.suspicious_accounts);
    }

    #[test]
    fn custom_config_overrides_score_cutoff() {
        let config = Config {
            score_cutoff: 60.0,
            merge_jaccard_threshold: 0.9,
        };
        let engine = Engine::with_config(config.clone());
        assert_eq!(engine.config(), &config);
    }
}
