//! Display metrics for the p2pool mining dashboard.
//!
//! This crate holds the UI-independent core: the history log and snapshot
//! types, lookback window selection, trailing moving-average smoothing and the
//! derived earnings metrics. Nothing here performs I/O.

pub mod metrics;
pub mod smoothing;
pub mod types;
pub mod windowing;

pub use metrics::{
    ChainParams, DerivedMetrics, EarningsPeriod, PayoutEstimate, SmoothedHashrates,
    SmoothingParams,
};
pub use smoothing::trailing_moving_average;
pub use types::{HistoryError, HistoryLog, Snapshot};
pub use windowing::{effective_window_hours, unix_timestamp, HistoryWindow};

#[cfg(test)]
mod tests {
    use crate::{trailing_moving_average, ChainParams, DerivedMetrics, HistoryLog, Snapshot};

    #[test]
    fn test_network_hashrate_from_difficulty() {
        // 144M difficulty at a 120s block time = 1.2 MH/s
        let chain = ChainParams::default();
        assert_eq!(chain.network_hashrate(144_000_000.0), 1_200_000.0);
    }

    #[test]
    fn test_history_scenario() {
        let history = HistoryLog {
            timestamps: vec![0.0, 600.0, 1200.0],
            my_hash: vec![100.0, 200.0, 300.0],
            pool_hash: None,
            net_hash: None,
            price: vec![1.0, 1.0, 1.0],
        };
        assert_eq!(
            trailing_moving_average(&history.timestamps, &history.my_hash, 600),
            250.0
        );
    }

    #[test]
    fn test_zero_network_earnings() {
        let snapshot = Snapshot {
            miner_hashrate: 50.0,
            pool_hashrate: 100.0,
            network_difficulty: 0.0,
            block_reward_atomic: 1e12,
            min_payout_threshold: 0.01,
        };
        let metrics = DerivedMetrics::from_history(
            &snapshot,
            &HistoryLog::default(),
            0.0,
            Default::default(),
            &ChainParams::default(),
        );
        assert_eq!(metrics.earnings_for(crate::EarningsPeriod::Day), 0.0);
    }
}
