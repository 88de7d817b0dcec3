//! Snapshot and history types consumed by the dashboard.

use serde::{Deserialize, Deserializer};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum HistoryError {
    #[error("history series `{series}` has {actual} samples, expected {expected}")]
    LengthMismatch {
        series: &'static str,
        expected: usize,
        actual: usize,
    },
}

/// Rolling history as served by the stats log endpoint.
///
/// The log is column oriented: every present series is index-aligned with
/// `timestamps`, which are unix seconds in ascending order. `poolHash` and
/// `netHash` are optional because older loggers only recorded the miner's
/// own hashrate and price.
///
/// The logger records xmrig's short-window total as-is, which is `null` until
/// the window fills. Such gaps are kept as `NaN` so the series stay aligned;
/// averages and charts skip them.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryLog {
    pub timestamps: Vec<f64>,
    #[serde(deserialize_with = "series_with_gaps")]
    pub my_hash: Vec<f64>,
    #[serde(default, deserialize_with = "optional_series_with_gaps")]
    pub pool_hash: Option<Vec<f64>>,
    #[serde(default, deserialize_with = "optional_series_with_gaps")]
    pub net_hash: Option<Vec<f64>>,
    #[serde(deserialize_with = "series_with_gaps")]
    pub price: Vec<f64>,
}

fn fill_gaps(values: Vec<Option<f64>>) -> Vec<f64> {
    values.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect()
}

fn series_with_gaps<'de, D>(deserializer: D) -> Result<Vec<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Vec::<Option<f64>>::deserialize(deserializer).map(fill_gaps)
}

fn optional_series_with_gaps<'de, D>(deserializer: D) -> Result<Option<Vec<f64>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<Vec<Option<f64>>>::deserialize(deserializer).map(|series| series.map(fill_gaps))
}

impl HistoryLog {
    /// Check that every series is aligned with `timestamps`.
    pub fn validate(&self) -> Result<(), HistoryError> {
        let expected = self.timestamps.len();
        let series: [(&'static str, Option<&Vec<f64>>); 4] = [
            ("myHash", Some(&self.my_hash)),
            ("poolHash", self.pool_hash.as_ref()),
            ("netHash", self.net_hash.as_ref()),
            ("price", Some(&self.price)),
        ];

        for (name, values) in series {
            if let Some(values) = values {
                if values.len() != expected {
                    return Err(HistoryError::LengthMismatch {
                        series: name,
                        expected,
                        actual: values.len(),
                    });
                }
            }
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// Timestamp of the oldest retained sample.
    pub fn earliest(&self) -> Option<f64> {
        self.timestamps.first().copied()
    }

    /// Most recent recorded price, skipping gaps; `0.0` when there is none.
    pub fn latest_price(&self) -> f64 {
        self.price
            .iter()
            .rev()
            .copied()
            .find(|p| p.is_finite())
            .unwrap_or(0.0)
    }
}

/// Instantaneous readings gathered in one poll cycle.
///
/// Values are kept in the units the endpoints report them in; conversion to
/// display units goes through [`crate::ChainParams`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Snapshot {
    /// Miner hashrate in H/s.
    pub miner_hashrate: f64,
    /// Pool hashrate in H/s.
    pub pool_hashrate: f64,
    pub network_difficulty: f64,
    /// Block reward in atomic units.
    pub block_reward_atomic: f64,
    /// Minimum payout threshold in coins.
    pub min_payout_threshold: f64,
}
