//! Client for the JSON endpoints the dashboard consumes.

use std::time::Duration;

use dashboard_metrics::{HistoryLog, Snapshot};
use serde::{de::DeserializeOwned, Deserialize};
use tracing::debug;

use crate::{
    config::{Config, EndpointUrls},
    error::{DashboardError, Result},
};

const MINER_SUMMARY: &str = "miner summary";
const POOL_STATS: &str = "pool stats";
const NETWORK_STATS: &str = "network stats";
const MIN_PAYOUT: &str = "min payout threshold";
const HISTORY: &str = "history log";

/// xmrig `/2/summary`; only the short-window total is used.
#[derive(Debug, Deserialize)]
pub struct MinerSummary {
    pub hashrate: MinerHashrate,
}

#[derive(Debug, Deserialize)]
pub struct MinerHashrate {
    /// Totals over xmrig's averaging windows, `null` until a window fills.
    pub total: Vec<Option<f64>>,
}

impl MinerSummary {
    pub fn current_hashrate(&self) -> Option<f64> {
        self.hashrate.total.first().copied().flatten()
    }
}

#[derive(Debug, Deserialize)]
pub struct PoolStats {
    pub pool_statistics: PoolStatistics,
}

#[derive(Debug, Deserialize)]
pub struct PoolStatistics {
    #[serde(rename = "hashRate")]
    pub hash_rate: f64,
}

#[derive(Debug, Deserialize)]
pub struct NetworkStats {
    pub difficulty: f64,
    /// Block reward in atomic units.
    pub reward: f64,
}

#[derive(Debug, Deserialize)]
pub struct MinPaymentThreshold {
    /// Threshold in whole coins.
    #[serde(rename = "minPaymentThreshold")]
    pub min_payment_threshold: f64,
}

/// Everything fetched in one cycle.
#[derive(Debug, Clone)]
pub struct CycleData {
    pub snapshot: Snapshot,
    pub history: HistoryLog,
}

pub struct EndpointClient {
    client: reqwest::Client,
    urls: EndpointUrls,
}

impl EndpointClient {
    pub fn new(config: &Config) -> std::result::Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .pool_idle_timeout(Duration::from_secs(config.pool_idle_timeout_secs))
            .pool_max_idle_per_host(1)
            .build()?;
        Ok(Self {
            client,
            urls: config.endpoints.clone(),
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, endpoint: &'static str, url: &str) -> Result<T> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| DashboardError::Transport { endpoint, source })?;

        let status = response.status();
        if !status.is_success() {
            return Err(DashboardError::Status { endpoint, status });
        }

        let body = response
            .bytes()
            .await
            .map_err(|source| DashboardError::Transport { endpoint, source })?;
        debug!("Fetched {} bytes from {}", body.len(), endpoint);

        serde_json::from_slice(&body).map_err(|source| DashboardError::Decode { endpoint, source })
    }

    pub async fn miner_summary(&self) -> Result<MinerSummary> {
        self.get_json(MINER_SUMMARY, &self.urls.miner_summary).await
    }

    pub async fn pool_stats(&self) -> Result<PoolStats> {
        self.get_json(POOL_STATS, &self.urls.pool_stats).await
    }

    pub async fn network_stats(&self) -> Result<NetworkStats> {
        self.get_json(NETWORK_STATS, &self.urls.network_stats).await
    }

    pub async fn min_payment_threshold(&self) -> Result<MinPaymentThreshold> {
        self.get_json(MIN_PAYOUT, &self.urls.min_payout_threshold).await
    }

    pub async fn history(&self) -> Result<HistoryLog> {
        let history: HistoryLog = self.get_json(HISTORY, &self.urls.history).await?;
        history.validate()?;
        Ok(history)
    }

    /// Fetch all endpoints concurrently. The first failure aborts the rest.
    pub async fn fetch_cycle(&self) -> Result<CycleData> {
        let (summary, pool, network, threshold, history) = tokio::try_join!(
            self.miner_summary(),
            self.pool_stats(),
            self.network_stats(),
            self.min_payment_threshold(),
            self.history(),
        )?;

        let miner_hashrate = summary.current_hashrate().ok_or(DashboardError::MissingField {
            endpoint: MINER_SUMMARY,
            field: "hashrate.total[0]",
        })?;

        Ok(CycleData {
            snapshot: Snapshot {
                miner_hashrate,
                pool_hashrate: pool.pool_statistics.hash_rate,
                network_difficulty: network.difficulty,
                block_reward_atomic: network.reward,
                min_payout_threshold: threshold.min_payment_threshold,
            },
            history,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_miner_summary_uses_first_total() {
        let json = r#"{"hashrate": {"total": [1234.5, 1200.0, null], "highest": 1300.0}}"#;
        let summary: MinerSummary = serde_json::from_str(json).unwrap();
        assert_eq!(summary.current_hashrate(), Some(1234.5));
    }

    #[test]
    fn test_miner_summary_without_sample() {
        let json = r#"{"hashrate": {"total": [null, null, null]}}"#;
        let summary: MinerSummary = serde_json::from_str(json).unwrap();
        assert_eq!(summary.current_hashrate(), None);

        let empty: MinerSummary = serde_json::from_str(r#"{"hashrate": {"total": []}}"#).unwrap();
        assert_eq!(empty.current_hashrate(), None);
    }

    #[test]
    fn test_pool_and_network_shapes() {
        let pool: PoolStats =
            serde_json::from_str(r#"{"pool_statistics": {"hashRate": 5000000, "miners": 12}}"#)
                .unwrap();
        assert_eq!(pool.pool_statistics.hash_rate, 5_000_000.0);

        let network: NetworkStats = serde_json::from_str(
            r#"{"difficulty": 144000000, "height": 3000000, "reward": 600000000000}"#,
        )
        .unwrap();
        assert_eq!(network.difficulty, 144_000_000.0);
        assert_eq!(network.reward, 600_000_000_000.0);

        let threshold: MinPaymentThreshold =
            serde_json::from_str(r#"{"minPaymentThreshold": 0.00027}"#).unwrap();
        assert_eq!(threshold.min_payment_threshold, 0.00027);
    }

    #[test]
    fn test_pool_stats_missing_field_is_decode_error() {
        let result: std::result::Result<PoolStats, _> =
            serde_json::from_str(r#"{"pool_statistics": {}}"#);
        assert!(result.is_err());
    }
}
