//! Derived display metrics: pool share, network hashrate, earnings and payout
//! frequency.
//!
//! Every function here is total. Zero or negative denominators resolve to `0.0`
//! or `None` so that formatting never has to deal with `NaN`; the only
//! non-finite value that can escape is the `blocks_needed` of a
//! [`PayoutEstimate`], which callers read through its accessors.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{
    smoothing::trailing_moving_average,
    types::{HistoryLog, Snapshot},
    windowing::effective_window_hours,
};

/// Target block time of the chain, in seconds (Monero: two minutes).
pub const DEFAULT_BLOCK_TIME_SECS: f64 = 120.0;

/// Atomic units per whole coin (Monero piconero).
pub const ATOMIC_UNITS_PER_COIN: f64 = 1e12;

pub const SECONDS_PER_DAY: f64 = 86_400.0;

/// Upper bound for the hashrate averaging window.
pub const DEFAULT_MAX_AVERAGE_HOURS: f64 = 24.0;

/// Chain constants used to convert raw endpoint values into display units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChainParams {
    pub block_time_secs: f64,
    pub atomic_units_per_coin: f64,
}

impl Default for ChainParams {
    fn default() -> Self {
        Self {
            block_time_secs: DEFAULT_BLOCK_TIME_SECS,
            atomic_units_per_coin: ATOMIC_UNITS_PER_COIN,
        }
    }
}

impl ChainParams {
    pub fn blocks_per_day(&self) -> f64 {
        SECONDS_PER_DAY / self.block_time_secs
    }

    /// Network hashrate implied by the current difficulty.
    pub fn network_hashrate(&self, difficulty: f64) -> f64 {
        difficulty / self.block_time_secs
    }

    pub fn reward_in_coins(&self, atomic: f64) -> f64 {
        atomic / self.atomic_units_per_coin
    }
}

/// Horizon for an earnings estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EarningsPeriod {
    Hour,
    Day,
    Week,
    Month,
    Year,
}

impl EarningsPeriod {
    pub const ALL: [EarningsPeriod; 5] = [
        EarningsPeriod::Hour,
        EarningsPeriod::Day,
        EarningsPeriod::Week,
        EarningsPeriod::Month,
        EarningsPeriod::Year,
    ];

    /// Length of the period in days.
    pub fn multiplier(self) -> f64 {
        match self {
            EarningsPeriod::Hour => 1.0 / 24.0,
            EarningsPeriod::Day => 1.0,
            EarningsPeriod::Week => 7.0,
            EarningsPeriod::Month => 30.0,
            EarningsPeriod::Year => 365.0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EarningsPeriod::Hour => "hour",
            EarningsPeriod::Day => "day",
            EarningsPeriod::Week => "week",
            EarningsPeriod::Month => "month",
            EarningsPeriod::Year => "year",
        }
    }
}

impl fmt::Display for EarningsPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownPeriod(pub String);

impl fmt::Display for UnknownPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown earnings period `{}`", self.0)
    }
}

impl std::error::Error for UnknownPeriod {}

impl FromStr for EarningsPeriod {
    type Err = UnknownPeriod;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EarningsPeriod::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownPeriod(s.to_string()))
    }
}

/// Hashrates used for earnings, all in H/s.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SmoothedHashrates {
    pub mine: f64,
    pub pool: f64,
    pub network: f64,
}

/// Settings for [`smooth_hashrates`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SmoothingParams {
    pub window_secs: u64,
    pub max_average_hours: f64,
}

impl Default for SmoothingParams {
    fn default() -> Self {
        Self {
            window_secs: crate::smoothing::DEFAULT_SMOOTHING_WINDOW_SECS,
            max_average_hours: DEFAULT_MAX_AVERAGE_HOURS,
        }
    }
}

/// Smoothed hashrates over the effective averaging window.
///
/// Returns the hashrates together with the window length in hours. Any series
/// the log does not carry, any series whose window holds only gaps, and every
/// series when the window is empty, falls back to the instantaneous reading.
pub fn smooth_hashrates(
    history: &HistoryLog,
    instant: SmoothedHashrates,
    now: f64,
    params: SmoothingParams,
) -> (SmoothedHashrates, f64) {
    let window_hours = effective_window_hours(history, now, params.max_average_hours);
    if window_hours <= 0.0 || history.is_empty() {
        return (instant, window_hours);
    }

    let window = history.window(now, window_hours);
    let smooth = |values: Option<&[f64]>, fallback: f64| match values {
        Some(values) if !values.is_empty() => {
            let average = trailing_moving_average(window.timestamps, values, params.window_secs);
            if average.is_finite() {
                average
            } else {
                fallback
            }
        }
        _ => fallback,
    };

    let smoothed = SmoothedHashrates {
        mine: smooth(Some(window.my_hash), instant.mine),
        pool: smooth(window.pool_hash, instant.pool),
        network: smooth(window.net_hash, instant.network),
    };
    (smoothed, window_hours)
}

/// Miner's share of the pool in percent, `None` when the pool reports no
/// hashrate.
pub fn pool_share_percent(my_hashrate: f64, pool_hashrate: f64) -> Option<f64> {
    if pool_hashrate > 0.0 && pool_hashrate.is_finite() && my_hashrate.is_finite() {
        Some(my_hashrate / pool_hashrate * 100.0)
    } else {
        None
    }
}

/// Miner's fraction of the whole network, `0.0` when the network hashrate is
/// unknown.
pub fn network_share(my_hashrate: f64, network_hashrate: f64) -> f64 {
    if network_hashrate > 0.0 && network_hashrate.is_finite() && my_hashrate.is_finite() {
        my_hashrate / network_hashrate
    } else {
        0.0
    }
}

/// Expected coins mined over `period`.
pub fn estimated_earnings(
    my_hashrate: f64,
    network_hashrate: f64,
    block_reward: f64,
    period: EarningsPeriod,
    chain: &ChainParams,
) -> f64 {
    network_share(my_hashrate, network_hashrate)
        * chain.blocks_per_day()
        * block_reward
        * period.multiplier()
}

/// Expected cadence of payouts given the pool's minimum payout threshold.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PayoutEstimate {
    /// Expected coins per network block; `0.0` when nothing is earned.
    pub per_block_earning: f64,
    /// Blocks needed to reach the threshold; infinite when nothing is earned.
    pub blocks_needed: f64,
    pub payouts_per_day: f64,
    days_per_payout: f64,
}

impl PayoutEstimate {
    pub fn compute(
        my_hashrate: f64,
        network_hashrate: f64,
        block_reward: f64,
        min_payout_threshold: f64,
        chain: &ChainParams,
    ) -> Self {
        let per_block_earning = network_share(my_hashrate, network_hashrate) * block_reward;
        let blocks_needed = if per_block_earning > 0.0 {
            min_payout_threshold / per_block_earning
        } else {
            f64::INFINITY
        };
        let days_per_payout = blocks_needed / chain.blocks_per_day();
        let payouts_per_day = if days_per_payout.is_finite() && days_per_payout > 0.0 {
            1.0 / days_per_payout
        } else {
            0.0
        };

        Self {
            per_block_earning,
            blocks_needed,
            payouts_per_day,
            days_per_payout,
        }
    }

    /// Days between payouts, `None` when no payout is expected.
    pub fn days_per_payout(&self) -> Option<f64> {
        self.days_per_payout
            .is_finite()
            .then_some(self.days_per_payout)
    }

    pub fn hours_per_payout(&self) -> Option<f64> {
        self.days_per_payout().map(|days| days * 24.0)
    }
}

/// Everything the dashboard displays for one cycle, before formatting.
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedMetrics {
    pub my_hashrate: f64,
    pub pool_hashrate: f64,
    pub network_hashrate: f64,
    pub block_reward: f64,
    pub pool_share_percent: Option<f64>,
    pub price: f64,
    pub smoothed: SmoothedHashrates,
    pub average_window_hours: f64,
    /// Coins per period, in [`EarningsPeriod::ALL`] order.
    pub earnings: [(EarningsPeriod, f64); 5],
    pub payout: PayoutEstimate,
}

impl DerivedMetrics {
    /// Derive the display metrics for one cycle.
    ///
    /// The instantaneous readings drive the hashrate and pool share fields;
    /// earnings and payout cadence use the smoothed hashrates to avoid
    /// flicker from noisy samples.
    pub fn compute(
        snapshot: &Snapshot,
        smoothed: SmoothedHashrates,
        average_window_hours: f64,
        price: f64,
        chain: &ChainParams,
    ) -> Self {
        let network_hashrate = chain.network_hashrate(snapshot.network_difficulty);
        let block_reward = chain.reward_in_coins(snapshot.block_reward_atomic);

        let earnings = EarningsPeriod::ALL.map(|period| {
            (
                period,
                estimated_earnings(smoothed.mine, smoothed.network, block_reward, period, chain),
            )
        });

        let payout = PayoutEstimate::compute(
            smoothed.mine,
            smoothed.network,
            block_reward,
            snapshot.min_payout_threshold,
            chain,
        );

        Self {
            my_hashrate: snapshot.miner_hashrate,
            pool_hashrate: snapshot.pool_hashrate,
            network_hashrate,
            block_reward,
            pool_share_percent: pool_share_percent(snapshot.miner_hashrate, snapshot.pool_hashrate),
            price,
            smoothed,
            average_window_hours,
            earnings,
            payout,
        }
    }

    /// Smooth the history and derive the metrics in one step.
    pub fn from_history(
        snapshot: &Snapshot,
        history: &HistoryLog,
        now: f64,
        smoothing: SmoothingParams,
        chain: &ChainParams,
    ) -> Self {
        let instant = SmoothedHashrates {
            mine: snapshot.miner_hashrate,
            pool: snapshot.pool_hashrate,
            network: chain.network_hashrate(snapshot.network_difficulty),
        };
        let (smoothed, window_hours) = smooth_hashrates(history, instant, now, smoothing);
        Self::compute(snapshot, smoothed, window_hours, history.latest_price(), chain)
    }

    pub fn earnings_for(&self, period: EarningsPeriod) -> f64 {
        self.earnings
            .iter()
            .find(|(p, _)| *p == period)
            .map(|(_, coins)| *coins)
            .unwrap_or(0.0)
    }

    pub fn fiat_earnings_for(&self, period: EarningsPeriod) -> f64 {
        self.earnings_for(period) * self.price
    }
}
