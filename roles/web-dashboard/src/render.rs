//! Turns fetched cycle data into dashboard text and chart series.

use dashboard_metrics::{
    ChainParams, DerivedMetrics, EarningsPeriod, HistoryLog, PayoutEstimate, SmoothingParams,
};
use web_utils::{format_currency, format_fixed, format_hashrate, format_percent, UNAVAILABLE};

use crate::{
    config::Config,
    endpoints::CycleData,
    sink::{ChartId, Field, MetricsSink, SeriesPoint},
};

/// The subset of [`Config`] that shapes rendering.
#[derive(Debug, Clone)]
pub struct RenderSettings {
    pub chain: ChainParams,
    pub smoothing: SmoothingParams,
    pub ticker: String,
    pub currency_symbol: String,
    pub chart_range_hours: f64,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            chain: ChainParams::default(),
            smoothing: SmoothingParams::default(),
            ticker: "XMR".to_string(),
            currency_symbol: "€".to_string(),
            chart_range_hours: 24.0,
        }
    }
}

impl From<&Config> for RenderSettings {
    fn from(config: &Config) -> Self {
        Self {
            chain: config.chain,
            smoothing: config.smoothing,
            ticker: config.ticker.clone(),
            currency_symbol: config.currency_symbol.clone(),
            chart_range_hours: config.chart_range_hours,
        }
    }
}

pub fn derive_metrics(data: &CycleData, now: f64, settings: &RenderSettings) -> DerivedMetrics {
    DerivedMetrics::from_history(
        &data.snapshot,
        &data.history,
        now,
        settings.smoothing,
        &settings.chain,
    )
}

/// "24h moving average" once the full window is available, otherwise the
/// hours actually covered.
pub fn average_window_label(window_hours: f64, max_hours: f64) -> String {
    if window_hours >= max_hours {
        format!("{}h moving average", format_hours(max_hours))
    } else {
        format!("{:.1}h moving average", window_hours)
    }
}

fn format_hours(hours: f64) -> String {
    if hours.fract() == 0.0 {
        format!("{}", hours)
    } else {
        format!("{:.1}", hours)
    }
}

pub fn payout_interval_text(payout: &PayoutEstimate) -> String {
    match payout.hours_per_payout() {
        Some(hours) => format!(
            "{:.2} payouts/day (~{:.1}h/payout)",
            payout.payouts_per_day, hours
        ),
        None => format!("{:.2} payouts/day (interval {})", payout.payouts_per_day, UNAVAILABLE),
    }
}

pub fn payout_tooltip(payout: &PayoutEstimate) -> String {
    let hours = payout
        .hours_per_payout()
        .map(|h| format!("~{:.1} hours", h))
        .unwrap_or_else(|| UNAVAILABLE.to_string());
    format!(
        "Average payout interval: {}\nYour actual payouts can be shorter or longer, depending on mining luck.",
        hours
    )
}

pub fn earnings_tooltip(metrics: &DerivedMetrics, window_label: &str) -> String {
    format!(
        "Estimated earnings based on {}.\nAvg your hashrate: {}\nAvg pool hashrate: {}\nAvg network hashrate: {}",
        window_label,
        format_hashrate(metrics.smoothed.mine),
        format_hashrate(metrics.smoothed.pool),
        format_hashrate(metrics.smoothed.network),
    )
}

/// Hashrate and price series over the last `hours`.
pub fn chart_series(history: &HistoryLog, now: f64, hours: f64) -> [(ChartId, Vec<SeriesPoint>); 2] {
    let window = history.window(now, hours);
    let to_points = |values: &[f64]| -> Vec<SeriesPoint> {
        window.points(values).into_iter().map(SeriesPoint::from).collect()
    };
    [
        (ChartId::Hashrate, to_points(window.my_hash)),
        (ChartId::Price, to_points(window.price)),
    ]
}

/// Render one cycle's metrics into `sink`.
pub fn render_dashboard(
    sink: &mut dyn MetricsSink,
    metrics: &DerivedMetrics,
    history: &HistoryLog,
    now: f64,
    last_refreshed: &str,
    settings: &RenderSettings,
) {
    sink.render_scalar(Field::MyHashrate, &format_hashrate(metrics.my_hashrate));
    sink.render_scalar(Field::PoolHashrate, &format_hashrate(metrics.pool_hashrate));
    sink.render_scalar(Field::NetworkHashrate, &format_hashrate(metrics.network_hashrate));
    sink.render_scalar(Field::BlockReward, &format_fixed(metrics.block_reward, 6));
    sink.render_scalar(Field::PoolShare, &format_percent(metrics.pool_share_percent));
    sink.render_scalar(
        Field::Price,
        &format_currency(&settings.currency_symbol, metrics.price),
    );

    for period in EarningsPeriod::ALL {
        let coins = metrics.earnings_for(period);
        sink.render_scalar(
            Field::EarningsCoin(period),
            &format!("{} {}", format_fixed(coins, 6), settings.ticker),
        );
        sink.render_scalar(
            Field::EarningsFiat(period),
            &format!(
                "≈ {}",
                format_currency(&settings.currency_symbol, metrics.fiat_earnings_for(period))
            ),
        );
    }

    let window_label = average_window_label(
        metrics.average_window_hours,
        settings.smoothing.max_average_hours,
    );
    sink.render_scalar(
        Field::EarningsTooltip,
        &earnings_tooltip(metrics, &window_label),
    );
    sink.render_scalar(Field::EarningsLegend, &format!("Based on {}", window_label));
    sink.render_scalar(Field::PayoutInterval, &payout_interval_text(&metrics.payout));
    sink.render_scalar(Field::PayoutTooltip, &payout_tooltip(&metrics.payout));
    sink.render_scalar(
        Field::LastRefreshed,
        &format!("Last refreshed: {}", last_refreshed),
    );

    for (chart, points) in chart_series(history, now, settings.chart_range_hours) {
        sink.render_series(chart, &points);
    }
}
