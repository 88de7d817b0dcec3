//! Display sinks the refresh cycle renders into.

use std::{borrow::Cow, collections::BTreeMap};

use dashboard_metrics::{EarningsPeriod, HistoryLog};
use serde::Serialize;
use tracing::debug;

/// Named text fields on the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
    MyHashrate,
    PoolHashrate,
    NetworkHashrate,
    BlockReward,
    PoolShare,
    Price,
    EarningsCoin(EarningsPeriod),
    EarningsFiat(EarningsPeriod),
    EarningsTooltip,
    EarningsLegend,
    PayoutInterval,
    PayoutTooltip,
    LastRefreshed,
}

impl Field {
    pub fn key(&self) -> Cow<'static, str> {
        match self {
            Field::MyHashrate => "my_hashrate".into(),
            Field::PoolHashrate => "pool_hashrate".into(),
            Field::NetworkHashrate => "net_hashrate".into(),
            Field::BlockReward => "block_reward".into(),
            Field::PoolShare => "pool_share".into(),
            Field::Price => "price".into(),
            Field::EarningsCoin(period) => format!("earn_coin_{}", period).into(),
            Field::EarningsFiat(period) => format!("earn_fiat_{}", period).into(),
            Field::EarningsTooltip => "earn_tooltip".into(),
            Field::EarningsLegend => "earn_legend".into(),
            Field::PayoutInterval => "payout_interval".into(),
            Field::PayoutTooltip => "payout_tooltip".into(),
            Field::LastRefreshed => "last_refreshed".into(),
        }
    }
}

/// Time-series charts on the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartId {
    Hashrate,
    Price,
}

impl ChartId {
    pub fn key(self) -> &'static str {
        match self {
            ChartId::Hashrate => "hashrate",
            ChartId::Price => "price",
        }
    }
}

/// One chart point: x is unix milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SeriesPoint {
    pub x: f64,
    pub y: f64,
}

impl From<(f64, f64)> for SeriesPoint {
    fn from((x, y): (f64, f64)) -> Self {
        Self { x, y }
    }
}

/// Anything that can display rendered metrics.
pub trait MetricsSink {
    fn render_scalar(&mut self, field: Field, text: &str);
    fn render_series(&mut self, chart: ChartId, points: &[SeriesPoint]);
}

/// Fully rendered dashboard for one successful cycle.
///
/// A new view is built every cycle and replaces the previous one wholesale,
/// so readers never observe a mix of two cycles.
#[derive(Debug, Clone, Default)]
pub struct DashboardView {
    scalars: BTreeMap<Field, String>,
    series: BTreeMap<ChartId, Vec<SeriesPoint>>,
    /// History the charts were cut from, kept for re-slicing on request.
    pub history: HistoryLog,
    /// Unix seconds at which the cycle completed.
    pub refreshed_at: u64,
}

impl DashboardView {
    pub fn new(history: HistoryLog, refreshed_at: u64) -> Self {
        Self {
            history,
            refreshed_at,
            ..Default::default()
        }
    }

    pub fn scalar(&self, field: Field) -> Option<&str> {
        self.scalars.get(&field).map(String::as_str)
    }

    pub fn scalars(&self) -> impl Iterator<Item = (Field, &str)> {
        self.scalars.iter().map(|(field, text)| (*field, text.as_str()))
    }

    pub fn series(&self, chart: ChartId) -> &[SeriesPoint] {
        self.series.get(&chart).map(Vec::as_slice).unwrap_or(&[])
    }
}

impl MetricsSink for DashboardView {
    fn render_scalar(&mut self, field: Field, text: &str) {
        self.scalars.insert(field, text.to_string());
    }

    fn render_series(&mut self, chart: ChartId, points: &[SeriesPoint]) {
        self.series.insert(chart, points.to_vec());
    }
}

/// Logs every rendered value at debug level.
#[derive(Debug, Default)]
pub struct TracingSink;

impl MetricsSink for TracingSink {
    fn render_scalar(&mut self, field: Field, text: &str) {
        debug!("{} = {}", field.key(), text);
    }

    fn render_series(&mut self, chart: ChartId, points: &[SeriesPoint]) {
        match points.last() {
            Some(last) => debug!("{:?} chart: {} points, last {:?}", chart, points.len(), last),
            None => debug!("{:?} chart: empty", chart),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_keys_are_unique() {
        let mut fields = vec![
            Field::MyHashrate,
            Field::PoolHashrate,
            Field::NetworkHashrate,
            Field::BlockReward,
            Field::PoolShare,
            Field::Price,
            Field::EarningsTooltip,
            Field::EarningsLegend,
            Field::PayoutInterval,
            Field::PayoutTooltip,
            Field::LastRefreshed,
        ];
        for period in EarningsPeriod::ALL {
            fields.push(Field::EarningsCoin(period));
            fields.push(Field::EarningsFiat(period));
        }
        let mut keys: Vec<String> = fields.iter().map(|f| f.key().into_owned()).collect();
        keys.sort();
        keys.dedup();
        assert_eq!(keys.len(), fields.len());
        assert_eq!(Field::EarningsCoin(EarningsPeriod::Week).key(), "earn_coin_week");
    }

    #[test]
    fn test_view_records_rendered_values() {
        let mut view = DashboardView::new(HistoryLog::default(), 42);
        view.render_scalar(Field::Price, "€150.00");
        view.render_scalar(Field::Price, "€151.00");
        view.render_series(ChartId::Price, &[SeriesPoint { x: 1000.0, y: 151.0 }]);

        assert_eq!(view.scalar(Field::Price), Some("€151.00"));
        assert_eq!(view.scalar(Field::PoolShare), None);
        assert_eq!(view.series(ChartId::Price).len(), 1);
        assert!(view.series(ChartId::Hashrate).is_empty());
        assert_eq!(view.scalars().count(), 1);
        assert_eq!(view.refreshed_at, 42);
    }

    #[test]
    fn test_series_point_serializes_as_xy() {
        let json = serde_json::to_string(&SeriesPoint::from((1000.0, 2.5))).unwrap();
        assert_eq!(json, r#"{"x":1000.0,"y":2.5}"#);
    }
}
