/// Placeholder shown wherever a metric has no meaningful value
pub const UNAVAILABLE: &str = "N/A";

/// Format elapsed time in human-readable format
pub fn format_elapsed_time(now: u64, timestamp: u64) -> String {
    let elapsed = now.saturating_sub(timestamp);
    if elapsed < 60 {
        format!("{}s ago", elapsed)
    } else if elapsed < 3600 {
        format!("{}m ago", elapsed / 60)
    } else if elapsed < 86400 {
        format!("{}h ago", elapsed / 3600)
    } else {
        format!("{}d ago", elapsed / 86400)
    }
}

/// Format hashrate with appropriate unit (H/s, kH/s, MH/s, GH/s)
///
/// Unit boundaries are inclusive: exactly 1e9 is "1.00 GH/s" while anything
/// below it stays in MH/s, even when it rounds up to "1000.00 MH/s".
pub fn format_hashrate(hashrate: f64) -> String {
    if !hashrate.is_finite() {
        UNAVAILABLE.to_string()
    } else if hashrate >= 1e9 {
        format!("{:.2} GH/s", hashrate / 1e9)
    } else if hashrate >= 1e6 {
        format!("{:.2} MH/s", hashrate / 1e6)
    } else if hashrate >= 1e3 {
        format!("{:.2} kH/s", hashrate / 1e3)
    } else {
        // Negative readings and -0.0 render as zero.
        let rounded = hashrate.round();
        format!("{} H/s", if rounded > 0.0 { rounded } else { 0.0 })
    }
}

/// Fixed-point rendering that never leaks `NaN` or `inf`
pub fn format_fixed(value: f64, decimals: usize) -> String {
    if value.is_finite() {
        format!("{:.*}", decimals, value)
    } else {
        UNAVAILABLE.to_string()
    }
}

/// Percentage with four decimals, or the placeholder when undefined
pub fn format_percent(value: Option<f64>) -> String {
    match value {
        Some(v) if v.is_finite() => format!("{:.4}%", v),
        _ => UNAVAILABLE.to_string(),
    }
}

/// Currency amount with two decimals, e.g. "€12.34"
pub fn format_currency(symbol: &str, amount: f64) -> String {
    if amount.is_finite() {
        format!("{}{:.2}", symbol, amount)
    } else {
        format!("{}{}", symbol, UNAVAILABLE)
    }
}
