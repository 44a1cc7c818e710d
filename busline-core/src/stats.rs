//! Display helpers for the admin dashboard.
//!
//! The numbers come from the server; these only turn them into ratios and
//! strings.

use busline_shared::models::StatsSummary;
use chrono::Duration;

/// `part / whole` clamped to `0.0..=1.0`; zero when `whole` is zero
pub fn progress_ratio(part: f64, whole: f64) -> f64 {
    if whole <= 0.0 || !part.is_finite() || !whole.is_finite() {
        return 0.0;
    }
    (part / whole).clamp(0.0, 1.0)
}

/// Percentage with one decimal, e.g. `"72.5%"`
pub fn format_percent(percent: f64) -> String {
    let value = if percent.is_finite() { percent } else { 0.0 };
    format!("{:.1}%", value)
}

/// Clamp a server-reported percentage into `0.0..=100.0` for a progress bar
pub fn clamp_percent(percent: f64) -> f64 {
    if percent.is_finite() {
        percent.clamp(0.0, 100.0)
    } else {
        0.0
    }
}

/// Online and cash shares of revenue, in percent. Both zero when there is
/// no revenue of either kind.
pub fn revenue_split(summary: &StatsSummary) -> (f64, f64) {
    let online = summary.online_revenue as f64;
    let cash = summary.cash_revenue as f64;
    let total = online + cash;
    (
        progress_ratio(online, total) * 100.0,
        progress_ratio(cash, total) * 100.0,
    )
}

/// Whole amount with grouped thousands, e.g. `1234567` -> `"1,234,567"`
pub fn format_amount(amount: u64) -> String {
    let digits = amount.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Amount with the rupee sign
pub fn format_money(amount: u64) -> String {
    format!("₹{}", format_amount(amount))
}

/// Running time as `"6h 30m"`, or `"6h"` on the hour
pub fn format_duration(duration: Duration) -> String {
    let minutes = duration.num_minutes().max(0);
    let (hours, rest) = (minutes / 60, minutes % 60);
    if rest > 0 {
        format!("{}h {}m", hours, rest)
    } else {
        format!("{}h", hours)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_ratio_clamps() {
        assert_eq!(progress_ratio(10.0, 40.0), 0.25);
        assert_eq!(progress_ratio(50.0, 40.0), 1.0);
        assert_eq!(progress_ratio(5.0, 0.0), 0.0);
        assert_eq!(progress_ratio(f64::NAN, 10.0), 0.0);
    }

    #[test]
    fn test_format_percent() {
        assert_eq!(format_percent(72.456), "72.5%");
        assert_eq!(format_percent(0.0), "0.0%");
        assert_eq!(clamp_percent(130.0), 100.0);
        assert_eq!(clamp_percent(-3.0), 0.0);
    }

    #[test]
    fn test_revenue_split() {
        let summary = StatsSummary {
            online_revenue: 750,
            cash_revenue: 250,
            ..Default::default()
        };
        assert_eq!(revenue_split(&summary), (75.0, 25.0));
        assert_eq!(revenue_split(&StatsSummary::default()), (0.0, 0.0));
    }

    #[test]
    fn test_format_amount_groups_thousands() {
        assert_eq!(format_amount(0), "0");
        assert_eq!(format_amount(999), "999");
        assert_eq!(format_amount(1000), "1,000");
        assert_eq!(format_amount(1234567), "1,234,567");
        assert_eq!(format_money(45000), "₹45,000");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::minutes(390)), "6h 30m");
        assert_eq!(format_duration(Duration::hours(4)), "4h");
        assert_eq!(format_duration(Duration::minutes(-5)), "0h");
    }
}
