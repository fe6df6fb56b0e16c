use serde::Serialize;

/// Share of `goal` reached by `current`, clamped to `[0, 100]`.
///
/// A non-positive goal and non-finite inputs yield 0.
pub fn percentage(current: f64, goal: f64) -> f64 {
    if !current.is_finite() || !goal.is_finite() || goal <= 0.0 {
        return 0.0;
    }
    let ratio = current / goal * 100.0;
    if ratio.is_nan() {
        0.0
    } else {
        ratio.clamp(0.0, 100.0)
    }
}

/// Formats a number the way an en-US locale does: comma thousands
/// separators and at most three fractional digits.
pub fn format_count(value: f64) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return if value < 0.0 { "-∞" } else { "∞" }.to_string();
    }

    let fixed = format!("{:.3}", value.abs());
    let (whole, fraction) = fixed.split_once('.').unwrap_or((fixed.as_str(), ""));
    let fraction = fraction.trim_end_matches('0');

    let mut out = String::with_capacity(fixed.len() + whole.len() / 3 + 1);
    let negative = value < 0.0 && (whole != "0" || !fraction.is_empty());
    if negative {
        out.push('-');
    }
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(digit);
    }
    if !fraction.is_empty() {
        out.push('.');
        out.push_str(fraction);
    }
    out
}

/// Everything the page needs to draw the funding bar.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressView {
    pub percentage: f64,
    /// CSS-style width of the filled part, e.g. `"40%"`.
    pub bar_width: String,
    pub current_label: String,
    pub goal_label: String,
    /// Whole-number percentage shown in the stats row.
    pub funded_label: String,
}

impl ProgressView {
    pub fn new(current: f64, goal: f64) -> Self {
        let percentage = percentage(current, goal);
        Self {
            percentage,
            bar_width: format!("{percentage}%"),
            current_label: format_count(current),
            goal_label: format_count(goal),
            funded_label: format!("{}%", percentage.round()),
        }
    }

    /// Filled cells of a text bar `width` cells wide.
    pub fn filled_cells(&self, width: usize) -> usize {
        ((self.percentage / 100.0) * width as f64).round() as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_funding_view() {
        let view = ProgressView::new(400.0, 1000.0);
        assert_eq!(view.percentage, 40.0);
        assert_eq!(view.bar_width, "40%");
        assert_eq!(view.current_label, "400");
        assert_eq!(view.goal_label, "1,000");
        assert_eq!(view.funded_label, "40%");
        assert_eq!(view.filled_cells(50), 20);
    }

    #[test]
    fn zero_goal_is_zero_percent() {
        assert_eq!(percentage(400.0, 0.0), 0.0);
        assert_eq!(percentage(0.0, 0.0), 0.0);
        assert_eq!(ProgressView::new(5.0, 0.0).bar_width, "0%");
    }

    #[test]
    fn clamps_both_ends() {
        assert_eq!(percentage(1500.0, 1000.0), 100.0);
        assert_eq!(percentage(-20.0, 1000.0), 0.0);
        assert_eq!(percentage(f64::NAN, 1000.0), 0.0);
        assert_eq!(percentage(f64::INFINITY, 1000.0), 0.0);
        assert_eq!(percentage(10.0, -5.0), 0.0);
    }

    #[test]
    fn formats_like_en_us() {
        assert_eq!(format_count(0.0), "0");
        assert_eq!(format_count(999.0), "999");
        assert_eq!(format_count(1000.0), "1,000");
        assert_eq!(format_count(1_234_567.0), "1,234,567");
        assert_eq!(format_count(1234.5), "1,234.5");
        assert_eq!(format_count(0.12345), "0.123");
        assert_eq!(format_count(-2500.0), "-2,500");
        assert_eq!(format_count(-0.0001), "0");
    }

    #[test]
    fn fractional_percentage_is_kept_for_the_bar() {
        let view = ProgressView::new(1.0, 3.0);
        assert!(view.bar_width.starts_with("33.33"));
        assert_eq!(view.funded_label, "33%");
    }
}
