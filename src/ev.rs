/// Bettor's expected value per unit staked: (probability x decimal odds) - 1.
/// `prob_percent` is in percent, as stored on predictions.
pub fn expected_value(prob_percent: f32, decimal_odds: f64) -> f64 {
    let p = (f64::from(prob_percent) / 100.0).clamp(0.0, 1.0);
    p * decimal_odds - 1.0
}

/// Display form, rounded to 3 decimals like the odds widgets show it.
pub fn format_ev(prob_percent: f32, decimal_odds: f64) -> String {
    format!("{:+.3}", expected_value(prob_percent, decimal_odds))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fair_odds_have_zero_ev() {
        let ev = expected_value(50.0, 2.0);
        assert!(ev.abs() < 1e-9);
    }

    #[test]
    fn positive_edge_is_positive_ev() {
        assert!(expected_value(60.0, 2.0) > 0.0);
        assert!(expected_value(40.0, 2.0) < 0.0);
    }

    #[test]
    fn out_of_range_probability_is_clamped() {
        assert_eq!(expected_value(150.0, 2.0), 1.0);
        assert_eq!(expected_value(-10.0, 2.0), -1.0);
    }

    #[test]
    fn formats_signed_three_decimals() {
        assert_eq!(format_ev(50.0, 1.9), "-0.050");
        assert_eq!(format_ev(50.0, 2.1), "+0.050");
    }
}
