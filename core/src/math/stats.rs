pub struct StatsHelper;

impl StatsHelper {
    /// Evaluates a polynomial given highest-degree coefficient first.
    pub fn horner(coefficients: &[f64], x: f64) -> f64 {
        coefficients.iter().fold(0.0, |acc, &c| acc * x + c)
    }

    /// `10 log10(power)`. Non-positive input yields a non-finite result.
    pub fn power_to_db(power: f64) -> f64 {
        10.0 * power.log10()
    }

    pub fn mean_abs(values: &[f64]) -> f64 {
        if values.is_empty() {
            return 0.0;
        }
        values.iter().map(|v| v.abs()).sum::<f64>() / values.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn horner_matches_expanded_polynomial() {
        // 2x^2 - 3x + 1
        let coefficients = [2.0, -3.0, 1.0];
        for x in [-2.0, 0.0, 0.5, 3.0] {
            let expected = 2.0 * x * x - 3.0 * x + 1.0;
            assert!((StatsHelper::horner(&coefficients, x) - expected).abs() < 1e-12);
        }
    }

    #[test]
    fn empty_polynomial_is_zero() {
        assert_eq!(StatsHelper::horner(&[], 5.0), 0.0);
    }

    #[test]
    fn db_of_non_positive_power_is_not_finite() {
        assert_eq!(StatsHelper::power_to_db(100.0), 20.0);
        assert!(!StatsHelper::power_to_db(0.0).is_finite());
        assert!(StatsHelper::power_to_db(-1.0).is_nan());
    }

    #[test]
    fn mean_abs_handles_empty_and_signed() {
        assert_eq!(StatsHelper::mean_abs(&[]), 0.0);
        assert_eq!(StatsHelper::mean_abs(&[-2.0, 4.0]), 3.0);
    }
}
