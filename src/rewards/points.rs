//! Weight → eco-point conversion.

use crate::error::{AppError, AppResult};

/// Upper bucket bound (inclusive, kg) → points. Anything heavier earns
/// [`MAX_POINTS`].
const BUCKETS: [(f64, i64); 6] = [
    (0.05, 1),
    (0.25, 3),
    (0.5, 5),
    (1.0, 10),
    (2.0, 20),
    (5.0, 40),
];
const MAX_POINTS: i64 = 70;

/// Points for one recycling entry. `weight_kg` must already be validated.
pub fn award(weight_kg: f64) -> i64 {
    BUCKETS
        .iter()
        .find(|(limit, _)| weight_kg <= *limit)
        .map(|(_, points)| *points)
        .unwrap_or(MAX_POINTS)
}

pub fn validate_weight(weight_kg: f64) -> AppResult<f64> {
    if !weight_kg.is_finite() || weight_kg <= 0.0 {
        return Err(AppError::Validation(
            "Weight must be a positive number of kilograms".into(),
        ));
    }
    Ok(weight_kg)
}

/// Parses user-typed weight text such as `" 0.3 "`.
pub fn parse_weight(raw: &str) -> AppResult<f64> {
    let weight = raw
        .trim()
        .parse::<f64>()
        .map_err(|_| AppError::Validation(format!("Weight is not a number: {raw:?}")))?;
    validate_weight(weight)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bucket_boundaries_are_inclusive() {
        assert_eq!(award(0.01), 1);
        assert_eq!(award(0.05), 1);
        assert_eq!(award(0.051), 3);
        assert_eq!(award(0.25), 3);
        assert_eq!(award(0.3), 5);
        assert_eq!(award(0.5), 5);
        assert_eq!(award(1.0), 10);
        assert_eq!(award(2.0), 20);
        assert_eq!(award(5.0), 40);
        assert_eq!(award(5.0001), 70);
        assert_eq!(award(120.0), 70);
    }

    #[test]
    fn award_is_monotonic_and_caps_below_six_kilos() {
        let mut last = 0;
        for step in 1..=600 {
            let w = step as f64 / 100.0;
            let p = award(w);
            assert!(p >= last, "award dropped at {w}");
            if w <= 5.0 {
                assert_ne!(p, 70, "{w} kg must not reach the top bucket");
            } else {
                assert_eq!(p, 70);
            }
            last = p;
        }
    }

    #[test]
    fn rejects_invalid_weights() {
        assert!(validate_weight(0.0).is_err());
        assert!(validate_weight(-1.0).is_err());
        assert!(validate_weight(f64::NAN).is_err());
        assert!(validate_weight(f64::INFINITY).is_err());
        assert!(parse_weight("abc").is_err());
        assert_eq!(parse_weight(" 0.3 ").unwrap(), 0.3);
    }
}
