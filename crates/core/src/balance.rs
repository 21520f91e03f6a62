//! Balance observations and derived spend figures.

use chrono::{DateTime, Utc};

/// One timestamped observation of a partner's account balance.
#[derive(Debug, Clone, PartialEq)]
pub struct BalanceSample {
    pub partner: String,
    pub network: String,
    pub amount: f64,
    pub recorded_at: DateTime<Utc>,
}

impl BalanceSample {
    pub fn new(
        partner: impl Into<String>,
        network: impl Into<String>,
        amount: f64,
        recorded_at: DateTime<Utc>,
    ) -> Self {
        Self {
            partner: partner.into(),
            network: network.into(),
            amount,
            recorded_at,
        }
    }
}

/// Expected consumption for a partner, recomputed on every request.
#[derive(Debug, Clone, PartialEq)]
pub struct SpendEstimate {
    pub partner: String,
    pub value: f64,
}

/// Round to `places` decimal digits, ties away from zero.
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_to_half_away_from_zero() {
        assert_eq!(round_to(2.5, 0), 3.0);
        assert_eq!(round_to(-2.5, 0), -3.0);
        assert_eq!(round_to(1.125, 2), 1.13);
        assert_eq!(round_to(128.6125, 2), 128.61);
    }

    #[test]
    fn test_round_to_keeps_exact_values() {
        assert_eq!(round_to(20.0, 2), 20.0);
        assert_eq!(round_to(0.0, 2), 0.0);
    }
}
