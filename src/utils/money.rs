/// Money helpers for booking prices and rating averages.
///
/// Prices are stored as NUMERIC in Postgres and surfaced as f64; every
/// derived amount is rounded to 2 decimal places before it is written.

/// Round to 2 decimal places.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Price of a direct-consultant booking: hourly rate pro-rated over the
/// booked duration.
pub fn hourly_price(hourly_rate: f64, duration_minutes: i32) -> f64 {
    round2(hourly_rate * (duration_minutes as f64 / 60.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round2() {
        assert_eq!(round2(10.005), 10.01);
        assert_eq!(round2(10.004), 10.0);
        assert_eq!(round2(0.0), 0.0);
        assert_eq!(round2(99.999), 100.0);
    }

    #[test]
    fn test_hourly_price() {
        assert_eq!(hourly_price(120.0, 60), 120.0);
        assert_eq!(hourly_price(120.0, 30), 60.0);
        assert_eq!(hourly_price(100.0, 45), 75.0);
        // 90.0 * (50/60) = 74.999...; rounds to 75.00
        assert_eq!(hourly_price(90.0, 50), 75.0);
    }
}
