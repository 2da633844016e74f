//! Band-passed price statistics for one side of a region's book

use crate::models::order::OrderQuote;
use crate::models::region_stat::SideStat;

pub const LOWER_BAND: f64 = 0.05;
pub const UPPER_BAND: f64 = 0.95;

/// Linearly interpolated percentile of an ascending slice, `p` in `[0, 1]`.
/// NaN for an empty slice.
pub fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }

    let rank = (sorted.len() - 1) as f64 * p.clamp(0.0, 1.0);
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let fraction = rank - lower as f64;

    sorted[lower] + (sorted[upper] - sorted[lower]) * fraction
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

pub fn median(sorted: &[f64]) -> f64 {
    percentile(sorted, 0.5)
}

/// Population standard deviation
pub fn std_dev(values: &[f64]) -> f64 {
    let m = mean(values);
    if m.is_nan() {
        return f64::NAN;
    }
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

/// Statistics of `quotes` restricted to the 5th..=95th percentile band of
/// their own prices. Values that cannot be computed come back as NaN and
/// are left for the caller to sanitize.
pub fn side_stat(quotes: &[OrderQuote]) -> SideStat {
    let mut prices: Vec<f64> = quotes.iter().map(|q| q.price).collect();
    prices.sort_by(f64::total_cmp);

    let low = percentile(&prices, LOWER_BAND);
    let high = percentile(&prices, UPPER_BAND);

    let in_band: Vec<&OrderQuote> = quotes
        .iter()
        .filter(|q| q.price >= low && q.price <= high)
        .collect();

    let mut band_prices: Vec<f64> = in_band.iter().map(|q| q.price).collect();
    band_prices.sort_by(f64::total_cmp);

    let volume: i64 = in_band.iter().map(|q| q.volume_remaining).sum();
    let weighted_sum: f64 = in_band
        .iter()
        .map(|q| q.price * q.volume_remaining as f64)
        .sum();
    let weighted_average = if volume == 0 {
        f64::NAN
    } else {
        weighted_sum / volume as f64
    };

    SideStat {
        mean: mean(&band_prices),
        weighted_average,
        median: median(&band_prices),
        std_dev: std_dev(&band_prices),
        percentile_95: high,
        volume,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quote(price: f64, volume_remaining: i64) -> OrderQuote {
        OrderQuote {
            price,
            is_bid: true,
            volume_remaining,
        }
    }

    #[test]
    fn test_percentile_interpolates() {
        let sorted = [1.0, 2.0, 3.0, 4.0, 5.0];

        assert_eq!(percentile(&sorted, 0.0), 1.0);
        assert_eq!(percentile(&sorted, 0.5), 3.0);
        assert_eq!(percentile(&sorted, 1.0), 5.0);
        assert!((percentile(&sorted, 0.95) - 4.8).abs() < 1e-9);
        assert!(percentile(&[], 0.5).is_nan());
    }

    #[test]
    fn test_std_dev_is_population() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert!((std_dev(&values) - 2.0).abs() < 1e-9);
        assert!(std_dev(&[]).is_nan());
    }

    #[test]
    fn test_side_stat_drops_out_of_band_prices() {
        let mut quotes: Vec<OrderQuote> = (1..=10).map(|p| quote(p as f64, 1)).collect();
        quotes.push(quote(1000.0, 1));

        let stat = side_stat(&quotes);

        // 1.0 and 1000.0 sit outside [1.5, 505.0]
        assert!((stat.mean - 6.0).abs() < 1e-9);
        assert!((stat.median - 6.0).abs() < 1e-9);
        assert!((stat.weighted_average - 6.0).abs() < 1e-9);
        assert!((stat.percentile_95 - 505.0).abs() < 1e-9);
        assert_eq!(stat.volume, 9);
    }

    #[test]
    fn test_side_stat_weights_by_volume() {
        let quotes = [quote(10.0, 3), quote(10.0, 3), quote(20.0, 1)];

        let stat = side_stat(&quotes);

        // Band is [10.0, 19.0], the 20.0 quote is trimmed
        assert_eq!(stat.weighted_average, 10.0);
        assert_eq!(stat.volume, 6);
    }

    #[test]
    fn test_side_stat_zero_volume_is_nan_until_sanitized() {
        let quotes = [quote(10.0, 0), quote(11.0, 0), quote(12.0, 0)];

        let stat = side_stat(&quotes);
        assert!(stat.weighted_average.is_nan());

        let clean = stat.sanitized();
        assert_eq!(clean.weighted_average, 0.0);
        assert_eq!(clean.mean, stat.mean);
    }

    #[test]
    fn test_side_stat_single_quote() {
        let stat = side_stat(&[quote(42.0, 5)]);

        assert_eq!(stat.mean, 42.0);
        assert_eq!(stat.median, 42.0);
        assert_eq!(stat.std_dev, 0.0);
        assert_eq!(stat.percentile_95, 42.0);
        assert_eq!(stat.weighted_average, 42.0);
        assert_eq!(stat.volume, 5);
    }
}
