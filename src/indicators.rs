//! Rolling statistics over a close-price column. Each function returns a
//! vector aligned with its input; rows where the window lacks history are
//! `None` and must be treated as absent, never as zero.

pub const BOLLINGER_PERIOD: usize = 20;
pub const BOLLINGER_WIDTH: f64 = 2.0;

/// Trailing arithmetic mean over `window` closes. `None` for the first
/// `window - 1` rows.
pub fn sma(closes: &[f64], window: usize) -> Vec<Option<f64>> {
    if window == 0 {
        return vec![None; closes.len()];
    }

    let mut out = Vec::with_capacity(closes.len());
    let mut sum = 0.0;

    for (i, &value) in closes.iter().enumerate() {
        sum += value;
        if i >= window {
            sum -= closes[i - window];
        }
        if i + 1 >= window {
            out.push(Some(sum / window as f64));
        } else {
            out.push(None);
        }
    }

    out
}

/// Exponentially weighted moving average with smoothing span `window`.
/// Seeded from the first close, so every row is defined (no warm-up gap):
/// `ema[0] = closes[0]`, `ema[i] = alpha * closes[i] + (1 - alpha) * ema[i-1]`
/// with `alpha = 2 / (window + 1)`.
pub fn ema(closes: &[f64], window: usize) -> Vec<f64> {
    if closes.is_empty() {
        return Vec::new();
    }

    let alpha = 2.0 / (window as f64 + 1.0);
    let mut out = Vec::with_capacity(closes.len());
    let mut prev = closes[0];
    out.push(prev);

    for &value in &closes[1..] {
        prev = alpha * value + (1.0 - alpha) * prev;
        out.push(prev);
    }

    out
}

/// Bollinger Bands over the fixed 20-row window: middle is the 20-period SMA,
/// upper/lower are middle +/- 2 rolling standard deviations. The deviation is
/// the sample one (divide by n-1), matching pandas' rolling std. Returns
/// (upper, lower), both `None` for the first 19 rows.
pub fn bollinger(closes: &[f64]) -> (Vec<Option<f64>>, Vec<Option<f64>>) {
    let middle = sma(closes, BOLLINGER_PERIOD);
    let mut upper = Vec::with_capacity(closes.len());
    let mut lower = Vec::with_capacity(closes.len());

    for (i, mid) in middle.iter().enumerate() {
        match mid {
            Some(mean) => {
                let start = i + 1 - BOLLINGER_PERIOD;
                let window = &closes[start..=i];
                let variance = window.iter().map(|v| (v - mean).powi(2)).sum::<f64>()
                    / (BOLLINGER_PERIOD - 1) as f64;
                let deviation = variance.sqrt();
                upper.push(Some(mean + BOLLINGER_WIDTH * deviation));
                lower.push(Some(mean - BOLLINGER_WIDTH * deviation));
            }
            None => {
                upper.push(None);
                lower.push(None);
            }
        }
    }

    (upper, lower)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sma_window_arithmetic() {
        let closes = [1.0, 2.0, 3.0, 4.0, 5.0];
        let values = sma(&closes, 3);

        assert_eq!(values[0], None);
        assert_eq!(values[1], None);
        assert_eq!(values[2], Some(2.0));
        assert_eq!(values[3], Some(3.0));
        assert_eq!(values[4], Some(4.0));
    }

    #[test]
    fn test_sma_equals_mean_of_trailing_window() {
        let closes: Vec<f64> = (1..=30).map(|v| v as f64 * 1.5).collect();
        let window = 10;
        let values = sma(&closes, window);

        for i in 0..closes.len() {
            if i + 1 < window {
                assert_eq!(values[i], None);
            } else {
                let expected: f64 = closes[i + 1 - window..=i].iter().sum::<f64>() / window as f64;
                assert!((values[i].unwrap() - expected).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn test_sma_zero_window_is_all_undefined() {
        assert_eq!(sma(&[1.0, 2.0], 0), vec![None, None]);
    }

    #[test]
    fn test_ema_recursion_no_warmup_gap() {
        let closes = [10.0, 11.0, 12.0, 11.5, 13.0, 12.5];
        let window = 10;
        let values = ema(&closes, window);

        assert_eq!(values.len(), closes.len());
        assert_eq!(values[0], closes[0]);

        let alpha = 2.0 / (window as f64 + 1.0);
        for i in 1..closes.len() {
            let expected = alpha * closes[i] + (1.0 - alpha) * values[i - 1];
            assert!((values[i] - expected).abs() < 1e-12);
        }
    }

    #[test]
    fn test_ema_empty_input() {
        assert!(ema(&[], 10).is_empty());
    }

    #[test]
    fn test_bollinger_leading_rows_undefined() {
        let closes: Vec<f64> = (0..25).map(|v| 100.0 + v as f64).collect();
        let (upper, lower) = bollinger(&closes);

        for i in 0..BOLLINGER_PERIOD - 1 {
            assert_eq!(upper[i], None);
            assert_eq!(lower[i], None);
        }
        assert!(upper[BOLLINGER_PERIOD - 1].is_some());
        assert!(lower[BOLLINGER_PERIOD - 1].is_some());
    }

    #[test]
    fn test_bollinger_band_width_is_four_sigma() {
        let closes: Vec<f64> = (0..40).map(|v| 50.0 + (v as f64 * 0.7).sin() * 5.0).collect();
        let (upper, lower) = bollinger(&closes);

        for i in BOLLINGER_PERIOD - 1..closes.len() {
            let window = &closes[i + 1 - BOLLINGER_PERIOD..=i];
            let mean = window.iter().sum::<f64>() / BOLLINGER_PERIOD as f64;
            let sigma = (window.iter().map(|v| (v - mean).powi(2)).sum::<f64>()
                / (BOLLINGER_PERIOD - 1) as f64)
                .sqrt();

            let width = upper[i].unwrap() - lower[i].unwrap();
            assert!((width - 4.0 * sigma).abs() < 1e-9);
        }
    }

    #[test]
    fn test_bollinger_bands_straddle_the_mean() {
        let closes: Vec<f64> = (0..30).map(|v| 20.0 + (v % 5) as f64).collect();
        let (upper, lower) = bollinger(&closes);
        let middle = sma(&closes, BOLLINGER_PERIOD);

        for i in BOLLINGER_PERIOD - 1..closes.len() {
            assert!(upper[i].unwrap() > middle[i].unwrap());
            assert!(lower[i].unwrap() < middle[i].unwrap());
        }
    }
}
