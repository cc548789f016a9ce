use crate::indicators;

// The commentary always reads the same fixed windows, independent of the
// periods the user picked for the chart overlays.
pub const ANALYSIS_SMA_PERIOD: usize = 20;
pub const ANALYSIS_EMA_PERIOD: usize = 10;

/// Produces one observation per indicator, each derived only from the final
/// row of the series. Bollinger commentary is emitted only when the bands
/// were requested, and stays silent while price sits inside the channel.
pub fn analyze(ticker: &str, closes: &[f64], include_bollinger: bool) -> Vec<String> {
    let Some(&latest_close) = closes.last() else {
        return Vec::new();
    };

    let mut observations = Vec::new();

    let sma_values = indicators::sma(closes, ANALYSIS_SMA_PERIOD);
    match sma_values.last().copied().flatten() {
        Some(sma) if latest_close > sma => observations.push(format!(
            "{} closed above its {}-day SMA, suggesting an uptrend.",
            ticker, ANALYSIS_SMA_PERIOD
        )),
        Some(_) => observations.push(format!(
            "{} closed below its {}-day SMA, suggesting a downtrend.",
            ticker, ANALYSIS_SMA_PERIOD
        )),
        None => observations.push(format!(
            "Not enough history to evaluate the {}-day SMA.",
            ANALYSIS_SMA_PERIOD
        )),
    }

    let ema_values = indicators::ema(closes, ANALYSIS_EMA_PERIOD);
    match ema_values.last().copied() {
        Some(ema) if latest_close > ema => observations.push(format!(
            "{} closed above its {}-day EMA, short-term momentum is positive.",
            ticker, ANALYSIS_EMA_PERIOD
        )),
        Some(_) => observations.push(format!(
            "{} closed below its {}-day EMA, short-term momentum is negative.",
            ticker, ANALYSIS_EMA_PERIOD
        )),
        None => observations.push(format!(
            "Not enough history to evaluate the {}-day EMA.",
            ANALYSIS_EMA_PERIOD
        )),
    }

    if include_bollinger {
        let (upper, lower) = indicators::bollinger(closes);
        match (upper.last().copied().flatten(), lower.last().copied().flatten()) {
            (Some(upper), Some(_)) if latest_close > upper => observations.push(format!(
                "{} closed above the upper Bollinger Band, a possible overbought signal.",
                ticker
            )),
            (Some(_), Some(lower)) if latest_close < lower => observations.push(format!(
                "{} closed below the lower Bollinger Band, a possible oversold signal.",
                ticker
            )),
            (Some(_), Some(_)) => {
                // Inside the channel: nothing worth saying.
            }
            _ => observations.push(format!(
                "Not enough history to evaluate the {}-day Bollinger Bands.",
                indicators::BOLLINGER_PERIOD
            )),
        }
    }

    observations
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rising_closes(len: usize) -> Vec<f64> {
        (0..len).map(|v| 100.0 + v as f64).collect()
    }

    fn falling_closes(len: usize) -> Vec<f64> {
        (0..len).map(|v| 200.0 - v as f64).collect()
    }

    #[test]
    fn test_uptrend_message_for_close_above_sma() {
        let observations = analyze("AAPL", &rising_closes(30), false);
        assert!(observations.iter().any(|m| m.contains("uptrend")));
        assert!(!observations.iter().any(|m| m.contains("downtrend")));
    }

    #[test]
    fn test_downtrend_message_for_close_below_sma() {
        let observations = analyze("AAPL", &falling_closes(30), false);
        assert!(observations.iter().any(|m| m.contains("downtrend")));
        assert!(!observations.iter().any(|m| m.contains("uptrend")));
    }

    #[test]
    fn test_two_entries_without_bollinger() {
        let observations = analyze("AAPL", &rising_closes(30), false);
        assert_eq!(observations.len(), 2);
        assert!(observations[0].contains("20-day SMA"));
        assert!(observations[1].contains("10-day EMA"));
    }

    #[test]
    fn test_bollinger_silent_inside_channel() {
        // Noisy but range-bound closes keep the last close inside the bands.
        let closes: Vec<f64> = (0..40).map(|v| 50.0 + ((v % 4) as f64 - 1.5)).collect();
        let observations = analyze("MSFT", &closes, true);
        assert_eq!(observations.len(), 2);
        assert!(!observations.iter().any(|m| m.contains("Bollinger")));
    }

    #[test]
    fn test_bollinger_overbought_above_upper_band() {
        // Flat series with a violent final spike blows through the upper band.
        let mut closes = vec![100.0; 30];
        closes.push(150.0);
        let observations = analyze("NVDA", &closes, true);
        assert_eq!(observations.len(), 3);
        assert!(observations[2].contains("overbought"));
    }

    #[test]
    fn test_bollinger_oversold_below_lower_band() {
        let mut closes = vec![100.0; 30];
        closes.push(60.0);
        let observations = analyze("NVDA", &closes, true);
        assert!(observations.iter().any(|m| m.contains("oversold")));
    }

    #[test]
    fn test_insufficient_history_messages() {
        let observations = analyze("IPO", &rising_closes(5), true);
        assert_eq!(observations.len(), 3);
        assert!(observations[0].contains("Not enough history"));
        // EMA has no warm-up gap, so it still yields a comparison.
        assert!(observations[1].contains("10-day EMA"));
        assert!(observations[2].contains("Not enough history"));
    }

    #[test]
    fn test_empty_series_yields_no_observations() {
        assert!(analyze("AAPL", &[], true).is_empty());
    }
}
