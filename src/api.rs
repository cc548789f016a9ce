use crate::analysis;
use crate::chart::{self, ChartError};
use crate::config::{AppConfig, SharedSettings};
use crate::page;
use crate::yahoo::{SharedFetcher, YahooError};
use axum::{extract::State, response::Html};
use axum_extra::extract::Form;
use serde::Deserialize;
use tracing::{debug, error, info, instrument};

// Chart defaults for a plain page load.
pub const DEFAULT_SMA_PERIODS: [usize; 2] = [10, 50];

/// A failure anywhere in fetch/compute/render folds into one taxonomy: the
/// handler logs it and serves the degraded page, never an error to the user.
#[derive(Debug)]
pub enum PipelineError {
    Fetch(YahooError),
    Render(ChartError),
}

impl From<YahooError> for PipelineError {
    fn from(error: YahooError) -> Self {
        PipelineError::Fetch(error)
    }
}

impl From<ChartError> for PipelineError {
    fn from(error: ChartError) -> Self {
        PipelineError::Render(error)
    }
}

/// Raw form submission. Multi-valued fields arrive as repeated keys; the
/// Bollinger toggle is presence-based.
#[derive(Debug, Deserialize)]
pub struct ChartForm {
    pub ticker: Option<String>,
    #[serde(default)]
    pub sma_periods: Vec<usize>,
    #[serde(default)]
    pub ema_periods: Vec<usize>,
    pub bollinger: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ChartRequest {
    pub ticker: String,
    pub sma_periods: Vec<usize>,
    pub ema_periods: Vec<usize>,
    pub bollinger: bool,
}

impl ChartRequest {
    pub fn defaults(settings: &AppConfig) -> Self {
        Self {
            ticker: settings.default_ticker.clone(),
            sma_periods: DEFAULT_SMA_PERIODS.to_vec(),
            ema_periods: Vec::new(),
            bollinger: false,
        }
    }

    pub fn from_form(form: ChartForm, settings: &AppConfig) -> Self {
        let ticker = form
            .ticker
            .map(|t| t.trim().to_uppercase())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| settings.default_ticker.clone());

        Self {
            ticker,
            sma_periods: form.sma_periods,
            ema_periods: form.ema_periods,
            bollinger: form.bollinger.is_some(),
        }
    }
}

#[instrument(skip(fetcher, settings))]
pub async fn index_handler(
    State(fetcher): State<SharedFetcher>,
    State(settings): State<SharedSettings>,
) -> Html<String> {
    debug!("Received plain page load, using default parameters");
    let request = ChartRequest::defaults(&settings);
    respond(fetcher, settings, request).await
}

#[instrument(skip(fetcher, settings, form), fields(ticker = %form.ticker.as_deref().unwrap_or("default")))]
pub async fn chart_handler(
    State(fetcher): State<SharedFetcher>,
    State(settings): State<SharedSettings>,
    Form(form): Form<ChartForm>,
) -> Html<String> {
    debug!(?form, "Received chart form submission");
    let request = ChartRequest::from_form(form, &settings);
    respond(fetcher, settings, request).await
}

async fn respond(fetcher: SharedFetcher, settings: SharedSettings, request: ChartRequest) -> Html<String> {
    match run_pipeline(&fetcher, &settings, &request).await {
        Ok((image, observations)) => {
            info!(
                ticker = %request.ticker,
                observations = observations.len(),
                "Rendered chart page"
            );
            Html(page::render_page(&request, Some(&image), &observations))
        }
        Err(failure) => {
            error!(?failure, ticker = %request.ticker, "Pipeline failed, serving degraded page");
            Html(page::render_page(&request, None, &[]))
        }
    }
}

async fn run_pipeline(
    fetcher: &SharedFetcher,
    settings: &AppConfig,
    request: &ChartRequest,
) -> Result<(String, Vec<String>), PipelineError> {
    let series = fetcher
        .lock()
        .await
        .get_history(&request.ticker, &settings.data_range)
        .await?;
    debug!(ticker = %request.ticker, rows = series.len(), "Fetched price history");

    let image = chart::render_chart(
        &series,
        &request.ticker,
        &request.sma_periods,
        &request.ema_periods,
        request.bollinger,
    )?;

    let closes: Vec<f64> = series.iter().map(|row| row.close).collect();
    let observations = analysis::analyze(&request.ticker, &closes, request.bollinger);

    Ok((image, observations))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> AppConfig {
        AppConfig {
            node_name: "test".to_string(),
            environment: "test".to_string(),
            port: 0,
            default_ticker: "AAPL".to_string(),
            data_range: "6mo".to_string(),
            provider_rate_limit_per_minute: 30,
            random_agent: false,
        }
    }

    #[test]
    fn test_defaults_match_plain_page_load() {
        let request = ChartRequest::defaults(&settings());
        assert_eq!(request.ticker, "AAPL");
        assert_eq!(request.sma_periods, vec![10, 50]);
        assert!(request.ema_periods.is_empty());
        assert!(!request.bollinger);
    }

    #[test]
    fn test_form_values_carry_through() {
        let form = ChartForm {
            ticker: Some("msft".to_string()),
            sma_periods: vec![20, 200],
            ema_periods: vec![10],
            bollinger: Some("on".to_string()),
        };
        let request = ChartRequest::from_form(form, &settings());
        assert_eq!(request.ticker, "MSFT");
        assert_eq!(request.sma_periods, vec![20, 200]);
        assert_eq!(request.ema_periods, vec![10]);
        assert!(request.bollinger);
    }

    #[test]
    fn test_blank_ticker_falls_back_to_default() {
        let form = ChartForm {
            ticker: Some("   ".to_string()),
            sma_periods: Vec::new(),
            ema_periods: Vec::new(),
            bollinger: None,
        };
        let request = ChartRequest::from_form(form, &settings());
        assert_eq!(request.ticker, "AAPL");
        assert!(request.sma_periods.is_empty());
        assert!(!request.bollinger);
    }
}
