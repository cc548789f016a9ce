use chrono::{DateTime, Utc};
use reqwest::{Client, Error as ReqwestError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration as StdDuration, SystemTime};
use tokio::sync::Mutex;
use tokio::time::sleep;

#[derive(Debug)]
pub enum YahooError {
    Http(ReqwestError),
    Serialization(serde_json::Error),
    InvalidRange(String),
    InvalidResponse(String),
    RateLimit,
    NoData,
}

impl From<ReqwestError> for YahooError {
    fn from(error: ReqwestError) -> Self {
        YahooError::Http(error)
    }
}

impl From<serde_json::Error> for YahooError {
    fn from(error: serde_json::Error) -> Self {
        YahooError::Serialization(error)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OhlcvData {
    pub time: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
    pub symbol: Option<String>,
}

// The rate limiter is stateful, so requests share the client behind a lock.
pub type SharedFetcher = Arc<Mutex<YahooClient>>;

pub struct YahooClient {
    client: Client,
    base_url: String,
    rate_limit_per_minute: u32,
    request_timestamps: Vec<SystemTime>,
    user_agents: Vec<String>,
    random_agent: bool,
}

impl YahooClient {
    pub fn new(random_agent: bool, rate_limit_per_minute: u32) -> Result<Self, YahooError> {
        let client = Client::builder()
            .timeout(StdDuration::from_secs(30))
            .build()?;

        let user_agents = vec![
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string(),
            "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string(),
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:120.0) Gecko/20100101 Firefox/120.0".to_string(),
            "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/16.3 Safari/605.1.15".to_string(),
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36 Edg/120.0.0.0".to_string(),
        ];

        Ok(YahooClient {
            client,
            base_url: "https://query1.finance.yahoo.com/v8/finance/chart/".to_string(),
            rate_limit_per_minute,
            request_timestamps: Vec::new(),
            user_agents,
            random_agent,
        })
    }

    fn validate_range(&self, range: &str) -> Result<String, YahooError> {
        let supported = HashMap::from([
            ("1mo", "1mo"),
            ("3mo", "3mo"),
            ("6mo", "6mo"),
            ("1y", "1y"),
            ("2y", "2y"),
        ]);

        supported
            .get(range)
            .map(|s| s.to_string())
            .ok_or_else(|| YahooError::InvalidRange(range.to_string()))
    }

    fn get_user_agent(&self) -> String {
        if self.random_agent {
            use rand::seq::IndexedRandom;
            self.user_agents
                .choose(&mut rand::rng())
                .unwrap_or(&self.user_agents[0])
                .clone()
        } else {
            self.user_agents[0].clone()
        }
    }

    async fn enforce_rate_limit(&mut self) {
        let current_time = SystemTime::now();

        // Remove timestamps older than 1 minute
        self.request_timestamps.retain(|&timestamp| {
            current_time.duration_since(timestamp).unwrap_or(StdDuration::from_secs(0)) < StdDuration::from_secs(60)
        });

        // If we're at the rate limit, wait
        if self.request_timestamps.len() >= self.rate_limit_per_minute as usize {
            if let Some(&oldest_request) = self.request_timestamps.first() {
                let wait_time = StdDuration::from_secs(60) - current_time.duration_since(oldest_request).unwrap_or(StdDuration::from_secs(0));
                if !wait_time.is_zero() {
                    sleep(wait_time + StdDuration::from_millis(100)).await;
                }
            }
        }

        self.request_timestamps.push(current_time);
    }

    async fn make_request(&mut self, url: &str) -> Result<Value, YahooError> {
        const MAX_RETRIES: u32 = 5;

        for attempt in 0..MAX_RETRIES {
            self.enforce_rate_limit().await;

            if attempt > 0 {
                let delay = StdDuration::from_secs_f64(2.0_f64.powi(attempt as i32 - 1) + rand::random::<f64>());
                let delay = delay.min(StdDuration::from_secs(60));
                sleep(delay).await;
            }

            let user_agent = self.get_user_agent();

            let response = self.client
                .get(url)
                .header("Accept", "application/json, text/plain, */*")
                .header("Accept-Language", "en-US,en;q=0.9")
                .header("Accept-Encoding", "gzip, deflate, br")
                .header("Connection", "keep-alive")
                .header("Cache-Control", "no-cache")
                .header("Pragma", "no-cache")
                .header("User-Agent", user_agent)
                .header("Referer", "https://finance.yahoo.com/")
                .header("Origin", "https://finance.yahoo.com")
                .send()
                .await;

            match response {
                Ok(resp) => {
                    let status = resp.status();

                    if status.is_success() {
                        match resp.json::<Value>().await {
                            Ok(data) => return Ok(data),
                            Err(_) => continue,
                        }
                    } else {
                        if status == 403 || status == 429 || status.is_server_error() {
                            continue;
                        } else if status.is_client_error() {
                            break;
                        } else {
                            continue;
                        }
                    }
                }
                Err(_) => continue,
            }
        }

        Err(YahooError::InvalidResponse("Max retries exceeded".to_string()))
    }

    pub async fn get_history(&mut self, symbol: &str, range: &str) -> Result<Vec<OhlcvData>, YahooError> {
        let range_value = self.validate_range(range)?;
        let symbol = symbol.trim().to_uppercase();

        let url = format!(
            "{}{}?range={}&interval=1d&includePrePost=false&events=div%2Csplit",
            self.base_url, symbol, range_value
        );

        let response_data = self.make_request(&url).await?;
        parse_chart_response(&symbol, &response_data)
    }
}

// Decodes the v8 chart payload: parallel arrays under result[0], nulls on
// non-trading rows, an `error` object when the symbol is unknown.
pub fn parse_chart_response(symbol: &str, response_data: &Value) -> Result<Vec<OhlcvData>, YahooError> {
    let chart = response_data
        .get("chart")
        .ok_or_else(|| YahooError::InvalidResponse("Missing chart object".to_string()))?;

    if let Some(error) = chart.get("error") {
        if !error.is_null() {
            let description = error
                .get("description")
                .and_then(|v| v.as_str())
                .unwrap_or("unknown provider error");
            return Err(YahooError::InvalidResponse(description.to_string()));
        }
    }

    let result = chart
        .get("result")
        .and_then(|v| v.as_array())
        .filter(|arr| !arr.is_empty())
        .ok_or(YahooError::NoData)?;

    let data_item = &result[0];

    let times = data_item
        .get("timestamp")
        .and_then(|v| v.as_array())
        .ok_or_else(|| YahooError::InvalidResponse("Missing timestamps".to_string()))?;

    let quote = data_item
        .pointer("/indicators/quote/0")
        .ok_or_else(|| YahooError::InvalidResponse("Missing quote block".to_string()))?;

    let opens = quote["open"].as_array().ok_or_else(|| YahooError::InvalidResponse("Invalid opens".to_string()))?;
    let highs = quote["high"].as_array().ok_or_else(|| YahooError::InvalidResponse("Invalid highs".to_string()))?;
    let lows = quote["low"].as_array().ok_or_else(|| YahooError::InvalidResponse("Invalid lows".to_string()))?;
    let closes = quote["close"].as_array().ok_or_else(|| YahooError::InvalidResponse("Invalid closes".to_string()))?;
    let volumes = quote["volume"].as_array().ok_or_else(|| YahooError::InvalidResponse("Invalid volumes".to_string()))?;

    let length = times.len();
    if [opens.len(), highs.len(), lows.len(), closes.len(), volumes.len()].iter().any(|&len| len != length) {
        return Err(YahooError::InvalidResponse("Inconsistent array lengths".to_string()));
    }

    let mut series = Vec::new();

    for i in 0..length {
        let timestamp = times[i]
            .as_i64()
            .ok_or_else(|| YahooError::InvalidResponse(format!("Invalid timestamp at index {}", i)))?;

        let time = DateTime::<Utc>::from_timestamp(timestamp, 0).ok_or_else(|| {
            YahooError::InvalidResponse(format!("Cannot convert timestamp {} to DateTime at index {}", timestamp, i))
        })?;

        // Halted or partial rows come through as nulls; skip them rather than
        // coercing to zero so downstream windows never see fake prices.
        let (open, high, low, close) = match (
            opens[i].as_f64(),
            highs[i].as_f64(),
            lows[i].as_f64(),
            closes[i].as_f64(),
        ) {
            (Some(o), Some(h), Some(l), Some(c)) => (o, h, l, c),
            _ => continue,
        };

        series.push(OhlcvData {
            time,
            open,
            high,
            low,
            close,
            volume: volumes[i].as_u64().unwrap_or(0),
            symbol: Some(symbol.to_string()),
        });
    }

    if series.is_empty() {
        return Err(YahooError::NoData);
    }

    series.sort_by(|a, b| a.time.cmp(&b.time));
    Ok(series)
}
