//! Blocking HTTP client for the price-sensitivity scoring endpoint

use std::time::Duration;

use rand::Rng;
use serde::Deserialize;

use crate::error::Error;
use crate::model::{CustomerRecord, PredictionResult};

/// Endpoint the hosted model is served from.
pub const DEFAULT_ENDPOINT: &str = "https://price-optimization-n20m.onrender.com/predict/";

/// Anything that can turn a record into a prediction.
///
/// The batch scorer is generic over this so it can run against the HTTP client or any
/// in-process stand-in.
pub trait Scorer: Sync {
    fn score(&self, record: &CustomerRecord) -> crate::Result<PredictionResult>;
}

/// Settings for the scoring client
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Full URL of the `/predict/` endpoint
    pub endpoint: String,
    /// Per-request timeout
    pub timeout: Duration,
    /// Extra attempts for transient failures; 0 means one attempt per record
    pub max_retries: u32,
    /// Initial backoff, doubled after every retry
    pub initial_backoff: Duration,
    /// Upper bound for the backoff
    pub max_backoff: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout: Duration::from_secs(10),
            max_retries: 0,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Deserialize)]
struct PredictResponse {
    will_buy_after_price_increase: bool,
    probability: f64,
}

/// Client for the `/predict/` endpoint. Cheap to share across threads.
#[derive(Debug)]
pub struct PredictionClient {
    config: ClientConfig,
    http: reqwest::blocking::Client,
}

impl PredictionClient {
    pub fn new(config: ClientConfig) -> crate::Result<Self> {
        let http = reqwest::blocking::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| Error::Client(e.to_string()))?;

        Ok(Self { config, http })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Send one request, no retries.
    fn send_once(&self, record: &CustomerRecord) -> crate::Result<PredictionResult> {
        tracing::debug!(endpoint = %self.config.endpoint, "posting record for scoring");

        let resp = self
            .http
            .post(&self.config.endpoint)
            .json(record)
            .send()
            .map_err(|e| network_error(&e, self.config.timeout))?;

        let status = resp.status();
        let body = resp
            .text()
            .map_err(|e| network_error(&e, self.config.timeout))?;

        if !status.is_success() {
            return Err(Error::Service {
                status: status.as_u16(),
                body,
            });
        }

        parse_prediction(&body)
    }

    fn next_backoff(&self, backoff: Duration) -> Duration {
        (backoff * 2).min(self.config.max_backoff)
    }
}

impl Scorer for PredictionClient {
    /// Score a record, retrying transient failures up to `max_retries` times.
    fn score(&self, record: &CustomerRecord) -> crate::Result<PredictionResult> {
        let mut backoff = self.config.initial_backoff;
        let mut attempt = 0;

        loop {
            match self.send_once(record) {
                Ok(prediction) => return Ok(prediction),
                Err(e) if e.is_transient() && attempt < self.config.max_retries => {
                    attempt += 1;
                    let delay = jittered(backoff);
                    tracing::warn!(
                        error = %e,
                        attempt,
                        max_retries = self.config.max_retries,
                        "transient scoring failure, retrying in {:?}",
                        delay
                    );
                    std::thread::sleep(delay);
                    backoff = self.next_backoff(backoff);
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Half the backoff plus a random share of the other half.
fn jittered(backoff: Duration) -> Duration {
    let half = backoff / 2;
    let spread = half.as_millis() as u64;
    let extra = if spread == 0 {
        0
    } else {
        rand::thread_rng().gen_range(0..=spread)
    };
    half + Duration::from_millis(extra)
}

fn network_error(e: &reqwest::Error, timeout: Duration) -> Error {
    if e.is_timeout() {
        Error::Network(format!("request timed out after {timeout:?}"))
    } else {
        Error::Network(e.to_string())
    }
}

fn parse_prediction(body: &str) -> crate::Result<PredictionResult> {
    let parsed: PredictResponse = serde_json::from_str(body)
        .map_err(|e| Error::InvalidResponse(format!("{e}: {body}")))?;

    if !(0.0..=1.0).contains(&parsed.probability) {
        return Err(Error::InvalidResponse(format!(
            "probability {} is outside [0, 1]",
            parsed.probability
        )));
    }

    Ok(PredictionResult {
        will_continue: parsed.will_buy_after_price_increase,
        probability: parsed.probability,
    })
}
