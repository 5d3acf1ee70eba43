use crate::client;
use crate::depth::{HistoricalBatch, RawSnapshot};
use crate::instrument::Instrument;

use url::Url;

const HISTORICAL_PATH: &str = "historical_full";
const LIVE_PATH: &str = "depth";
const CACHE_BUST_PARAM: &str = "_";

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum AdapterError {
    #[error("{0}")]
    FetchError(String),
    #[error("Unexpected status: {0}")]
    Status(u16),
    #[error("Parsing: {0}")]
    ParseError(String),
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl From<reqwest::Error> for AdapterError {
    fn from(err: reqwest::Error) -> Self {
        AdapterError::FetchError(err.to_string())
    }
}

impl AdapterError {
    pub fn to_user_message(&self) -> &'static str {
        match self {
            AdapterError::InvalidRequest(err) => {
                log::error!("Adapter invalid request: {err}");
                "Invalid request made to the depth service. Check logs for details."
            }
            AdapterError::FetchError(err) => {
                log::error!("Adapter fetch error: {err}");
                "Network error while contacting the depth service."
            }
            AdapterError::Status(code) => {
                log::error!("Adapter status error: {code}");
                "The depth service rejected the request."
            }
            AdapterError::ParseError(err) => {
                log::error!("Adapter parse error: {err}");
                "Unexpected response from the depth service. Check logs for details."
            }
        }
    }
}

fn endpoint(base: &Url, path: &str, instrument: &Instrument) -> Result<Url, AdapterError> {
    let mut url = base.clone();

    url.path_segments_mut()
        .map_err(|()| AdapterError::InvalidRequest(format!("Base URL cannot be a base: {base}")))?
        .pop_if_empty()
        .push(path)
        .push(instrument.code());

    Ok(url)
}

pub fn historical_url(base: &Url, instrument: &Instrument) -> Result<Url, AdapterError> {
    endpoint(base, HISTORICAL_PATH, instrument)
}

/// `nonce` varies per request so intermediate caches never answer.
pub fn live_url(base: &Url, instrument: &Instrument, nonce: i64) -> Result<Url, AdapterError> {
    let mut url = endpoint(base, LIVE_PATH, instrument)?;
    url.query_pairs_mut()
        .append_pair(CACHE_BUST_PARAM, &nonce.to_string());
    Ok(url)
}

pub async fn fetch_historical(
    base: Url,
    instrument: Instrument,
) -> Result<Vec<RawSnapshot>, AdapterError> {
    let url = historical_url(&base, &instrument)?;
    let body = client::http_request(&url).await?;

    let batch: HistoricalBatch =
        serde_json::from_str(&body).map_err(|e| AdapterError::ParseError(e.to_string()))?;

    if let Some(symbol) = batch.symbol.as_deref()
        && Instrument::parse(symbol).as_ref() != Some(&instrument)
    {
        log::warn!("Historical batch is labelled {symbol:?}, requested {instrument}");
    }

    log::debug!(
        "Fetched {} historical snapshots for {}",
        batch.snapshots.len(),
        instrument
    );

    Ok(batch.snapshots)
}

pub async fn fetch_live(base: Url, instrument: Instrument) -> Result<RawSnapshot, AdapterError> {
    let nonce = chrono::Utc::now().timestamp_millis();
    let url = live_url(&base, &instrument, nonce)?;
    let body = client::http_request(&url).await?;

    serde_json::from_str(&body).map_err(|e| AdapterError::ParseError(e.to_string()))
}
