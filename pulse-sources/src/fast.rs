use std::str::FromStr;

use async_trait::async_trait;
use pulse_core::{RawReading, UpstreamClient};
use pulse_middleware::{QuotaGate, QuotaStrategy};
use pulse_types::{EngineError, SourceConfig, StockCode};
use rust_decimal::Decimal;
use serde::Deserialize;

/// Raw per-code payload shape returned by the `fast` vendor: a current
/// price, previous close, and an optional vendor-computed percent change.
#[derive(Debug, Deserialize)]
struct FastPayload {
    #[serde(rename = "p")]
    price: String,
    #[serde(rename = "yc")]
    prev_close: Option<String>,
    #[serde(rename = "pc")]
    change_pct: Option<String>,
}

/// Per-code HTTP client with primary/backup URL fallback, paced by a fixed
/// interval between requests.
pub struct FastClient {
    http: reqwest::Client,
    config: SourceConfig,
    quota: QuotaGate,
}

impl FastClient {
    /// Build a client for the `fast` source from its configuration.
    #[must_use]
    pub fn new(config: SourceConfig) -> Self {
        let quota = QuotaGate::new("fast", QuotaStrategy::Interval(config.rate_limit));
        Self {
            http: reqwest::Client::new(),
            config,
            quota,
        }
    }

    fn build_url(template: &str, code: StockCode, licence: Option<&str>) -> String {
        let mut url = template.replace("{code}", code.as_str());
        if let Some(licence) = licence {
            url = url.replace("{licence}", licence);
        }
        url
    }

    async fn fetch_one(&self, code: StockCode) -> Result<RawReading, EngineError> {
        self.quota.try_acquire()?;
        let licence = self.config.licence.as_deref();
        let urls = [self.config.main_url.as_deref(), self.config.backup_url.as_deref()];
        let mut last_err = EngineError::permanent("fast", "no url configured");
        for url_template in urls.into_iter().flatten() {
            let url = Self::build_url(url_template, code, licence);
            match self.http.get(&url).send().await {
                Ok(resp) if resp.status().is_success() => {
                    let payload = resp
                        .json::<FastPayload>()
                        .await
                        .map_err(|e| EngineError::permanent("fast", e.to_string()))?;
                    return parse_reading(code, &payload);
                }
                Ok(resp) if resp.status().is_client_error() => {
                    last_err = EngineError::permanent("fast", format!("http {}", resp.status()));
                }
                Ok(resp) => {
                    last_err = EngineError::transient("fast", format!("http {}", resp.status()));
                }
                Err(e) if e.is_timeout() => {
                    last_err = EngineError::transient("fast", "request timed out");
                }
                Err(e) => {
                    last_err = EngineError::transient("fast", e.to_string());
                }
            }
        }
        Err(last_err)
    }
}

fn parse_reading(code: StockCode, payload: &FastPayload) -> Result<RawReading, EngineError> {
    let price = Decimal::from_str(&payload.price)
        .map_err(|e| EngineError::permanent("fast", format!("bad price: {e}")))?;
    let prev_close = payload
        .prev_close
        .as_deref()
        .and_then(|s| Decimal::from_str(s).ok());
    let change_pct = payload
        .change_pct
        .as_deref()
        .and_then(|s| Decimal::from_str(s).ok());
    Ok(RawReading {
        code,
        price,
        prev_close,
        change_pct,
    })
}

#[async_trait]
impl UpstreamClient for FastClient {
    fn name(&self) -> &'static str {
        "fast"
    }

    async fn fetch(&self, codes: &[StockCode]) -> Result<Vec<RawReading>, EngineError> {
        let mut readings = Vec::with_capacity(codes.len());
        for &code in codes.iter().take(self.config.batch_size) {
            match self.fetch_one(code).await {
                Ok(reading) => readings.push(reading),
                Err(EngineError::TransientUpstream { msg, .. }) => {
                    tracing::debug!(code = %code, %msg, "fast fetch paced or transiently failed, skipping for this tick");
                }
                Err(e) => {
                    tracing::debug!(code = %code, error = %e, "fast fetch permanently failed for code");
                }
            }
        }
        Ok(readings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_payload_with_vendor_pct() {
        let payload = FastPayload {
            price: "10.52".to_owned(),
            prev_close: Some("10.00".to_owned()),
            change_pct: Some("5.20".to_owned()),
        };
        let code = StockCode::parse("000001").unwrap();
        let reading = parse_reading(code, &payload).unwrap();
        assert_eq!(reading.change_pct, Some(Decimal::from_str("5.20").unwrap()));
    }

    #[test]
    fn build_url_substitutes_code_and_licence() {
        let url = FastClient::build_url("https://x/{code}?key={licence}", StockCode::parse("600519").unwrap(), Some("tok"));
        assert_eq!(url, "https://x/600519?key=tok");
    }
}
