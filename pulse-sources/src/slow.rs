use std::str::FromStr;

use async_trait::async_trait;
use pulse_core::{RawReading, UpstreamClient};
use pulse_middleware::{QuotaGate, QuotaStrategy};
use pulse_types::{EngineError, SourceConfig, StockCode};
use rust_decimal::Decimal;
use serde::Deserialize;

/// One record in the `slow` vendor's batch response: a comma-joined-ticker
/// quote row with an authoritative previous close.
#[derive(Debug, Deserialize)]
struct SlowRecord {
    #[serde(rename = "TS_CODE")]
    ts_code: String,
    #[serde(rename = "PRICE")]
    price: String,
    #[serde(rename = "PRE_CLOSE")]
    pre_close: Option<String>,
}

/// Batched HTTP client paced by a per-minute call quota.
///
/// Codes are grouped into `batch_size`-sized chunks and joined with commas
/// into a single request per chunk, mirroring the upstream vendor's
/// comma-separated ticker list convention.
pub struct SlowClient {
    http: reqwest::Client,
    config: SourceConfig,
    quota: QuotaGate,
}

impl SlowClient {
    /// Build a client for the `slow` source from its configuration.
    ///
    /// # Panics
    /// Panics if `config.limits.per_minute` is unset; the `slow` source
    /// always carries a window quota.
    #[must_use]
    pub fn new(config: SourceConfig) -> Self {
        let per_minute = config
            .limits
            .per_minute
            .expect("slow source config must set limits.per_minute");
        let quota = QuotaGate::new(
            "slow",
            QuotaStrategy::PerWindow {
                limit: per_minute,
                window: std::time::Duration::from_secs(60),
            },
        );
        Self {
            http: reqwest::Client::new(),
            config,
            quota,
        }
    }

    fn suffixed(code: StockCode) -> String {
        match code.market() {
            Some(market) => format!("{code}{}", market.dot_suffix()),
            None => code.to_string(),
        }
    }

    async fn fetch_batch(&self, batch: &[StockCode]) -> Result<Vec<RawReading>, EngineError> {
        self.quota.try_acquire()?;
        let ts_codes: Vec<String> = batch.iter().copied().map(Self::suffixed).collect();
        let url = self
            .config
            .main_url
            .as_deref()
            .ok_or_else(|| EngineError::permanent("slow", "no main_url configured"))?;
        let joined = ts_codes.join(",");
        let resp = self
            .http
            .get(url)
            .query(&[("ts_code", joined.as_str())])
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    EngineError::transient("slow", "request timed out")
                } else {
                    EngineError::transient("slow", e.to_string())
                }
            })?;
        if resp.status().is_client_error() {
            return Err(EngineError::permanent("slow", format!("http {}", resp.status())));
        }
        if !resp.status().is_success() {
            return Err(EngineError::transient("slow", format!("http {}", resp.status())));
        }
        let records = resp
            .json::<Vec<SlowRecord>>()
            .await
            .map_err(|e| EngineError::permanent("slow", e.to_string()))?;
        Ok(records.into_iter().filter_map(parse_record).collect())
    }
}

fn parse_record(record: SlowRecord) -> Option<RawReading> {
    let raw_code = record.ts_code.split('.').next().unwrap_or(&record.ts_code);
    let code = StockCode::parse(raw_code).ok()?;
    let price = Decimal::from_str(&record.price).ok()?;
    let prev_close = record.pre_close.as_deref().and_then(|s| Decimal::from_str(s).ok());
    Some(RawReading {
        code,
        price,
        prev_close,
        change_pct: None,
    })
}

#[async_trait]
impl UpstreamClient for SlowClient {
    fn name(&self) -> &'static str {
        "slow"
    }

    async fn fetch(&self, codes: &[StockCode]) -> Result<Vec<RawReading>, EngineError> {
        let mut readings = Vec::with_capacity(codes.len());
        for batch in codes.chunks(self.config.batch_size.max(1)) {
            match self.fetch_batch(batch).await {
                Ok(mut batch_readings) => readings.append(&mut batch_readings),
                Err(EngineError::TransientUpstream { msg, .. }) => {
                    tracing::debug!(%msg, "slow batch paced or transiently failed, stopping this tick");
                    break;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "slow batch permanently failed, surfacing for blacklisting");
                    return Err(e);
                }
            }
        }
        Ok(readings)
    }
}
