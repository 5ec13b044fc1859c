// src/fetch/census.rs

use anyhow::{bail, Context, Result};
use reqwest::Client;
use serde_json::Value;
use std::{collections::BTreeMap, time::Duration};
use tokio::time::sleep;
use tracing::{debug, error, info, instrument, warn};
use url::Url;

use super::urls::{build_query_url, chunk_variables, required_variables};
use crate::config::CensusConfig;
use crate::process::RawRecord;
use crate::schema::RecodeSpec;

/// One decoded API response: the header row plus data rows, all as text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

pub struct CensusClient {
    client: Client,
    config: CensusConfig,
}

impl CensusClient {
    pub fn new(config: CensusConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .user_agent(concat!("poststrat/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("building HTTP client")?;
        Ok(Self { client, config })
    }

    /// Fetch every variable the recode tables need for all congressional
    /// districts in `year`, one record per district.
    #[instrument(level = "info", skip(self, spec))]
    pub async fn fetch_year(&self, spec: &RecodeSpec, year: u16) -> Result<Vec<RawRecord>> {
        let vars = required_variables(spec);
        let chunks = chunk_variables(&vars, self.config.max_fields_per_request);
        let delay = Duration::from_millis(self.config.request_delay_ms);

        let mut tables = Vec::with_capacity(chunks.len());
        for (i, chunk) in chunks.iter().enumerate() {
            if i > 0 && !delay.is_zero() {
                sleep(delay).await;
            }
            let url = build_query_url(&self.config, year, chunk)?;
            debug!(chunk = i, fields = chunk.len(), "requesting variables");
            let body = self.get_text_with_retry(&url).await?;
            let table = parse_response(&body)
                .with_context(|| format!("decoding API response for chunk {} of {}", i, year))?;
            tables.push(table);
        }

        let records = merge_by_geography(tables);
        info!(year, districts = records.len(), requests = chunks.len(), "fetched raw records");
        Ok(records)
    }

    async fn get_text_core(&self, url: &Url) -> Result<String> {
        let resp = self
            .client
            .get(url.clone())
            .send()
            .await
            .with_context(|| format!("GET {} failed", redact(url)))?;
        let status = resp.status();
        if !status.is_success() {
            bail!("non-success status {} from {}", status, redact(url));
        }
        resp.text()
            .await
            .with_context(|| format!("reading body from {}", redact(url)))
    }

    async fn get_text_with_retry(&self, url: &Url) -> Result<String> {
        let mut attempts = 0;
        loop {
            match self.get_text_core(url).await {
                Ok(t) => return Ok(t),
                Err(e) if attempts < self.config.max_retries => {
                    attempts += 1;
                    let backoff = backoff_ms(self.config.initial_backoff_ms, attempts);
                    warn!(url = %redact(url), attempt = attempts, delay_ms = backoff, error = %e, "Retrying");
                    sleep(Duration::from_millis(backoff)).await;
                }
                Err(e) => {
                    error!(url = %redact(url), error = %e, "Exhausted retries");
                    return Err(e);
                }
            }
        }
    }
}

/// Delay before retry `attempt` (1-based): `initial × 2^(attempt-1)`,
/// saturating instead of overflowing for large retry counts.
fn backoff_ms(initial_ms: u64, attempt: u32) -> u64 {
    let factor = 2u64.checked_pow(attempt.saturating_sub(1)).unwrap_or(u64::MAX);
    initial_ms.saturating_mul(factor)
}

/// Drop the `key` parameter so API keys never reach logs or errors.
fn redact(url: &Url) -> Url {
    let mut out = url.clone();
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| k != "key")
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    out.query_pairs_mut().clear().extend_pairs(pairs);
    out
}

/// Decode the API's JSON array-of-arrays: first row is the header, nulls
/// become empty strings, numbers are kept as their text.
pub fn parse_response(body: &str) -> Result<ApiTable> {
    let raw: Vec<Vec<Value>> = serde_json::from_str(body)?;
    let mut rows = raw.into_iter().map(|row| {
        row.into_iter()
            .map(|v| match v {
                Value::String(s) => s,
                Value::Null => String::new(),
                other => other.to_string(),
            })
            .collect::<Vec<_>>()
    });
    let headers = match rows.next() {
        Some(h) => h,
        None => bail!("empty response"),
    };
    let rows: Vec<Vec<String>> = rows.collect();
    if let Some(bad) = rows.iter().find(|r| r.len() != headers.len()) {
        bail!("row has {} values, header has {}", bad.len(), headers.len());
    }
    Ok(ApiTable { headers, rows })
}

/// Merge chunked responses into one record per (state, district). Output is
/// ordered by state then district code.
pub fn merge_by_geography(tables: Vec<ApiTable>) -> Vec<RawRecord> {
    let mut merged: BTreeMap<(String, String), RawRecord> = BTreeMap::new();
    for table in &tables {
        for row in &table.rows {
            let rec = RawRecord::from_columns(
                table.headers.iter().map(String::as_str),
                row.iter().map(String::as_str),
            );
            let key = (rec.state_code.clone(), rec.district_code.clone());
            match merged.get_mut(&key) {
                Some(existing) => {
                    existing.counts.extend(rec.counts);
                    if existing.name.is_none() {
                        existing.name = rec.name;
                    }
                }
                None => {
                    merged.insert(key, rec);
                }
            }
        }
    }
    merged.into_values().collect()
}
