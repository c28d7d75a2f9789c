//! NSE option-chain API client
//!
//! The NSE API rejects requests without the session cookies set by its
//! website, so the client visits the option-chain page once before the first
//! API call and again whenever the API answers 401/403.

use super::OptionChainProvider;
use crate::options::{parse_option_chain, OptionChainSnapshot};
use async_trait::async_trait;
use reqwest::{header, Client, StatusCode};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// NSE website base URL
pub const NSE_BASE_URL: &str = "https://www.nseindia.com";

/// Index underlyings served by the indices endpoint
const INDEX_SYMBOLS: [&str; 5] = ["NIFTY", "BANKNIFTY", "FINNIFTY", "MIDCPNIFTY", "NIFTYNXT50"];

const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0 Safari/537.36";

/// Configuration for the NSE client
#[derive(Debug, Clone)]
pub struct NseConfig {
    pub base_url: String,
    pub timeout: Duration,
    /// Expiry to restrict the chain to (a date or `"nearest"`); all expiries
    /// when unset
    pub expiry: Option<String>,
}

impl Default for NseConfig {
    fn default() -> Self {
        Self {
            base_url: NSE_BASE_URL.to_string(),
            timeout: Duration::from_secs(10),
            expiry: None,
        }
    }
}

/// Client for the NSE option-chain API
pub struct NseOptionChainClient {
    config: NseConfig,
    client: Client,
    session_primed: AtomicBool,
}

impl NseOptionChainClient {
    pub fn new() -> anyhow::Result<Self> {
        Self::with_config(NseConfig::default())
    }

    pub fn with_config(config: NseConfig) -> anyhow::Result<Self> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/json, text/plain, */*"),
        );
        headers.insert(
            header::ACCEPT_LANGUAGE,
            header::HeaderValue::from_static("en-US,en;q=0.9"),
        );

        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .cookie_store(true)
            .build()?;

        Ok(Self {
            config,
            client,
            session_primed: AtomicBool::new(false),
        })
    }

    /// API URL for a symbol; indices and equities use different endpoints
    pub fn chain_url(&self, symbol: &str) -> String {
        let kind = if INDEX_SYMBOLS.contains(&symbol) {
            "indices"
        } else {
            "equities"
        };
        format!("{}/api/option-chain-{}", self.config.base_url, kind)
    }

    /// Visit the website to obtain session cookies
    async fn prime_session(&self) -> anyhow::Result<()> {
        let url = format!("{}/option-chain", self.config.base_url);
        self.client.get(&url).send().await?;
        self.session_primed.store(true, Ordering::Relaxed);
        tracing::debug!("NSE session cookies refreshed");
        Ok(())
    }

    async fn request_chain(&self, symbol: &str) -> anyhow::Result<reqwest::Response> {
        let response = self
            .client
            .get(self.chain_url(symbol))
            .query(&[("symbol", symbol)])
            .header(header::REFERER, format!("{}/option-chain", self.config.base_url))
            .send()
            .await?;
        Ok(response)
    }
}

#[async_trait]
impl OptionChainProvider for NseOptionChainClient {
    async fn fetch_chain(&self, ticker: &str) -> anyhow::Result<Option<OptionChainSnapshot>> {
        let symbol = ticker.to_uppercase();
        tracing::info!(symbol = %symbol, "Fetching option chain");

        if !self.session_primed.load(Ordering::Relaxed) {
            self.prime_session().await?;
        }

        let mut response = self.request_chain(&symbol).await?;
        if matches!(
            response.status(),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN
        ) {
            self.prime_session().await?;
            response = self.request_chain(&symbol).await?;
        }

        if !response.status().is_success() {
            tracing::warn!(symbol = %symbol, status = %response.status(), "Could not fetch options data");
            return Ok(None);
        }

        let payload: serde_json::Value = response.json().await?;
        let Some(snapshot) = usable_snapshot(&symbol, &payload, self.config.expiry.as_deref())
        else {
            return Ok(None);
        };

        tracing::info!(
            symbol = %symbol,
            strikes = snapshot.strike_count(),
            expiry = ?snapshot.expiry,
            "Option chain fetched"
        );
        Ok(Some(snapshot))
    }
}

/// Parse a chain payload, treating unparseable payloads and empty books as
/// unavailable
fn usable_snapshot(
    symbol: &str,
    payload: &serde_json::Value,
    expiry: Option<&str>,
) -> Option<OptionChainSnapshot> {
    let snapshot = match parse_option_chain(symbol, payload, expiry) {
        Ok(snapshot) => snapshot,
        Err(e) => {
            tracing::warn!(symbol = %symbol, error = %e, "Unusable option chain payload");
            return None;
        }
    };

    if snapshot.calls.is_empty() && snapshot.puts.is_empty() {
        tracing::warn!(symbol = %symbol, "Option chain has no contracts");
        return None;
    }
    Some(snapshot)
}
