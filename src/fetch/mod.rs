//! Fetching raw feed bytes over HTTP.
//!
//! Network concerns stop here: the decoder only ever sees the bytes.

mod client;
mod basic;
pub mod auth;

pub use client::HttpClient;
pub use basic::BasicClient;

use anyhow::{Context, Result};
use tracing::debug;

use crate::config::CtaConfig;
use crate::requests::CtaRequest;
use auth::UrlParam;

pub async fn fetch_bytes<C: HttpClient>(
    client: &C,
    url: &str,
) -> Result<Vec<u8>> {
    let resp = client.get(url.parse()?).await?;
    Ok(resp.bytes().await?.to_vec())
}

/// Fetches the response body for `request`, authenticated with the key of
/// the tracker it targets.
pub async fn fetch_feed<C: HttpClient>(
    client: C,
    request: &CtaRequest,
    config: &CtaConfig,
) -> Result<Vec<u8>> {
    let url = request.url(config)?;
    let keyed = UrlParam::cta_key(client, request.api_key(config)?);

    debug!(kind = %request.kind(), url = %url, "Fetching feed");
    fetch_bytes(&keyed, url.as_str())
        .await
        .with_context(|| format!("fetching {} feed", request.kind()))
}
