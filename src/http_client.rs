use std::time::Duration;

use anyhow::{Context, Result};
use once_cell::sync::OnceCell;
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};

pub const APP_USER_AGENT: &str = concat!("matchsight/", env!("CARGO_PKG_VERSION"));

// API-Football answers fast or not at all; the season CSV host is slower,
// so the read timeout is the generous one.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

static CLIENT: OnceCell<Client> = OnceCell::new();

/// Process-wide blocking client. Every request carries the app user agent,
/// so callers only add per-request headers like the API key.
pub fn http_client() -> Result<&'static Client> {
    CLIENT.get_or_try_init(|| {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(APP_USER_AGENT));
        Client::builder()
            .default_headers(headers)
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("failed to build http client")
    })
}
