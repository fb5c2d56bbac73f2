/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Blocking content-type probe for remote URLs.
//!
//! Stands in for a real fetch-and-sniff job when the loader runs outside a
//! window: a HEAD request, then the URL's own hints.

use std::sync::OnceLock;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use url::Url;

use crate::registries::atomic::protocol::infer_mime_hint;

#[derive(Debug)]
pub enum ProbeError {
    ClientBuild(String),
    Network(String),
    HttpStatus(u16),
    /// Neither the server nor the URL say what the content is.
    NoContentType,
}

impl std::fmt::Display for ProbeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ClientBuild(reason) => write!(f, "cannot build HTTP client: {reason}"),
            Self::Network(reason) => write!(f, "network error: {reason}"),
            Self::HttpStatus(status) => write!(f, "server answered {status}"),
            Self::NoContentType => f.write_str("no content type available"),
        }
    }
}

impl std::error::Error for ProbeError {}

fn probe_client() -> Result<&'static Client, ProbeError> {
    static CLIENT: OnceLock<Client> = OnceLock::new();
    if let Some(client) = CLIENT.get() {
        return Ok(client);
    }
    let client = Client::builder()
        .timeout(Duration::from_secs(4))
        .build()
        .map_err(|e| ProbeError::ClientBuild(e.to_string()))?;
    Ok(CLIENT.get_or_init(|| client))
}

fn is_http(url: &Url) -> bool {
    matches!(url.scheme(), "http" | "https")
}

fn head_content_type(url: &Url) -> Result<Option<String>, ProbeError> {
    let response = probe_client()?
        .head(url.clone())
        .send()
        .map_err(|e| ProbeError::Network(e.to_string()))?;
    let status = response.status();
    if !status.is_success() {
        return Err(ProbeError::HttpStatus(status.as_u16()));
    }
    Ok(response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.split(';').next().unwrap_or("").trim().to_ascii_lowercase())
        .filter(|value| !value.is_empty()))
}

/// Determine the content type of `url`.
///
/// HTTP(S) URLs are asked with HEAD first; a server error is reported
/// unless the URL itself carries a hint. Other schemes only get the hint.
pub fn probe_content_type(url: &Url) -> Result<String, ProbeError> {
    let hint = infer_mime_hint(url);
    if !is_http(url) {
        return hint.ok_or(ProbeError::NoContentType);
    }
    match head_content_type(url) {
        Ok(Some(content_type)) => Ok(content_type),
        Ok(None) => hint.ok_or(ProbeError::NoContentType),
        Err(error) => {
            log::debug!("HEAD {url} failed: {error}");
            hint.ok_or(error)
        }
    }
}
