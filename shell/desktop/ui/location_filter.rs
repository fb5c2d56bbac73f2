/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Turns location-bar text into a URL the loader can act on.

use std::path::{Path, PathBuf};

use url::Url;

use crate::registries::atomic::protocol::ProtocolRegistry;

const KNOWN_ABOUT_PAGES: &[&str] = &["blank", "home", "plugins"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocationFilterError {
    Empty,
    Malformed(String),
    UnsupportedProtocol(String),
}

impl std::fmt::Display for LocationFilterError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => f.write_str("nothing to open"),
            Self::Malformed(input) => write!(f, "'{input}' is not a valid location"),
            Self::UnsupportedProtocol(scheme) => write!(f, "protocol '{scheme}' is not supported"),
        }
    }
}

impl std::error::Error for LocationFilterError {}

/// Filter typed text into a URL.
///
/// Local paths win over host names: `~` and absolute paths always become
/// `file:` URLs, relative ones only when they exist under `current_dir`.
pub fn filter_location_input(
    input: &str,
    current_dir: Option<&Path>,
    protocols: &ProtocolRegistry,
) -> Result<Url, LocationFilterError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(LocationFilterError::Empty);
    }

    if let Some(path) = expand_home(input) {
        return file_url(&path, input);
    }
    if Path::new(input).is_absolute() {
        return file_url(Path::new(input), input);
    }
    if let Some(dir) = current_dir {
        let candidate = dir.join(input);
        if candidate.exists() {
            return file_url(&candidate, input);
        }
    }

    if let Some(page) = input.strip_prefix("about:") {
        let page = if KNOWN_ABOUT_PAGES.contains(&page) {
            page
        } else {
            "blank"
        };
        return parse(&format!("about:{page}"), input);
    }

    if let Some((scheme, rest)) = input.split_once(':')
        && is_scheme_like(scheme)
    {
        if protocols.has_scheme(scheme) {
            return parse(input, input);
        }
        if !starts_with_port(rest) {
            return Err(LocationFilterError::UnsupportedProtocol(
                scheme.to_ascii_lowercase(),
            ));
        }
    }

    if looks_like_host(input) {
        return parse(&format!("https://{input}"), input);
    }

    Err(LocationFilterError::Malformed(input.to_string()))
}

fn expand_home(input: &str) -> Option<PathBuf> {
    let rest = input.strip_prefix('~')?;
    let home = dirs::home_dir()?;
    match rest.strip_prefix('/') {
        Some(relative) => Some(home.join(relative)),
        None if rest.is_empty() => Some(home),
        None => None,
    }
}

fn file_url(path: &Path, input: &str) -> Result<Url, LocationFilterError> {
    Url::from_file_path(path).map_err(|()| LocationFilterError::Malformed(input.to_string()))
}

fn parse(text: &str, input: &str) -> Result<Url, LocationFilterError> {
    Url::parse(text).map_err(|_| LocationFilterError::Malformed(input.to_string()))
}

fn is_scheme_like(candidate: &str) -> bool {
    let mut chars = candidate.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

fn starts_with_port(rest: &str) -> bool {
    let port = rest.split(['/', '?', '#']).next().unwrap_or("");
    !port.is_empty() && port.chars().all(|c| c.is_ascii_digit())
}

fn looks_like_host(input: &str) -> bool {
    if input.chars().any(char::is_whitespace) {
        return false;
    }
    let authority = input.split(['/', '?', '#']).next().unwrap_or("");
    let host = authority.split(':').next().unwrap_or("");
    host == "localhost"
        || (host.contains('.') && !host.starts_with('.') && !host.ends_with('.'))
        || (authority.contains(':') && !host.is_empty())
}
