/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use url::Url;

/// Handle of a view owned by the host window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ViewId(pub u64);

impl std::fmt::Display for ViewId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "view#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct LoadFlags {
    /// The navigation did not originate from untrusted remote content.
    pub trusted_source: bool,
    /// Never embed, even when a viewer is available.
    pub force_open: bool,
    pub new_tab: bool,
}

/// Everything known about one navigation attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadRequest {
    pub url: Url,
    /// Empty when unknown.
    pub mimetype: String,
    pub view: Option<ViewId>,
    pub flags: LoadFlags,
    pub suggested_file_name: Option<String>,
    pub referrer: Option<Url>,
    /// Location-bar text the user typed, if the request came from there.
    pub typed_url: Option<String>,
    /// The default hypertext engine already handled this URL and handed it
    /// back, so its mimetype must really be detected.
    pub passed_through_engine: bool,
}

impl LoadRequest {
    pub fn new(url: Url) -> Self {
        Self {
            url,
            mimetype: String::new(),
            view: None,
            flags: LoadFlags::default(),
            suggested_file_name: None,
            referrer: None,
            typed_url: None,
            passed_through_engine: false,
        }
    }

    pub fn with_mimetype(mut self, mimetype: impl Into<String>) -> Self {
        self.mimetype = mimetype.into();
        self
    }

    pub fn with_view(mut self, view: ViewId) -> Self {
        self.view = Some(view);
        self
    }

    pub fn with_flags(mut self, flags: LoadFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn trusted(mut self) -> Self {
        self.flags.trusted_source = true;
        self
    }

    pub fn with_suggested_file_name(mut self, name: impl Into<String>) -> Self {
        self.suggested_file_name = Some(name.into());
        self
    }

    pub fn with_referrer(mut self, referrer: Url) -> Self {
        self.referrer = Some(referrer);
        self
    }

    pub fn typed(mut self, text: impl Into<String>) -> Self {
        self.typed_url = Some(text.into());
        self
    }

    pub fn passed_through_engine(mut self) -> Self {
        self.passed_through_engine = true;
        self
    }

    /// Referrer to send along. Typed URLs never carry one.
    pub fn effective_referrer(&self) -> Option<&Url> {
        if self.typed_url.is_some() {
            return None;
        }
        self.referrer.as_ref()
    }

    /// File name to save under: the suggestion, else the last path segment.
    pub fn file_name(&self) -> String {
        let name = self
            .suggested_file_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .map(str::to_string)
            .or_else(|| {
                self.url
                    .path_segments()
                    .and_then(|mut segments| segments.next_back())
                    .filter(|segment| !segment.is_empty())
                    .map(percent_decode)
            })
            .or_else(|| self.url.host_str().map(str::to_string))
            .unwrap_or_else(|| DEFAULT_FILE_NAME.to_string());
        encode_filename(&name)
    }
}

const DEFAULT_FILE_NAME: &str = "download";

/// Make a file name safe for the save destination.
pub fn encode_filename(name: &str) -> String {
    let encoded: String = name
        .chars()
        .filter(|c| *c != '\0')
        .map(|c| match c {
            ':' => '_',
            '/' | '\\' => '_',
            other => other,
        })
        .collect();
    // Never name the directory itself or its parent.
    match encoded.trim() {
        "" | "." | ".." => DEFAULT_FILE_NAME.to_string(),
        _ => encoded,
    }
}

fn percent_decode(segment: &str) -> String {
    let bytes = segment.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut index = 0;
    while index < bytes.len() {
        if bytes[index] == b'%'
            && let Some(hex) = segment.get(index + 1..index + 3)
            && hex.bytes().all(|b| b.is_ascii_hexdigit())
            && let Ok(value) = u8::from_str_radix(hex, 16)
        {
            decoded.push(value);
            index += 3;
            continue;
        }
        decoded.push(bytes[index]);
        index += 1;
    }
    String::from_utf8_lossy(&decoded).into_owned()
}
