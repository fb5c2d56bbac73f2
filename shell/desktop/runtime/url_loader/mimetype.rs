/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Mimetype resolution strategy.
//!
//! Decides whether a request's mimetype is already known, can be looked up
//! synchronously, or needs an asynchronous detection job.

use std::fs;
use std::path::Path;

use log::debug;

use super::request::LoadRequest;
use crate::prefs::LoaderPreferences;
use crate::registries::atomic::protocol::ProtocolRegistry;

/// Placeholder for content whose type is not known.
pub const GENERIC_MIMETYPE: &str = "application/octet-stream";
/// Handed to the hypertext engine, which detects the real type itself.
pub const HYPERTEXT_MIMETYPE: &str = "text/html";
pub const DIRECTORY_MIMETYPE: &str = "inode/directory";
pub const EMPTY_FILE_MIMETYPE: &str = "application/x-zerosize";
pub const EXECUTABLE_MIMETYPE: &str = "application/x-executable";

const EXECUTABLE_MIMETYPES: &[&str] = &[
    "application/x-executable",
    "application/x-pie-executable",
    "application/x-sharedlib",
    "application/x-ms-dos-executable",
    "application/x-msdownload",
    "application/vnd.microsoft.portable-executable",
    "application/x-desktop",
    "application/x-shellscript",
    "application/x-sh",
    "text/x-shellscript",
];

/// Executables that are also readable text and may be viewed instead.
const TEXT_EXECUTABLE_MIMETYPES: &[&str] = &[
    "application/x-desktop",
    "application/x-shellscript",
    "application/x-sh",
    "text/x-shellscript",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MimetypeResolution {
    Known(String),
    /// A detection job has to be started; see `UrlLoader::go_on`.
    Pending,
}

/// Lowercased essence of a mimetype, parameters stripped.
pub fn normalize(mimetype: &str) -> String {
    mimetype
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase()
}

pub fn is_mimetype_known(mimetype: &str) -> bool {
    let essence = normalize(mimetype);
    !essence.is_empty() && essence != GENERIC_MIMETYPE
}

pub fn is_executable(mimetype: &str) -> bool {
    EXECUTABLE_MIMETYPES.contains(&normalize(mimetype).as_str())
}

pub fn is_text_executable(mimetype: &str) -> bool {
    TEXT_EXECUTABLE_MIMETYPES.contains(&normalize(mimetype).as_str())
}

pub fn resolve_mimetype(
    request: &LoadRequest,
    prefs: &LoaderPreferences,
    protocols: &ProtocolRegistry,
) -> MimetypeResolution {
    if is_mimetype_known(&request.mimetype) {
        return MimetypeResolution::Known(normalize(&request.mimetype));
    }

    if protocols.is_local(&request.url) {
        let mimetype = match request.url.to_file_path() {
            Ok(path) => sniff_local_file(&path),
            Err(()) => GENERIC_MIMETYPE.to_string(),
        };
        return MimetypeResolution::Known(mimetype);
    }

    if prefs.hypertext_engine_shortcut
        && protocols.is_hypertext(&request.url)
        && !request.passed_through_engine
    {
        return MimetypeResolution::Known(HYPERTEXT_MIMETYPE.to_string());
    }

    MimetypeResolution::Pending
}

/// Synchronous lookup for local files: stat, content sniff, extension.
pub fn sniff_local_file(path: &Path) -> String {
    let metadata = match fs::metadata(path) {
        Ok(metadata) => metadata,
        Err(e) => {
            debug!("stat failed for {}: {e}", path.display());
            return guess_from_extension(path).unwrap_or_else(|| GENERIC_MIMETYPE.to_string());
        }
    };

    if metadata.is_dir() {
        return DIRECTORY_MIMETYPE.to_string();
    }

    if metadata.len() == 0 {
        return EMPTY_FILE_MIMETYPE.to_string();
    }

    match infer::get_from_path(path) {
        Ok(Some(kind)) => return kind.mime_type().to_string(),
        Ok(None) => {}
        Err(e) => debug!("content sniff failed for {}: {e}", path.display()),
    }

    if let Some(guess) = guess_from_extension(path) {
        return guess;
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if metadata.permissions().mode() & 0o111 != 0 {
            return EXECUTABLE_MIMETYPE.to_string();
        }
    }

    GENERIC_MIMETYPE.to_string()
}

fn guess_from_extension(path: &Path) -> Option<String> {
    mime_guess::from_path(path)
        .first_raw()
        .map(str::to_ascii_lowercase)
}
