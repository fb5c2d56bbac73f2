/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use url::Url;
use uuid::Uuid;

use super::LoaderState;
use super::decision::OpenUrlAction;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoaderError {
    /// The detection job failed; the loader saves instead.
    DetectionFailed(String),
    UnsupportedProtocol { scheme: String },
    LaunchFailed(String),
    EmbedFailed(String),
    SaveFailed(String),
    /// The caller drove the loader out of order.
    InvalidState {
        operation: &'static str,
        state: LoaderState,
    },
}

impl std::fmt::Display for LoaderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DetectionFailed(reason) => write!(f, "mimetype detection failed: {reason}"),
            Self::UnsupportedProtocol { scheme } => {
                write!(f, "no handler can save '{scheme}' URLs")
            }
            Self::LaunchFailed(reason) => write!(f, "launch failed: {reason}"),
            Self::EmbedFailed(reason) => write!(f, "embedding failed: {reason}"),
            Self::SaveFailed(reason) => write!(f, "save failed: {reason}"),
            Self::InvalidState { operation, state } => {
                write!(f, "{operation} is not valid in state {state:?}")
            }
        }
    }
}

impl std::error::Error for LoaderError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutcomeStatus {
    Succeeded,
    Failed(LoaderError),
    Aborted,
}

impl OutcomeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Succeeded => "succeeded",
            Self::Failed(_) => "failed",
            Self::Aborted => "aborted",
        }
    }
}

/// Payload of the single `finished` notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadOutcome {
    pub loader_id: Uuid,
    pub url: Url,
    pub mimetype: String,
    /// The action actually taken. A declined execute reports `DoNothing`.
    pub action: OpenUrlAction,
    pub status: OutcomeStatus,
    /// Detection failed and the loader fell back to saving.
    pub detection_failed: bool,
}

impl LoadOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self.status, OutcomeStatus::Succeeded)
    }

    pub fn error(&self) -> Option<&LoaderError> {
        match &self.status {
            OutcomeStatus::Failed(error) => Some(error),
            _ => None,
        }
    }
}
