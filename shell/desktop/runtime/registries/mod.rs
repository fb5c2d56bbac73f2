/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Diagnostics channel ids emitted by the URL loader.

pub const CHANNEL_LOADER_START: &str = "loader.start";
pub const CHANNEL_LOADER_MIMETYPE_KNOWN: &str = "loader.mimetype.known";
pub const CHANNEL_LOADER_DETECTION_STARTED: &str = "loader.detection.started";
pub const CHANNEL_LOADER_DETECTION_SUCCEEDED: &str = "loader.detection.succeeded";
pub const CHANNEL_LOADER_DETECTION_FAILED: &str = "loader.detection.failed";
pub const CHANNEL_LOADER_ACTION_DECIDED: &str = "loader.action.decided";
pub const CHANNEL_LOADER_CONFIRM_REQUESTED: &str = "loader.confirm.requested";
pub const CHANNEL_LOADER_CONFIRM_DECLINED: &str = "loader.confirm.declined";
pub const CHANNEL_LOADER_LATE_CALLBACK_DISCARDED: &str = "loader.callback.discarded";
pub const CHANNEL_LOADER_FINISHED: &str = "loader.finished";
pub const CHANNEL_LOADER_FAILED: &str = "loader.failed";
pub const CHANNEL_LOADER_ABORTED: &str = "loader.aborted";

pub const LOADER_CHANNELS: &[&str] = &[
    CHANNEL_LOADER_START,
    CHANNEL_LOADER_MIMETYPE_KNOWN,
    CHANNEL_LOADER_DETECTION_STARTED,
    CHANNEL_LOADER_DETECTION_SUCCEEDED,
    CHANNEL_LOADER_DETECTION_FAILED,
    CHANNEL_LOADER_ACTION_DECIDED,
    CHANNEL_LOADER_CONFIRM_REQUESTED,
    CHANNEL_LOADER_CONFIRM_DECLINED,
    CHANNEL_LOADER_LATE_CALLBACK_DISCARDED,
    CHANNEL_LOADER_FINISHED,
    CHANNEL_LOADER_FAILED,
    CHANNEL_LOADER_ABORTED,
];
