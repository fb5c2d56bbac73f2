/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Collaborators the loader drives. The host implements these; the loader
//! never reaches for globals.

use url::Url;

use super::request::{LoadRequest, ViewId};
use crate::registries::atomic::service::ServiceRef;

pub type HostError = String;

/// Identifies one mimetype detection job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct JobId(pub u64);

/// Identifies one outstanding execute confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConfirmTicket(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LaunchHandle(pub u64);

/// Starts fetch-and-sniff jobs. Results come back through
/// `UrlLoader::mimetype_determined` and `UrlLoader::job_finished`.
pub trait MimetypeJobLauncher {
    fn start(&self, url: &Url) -> JobId;

    /// Stop the job. Its results must no longer be delivered, but the loader
    /// tolerates ones that still arrive.
    fn cancel_job(&self, job: JobId);
}

pub trait ViewHost {
    fn is_locked(&self, view: ViewId) -> bool;

    fn current_view(&self) -> Option<ViewId>;

    fn open_tab(&self) -> Result<ViewId, HostError>;

    /// Render `request` in `view` with `viewer`. The view owns the content
    /// from here on.
    fn embed(
        &self,
        view: ViewId,
        viewer: &ServiceRef,
        mimetype: &str,
        request: &LoadRequest,
    ) -> Result<(), HostError>;
}

pub trait ApplicationLauncher {
    /// Submit a launch. `None` runs the resource itself.
    fn launch(&self, service: Option<&ServiceRef>, url: &Url) -> Result<LaunchHandle, HostError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmReply {
    Confirmed,
    Declined,
    /// Answer arrives later through `UrlLoader::confirmation_answered`.
    Pending(ConfirmTicket),
}

pub trait TrustConfirmation {
    fn confirm_execute(&self, url: &Url, mimetype: &str) -> ConfirmReply;

    /// Take back a confirmation left pending.
    fn withdraw(&self, _ticket: ConfirmTicket) {}
}

pub trait DownloadCollaborator {
    fn supports_scheme(&self, _scheme: &str) -> bool {
        true
    }

    fn copy(&self, source: &Url, destination: &Url) -> Result<(), HostError>;
}
