/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Console host for the command-line shell.
//!
//! Nothing is rendered, launched or copied: every collaborator call is
//! recorded so the CLI can report what the loader would have done.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;

use serde_json::{Value, json};
use url::Url;

use crate::registries::atomic::service::ServiceRef;
use crate::shell::desktop::runtime::url_loader::{
    ApplicationLauncher, ConfirmReply, DownloadCollaborator, HostError, JobId, LaunchHandle,
    LoadRequest, MimetypeJobLauncher, TrustConfirmation, ViewHost, ViewId,
};

const CONSOLE_VIEW: ViewId = ViewId(1);

/// Dry-run host side of a loader.
pub struct ConsoleHost {
    assume_yes: bool,
    next_id: Cell<u64>,
    queued_jobs: RefCell<VecDeque<(JobId, Url)>>,
    cancelled_jobs: RefCell<Vec<JobId>>,
    effects: RefCell<Vec<Value>>,
}

impl ConsoleHost {
    /// `assume_yes` answers every execute confirmation.
    pub fn new(assume_yes: bool) -> Self {
        Self {
            assume_yes,
            next_id: Cell::new(0),
            queued_jobs: RefCell::new(VecDeque::new()),
            cancelled_jobs: RefCell::new(Vec::new()),
            effects: RefCell::new(Vec::new()),
        }
    }

    /// Oldest detection job that was started and not cancelled.
    pub fn next_job(&self) -> Option<(JobId, Url)> {
        let mut queue = self.queued_jobs.borrow_mut();
        while let Some((job, url)) = queue.pop_front() {
            if !self.cancelled_jobs.borrow().contains(&job) {
                return Some((job, url));
            }
        }
        None
    }

    /// Recorded collaborator effects, oldest first.
    pub fn effects(&self) -> Vec<Value> {
        self.effects.borrow().clone()
    }

    fn next_id(&self) -> u64 {
        let id = self.next_id.get() + 1;
        self.next_id.set(id);
        id
    }

    fn record(&self, effect: Value) {
        self.effects.borrow_mut().push(effect);
    }
}

impl MimetypeJobLauncher for ConsoleHost {
    fn start(&self, url: &Url) -> JobId {
        let job = JobId(self.next_id());
        self.queued_jobs.borrow_mut().push_back((job, url.clone()));
        job
    }

    fn cancel_job(&self, job: JobId) {
        self.cancelled_jobs.borrow_mut().push(job);
    }
}

impl ViewHost for ConsoleHost {
    fn is_locked(&self, _view: ViewId) -> bool {
        false
    }

    fn current_view(&self) -> Option<ViewId> {
        Some(CONSOLE_VIEW)
    }

    fn open_tab(&self) -> Result<ViewId, HostError> {
        let view = ViewId(CONSOLE_VIEW.0 + self.next_id());
        self.record(json!({ "effect": "open-tab", "view": view.0 }));
        Ok(view)
    }

    fn embed(
        &self,
        view: ViewId,
        viewer: &ServiceRef,
        mimetype: &str,
        request: &LoadRequest,
    ) -> Result<(), HostError> {
        self.record(json!({
            "effect": "embed",
            "view": view.0,
            "viewer": viewer.id,
            "mimetype": mimetype,
            "url": request.url.as_str(),
        }));
        Ok(())
    }
}

impl ApplicationLauncher for ConsoleHost {
    fn launch(&self, service: Option<&ServiceRef>, url: &Url) -> Result<LaunchHandle, HostError> {
        let handle = LaunchHandle(self.next_id());
        self.record(json!({
            "effect": "launch",
            "service": service.map(|service| service.id.as_str()),
            "exec": service.and_then(|service| service.exec.as_deref()),
            "url": url.as_str(),
        }));
        Ok(handle)
    }
}

impl TrustConfirmation for ConsoleHost {
    fn confirm_execute(&self, url: &Url, mimetype: &str) -> ConfirmReply {
        self.record(json!({
            "effect": "confirm-execute",
            "url": url.as_str(),
            "mimetype": mimetype,
            "answer": self.assume_yes,
        }));
        if self.assume_yes {
            ConfirmReply::Confirmed
        } else {
            ConfirmReply::Declined
        }
    }
}

impl DownloadCollaborator for ConsoleHost {
    fn supports_scheme(&self, scheme: &str) -> bool {
        !matches!(scheme, "about" | "data")
    }

    fn copy(&self, source: &Url, destination: &Url) -> Result<(), HostError> {
        self.record(json!({
            "effect": "save",
            "source": source.as_str(),
            "destination": destination.as_str(),
        }));
        Ok(())
    }
}
