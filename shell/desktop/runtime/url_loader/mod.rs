/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! The URL loader.
//!
//! One `UrlLoader` handles one navigation attempt:
//! `Created -> (ResolvingMimetype) -> ActionDecided -> Executing -> Finished`,
//! with `Aborted` reachable from every non-terminal state. At most one
//! asynchronous operation (a detection job or an execute confirmation) is
//! outstanding at a time, and `finished` is reported exactly once.

pub mod decision;
pub mod mimetype;
pub mod outcome;
pub mod ports;
pub mod request;
pub mod view_target;

use std::path::Path;
use std::rc::Rc;
use std::time::Instant;

use log::{debug, error, info, warn};
use url::Url;
use uuid::Uuid;

use crate::prefs::LoaderPreferences;
use crate::registries::atomic::protocol::ProtocolRegistry;
use crate::registries::atomic::service::{ServiceRef, ServiceRegistry};
use crate::shell::desktop::runtime::diagnostics::{self, DiagnosticEvent};
use crate::shell::desktop::runtime::registries::{
    CHANNEL_LOADER_ABORTED, CHANNEL_LOADER_ACTION_DECIDED, CHANNEL_LOADER_CONFIRM_DECLINED,
    CHANNEL_LOADER_CONFIRM_REQUESTED, CHANNEL_LOADER_DETECTION_FAILED,
    CHANNEL_LOADER_DETECTION_STARTED, CHANNEL_LOADER_DETECTION_SUCCEEDED, CHANNEL_LOADER_FAILED,
    CHANNEL_LOADER_FINISHED, CHANNEL_LOADER_LATE_CALLBACK_DISCARDED,
    CHANNEL_LOADER_MIMETYPE_KNOWN, CHANNEL_LOADER_START,
};

pub use decision::{ActionDecision, EmbedPolicy, OpenUrlAction, PreferenceEmbedPolicy, decide_action};
pub use mimetype::{
    GENERIC_MIMETYPE, HYPERTEXT_MIMETYPE, MimetypeResolution, is_executable, is_mimetype_known,
    resolve_mimetype, sniff_local_file,
};
pub use outcome::{LoadOutcome, LoaderError, OutcomeStatus};
pub use ports::{
    ApplicationLauncher, ConfirmReply, ConfirmTicket, DownloadCollaborator, HostError, JobId,
    LaunchHandle, MimetypeJobLauncher, TrustConfirmation, ViewHost,
};
pub use request::{LoadFlags, LoadRequest, ViewId, encode_filename};
pub use view_target::ViewToUse;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoaderState {
    Created,
    ResolvingMimetype,
    ActionDecided,
    Executing,
    Finished,
    Aborted,
}

impl LoaderState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Finished | Self::Aborted)
    }
}

/// Process-wide services and host collaborators shared by every loader of a
/// window.
#[derive(Clone)]
pub struct LoaderContext {
    pub prefs: Rc<LoaderPreferences>,
    pub protocols: Rc<ProtocolRegistry>,
    pub services: Rc<dyn ServiceRegistry>,
    pub embed_policy: Rc<dyn EmbedPolicy>,
    pub jobs: Rc<dyn MimetypeJobLauncher>,
    pub view_host: Rc<dyn ViewHost>,
    pub launcher: Rc<dyn ApplicationLauncher>,
    pub confirmation: Rc<dyn TrustConfirmation>,
    pub downloads: Rc<dyn DownloadCollaborator>,
}

impl LoaderContext {
    /// Protocol registry and embed policy are derived from `prefs`.
    pub fn new(
        prefs: LoaderPreferences,
        services: Rc<dyn ServiceRegistry>,
        jobs: Rc<dyn MimetypeJobLauncher>,
        view_host: Rc<dyn ViewHost>,
        launcher: Rc<dyn ApplicationLauncher>,
        confirmation: Rc<dyn TrustConfirmation>,
        downloads: Rc<dyn DownloadCollaborator>,
    ) -> Self {
        let protocols = Rc::new(prefs.protocol_registry());
        let embed_policy: Rc<dyn EmbedPolicy> = Rc::new(prefs.embed_policy());
        Self {
            prefs: Rc::new(prefs),
            protocols,
            services,
            embed_policy,
            jobs,
            view_host,
            launcher,
            confirmation,
            downloads,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PendingOperation {
    Detection(JobId),
    Confirmation(ConfirmTicket),
}

type FinishedCallback = Box<dyn FnOnce(&LoadOutcome)>;

pub struct UrlLoader {
    id: Uuid,
    request: LoadRequest,
    context: LoaderContext,
    state: LoaderState,
    mimetype: String,
    decision: Option<ActionDecision>,
    pending: Option<PendingOperation>,
    detection_started_at: Option<Instant>,
    ready: bool,
    is_async: bool,
    has_error: bool,
    view: Option<ViewId>,
    new_tab: bool,
    old_location_bar_url: Option<String>,
    outcome: Option<LoadOutcome>,
    on_finished: Option<FinishedCallback>,
}

impl UrlLoader {
    pub fn new(request: LoadRequest, context: LoaderContext) -> Self {
        let mimetype = if is_mimetype_known(&request.mimetype) {
            mimetype::normalize(&request.mimetype)
        } else {
            String::new()
        };
        Self {
            id: Uuid::new_v4(),
            view: request.view,
            new_tab: request.flags.new_tab,
            request,
            context,
            state: LoaderState::Created,
            mimetype,
            decision: None,
            pending: None,
            detection_started_at: None,
            ready: false,
            is_async: false,
            has_error: false,
            old_location_bar_url: None,
            outcome: None,
            on_finished: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Register the completion callback. If the loader already finished it
    /// runs right away.
    pub fn on_finished(&mut self, callback: impl FnOnce(&LoadOutcome) + 'static) {
        match &self.outcome {
            Some(outcome) => callback(outcome),
            None => self.on_finished = Some(Box::new(callback)),
        }
    }

    /// Determine the action when the mimetype is available without a
    /// detection job. Never starts a job; see [`UrlLoader::go_on`].
    pub fn start(&mut self) -> Result<(), LoaderError> {
        if self.state != LoaderState::Created {
            return Err(self.invalid_state("start"));
        }
        diagnostics::emit_signal(CHANNEL_LOADER_START);
        debug!("loader {}: start {}", self.id, self.request.url);

        match resolve_mimetype(&self.request, &self.context.prefs, &self.context.protocols) {
            MimetypeResolution::Known(mimetype) => {
                diagnostics::emit_signal(CHANNEL_LOADER_MIMETYPE_KNOWN);
                self.mimetype = mimetype;
                self.decide();
            }
            MimetypeResolution::Pending => {
                debug!("loader {}: mimetype needs detection", self.id);
                self.state = LoaderState::ResolvingMimetype;
            }
        }
        Ok(())
    }

    /// Perform the decided action, or start the detection job when the
    /// mimetype is still unknown. Once the job reports, the loader decides
    /// and performs on its own.
    pub fn go_on(&mut self) -> Result<(), LoaderError> {
        match self.state {
            LoaderState::ActionDecided => self.perform_action(),
            LoaderState::ResolvingMimetype if self.pending.is_none() => {
                let job = self.context.jobs.start(&self.request.url);
                diagnostics::emit_signal(CHANNEL_LOADER_DETECTION_STARTED);
                debug!("loader {}: detection job {:?} started", self.id, job);
                self.pending = Some(PendingOperation::Detection(job));
                self.detection_started_at = Some(Instant::now());
                self.is_async = true;
                Ok(())
            }
            _ => Err(self.invalid_state("go_on")),
        }
    }

    pub fn perform_action(&mut self) -> Result<(), LoaderError> {
        if self.state != LoaderState::ActionDecided {
            return Err(self.invalid_state("perform_action"));
        }
        let Some(decision) = self.decision.clone() else {
            return Err(self.invalid_state("perform_action"));
        };
        self.state = LoaderState::Executing;
        info!(
            "loader {}: {} {} as {}",
            self.id, decision.action, self.request.url, self.mimetype
        );

        let result = match decision.action {
            OpenUrlAction::Undecided => Err(self.invalid_state("perform_action")),
            OpenUrlAction::DoNothing => Ok(()),
            OpenUrlAction::Embed => self.embed(decision.service.as_ref()),
            OpenUrlAction::Open => self.launch(decision.service.as_ref()),
            OpenUrlAction::Save => self.save(),
            OpenUrlAction::Execute => return self.confirm_then_execute(),
        };

        match result {
            Ok(()) => self.finish(decision.action, OutcomeStatus::Succeeded),
            Err(error @ LoaderError::InvalidState { .. }) => return Err(error),
            Err(error) => self.finish(decision.action, OutcomeStatus::Failed(error)),
        }
        Ok(())
    }

    /// The detection job knows the content type. Stops the job and acts.
    pub fn mimetype_determined(&mut self, job: JobId, mimetype: &str) {
        if !self.is_pending_job(job) {
            self.discard_late_callback("mimetype_determined");
            return;
        }
        self.context.jobs.cancel_job(job);
        self.pending = None;

        let latency_us = self
            .detection_started_at
            .take()
            .map(|started| u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX))
            .unwrap_or_default();
        diagnostics::emit_event(DiagnosticEvent::MessageReceived {
            channel_id: CHANNEL_LOADER_DETECTION_SUCCEEDED,
            latency_us,
        });

        if is_mimetype_known(mimetype) {
            self.mimetype = mimetype::normalize(mimetype);
        } else {
            debug!("loader {}: detection yielded no usable type", self.id);
            self.mimetype = GENERIC_MIMETYPE.to_string();
        }
        self.decide_and_perform();
    }

    /// The detection job ended without reporting a mimetype.
    pub fn job_finished(&mut self, job: JobId, result: Result<(), HostError>) {
        if !self.is_pending_job(job) {
            self.discard_late_callback("job_finished");
            return;
        }
        self.pending = None;
        self.detection_started_at = None;

        let reason = match result {
            Err(reason) => reason,
            Ok(()) => "job ended without a mimetype".to_string(),
        };
        diagnostics::emit_signal(CHANNEL_LOADER_DETECTION_FAILED);
        warn!(
            "loader {}: {}",
            self.id,
            LoaderError::DetectionFailed(reason)
        );
        self.has_error = true;
        self.mimetype = GENERIC_MIMETYPE.to_string();
        self.decide_and_perform();
    }

    /// Answer to a confirmation that was left pending.
    pub fn confirmation_answered(&mut self, ticket: ConfirmTicket, confirmed: bool) {
        if self.state.is_terminal()
            || self.pending != Some(PendingOperation::Confirmation(ticket))
        {
            self.discard_late_callback("confirmation_answered");
            return;
        }
        self.pending = None;
        self.conclude_confirmation(confirmed);
    }

    /// Cancel whatever is pending and finish as aborted. No-op once
    /// finished.
    pub fn abort(&mut self) {
        if self.state.is_terminal() {
            return;
        }
        match self.pending.take() {
            Some(PendingOperation::Detection(job)) => {
                debug!("loader {}: cancelling detection job {:?}", self.id, job);
                self.context.jobs.cancel_job(job);
            }
            Some(PendingOperation::Confirmation(ticket)) => {
                debug!("loader {}: withdrawing confirmation {:?}", self.id, ticket);
                self.context.confirmation.withdraw(ticket);
            }
            None => {}
        }
        self.finish(OpenUrlAction::DoNothing, OutcomeStatus::Aborted);
    }

    pub fn mimetype(&self) -> &str {
        &self.mimetype
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn action(&self) -> OpenUrlAction {
        self.decision
            .as_ref()
            .map_or(OpenUrlAction::Undecided, |decision| decision.action)
    }

    pub fn decision(&self) -> Option<&ActionDecision> {
        self.decision.as_ref()
    }

    pub fn view_to_use(&self) -> ViewToUse {
        view_target::view_to_use(self.view, self.new_tab, |view| {
            self.context.view_host.is_locked(view)
        })
    }

    pub fn url(&self) -> &Url {
        &self.request.url
    }

    pub fn request(&self) -> &LoadRequest {
        &self.request
    }

    pub fn view(&self) -> Option<ViewId> {
        self.view
    }

    pub fn set_view(&mut self, view: Option<ViewId>) {
        self.view = view;
    }

    /// A detection job was needed.
    pub fn is_async(&self) -> bool {
        self.is_async
    }

    /// The detection job failed.
    pub fn has_error(&self) -> bool {
        self.has_error
    }

    pub fn set_new_tab(&mut self, new_tab: bool) {
        self.new_tab = new_tab;
    }

    pub fn suggested_file_name(&self) -> String {
        self.request.file_name()
    }

    /// Location-bar text to restore if the load does not replace the view.
    pub fn set_old_location_bar_url(&mut self, text: impl Into<String>) {
        self.old_location_bar_url = Some(text.into());
    }

    pub fn old_location_bar_url(&self) -> Option<&str> {
        self.old_location_bar_url.as_deref()
    }

    pub fn state(&self) -> LoaderState {
        self.state
    }

    pub fn outcome(&self) -> Option<&LoadOutcome> {
        self.outcome.as_ref()
    }

    /// Viewer that would embed the local file at `path`, if any.
    pub fn viewer_for_local_file(path: &Path, services: &dyn ServiceRegistry) -> Option<ServiceRef> {
        let mimetype = sniff_local_file(path);
        if !is_mimetype_known(&mimetype) {
            return None;
        }
        services.preferred_embeddable_viewer(&mimetype)
    }

    fn decide(&mut self) {
        let decision = decide_action(
            &self.mimetype,
            self.request.flags,
            self.context.services.as_ref(),
            self.context.embed_policy.as_ref(),
        );
        diagnostics::emit_signal(CHANNEL_LOADER_ACTION_DECIDED);
        debug!(
            "loader {}: {} decided for {} ({})",
            self.id, decision.action, self.mimetype, decision.matched_by
        );
        self.decision = Some(decision);
        self.ready = true;
        self.state = LoaderState::ActionDecided;
    }

    fn decide_and_perform(&mut self) {
        self.decide();
        if let Err(e) = self.perform_action() {
            error!("loader {}: {e}", self.id);
        }
    }

    fn embed(&mut self, viewer: Option<&ServiceRef>) -> Result<(), LoaderError> {
        let Some(viewer) = viewer else {
            return Err(LoaderError::EmbedFailed("no viewer chosen".to_string()));
        };
        let host = Rc::clone(&self.context.view_host);
        let view = match self.view_to_use() {
            ViewToUse::View(view) => view,
            ViewToUse::CurrentView => match host.current_view() {
                Some(view) => view,
                None => host.open_tab().map_err(LoaderError::EmbedFailed)?,
            },
            ViewToUse::NewTab => host.open_tab().map_err(LoaderError::EmbedFailed)?,
        };
        self.view = Some(view);
        debug!("loader {}: embedding with {} in {view}", self.id, viewer.id);
        host.embed(view, viewer, &self.mimetype, &self.request)
            .map_err(LoaderError::EmbedFailed)
    }

    fn launch(&self, service: Option<&ServiceRef>) -> Result<(), LoaderError> {
        let handle = self
            .context
            .launcher
            .launch(service, &self.request.url)
            .map_err(LoaderError::LaunchFailed)?;
        info!(
            "loader {}: launch {:?} submitted via {}",
            self.id,
            handle,
            service.map_or("the resource itself", |service| service.id.as_str())
        );
        Ok(())
    }

    fn save(&self) -> Result<(), LoaderError> {
        let scheme = self.request.url.scheme();
        if !self.context.downloads.supports_scheme(scheme) {
            return Err(LoaderError::UnsupportedProtocol {
                scheme: scheme.to_string(),
            });
        }
        let destination_path = self
            .context
            .prefs
            .effective_download_dir()
            .join(self.suggested_file_name());
        let destination = Url::from_file_path(&destination_path).map_err(|()| {
            LoaderError::SaveFailed(format!(
                "{} is not an absolute path",
                destination_path.display()
            ))
        })?;
        self.context
            .downloads
            .copy(&self.request.url, &destination)
            .map_err(LoaderError::SaveFailed)?;
        info!("loader {}: saving {} to {destination}", self.id, self.request.url);
        Ok(())
    }

    fn confirm_then_execute(&mut self) -> Result<(), LoaderError> {
        diagnostics::emit_signal(CHANNEL_LOADER_CONFIRM_REQUESTED);
        match self
            .context
            .confirmation
            .confirm_execute(&self.request.url, &self.mimetype)
        {
            ConfirmReply::Confirmed => self.conclude_confirmation(true),
            ConfirmReply::Declined => self.conclude_confirmation(false),
            ConfirmReply::Pending(ticket) => {
                debug!("loader {}: waiting on confirmation {:?}", self.id, ticket);
                self.pending = Some(PendingOperation::Confirmation(ticket));
            }
        }
        Ok(())
    }

    fn conclude_confirmation(&mut self, confirmed: bool) {
        if !confirmed {
            diagnostics::emit_signal(CHANNEL_LOADER_CONFIRM_DECLINED);
            info!("loader {}: execution of {} declined", self.id, self.request.url);
            self.finish(OpenUrlAction::DoNothing, OutcomeStatus::Succeeded);
            return;
        }
        let status = match self.launch(None) {
            Ok(()) => OutcomeStatus::Succeeded,
            Err(error) => OutcomeStatus::Failed(error),
        };
        self.finish(OpenUrlAction::Execute, status);
    }

    fn finish(&mut self, action: OpenUrlAction, status: OutcomeStatus) {
        if self.state.is_terminal() {
            return;
        }
        self.state = match status {
            OutcomeStatus::Aborted => LoaderState::Aborted,
            _ => LoaderState::Finished,
        };
        match &status {
            OutcomeStatus::Succeeded => diagnostics::emit_signal(CHANNEL_LOADER_FINISHED),
            OutcomeStatus::Failed(error) => {
                diagnostics::emit_signal(CHANNEL_LOADER_FAILED);
                warn!("loader {}: {error}", self.id);
            }
            OutcomeStatus::Aborted => {
                diagnostics::emit_signal(CHANNEL_LOADER_ABORTED);
                info!("loader {}: aborted", self.id);
            }
        }

        let outcome = LoadOutcome {
            loader_id: self.id,
            url: self.request.url.clone(),
            mimetype: self.mimetype.clone(),
            action,
            status,
            detection_failed: self.has_error,
        };
        if let Some(callback) = self.on_finished.take() {
            callback(&outcome);
        }
        self.outcome = Some(outcome);
    }

    fn is_pending_job(&self, job: JobId) -> bool {
        !self.state.is_terminal() && self.pending == Some(PendingOperation::Detection(job))
    }

    fn discard_late_callback(&self, operation: &'static str) {
        diagnostics::emit_signal(CHANNEL_LOADER_LATE_CALLBACK_DISCARDED);
        warn!(
            "loader {}: discarding {operation} in state {:?}",
            self.id, self.state
        );
    }

    fn invalid_state(&self, operation: &'static str) -> LoaderError {
        let error = LoaderError::InvalidState {
            operation,
            state: self.state,
        };
        error!("loader {}: {error}", self.id);
        error
    }
}

impl Drop for UrlLoader {
    fn drop(&mut self) {
        if !self.state.is_terminal() {
            self.abort();
        }
    }
}

impl std::fmt::Debug for UrlLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UrlLoader")
            .field("id", &self.id)
            .field("url", &self.request.url.as_str())
            .field("state", &self.state)
            .field("mimetype", &self.mimetype)
            .field("action", &self.action())
            .field("pending", &self.pending)
            .finish()
    }
}
