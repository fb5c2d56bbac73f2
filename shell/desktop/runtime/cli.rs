/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use std::env;
use std::path::PathBuf;
use std::rc::Rc;

use bpaf::Bpaf;
use log::error;
use serde_json::{Value, json};

use crate::prefs::LoaderPreferences;
use crate::shell::desktop::host::console::ConsoleHost;
use crate::shell::desktop::runtime::diagnostics::DiagnosticsState;
use crate::shell::desktop::runtime::protocols::probe::probe_content_type;
use crate::shell::desktop::runtime::url_loader::{
    LoadFlags, LoadOutcome, LoadRequest, LoaderContext, UrlLoader,
};
use crate::shell::desktop::ui::location_filter::filter_location_input;

const EXIT_FAILED: i32 = 1;
const EXIT_USAGE: i32 = 2;

/// Decide what the shell would do with a location, and report it.
#[derive(Debug, Clone, Bpaf)]
#[bpaf(options, version)]
pub struct CliOptions {
    /// Mimetype already known for the location
    #[bpaf(long, argument("MIMETYPE"))]
    mimetype: Option<String>,
    /// The location comes from untrusted content
    #[bpaf(long)]
    untrusted: bool,
    /// Never embed
    #[bpaf(long("force-open"))]
    force_open: bool,
    /// Embed into a new tab
    #[bpaf(long("new-tab"))]
    new_tab: bool,
    /// Confirm execution of programs and scripts
    #[bpaf(short, long)]
    yes: bool,
    /// Preferences file instead of the default location
    #[bpaf(long, argument("PATH"))]
    config: Option<PathBuf>,
    /// Log filter directives, overriding RUST_LOG
    #[bpaf(long("tracing-filter"), argument("FILTER"))]
    tracing_filter: Option<String>,
    /// Include diagnostics channel counts in the report
    #[bpaf(long)]
    diagnostics: bool,
    /// URL, path or host name, as typed into a location bar
    #[bpaf(positional("LOCATION"))]
    location: String,
}

pub fn main() {
    let options = cli_options().run();
    std::process::exit(run(options));
}

fn run(options: CliOptions) -> i32 {
    crate::init_tracing(options.tracing_filter.as_deref());
    let mut diagnostics = options.diagnostics.then(DiagnosticsState::install);

    let prefs = match LoaderPreferences::load(options.config.as_deref()) {
        Ok(prefs) => prefs,
        Err(e) => {
            error!("{e}");
            return EXIT_USAGE;
        }
    };

    let current_dir = env::current_dir().ok();
    let url = match filter_location_input(
        &options.location,
        current_dir.as_deref(),
        &prefs.protocol_registry(),
    ) {
        Ok(url) => url,
        Err(e) => {
            error!("{e}");
            return EXIT_USAGE;
        }
    };

    let host = Rc::new(ConsoleHost::new(options.yes));
    let services = Rc::new(prefs.service_registry());
    let context = LoaderContext::new(
        prefs,
        services,
        host.clone(),
        host.clone(),
        host.clone(),
        host.clone(),
        host.clone(),
    );

    let mut request = LoadRequest::new(url)
        .typed(options.location.clone())
        .with_flags(LoadFlags {
            trusted_source: !options.untrusted,
            force_open: options.force_open,
            new_tab: options.new_tab,
        });
    if let Some(mimetype) = options.mimetype {
        request = request.with_mimetype(mimetype);
    }

    let mut loader = UrlLoader::new(request, context);
    if let Err(e) = loader.start().and_then(|()| loader.go_on()) {
        error!("{e}");
        return EXIT_FAILED;
    }

    while let Some((job, url)) = host.next_job() {
        match probe_content_type(&url) {
            Ok(mimetype) => loader.mimetype_determined(job, &mimetype),
            Err(e) => loader.job_finished(job, Err(e.to_string())),
        }
    }
    if loader.outcome().is_none() {
        loader.abort();
    }

    let Some(outcome) = loader.outcome().cloned() else {
        return EXIT_FAILED;
    };
    let mut report = outcome_report(&outcome, &loader);
    report["effects"] = Value::Array(host.effects());
    if let Some(state) = diagnostics.as_mut() {
        state.tick_drain();
        report["diagnostics"] = state.snapshot_json();
    }

    match serde_json::to_string_pretty(&report) {
        Ok(text) => println!("{text}"),
        Err(e) => error!("cannot encode report: {e}"),
    }

    if outcome.is_success() { 0 } else { EXIT_FAILED }
}

fn outcome_report(outcome: &LoadOutcome, loader: &UrlLoader) -> Value {
    json!({
        "loader_id": outcome.loader_id.to_string(),
        "url": outcome.url.as_str(),
        "mimetype": outcome.mimetype,
        "action": outcome.action.as_str(),
        "decided": loader.action().as_str(),
        "matched_by": loader.decision().map(|decision| decision.matched_by),
        "status": outcome.status.as_str(),
        "error": outcome.error().map(ToString::to_string),
        "detection_failed": outcome.detection_failed,
        "async": loader.is_async(),
        "view": loader.view().map(|view| view.0),
        "file_name": loader.suggested_file_name(),
    })
}
