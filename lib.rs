/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! URL loading for the shell: decide whether a resource is embedded in a
//! view, opened in an external application, saved, or executed, and carry
//! that decision out through host-provided collaborators.

pub mod prefs;
pub mod registries;
pub mod shell;

pub use prefs::{LoaderPreferences, PrefsError, ServiceEntry};
pub use registries::atomic::protocol::{ProtocolRegistry, ProtocolResolution, SchemeClass};
pub use registries::atomic::service::{
    ServiceKind, ServiceRef, ServiceRegistry, StaticServiceRegistry,
};
pub use shell::desktop::runtime::url_loader::{
    ActionDecision, ApplicationLauncher, ConfirmReply, ConfirmTicket, DownloadCollaborator,
    EmbedPolicy, HostError, JobId, LaunchHandle, LoadFlags, LoadOutcome, LoadRequest,
    LoaderContext, LoaderError, LoaderState, MimetypeJobLauncher, MimetypeResolution,
    OpenUrlAction, OutcomeStatus, PreferenceEmbedPolicy, TrustConfirmation, UrlLoader, ViewHost,
    ViewId, ViewToUse, decide_action, resolve_mimetype,
};
pub use shell::desktop::ui::location_filter::{LocationFilterError, filter_location_input};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Install the process-wide log subscriber.
///
/// `filter` takes `EnvFilter` directives; without it `RUST_LOG` is honoured,
/// defaulting to `info`. Records from the `log` facade are bridged.
pub fn init_tracing(filter: Option<&str>) {
    use tracing_subscriber::EnvFilter;

    let filter = match filter {
        Some(directives) => EnvFilter::new(directives),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };

    if let Err(e) = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
    {
        eprintln!("log subscriber already installed: {e}");
    }
}
