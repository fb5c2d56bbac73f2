/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use proptest::prelude::*;
use urlshell::{
    ConfirmReply, ConfirmTicket, JobId, LoadFlags, LoadRequest, LoaderError, LoaderState,
    OpenUrlAction, OutcomeStatus, ViewId, ViewToUse,
};

use crate::harness::{HostEvent, Rig, url};

#[test]
fn known_mimetype_is_ready_after_start_without_a_job() {
    let rig = Rig::new();
    let mut loader = rig.loader(LoadRequest::new(url("sftp://host/notes.txt")).with_mimetype("text/plain"));

    loader.start().expect("start");

    assert!(loader.is_ready());
    assert!(!loader.is_async());
    assert_eq!(loader.state(), LoaderState::ActionDecided);
    assert_eq!(loader.action(), OpenUrlAction::Embed);
    assert_eq!(rig.host.jobs_started(), 0);
}

#[test]
fn generic_remote_mimetype_starts_exactly_one_job() {
    let rig = Rig::new();
    let mut loader = rig.loader(
        LoadRequest::new(url("sftp://host/blob")).with_mimetype("application/octet-stream"),
    );

    loader.start().expect("start");
    assert!(!loader.is_ready());
    assert_eq!(loader.action(), OpenUrlAction::Undecided);
    assert_eq!(rig.host.jobs_started(), 0);

    loader.go_on().expect("first go_on starts the job");
    assert!(loader.is_async());
    assert_eq!(rig.host.jobs_started(), 1);

    assert_eq!(
        loader.go_on(),
        Err(LoaderError::InvalidState {
            operation: "go_on",
            state: LoaderState::ResolvingMimetype,
        })
    );
    assert_eq!(rig.host.jobs_started(), 1);
    assert!(rig.outcomes().is_empty());
}

#[test]
fn hypertext_returned_by_the_engine_is_detected_for_real() {
    let rig = Rig::new();
    let mut loader =
        rig.loader(LoadRequest::new(url("https://example.com/file")).passed_through_engine());

    loader.start().expect("start");
    loader.go_on().expect("go on");
    assert_eq!(rig.host.jobs_started(), 1);

    loader.mimetype_determined(JobId(1), "application/pdf");
    assert_eq!(loader.action(), OpenUrlAction::Embed);
    assert_eq!(
        rig.host.events(),
        vec![
            HostEvent::JobStarted(JobId(1)),
            HostEvent::JobCancelled(JobId(1)),
            HostEvent::Embed {
                view: ViewId(1),
                viewer: "part:document".to_string(),
            },
        ]
    );
}

#[test]
fn trusted_local_html_embeds_into_the_request_view() {
    let rig = Rig::new();
    let dir = tempfile::tempdir().expect("tempdir");
    let page = dir.path().join("index.html");
    std::fs::write(&page, "<html><body>local</body></html>").expect("write page");
    let request = LoadRequest::new(url::Url::from_file_path(&page).expect("file url"))
        .with_mimetype("text/html")
        .with_view(ViewId(7))
        .trusted();
    let mut loader = rig.loader(request);

    loader.start().expect("start");
    assert_eq!(loader.action(), OpenUrlAction::Embed);
    assert_eq!(loader.view_to_use(), ViewToUse::View(ViewId(7)));

    loader.go_on().expect("go on");
    assert_eq!(
        rig.host.events(),
        vec![HostEvent::Embed {
            view: ViewId(7),
            viewer: "part:webengine".to_string(),
        }]
    );
    let outcomes = rig.outcomes();
    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0].action, OpenUrlAction::Embed);
    assert_eq!(outcomes[0].status, OutcomeStatus::Succeeded);
    assert_eq!(outcomes[0].loader_id, loader.id());
}

#[test]
fn locked_request_view_embeds_into_a_new_tab() {
    let rig = Rig::new();
    rig.host.locked_views.borrow_mut().push(ViewId(7));
    let mut loader = rig.loader(
        LoadRequest::new(url("https://example.com/"))
            .with_view(ViewId(7))
            .trusted(),
    );

    loader.start().expect("start");
    assert_eq!(loader.view_to_use(), ViewToUse::NewTab);
    loader.go_on().expect("go on");

    let events = rig.host.events();
    let HostEvent::OpenTab(tab) = events[0].clone() else {
        panic!("expected a new tab first, got {events:?}");
    };
    assert_eq!(
        events[1],
        HostEvent::Embed {
            view: tab,
            viewer: "part:webengine".to_string(),
        }
    );
    assert_eq!(loader.view(), Some(tab));
}

#[test]
fn unlocked_request_view_is_kept_over_a_new_tab() {
    let rig = Rig::new();
    let mut loader = rig.loader(
        LoadRequest::new(url("https://example.com/"))
            .with_view(ViewId(7))
            .with_flags(LoadFlags {
                trusted_source: true,
                force_open: false,
                new_tab: true,
            }),
    );

    loader.start().expect("start");
    assert_eq!(loader.view_to_use(), ViewToUse::View(ViewId(7)));
    loader.go_on().expect("go on");

    assert_eq!(
        rig.host.events(),
        vec![HostEvent::Embed {
            view: ViewId(7),
            viewer: "part:webengine".to_string(),
        }]
    );
}

#[test]
fn failed_detection_saves_and_finishes_once() {
    let rig = Rig::new();
    let mut loader = rig.loader(LoadRequest::new(url("sftp://host/dir/blob")));

    loader.start().expect("start");
    loader.go_on().expect("go on");
    loader.job_finished(JobId(1), Err("connection refused".to_string()));

    assert!(loader.has_error());
    assert_eq!(loader.mimetype(), "application/octet-stream");
    assert_eq!(loader.action(), OpenUrlAction::Save);

    let outcomes = rig.outcomes();
    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0].action, OpenUrlAction::Save);
    assert!(outcomes[0].detection_failed);
    assert!(outcomes[0].is_success());

    let expected = url::Url::from_file_path(rig.download_dir.path().join("blob")).expect("dest");
    assert_eq!(
        rig.host.events().last(),
        Some(&HostEvent::Copy {
            destination: expected,
        })
    );
}

#[test]
fn generic_mimetype_after_detection_saves() {
    let rig = Rig::new();
    let mut loader = rig.loader(LoadRequest::new(url("sftp://host/blob")).trusted());

    loader.start().expect("start");
    loader.go_on().expect("go on");
    loader.mimetype_determined(JobId(1), "application/octet-stream");

    assert_eq!(loader.action(), OpenUrlAction::Save);
    assert_eq!(rig.host.launches(), 0);
    assert_eq!(rig.outcomes().len(), 1);
}

#[test]
fn untrusted_executable_declined_is_a_successful_no_op() {
    let rig = Rig::new();
    let mut loader = rig.loader(
        LoadRequest::new(url("https://downloads.example/setup"))
            .with_mimetype("application/x-executable"),
    );

    loader.start().expect("start");
    assert_eq!(loader.action(), OpenUrlAction::Execute);
    assert!(loader.decision().is_some_and(|decision| decision.requires_confirmation));
    loader.go_on().expect("go on");

    assert_eq!(
        rig.host.events(),
        vec![HostEvent::ConfirmRequested(
            "https://downloads.example/setup".to_string()
        )]
    );
    let outcomes = rig.outcomes();
    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0].action, OpenUrlAction::DoNothing);
    assert_eq!(outcomes[0].status, OutcomeStatus::Succeeded);
}

#[test]
fn untrusted_executable_confirmed_launches_after_the_confirmation() {
    let rig = Rig::new();
    rig.host.confirm_reply.set(ConfirmReply::Confirmed);
    let mut loader = rig.loader(
        LoadRequest::new(url("https://downloads.example/install.sh"))
            .with_mimetype("application/x-shellscript")
            .with_flags(LoadFlags {
                trusted_source: false,
                force_open: true,
                new_tab: false,
            }),
    );

    loader.start().expect("start");
    loader.go_on().expect("go on");

    let confirm = rig
        .host
        .position(|event| matches!(event, HostEvent::ConfirmRequested(_)))
        .expect("confirmation requested");
    let launch = rig
        .host
        .position(|event| matches!(event, HostEvent::Launch { service: None }))
        .expect("resource launched");
    assert!(confirm < launch);
    assert_eq!(rig.outcomes()[0].action, OpenUrlAction::Execute);
}

#[test]
fn trusted_binary_executable_still_asks_before_launch() {
    let rig = Rig::new();
    let request = || {
        LoadRequest::new(url("https://downloads.example/setup"))
            .with_mimetype("application/x-executable")
            .trusted()
    };

    let mut declined = rig.loader(request());
    declined.start().expect("start");
    assert_eq!(declined.action(), OpenUrlAction::Execute);
    declined.go_on().expect("go on");
    assert_eq!(
        rig.host.events(),
        vec![HostEvent::ConfirmRequested(
            "https://downloads.example/setup".to_string()
        )]
    );
    assert_eq!(rig.host.launches(), 0);
    assert_eq!(rig.outcomes()[0].action, OpenUrlAction::DoNothing);

    rig.host.confirm_reply.set(ConfirmReply::Confirmed);
    let mut confirmed = rig.loader(request());
    confirmed.start().expect("start");
    confirmed.go_on().expect("go on");
    assert_eq!(
        rig.host.events()[1..],
        [
            HostEvent::ConfirmRequested("https://downloads.example/setup".to_string()),
            HostEvent::Launch { service: None },
        ]
    );
    assert_eq!(rig.outcomes()[1].action, OpenUrlAction::Execute);
}

#[test]
fn asynchronous_confirmation_is_matched_by_ticket() {
    let rig = Rig::new();
    rig.host.confirm_reply.set(ConfirmReply::Pending(ConfirmTicket(5)));
    let mut loader = rig.loader(
        LoadRequest::new(url("https://downloads.example/setup"))
            .with_mimetype("application/x-executable"),
    );

    loader.start().expect("start");
    loader.go_on().expect("go on");
    assert_eq!(loader.state(), LoaderState::Executing);
    assert!(rig.outcomes().is_empty());

    loader.confirmation_answered(ConfirmTicket(4), true);
    assert_eq!(rig.host.launches(), 0);
    assert!(rig.outcomes().is_empty());

    loader.confirmation_answered(ConfirmTicket(5), true);
    assert_eq!(rig.host.launches(), 1);
    assert_eq!(loader.state(), LoaderState::Finished);

    loader.confirmation_answered(ConfirmTicket(5), true);
    assert_eq!(rig.host.launches(), 1);
    assert_eq!(rig.outcomes().len(), 1);
}

#[test]
fn abort_withdraws_a_pending_confirmation() {
    let rig = Rig::new();
    rig.host.confirm_reply.set(ConfirmReply::Pending(ConfirmTicket(9)));
    let mut loader = rig.loader(
        LoadRequest::new(url("https://downloads.example/setup"))
            .with_mimetype("application/x-executable"),
    );

    loader.start().expect("start");
    loader.go_on().expect("go on");
    loader.abort();

    assert!(rig.host.events().contains(&HostEvent::ConfirmCancelled(ConfirmTicket(9))));
    loader.confirmation_answered(ConfirmTicket(9), true);
    assert_eq!(rig.host.launches(), 0);
    assert_eq!(rig.outcomes().len(), 1);
    assert_eq!(rig.outcomes()[0].status, OutcomeStatus::Aborted);
    assert_eq!(rig.outcomes()[0].action, OpenUrlAction::DoNothing);
}

#[test]
fn abort_after_the_decision_reports_nothing_done() {
    let rig = Rig::new();
    let mut loader =
        rig.loader(LoadRequest::new(url("sftp://host/notes.txt")).with_mimetype("text/plain"));

    loader.start().expect("start");
    assert_eq!(loader.action(), OpenUrlAction::Embed);
    loader.abort();

    assert!(rig.host.events().is_empty());
    let outcomes = rig.outcomes();
    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0].status, OutcomeStatus::Aborted);
    assert_eq!(outcomes[0].action, OpenUrlAction::DoNothing);
    assert_eq!(loader.action(), OpenUrlAction::Embed);
}

#[test]
fn abort_while_detecting_cancels_and_ignores_late_results() {
    let rig = Rig::new();
    let mut loader = rig.loader(LoadRequest::new(url("smb://server/share/report")));

    loader.start().expect("start");
    loader.go_on().expect("go on");
    loader.abort();

    assert!(rig.host.events().contains(&HostEvent::JobCancelled(JobId(1))));
    assert_eq!(loader.state(), LoaderState::Aborted);

    loader.mimetype_determined(JobId(1), "text/plain");
    loader.job_finished(JobId(1), Ok(()));
    loader.abort();

    assert_eq!(loader.state(), LoaderState::Aborted);
    assert_eq!(loader.mimetype(), "");
    assert_eq!(loader.action(), OpenUrlAction::Undecided);
    let outcomes = rig.outcomes();
    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0].status, OutcomeStatus::Aborted);
    assert_eq!(rig.host.jobs_started(), 1);
}

#[test]
fn dropping_a_waiting_loader_reports_abort_once() {
    let rig = Rig::new();
    {
        let mut loader = rig.loader(LoadRequest::new(url("smb://server/share/report")));
        loader.start().expect("start");
        loader.go_on().expect("go on");
    }
    let outcomes = rig.outcomes();
    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0].status, OutcomeStatus::Aborted);
    assert!(rig.host.events().contains(&HostEvent::JobCancelled(JobId(1))));
}

#[test]
fn launch_failure_is_reported_not_retried() {
    let rig = Rig::new();
    *rig.host.launch_error.borrow_mut() = Some("no such program".to_string());
    let mut loader = rig.loader(
        LoadRequest::new(url("sftp://host/notes.txt"))
            .with_mimetype("text/plain")
            .with_flags(LoadFlags {
                trusted_source: true,
                force_open: true,
                new_tab: false,
            }),
    );

    loader.start().expect("start");
    assert_eq!(loader.action(), OpenUrlAction::Open);
    assert_eq!(
        loader.decision().and_then(|decision| decision.service.as_ref()).map(|s| s.id.as_str()),
        Some("app:editor")
    );
    loader.go_on().expect("go on");

    let outcomes = rig.outcomes();
    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0].action, OpenUrlAction::Open);
    assert_eq!(
        outcomes[0].status,
        OutcomeStatus::Failed(LoaderError::LaunchFailed("no such program".to_string()))
    );
    assert!(loader.perform_action().is_err());
    assert_eq!(rig.outcomes().len(), 1);
}

#[test]
fn embed_failure_keeps_the_decision() {
    let rig = Rig::new();
    *rig.host.embed_error.borrow_mut() = Some("viewer crashed".to_string());
    let mut loader = rig.loader(LoadRequest::new(url("https://example.com/")).trusted());

    loader.start().expect("start");
    loader.go_on().expect("go on");

    assert_eq!(loader.action(), OpenUrlAction::Embed);
    assert_eq!(
        rig.outcomes()[0].error(),
        Some(&LoaderError::EmbedFailed("viewer crashed".to_string()))
    );
}

#[test]
fn saving_over_an_unsupported_scheme_fails() {
    let rig = Rig::new();
    rig.host.unsupported_schemes.borrow_mut().push("ftp".to_string());
    let mut loader = rig.loader(
        LoadRequest::new(url("ftp://mirror.example/pub/file.bin"))
            .with_mimetype("application/x-unknown-format"),
    );

    loader.start().expect("start");
    assert_eq!(loader.action(), OpenUrlAction::Save);
    loader.go_on().expect("go on");

    let outcomes = rig.outcomes();
    assert_eq!(outcomes.len(), 1);
    assert_eq!(
        outcomes[0].status,
        OutcomeStatus::Failed(LoaderError::UnsupportedProtocol {
            scheme: "ftp".to_string(),
        })
    );
    assert!(!rig.host.events().iter().any(|event| matches!(event, HostEvent::Copy { .. })));
}

#[test]
fn suggested_file_name_is_used_for_the_destination() {
    let rig = Rig::new();
    let mut loader = rig.loader(
        LoadRequest::new(url("https://example.com/download?id=3"))
            .with_mimetype("application/x-unknown-format")
            .with_suggested_file_name("report: final.bin"),
    );

    loader.start().expect("start");
    loader.go_on().expect("go on");

    let expected = url::Url::from_file_path(rig.download_dir.path().join("report_ final.bin"))
        .expect("dest");
    assert_eq!(
        rig.host.events(),
        vec![HostEvent::Copy {
            destination: expected,
        }]
    );
}

#[test]
fn parent_directory_suggestion_stays_in_the_download_dir() {
    let rig = Rig::new();
    let mut loader = rig.loader(
        LoadRequest::new(url("https://example.com/download?id=4"))
            .with_mimetype("application/x-unknown-format")
            .with_suggested_file_name(".."),
    );

    loader.start().expect("start");
    loader.go_on().expect("go on");

    let expected =
        url::Url::from_file_path(rig.download_dir.path().join("download")).expect("dest");
    assert_eq!(
        rig.host.events(),
        vec![HostEvent::Copy {
            destination: expected,
        }]
    );
    assert!(rig.outcomes()[0].is_success());
}

fn executable_mimetype() -> impl Strategy<Value = &'static str> {
    prop::sample::select(vec![
        "application/x-executable",
        "application/x-sharedlib",
        "application/x-ms-dos-executable",
        "application/x-desktop",
        "application/x-shellscript",
        "text/x-shellscript",
    ])
}

proptest! {
    #[test]
    fn untrusted_executables_never_launch_before_confirmation(
        mimetype in executable_mimetype(),
        force_open in any::<bool>(),
        new_tab in any::<bool>(),
        confirmed in any::<bool>(),
    ) {
        let rig = Rig::new();
        rig.host.confirm_reply.set(if confirmed {
            ConfirmReply::Confirmed
        } else {
            ConfirmReply::Declined
        });
        let mut loader = rig.loader(
            LoadRequest::new(url("https://untrusted.example/payload"))
                .with_mimetype(mimetype)
                .with_flags(LoadFlags { trusted_source: false, force_open, new_tab }),
        );

        loader.start().expect("start");
        loader.go_on().expect("go on");

        let confirm = rig
            .host
            .position(|event| matches!(event, HostEvent::ConfirmRequested(_)));
        prop_assert_eq!(confirm, Some(0));
        prop_assert_eq!(rig.host.launches(), usize::from(confirmed));
        prop_assert_eq!(rig.outcomes().len(), 1);
    }
}
