/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use super::mimetype::{is_executable, is_mimetype_known, is_text_executable, normalize};
use super::request::LoadFlags;
use crate::registries::atomic::service::{ServiceRef, ServiceRegistry};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpenUrlAction {
    /// Nothing decided yet; the mimetype is still unknown.
    Undecided,
    DoNothing,
    Save,
    Embed,
    Open,
    Execute,
}

impl OpenUrlAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Undecided => "undecided",
            Self::DoNothing => "do-nothing",
            Self::Save => "save",
            Self::Embed => "embed",
            Self::Open => "open",
            Self::Execute => "execute",
        }
    }
}

impl std::fmt::Display for OpenUrlAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionDecision {
    pub action: OpenUrlAction,
    pub service: Option<ServiceRef>,
    /// Execute only after the user confirms.
    pub requires_confirmation: bool,
    pub matched_by: &'static str,
}

impl ActionDecision {
    /// Executing is never decided without a confirmation step.
    fn execute(matched_by: &'static str) -> Self {
        Self {
            requires_confirmation: true,
            ..Self::new(OpenUrlAction::Execute, None, matched_by)
        }
    }

    fn new(action: OpenUrlAction, service: Option<ServiceRef>, matched_by: &'static str) -> Self {
        Self {
            action,
            service,
            requires_confirmation: false,
            matched_by,
        }
    }
}

/// User and site policy about embedding and saving, per mimetype.
pub trait EmbedPolicy {
    fn is_embedding_disabled(&self, mimetype: &str) -> bool;

    fn is_always_safe_to_embed(&self, mimetype: &str) -> bool;

    /// The user asked to always save this type instead of viewing it.
    fn always_save(&self, mimetype: &str) -> bool;
}

/// [`EmbedPolicy`] backed by mimetype pattern lists; `major/*` matches a
/// whole family.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreferenceEmbedPolicy {
    always_embed: Vec<String>,
    always_save: Vec<String>,
    embedding_disabled: Vec<String>,
}

impl PreferenceEmbedPolicy {
    pub fn new(
        always_embed: Vec<String>,
        always_save: Vec<String>,
        embedding_disabled: Vec<String>,
    ) -> Self {
        let normalize_all =
            |patterns: Vec<String>| patterns.iter().map(|p| normalize(p)).collect::<Vec<_>>();
        Self {
            always_embed: normalize_all(always_embed),
            always_save: normalize_all(always_save),
            embedding_disabled: normalize_all(embedding_disabled),
        }
    }
}

impl EmbedPolicy for PreferenceEmbedPolicy {
    fn is_embedding_disabled(&self, mimetype: &str) -> bool {
        matches_any(&self.embedding_disabled, mimetype)
    }

    fn is_always_safe_to_embed(&self, mimetype: &str) -> bool {
        matches_any(&self.always_embed, mimetype)
    }

    fn always_save(&self, mimetype: &str) -> bool {
        matches_any(&self.always_save, mimetype)
    }
}

fn matches_any(patterns: &[String], mimetype: &str) -> bool {
    let mimetype = normalize(mimetype);
    patterns.iter().any(|pattern| {
        pattern == &mimetype
            || pattern
                .strip_suffix("/*")
                .and_then(|major| mimetype.strip_prefix(major))
                .is_some_and(|rest| rest.starts_with('/'))
    })
}

/// Classify what to do with a resource. Pure: depends only on its inputs.
///
/// Rules, first match wins:
/// 1. unknown or generic mimetype: save;
/// 2. executable: execute behind a confirmation; a trusted source only
///    skips this for scripts, which are viewed like text;
/// 3. unless `force_open`, embed with the first registered viewer when
///    embedding is allowed for the type;
/// 4. open with the first registered external application;
/// 5. save.
pub fn decide_action(
    mimetype: &str,
    flags: LoadFlags,
    services: &dyn ServiceRegistry,
    policy: &dyn EmbedPolicy,
) -> ActionDecision {
    if !is_mimetype_known(mimetype) {
        return ActionDecision::new(OpenUrlAction::Save, None, "unknown-type");
    }
    let mimetype = normalize(mimetype);

    if is_executable(&mimetype) {
        let matched_by = if !flags.trusted_source {
            Some("untrusted-executable")
        } else if !is_text_executable(&mimetype) {
            Some("trusted-executable")
        } else {
            None
        };
        if let Some(matched_by) = matched_by {
            return ActionDecision::execute(matched_by);
        }
    }

    if !flags.force_open
        && let Some(viewer) = services.preferred_embeddable_viewer(&mimetype)
        && !policy.is_embedding_disabled(&mimetype)
        && (policy.is_always_safe_to_embed(&mimetype) || !policy.always_save(&mimetype))
    {
        return ActionDecision::new(OpenUrlAction::Embed, Some(viewer), "viewer");
    }

    if policy.always_save(&mimetype) {
        return ActionDecision::new(OpenUrlAction::Save, None, "always-save");
    }

    match services.preferred_external_app(&mimetype) {
        Some(app) if app.host_shell => {
            log::warn!(
                "{} is associated with this shell but cannot be embedded; saving instead",
                mimetype
            );
            ActionDecision::new(OpenUrlAction::Save, None, "host-shell-loop")
        }
        Some(app) => ActionDecision::new(OpenUrlAction::Open, Some(app), "application"),
        None => ActionDecision::new(OpenUrlAction::Save, None, "fallback"),
    }
}
