/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use super::request::ViewId;

/// Where an embedded resource should be shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewToUse {
    /// The view that asked for the load.
    View(ViewId),
    CurrentView,
    NewTab,
}

/// Resolve which view an embed should target.
///
/// Preference order:
/// 1) the requesting view unless it is locked,
/// 2) a new tab when the request asks for one or its view is locked,
/// 3) the window's current view.
pub fn view_to_use(
    requested_view: Option<ViewId>,
    new_tab: bool,
    is_locked: impl Fn(ViewId) -> bool,
) -> ViewToUse {
    if let Some(view) = requested_view
        && !is_locked(view)
    {
        return ViewToUse::View(view);
    }

    if new_tab || requested_view.is_some() {
        ViewToUse::NewTab
    } else {
        ViewToUse::CurrentView
    }
}
