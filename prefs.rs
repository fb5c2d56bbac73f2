/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Loader preferences, read from `loader.toml`.

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::registries::atomic::protocol::ProtocolRegistry;
use crate::registries::atomic::service::{ServiceKind, ServiceRef, StaticServiceRegistry};
use crate::shell::desktop::runtime::url_loader::PreferenceEmbedPolicy;

pub const CONFIG_DIR_NAME: &str = "urlshell";
pub const CONFIG_FILE_NAME: &str = "loader.toml";

#[derive(Debug)]
pub enum PrefsError {
    Read { path: PathBuf, source: std::io::Error },
    Parse { path: PathBuf, source: toml::de::Error },
}

impl std::fmt::Display for PrefsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Read { path, source } => {
                write!(f, "failed to read preferences {}: {source}", path.display())
            }
            Self::Parse { path, source } => {
                write!(f, "failed to parse preferences {}: {source}", path.display())
            }
        }
    }
}

impl std::error::Error for PrefsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Read { source, .. } => Some(source),
            Self::Parse { source, .. } => Some(source),
        }
    }
}

/// One configured viewer or application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceEntry {
    pub id: String,
    pub name: String,
    pub mimetypes: Vec<String>,
    #[serde(default)]
    pub priority: i32,
    #[serde(default)]
    pub exec: Option<String>,
    #[serde(default)]
    pub host_shell: bool,
}

impl ServiceEntry {
    fn to_service(&self, kind: ServiceKind) -> ServiceRef {
        ServiceRef {
            id: self.id.clone(),
            name: self.name.clone(),
            kind,
            priority: self.priority,
            exec: self.exec.clone(),
            host_shell: self.host_shell,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderPreferences {
    /// Hand hypertext URLs to the engine with a provisional `text/html`
    /// instead of probing their mimetype first.
    pub hypertext_engine_shortcut: bool,
    pub hypertext_schemes: Vec<String>,
    /// Destination directory for saved resources. Unset means the user's
    /// download directory.
    pub download_dir: Option<PathBuf>,
    /// Mimetype patterns embedded even when the user asked to always save.
    pub always_embed: Vec<String>,
    pub always_save: Vec<String>,
    pub embedding_disabled: Vec<String>,
    /// Replaces the built-in service seed when non-empty.
    pub viewers: Vec<ServiceEntry>,
    pub applications: Vec<ServiceEntry>,
}

impl Default for LoaderPreferences {
    fn default() -> Self {
        Self {
            hypertext_engine_shortcut: true,
            hypertext_schemes: vec!["http".to_string(), "https".to_string()],
            download_dir: None,
            always_embed: vec![
                "inode/*".to_string(),
                "text/html".to_string(),
                "application/xhtml+xml".to_string(),
                "image/*".to_string(),
            ],
            always_save: Vec::new(),
            embedding_disabled: Vec::new(),
            viewers: Vec::new(),
            applications: Vec::new(),
        }
    }
}

impl LoaderPreferences {
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    pub fn from_toml_str(text: &str, path: &Path) -> Result<Self, PrefsError> {
        toml::from_str(text).map_err(|source| PrefsError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn load_from_path(path: &Path) -> Result<Self, PrefsError> {
        let text = fs::read_to_string(path).map_err(|source| PrefsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let prefs = Self::from_toml_str(&text, path)?;
        debug!("loaded loader preferences from {}", path.display());
        Ok(prefs)
    }

    /// An explicit path must exist; the default location is optional.
    pub fn load(explicit: Option<&Path>) -> Result<Self, PrefsError> {
        if let Some(path) = explicit {
            return Self::load_from_path(path);
        }

        match Self::default_config_path() {
            Some(path) if path.is_file() => Self::load_from_path(&path),
            _ => Ok(Self::default()),
        }
    }

    pub fn effective_download_dir(&self) -> PathBuf {
        self.download_dir
            .clone()
            .or_else(dirs::download_dir)
            .unwrap_or_else(std::env::temp_dir)
    }

    pub fn protocol_registry(&self) -> ProtocolRegistry {
        if self.hypertext_schemes.is_empty() {
            warn!("no hypertext schemes configured; every remote URL will be probed");
        }
        ProtocolRegistry::with_hypertext_schemes(&self.hypertext_schemes)
    }

    pub fn embed_policy(&self) -> PreferenceEmbedPolicy {
        PreferenceEmbedPolicy::new(
            self.always_embed.clone(),
            self.always_save.clone(),
            self.embedding_disabled.clone(),
        )
    }

    /// Configured services, or the desktop seed when none are configured.
    pub fn service_registry(&self) -> StaticServiceRegistry {
        if self.viewers.is_empty() && self.applications.is_empty() {
            StaticServiceRegistry::desktop_seed()
        } else {
            let mut registry = StaticServiceRegistry::new();
            for entry in &self.viewers {
                for mimetype in &entry.mimetypes {
                    registry.register_viewer(mimetype, entry.to_service(ServiceKind::EmbeddableViewer));
                }
            }
            for entry in &self.applications {
                for mimetype in &entry.mimetypes {
                    registry.register_application(mimetype, entry.to_service(ServiceKind::Application));
                }
            }
            registry
        }
    }
}
