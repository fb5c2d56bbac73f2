use std::collections::HashMap;

use url::Url;

/// How the loader treats URLs of a given scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SchemeClass {
    /// Addresses local storage; the mimetype is looked up synchronously.
    Local,
    /// Rendered by the default hypertext engine, which detects the real
    /// mimetype itself.
    Hypertext,
    /// Needs an asynchronous fetch-and-sniff job.
    Remote,
    /// Served by the shell itself (`about:`).
    Internal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocolResolution {
    pub scheme: String,
    pub class: Option<SchemeClass>,
    pub supported: bool,
    pub inferred_mime_hint: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ProtocolRegistry {
    schemes: HashMap<String, SchemeClass>,
}

impl ProtocolRegistry {
    pub fn new() -> Self {
        Self {
            schemes: HashMap::new(),
        }
    }

    pub fn register_scheme(&mut self, scheme: &str, class: SchemeClass) {
        self.schemes.insert(scheme.to_ascii_lowercase(), class);
    }

    pub fn has_scheme(&self, scheme: &str) -> bool {
        self.schemes.contains_key(&scheme.to_ascii_lowercase())
    }

    pub fn classify(&self, scheme: &str) -> Option<SchemeClass> {
        self.schemes.get(&scheme.to_ascii_lowercase()).copied()
    }

    pub fn is_local(&self, url: &Url) -> bool {
        self.classify(url.scheme()) == Some(SchemeClass::Local)
    }

    pub fn is_hypertext(&self, url: &Url) -> bool {
        self.classify(url.scheme()) == Some(SchemeClass::Hypertext)
    }

    pub fn scheme_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.schemes.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn resolve(&self, url: &Url) -> ProtocolResolution {
        let scheme = url.scheme().to_ascii_lowercase();
        let class = self.classify(&scheme);
        ProtocolResolution {
            inferred_mime_hint: infer_mime_hint(url),
            supported: class.is_some(),
            class,
            scheme,
        }
    }

    /// Shell defaults with the hypertext scheme set replaced by `hypertext`.
    pub fn with_hypertext_schemes<S: AsRef<str>>(hypertext: &[S]) -> Self {
        let mut registry = Self::default();
        registry
            .schemes
            .retain(|_, class| *class != SchemeClass::Hypertext);
        for scheme in hypertext {
            registry.register_scheme(scheme.as_ref(), SchemeClass::Hypertext);
        }
        registry
    }

    pub fn core_seed() -> Self {
        let mut registry = Self::new();
        registry.register_scheme("file", SchemeClass::Local);
        registry.register_scheme("about", SchemeClass::Internal);
        registry
    }
}

impl Default for ProtocolRegistry {
    fn default() -> Self {
        let mut registry = Self::core_seed();
        for scheme in ["http", "https"] {
            registry.register_scheme(scheme, SchemeClass::Hypertext);
        }
        for scheme in ["ftp", "sftp", "smb", "fish", "webdav", "webdavs", "data"] {
            registry.register_scheme(scheme, SchemeClass::Remote);
        }
        registry
    }
}

/// Best-effort mimetype guess from the URL text alone.
pub fn infer_mime_hint(url: &Url) -> Option<String> {
    if url.scheme() == "data" {
        return infer_data_uri_mime_hint(url.as_str());
    }

    let last_segment = url
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|segment| !segment.is_empty())?;

    let guessed = mime_guess::from_path(last_segment).first_raw()?;
    Some(guessed.to_ascii_lowercase())
}

fn infer_data_uri_mime_hint(uri: &str) -> Option<String> {
    let metadata = uri.strip_prefix("data:")?.split_once(',')?.0;
    if metadata.is_empty() {
        return Some("text/plain".to_string());
    }

    let media_type = metadata
        .split(';')
        .next()
        .filter(|value| !value.is_empty())
        .unwrap_or("text/plain");

    Some(media_type.to_ascii_lowercase())
}
