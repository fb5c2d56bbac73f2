use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceKind {
    /// A viewer component rendered inside one of the shell's views.
    EmbeddableViewer,
    /// An external application launched outside the shell process.
    Application,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceRef {
    pub id: String,
    pub name: String,
    pub kind: ServiceKind,
    pub priority: i32,
    pub exec: Option<String>,
    /// The service is this shell itself. Opening with it would loop.
    pub host_shell: bool,
}

impl ServiceRef {
    pub fn viewer(id: impl Into<String>, name: impl Into<String>, priority: i32) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind: ServiceKind::EmbeddableViewer,
            priority,
            exec: None,
            host_shell: false,
        }
    }

    pub fn application(
        id: impl Into<String>,
        name: impl Into<String>,
        exec: impl Into<String>,
        priority: i32,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind: ServiceKind::Application,
            priority,
            exec: Some(exec.into()),
            host_shell: false,
        }
    }
}

/// Read-only view of the installed handlers, queried by mimetype.
///
/// Results are ordered by the registry's own priority; callers take the
/// first entry and never reorder.
pub trait ServiceRegistry {
    fn embeddable_viewers(&self, mimetype: &str) -> Vec<ServiceRef>;

    fn external_apps(&self, mimetype: &str) -> Vec<ServiceRef>;

    fn preferred_embeddable_viewer(&self, mimetype: &str) -> Option<ServiceRef> {
        self.embeddable_viewers(mimetype).into_iter().next()
    }

    fn preferred_external_app(&self, mimetype: &str) -> Option<ServiceRef> {
        self.external_apps(mimetype).into_iter().next()
    }
}

#[derive(Debug, Clone, Default)]
pub struct StaticServiceRegistry {
    viewers: HashMap<String, Vec<ServiceRef>>,
    applications: HashMap<String, Vec<ServiceRef>>,
}

impl StaticServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_viewer(&mut self, mimetype: &str, service: ServiceRef) {
        insert_by_priority(&mut self.viewers, mimetype, service);
    }

    pub fn register_application(&mut self, mimetype: &str, service: ServiceRef) {
        insert_by_priority(&mut self.applications, mimetype, service);
    }

    pub fn register(&mut self, mimetype: &str, service: ServiceRef) {
        match service.kind {
            ServiceKind::EmbeddableViewer => self.register_viewer(mimetype, service),
            ServiceKind::Application => self.register_application(mimetype, service),
        }
    }

    pub fn mimetypes(&self) -> Vec<String> {
        let mut mimetypes: Vec<String> = self
            .viewers
            .keys()
            .chain(self.applications.keys())
            .cloned()
            .collect();
        mimetypes.sort();
        mimetypes.dedup();
        mimetypes
    }

    pub fn core_seed() -> Self {
        let mut registry = Self::new();
        registry.register_viewer(
            "text/html",
            ServiceRef::viewer("part:webengine", "Web Engine", 100),
        );
        registry.register_viewer(
            "application/xhtml+xml",
            ServiceRef::viewer("part:webengine", "Web Engine", 100),
        );
        registry.register_viewer(
            "inode/directory",
            ServiceRef::viewer("part:dirview", "Directory View", 100),
        );
        registry.register_viewer(
            "text/plain",
            ServiceRef::viewer("part:textview", "Text Viewer", 50),
        );
        registry
    }

    /// Core seed plus the viewers and applications of a typical desktop.
    pub fn desktop_seed() -> Self {
        let mut registry = Self::core_seed();
        registry.register_viewer(
            "text/markdown",
            ServiceRef::viewer("part:markdown", "Markdown Viewer", 80),
        );
        registry.register_viewer(
            "application/pdf",
            ServiceRef::viewer("part:document", "Document Viewer", 80),
        );
        registry.register_viewer("image/*", ServiceRef::viewer("part:image", "Image Viewer", 60));
        registry.register_application(
            "text/html",
            ServiceRef::application("app:browser", "Web Browser", "xdg-open %u", 10),
        );
        registry.register_application(
            "text/plain",
            ServiceRef::application("app:editor", "Text Editor", "xdg-open %f", 10),
        );
        registry.register_application(
            "application/pdf",
            ServiceRef::application("app:document-reader", "Document Reader", "xdg-open %f", 10),
        );
        registry.register_application(
            "application/zip",
            ServiceRef::application("app:archiver", "Archive Manager", "xdg-open %f", 10),
        );
        registry.register_application(
            "image/*",
            ServiceRef::application("app:image-editor", "Image Editor", "xdg-open %f", 10),
        );
        registry
    }
}

impl ServiceRegistry for StaticServiceRegistry {
    fn embeddable_viewers(&self, mimetype: &str) -> Vec<ServiceRef> {
        lookup(&self.viewers, mimetype)
    }

    fn external_apps(&self, mimetype: &str) -> Vec<ServiceRef> {
        lookup(&self.applications, mimetype)
    }
}

fn insert_by_priority(
    table: &mut HashMap<String, Vec<ServiceRef>>,
    mimetype: &str,
    service: ServiceRef,
) {
    let entries = table.entry(mimetype.to_ascii_lowercase()).or_default();
    // Equal priorities keep registration order.
    let position = entries
        .iter()
        .position(|existing| existing.priority < service.priority)
        .unwrap_or(entries.len());
    entries.insert(position, service);
}

/// Exact entries first, then the `major/*` wildcard entries.
fn lookup(table: &HashMap<String, Vec<ServiceRef>>, mimetype: &str) -> Vec<ServiceRef> {
    let mimetype = mimetype.to_ascii_lowercase();
    let mut found = table.get(&mimetype).cloned().unwrap_or_default();
    if let Some((major, _)) = mimetype.split_once('/') {
        let wildcard = format!("{major}/*");
        if wildcard != mimetype
            && let Some(entries) = table.get(&wildcard)
        {
            found.extend(entries.iter().cloned());
        }
    }
    found
}
