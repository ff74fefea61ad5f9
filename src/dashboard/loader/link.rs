use crate::dashboard::config::WidgetConfig;
use crate::dashboard::error::LoadError;
use crate::dashboard::host::{HostCapabilities, ABI_VERSION};
use crate::dashboard::unit::{RenderableUnit, Widget};
use crate::dashboard::widgets::{link_buttons, LinkEntry};
use eframe::egui;
use libloading::{Library, Symbol};
use serde::Deserialize;
use siphasher::sip::SipHasher24;
use std::hash::Hasher;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Symbol holding the host ABI version a native bundle was built against.
pub const ABI_SYMBOL: &[u8] = b"DASHBOARD_PLUGIN_ABI\0";
/// Symbol of the native bundle entry point.
pub const ENTRY_SYMBOL: &[u8] = b"dashboard_plugin_entry\0";

/// Signature of a native bundle's entry point. The bundle receives the host
/// capability bundle and hands back its unit.
#[allow(improper_ctypes_definitions)]
pub type PluginEntry =
    unsafe extern "C" fn(host: &Arc<HostCapabilities>) -> *mut Box<dyn RenderableUnit>;

/// Turns fetched bundle bytes into a renderable unit.
pub trait BundleLinker: Send + Sync {
    fn link(
        &self,
        url: &str,
        bytes: &[u8],
        host: &Arc<HostCapabilities>,
    ) -> Result<Arc<dyn RenderableUnit>, LoadError>;
}

/// Export the entry symbols of a native widget bundle.
///
/// ```ignore
/// fn build(host: &Arc<HostCapabilities>) -> Box<dyn RenderableUnit> { ... }
/// dashboard_shell::export_dashboard_plugin!(build);
/// ```
#[macro_export]
macro_rules! export_dashboard_plugin {
    ($ctor:path) => {
        #[no_mangle]
        pub static DASHBOARD_PLUGIN_ABI: u32 = $crate::dashboard::host::ABI_VERSION;

        #[no_mangle]
        #[allow(improper_ctypes_definitions)]
        pub unsafe extern "C" fn dashboard_plugin_entry(
            host: &::std::sync::Arc<$crate::dashboard::host::HostCapabilities>,
        ) -> *mut ::std::boxed::Box<dyn $crate::dashboard::unit::RenderableUnit> {
            let unit: ::std::boxed::Box<dyn $crate::dashboard::unit::RenderableUnit> =
                $ctor(host);
            ::std::boxed::Box::into_raw(::std::boxed::Box::new(unit))
        }
    };
}

/// Unit living in a loaded shared library. `unit` is declared first so it is
/// dropped before the library is unloaded.
struct NativeUnit {
    unit: Box<dyn RenderableUnit>,
    _library: Library,
}

impl RenderableUnit for NativeUnit {
    fn mount(&self, config: &WidgetConfig) -> anyhow::Result<Box<dyn Widget>> {
        self.unit.mount(config)
    }
}

/// Links native shared-library bundles.
pub struct NativeLinker {
    cache_dir: PathBuf,
}

impl NativeLinker {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
        }
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// File name derived from the URL and contents, so distinct bundles never
    /// overwrite each other on disk.
    pub fn bundle_file_name(url: &str, bytes: &[u8]) -> String {
        let mut hasher = SipHasher24::new_with_keys(0, 0);
        hasher.write(url.as_bytes());
        hasher.write(bytes);
        format!("{:016x}.{}", hasher.finish(), std::env::consts::DLL_EXTENSION)
    }
}

impl BundleLinker for NativeLinker {
    fn link(
        &self,
        url: &str,
        bytes: &[u8],
        host: &Arc<HostCapabilities>,
    ) -> Result<Arc<dyn RenderableUnit>, LoadError> {
        std::fs::create_dir_all(&self.cache_dir).map_err(|e| LoadError::link(url, e))?;
        let path = self.cache_dir.join(Self::bundle_file_name(url, bytes));
        std::fs::write(&path, bytes).map_err(|e| LoadError::link(url, e))?;
        tracing::debug!(url = %url, path = %path.display(), "linking native bundle");

        // SAFETY: the bundle is trusted code published to the widget registry;
        // symbols are checked for the host ABI before the entry point is called.
        let library = unsafe { Library::new(&path) }.map_err(|e| LoadError::link(url, e))?;
        let version = unsafe {
            let abi: Symbol<*const u32> = library
                .get(ABI_SYMBOL)
                .map_err(|e| LoadError::link(url, format!("missing ABI marker: {e}")))?;
            **abi
        };
        if version != ABI_VERSION {
            return Err(LoadError::link(
                url,
                format!("built for host ABI {version}, host is {ABI_VERSION}"),
            ));
        }
        let raw = unsafe {
            let entry: Symbol<PluginEntry> = library
                .get(ENTRY_SYMBOL)
                .map_err(|e| LoadError::link(url, format!("missing entry point: {e}")))?;
            entry(host)
        };
        if raw.is_null() {
            return Err(LoadError::link(url, "entry point returned no unit"));
        }
        let unit = unsafe { Box::from_raw(raw) };
        Ok(Arc::new(NativeUnit {
            unit: *unit,
            _library: library,
        }))
    }
}

#[derive(Debug, Clone, Deserialize)]
struct Manifest {
    kind: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    lines: Vec<String>,
    #[serde(default)]
    links: Vec<LinkEntry>,
}

/// Declarative bundle rendered by the host itself.
struct ManifestUnit {
    manifest: Manifest,
}

struct ManifestWidget {
    title: Option<String>,
    lines: Vec<String>,
    links: Vec<LinkEntry>,
}

impl RenderableUnit for ManifestUnit {
    fn mount(&self, config: &WidgetConfig) -> anyhow::Result<Box<dyn Widget>> {
        let title = config
            .get("title")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .or_else(|| self.manifest.title.clone());
        Ok(Box::new(ManifestWidget {
            title,
            lines: self.manifest.lines.clone(),
            links: self.manifest.links.clone(),
        }))
    }
}

impl Widget for ManifestWidget {
    fn render(&mut self, ui: &mut egui::Ui) -> anyhow::Result<()> {
        if let Some(title) = &self.title {
            ui.strong(title);
        }
        for line in &self.lines {
            ui.label(line);
        }
        link_buttons(ui, &self.links);
        Ok(())
    }
}

/// Links JSON manifest bundles (`{"kind": "manifest", ...}`).
#[derive(Default)]
pub struct ManifestLinker;

impl BundleLinker for ManifestLinker {
    fn link(
        &self,
        url: &str,
        bytes: &[u8],
        _host: &Arc<HostCapabilities>,
    ) -> Result<Arc<dyn RenderableUnit>, LoadError> {
        let manifest: Manifest =
            serde_json::from_slice(bytes).map_err(|e| LoadError::link(url, e))?;
        if manifest.kind != "manifest" {
            return Err(LoadError::link(
                url,
                format!("unsupported bundle kind '{}'", manifest.kind),
            ));
        }
        Ok(Arc::new(ManifestUnit { manifest }))
    }
}

/// Picks the manifest linker for JSON bundles and the native linker otherwise.
pub struct AutoLinker {
    native: NativeLinker,
    manifest: ManifestLinker,
}

impl AutoLinker {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            native: NativeLinker::new(cache_dir),
            manifest: ManifestLinker,
        }
    }
}

impl BundleLinker for AutoLinker {
    fn link(
        &self,
        url: &str,
        bytes: &[u8],
        host: &Arc<HostCapabilities>,
    ) -> Result<Arc<dyn RenderableUnit>, LoadError> {
        let first = bytes.iter().find(|b| !b.is_ascii_whitespace());
        if first == Some(&b'{') {
            self.manifest.link(url, bytes, host)
        } else {
            self.native.link(url, bytes, host)
        }
    }
}
