//! Assets and bundles of the host compilation graph.

use std::{
    collections::HashMap,
    fmt,
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use parking_lot::RwLock;

/// Identifier of an [`Asset`], unique within a single compilation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AssetId(u64);

impl AssetId {
    /// Creates an identifier from a raw value assigned by the host.
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "#{}", self.0)
    }
}

/// Generated representation of an asset for a single target (e.g., `css` or `ttf`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Output {
    /// Textual output (style sheets, scripts, markup).
    Text(String),
    /// Binary output.
    Bytes(Arc<[u8]>),
    /// Reference to the output stored at the specified path.
    Path(PathBuf),
}

impl Output {
    /// Returns textual contents of this output, if it is textual.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }
}

impl From<String> for Output {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for Output {
    fn from(text: &str) -> Self {
        Self::Text(text.to_owned())
    }
}

impl From<Vec<u8>> for Output {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(bytes.into())
    }
}

/// Single processed source unit of a compilation.
///
/// Outputs are stored behind a lock so that they can be replaced in place (e.g., when
/// stripping unused CSS rules) while the asset is shared among bundles.
#[derive(Debug)]
pub struct Asset {
    id: AssetId,
    name: PathBuf,
    kind: String,
    outputs: RwLock<HashMap<String, Output>>,
}

impl Asset {
    /// Creates an asset without outputs. The asset kind is the file extension of `name`.
    pub fn new(id: AssetId, name: impl Into<PathBuf>) -> Self {
        let name = name.into();
        let kind = name
            .extension()
            .map(|ext| ext.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            id,
            name,
            kind,
            outputs: RwLock::default(),
        }
    }

    /// Adds an output for the specified target.
    #[must_use]
    pub fn with_output(self, target: impl Into<String>, output: impl Into<Output>) -> Self {
        self.set_output(target, output);
        self
    }

    /// Returns the asset identifier.
    pub fn id(&self) -> AssetId {
        self.id
    }

    /// Returns the path to the asset source.
    pub fn name(&self) -> &Path {
        &self.name
    }

    /// Returns the asset kind, i.e. the file extension without the leading dot.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Returns a copy of the output for the specified target.
    pub fn output(&self, target: &str) -> Option<Output> {
        self.outputs.read().get(target).cloned()
    }

    /// Sets the output for the specified target, replacing the previous one.
    pub fn set_output(&self, target: impl Into<String>, output: impl Into<Output>) {
        self.outputs.write().insert(target.into(), output.into());
    }
}

/// Process-wide unique identifier of a [`Bundle`] object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BundleId(u64);

impl BundleId {
    fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

/// Compilation unit with directly owned assets and child bundles.
///
/// Assets and child bundles are shared, so a single child may be attached to several parents.
/// Children can be attached after the bundle is shared via [`Self::add_child()`], which also
/// allows bundle graphs with cycles.
#[derive(Debug)]
pub struct Bundle {
    id: BundleId,
    kind: String,
    entry_asset: Option<Arc<Asset>>,
    assets: Vec<Arc<Asset>>,
    child_bundles: RwLock<Vec<Arc<Bundle>>>,
}

impl Bundle {
    /// Creates an empty bundle of the specified kind (e.g., `js` or `ttf`).
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            id: BundleId::next(),
            kind: kind.into(),
            entry_asset: None,
            assets: vec![],
            child_bundles: RwLock::default(),
        }
    }

    /// Sets the entry asset of this bundle. The entry asset is also owned by the bundle.
    #[must_use]
    pub fn with_entry_asset(mut self, asset: Arc<Asset>) -> Self {
        if !self.assets.iter().any(|owned| owned.id == asset.id) {
            self.assets.push(asset.clone());
        }
        self.entry_asset = Some(asset);
        self
    }

    /// Adds an asset directly owned by this bundle.
    #[must_use]
    pub fn with_asset(mut self, asset: Arc<Asset>) -> Self {
        self.assets.push(asset);
        self
    }

    /// Adds a child bundle.
    #[must_use]
    pub fn with_child(self, child: Arc<Bundle>) -> Self {
        self.add_child(child);
        self
    }

    /// Attaches a child bundle to a possibly shared bundle.
    pub fn add_child(&self, child: Arc<Bundle>) {
        self.child_bundles.write().push(child);
    }

    /// Returns the identifier of this bundle object.
    pub fn id(&self) -> BundleId {
        self.id
    }

    /// Returns the bundle kind.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Returns the entry asset, if any.
    pub fn entry_asset(&self) -> Option<&Arc<Asset>> {
        self.entry_asset.as_ref()
    }

    /// Returns assets directly owned by this bundle.
    pub fn assets(&self) -> &[Arc<Asset>] {
        &self.assets
    }

    /// Returns a snapshot of child bundles in the order they were attached.
    pub fn child_bundles(&self) -> Vec<Arc<Bundle>> {
        self.child_bundles.read().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn asset_kind_is_file_extension() {
        let asset = Asset::new(AssetId::new(1), "fonts/icon.woff2");
        assert_eq!(asset.kind(), "woff2");
        assert_eq!(asset.name(), Path::new("fonts/icon.woff2"));

        let asset = Asset::new(AssetId::new(2), "LICENSE");
        assert_eq!(asset.kind(), "");
    }

    #[test]
    fn asset_outputs_can_be_replaced() {
        let asset = Asset::new(AssetId::new(1), "styles.css").with_output("css", "a { }");
        assert_eq!(asset.output("css").unwrap().as_text(), Some("a { }"));
        assert_eq!(asset.output("js"), None);

        asset.set_output("css", vec![1_u8, 2, 3]);
        assert_eq!(asset.output("css"), Some(Output::Bytes(vec![1, 2, 3].into())));
    }

    #[test]
    fn bundle_ids_are_unique() {
        let first = Bundle::new("js");
        let second = Bundle::new("js");
        assert_ne!(first.id(), second.id());
    }

    #[test]
    fn entry_asset_is_owned_once() {
        let entry = Arc::new(Asset::new(AssetId::new(1), "index.js"));
        let bundle = Bundle::new("js")
            .with_entry_asset(entry.clone())
            .with_entry_asset(entry);
        assert_eq!(bundle.assets().len(), 1);
        assert_eq!(bundle.entry_asset().unwrap().id(), AssetId::new(1));
    }
}
