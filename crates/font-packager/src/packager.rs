//! Packaging hook for the host bundler.

use std::{fmt, path::Path, sync::Arc};

use crate::{
    asset::{Asset, Bundle, Output},
    cache::CompilationCache,
    config::PackagerConfig,
    error::PackagerError,
    minify::{MinifiedFontMap, Minifier},
    storage::{FsStorage, Storage},
};

/// Handler producing the packaged output of an asset.
pub trait AssetHandler {
    /// Returns the output of `asset` for the `target` representation (e.g., `woff2`).
    /// The returned output is never a path reference.
    ///
    /// # Errors
    ///
    /// Returns an error if the output cannot be obtained.
    fn handle_asset(&self, asset: &Asset, target: &str) -> Result<Output, PackagerError>;
}

/// Default [`AssetHandler`] returning generated asset outputs as is.
///
/// Path references and missing outputs are resolved by reading from storage.
#[derive(Clone)]
pub struct RawPackager {
    storage: Arc<dyn Storage>,
}

impl fmt::Debug for RawPackager {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.debug_struct("RawPackager").finish_non_exhaustive()
    }
}

impl Default for RawPackager {
    fn default() -> Self {
        Self::new(FsStorage)
    }
}

impl RawPackager {
    /// Creates a packager reading from the specified storage.
    pub fn new(storage: impl Storage + 'static) -> Self {
        Self {
            storage: Arc::new(storage),
        }
    }

    fn read(&self, path: &Path) -> Result<Output, PackagerError> {
        let bytes = self.storage.read(path).map_err(|source| PackagerError::Storage {
            path: path.to_owned(),
            source,
        })?;
        Ok(Output::Bytes(bytes.into()))
    }
}

impl AssetHandler for RawPackager {
    fn handle_asset(&self, asset: &Asset, target: &str) -> Result<Output, PackagerError> {
        match asset.output(target) {
            Some(Output::Path(path)) => self.read(&path),
            Some(output) => Ok(output),
            None => self.read(asset.name()),
        }
    }
}

/// Collaborator removing unused rules from style sheets of a bundle, e.g. by rewriting
/// `css` outputs of its assets via [`Asset::set_output()`].
pub trait CssStripper: Send + Sync {
    /// Strips unused CSS rules from assets reachable from `bundle`.
    ///
    /// # Errors
    ///
    /// Returns an error if stripping fails.
    fn strip_unused(&self, bundle: &Bundle) -> Result<(), PackagerError>;
}

/// [`CssStripper`] that leaves style sheets intact.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopCssStripper;

impl CssStripper for NoopCssStripper {
    fn strip_unused(&self, _bundle: &Bundle) -> Result<(), PackagerError> {
        Ok(())
    }
}

/// [`AssetHandler`] replacing font assets with their minified versions and delegating
/// to the inner handler.
///
/// Fonts are minified only in production mode (see [`PackagerConfig`]); otherwise, all assets
/// are passed to the inner handler unmodified. Minified fonts are computed once for the main
/// bundle and stored in the [`CompilationCache`], which can be shared among packagers of a single
/// compilation.
pub struct FontPackager<H = RawPackager> {
    main_bundle: Arc<Bundle>,
    config: PackagerConfig,
    cache: Arc<CompilationCache>,
    minifier: Minifier,
    css_stripper: Arc<dyn CssStripper>,
    inner: H,
}

impl<H: fmt::Debug> fmt::Debug for FontPackager<H> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("FontPackager")
            .field("main_bundle", &self.main_bundle.id())
            .field("config", &self.config)
            .field("minifier", &self.minifier)
            .field("inner", &self.inner)
            .finish_non_exhaustive()
    }
}

impl FontPackager {
    /// Creates a packager for the main bundle of a compilation. The packager uses
    /// the default engines and a [`RawPackager`] as the inner handler.
    pub fn new(main_bundle: Arc<Bundle>, config: PackagerConfig) -> Self {
        Self {
            main_bundle,
            config,
            cache: Arc::default(),
            minifier: Minifier::default(),
            css_stripper: Arc::new(NoopCssStripper),
            inner: RawPackager::default(),
        }
    }
}

impl<H: AssetHandler> FontPackager<H> {
    /// Sets the cache of pipeline results.
    #[must_use]
    pub fn with_cache(mut self, cache: Arc<CompilationCache>) -> Self {
        self.cache = cache;
        self
    }

    /// Sets the minification collaborators.
    #[must_use]
    pub fn with_minifier(mut self, minifier: Minifier) -> Self {
        self.minifier = minifier;
        self
    }

    /// Sets the CSS stripper invoked before fonts are minified.
    #[must_use]
    pub fn with_css_stripper(mut self, stripper: impl CssStripper + 'static) -> Self {
        self.css_stripper = Arc::new(stripper);
        self
    }

    /// Replaces the inner handler.
    pub fn with_inner<T: AssetHandler>(self, inner: T) -> FontPackager<T> {
        FontPackager {
            main_bundle: self.main_bundle,
            config: self.config,
            cache: self.cache,
            minifier: self.minifier,
            css_stripper: self.css_stripper,
            inner,
        }
    }

    /// Returns minified fonts for the main bundle, computing them if necessary.
    ///
    /// # Errors
    ///
    /// Returns an error if stripping CSS, reading or minifying fonts fails.
    pub fn minified_fonts(&self) -> Result<Arc<MinifiedFontMap>, PackagerError> {
        let bundle = &self.main_bundle;
        self.cache
            .traverse_and_minify_with(bundle, &self.minifier, || {
                self.css_stripper.strip_unused(bundle)
            })
    }
}

impl<H: AssetHandler> AssetHandler for FontPackager<H> {
    fn handle_asset(&self, asset: &Asset, target: &str) -> Result<Output, PackagerError> {
        if self.config.production {
            let fonts = self.minified_fonts()?;
            if let Some(bytes) = fonts.get(&asset.id()) {
                log::trace!("Replacing `{}` with minified font", asset.name().display());
                asset.set_output(target, Output::Bytes(bytes.clone()));
            }
        }
        self.inner.handle_asset(asset, target)
    }
}
