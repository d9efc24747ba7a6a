//! Memoization of pipeline results per bundle.

use std::{
    collections::HashMap,
    sync::{Arc, OnceLock},
};

use parking_lot::Mutex;

use crate::{
    asset::{Asset, Bundle, BundleId},
    error::PackagerError,
    glyphs::{self, GlyphSet},
    groups::{self, FontGroup},
    minify::{MinifiedFontMap, Minifier},
    walker,
};

#[derive(Debug, Default)]
struct CacheEntry {
    assets: OnceLock<Arc<[Arc<Asset>]>>,
    glyphs: OnceLock<Arc<GlyphSet>>,
    /// Locked for the entire minification, so that it runs at most once.
    minified_fonts: Mutex<Option<Arc<MinifiedFontMap>>>,
}

/// Cache of pipeline results keyed by the bundle identity.
///
/// Results for a bundle are computed at most once per bundle object, no matter how many times
/// they are requested. A new bundle object (e.g., one produced by a rebuild) always gets
/// fresh results.
///
/// Entries are never evicted automatically. An entry holds the collected asset list of its
/// bundle, and thus the assets themselves, until [`Self::forget()`] is called for the bundle
/// or the cache is dropped. Long-running hosts (e.g., watch mode) should forget bundles
/// superseded by a rebuild.
#[derive(Debug, Default)]
pub struct CompilationCache {
    entries: Mutex<HashMap<BundleId, Arc<CacheEntry>>>,
}

impl CompilationCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    fn entry(&self, bundle: &Bundle) -> Arc<CacheEntry> {
        self.entries
            .lock()
            .entry(bundle.id())
            .or_default()
            .clone()
    }

    /// Returns all assets reachable from `root`.
    /// See [`collect_all_assets()`](crate::collect_all_assets()).
    pub fn collect_all_assets(&self, root: &Bundle) -> Arc<[Arc<Asset>]> {
        self.entry(root)
            .assets
            .get_or_init(|| walker::collect_all_assets(root).into())
            .clone()
    }

    /// Returns glyphs referenced from assets reachable from `root`.
    /// See [`find_glyphs()`](crate::find_glyphs()).
    pub fn find_glyphs(&self, root: &Bundle) -> Arc<GlyphSet> {
        let entry = self.entry(root);
        entry
            .glyphs
            .get_or_init(|| {
                let assets = self.collect_all_assets(root);
                Arc::new(glyphs::find_glyphs(&assets))
            })
            .clone()
    }

    /// Groups font assets reachable from `root`. Unlike other results, groups are not memoized
    /// since they hold unminified font bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if reading font bytes fails.
    pub fn find_font_groups(
        &self,
        root: &Bundle,
        minifier: &Minifier,
    ) -> Result<Vec<FontGroup>, PackagerError> {
        let assets = self.collect_all_assets(root);
        groups::find_font_groups(&assets, minifier.storage.as_ref())
    }

    /// Returns minified fonts for assets reachable from `root`, computing them on the first call.
    ///
    /// Concurrent callers for the same bundle wait until the first one completes. If the
    /// computation fails, nothing is cached and the next call retries.
    ///
    /// # Errors
    ///
    /// Returns an error if grouping or minifying fonts fails.
    pub fn traverse_and_minify(
        &self,
        root: &Bundle,
        minifier: &Minifier,
    ) -> Result<Arc<MinifiedFontMap>, PackagerError> {
        self.traverse_and_minify_with(root, minifier, || Ok(()))
    }

    /// Same as [`Self::traverse_and_minify()`], but runs `before_minification` right before
    /// the minified fonts are computed (i.e., at most once per successful computation).
    pub(crate) fn traverse_and_minify_with(
        &self,
        root: &Bundle,
        minifier: &Minifier,
        before_minification: impl FnOnce() -> Result<(), PackagerError>,
    ) -> Result<Arc<MinifiedFontMap>, PackagerError> {
        let entry = self.entry(root);
        let mut minified_fonts = entry.minified_fonts.lock();
        if let Some(fonts) = &*minified_fonts {
            log::trace!("Using cached minified fonts for bundle {:?}", root.id());
            return Ok(fonts.clone());
        }

        before_minification()?;
        let glyphs = self.find_glyphs(root);
        let groups = self.find_font_groups(root, minifier)?;
        let fonts = Arc::new(minifier.minify_groups(&glyphs, &groups)?);
        log::debug!(
            "Minified {} font assets for bundle {:?}",
            fonts.len(),
            root.id()
        );
        *minified_fonts = Some(fonts.clone());
        Ok(fonts)
    }

    /// Drops cached results for the bundle, releasing the assets collected for it.
    pub fn forget(&self, bundle: &Bundle) {
        self.entries.lock().remove(&bundle.id());
    }
}
