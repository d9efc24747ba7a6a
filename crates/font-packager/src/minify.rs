//! Subsetting and re-encoding of font groups.

use std::{collections::HashMap, fmt, sync::Arc};

use crate::{
    asset::AssetId,
    engine::{FontSubsetEngine, Subsetter, Woff2Compressor},
    error::PackagerError,
    glyphs::GlyphSet,
    groups::{FontFormat, FontGroup},
    storage::{FsStorage, Storage},
};

/// Minified font bytes keyed by the asset they replace.
pub type MinifiedFontMap = HashMap<AssetId, Arc<[u8]>>;

/// Collaborators of the minification pipeline.
#[derive(Clone)]
pub struct Minifier {
    pub(crate) storage: Arc<dyn Storage>,
    subsetter: Arc<dyn Subsetter>,
    compressor: Arc<dyn Woff2Compressor>,
}

impl fmt::Debug for Minifier {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.debug_struct("Minifier").finish_non_exhaustive()
    }
}

impl Default for Minifier {
    fn default() -> Self {
        Self {
            storage: Arc::new(FsStorage),
            subsetter: Arc::new(FontSubsetEngine),
            compressor: Arc::new(FontSubsetEngine),
        }
    }
}

impl Minifier {
    /// Sets the storage used to read font bytes not materialized in memory.
    #[must_use]
    pub fn with_storage(mut self, storage: impl Storage + 'static) -> Self {
        self.storage = Arc::new(storage);
        self
    }

    /// Sets the subsetting engine.
    #[must_use]
    pub fn with_subsetter(mut self, subsetter: impl Subsetter + 'static) -> Self {
        self.subsetter = Arc::new(subsetter);
        self
    }

    /// Sets the WOFF2 compression engine.
    #[must_use]
    pub fn with_woff2_compressor(mut self, compressor: impl Woff2Compressor + 'static) -> Self {
        self.compressor = Arc::new(compressor);
        self
    }

    /// Minifies font groups, one after another, to the glyph set.
    ///
    /// Groups without a TrueType master are skipped. WOFF2 variants are always derived from
    /// the minified TrueType variant, and only for groups containing a WOFF2 member. Group members
    /// in formats the subsetter does not produce get no entry in the returned map.
    ///
    /// # Errors
    ///
    /// Returns the first error produced by the engines.
    pub fn minify_groups(
        &self,
        glyphs: &GlyphSet,
        groups: &[FontGroup],
    ) -> Result<MinifiedFontMap, PackagerError> {
        let mut minified_fonts = MinifiedFontMap::new();
        for group in groups {
            let Some(master) = group.master() else {
                log::debug!("Skipping font family `{}` without TrueType master", group.family);
                continue;
            };

            let mut variants = self
                .subsetter
                .subset(&master.bytes, glyphs)
                .map_err(|source| PackagerError::Subset {
                    family: group.family.clone(),
                    source,
                })?;
            let ttf = variants
                .get(FontFormat::Ttf)
                .ok_or_else(|| PackagerError::MissingMasterOutput {
                    family: group.family.clone(),
                })?
                .clone();
            if group.has_format(FontFormat::Woff2) {
                let woff2 = self
                    .compressor
                    .compress(&ttf)
                    .map_err(|source| PackagerError::Compress {
                        family: group.family.clone(),
                        source,
                    })?;
                variants.insert(FontFormat::Woff2, woff2);
            } else {
                variants.remove(FontFormat::Woff2);
            }

            for variant in &group.variants {
                if let Some(bytes) = variants.get(variant.format) {
                    log::info!(
                        "Minified `{}`: {} -> {} bytes",
                        variant.asset.name().display(),
                        variant.bytes.len(),
                        bytes.len()
                    );
                    minified_fonts.insert(variant.asset.id(), bytes.clone());
                }
            }
        }
        Ok(minified_fonts)
    }
}
