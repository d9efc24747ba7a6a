//! Font engines used by the minification pipeline.

use std::{collections::HashMap, sync::Arc};

use font_subset::{Font, FontSubset};

use crate::{error::EngineError, glyphs::GlyphSet, groups::FontFormat};

/// Minified variants of a font family produced by a [`Subsetter`].
#[derive(Debug, Clone, Default)]
pub struct MinifiedVariants {
    variants: HashMap<FontFormat, Arc<[u8]>>,
}

impl MinifiedVariants {
    /// Adds a variant in the specified format.
    #[must_use]
    pub fn with(mut self, format: FontFormat, bytes: impl Into<Arc<[u8]>>) -> Self {
        self.insert(format, bytes);
        self
    }

    /// Inserts a variant, replacing the existing variant in the same format.
    pub fn insert(&mut self, format: FontFormat, bytes: impl Into<Arc<[u8]>>) {
        self.variants.insert(format, bytes.into());
    }

    /// Removes the variant in the specified format, returning it.
    pub fn remove(&mut self, format: FontFormat) -> Option<Arc<[u8]>> {
        self.variants.remove(&format)
    }

    /// Returns the variant in the specified format.
    pub fn get(&self, format: FontFormat) -> Option<&Arc<[u8]>> {
        self.variants.get(&format)
    }

    /// Iterates over formats of contained variants in no particular order.
    pub fn formats(&self) -> impl Iterator<Item = FontFormat> + '_ {
        self.variants.keys().copied()
    }
}

/// Engine subsetting TrueType fonts.
pub trait Subsetter: Send + Sync {
    /// Subsets the TrueType `master` font to the glyph set. The returned variants must include
    /// the TrueType variant; other formats are optional.
    ///
    /// # Errors
    ///
    /// Returns an error if the font is malformed or cannot be subsetted.
    fn subset(&self, master: &[u8], glyphs: &GlyphSet) -> Result<MinifiedVariants, EngineError>;
}

/// Engine compressing TrueType fonts to WOFF2.
pub trait Woff2Compressor: Send + Sync {
    /// Compresses a TrueType font to WOFF2 without changing its tables.
    ///
    /// # Errors
    ///
    /// Returns an error if the font is malformed.
    fn compress(&self, ttf: &[u8]) -> Result<Vec<u8>, EngineError>;
}

/// Default engine backed by the [`font_subset`] crate.
///
/// As a [`Subsetter`], it produces TrueType, WOFF, EOT and SVG variants.
#[derive(Debug, Clone, Copy, Default)]
pub struct FontSubsetEngine;

impl Subsetter for FontSubsetEngine {
    fn subset(&self, master: &[u8], glyphs: &GlyphSet) -> Result<MinifiedVariants, EngineError> {
        let font = Font::new(master)?;
        let subset = FontSubset::new(font, glyphs)?;
        log::trace!(
            "Subset retains {} glyphs for {} chars",
            subset.glyph_count(),
            subset.chars().count()
        );
        Ok(MinifiedVariants::default()
            .with(FontFormat::Ttf, subset.to_truetype())
            .with(FontFormat::Woff, subset.to_woff())
            .with(FontFormat::Eot, subset.to_eot())
            .with(FontFormat::Svg, subset.to_svg()?.into_bytes()))
    }
}

impl Woff2Compressor for FontSubsetEngine {
    fn compress(&self, ttf: &[u8]) -> Result<Vec<u8>, EngineError> {
        Ok(font_subset::compress_woff2(ttf)?)
    }
}
