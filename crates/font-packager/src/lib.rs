//! Bundler packaging hook minifying web fonts to glyphs referenced by compiled assets.
//!
//! The hook targets icon fonts: style sheets, scripts and markup reference glyphs via CSS
//! `content` escapes such as `content: '\e001'`, and font files of the same family are shipped
//! in several formats (`icon.ttf`, `icon.woff`, `icon.woff2`, ...). In production builds,
//! [`FontPackager`]
//!
//! 1. Collects all assets reachable from the main bundle ([`collect_all_assets()`]).
//! 2. Extracts referenced glyphs from their textual outputs ([`find_glyphs()`]).
//! 3. Groups font assets by family ([`find_font_groups()`]).
//! 4. Subsets the TrueType master of each group and re-encodes it to the formats present
//!    in the group ([`Minifier`]).
//!
//! Results are computed once per bundle object and stored in a [`CompilationCache`].
//!
//! # Examples
//!
//! ```
//! use font_packager::{
//!     Asset, AssetHandler, AssetId, Bundle, FontPackager, Output, PackagerConfig,
//! };
//! use std::sync::Arc;
//!
//! # fn main() -> Result<(), font_packager::PackagerError> {
//! let font_bytes = include_bytes!("../../font-subset/fonts/DejaVuSansMono.ttf");
//! let styles = Asset::new(AssetId::new(1), "styles.css")
//!     .with_output("css", r".heart::before { content: '\2665'; }");
//! let font = Asset::new(AssetId::new(2), "icon.ttf").with_output("ttf", font_bytes.to_vec());
//! let font = Arc::new(font);
//! let bundle = Bundle::new("css")
//!     .with_entry_asset(Arc::new(styles))
//!     .with_asset(font.clone());
//!
//! let packager = FontPackager::new(Arc::new(bundle), PackagerConfig::production());
//! let Output::Bytes(minified) = packager.handle_asset(&font, "ttf")? else {
//!     unreachable!();
//! };
//! assert!(minified.len() < font_bytes.len());
//! # Ok(())
//! # }
//! ```

// Documentation settings
#![doc(html_root_url = "https://docs.rs/font-packager/0.1.0")]

mod asset;
mod cache;
mod config;
mod engine;
mod error;
mod glyphs;
mod groups;
mod minify;
mod packager;
mod storage;
#[cfg(test)]
pub(crate) mod tests;
mod walker;

pub use crate::{
    asset::{Asset, AssetId, Bundle, BundleId, Output},
    cache::CompilationCache,
    config::PackagerConfig,
    engine::{FontSubsetEngine, MinifiedVariants, Subsetter, Woff2Compressor},
    error::{EngineError, PackagerError},
    glyphs::{extract_glyphs, find_glyphs, GlyphSet},
    groups::{find_font_groups, FontFormat, FontGroup, FontVariant, UnknownFontFormat},
    minify::{MinifiedFontMap, Minifier},
    packager::{AssetHandler, CssStripper, FontPackager, NoopCssStripper, RawPackager},
    storage::{FsStorage, Storage},
    walker::collect_all_assets,
};

#[cfg(doctest)]
doc_comment::doctest!("../README.md");
