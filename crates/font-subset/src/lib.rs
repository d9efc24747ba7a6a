//! OpenType font subsetting.
//!
//! A [`Font`] with TrueType outlines is parsed from its binary representation, reduced to a
//! [`FontSubset`] containing only glyphs reachable from a set of chars, and serialized to one
//! of the supported containers:
//!
//! - OpenType / TrueType (`.ttf`) via [`FontSubset::to_truetype()`]
//! - WOFF 1.0 (`.woff`) via [`FontSubset::to_woff()`]
//! - WOFF2 (`.woff2`) via [`FontSubset::to_woff2()`]
//! - Embedded OpenType (`.eot`) via [`FontSubset::to_eot()`]
//! - SVG font (`.svg`) via [`FontSubset::to_svg()`]
//!
//! Already serialized TrueType fonts can be re-encoded as WOFF2 with [`compress_woff2()`].
//!
//! # Examples
//!
//! ```
//! use font_subset::{Font, FontSubset};
//! # use std::collections::BTreeSet;
//!
//! # fn main() -> Result<(), font_subset::ParseError> {
//! let bytes = include_bytes!("../fonts/DejaVuSansMono.ttf");
//! let font = Font::new(bytes)?;
//! let chars: BTreeSet<char> = "Hello, world!".chars().collect();
//! let subset = FontSubset::new(font, &chars)?;
//! assert!(subset.glyph_count() <= chars.len() + 1);
//!
//! let ttf = subset.to_truetype();
//! assert!(ttf.len() < bytes.len());
//! let woff2 = font_subset::compress_woff2(&ttf)?;
//! assert_eq!(woff2, subset.to_woff2());
//! # Ok(())
//! # }
//! ```

// Documentation settings
#![doc(html_root_url = "https://docs.rs/font-subset/0.1.0")]

mod errors;
mod font;
mod subset;
#[cfg(test)]
pub(crate) mod tests;
mod write;

pub use crate::{
    errors::{MapError, ParseError, ParseErrorKind},
    font::{Font, TableTag},
    subset::FontSubset,
    write::compress_woff2,
};

#[cfg(doctest)]
doc_comment::doctest!("../README.md");
