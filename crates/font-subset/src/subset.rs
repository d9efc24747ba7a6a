use std::collections::{BTreeMap, BTreeSet};

use crate::{
    font::{Font, GlyphWithMetrics},
    MapError, ParseError,
};

/// Subset of a [`Font`] produced by removing all glyphs not reachable from the retained chars.
///
/// Chars the font has no glyph for are dropped from the subset. The missing glyph (#0) is always
/// retained.
#[derive(Debug)]
pub struct FontSubset<'a> {
    pub(crate) font: Font<'a>,
    /// Sorted by char.
    pub(crate) char_map: Vec<(char, u16)>,
    pub(crate) old_to_new_glyph_idx: BTreeMap<u16, u16>,
    pub(crate) glyphs: Vec<GlyphWithMetrics<'a>>,
}

impl<'a> FontSubset<'a> {
    /// Creates a subset of the `font` retaining the specified chars.
    ///
    /// # Errors
    ///
    /// Returns an error if the glyph data required for the subset is malformed.
    pub fn new(font: Font<'a>, chars: &BTreeSet<char>) -> Result<Self, ParseError> {
        let mut this = Self::empty(font)?;
        for &ch in chars {
            this.push_char(ch)?;
        }
        Ok(this)
    }

    fn empty(font: Font<'a>) -> Result<Self, ParseError> {
        let missing_glyph = font.glyph(0)?;
        Ok(Self {
            font,
            char_map: vec![],
            old_to_new_glyph_idx: BTreeMap::from([(0, 0)]),
            glyphs: vec![missing_glyph],
        })
    }

    /// Returns the number of glyphs in this subset, including the missing glyph.
    pub fn glyph_count(&self) -> usize {
        self.glyphs.len()
    }

    /// Iterates over chars retained in this subset in the increasing order.
    pub fn chars(&self) -> impl Iterator<Item = char> + '_ {
        self.char_map.iter().map(|&(ch, _)| ch)
    }

    /// Adds a glyph to the subset without resolving its components.
    fn push_glyph(&mut self, old_idx: u16) -> Result<u16, ParseError> {
        let glyph = self.font.glyph(old_idx)?;
        // The subset cannot have more glyphs than the original font, which has at most `u16::MAX`.
        let new_idx = u16::try_from(self.glyphs.len()).expect("too many glyphs");
        self.glyphs.push(glyph);
        self.old_to_new_glyph_idx.insert(old_idx, new_idx);
        Ok(new_idx)
    }

    /// Adds a glyph together with all glyphs it (transitively) references as components.
    fn ensure_glyph(&mut self, old_idx: u16) -> Result<u16, ParseError> {
        if let Some(&new_idx) = self.old_to_new_glyph_idx.get(&old_idx) {
            return Ok(new_idx);
        }

        let first_added = self.glyphs.len();
        let new_idx = self.push_glyph(old_idx)?;
        let mut unresolved = first_added;
        while unresolved < self.glyphs.len() {
            let components: Vec<_> = self.glyphs[unresolved].inner.component_indices().collect();
            for component_idx in components {
                if !self.old_to_new_glyph_idx.contains_key(&component_idx) {
                    self.push_glyph(component_idx)?;
                }
            }
            unresolved += 1;
        }

        let glyph_map = &self.old_to_new_glyph_idx;
        for glyph in &mut self.glyphs[first_added..] {
            glyph.inner.remap_components(|idx| glyph_map[&idx]);
        }
        Ok(new_idx)
    }

    /// Must be called with increasing `ch`.
    fn push_char(&mut self, ch: char) -> Result<(), ParseError> {
        let old_idx = match self.font.map_char(ch) {
            Ok(0) | Err(MapError::CharTooLarge) => return Ok(()), // the font has no glyph for `ch`
            Ok(idx) => idx,
            Err(err) => return Err(err.into()),
        };
        let new_idx = self.ensure_glyph(old_idx)?;
        self.char_map.push((ch, new_idx));
        Ok(())
    }
}
