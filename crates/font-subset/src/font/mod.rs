//! OpenType parsing logic.

use core::{fmt, ops};

pub(crate) use self::{
    cmap::{CmapTable, SegmentDeltas, SegmentWithDelta, SegmentedCoverage, SequentialMapGroup},
    glyph::{simple_glyph_contours, Glyph, GlyphWithMetrics, OutlinePoint, Transform},
};
use crate::{
    errors::{MapError, ParseErrorKind},
    ParseError,
};

mod cmap;
mod glyph;

/// Four-byte tag identifying an OpenType table, e.g. `glyf`.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TableTag(pub(crate) [u8; 4]);

impl fmt::Debug for TableTag {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "TableTag({self})")
    }
}

impl fmt::Display for TableTag {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}", self.0.escape_ascii())
    }
}

#[allow(missing_docs)] // self-explanatory
impl TableTag {
    pub const CMAP: Self = Self(*b"cmap");
    pub const CVT: Self = Self(*b"cvt ");
    pub const FPGM: Self = Self(*b"fpgm");
    pub const GLYF: Self = Self(*b"glyf");
    pub const HEAD: Self = Self(*b"head");
    pub const HHEA: Self = Self(*b"hhea");
    pub const HMTX: Self = Self(*b"hmtx");
    pub const LOCA: Self = Self(*b"loca");
    pub const MAXP: Self = Self(*b"maxp");
    pub const NAME: Self = Self(*b"name");
    pub const OS2: Self = Self(*b"OS/2");
    pub const POST: Self = Self(*b"post");
    pub const PREP: Self = Self(*b"prep");
}

impl TableTag {
    /// Creates a tag from its raw bytes.
    pub const fn new(bytes: [u8; 4]) -> Self {
        Self(bytes)
    }

    /// Returns raw bytes of this tag.
    pub const fn to_bytes(self) -> [u8; 4] {
        self.0
    }
}

/// Read-only view into font data that tracks the absolute offset and the table being read,
/// so that errors point to the failing place.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Cursor<'a> {
    pub(crate) bytes: &'a [u8],
    offset: usize,
    table: Option<TableTag>,
}

impl<'a> Cursor<'a> {
    pub(crate) fn new(bytes: &'a [u8]) -> Self {
        Self {
            bytes,
            offset: 0,
            table: None,
        }
    }

    fn for_table(mut self, tag: TableTag) -> Self {
        self.table = Some(tag);
        self
    }

    pub(crate) fn err(&self, kind: ParseErrorKind) -> ParseError {
        ParseError {
            kind,
            offset: self.offset,
            table: self.table,
        }
    }

    pub(crate) fn skip(&mut self, len: usize) -> Result<(), ParseError> {
        if self.bytes.len() < len {
            return Err(self.err(ParseErrorKind::UnexpectedEof));
        }
        self.bytes = &self.bytes[len..];
        self.offset += len;
        Ok(())
    }

    /// Returns a cursor over `range` relative to the current position; `self` is not advanced.
    pub(crate) fn range(&self, range: ops::Range<usize>) -> Result<Self, ParseError> {
        let bytes = self.bytes.get(range.clone()).ok_or_else(|| {
            self.err(ParseErrorKind::RangeOutOfBounds {
                range: range.clone(),
                len: self.bytes.len(),
            })
        })?;
        Ok(Self {
            bytes,
            offset: self.offset + range.start,
            table: self.table,
        })
    }

    /// Splits off the first `len` bytes, advancing `self` past them.
    pub(crate) fn split_at(&mut self, len: usize) -> Result<Self, ParseError> {
        if self.bytes.len() < len {
            return Err(self.err(ParseErrorKind::UnexpectedEof));
        }
        let head = self.range(0..len)?;
        self.skip(len)?;
        Ok(head)
    }

    pub(crate) fn read_byte_array<const N: usize>(&mut self) -> Result<[u8; N], ParseError> {
        let head = self.split_at(N)?;
        let mut array = [0_u8; N];
        array.copy_from_slice(head.bytes);
        Ok(array)
    }

    pub(crate) fn read_u16(&mut self) -> Result<u16, ParseError> {
        self.read_byte_array().map(u16::from_be_bytes)
    }

    pub(crate) fn read_u32(&mut self) -> Result<u32, ParseError> {
        self.read_byte_array().map(u32::from_be_bytes)
    }

    pub(crate) fn read_u16_checked<T>(
        &mut self,
        check: impl FnOnce(u16) -> Result<T, ParseErrorKind>,
    ) -> Result<T, ParseError> {
        let start = *self;
        let value = self.read_u16()?;
        check(value).map_err(|kind| start.err(kind))
    }

    pub(crate) fn read_u32_checked<T>(
        &mut self,
        check: impl FnOnce(u32) -> Result<T, ParseErrorKind>,
    ) -> Result<T, ParseError> {
        let start = *self;
        let value = self.read_u32()?;
        check(value).map_err(|kind| start.err(kind))
    }
}

impl AsRef<[u8]> for Cursor<'_> {
    fn as_ref(&self) -> &[u8] {
        self.bytes
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct HheaTable<'a> {
    pub(crate) raw: &'a [u8],
    pub(crate) number_of_h_metrics: u16,
}

impl<'a> HheaTable<'a> {
    pub(crate) const EXPECTED_LEN: usize = 36; // 18 words

    fn parse(cursor: Cursor<'a>) -> Result<Self, ParseError> {
        if cursor.bytes.len() != Self::EXPECTED_LEN {
            return Err(cursor.err(ParseErrorKind::UnexpectedTableLen {
                expected: Self::EXPECTED_LEN,
                actual: cursor.bytes.len(),
            }));
        }
        let mut metrics_count = cursor.range(Self::EXPECTED_LEN - 2..Self::EXPECTED_LEN)?;
        Ok(Self {
            raw: cursor.bytes,
            number_of_h_metrics: metrics_count.read_u16()?,
        })
    }
}

#[derive(Debug)]
pub(crate) struct HmtxTable<'a> {
    cursor: Cursor<'a>,
    number_of_h_metrics: u16,
}

impl HmtxTable<'_> {
    fn advance_and_lsb(&self, glyph_idx: u16) -> Result<(u16, u16), ParseError> {
        if self.number_of_h_metrics == 0 {
            return Err(self.cursor.err(ParseErrorKind::UnexpectedTableLen {
                expected: 4,
                actual: 0,
            }));
        }

        if glyph_idx < self.number_of_h_metrics {
            let mut cursor = self.cursor;
            cursor.skip(usize::from(glyph_idx) * 4)?;
            Ok((cursor.read_u16()?, cursor.read_u16()?))
        } else {
            // Glyphs after `number_of_h_metrics` share the last advance.
            let mut cursor = self.cursor;
            cursor.skip(usize::from(self.number_of_h_metrics - 1) * 4)?;
            let advance = cursor.read_u16()?;

            let mut cursor = self.cursor;
            cursor.skip(
                usize::from(self.number_of_h_metrics) * 4
                    + usize::from(glyph_idx - self.number_of_h_metrics) * 2,
            )?;
            Ok((advance, cursor.read_u16()?))
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) enum LocaFormat {
    Short,
    Long,
}

impl LocaFormat {
    const fn bytes_per_offset(self) -> usize {
        match self {
            Self::Short => 2,
            Self::Long => 4,
        }
    }
}

#[derive(Debug)]
pub(crate) struct LocaTable<'a> {
    format: LocaFormat,
    cursor: Cursor<'a>,
}

impl<'a> LocaTable<'a> {
    fn new(format: LocaFormat, glyph_count: u16, cursor: Cursor<'a>) -> Result<Self, ParseError> {
        let expected_len = format.bytes_per_offset() * (usize::from(glyph_count) + 1);
        // Some fonts pad `loca` beyond the last offset, so only a shorter table is an error.
        if cursor.bytes.len() < expected_len {
            return Err(cursor.err(ParseErrorKind::UnexpectedTableLen {
                expected: expected_len,
                actual: cursor.bytes.len(),
            }));
        }
        Ok(Self { format, cursor })
    }

    fn glyph_range(&self, glyph_idx: u16) -> Result<ops::Range<usize>, ParseError> {
        let glyph_idx = usize::from(glyph_idx);
        let mut cursor = self.cursor;
        Ok(match self.format {
            LocaFormat::Short => {
                cursor.skip(glyph_idx * 2)?;
                let start_offset = usize::from(cursor.read_u16()?) * 2;
                let end_offset = usize::from(cursor.read_u16()?) * 2;
                start_offset..end_offset
            }
            LocaFormat::Long => {
                cursor.skip(glyph_idx * 4)?;
                let start_offset = cursor.read_u32()? as usize;
                let end_offset = cursor.read_u32()? as usize;
                start_offset..end_offset
            }
        })
    }
}

/// OpenType font with TrueType outlines (i.e., with the `glyf` table).
#[derive(Debug)]
pub struct Font<'a> {
    pub(crate) cmap: CmapTable<'a>,
    pub(crate) head: &'a [u8],
    pub(crate) hhea: HheaTable<'a>,
    pub(crate) hmtx: HmtxTable<'a>,
    pub(crate) maxp: &'a [u8],
    pub(crate) name: &'a [u8],
    pub(crate) os2: &'a [u8],
    pub(crate) post: &'a [u8],
    pub(crate) loca: LocaTable<'a>,
    pub(crate) glyf: Cursor<'a>,
    pub(crate) cvt: Option<&'a [u8]>,
    pub(crate) fpgm: Option<&'a [u8]>,
    pub(crate) prep: Option<&'a [u8]>,
    glyph_count: u16,
}

impl<'a> Font<'a> {
    pub(crate) const SFNT_VERSION: u32 = 0x_0001_0000;
    /// Version used by some Apple fonts with TrueType outlines.
    const APPLE_SFNT_VERSION: u32 = 0x_7472_7565; // "true"
    pub(crate) const SFNT_CHECKSUM: u32 = 0x_b1b0_afba;
    pub(crate) const HEAD_CHECKSUM_OFFSET: usize = 8;
    const HEAD_LEN: usize = 54;
    const POST_HEADER_LEN: usize = 32;

    /// Parses a font from the provided bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the font is malformed, or is not a TrueType-flavored OpenType font.
    pub fn new(bytes: &'a [u8]) -> Result<Self, ParseError> {
        let font_cursor = Cursor::new(bytes);
        let mut cursor = font_cursor;
        cursor.read_u32_checked(|version| {
            if version != Self::SFNT_VERSION && version != Self::APPLE_SFNT_VERSION {
                return Err(ParseErrorKind::UnexpectedFontVersion(version));
            }
            Ok(())
        })?;
        let table_count = cursor.read_u16()?;
        cursor.skip(6)?; // searchRange, entrySelector, rangeShift

        let mut tables = TableSet::default();
        for _ in 0..table_count {
            let tag = TableTag(cursor.read_byte_array()?);
            cursor.skip(4)?; // checksum
            let offset = cursor.read_u32()? as usize;
            let len = cursor.read_u32()? as usize;
            let table = font_cursor.range(offset..offset + len)?.for_table(tag);
            tables.insert(tag, table);
        }

        let head = tables.require(TableTag::HEAD)?;
        let loca_format = Self::parse_loca_format(head)?;
        let maxp = tables.require(TableTag::MAXP)?;
        let glyph_count = Self::parse_glyph_count(maxp)?;
        let loca = LocaTable::new(loca_format, glyph_count, tables.require(TableTag::LOCA)?)?;
        let hhea = HheaTable::parse(tables.require(TableTag::HHEA)?)?;
        let hmtx = HmtxTable {
            cursor: tables.require(TableTag::HMTX)?,
            number_of_h_metrics: hhea.number_of_h_metrics,
        };

        let post = tables.require(TableTag::POST)?;
        if post.bytes.len() < Self::POST_HEADER_LEN {
            return Err(post.err(ParseErrorKind::UnexpectedTableLen {
                expected: Self::POST_HEADER_LEN,
                actual: post.bytes.len(),
            }));
        }

        Ok(Self {
            cmap: CmapTable::parse(tables.require(TableTag::CMAP)?)?,
            head: head.bytes,
            hhea,
            hmtx,
            maxp: maxp.bytes,
            name: tables.require(TableTag::NAME)?.bytes,
            os2: tables.require(TableTag::OS2)?.bytes,
            post: post.bytes,
            loca,
            glyf: tables.require(TableTag::GLYF)?,
            cvt: tables.cvt.map(|cursor| cursor.bytes),
            fpgm: tables.fpgm.map(|cursor| cursor.bytes),
            prep: tables.prep.map(|cursor| cursor.bytes),
            glyph_count,
        })
    }

    fn parse_loca_format(head: Cursor<'_>) -> Result<LocaFormat, ParseError> {
        const LOCA_FORMAT_OFFSET: usize = 50;

        if head.bytes.len() != Self::HEAD_LEN {
            return Err(head.err(ParseErrorKind::UnexpectedTableLen {
                expected: Self::HEAD_LEN,
                actual: head.bytes.len(),
            }));
        }
        let mut cursor = head;
        cursor.read_u32_checked(|version| {
            if version != 0x_0001_0000 {
                return Err(ParseErrorKind::UnexpectedTableVersion { version });
            }
            Ok(())
        })?;
        cursor.skip(LOCA_FORMAT_OFFSET - 4)?;
        // ^ fontRevision, checksumAdjustment, magicNumber, flags, unitsPerEm, created, modified,
        // bounding box, macStyle, lowestRecPPEM, fontDirectionHint

        cursor.read_u16_checked(|format| match format {
            0 => Ok(LocaFormat::Short),
            1 => Ok(LocaFormat::Long),
            _ => Err(ParseErrorKind::UnexpectedTableFormat { format }),
        })
    }

    fn parse_glyph_count(maxp: Cursor<'_>) -> Result<u16, ParseError> {
        let mut cursor = maxp;
        cursor.read_u32_checked(|version| {
            if version != 0x_0000_5000 && version != 0x_0001_0000 {
                return Err(ParseErrorKind::UnexpectedTableVersion { version });
            }
            Ok(())
        })?;
        cursor.read_u16()
    }

    /// Returns the number of glyphs in this font.
    pub fn glyph_count(&self) -> u16 {
        self.glyph_count
    }

    /// Maps the char to a glyph index. Returns 0 (the missing glyph) if the font has no glyph
    /// for the char.
    ///
    /// # Errors
    ///
    /// Returns an error if the `cmap` table is malformed.
    pub fn map_char(&self, ch: char) -> Result<u16, MapError> {
        self.cmap.map_char(ch)
    }

    pub(crate) fn glyph(&self, glyph_idx: u16) -> Result<GlyphWithMetrics<'a>, ParseError> {
        let range = self.loca.glyph_range(glyph_idx)?;
        let inner = Glyph::new(self.glyf.range(range)?)?;
        let (advance, lsb) = self.hmtx.advance_and_lsb(glyph_idx)?;
        Ok(GlyphWithMetrics {
            inner,
            advance,
            lsb,
        })
    }

    /// Computes an OpenType checksum of the data, padding it with zeros to a 4-byte boundary.
    pub(crate) fn checksum(data: &[u8]) -> u32 {
        let mut chunks = data.chunks_exact(4);
        let mut checksum = (&mut chunks).fold(0_u32, |acc, chunk| {
            acc.wrapping_add(u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        });
        let remainder = chunks.remainder();
        if !remainder.is_empty() {
            let mut last_word = [0_u8; 4];
            last_word[..remainder.len()].copy_from_slice(remainder);
            checksum = checksum.wrapping_add(u32::from_be_bytes(last_word));
        }
        checksum
    }
}

/// Tables collected from the font directory before they are parsed.
#[derive(Debug, Default)]
struct TableSet<'a> {
    required: Vec<(TableTag, Cursor<'a>)>,
    cvt: Option<Cursor<'a>>,
    fpgm: Option<Cursor<'a>>,
    prep: Option<Cursor<'a>>,
}

impl<'a> TableSet<'a> {
    fn insert(&mut self, tag: TableTag, table: Cursor<'a>) {
        match tag {
            TableTag::CVT => self.cvt = Some(table),
            TableTag::FPGM => self.fpgm = Some(table),
            TableTag::PREP => self.prep = Some(table),
            TableTag::CMAP
            | TableTag::GLYF
            | TableTag::HEAD
            | TableTag::HHEA
            | TableTag::HMTX
            | TableTag::LOCA
            | TableTag::MAXP
            | TableTag::NAME
            | TableTag::OS2
            | TableTag::POST => self.required.push((tag, table)),
            _ => { /* not needed for subsetting */ }
        }
    }

    fn require(&self, tag: TableTag) -> Result<Cursor<'a>, ParseError> {
        self.required
            .iter()
            .find_map(|(table_tag, cursor)| (*table_tag == tag).then_some(*cursor))
            .ok_or_else(|| ParseError::missing_table(tag))
    }
}
