//! `cmap` table processing.

use super::Cursor;
use crate::{
    errors::{MapError, ParseErrorKind},
    ParseError,
};

fn read_u16_array(cursor: &mut Cursor<'_>, len: usize) -> Result<Vec<u16>, ParseError> {
    (0..len).map(|_| cursor.read_u16()).collect()
}

fn expect_format(cursor: &mut Cursor<'_>, expected: u16) -> Result<(), ParseError> {
    cursor.read_u16_checked(|format| {
        if format == expected {
            Ok(())
        } else {
            Err(ParseErrorKind::UnexpectedTableFormat { format })
        }
    })
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct SegmentWithDelta {
    pub(crate) start_code: u16,
    pub(crate) end_code: u16,
    pub(crate) id_delta: u16,
    pub(crate) id_range_offset: u16,
}

/// Segment mapping to delta values (format 4) subtable of the `cmap` table.
#[derive(Debug, Clone)]
pub(crate) struct SegmentDeltas<'a> {
    pub(crate) segments: Vec<SegmentWithDelta>,
    pub(crate) glyph_id_array: &'a [u8],
}

impl<'a> SegmentDeltas<'a> {
    const FORMAT: u16 = 4;

    fn parse(mut cursor: Cursor<'a>) -> Result<Self, ParseError> {
        expect_format(&mut cursor, Self::FORMAT)?;
        // `length` covers the entire subtable including `format` and `length` itself.
        let body_len = cursor.read_u16_checked(|len| {
            len.checked_sub(4)
                .map(usize::from)
                .ok_or(ParseErrorKind::UnexpectedEof)
        })?;
        cursor = cursor.range(0..body_len)?;
        cursor.skip(2)?; // language

        let segment_count = usize::from(cursor.read_u16()? / 2);
        cursor.skip(6)?; // searchRange, entrySelector, rangeShift
        let end_codes = read_u16_array(&mut cursor, segment_count)?;
        cursor.skip(2)?; // reservedPad
        let start_codes = read_u16_array(&mut cursor, segment_count)?;
        let id_deltas = read_u16_array(&mut cursor, segment_count)?;
        let id_range_offsets = read_u16_array(&mut cursor, segment_count)?;

        let segments = (0..segment_count)
            .map(|i| SegmentWithDelta {
                start_code: start_codes[i],
                end_code: end_codes[i],
                id_delta: id_deltas[i],
                id_range_offset: id_range_offsets[i],
            })
            .collect();
        Ok(Self {
            segments,
            glyph_id_array: cursor.bytes,
        })
    }

    /// Resolves a glyph ID via `glyphIdArray`. `idRangeOffset` is relative to the position
    /// of the offset itself in the `idRangeOffsets` array, which directly precedes the glyph IDs.
    fn lookup_glyph_id(
        &self,
        segment_idx: usize,
        segment: &SegmentWithDelta,
        code: u16,
    ) -> Result<u16, MapError> {
        let offset_from_ranges = 2 * segment_idx
            + usize::from(segment.id_range_offset)
            + 2 * usize::from(code - segment.start_code);
        let array_offset = offset_from_ranges
            .checked_sub(2 * self.segments.len())
            .ok_or(MapError::InvalidOffset)?;
        let Some(&[hi, lo]) = self.glyph_id_array.get(array_offset..array_offset + 2) else {
            return Err(MapError::InvalidOffset);
        };
        Ok(match u16::from_be_bytes([hi, lo]) {
            0 => 0,
            glyph_id => segment.id_delta.wrapping_add(glyph_id),
        })
    }

    fn map_char(&self, ch: char) -> Result<u16, MapError> {
        let code = u16::try_from(u32::from(ch)).map_err(|_| MapError::CharTooLarge)?;
        let segment_idx = self
            .segments
            .partition_point(|segment| segment.end_code < code);
        // Tables lacking the final 0xffff segment are tolerated.
        let Some(segment) = self.segments.get(segment_idx) else {
            return Ok(0);
        };
        if code < segment.start_code {
            Ok(0)
        } else if segment.id_range_offset == 0 {
            Ok(segment.id_delta.wrapping_add(code))
        } else {
            self.lookup_glyph_id(segment_idx, segment, code)
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct SequentialMapGroup {
    pub(crate) start_char_code: u32,
    pub(crate) end_char_code: u32,
    pub(crate) start_glyph_id: u32,
}

impl SequentialMapGroup {
    pub(crate) fn map_unchecked(&self, ch: char) -> u32 {
        u32::from(ch) - self.start_char_code + self.start_glyph_id
    }
}

/// Segmented coverage (format 12) subtable of the `cmap` table.
#[derive(Debug, Default, Clone)]
pub(crate) struct SegmentedCoverage {
    pub(crate) groups: Vec<SequentialMapGroup>,
}

impl SegmentedCoverage {
    const FORMAT: u16 = 12;

    fn parse(mut cursor: Cursor<'_>) -> Result<Self, ParseError> {
        expect_format(&mut cursor, Self::FORMAT)?;
        cursor.skip(2)?; // reserved
        let body_len = cursor.read_u32_checked(|len| {
            len.checked_sub(8)
                .map(|len| len as usize)
                .ok_or(ParseErrorKind::UnexpectedEof)
        })?;
        cursor = cursor.range(0..body_len)?;
        cursor.skip(4)?; // language

        let group_count = cursor.read_u32()?;
        let mut groups = Vec::new();
        for _ in 0..group_count {
            groups.push(SequentialMapGroup {
                start_char_code: cursor.read_u32()?,
                end_char_code: cursor.read_u32()?,
                start_glyph_id: cursor.read_u32()?,
            });
        }
        Ok(Self { groups })
    }

    fn map_char(&self, ch: char) -> Result<u16, MapError> {
        let code = u32::from(ch);
        let group_idx = self
            .groups
            .partition_point(|group| group.end_char_code < code);
        match self.groups.get(group_idx) {
            Some(group) if group.start_char_code <= code => group
                .map_unchecked(ch)
                .try_into()
                .map_err(|_| MapError::InvalidOffset),
            _ => Ok(0),
        }
    }
}

/// Encoding record pointing to a `cmap` subtable.
#[derive(Debug, Clone, Copy)]
struct EncodingRecord {
    platform_id: u16,
    encoding_id: u16,
    offset: usize,
}

impl EncodingRecord {
    /// Returns the subtable format used for this encoding, or `None` if the encoding
    /// is not supported.
    fn subtable_format(self) -> Option<u16> {
        const UNICODE: u16 = CmapTable::<'static>::UNICODE_PLATFORM;
        const WINDOWS: u16 = CmapTable::<'static>::WINDOWS_PLATFORM;

        match (self.platform_id, self.encoding_id) {
            // Symbol encoding (Windows, 0) is common for icon fonts.
            (UNICODE, 3) | (WINDOWS, 0 | 1) => Some(SegmentDeltas::FORMAT),
            (UNICODE, 4) | (WINDOWS, 10) => Some(SegmentedCoverage::FORMAT),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) enum CmapTable<'a> {
    Deltas(SegmentDeltas<'a>),
    Coverage(SegmentedCoverage),
}

impl<'a> CmapTable<'a> {
    pub(crate) const UNICODE_PLATFORM: u16 = 0;
    const WINDOWS_PLATFORM: u16 = 3;

    pub(super) fn parse(cursor: Cursor<'a>) -> Result<Self, ParseError> {
        let mut header = cursor;
        header.read_u16_checked(|version| {
            if version == 0 {
                Ok(())
            } else {
                Err(ParseErrorKind::UnexpectedTableVersion {
                    version: version.into(),
                })
            }
        })?;

        let record_count = header.read_u16()?;
        let mut records = Vec::with_capacity(usize::from(record_count));
        for _ in 0..record_count {
            records.push(EncodingRecord {
                platform_id: header.read_u16()?,
                encoding_id: header.read_u16()?,
                offset: header.read_u32()? as usize,
            });
        }

        // Format 12 covers all of Unicode and is preferred; otherwise, the first format 4
        // subtable is used.
        let coverage = records
            .iter()
            .find(|record| record.subtable_format() == Some(SegmentedCoverage::FORMAT));
        if let Some(record) = coverage {
            let mut subtable = cursor;
            subtable.skip(record.offset)?;
            return Ok(Self::Coverage(SegmentedCoverage::parse(subtable)?));
        }
        let deltas = records
            .iter()
            .find(|record| record.subtable_format() == Some(SegmentDeltas::FORMAT));
        if let Some(record) = deltas {
            let mut subtable = cursor;
            subtable.skip(record.offset)?;
            return Ok(Self::Deltas(SegmentDeltas::parse(subtable)?));
        }
        Err(header.err(ParseErrorKind::NoSupportedCmap))
    }

    pub(crate) fn map_char(&self, ch: char) -> Result<u16, MapError> {
        match self {
            Self::Deltas(deltas) => deltas.map_char(ch),
            Self::Coverage(coverage) => coverage.map_char(ch),
        }
    }
}
