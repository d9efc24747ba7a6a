//! Logic for serializing `FontSubset`s in OpenType and web font formats.

use core::{iter, mem};

use crate::{
    errors::ParseErrorKind,
    font::{
        CmapTable, Cursor, Glyph, GlyphWithMetrics, HheaTable, HmtxTable, LocaFormat, LocaTable,
        SegmentDeltas, SegmentWithDelta, SegmentedCoverage, SequentialMapGroup,
    },
    Font, FontSubset, ParseError, TableTag,
};

mod brotli;
mod eot;
mod svg;
mod woff;
mod woff2;

fn write_u16(writer: &mut Vec<u8>, value: u16) {
    writer.extend_from_slice(&value.to_be_bytes());
}

fn write_u32(writer: &mut Vec<u8>, value: u32) {
    writer.extend_from_slice(&value.to_be_bytes());
}

fn pad_to_4_bytes(writer: &mut Vec<u8>) {
    if writer.len() % 4 != 0 {
        let padding = 4 - writer.len() % 4;
        writer.extend(iter::repeat_n(0_u8, padding));
    }
}

impl CmapTable<'static> {
    fn from_map(map: &[(char, u16)]) -> Self {
        let coverage = Self::create_coverage(map);
        let can_be_encoded_as_deltas = map
            .last()
            .is_none_or(|&(ch, _)| u32::from(ch) < u32::from(u16::MAX));
        if !can_be_encoded_as_deltas {
            return Self::Coverage(coverage);
        }

        #[allow(clippy::cast_possible_truncation)]
        // `_ as u16` is safe due to the `can_be_encoded_as_deltas` check
        let delta_segments = coverage.groups.iter().map(|group| {
            let start_code = group.start_char_code as u16;
            SegmentWithDelta {
                start_code,
                end_code: group.end_char_code as u16,
                id_delta: (group.start_glyph_id as u16).wrapping_sub(start_code),
                id_range_offset: 0,
            }
        });
        // The last segment must map 0xffff; map it to the missing glyph.
        let delta_segments = delta_segments.chain([SegmentWithDelta {
            start_code: u16::MAX,
            end_code: u16::MAX,
            id_delta: 1,
            id_range_offset: 0,
        }]);
        Self::Deltas(SegmentDeltas {
            segments: delta_segments.collect(),
            glyph_id_array: &[],
        })
    }

    fn create_coverage(map: &[(char, u16)]) -> SegmentedCoverage {
        let [(first_char, first_idx), rest @ ..] = map else {
            return SegmentedCoverage::default();
        };
        let mut groups = vec![];
        let mut current_group = SequentialMapGroup {
            start_char_code: (*first_char).into(),
            end_char_code: (*first_char).into(),
            start_glyph_id: (*first_idx).into(),
        };

        for &(ch, glyph_idx) in rest {
            let continues_group = u32::from(ch) == current_group.end_char_code + 1
                && u32::from(glyph_idx) == current_group.map_unchecked(ch);
            if continues_group {
                current_group.end_char_code += 1;
            } else {
                let next_group = SequentialMapGroup {
                    start_char_code: ch.into(),
                    end_char_code: ch.into(),
                    start_glyph_id: glyph_idx.into(),
                };
                groups.push(mem::replace(&mut current_group, next_group));
            }
        }

        groups.push(current_group);
        SegmentedCoverage { groups }
    }
}

impl CmapTable<'_> {
    fn write(&self, writer: &mut Vec<u8>) {
        write_u16(writer, 0); // table version
        write_u16(writer, 1); // num_tables

        write_u16(writer, CmapTable::UNICODE_PLATFORM);
        let encoding_id = match self {
            Self::Deltas(_) => 3,
            Self::Coverage(_) => 4,
        };
        write_u16(writer, encoding_id);
        write_u32(writer, 12); // subtable_offset

        match self {
            Self::Deltas(deltas) => deltas.write(writer),
            Self::Coverage(coverage) => coverage.write(writer),
        }
    }
}

impl SegmentDeltas<'_> {
    fn subtable_len(&self) -> usize {
        16 + 8 * self.segments.len() + self.glyph_id_array.len()
    }

    fn write(&self, writer: &mut Vec<u8>) {
        write_u16(writer, 4); // subtable format
        let subtable_len = u16::try_from(self.subtable_len()).expect("subtable_len overflow");
        write_u16(writer, subtable_len);
        write_u16(writer, 0); // language

        let segment_count = u16::try_from(self.segments.len()).expect("segments.len() overflow");
        write_u16(writer, 2 * segment_count);
        // `segment_count >= 1` since there's always the final 0xffff segment.
        let entry_selector = segment_count.ilog2() as u16;
        let search_range = 1 << (entry_selector + 1);
        write_u16(writer, search_range);
        write_u16(writer, entry_selector);
        write_u16(writer, 2 * segment_count - search_range);

        for segment in &self.segments {
            write_u16(writer, segment.end_code);
        }
        write_u16(writer, 0); // reserved padding
        for segment in &self.segments {
            write_u16(writer, segment.start_code);
        }
        for segment in &self.segments {
            write_u16(writer, segment.id_delta);
        }
        for segment in &self.segments {
            write_u16(writer, segment.id_range_offset);
        }
        writer.extend_from_slice(self.glyph_id_array);
    }
}

impl SegmentedCoverage {
    fn subtable_len(&self) -> usize {
        16 + 12 * self.groups.len()
    }

    fn write(&self, writer: &mut Vec<u8>) {
        write_u16(writer, 12); // subtable format
        write_u16(writer, 0); // reserved

        let subtable_len = u32::try_from(self.subtable_len()).expect("subtable_len overflow");
        write_u32(writer, subtable_len);
        write_u32(writer, 0); // language
        let group_count = u32::try_from(self.groups.len()).expect("groups.len() overflow");
        write_u32(writer, group_count);
        for group in &self.groups {
            write_u32(writer, group.start_char_code);
            write_u32(writer, group.end_char_code);
            write_u32(writer, group.start_glyph_id);
        }
    }
}

impl FontSubset<'_> {
    /// Serializes this subset to the OpenType format with TrueType outlines (`.ttf`).
    pub fn to_truetype(&self) -> Vec<u8> {
        self.to_writer().into_opentype()
    }

    /// Serializes this subset to the WOFF 1.0 format (`.woff`).
    pub fn to_woff(&self) -> Vec<u8> {
        self.to_writer().into_woff()
    }

    /// Serializes this subset to the WOFF2 format (`.woff2`).
    pub fn to_woff2(&self) -> Vec<u8> {
        self.to_writer().into_woff2()
    }

    fn to_writer(&self) -> FontWriter {
        let cmap = CmapTable::from_map(&self.char_map);

        let mut writer = FontWriter::default();
        writer.write_table(TableTag::CMAP, |buffer| cmap.write(buffer));
        if let Some(cvt) = self.font.cvt {
            writer.write_raw_table(TableTag::CVT, cvt);
        }
        if let Some(fpgm) = self.font.fpgm {
            writer.write_raw_table(TableTag::FPGM, fpgm);
        }

        let number_of_h_metrics = writer.write_table(TableTag::HMTX, |buffer| {
            HmtxTable::write_for_glyphs(&self.glyphs, buffer)
        });
        let mut hhea = self.font.hhea;
        hhea.number_of_h_metrics = number_of_h_metrics;
        writer.write_table(TableTag::HHEA, |buffer| hhea.write(buffer));

        let maxp = self.font.maxp;
        writer.write_table(TableTag::MAXP, |buffer| {
            // Patch the number of glyphs (u16 at bytes 4..6), and leave other bytes intact.
            buffer.extend_from_slice(&maxp[..4]);
            // The subset has no more glyphs than the original font.
            write_u16(buffer, self.glyphs.len().try_into().expect("too many glyphs"));
            buffer.extend_from_slice(&maxp[6..]);
        });

        writer.write_raw_table(TableTag::NAME, self.font.name);
        writer.write_raw_table(TableTag::OS2, self.font.os2);

        let post = self.font.post;
        writer.write_table(TableTag::POST, |buffer| {
            // Version 3.0 has no glyph names.
            write_u32(buffer, 0x_0003_0000);
            buffer.extend_from_slice(&post[4..32]);
        });

        if let Some(prep) = self.font.prep {
            writer.write_raw_table(TableTag::PREP, prep);
        }

        let locations = writer.write_table(TableTag::GLYF, |buffer| {
            let mut locations = vec![0];
            let initial_offset = buffer.len();
            for glyph in &self.glyphs {
                glyph.inner.write(buffer);
                locations.push(buffer.len() - initial_offset);
            }
            locations
        });

        let loca_format = writer.write_table(TableTag::LOCA, |buffer| {
            LocaTable::write(&locations, buffer)
        });
        writer.write_table(TableTag::HEAD, |buffer| {
            write_head_table(self.font.head, Some(loca_format), buffer);
        });

        writer
    }
}

/// Copies the `head` table zeroing `checksumAdjustment` (it's patched once all tables are written),
/// optionally replacing the `loca` format.
fn write_head_table(original: &[u8], loca_format: Option<LocaFormat>, writer: &mut Vec<u8>) {
    const LOCA_FORMAT_OFFSET: usize = 50;

    writer.extend_from_slice(&original[..Font::HEAD_CHECKSUM_OFFSET]);
    write_u32(writer, 0);
    let Some(loca_format) = loca_format else {
        writer.extend_from_slice(&original[Font::HEAD_CHECKSUM_OFFSET + 4..]);
        return;
    };

    writer.extend_from_slice(&original[Font::HEAD_CHECKSUM_OFFSET + 4..LOCA_FORMAT_OFFSET]);
    write_u16(
        writer,
        match loca_format {
            LocaFormat::Short => 0,
            LocaFormat::Long => 1,
        },
    );
    writer.extend_from_slice(&original[LOCA_FORMAT_OFFSET + 2..]);
}

/// Converts a serialized OpenType font with TrueType outlines to the WOFF2 format.
///
/// All tables of the font are preserved as is (i.e., this only re-encodes the font, without
/// subsetting it). Tables are stored without WOFF2 transforms.
///
/// # Errors
///
/// Returns an error if the font table directory is malformed, or the font has no `head` table.
pub fn compress_woff2(sfnt: &[u8]) -> Result<Vec<u8>, ParseError> {
    Ok(FontWriter::from_sfnt(sfnt)?.into_woff2())
}

impl HmtxTable<'_> {
    fn write_for_glyphs(glyphs: &[GlyphWithMetrics<'_>], writer: &mut Vec<u8>) -> u16 {
        // Trailing glyphs with the same advance only need their LSB.
        let mut number_of_h_metrics = glyphs.len();
        while let Some([prev, current]) = glyphs[..number_of_h_metrics].last_chunk::<2>() {
            if prev.advance != current.advance {
                break;
            }
            number_of_h_metrics -= 1;
        }

        for (i, glyph) in glyphs.iter().enumerate() {
            if i < number_of_h_metrics {
                write_u16(writer, glyph.advance);
            }
            write_u16(writer, glyph.lsb);
        }

        number_of_h_metrics
            .try_into()
            .expect("number of glyphs exceeds u16::MAX")
    }
}

impl HheaTable<'_> {
    fn write(&self, writer: &mut Vec<u8>) {
        writer.extend_from_slice(&self.raw[..Self::EXPECTED_LEN - 2]);
        write_u16(writer, self.number_of_h_metrics);
    }
}

impl LocaTable<'_> {
    fn write(locations: &[usize], writer: &mut Vec<u8>) -> LocaFormat {
        let all_even = locations.iter().all(|&loc| loc % 2 == 0);
        let in_bounds = locations
            .last()
            .is_none_or(|&loc| loc <= usize::from(u16::MAX) * 2);
        if all_even && in_bounds {
            for &loc in locations {
                #[allow(clippy::cast_possible_truncation)]
                // doesn't happen due to the preceding check
                write_u16(writer, (loc / 2) as u16);
            }
            LocaFormat::Short
        } else {
            for &loc in locations {
                write_u32(writer, u32::try_from(loc).expect("glyph location overflow"));
            }
            LocaFormat::Long
        }
    }
}

#[derive(Debug, Clone, Copy)]
#[cfg_attr(test, derive(PartialEq))]
struct TableRecord {
    tag: TableTag,
    checksum: u32,
    /// Offset is initially recorded relative to the table data start. It's always 4-byte aligned.
    offset: u32,
    length: u32,
}

impl TableRecord {
    const BYTE_LEN: usize = 16;

    fn write_opentype(&self, writer: &mut Vec<u8>) {
        writer.extend_from_slice(&self.tag.0);
        write_u32(writer, self.checksum);
        write_u32(writer, self.offset);
        write_u32(writer, self.length);
    }

    fn self_checksum(&self) -> u32 {
        u32::from_be_bytes(self.tag.0)
            .wrapping_add(self.checksum)
            .wrapping_add(self.offset)
            .wrapping_add(self.length)
    }
}

/// Accumulates font tables and serializes them into one of the supported containers.
#[derive(Debug, Clone, Default)]
struct FontWriter {
    tables: Vec<TableRecord>,
    /// Contains *aligned* table data
    table_data: Vec<u8>,
}

impl FontWriter {
    const SFNT_HEADER_LEN: usize = 12;

    fn write_table<T>(&mut self, tag: TableTag, with: impl FnOnce(&mut Vec<u8>) -> T) -> T {
        let offset = self.table_data.len();
        debug_assert_eq!(offset % 4, 0, "unaligned offset: {offset}");

        let output = with(&mut self.table_data);
        let length = self.table_data.len() - offset;
        pad_to_4_bytes(&mut self.table_data);

        let checksum = Font::checksum(&self.table_data[offset..]);
        self.tables.push(TableRecord {
            tag,
            checksum,
            offset: u32::try_from(offset).expect("table offset overflow"),
            length: u32::try_from(length).expect("table length overflow"),
        });
        output
    }

    fn write_raw_table(&mut self, tag: TableTag, content: &[u8]) {
        self.write_table(tag, |buffer| buffer.extend_from_slice(content));
    }

    /// Reads tables from a serialized OpenType font. Tables are laid out in their physical order,
    /// except that `loca` is moved right after `glyf` as required by WOFF2.
    fn from_sfnt(bytes: &[u8]) -> Result<Self, ParseError> {
        const APPLE_SFNT_VERSION: u32 = 0x_7472_7565;

        let font = Cursor::new(bytes);
        let mut cursor = font;
        cursor.read_u32_checked(|version| {
            if version != Font::SFNT_VERSION && version != APPLE_SFNT_VERSION {
                return Err(ParseErrorKind::UnexpectedFontVersion(version));
            }
            Ok(())
        })?;
        let table_count = cursor.read_u16()?;
        cursor.skip(6)?; // searchRange, entrySelector, rangeShift

        let mut tables = Vec::with_capacity(usize::from(table_count));
        for _ in 0..table_count {
            let tag = TableTag(cursor.read_byte_array()?);
            cursor.skip(4)?; // checksum; recomputed when writing
            let offset = cursor.read_u32()? as usize;
            let len = cursor.read_u32()? as usize;
            tables.push((offset, tag, font.range(offset..offset + len)?));
        }
        tables.sort_by_key(|&(offset, ..)| offset);

        if let Some(loca_pos) = tables.iter().position(|&(_, tag, _)| tag == TableTag::LOCA) {
            let loca = tables.remove(loca_pos);
            let glyf_pos = tables.iter().position(|&(_, tag, _)| tag == TableTag::GLYF);
            tables.insert(glyf_pos.map_or(loca_pos, |pos| pos + 1), loca);
        }

        let mut writer = Self::default();
        let mut has_head = false;
        for (_, tag, table) in tables {
            if tag == TableTag::HEAD {
                if table.bytes.len() < Font::HEAD_CHECKSUM_OFFSET + 4 {
                    return Err(table.err(ParseErrorKind::UnexpectedEof));
                }
                has_head = true;
                writer.write_table(tag, |buffer| write_head_table(table.bytes, None, buffer));
            } else {
                writer.write_raw_table(tag, table.bytes);
            }
        }

        if has_head {
            Ok(writer)
        } else {
            Err(ParseError::missing_table(TableTag::HEAD))
        }
    }

    fn write_sfnt_header(&self) -> Vec<u8> {
        let mut buffer = vec![];
        write_u32(&mut buffer, Font::SFNT_VERSION);

        // Subset fonts have a handful of tables, and `from_sfnt()` reads `u16` counts.
        let table_count = u16::try_from(self.tables.len()).expect("too many tables");
        write_u16(&mut buffer, table_count);
        let entry_selector = table_count.checked_ilog2().unwrap_or(0) as u16;
        let search_range = 1 << (4 + entry_selector);
        write_u16(&mut buffer, search_range);
        write_u16(&mut buffer, entry_selector);
        write_u16(&mut buffer, (16 * table_count).saturating_sub(search_range));

        debug_assert_eq!(buffer.len(), Self::SFNT_HEADER_LEN);
        buffer
    }

    /// Returns the starting offset of table data.
    fn data_offset(&self) -> usize {
        Self::SFNT_HEADER_LEN + self.tables.len() * TableRecord::BYTE_LEN
    }

    fn into_opentype(self) -> Vec<u8> {
        self.finish_opentype().0
    }

    /// Returns the font bytes together with the `checksumAdjustment` value written to `head`.
    fn finish_opentype(mut self) -> (Vec<u8>, u32) {
        let mut buffer = self.write_sfnt_header();
        let checksum_adjustment = self.adjust_data(Font::checksum(&buffer));

        self.tables.sort_unstable_by_key(|record| record.tag);
        for record in &self.tables {
            record.write_opentype(&mut buffer);
        }
        buffer.extend(self.table_data);
        (buffer, checksum_adjustment)
    }

    /// Makes table offsets absolute and patches `head.checksumAdjustment`, which is returned.
    fn adjust_data(&mut self, sfnt_header_checksum: u32) -> u32 {
        let data_offset = self.data_offset();
        let data_offset_u32 = u32::try_from(data_offset).expect("data_offset overflow");

        let mut file_checksum = sfnt_header_checksum;
        for record in &mut self.tables {
            record.offset += data_offset_u32;
            file_checksum = file_checksum
                .wrapping_add(record.self_checksum())
                .wrapping_add(record.checksum);
        }
        let checksum_adjustment = Font::SFNT_CHECKSUM.wrapping_sub(file_checksum);
        self.patch_head_table(checksum_adjustment, data_offset);
        checksum_adjustment
    }

    fn patch_head_table(&mut self, checksum_adjustment: u32, data_offset: usize) {
        let head_table = self
            .tables
            .iter()
            .find(|record| record.tag == TableTag::HEAD)
            .expect("head table is always present");
        // At this point, the table offset already includes the heap offset, so we need to subtract it.
        let offset = head_table.offset as usize + Font::HEAD_CHECKSUM_OFFSET - data_offset;
        self.table_data[offset..offset + 4].copy_from_slice(&checksum_adjustment.to_be_bytes());
    }

    /// Returns unpadded data of the table. Works both before and after `adjust_data()`.
    fn table_bytes(&self, record: &TableRecord) -> &[u8] {
        let heap_start = self.tables.iter().map(|record| record.offset).min();
        let start = (record.offset - heap_start.unwrap_or(0)) as usize;
        &self.table_data[start..start + record.length as usize]
    }
}

impl Glyph<'_> {
    fn write(&self, writer: &mut Vec<u8>) {
        match self {
            Self::Empty => { /* do nothing */ }
            Self::Simple(bytes) => writer.extend_from_slice(bytes),
            Self::Composite {
                bbox,
                components,
                instructions,
            } => {
                write_u16(writer, u16::MAX); // numberOfContours = -1
                writer.extend_from_slice(bbox);
                for component in components {
                    write_u16(writer, component.flags);
                    write_u16(writer, component.glyph_idx);
                    writer.extend_from_slice(component.tail);
                }
                writer.extend_from_slice(instructions);
            }
        }
    }
}
