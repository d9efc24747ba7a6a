//! Embedded OpenType (EOT) container, version 2.1, without MTX compression or XOR obfuscation.
//!
//! Unlike the rest of OpenType, the EOT header is little-endian.

use crate::{font::Cursor, Font, FontSubset, ParseError};

const EOT_VERSION: u32 = 0x_0002_0001;
const EOT_MAGIC: u16 = 0x_504c;
const DEFAULT_CHARSET: u8 = 1;

/// Name IDs copied to the header, in the header order.
pub(super) const FAMILY_NAME_ID: u16 = 1;
const STYLE_NAME_ID: u16 = 2;
const VERSION_NAME_ID: u16 = 5;
const FULL_NAME_ID: u16 = 4;

/// Reads a big-endian `u16` at the offset, or 0 if the table is too short (e.g., old `OS/2` versions).
fn os2_u16(os2: &[u8], offset: usize) -> u16 {
    os2.get(offset..offset + 2)
        .map_or(0, |bytes| u16::from_be_bytes([bytes[0], bytes[1]]))
}

fn os2_u32(os2: &[u8], offset: usize) -> u32 {
    os2.get(offset..offset + 4).map_or(0, |bytes| {
        u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
    })
}

#[derive(Debug)]
struct EotHeader {
    panose: [u8; 10],
    italic: bool,
    weight: u16,
    fs_type: u16,
    unicode_ranges: [u32; 4],
    code_page_ranges: [u32; 2],
    checksum_adjustment: u32,
    /// UTF-16LE names: family, style, version, full name.
    names: [Vec<u8>; 4],
}

impl EotHeader {
    /// Length of the header part preceding the names.
    const FIXED_LEN: usize = 80;

    fn new(font: &Font<'_>, checksum_adjustment: u32) -> Self {
        const WEIGHT_OFFSET: usize = 4;
        const FS_TYPE_OFFSET: usize = 8;
        const PANOSE_OFFSET: usize = 32;
        const UNICODE_RANGE_OFFSET: usize = 42;
        const FS_SELECTION_OFFSET: usize = 62;
        const CODE_PAGE_RANGE_OFFSET: usize = 78;
        const ITALIC_BIT: u16 = 1;

        let os2 = font.os2;
        let mut panose = [0_u8; 10];
        if let Some(bytes) = os2.get(PANOSE_OFFSET..PANOSE_OFFSET + 10) {
            panose.copy_from_slice(bytes);
        }

        Self {
            panose,
            italic: os2_u16(os2, FS_SELECTION_OFFSET) & ITALIC_BIT != 0,
            weight: os2_u16(os2, WEIGHT_OFFSET),
            fs_type: os2_u16(os2, FS_TYPE_OFFSET),
            unicode_ranges: [0, 1, 2, 3].map(|i| os2_u32(os2, UNICODE_RANGE_OFFSET + 4 * i)),
            code_page_ranges: [0, 1].map(|i| os2_u32(os2, CODE_PAGE_RANGE_OFFSET + 4 * i)),
            checksum_adjustment,
            names: [FAMILY_NAME_ID, STYLE_NAME_ID, VERSION_NAME_ID, FULL_NAME_ID].map(|name_id| {
                // A malformed `name` table only results in empty names.
                let utf16_be = find_name(font.name, name_id).ok().flatten().unwrap_or_default();
                utf16_be
                    .chunks_exact(2)
                    .flat_map(|pair| [pair[1], pair[0]])
                    .collect()
            }),
        }
    }

    fn write(&self, font_data: &[u8]) -> Vec<u8> {
        let names_len: usize = self.names.iter().map(|name| 4 + name.len()).sum();
        // Fixed part + names with their padding and sizes + padding and root string size.
        let header_len = Self::FIXED_LEN + names_len + 4;
        let total_len = header_len + font_data.len();

        let mut buffer = Vec::with_capacity(total_len);
        let write_u16 = |buffer: &mut Vec<u8>, value: u16| {
            buffer.extend_from_slice(&value.to_le_bytes());
        };
        let write_u32 = |buffer: &mut Vec<u8>, value: u32| {
            buffer.extend_from_slice(&value.to_le_bytes());
        };

        write_u32(&mut buffer, total_len.try_into().expect("EOT size overflow"));
        write_u32(
            &mut buffer,
            font_data.len().try_into().expect("font size overflow"),
        );
        write_u32(&mut buffer, EOT_VERSION);
        write_u32(&mut buffer, 0); // flags
        buffer.extend_from_slice(&self.panose);
        buffer.push(DEFAULT_CHARSET);
        buffer.push(u8::from(self.italic));
        write_u32(&mut buffer, self.weight.into());
        write_u16(&mut buffer, self.fs_type);
        write_u16(&mut buffer, EOT_MAGIC);
        for range in self.unicode_ranges {
            write_u32(&mut buffer, range);
        }
        for range in self.code_page_ranges {
            write_u32(&mut buffer, range);
        }
        write_u32(&mut buffer, self.checksum_adjustment);
        for _ in 0..4 {
            write_u32(&mut buffer, 0); // reserved
        }
        debug_assert_eq!(buffer.len(), Self::FIXED_LEN);

        for name in &self.names {
            write_u16(&mut buffer, 0); // padding
            // Names come from a `name` table, so their lengths fit into `u16`.
            write_u16(&mut buffer, name.len() as u16);
            buffer.extend_from_slice(name);
        }
        write_u16(&mut buffer, 0); // padding
        write_u16(&mut buffer, 0); // root string size
        debug_assert_eq!(buffer.len(), header_len);

        buffer.extend_from_slice(font_data);
        buffer
    }
}

/// Finds a Windows (preferably, US English) or Unicode name record. Both platforms store
/// names in UTF-16BE.
pub(super) fn find_name(name_table: &[u8], name_id: u16) -> Result<Option<&[u8]>, ParseError> {
    const UNICODE_PLATFORM: u16 = 0;
    const WINDOWS_PLATFORM: u16 = 3;
    const US_ENGLISH: u16 = 0x409;

    let table = Cursor::new(name_table);
    let mut cursor = table;
    cursor.skip(2)?; // format
    let count = cursor.read_u16()?;
    let storage_offset = usize::from(cursor.read_u16()?);

    let mut best_match = None;
    for _ in 0..count {
        let platform_id = cursor.read_u16()?;
        cursor.skip(2)?; // encoding ID
        let language_id = cursor.read_u16()?;
        let record_name_id = cursor.read_u16()?;
        let len = usize::from(cursor.read_u16()?);
        let offset = usize::from(cursor.read_u16()?);
        if record_name_id != name_id
            || !matches!(platform_id, UNICODE_PLATFORM | WINDOWS_PLATFORM)
        {
            continue;
        }

        let start = storage_offset + offset;
        let bytes = table.range(start..start + len)?.bytes;
        let is_preferred = platform_id == WINDOWS_PLATFORM && language_id == US_ENGLISH;
        if is_preferred || best_match.is_none() {
            best_match = Some(bytes);
        }
        if is_preferred {
            break;
        }
    }

    Ok(best_match)
}

impl FontSubset<'_> {
    /// Serializes this subset to the Embedded OpenType format (`.eot`) used by legacy browsers.
    pub fn to_eot(&self) -> Vec<u8> {
        let (font_data, checksum_adjustment) = self.to_writer().finish_opentype();
        EotHeader::new(&self.font, checksum_adjustment).write(&font_data)
    }
}
