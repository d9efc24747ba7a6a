//! WOFF 1.0 container with zlib-compressed tables.

use std::io::Write as _;

use flate2::{write::ZlibEncoder, Compression};

use super::{pad_to_4_bytes, write_u16, write_u32, FontWriter};
use crate::Font;

impl FontWriter {
    const WOFF_HEADER_LEN: usize = 44;
    const WOFF_TABLE_RECORD_LEN: usize = 20;

    pub(super) fn into_woff(mut self) -> Vec<u8> {
        const WOFF_SIGNATURE: u32 = 0x_774f_4646; // "wOFF"

        self.adjust_data(Font::checksum(&self.write_sfnt_header()));
        self.tables.sort_unstable_by_key(|record| record.tag);

        // A table is stored uncompressed if compression doesn't make it smaller.
        let blocks: Vec<_> = self
            .tables
            .iter()
            .map(|record| {
                let raw = self.table_bytes(record);
                let compressed = zlib_compress(raw);
                if compressed.len() < raw.len() {
                    compressed
                } else {
                    raw.to_vec()
                }
            })
            .collect();

        let mut directory = Vec::with_capacity(self.tables.len() * Self::WOFF_TABLE_RECORD_LEN);
        let mut data = vec![];
        let data_start = Self::WOFF_HEADER_LEN + self.tables.len() * Self::WOFF_TABLE_RECORD_LEN;
        for (record, block) in self.tables.iter().zip(&blocks) {
            directory.extend_from_slice(&record.tag.0);
            let offset = data_start + data.len();
            write_u32(&mut directory, offset.try_into().expect("offset overflow"));
            write_u32(&mut directory, block.len().try_into().expect("length overflow"));
            write_u32(&mut directory, record.length);
            write_u32(&mut directory, record.checksum);

            data.extend_from_slice(block);
            pad_to_4_bytes(&mut data);
        }

        let file_len = data_start + data.len();
        let total_sfnt_size = self.data_offset() + self.table_data.len();
        let mut buffer = Vec::with_capacity(file_len);
        write_u32(&mut buffer, WOFF_SIGNATURE);
        write_u32(&mut buffer, Font::SFNT_VERSION);
        write_u32(&mut buffer, file_len.try_into().expect("file length overflow"));
        // Number of tables fits into `u16`; checked when writing the sfnt header
        write_u16(&mut buffer, self.tables.len() as u16);
        write_u16(&mut buffer, 0); // reserved
        write_u32(
            &mut buffer,
            total_sfnt_size.try_into().expect("sfnt size overflow"),
        );
        write_u16(&mut buffer, 1); // major version
        write_u16(&mut buffer, 0); // minor version
        write_u32(&mut buffer, 0); // metadata offset
        write_u32(&mut buffer, 0); // metadata length
        write_u32(&mut buffer, 0); // original metadata length
        write_u32(&mut buffer, 0); // private block offset
        write_u32(&mut buffer, 0); // private block length
        debug_assert_eq!(buffer.len(), Self::WOFF_HEADER_LEN);

        buffer.extend(directory);
        buffer.extend(data);
        debug_assert_eq!(buffer.len(), file_len);
        buffer
    }
}

fn zlib_compress(data: &[u8]) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::with_capacity(data.len()), Compression::best());
    encoder.write_all(data).expect("Writing to Vec never fails");
    encoder.finish().expect("Writing to Vec never fails")
}

#[cfg(test)]
mod tests {
    use std::io::Read as _;

    use allsorts::{binary::read::ReadScope, font_data::FontData, tables::FontTableProvider};
    use flate2::read::ZlibDecoder;
    use test_casing::test_casing;

    use super::*;
    use crate::{
        tests::{subset_of, TestFont, FONTS},
        TableTag,
    };

    fn read_u32_at(bytes: &[u8], offset: usize) -> u32 {
        u32::from_be_bytes(bytes[offset..offset + 4].try_into().unwrap())
    }

    #[test_casing(2, FONTS)]
    fn woff_tables_decompress_to_truetype_tables(font: TestFont) {
        let subset = subset_of(font, "Hello, world!");
        let ttf = subset.to_truetype();
        let woff = subset.to_woff();

        assert_eq!(&woff[..4], b"wOFF");
        assert_eq!(read_u32_at(&woff, 8) as usize, woff.len());
        let table_count = usize::from(u16::from_be_bytes([woff[12], woff[13]]));
        // `totalSfntSize` equals the TrueType serialization size.
        assert_eq!(read_u32_at(&woff, 16) as usize, ttf.len());

        let ttf_file = ReadScope::new(&ttf).read::<FontData>().unwrap();
        let ttf_provider = ttf_file.table_provider(0).unwrap();
        let mut prev_tag = None;
        for i in 0..table_count {
            let record_start = FontWriter::WOFF_HEADER_LEN + i * FontWriter::WOFF_TABLE_RECORD_LEN;
            let tag = TableTag::new(woff[record_start..record_start + 4].try_into().unwrap());
            assert!(prev_tag < Some(tag), "tables are not sorted");
            prev_tag = Some(tag);

            let offset = read_u32_at(&woff, record_start + 4) as usize;
            let comp_len = read_u32_at(&woff, record_start + 8) as usize;
            let orig_len = read_u32_at(&woff, record_start + 12) as usize;
            assert_eq!(offset % 4, 0);

            let block = &woff[offset..offset + comp_len];
            let table = if comp_len < orig_len {
                let mut decompressed = vec![];
                ZlibDecoder::new(block).read_to_end(&mut decompressed).unwrap();
                decompressed
            } else {
                block.to_vec()
            };
            let expected = ttf_provider
                .read_table_data(u32::from_be_bytes(tag.to_bytes()))
                .unwrap();
            assert_eq!(table, expected.as_ref(), "table {tag}");
        }
    }

    #[test]
    fn woff_is_readable() {
        let chars = "The quick brown fox";
        let woff = subset_of(FONTS[0], chars).to_woff();
        crate::tests::assert_valid_font(&woff, false, chars.chars());
    }
}
