//! Brotli compression support for WOFF2.

use core::mem;

use super::FontWriter;

/// Streams unpadded table data in the table directory order.
struct TableDataReader<'a> {
    tables: Vec<&'a [u8]>,
    table_idx: usize,
    pos_in_table: usize,
}

impl<'a> TableDataReader<'a> {
    fn new(writer: &'a FontWriter) -> Self {
        debug_assert!(
            writer
                .tables
                .windows(2)
                .all(|window| window[0].offset + window[0].length <= window[1].offset),
            "table records need to be ordered by offsets"
        );

        Self {
            tables: writer
                .tables
                .iter()
                .map(|record| writer.table_bytes(record))
                .collect(),
            table_idx: 0,
            pos_in_table: 0,
        }
    }
}

impl brotli::CustomRead<()> for TableDataReader<'_> {
    fn read(&mut self, mut data: &mut [u8]) -> Result<usize, ()> {
        let mut total_read = 0;
        while !data.is_empty() {
            let Some(table) = self.tables.get(self.table_idx) else {
                break; // nothing left to read
            };

            let remaining = &table[self.pos_in_table..];
            let read = remaining.len().min(data.len());
            let (head, tail) = mem::take(&mut data).split_at_mut(read);
            head.copy_from_slice(&remaining[..read]);
            data = tail;
            total_read += read;

            self.pos_in_table += read;
            if self.pos_in_table == table.len() {
                self.table_idx += 1;
                self.pos_in_table = 0;
            }
        }
        Ok(total_read)
    }
}

#[derive(Default)]
struct Buffer(Vec<u8>);

impl brotli::CustomWrite<()> for Buffer {
    fn write(&mut self, data: &[u8]) -> Result<usize, ()> {
        self.0.extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> Result<(), ()> {
        Ok(())
    }
}

#[derive(Debug, Clone)]
struct BoxedSlice<T>(Box<[T]>);

impl<T> Default for BoxedSlice<T> {
    fn default() -> Self {
        Self(Box::default())
    }
}

impl<T> brotli::SliceWrapper<T> for BoxedSlice<T> {
    fn slice(&self) -> &[T] {
        self.0.as_ref()
    }

    fn len(&self) -> usize {
        self.0.len()
    }
}

impl<T> brotli::SliceWrapperMut<T> for BoxedSlice<T> {
    fn slice_mut(&mut self) -> &mut [T] {
        self.0.as_mut()
    }
}

/// Allocator backed by the global heap.
#[derive(Debug)]
struct HeapAlloc;

impl<T: Clone + Default> brotli::enc::Allocator<T> for HeapAlloc {
    type AllocatedMemory = BoxedSlice<T>;

    fn alloc_cell(&mut self, len: usize) -> Self::AllocatedMemory {
        BoxedSlice(vec![T::default(); len].into())
    }

    fn free_cell(&mut self, data: Self::AllocatedMemory) {
        drop(data);
    }
}

impl brotli::enc::BrotliAlloc for HeapAlloc {}

impl FontWriter {
    /// Compresses the concatenated table data.
    pub(super) fn compress_data(&self) -> Vec<u8> {
        let mut buffer = Buffer::default();
        ::brotli::BrotliCompressCustomIo(
            &mut TableDataReader::new(self),
            &mut buffer,
            &mut [0_u8; 4_096],
            &mut [0_u8; 4_096],
            &::brotli::enc::BrotliEncoderParams::default(),
            HeapAlloc,
            &mut |_, _, _, _| { /* do nothing */ },
            (),
        )
        .expect("Writing to Vec never fails");

        buffer.0
    }
}
