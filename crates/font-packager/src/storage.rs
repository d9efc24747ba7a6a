//! Access to asset bytes not materialized in memory.

use std::{fs, io, path::Path};

/// Storage from which asset bytes are read.
pub trait Storage: Send + Sync {
    /// Reads all bytes at the specified path.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if reading fails.
    fn read(&self, path: &Path) -> io::Result<Vec<u8>>;
}

/// [`Storage`] reading from the local file system.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsStorage;

impl Storage for FsStorage {
    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        fs::read(path)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::{collections::HashMap, io::Write as _, path::PathBuf};

    use parking_lot::Mutex;

    use super::*;

    /// In-memory storage recording read paths.
    #[derive(Debug, Default)]
    pub(crate) struct MockStorage {
        files: HashMap<PathBuf, Vec<u8>>,
        pub(crate) reads: Mutex<Vec<PathBuf>>,
    }

    impl MockStorage {
        pub(crate) fn with_file(mut self, path: &str, bytes: impl Into<Vec<u8>>) -> Self {
            self.files.insert(path.into(), bytes.into());
            self
        }
    }

    impl Storage for MockStorage {
        fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
            self.reads.lock().push(path.to_owned());
            self.files
                .get(path)
                .cloned()
                .ok_or_else(|| io::ErrorKind::NotFound.into())
        }
    }

    #[test]
    fn reading_from_file_system() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"font bytes").unwrap();
        file.flush().unwrap();

        let bytes = FsStorage.read(file.path()).unwrap();
        assert_eq!(bytes, b"font bytes");

        let missing_path = file.path().with_extension("missing");
        let err = FsStorage.read(&missing_path).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}
