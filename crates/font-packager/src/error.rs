//! Error types.

use std::{error::Error as StdError, io, path::PathBuf};

use thiserror::Error;

/// Error produced by a font engine (a [`Subsetter`](crate::Subsetter) or
/// a [`Woff2Compressor`](crate::Woff2Compressor)).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum EngineError {
    /// The font could not be parsed by the built-in engine.
    #[error("malformed font: {0}")]
    Parse(#[from] font_subset::ParseError),
    /// Error produced by a custom engine.
    #[error(transparent)]
    Other(Box<dyn StdError + Send + Sync>),
}

impl EngineError {
    /// Wraps an arbitrary error produced by a custom engine.
    pub fn other(err: impl Into<Box<dyn StdError + Send + Sync>>) -> Self {
        Self::Other(err.into())
    }
}

/// Errors aborting a font minification pass.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PackagerError {
    /// Font bytes could not be read from storage.
    #[error("failed reading `{}`: {source}", path.display())]
    Storage {
        /// Path that was read.
        path: PathBuf,
        /// I/O error.
        #[source]
        source: io::Error,
    },
    /// Subsetting the master variant of a font family has failed.
    #[error("failed subsetting font family `{family}`: {source}")]
    Subset {
        /// Font family name.
        family: String,
        /// Engine error.
        #[source]
        source: EngineError,
    },
    /// WOFF2 compression of the minified font has failed.
    #[error("failed compressing font family `{family}` to WOFF2: {source}")]
    Compress {
        /// Font family name.
        family: String,
        /// Engine error.
        #[source]
        source: EngineError,
    },
    /// The subsetter has not produced a TrueType output, which is required to derive WOFF2.
    #[error("subsetter produced no TrueType output for font family `{family}`")]
    MissingMasterOutput {
        /// Font family name.
        family: String,
    },
    /// Stripping unused CSS rules has failed.
    #[error("failed stripping unused CSS: {0}")]
    CssStrip(String),
}
