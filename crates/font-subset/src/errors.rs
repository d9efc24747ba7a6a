use core::{fmt, ops};

use crate::TableTag;

/// Kind of a font [`ParseError`].
#[derive(Debug)]
#[non_exhaustive]
pub enum ParseErrorKind {
    /// Unexpected end of the font data.
    UnexpectedEof,
    /// Unexpected font version (e.g., a CFF-flavored OpenType font).
    UnexpectedFontVersion(u32),
    /// Missing required font table (e.g., `head`).
    MissingTable,
    /// No supported subtable in the `cmap` table.
    NoSupportedCmap,
    /// Range inferred from the table data is out of bounds.
    RangeOutOfBounds {
        /// Inferred range.
        range: ops::Range<usize>,
        /// Length of the indexed data.
        len: usize,
    },
    /// Unexpected table version.
    UnexpectedTableVersion {
        /// Version read from the table.
        version: u32,
    },
    /// Unexpected table length.
    UnexpectedTableLen {
        /// Expected length.
        expected: usize,
        /// Actual length.
        actual: usize,
    },
    /// Unexpected table format (e.g., for a `cmap` subtable or the `loca` format in `head`).
    UnexpectedTableFormat {
        /// Format read from the table.
        format: u16,
    },
    /// Composite glyphs are nested too deeply (e.g., reference themselves).
    CompositeTooDeep,
    /// Error mapping a char to a glyph.
    Map(MapError),
}

impl fmt::Display for ParseErrorKind {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnexpectedEof => formatter.write_str("unexpected end of the font data"),
            Self::UnexpectedFontVersion(version) => {
                write!(formatter, "unexpected font version ({version:#010x})")
            }
            Self::MissingTable => formatter.write_str("missing required font table"),
            Self::NoSupportedCmap => {
                formatter.write_str("no supported subtable in the `cmap` table")
            }
            Self::RangeOutOfBounds { range, len } => {
                write!(
                    formatter,
                    "range ({range:?}) inferred from the table data is out of bounds (..{len})"
                )
            }
            Self::UnexpectedTableVersion { version } => {
                write!(formatter, "unexpected table version ({version})")
            }
            Self::UnexpectedTableLen { expected, actual } => {
                write!(
                    formatter,
                    "unexpected table length: expected {expected}, got {actual}"
                )
            }
            Self::UnexpectedTableFormat { format } => {
                write!(formatter, "unexpected table format ({format})")
            }
            Self::CompositeTooDeep => formatter.write_str("composite glyphs are nested too deeply"),
            Self::Map(err) => write!(formatter, "failed mapping char: {err}"),
        }
    }
}

impl std::error::Error for ParseErrorKind {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Map(err) => Some(err),
            _ => None,
        }
    }
}

/// Errors that can occur when mapping chars to glyphs via the `cmap` table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum MapError {
    /// Char cannot be represented in the `cmap` subtable of the font.
    CharTooLarge,
    /// Offset into the glyph ID array is invalid.
    InvalidOffset,
}

impl fmt::Display for MapError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(match self {
            Self::CharTooLarge => "char is not representable in the `cmap` subtable",
            Self::InvalidOffset => "invalid offset into the glyph ID array",
        })
    }
}

impl std::error::Error for MapError {}

/// Errors that can occur when parsing an OpenType [`Font`](crate::Font).
#[derive(Debug)]
pub struct ParseError {
    pub(crate) kind: ParseErrorKind,
    pub(crate) offset: usize,
    pub(crate) table: Option<TableTag>,
}

impl fmt::Display for ParseError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(table) = self.table {
            write!(formatter, "[{table}] ")?;
        }
        if self.offset > 0 {
            write!(formatter, "{}: ", self.offset)?;
        }
        fmt::Display::fmt(&self.kind, formatter)
    }
}

impl std::error::Error for ParseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.kind {
            ParseErrorKind::Map(err) => Some(err),
            _ => None,
        }
    }
}

impl From<MapError> for ParseError {
    fn from(err: MapError) -> Self {
        Self {
            kind: ParseErrorKind::Map(err),
            offset: 0,
            table: Some(TableTag::CMAP),
        }
    }
}

impl ParseError {
    pub(crate) fn missing_table(tag: TableTag) -> Self {
        Self {
            kind: ParseErrorKind::MissingTable,
            offset: 0,
            table: Some(tag),
        }
    }

    /// Gets the error kind.
    pub fn kind(&self) -> &ParseErrorKind {
        &self.kind
    }

    /// Gets the table this error relates to.
    pub fn table(&self) -> Option<TableTag> {
        self.table
    }

    /// Gets the offset in the font data.
    pub fn offset(&self) -> usize {
        self.offset
    }
}
