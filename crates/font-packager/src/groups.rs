//! Grouping of font assets by family.

use std::{collections::BTreeMap, fmt, path::Path, str::FromStr, sync::Arc};

use crate::{
    asset::{Asset, Output},
    error::PackagerError,
    storage::Storage,
};

/// Font file format recognized by its file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FontFormat {
    /// Embedded OpenType.
    Eot,
    /// SVG font.
    Svg,
    /// OpenType with TrueType outlines. This is the master format for subsetting.
    Ttf,
    /// WOFF 1.0.
    Woff,
    /// WOFF2.
    Woff2,
}

impl FontFormat {
    /// All supported formats.
    pub const ALL: [Self; 5] = [Self::Eot, Self::Svg, Self::Ttf, Self::Woff, Self::Woff2];

    /// Returns the file extension for this format without the leading dot.
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Eot => "eot",
            Self::Svg => "svg",
            Self::Ttf => "ttf",
            Self::Woff => "woff",
            Self::Woff2 => "woff2",
        }
    }

    /// Determines the format from the extension of the provided path.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()?.to_str()?.parse().ok()
    }
}

impl fmt::Display for FontFormat {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.extension())
    }
}

/// Error parsing a [`FontFormat`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownFontFormat(String);

impl fmt::Display for UnknownFontFormat {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "unknown font format: `{}`", self.0)
    }
}

impl std::error::Error for UnknownFontFormat {}

impl FromStr for FontFormat {
    type Err = UnknownFontFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|format| format.extension().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownFontFormat(s.to_owned()))
    }
}

/// Single file of a [`FontGroup`].
#[derive(Debug, Clone)]
pub struct FontVariant {
    /// Asset the variant originates from.
    pub asset: Arc<Asset>,
    /// Format of the variant.
    pub format: FontFormat,
    /// Unminified bytes of the variant.
    pub bytes: Arc<[u8]>,
}

/// Font files sharing the same family name (i.e., the file stem) within a compilation.
#[derive(Debug, Clone)]
pub struct FontGroup {
    /// Family name.
    pub family: String,
    /// Variants in the order of their assets.
    pub variants: Vec<FontVariant>,
}

impl FontGroup {
    /// Returns the TrueType variant used as the subsetting source, if any.
    pub fn master(&self) -> Option<&FontVariant> {
        self.variants
            .iter()
            .find(|variant| variant.format == FontFormat::Ttf)
    }

    /// Checks whether the group contains a variant in the specified format.
    pub fn has_format(&self, format: FontFormat) -> bool {
        self.variants.iter().any(|variant| variant.format == format)
    }
}

fn read_variant_bytes(
    asset: &Asset,
    format: FontFormat,
    storage: &dyn Storage,
) -> Result<Arc<[u8]>, PackagerError> {
    // Hosts may key outputs by the original extension (e.g., `TTF`).
    let output = asset
        .output(asset.kind())
        .or_else(|| asset.output(format.extension()));
    let path = match output {
        Some(Output::Bytes(bytes)) => return Ok(bytes),
        Some(Output::Text(text)) => return Ok(text.into_bytes().into()),
        Some(Output::Path(path)) => path,
        None => asset.name().to_owned(),
    };
    let bytes = storage
        .read(&path)
        .map_err(|source| PackagerError::Storage { path, source })?;
    Ok(bytes.into())
}

/// Groups font assets by family.
///
/// Variant bytes are taken from the asset output for the format extension. If the output
/// is missing or is a path reference, bytes are read from `storage`. Groups are ordered by
/// the family name.
///
/// # Errors
///
/// Returns an error if reading from storage fails.
pub fn find_font_groups(
    assets: &[Arc<Asset>],
    storage: &dyn Storage,
) -> Result<Vec<FontGroup>, PackagerError> {
    let mut groups = BTreeMap::<String, Vec<FontVariant>>::new();
    for asset in assets {
        let Some(format) = FontFormat::from_path(asset.name()) else {
            continue;
        };
        let Some(family) = asset.name().file_stem() else {
            continue;
        };
        let family = family.to_string_lossy().into_owned();
        let bytes = read_variant_bytes(asset, format, storage)?;
        groups.entry(family).or_default().push(FontVariant {
            asset: asset.clone(),
            format,
            bytes,
        });
    }

    log::debug!("Found {} font groups: {:?}", groups.len(), groups.keys());
    let groups = groups
        .into_iter()
        .map(|(family, variants)| FontGroup { family, variants })
        .collect();
    Ok(groups)
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::{asset::AssetId, storage::tests::MockStorage};

    #[test]
    fn parsing_font_format() {
        for format in FontFormat::ALL {
            assert_eq!(format.extension().parse::<FontFormat>().unwrap(), format);
        }
        assert_eq!("WOFF2".parse::<FontFormat>().unwrap(), FontFormat::Woff2);
        assert!("otf".parse::<FontFormat>().is_err());
        assert_eq!(
            FontFormat::from_path(Path::new("fonts/icon.TTF")),
            Some(FontFormat::Ttf)
        );
        assert_eq!(FontFormat::from_path(Path::new("woff")), None);
    }

    #[test]
    fn grouping_fonts_by_family() {
        let assets = [
            Asset::new(AssetId::new(1), "fonts/icon.woff").with_output("woff", b"woff".to_vec()),
            Asset::new(AssetId::new(2), "styles.css").with_output("css", "a {}"),
            Asset::new(AssetId::new(3), "fonts/icon.ttf").with_output("ttf", b"ttf".to_vec()),
            Asset::new(AssetId::new(4), "fonts/brand.svg").with_output("svg", "<svg/>"),
            Asset::new(AssetId::new(5), "logo.svg.png"),
        ];
        let assets: Vec<_> = assets.into_iter().map(Arc::new).collect();
        let storage = MockStorage::default();

        let groups = find_font_groups(&assets, &storage).unwrap();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].family, "brand");
        assert!(groups[0].master().is_none());
        assert_eq!(groups[0].variants[0].bytes.as_ref(), b"<svg/>");

        let icon = &groups[1];
        assert_eq!(icon.family, "icon");
        let formats: Vec<_> = icon.variants.iter().map(|variant| variant.format).collect();
        assert_eq!(formats, [FontFormat::Woff, FontFormat::Ttf]);
        let master = icon.master().unwrap();
        assert_eq!(master.asset.id(), AssetId::new(3));
        assert_eq!(master.bytes.as_ref(), b"ttf");
        assert!(storage.reads.lock().is_empty());
    }

    #[test]
    fn reading_variant_bytes_from_storage() {
        let assets = [
            Asset::new(AssetId::new(1), "fonts/icon.ttf")
                .with_output("ttf", Output::Path("dist/icon.1234.ttf".into())),
            Asset::new(AssetId::new(2), "fonts/icon.woff2"),
        ];
        let assets: Vec<_> = assets.into_iter().map(Arc::new).collect();
        let storage = MockStorage::default()
            .with_file("dist/icon.1234.ttf", b"ttf")
            .with_file("fonts/icon.woff2", b"woff2");

        let groups = find_font_groups(&assets, &storage).unwrap();
        assert_eq!(groups.len(), 1);
        let bytes: Vec<_> = groups[0]
            .variants
            .iter()
            .map(|variant| variant.bytes.as_ref())
            .collect();
        assert_eq!(bytes, [b"ttf".as_slice(), b"woff2".as_slice()]);
        assert_eq!(
            *storage.reads.lock(),
            [PathBuf::from("dist/icon.1234.ttf"), PathBuf::from("fonts/icon.woff2")]
        );
    }

    #[test]
    fn outputs_are_looked_up_by_asset_kind() {
        let assets = [
            Asset::new(AssetId::new(1), "fonts/icon.TTF").with_output("TTF", b"ttf".to_vec()),
            Asset::new(AssetId::new(2), "fonts/icon.Woff2")
                .with_output("woff2", b"woff2".to_vec()),
        ];
        let assets: Vec<_> = assets.into_iter().map(Arc::new).collect();
        let storage = MockStorage::default();

        let groups = find_font_groups(&assets, &storage).unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].master().unwrap().bytes.as_ref(), b"ttf");
        assert!(groups[0].has_format(FontFormat::Woff2));
        assert!(!groups[0].has_format(FontFormat::Eot));
        assert_eq!(groups[0].variants[1].bytes.as_ref(), b"woff2");
        assert!(storage.reads.lock().is_empty());
    }

    #[test]
    fn storage_errors_are_propagated() {
        let assets = [Arc::new(Asset::new(AssetId::new(1), "fonts/missing.eot"))];
        let err = find_font_groups(&assets, &MockStorage::default()).unwrap_err();
        match err {
            PackagerError::Storage { path, source } => {
                assert_eq!(path, Path::new("fonts/missing.eot"));
                assert_eq!(source.kind(), std::io::ErrorKind::NotFound);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
