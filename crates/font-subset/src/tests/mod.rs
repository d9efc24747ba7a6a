use std::{
    collections::BTreeSet, env, fmt, io::Write, iter, ops, process::Command, sync::OnceLock,
};

use allsorts::{binary::read::ReadScope, font::MatchingPresentation, font_data::FontData};
use test_casing::{test_casing, Product};

use crate::{Font, FontSubset, ParseErrorKind};

#[derive(Clone, Copy)]
pub(crate) struct TestFont {
    pub(crate) name: &'static str,
    pub(crate) bytes: &'static [u8],
}

impl fmt::Debug for TestFont {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.name, formatter)
    }
}

pub(crate) const MONO_FONT: TestFont = TestFont {
    name: "DejaVu Sans Mono",
    bytes: include_bytes!("../../fonts/DejaVuSansMono.ttf"),
};
/// Uses the short `loca` format, unlike `MONO_FONT`.
const SANS_FONT: TestFont = TestFont {
    name: "DejaVu Sans ExtraLight",
    bytes: include_bytes!("../../fonts/DejaVuSans-ExtraLight.ttf"),
};

pub(crate) const FONTS: [TestFont; 2] = [MONO_FONT, SANS_FONT];

#[derive(Debug, Clone)]
pub(crate) enum TestCharSubset {
    Range(ops::RangeInclusive<char>),
    Str(&'static str),
}

impl TestCharSubset {
    pub(crate) fn into_set(self) -> BTreeSet<char> {
        match self {
            Self::Range(range) => range.collect(),
            Self::Str(s) => s.chars().collect(),
        }
    }
}

pub(crate) const SUBSET_CHARS: [TestCharSubset; 5] = [
    TestCharSubset::Range(' '..='~'),
    TestCharSubset::Range('a'..='z'),
    TestCharSubset::Range('0'..='9'),
    TestCharSubset::Str("Hello world!"),
    TestCharSubset::Str("A"),
];

#[derive(Debug)]
struct OpenTypeSanitizer {
    path: Option<String>,
}

impl Default for OpenTypeSanitizer {
    fn default() -> Self {
        let Ok(path) = env::var("OTS_SANITIZER") else {
            return Self { path: None };
        };
        let output = Command::new(&path)
            .arg("--version")
            .output()
            .unwrap_or_else(|err| {
                panic!("failed getting version for ots-sanitize at {path}: {err}");
            });
        assert!(
            output.status.success(),
            "failed getting version for ots-sanitize at {path}: non-zero exit code"
        );
        let version = String::from_utf8(output.stdout).unwrap_or_else(|err| {
            panic!("failed getting version for ots-sanitize at {path}: {err}");
        });
        println!("ots-sanitize version: {version}");
        Self { path: Some(path) }
    }
}

impl OpenTypeSanitizer {
    fn get() -> &'static Self {
        static SANITIZER: OnceLock<OpenTypeSanitizer> = OnceLock::new();
        SANITIZER.get_or_init(Self::default)
    }

    fn validate(&self, content: &[u8]) {
        let Some(path) = &self.path else {
            println!("OTS_SANITIZER env var is missing; skipping checks");
            return;
        };

        // Save content to the temporary file.
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.as_file_mut().write_all(content).unwrap();
        file.as_file_mut().flush().unwrap();
        let file_path = file.into_temp_path();

        let output = Command::new(path)
            .arg(&file_path)
            .output()
            .expect("failed running ots-sanitize");
        if !output.status.success() {
            let stdout = String::from_utf8_lossy(&output.stdout);
            let stderr = String::from_utf8_lossy(&output.stderr);
            panic!("ots-sanitize failed:\n--- stdout ---\n{stdout}\n--- stderr ---\n{stderr}");
        }
    }
}

#[test]
fn reading_font() {
    let font = Font::new(MONO_FONT.bytes).unwrap();

    let font_file = ReadScope::new(MONO_FONT.bytes).read::<FontData>().unwrap();
    let font_provider = font_file.table_provider(0).unwrap();
    let mut reference_font = allsorts::Font::new(font_provider).unwrap();

    let test_str = "Hello, world! More text ├└█▒";
    let mut glyph_ids = vec![];
    for ch in test_str.chars() {
        let id = font.map_char(ch).unwrap();
        let (expected_idx, _) =
            reference_font.lookup_glyph_index(ch, MatchingPresentation::NotRequired, None);
        assert_eq!(id, expected_idx);
        glyph_ids.push(id);
    }
}

#[test_casing(10, Product((FONTS, SUBSET_CHARS)))]
fn subsetting_font(test_font: TestFont, chars: TestCharSubset) {
    let chars = chars.into_set();
    let font = Font::new(test_font.bytes).unwrap();
    let subset = FontSubset::new(font, &chars).unwrap();
    assert_eq!(subset.chars().collect::<BTreeSet<_>>(), chars);

    let ttf = subset.to_truetype();
    assert_valid_font(&ttf, true, chars.iter().copied());
    let woff = subset.to_woff();
    assert_valid_font(&woff, false, chars.iter().copied());
    let woff2 = subset.to_woff2();
    assert_valid_font(&woff2, false, chars.iter().copied());
    assert!(ttf.len() < test_font.bytes.len());

    let svg = subset.to_svg().unwrap();
    assert_eq!(svg.matches("<glyph ").count(), chars.len());
}

#[test]
fn subsetting_font_with_symbols() {
    let chars = "\u{2665}\u{263a}\u{2192}";
    let subset = subset_of(MONO_FONT, chars);
    assert_eq!(subset.glyph_count(), 4);
    assert_valid_font(&subset.to_truetype(), true, chars.chars());
}

#[test]
fn missing_chars_are_skipped() {
    // ExtraLight has no dingbats.
    let subset = subset_of(SANS_FONT, "A\u{2665}");
    assert_eq!(subset.chars().collect::<String>(), "A");
    assert_eq!(subset.glyph_count(), 2);

    let subset = subset_of(MONO_FONT, "\u{f101}");
    assert_eq!(subset.chars().count(), 0);
    assert_eq!(subset.glyph_count(), 1);
}

#[test]
fn empty_subset_is_valid_font() {
    let subset = subset_of(MONO_FONT, "");
    assert_eq!(subset.glyph_count(), 1); // only `.notdef`
    let ttf = subset.to_truetype();
    assert_valid_font(&ttf, true, iter::empty());
}

#[test_casing(2, FONTS)]
fn composite_glyphs_pull_in_components(font: TestFont) {
    let subset = subset_of(font, "\u{e9}");
    // `.notdef`, the composite glyph and at least one component
    assert!(subset.glyph_count() >= 3, "{}", subset.glyph_count());

    let ttf = subset.to_truetype();
    assert_valid_font(&ttf, true, ['\u{e9}'].into_iter());
    let reread = Font::new(&ttf).unwrap();
    for idx in 0..reread.glyph_count() {
        reread.glyph(idx).unwrap();
    }
}

#[test]
fn truncated_font_is_rejected() {
    let err = Font::new(&MONO_FONT.bytes[..100]).unwrap_err();
    assert!(
        matches!(
            err.kind(),
            ParseErrorKind::UnexpectedEof | ParseErrorKind::RangeOutOfBounds { .. }
        ),
        "{err}"
    );

    let err = Font::new(b"wOFF\0\0\0\0").unwrap_err();
    assert!(matches!(
        err.kind(),
        ParseErrorKind::UnexpectedFontVersion(0x_774f_4646)
    ));
}

pub(crate) fn subset_of(font: TestFont, chars: &str) -> FontSubset<'static> {
    let font = Font::new(font.bytes).unwrap();
    FontSubset::new(font, &chars.chars().collect()).unwrap()
}

pub(crate) fn assert_valid_font(raw: &[u8], is_ttf: bool, expected_chars: impl Iterator<Item = char>) {
    if is_ttf {
        Font::new(raw).unwrap();
    }

    let font_file = ReadScope::new(raw).read::<FontData>().unwrap();
    let font_provider = font_file.table_provider(0).unwrap();
    let mut font = allsorts::Font::new(font_provider).unwrap();
    for ch in expected_chars {
        let (glyph_id, _) = font.lookup_glyph_index(ch, MatchingPresentation::NotRequired, None);
        assert_ne!(glyph_id, 0);
    }

    OpenTypeSanitizer::get().validate(raw);
}
