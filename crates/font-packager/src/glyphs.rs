//! Discovery of glyphs referenced from generated CSS content.

use std::{
    collections::BTreeSet,
    sync::{Arc, OnceLock},
};

use regex::Regex;

use crate::asset::Asset;

/// Set of chars referenced by the compiled output.
pub type GlyphSet = BTreeSet<char>;

/// Textual outputs scanned for glyph references.
const SCANNED_TARGETS: [&str; 3] = ["css", "js", "html"];

fn content_regex() -> &'static Regex {
    static CONTENT_RE: OnceLock<Regex> = OnceLock::new();
    CONTENT_RE.get_or_init(|| {
        Regex::new(r#"content\s*:[^};]*?('|")(.*?)\s*('|"|;)"#).expect("valid regex")
    })
}

fn escape_regex() -> &'static Regex {
    static ESCAPE_RE: OnceLock<Regex> = OnceLock::new();
    ESCAPE_RE.get_or_init(|| Regex::new(r"\\([0-9a-fA-F]{4})").expect("valid regex"))
}

/// Adds chars referenced via `\XXXX` escapes in `content` declarations of `text` to `glyphs`.
pub fn extract_glyphs(text: &str, glyphs: &mut GlyphSet) {
    for declaration in content_regex().captures_iter(text) {
        let Some(payload) = declaration.get(2) else {
            continue;
        };
        for escape in escape_regex().captures_iter(payload.as_str()) {
            let code_point =
                u32::from_str_radix(&escape[1], 16).expect("4 hex digits fit into u32");
            // Surrogates do not correspond to chars.
            if let Some(ch) = char::from_u32(code_point) {
                glyphs.insert(ch);
            }
        }
    }
}

/// Finds all glyphs referenced from the `css`, `js` and `html` outputs of the assets.
/// Binary outputs and path references are ignored.
pub fn find_glyphs(assets: &[Arc<Asset>]) -> GlyphSet {
    let mut glyphs = GlyphSet::new();
    for asset in assets {
        for target in SCANNED_TARGETS {
            if let Some(output) = asset.output(target) {
                if let Some(text) = output.as_text() {
                    extract_glyphs(text, &mut glyphs);
                }
            }
        }
    }
    log::debug!("Found {} glyphs: {glyphs:?}", glyphs.len());
    glyphs
}

#[cfg(test)]
mod tests {
    use test_casing::test_casing;

    use super::*;
    use crate::asset::{AssetId, Output};

    fn glyphs_in(text: &str) -> Vec<char> {
        let mut glyphs = GlyphSet::new();
        extract_glyphs(text, &mut glyphs);
        glyphs.into_iter().collect()
    }

    #[test_casing(6, [
        (r".icon:before { content: '\f101'; }", "\u{f101}"),
        (r#".icon:before { content: "\f101" }"#, "\u{f101}"),
        (r".a:after{content:'\E900'}", "\u{e900}"),
        (
            r".b::before { content : '\2665'; } .c::before { content: '\263a'; }",
            "\u{263a}\u{2665}",
        ),
        (r".d::before { content: '\2192\2190'; }", "\u{2190}\u{2192}"),
        (r#"const css = ".i::before { content: '\\e001' }";"#, "\u{e001}"),
    ])]
    fn extracting_glyphs(text: &str, expected: &str) {
        assert_eq!(glyphs_in(text), expected.chars().collect::<Vec<_>>());
    }

    #[test_casing(5, [
        ".a::before { content: 'plain text'; }",
        ".a::before { content: ''; }",
        r"/* \2603 */ .a { color: red; }",
        r".a::before { color: '\2603'; }",
        r".a::before { content: '\d800'; }",
    ])]
    fn ignoring_non_glyph_content(text: &str) {
        assert!(glyphs_in(text).is_empty());
    }

    #[test]
    fn escape_requires_four_hex_digits() {
        assert!(glyphs_in(r".a::before { content: '\26'; }").is_empty());
        // Only the first four digits are used.
        assert_eq!(glyphs_in(r".a::before { content: '\f1012'; }"), ['\u{f101}']);
    }

    #[test]
    fn finding_glyphs_across_assets() {
        let assets = [
            Asset::new(AssetId::new(1), "styles.css")
                .with_output("css", r".a::before { content: '\e001'; }"),
            Asset::new(AssetId::new(2), "index.js")
                .with_output("js", r#"const css = ".b::before { content: '\\e002' }";"#),
            Asset::new(AssetId::new(3), "index.html")
                .with_output("html", r#"<style>.c::before { content: "\e003"; }</style>"#),
            Asset::new(AssetId::new(4), "other.txt")
                .with_output("txt", r".d::before { content: '\e004'; }"),
            Asset::new(AssetId::new(5), "binary.css").with_output(
                "css",
                Output::Bytes(b".e::before { content: '\\e005'; }".as_slice().into()),
            ),
        ];
        let assets: Vec<_> = assets.into_iter().map(Arc::new).collect();

        let glyphs = find_glyphs(&assets);
        assert_eq!(
            glyphs.into_iter().collect::<String>(),
            "\u{e001}\u{e002}\u{e003}"
        );
    }
}
