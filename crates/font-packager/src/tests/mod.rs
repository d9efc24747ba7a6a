//! End-to-end tests for the packager.

use std::sync::Arc;

use font_subset::Font;

use crate::{
    Asset, AssetHandler, AssetId, Bundle, CompilationCache, FontPackager, Output, PackagerConfig,
};

pub(crate) const ICON_FONT: &[u8] =
    include_bytes!("../../../font-subset/fonts/DejaVuSansMono.ttf");

const STYLES: &str = r#"
    /* .snowman uses \2603 */
    .heart::before { content: '\2665'; }
    .smile::after { content: "\263a"; }
"#;

fn init_logging() {
    env_logger::builder().is_test(true).try_init().ok();
}

struct IconCompilation {
    main_bundle: Arc<Bundle>,
    styles: Arc<Asset>,
    ttf: Arc<Asset>,
    woff: Arc<Asset>,
    woff2: Arc<Asset>,
    svg: Arc<Asset>,
}

impl IconCompilation {
    fn new() -> Self {
        let styles = Asset::new(AssetId::new(1), "styles.css").with_output("css", STYLES);
        let ttf = Asset::new(AssetId::new(2), "icon.ttf").with_output("ttf", ICON_FONT.to_vec());
        let woff = Asset::new(AssetId::new(3), "icon.woff").with_output("woff", b"woff".to_vec());
        let woff2 =
            Asset::new(AssetId::new(4), "icon.woff2").with_output("woff2", b"woff2".to_vec());
        let svg = Asset::new(AssetId::new(5), "icon.svg").with_output("svg", "<svg/>");
        let [styles, ttf, woff, woff2, svg] = [styles, ttf, woff, woff2, svg].map(Arc::new);

        let font_bundles = [&ttf, &woff, &woff2, &svg]
            .map(|font| Arc::new(Bundle::new(font.kind()).with_entry_asset(font.clone())));
        let main_bundle = Bundle::new("css").with_entry_asset(styles.clone());
        for bundle in font_bundles {
            main_bundle.add_child(bundle);
        }

        Self {
            main_bundle: Arc::new(main_bundle),
            styles,
            ttf,
            woff,
            woff2,
            svg,
        }
    }

    fn packager(&self, config: PackagerConfig) -> FontPackager {
        FontPackager::new(self.main_bundle.clone(), config)
    }
}

fn bytes(output: Output) -> Arc<[u8]> {
    match output {
        Output::Bytes(bytes) => bytes,
        other => panic!("unexpected output: {other:?}"),
    }
}

#[test]
fn minifying_icon_fonts() {
    init_logging();
    let compilation = IconCompilation::new();
    let packager = compilation.packager(PackagerConfig::production());

    let ttf = bytes(packager.handle_asset(&compilation.ttf, "ttf").unwrap());
    assert!(ttf.len() < ICON_FONT.len());
    let font = Font::new(&ttf).unwrap();
    assert_ne!(font.map_char('\u{2665}').unwrap(), 0);
    assert_ne!(font.map_char('\u{263a}').unwrap(), 0);
    // Only referenced from a comment.
    assert_eq!(font.map_char('\u{2603}').unwrap(), 0);
    assert_eq!(font.glyph_count(), 3);

    let woff = bytes(packager.handle_asset(&compilation.woff, "woff").unwrap());
    assert_eq!(&woff[..4], b"wOFF");
    let woff2 = bytes(packager.handle_asset(&compilation.woff2, "woff2").unwrap());
    assert_eq!(*woff2, *font_subset::compress_woff2(&ttf).unwrap());
    let svg = bytes(packager.handle_asset(&compilation.svg, "svg").unwrap());
    let svg = std::str::from_utf8(&svg).unwrap();
    assert!(svg.contains("<font-face font-family=\"DejaVu Sans Mono\""));
    assert_eq!(svg.matches("<glyph ").count(), 2);

    let styles = packager.handle_asset(&compilation.styles, "css").unwrap();
    assert_eq!(styles, Output::Text(STYLES.to_owned()));
}

#[test]
fn development_builds_keep_fonts_intact() {
    init_logging();
    let compilation = IconCompilation::new();
    let packager = compilation.packager(PackagerConfig::default());

    let ttf = bytes(packager.handle_asset(&compilation.ttf, "ttf").unwrap());
    assert_eq!(ttf.as_ref(), ICON_FONT);
    let woff2 = bytes(packager.handle_asset(&compilation.woff2, "woff2").unwrap());
    assert_eq!(woff2.as_ref(), b"woff2");
}

#[test]
fn packagers_share_compilation_cache() {
    init_logging();
    let compilation = IconCompilation::new();
    let cache = Arc::new(CompilationCache::new());
    let first = compilation
        .packager(PackagerConfig::production())
        .with_cache(cache.clone());
    let second = compilation
        .packager(PackagerConfig::production())
        .with_cache(cache.clone());

    let fonts = first.minified_fonts().unwrap();
    assert_eq!(fonts.len(), 4);
    assert!(Arc::ptr_eq(&fonts, &second.minified_fonts().unwrap()));

    let assets = cache.collect_all_assets(&compilation.main_bundle);
    assert_eq!(assets.len(), 5);
    let glyphs = cache.find_glyphs(&compilation.main_bundle);
    assert_eq!(glyphs.iter().copied().collect::<String>(), "\u{263a}\u{2665}");
}
