//! SVG font container (`<font>` element of SVG 1.1) for legacy WebKit browsers.
//!
//! Outlines keep TrueType quadratic curves and font units; SVG fonts use the same y-up
//! coordinate system as `glyf`, so no flipping is required.

use core::fmt::Write as _;

use super::eot::{find_name, FAMILY_NAME_ID};
use crate::{
    errors::ParseErrorKind,
    font::{simple_glyph_contours, Glyph, OutlinePoint, Transform},
    FontSubset, ParseError, TableTag,
};

const MAX_COMPONENT_DEPTH: usize = 16;
const DEFAULT_FAMILY: &str = "font";

/// Escapes a string for use in an XML attribute.
fn escape_attr(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

/// Normalizes `-0` to `0` so that it is not printed with a sign.
fn coord(value: f64) -> f64 {
    value + 0.0
}

fn midpoint(a: OutlinePoint, b: OutlinePoint) -> OutlinePoint {
    OutlinePoint {
        x: (a.x + b.x) / 2.0,
        y: (a.y + b.y) / 2.0,
        on_curve: true,
    }
}

/// Appends path commands for a closed quadratic contour. Consecutive off-curve points
/// imply an on-curve point in the middle.
fn write_contour(path: &mut String, points: &[OutlinePoint]) {
    let (Some(&first), Some(&last)) = (points.first(), points.last()) else {
        return;
    };
    let (start, rest) = if first.on_curve {
        (first, &points[1..])
    } else if last.on_curve {
        (last, &points[..points.len() - 1])
    } else {
        (midpoint(first, last), points)
    };

    // Writing to a `String` is infallible.
    write!(path, "M{} {}", coord(start.x), coord(start.y)).ok();
    let mut control: Option<OutlinePoint> = None;
    for &point in rest {
        match (point.on_curve, control) {
            (true, Some(ctrl)) => {
                write!(
                    path,
                    "Q{} {} {} {}",
                    coord(ctrl.x),
                    coord(ctrl.y),
                    coord(point.x),
                    coord(point.y)
                )
                .ok();
                control = None;
            }
            (true, None) => {
                write!(path, "L{} {}", coord(point.x), coord(point.y)).ok();
            }
            (false, Some(ctrl)) => {
                let mid = midpoint(ctrl, point);
                write!(
                    path,
                    "Q{} {} {} {}",
                    coord(ctrl.x),
                    coord(ctrl.y),
                    coord(mid.x),
                    coord(mid.y)
                )
                .ok();
                control = Some(point);
            }
            (false, None) => {
                control = Some(point);
            }
        }
    }
    if let Some(ctrl) = control {
        write!(
            path,
            "Q{} {} {} {}",
            coord(ctrl.x),
            coord(ctrl.y),
            coord(start.x),
            coord(start.y)
        )
        .ok();
    }
    path.push('Z');
}

impl FontSubset<'_> {
    /// Appends the outline of a subset glyph, flattening composite glyphs.
    fn write_glyph_path(
        &self,
        path: &mut String,
        glyph_idx: u16,
        transform: &Transform,
        depth: usize,
    ) -> Result<(), ParseError> {
        if depth > MAX_COMPONENT_DEPTH {
            return Err(ParseError {
                kind: ParseErrorKind::CompositeTooDeep,
                offset: 0,
                table: Some(TableTag::GLYF),
            });
        }
        let glyph = self.glyphs.get(usize::from(glyph_idx)).ok_or(ParseError {
            kind: ParseErrorKind::RangeOutOfBounds {
                range: usize::from(glyph_idx)..usize::from(glyph_idx) + 1,
                len: self.glyphs.len(),
            },
            offset: 0,
            table: Some(TableTag::GLYF),
        })?;

        match &glyph.inner {
            Glyph::Empty => {}
            Glyph::Simple(bytes) => {
                for contour in simple_glyph_contours(bytes)? {
                    let contour: Vec<_> = contour
                        .into_iter()
                        .map(|point| transform.apply(point))
                        .collect();
                    write_contour(path, &contour);
                }
            }
            Glyph::Composite { components, .. } => {
                for component in components {
                    let component_transform = component.transform().then(transform);
                    self.write_glyph_path(
                        path,
                        component.glyph_idx,
                        &component_transform,
                        depth + 1,
                    )?;
                }
            }
        }
        Ok(())
    }

    fn glyph_path(&self, glyph_idx: u16) -> Result<String, ParseError> {
        let mut path = String::new();
        self.write_glyph_path(&mut path, glyph_idx, &Transform::IDENTITY, 0)?;
        Ok(path)
    }

    fn family_name(&self) -> String {
        // A malformed `name` table only results in the default name.
        let utf16_be = find_name(self.font.name, FAMILY_NAME_ID).ok().flatten();
        let name = utf16_be.map(|bytes| {
            let units = bytes
                .chunks_exact(2)
                .map(|pair| u16::from_be_bytes([pair[0], pair[1]]));
            char::decode_utf16(units)
                .map(|ch| ch.unwrap_or(char::REPLACEMENT_CHARACTER))
                .collect::<String>()
        });
        match name {
            Some(name) if !name.is_empty() => name,
            _ => DEFAULT_FAMILY.to_owned(),
        }
    }

    /// Serializes this subset to an SVG font (`.svg`) used by legacy WebKit browsers.
    ///
    /// Only outlines and horizontal advances are retained; hinting and kerning are dropped.
    ///
    /// # Errors
    ///
    /// Returns an error if glyph outlines in the subset are malformed.
    pub fn to_svg(&self) -> Result<String, ParseError> {
        const UNITS_PER_EM_OFFSET: usize = 18;
        const ASCENDER_OFFSET: usize = 4;
        const DESCENDER_OFFSET: usize = 6;

        // `head` and `hhea` lengths are checked when parsing the font.
        let head = self.font.head;
        let units_per_em =
            u16::from_be_bytes([head[UNITS_PER_EM_OFFSET], head[UNITS_PER_EM_OFFSET + 1]]);
        let hhea = self.font.hhea.raw;
        let ascent = i16::from_be_bytes([hhea[ASCENDER_OFFSET], hhea[ASCENDER_OFFSET + 1]]);
        let descent = i16::from_be_bytes([hhea[DESCENDER_OFFSET], hhea[DESCENDER_OFFSET + 1]]);

        let family = escape_attr(&self.family_name());
        let default_advance = self.glyphs[0].advance;

        let mut svg = String::new();
        svg.push_str("<?xml version=\"1.0\" standalone=\"no\"?>\n");
        svg.push_str(
            "<!DOCTYPE svg PUBLIC \"-//W3C//DTD SVG 1.1//EN\" \
             \"http://www.w3.org/Graphics/SVG/1.1/DTD/svg11.dtd\">\n",
        );
        svg.push_str("<svg xmlns=\"http://www.w3.org/2000/svg\">\n<defs>\n");
        writeln!(svg, "<font id=\"{family}\" horiz-adv-x=\"{default_advance}\">").ok();
        writeln!(
            svg,
            "<font-face font-family=\"{family}\" units-per-em=\"{units_per_em}\" \
             ascent=\"{ascent}\" descent=\"{descent}\"/>"
        )
        .ok();

        let missing_path = self.glyph_path(0)?;
        write!(svg, "<missing-glyph horiz-adv-x=\"{default_advance}\"").ok();
        write_path_attr(&mut svg, &missing_path);
        svg.push_str("/>\n");

        for &(ch, glyph_idx) in &self.char_map {
            let path = self.glyph_path(glyph_idx)?;
            let advance = self.glyphs[usize::from(glyph_idx)].advance;
            let code = u32::from(ch);
            write!(
                svg,
                "<glyph glyph-name=\"uni{code:04X}\" unicode=\"&#x{code:x};\" \
                 horiz-adv-x=\"{advance}\""
            )
            .ok();
            write_path_attr(&mut svg, &path);
            svg.push_str("/>\n");
        }
        svg.push_str("</font>\n</defs>\n</svg>\n");
        Ok(svg)
    }
}

fn write_path_attr(svg: &mut String, path: &str) {
    if !path.is_empty() {
        write!(svg, " d=\"{path}\"").ok();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        font::Cursor,
        tests::{subset_of, MONO_FONT},
        Font,
    };

    fn on(x: f64, y: f64) -> OutlinePoint {
        OutlinePoint {
            x,
            y,
            on_curve: true,
        }
    }

    fn off(x: f64, y: f64) -> OutlinePoint {
        OutlinePoint {
            x,
            y,
            on_curve: false,
        }
    }

    /// Returns `(unicode, d)` attributes of `<glyph>` elements.
    fn read_glyphs(svg: &str) -> Vec<(String, Option<String>)> {
        let attr = |element: &str, name: &str| {
            let start = element.find(&format!(" {name}=\""))? + name.len() + 3;
            let len = element[start..].find('"')?;
            Some(element[start..start + len].to_owned())
        };
        svg.split("<glyph ")
            .skip(1)
            .map(|element| {
                let element = &element[..element.find("/>").unwrap()];
                let element = format!(" {element}");
                (attr(&element, "unicode").unwrap(), attr(&element, "d"))
            })
            .collect()
    }

    fn contour_count(font: &Font<'_>, glyph_idx: u16) -> usize {
        let glyph = font.glyph(glyph_idx).unwrap();
        match &glyph.inner {
            Glyph::Empty => 0,
            Glyph::Simple(bytes) => usize::from(Cursor::new(bytes).read_u16().unwrap()),
            Glyph::Composite { .. } => glyph
                .inner
                .component_indices()
                .map(|idx| contour_count(font, idx))
                .sum(),
        }
    }

    #[test]
    fn contour_with_on_curve_points() {
        let mut path = String::new();
        write_contour(
            &mut path,
            &[on(0.0, 0.0), on(100.0, 0.0), on(100.0, 100.0), on(0.0, 100.0)],
        );
        assert_eq!(path, "M0 0L100 0L100 100L0 100Z");
    }

    #[test]
    fn contour_with_implied_on_curve_points() {
        let mut path = String::new();
        let points = [off(0.0, 0.0), off(10.0, 0.0), off(10.0, 10.0), off(0.0, 10.0)];
        write_contour(&mut path, &points);
        assert_eq!(path, "M0 5Q0 0 5 0Q10 0 10 5Q10 10 5 10Q0 10 0 5Z");

        path.clear();
        let points = [off(0.0, 0.0), on(10.0, 0.0), off(10.0, 10.0), on(-1.5, 10.0)];
        write_contour(&mut path, &points);
        assert_eq!(path, "M-1.5 10Q0 0 10 0Q10 10 -1.5 10Z");
    }

    #[test]
    fn composite_transforms_compose() {
        let scale = Transform {
            xx: 2.0,
            yy: 2.0,
            ..Transform::IDENTITY
        };
        let shift = Transform {
            dx: 10.0,
            dy: -5.0,
            ..Transform::IDENTITY
        };
        let point = scale.then(&shift).apply(on(1.0, 1.0));
        assert_eq!((point.x, point.y), (12.0, -3.0));
        let point = shift.then(&scale).apply(on(1.0, 1.0));
        assert_eq!((point.x, point.y), (22.0, -8.0));
    }

    #[test]
    fn svg_font_lists_subset_glyphs() {
        let chars = "AI l\u{2665}";
        let subset = subset_of(MONO_FONT, chars);
        let svg = subset.to_svg().unwrap();
        assert!(svg.starts_with("<?xml"));
        assert!(svg.contains("<font-face font-family=\"DejaVu Sans Mono\" units-per-em=\"2048\""));
        assert_eq!(svg.matches("<missing-glyph ").count(), 1);

        let glyphs = read_glyphs(&svg);
        assert_eq!(glyphs.len(), subset.chars().count());
        let unicodes: Vec<_> = glyphs.iter().map(|(unicode, _)| unicode.as_str()).collect();
        assert_eq!(unicodes, ["&#x20;", "&#x41;", "&#x49;", "&#x6c;", "&#x2665;"]);

        let font = Font::new(MONO_FONT.bytes).unwrap();
        for (ch, (_, path)) in subset.chars().zip(&glyphs) {
            if ch == ' ' {
                assert_eq!(*path, None);
                continue;
            }
            let path = path.as_deref().unwrap();
            assert!(path.starts_with('M'), "{path}");
            assert!(path.ends_with('Z'), "{path}");
            let expected_count = contour_count(&font, font.map_char(ch).unwrap());
            assert_eq!(path.matches('M').count(), expected_count, "{ch}");
        }
    }

    #[test]
    fn composite_glyphs_are_flattened() {
        let font = Font::new(MONO_FONT.bytes).unwrap();
        let glyph_idx = font.map_char('\u{e9}').unwrap();
        let glyph = font.glyph(glyph_idx).unwrap();
        assert!(matches!(glyph.inner, Glyph::Composite { .. }));

        let subset = subset_of(MONO_FONT, "\u{e9}");
        let svg = subset.to_svg().unwrap();
        let glyphs = read_glyphs(&svg);
        assert_eq!(glyphs.len(), 1);
        let (unicode, path) = &glyphs[0];
        assert_eq!(unicode, "&#xe9;");
        let path = path.as_deref().unwrap();
        assert_eq!(path.matches('M').count(), contour_count(&font, glyph_idx));
        assert!(path.matches('M').count() >= 2, "{path}");
    }

    #[test]
    fn family_names_are_escaped() {
        assert_eq!(escape_attr("A&B \"<x>\""), "A&amp;B &quot;&lt;x&gt;&quot;");
    }
}
