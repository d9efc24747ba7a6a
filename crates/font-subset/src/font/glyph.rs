//! `glyf` table entries.

use core::iter;

use super::Cursor;
use crate::{errors::ParseErrorKind, ParseError, TableTag};

/// Glyph outline. Only composite glyphs are parsed since they reference other glyphs;
/// simple glyphs are copied verbatim.
#[derive(Debug)]
pub(crate) enum Glyph<'a> {
    Empty,
    Simple(&'a [u8]),
    Composite {
        /// Bounding box: xMin, yMin, xMax, yMax
        bbox: &'a [u8],
        components: Vec<GlyphComponent<'a>>,
        /// Instructions following the last component, if any
        instructions: &'a [u8],
    },
}

impl<'a> Glyph<'a> {
    const BBOX_LEN: usize = 8;

    pub(super) fn new(raw: Cursor<'a>) -> Result<Self, ParseError> {
        let mut cursor = raw;
        if cursor.bytes.is_empty() {
            return Ok(Self::Empty);
        }
        // `numberOfContours` is negative for composite glyphs.
        let contour_count = cursor.read_u16()?;
        if contour_count & 0x8000 == 0 {
            return Ok(Self::Simple(raw.bytes));
        }

        let bbox = cursor.split_at(Self::BBOX_LEN)?.bytes;
        let mut components = vec![];
        let mut has_more = true;
        while has_more {
            let component = GlyphComponent::parse(&mut cursor)?;
            has_more = component.flags & GlyphComponent::MORE_COMPONENTS != 0;
            components.push(component);
        }
        Ok(Self::Composite {
            bbox,
            components,
            instructions: cursor.bytes,
        })
    }

    /// Iterates over glyph indices referenced by this glyph.
    pub(crate) fn component_indices(&self) -> impl Iterator<Item = u16> + '_ {
        let components: &[GlyphComponent<'_>] = match self {
            Self::Composite { components, .. } => components.as_slice(),
            _ => &[],
        };
        components.iter().map(|component| component.glyph_idx)
    }

    /// Rewrites glyph indices referenced by composite components.
    pub(crate) fn remap_components(&mut self, mut map: impl FnMut(u16) -> u16) {
        if let Self::Composite { components, .. } = self {
            for component in components {
                component.glyph_idx = map(component.glyph_idx);
            }
        }
    }
}

/// Component of a composite glyph.
#[derive(Debug)]
pub(crate) struct GlyphComponent<'a> {
    pub(crate) flags: u16,
    pub(crate) glyph_idx: u16,
    /// Arguments and the optional transform, kept as raw bytes.
    pub(crate) tail: &'a [u8],
}

impl<'a> GlyphComponent<'a> {
    const ARG_1_AND_2_ARE_WORDS: u16 = 0x0001;
    const ARGS_ARE_XY_VALUES: u16 = 0x0002;
    const WE_HAVE_A_SCALE: u16 = 0x0008;
    const MORE_COMPONENTS: u16 = 0x0020;
    const WE_HAVE_AN_X_AND_Y_SCALE: u16 = 0x0040;
    const WE_HAVE_A_TWO_BY_TWO: u16 = 0x0080;

    /// Length of the arguments and the transform in bytes.
    fn tail_len(flags: u16) -> usize {
        let args_len = if flags & Self::ARG_1_AND_2_ARE_WORDS == 0 {
            2
        } else {
            4
        };
        let transform_len = if flags & Self::WE_HAVE_A_SCALE != 0 {
            2
        } else if flags & Self::WE_HAVE_AN_X_AND_Y_SCALE != 0 {
            4
        } else if flags & Self::WE_HAVE_A_TWO_BY_TWO != 0 {
            8
        } else {
            0
        };
        args_len + transform_len
    }

    fn parse(cursor: &mut Cursor<'a>) -> Result<Self, ParseError> {
        let flags = cursor.read_u16()?;
        let glyph_idx = cursor.read_u16()?;
        let tail = cursor.split_at(Self::tail_len(flags))?.bytes;
        Ok(Self {
            flags,
            glyph_idx,
            tail,
        })
    }

    /// Returns the transform placing the component into the composite glyph. Components
    /// positioned by matching points are not offset.
    pub(crate) fn transform(&self) -> Transform {
        // The tail length is checked when parsing.
        let word = |pos: usize| i16::from_be_bytes([self.tail[pos], self.tail[pos + 1]]);
        let f2dot14 = |pos: usize| f64::from(word(pos)) / 16_384.0;

        let (dx, dy, transform_start) = if self.flags & Self::ARG_1_AND_2_ARE_WORDS != 0 {
            (f64::from(word(0)), f64::from(word(2)), 4)
        } else {
            let byte = |pos: usize| f64::from(i8::from_be_bytes([self.tail[pos]]));
            (byte(0), byte(1), 2)
        };
        let (dx, dy) = if self.flags & Self::ARGS_ARE_XY_VALUES != 0 {
            (dx, dy)
        } else {
            (0.0, 0.0)
        };

        let pos = transform_start;
        let mut transform = Transform {
            dx,
            dy,
            ..Transform::IDENTITY
        };
        if self.flags & Self::WE_HAVE_A_SCALE != 0 {
            transform.xx = f2dot14(pos);
            transform.yy = transform.xx;
        } else if self.flags & Self::WE_HAVE_AN_X_AND_Y_SCALE != 0 {
            transform.xx = f2dot14(pos);
            transform.yy = f2dot14(pos + 2);
        } else if self.flags & Self::WE_HAVE_A_TWO_BY_TWO != 0 {
            transform.xx = f2dot14(pos);
            transform.xy = f2dot14(pos + 2);
            transform.yx = f2dot14(pos + 4);
            transform.yy = f2dot14(pos + 6);
        }
        transform
    }
}

/// Point of a glyph contour in font units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct OutlinePoint {
    pub(crate) x: f64,
    pub(crate) y: f64,
    pub(crate) on_curve: bool,
}

/// Affine transform mapping `(x, y)` to `(xx * x + yx * y + dx, xy * x + yy * y + dy)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Transform {
    pub(crate) xx: f64,
    pub(crate) xy: f64,
    pub(crate) yx: f64,
    pub(crate) yy: f64,
    pub(crate) dx: f64,
    pub(crate) dy: f64,
}

impl Transform {
    pub(crate) const IDENTITY: Self = Self {
        xx: 1.0,
        xy: 0.0,
        yx: 0.0,
        yy: 1.0,
        dx: 0.0,
        dy: 0.0,
    };

    pub(crate) fn apply(&self, point: OutlinePoint) -> OutlinePoint {
        OutlinePoint {
            x: self.xx * point.x + self.yx * point.y + self.dx,
            y: self.xy * point.x + self.yy * point.y + self.dy,
            on_curve: point.on_curve,
        }
    }

    /// Returns the transform applying `self` and then `outer`.
    pub(crate) fn then(&self, outer: &Self) -> Self {
        Self {
            xx: outer.xx * self.xx + outer.yx * self.xy,
            xy: outer.xy * self.xx + outer.yy * self.xy,
            yx: outer.xx * self.yx + outer.yx * self.yy,
            yy: outer.xy * self.yx + outer.yy * self.yy,
            dx: outer.xx * self.dx + outer.yx * self.dy + outer.dx,
            dy: outer.xy * self.dx + outer.yy * self.dy + outer.dy,
        }
    }
}

/// Decodes contours of a simple glyph.
pub(crate) fn simple_glyph_contours(bytes: &[u8]) -> Result<Vec<Vec<OutlinePoint>>, ParseError> {
    const ON_CURVE: u8 = 0x01;
    const X_SHORT: u8 = 0x02;
    const Y_SHORT: u8 = 0x04;
    const REPEAT: u8 = 0x08;
    const X_SAME_OR_POSITIVE: u8 = 0x10;
    const Y_SAME_OR_POSITIVE: u8 = 0x20;

    let mut cursor = Cursor::new(bytes).for_table(TableTag::GLYF);
    let contour_count = cursor.read_u16()?;
    cursor.skip(8)?; // bounding box
    let end_points = (0..contour_count)
        .map(|_| cursor.read_u16())
        .collect::<Result<Vec<_>, _>>()?;
    let point_count = end_points.last().map_or(0, |&end| usize::from(end) + 1);
    let instructions_len = usize::from(cursor.read_u16()?);
    cursor.skip(instructions_len)?;

    let mut flags = Vec::with_capacity(point_count);
    while flags.len() < point_count {
        let [flag] = cursor.read_byte_array()?;
        let repeat_count = if flag & REPEAT == 0 {
            0
        } else {
            let [count] = cursor.read_byte_array()?;
            usize::from(count)
        };
        flags.extend(iter::repeat_n(flag, repeat_count + 1));
    }
    flags.truncate(point_count);

    let xs = read_coordinates(&mut cursor, &flags, X_SHORT, X_SAME_OR_POSITIVE)?;
    let ys = read_coordinates(&mut cursor, &flags, Y_SHORT, Y_SAME_OR_POSITIVE)?;
    let points: Vec<_> = flags
        .iter()
        .zip(xs.into_iter().zip(ys))
        .map(|(&flag, (x, y))| OutlinePoint {
            x: f64::from(x),
            y: f64::from(y),
            on_curve: flag & ON_CURVE != 0,
        })
        .collect();

    let mut contours = Vec::with_capacity(end_points.len());
    let mut start = 0;
    for end in end_points {
        let end = usize::from(end) + 1;
        let contour = points.get(start..end).ok_or_else(|| {
            cursor.err(ParseErrorKind::RangeOutOfBounds {
                range: start..end,
                len: point_count,
            })
        })?;
        contours.push(contour.to_vec());
        start = end;
    }
    Ok(contours)
}

/// Reads delta-encoded coordinates along a single axis.
fn read_coordinates(
    cursor: &mut Cursor<'_>,
    flags: &[u8],
    short_flag: u8,
    same_or_positive_flag: u8,
) -> Result<Vec<i32>, ParseError> {
    let mut value = 0_i32;
    flags
        .iter()
        .map(|&flag| {
            let delta = if flag & short_flag != 0 {
                let [byte] = cursor.read_byte_array()?;
                if flag & same_or_positive_flag == 0 {
                    -i32::from(byte)
                } else {
                    i32::from(byte)
                }
            } else if flag & same_or_positive_flag != 0 {
                0 // same as the previous coordinate
            } else {
                i32::from(i16::from_be_bytes(cursor.read_byte_array()?))
            };
            value += delta;
            Ok(value)
        })
        .collect()
}

/// [`Glyph`] together with metrics read from the `hmtx` table.
#[derive(Debug)]
pub(crate) struct GlyphWithMetrics<'a> {
    pub(crate) inner: Glyph<'a>,
    pub(crate) advance: u16,
    pub(crate) lsb: u16,
}
