//! Label placement and font fitting for ring cells.

use crate::engine::{CompassEngine, GroupLayout, LookupError};
use bearing::Point;
use palette::Srgba;

pub const MIN_FONT: f64 = 10.0;
pub const MAX_FONT: f64 = 24.0;
/// Share of the available room a glyph may take.
const LABEL_FILL: f64 = 0.85;

/// Font size for a label of `chars` glyphs given `arc` pixels along the ring
/// and `radial` pixels across it.
///
/// Starts from `base` clamped to [`MIN_FONT`, `MAX_FONT`] and shrinks further
/// when the room per glyph is smaller, so neighbours never touch.
pub fn fit_font_size(base: f64, chars: usize, arc: f64, radial: f64) -> f64 {
    let per_char = arc / chars.max(1) as f64;
    base.clamp(MIN_FONT, MAX_FONT)
        .min(per_char * LABEL_FILL)
        .min(radial * LABEL_FILL)
        .max(0.0)
}

#[derive(Debug, Clone, PartialEq)]
pub struct LabelPlacement {
    pub text: String,
    pub position: Point,
    /// Degrees about `position`.
    pub rotation: f64,
    pub font_size: f64,
    pub color: Srgba<f64>,
}

/// Where one glyph string goes inside its cell.
struct Slot {
    angle: f64,
    radius: f64,
    /// Angular room, degrees.
    span: f64,
    /// Radial room, pixels.
    depth: f64,
}

/// Places every label of ring `ring_index` in the unrotated dial frame.
pub fn place_ring(
    engine: &CompassEngine,
    ring_index: usize,
    default_color: Srgba<f64>,
) -> Result<Vec<LabelPlacement>, LookupError> {
    let ring = engine.ring(ring_index)?;
    let inner = engine.ring_radius(ring_index)?;
    let height = engine.ring_height(ring_index)?;
    let center = engine.config().center;
    let slice = ring.slice_width();

    let mut out = Vec::new();
    for (i, cell) in ring.cells.iter().enumerate() {
        let mid = engine.cell_midpoint(ring_index, i)?;
        let glyphs = cell.glyphs();
        let m = glyphs.len().max(1) as f64;

        for (j, glyph) in glyphs.iter().enumerate() {
            if glyph.is_empty() {
                continue;
            }
            let slot = match (cell.is_group(), ring.group_layout) {
                (true, GroupLayout::Nested) => Slot {
                    angle: mid,
                    radius: inner + height - (j as f64 + 0.5) * height / m,
                    span: slice,
                    depth: height / m,
                },
                (true, _) => Slot {
                    angle: mid - slice / 2.0 + (j as f64 + 0.5) * slice / m,
                    radius: inner + height / 2.0,
                    span: slice / m,
                    depth: height,
                },
                (false, _) => Slot {
                    angle: mid,
                    radius: inner + height / 2.0,
                    span: slice,
                    depth: height,
                },
            };
            let color = ring
                .text_color
                .as_ref()
                .and_then(|c| c.for_member(j))
                .unwrap_or(default_color);
            place_glyph(
                &mut out,
                glyph.as_str(),
                center,
                &slot,
                ring.vertical,
                ring.font_size,
                color,
            );
        }
    }
    Ok(out)
}

fn place_glyph(
    out: &mut Vec<LabelPlacement>,
    text: &str,
    center: Point,
    slot: &Slot,
    vertical: bool,
    base: f64,
    color: Srgba<f64>,
) {
    let arc = slot.span.to_radians() * slot.radius;
    let chars = text.chars().count();

    if !vertical {
        out.push(LabelPlacement {
            text: text.to_string(),
            position: center.polar(slot.radius, slot.angle),
            rotation: 0.0,
            font_size: fit_font_size(base, chars, arc, slot.depth),
            color,
        });
        return;
    }

    // glyphs stack outward-to-inward along the radius, upright pointing out
    let step = slot.depth / chars.max(1) as f64;
    let font_size = fit_font_size(base, 1, arc, step);
    let top = slot.radius + slot.depth / 2.0;
    for (k, ch) in text.chars().enumerate() {
        let radius = top - (k as f64 + 0.5) * step;
        out.push(LabelPlacement {
            text: ch.to_string(),
            position: center.polar(radius, slot.angle),
            rotation: slot.angle,
            font_size,
            color,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{Cell, CompassLayout, RingLabel, RingSpec};

    fn white() -> Srgba<f64> {
        Srgba::new(1.0, 1.0, 1.0, 1.0)
    }

    fn engine_with(spec: RingSpec) -> CompassEngine {
        let mut engine = CompassEngine::new(CompassLayout::default());
        engine.set_compass_data(vec![spec.label(RingLabel::Single("t".into()))]);
        engine
    }

    #[test]
    fn test_fit_font_size_clamps_and_shrinks() {
        assert_eq!(fit_font_size(40.0, 1, 1000.0, 1000.0), MAX_FONT);
        assert_eq!(fit_font_size(4.0, 1, 1000.0, 1000.0), MIN_FONT);
        assert_eq!(fit_font_size(16.0, 1, 100.0, 100.0), 16.0);
        // four glyphs in 40px leave 10px each
        assert!((fit_font_size(16.0, 4, 40.0, 100.0) - 8.5).abs() < 1e-9);
        // radial room caps it too
        assert!((fit_font_size(16.0, 1, 100.0, 10.0) - 8.5).abs() < 1e-9);
    }

    #[test]
    fn test_default_labels_never_overlap() {
        let engine = CompassEngine::default();
        for ring in 0..engine.ring_count() {
            let labels = place_ring(&engine, ring, white()).unwrap();
            let def = engine.ring(ring).unwrap();
            let cells = def.cell_count() as f64;
            for l in &labels {
                let r = engine.config().center.distance(l.position);
                let room = (360.0 / cells).to_radians() * r;
                let width = l.font_size * l.text.chars().count() as f64;
                assert!(width < room, "ring {ring} '{}' {width} >= {room}", l.text);
            }
        }
    }

    #[test]
    fn test_label_sits_at_cell_midpoint() {
        let engine = engine_with(RingSpec::new(["北", "东", "南", "西"]).start_angle(45.0));
        let labels = place_ring(&engine, 0, white()).unwrap();
        let center = engine.config().center;
        let mid_r = engine.ring_mid_radius(0).unwrap();

        let north = &labels[0];
        assert_eq!(north.text, "北");
        assert!((north.position.x - center.x).abs() < 1e-9);
        assert!((north.position.y - (center.y - mid_r)).abs() < 1e-9);
        assert_eq!(north.rotation, 0.0);
    }

    #[test]
    fn test_equal_split_divides_slice() {
        let engine = engine_with(
            RingSpec::new([Cell::group(["甲", "乙"]), Cell::group(["丙", "丁"])])
                .group_layout(GroupLayout::EqualSplit),
        );
        let labels = place_ring(&engine, 0, white()).unwrap();
        let center = engine.config().center;
        let r = engine.ring_mid_radius(0).unwrap();
        // slice 180, cell 0 centered at 90 -> members at 45 and 135
        let expect = [center.polar(r, 45.0), center.polar(r, 135.0)];
        for (l, p) in labels.iter().zip(expect) {
            assert!(l.position.distance(p) < 1e-9, "{}", l.text);
        }
    }

    #[test]
    fn test_nested_members_step_inward() {
        let engine = engine_with(
            RingSpec::new([Cell::group(["坎", "水"])]).group_layout(GroupLayout::Nested),
        );
        let labels = place_ring(&engine, 0, white()).unwrap();
        let center = engine.config().center;
        assert_eq!(labels.len(), 2);
        let r0 = center.distance(labels[0].position);
        let r1 = center.distance(labels[1].position);
        assert!(r0 > r1);
    }

    #[test]
    fn test_vertical_labels_rotate_with_cell() {
        let engine = engine_with(RingSpec::new(["东北", "西南"]).vertical(true));
        let labels = place_ring(&engine, 0, white()).unwrap();
        assert_eq!(labels.len(), 4);
        assert_eq!(labels[0].text, "东");
        assert!((labels[0].rotation - 90.0).abs() < 1e-9);
        assert!((labels[2].rotation - 270.0).abs() < 1e-9);
        let center = engine.config().center;
        assert!(center.distance(labels[0].position) > center.distance(labels[1].position));
    }

    #[test]
    fn test_text_color_list_cycles_members() {
        let red: Srgba<f64> = Srgba::new(1.0, 0.0, 0.0, 1.0);
        let engine = engine_with(
            RingSpec::new([Cell::group(["坎", "水"])])
                .group_layout(GroupLayout::Nested)
                .text_color(crate::engine::TextColor::Many(vec![crate::theme::HexColor(red)])),
        );
        let labels = place_ring(&engine, 0, white()).unwrap();
        assert_eq!(labels[0].color, red);
        assert_eq!(labels[1].color, red);
    }
}
