//! Compass data engine: the layout plus the layered angular dataset.
//!
//! Answers which glyph lives at a given angle in a ring and where each ring
//! sits radially. Ring data is replaced wholesale by
//! [`CompassEngine::set_compass_data`]; the layout by
//! [`CompassEngine::set_layout`].

mod layout;
mod ring;
pub mod tables;

pub use layout::{CompassLayout, CompassLayoutBuilder, LayoutError};
pub use ring::{
    Cell, ConfigWarning, DEFAULT_FONT_SIZE, Glyph, GroupLayout, Lenient, RingDefinition,
    RingLabel, RingSpec, TextColor,
};

use bearing::normalize;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LookupError {
    #[error("ring index {index} out of range (compass has {count} rings)")]
    RingOutOfRange { index: usize, count: usize },
    #[error("ring {index} has no cells")]
    EmptyRing { index: usize },
}

#[derive(Debug, Clone)]
pub struct CompassEngine {
    layout: CompassLayout,
    rings: Vec<RingDefinition>,
    // inner radius of each ring plus one trailing entry for the outer edge
    radii: Vec<f64>,
}

impl CompassEngine {
    pub fn new(layout: CompassLayout) -> Self {
        let mut engine = Self {
            layout,
            rings: Vec::new(),
            radii: Vec::new(),
        };
        engine.recompute_radii();
        engine
    }

    /// Engine over the built-in four-ring luopan.
    pub fn with_default_rings(layout: CompassLayout) -> Self {
        let mut engine = Self::new(layout);
        engine.set_compass_data(tables::default_rings());
        engine
    }

    pub fn config(&self) -> &CompassLayout {
        &self.layout
    }

    pub fn set_layout(&mut self, layout: CompassLayout) {
        self.layout = layout;
        self.recompute_radii();
    }

    /// Replaces all rings. Returns every correction made while validating.
    pub fn set_compass_data(&mut self, rings: Vec<RingSpec>) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();
        self.rings = rings
            .into_iter()
            .enumerate()
            .map(|(i, spec)| {
                let (ring, mut w) =
                    RingDefinition::from_spec(i, spec, self.layout.default_font_size);
                warnings.append(&mut w);
                ring
            })
            .collect();
        self.recompute_radii();
        log::debug!(
            "Loaded {} rings with {} corrections",
            self.rings.len(),
            warnings.len()
        );
        warnings
    }

    /// Validated copy of the current rings.
    pub fn compass_data(&self) -> Vec<RingDefinition> {
        self.rings.clone()
    }

    pub fn rings(&self) -> &[RingDefinition] {
        &self.rings
    }

    pub fn ring_count(&self) -> usize {
        self.rings.len()
    }

    pub fn ring(&self, index: usize) -> Result<&RingDefinition, LookupError> {
        self.rings.get(index).ok_or(LookupError::RingOutOfRange {
            index,
            count: self.rings.len(),
        })
    }

    /// Inner radius of ring `index`.
    pub fn ring_radius(&self, index: usize) -> Result<f64, LookupError> {
        self.ring(index)?;
        Ok(self.radii[index])
    }

    pub fn ring_height(&self, index: usize) -> Result<f64, LookupError> {
        self.ring(index)?;
        Ok(self.radii[index + 1] - self.radii[index])
    }

    /// Radius at the middle of ring `index`, where single-row labels sit.
    pub fn ring_mid_radius(&self, index: usize) -> Result<f64, LookupError> {
        self.ring(index)?;
        Ok((self.radii[index] + self.radii[index + 1]) / 2.0)
    }

    pub fn scale_band_radius(&self) -> f64 {
        self.layout.scale_band_radius()
    }

    /// Index of the cell covering `angle` in ring `ring_index`.
    ///
    /// A boundary angle belongs to the slice it rounds down into.
    pub fn cell_index_at(&self, ring_index: usize, angle: f64) -> Result<usize, LookupError> {
        let ring = self.ring(ring_index)?;
        let count = ring.cell_count();
        if count == 0 {
            return Err(LookupError::EmptyRing { index: ring_index });
        }
        let slice = ring.slice_width();
        let bucket = ((ring.start_angle + normalize(angle)) / slice).floor() as usize;
        Ok(bucket % count)
    }

    /// Glyph at `angle`; for grouped cells, the group's first member.
    pub fn resolve_cell_at(&self, ring_index: usize, angle: f64) -> Result<&Glyph, LookupError> {
        let cell = self.resolve_group_at(ring_index, angle)?;
        cell.primary()
            .ok_or(LookupError::EmptyRing { index: ring_index })
    }

    /// Full cell at `angle`, including every group member.
    pub fn resolve_group_at(&self, ring_index: usize, angle: f64) -> Result<&Cell, LookupError> {
        let index = self.cell_index_at(ring_index, angle)?;
        Ok(&self.rings[ring_index].cells[index])
    }

    /// Angular midpoint of `cell` in ring `ring_index`, in `[0, 360)`.
    pub fn cell_midpoint(&self, ring_index: usize, cell: usize) -> Result<f64, LookupError> {
        let ring = self.ring(ring_index)?;
        if ring.cell_count() == 0 {
            return Err(LookupError::EmptyRing { index: ring_index });
        }
        let slice = ring.slice_width();
        Ok(normalize((cell as f64 + 0.5) * slice - ring.start_angle))
    }

    fn recompute_radii(&mut self) {
        let start = self.layout.rings_start();
        let natural: Vec<f64> = self
            .rings
            .iter()
            .map(|r| r.font_size * r.rows() as f64 + 2.0 * self.layout.ring_gap)
            .collect();
        let total: f64 = natural.iter().sum();
        let band = self.layout.ring_band();
        let scale = if total > 0.0 { band / total } else { 1.0 };

        self.radii.clear();
        self.radii.push(start);
        let mut r = start;
        for h in natural {
            r += h * scale;
            self.radii.push(r);
        }
    }
}

impl Default for CompassEngine {
    fn default() -> Self {
        Self::with_default_rings(CompassLayout::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mountains_engine() -> CompassEngine {
        let mut engine = CompassEngine::new(CompassLayout::default());
        let cells = tables::MOUNTAINS.iter().map(|m| m.name);
        let warnings = engine.set_compass_data(vec![
            RingSpec::new(cells)
                .label(RingLabel::Single("山".into()))
                .start_angle(0.0),
        ]);
        assert!(warnings.is_empty());
        engine
    }

    #[test]
    fn test_resolve_concrete_mountains() {
        let engine = mountains_engine();
        assert_eq!(engine.resolve_cell_at(0, 0.0).unwrap().as_str(), "子");
        // 190 / 15 = 12.67, bucket 12
        assert_eq!(engine.resolve_cell_at(0, 190.0).unwrap().as_str(), "午");
        assert_eq!(engine.resolve_cell_at(0, 14.999).unwrap().as_str(), "子");
        assert_eq!(engine.resolve_cell_at(0, 15.0).unwrap().as_str(), "癸");
        assert_eq!(engine.resolve_cell_at(0, -1.0).unwrap().as_str(), "壬");
    }

    #[test]
    fn test_resolve_is_periodic() {
        let engine = CompassEngine::default();
        for ring in 0..engine.ring_count() {
            let mut angle = 0.25;
            while angle < 360.0 {
                let base = engine.resolve_cell_at(ring, angle).unwrap();
                for k in [-3.0, -1.0, 1.0, 2.0, 5.0] {
                    assert_eq!(
                        engine.resolve_cell_at(ring, angle + 360.0 * k).unwrap(),
                        base,
                        "ring {ring} angle {angle} k {k}"
                    );
                }
                angle += 3.5;
            }
        }
    }

    #[test]
    fn test_radii_strictly_increase() {
        let engine = CompassEngine::default();
        let layout = engine.config();
        assert_eq!(
            engine.ring_radius(0).unwrap(),
            layout.center_disc_radius + layout.border_width
        );
        for i in 0..engine.ring_count() - 1 {
            assert!(engine.ring_radius(i).unwrap() < engine.ring_radius(i + 1).unwrap());
        }
        let last = engine.ring_count() - 1;
        let outer = engine.ring_radius(last).unwrap() + engine.ring_height(last).unwrap();
        assert!((outer - engine.scale_band_radius()).abs() < 1e-9);
    }

    #[test]
    fn test_nested_ring_is_taller() {
        let engine = CompassEngine::default();
        // trigram ring stacks two rows
        assert!(engine.ring_height(0).unwrap() > engine.ring_height(2).unwrap());
    }

    #[test]
    fn test_set_layout_recomputes_radii() {
        let mut engine = CompassEngine::default();
        let before = engine.ring_radius(1).unwrap();
        engine.set_layout(CompassLayout::builder().outer_radius(300.0).build().unwrap());
        assert!(engine.ring_radius(1).unwrap() > before);
        assert_eq!(engine.config().outer_radius, 300.0);
    }

    #[test]
    fn test_lookup_errors() {
        let mut engine = mountains_engine();
        assert_eq!(
            engine.ring_radius(1),
            Err(LookupError::RingOutOfRange { index: 1, count: 1 })
        );
        assert_eq!(
            engine.resolve_cell_at(4, 0.0),
            Err(LookupError::RingOutOfRange { index: 4, count: 1 })
        );

        let warnings = engine.set_compass_data(vec![
            RingSpec::new(Vec::<Cell>::new()).label(RingLabel::Single("空".into())),
        ]);
        assert_eq!(warnings, vec![ConfigWarning::NoCells { ring: 0 }]);
        assert_eq!(
            engine.resolve_cell_at(0, 10.0),
            Err(LookupError::EmptyRing { index: 0 })
        );
        assert_eq!(
            engine.cell_midpoint(0, 0),
            Err(LookupError::EmptyRing { index: 0 })
        );
    }

    #[test]
    fn test_grouped_lookup_returns_first_member() {
        let engine = CompassEngine::default();
        assert_eq!(engine.resolve_cell_at(0, 0.0).unwrap().as_str(), "坎");
        assert_eq!(
            engine.resolve_group_at(0, 180.0).unwrap(),
            &Cell::group(["离", "火"])
        );
        // 22.5 start centers 坎 on north, so 340 still reads 坎
        assert_eq!(engine.resolve_cell_at(0, 340.0).unwrap().as_str(), "坎");
    }

    #[test]
    fn test_cell_midpoint_resolves_to_same_cell() {
        let engine = CompassEngine::default();
        for ring in 0..engine.ring_count() {
            for cell in 0..engine.ring(ring).unwrap().cell_count() {
                let mid = engine.cell_midpoint(ring, cell).unwrap();
                assert_eq!(engine.cell_index_at(ring, mid).unwrap(), cell);
            }
        }
        assert_eq!(engine.cell_midpoint(0, 0).unwrap(), 0.0);
    }

    #[test]
    fn test_round_trip_fills_defaults() {
        let mut engine = CompassEngine::new(CompassLayout::default());
        let warnings = engine.set_compass_data(vec![RingSpec::new(["甲", "乙"])]);
        assert_eq!(warnings.len(), 1);

        let data = engine.compass_data();
        assert_eq!(data.len(), 1);
        let ring = &data[0];
        assert_eq!(ring.label, RingLabel::Single("ring-1".into()));
        assert_eq!(ring.start_angle, 0.0);
        assert_eq!(ring.font_size, DEFAULT_FONT_SIZE);
        assert!(!ring.vertical);
        assert_eq!(ring.group_layout, GroupLayout::None);
        assert_eq!(ring.cells, vec![Cell::from("甲"), Cell::from("乙")]);
    }
}
