use super::ring::DEFAULT_FONT_SIZE;
use bearing::Point;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum LayoutError {
    #[error("layout field '{0}' must be a finite, non-negative number")]
    InvalidValue(&'static str),
    #[error("outer radius {outer} leaves no room for rings (needs more than {required})")]
    TooSmall { outer: f64, required: f64 },
}

/// Geometry of one compass. Immutable; build a new one to change it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CompassLayout {
    pub center: Point,
    pub outer_radius: f64,
    pub center_disc_radius: f64,
    pub ring_gap: f64,
    pub border_width: f64,
    pub tick_band_height: f64,
    pub default_font_size: f64,
}

impl CompassLayout {
    pub fn builder() -> CompassLayoutBuilder {
        CompassLayoutBuilder::default()
    }

    /// Layout filling a `width` x `height` surface with a small margin.
    pub fn fit(width: f64, height: f64) -> Result<Self, LayoutError> {
        let outer = (width.min(height) / 2.0 - 12.0).max(40.0);
        Self::builder()
            .center(Point::new(width / 2.0, height / 2.0))
            .outer_radius(outer)
            .center_disc_radius(outer * 0.15)
            .tick_band_height(outer * 0.14)
            .build()
    }

    /// Room left for rings between the center disc and the tick band.
    pub fn ring_band(&self) -> f64 {
        self.scale_band_radius() - self.rings_start()
    }

    /// Inner edge of the first ring.
    pub fn rings_start(&self) -> f64 {
        self.center_disc_radius + self.border_width
    }

    /// Inner edge of the tick band.
    pub fn scale_band_radius(&self) -> f64 {
        self.outer_radius - self.tick_band_height
    }
}

impl Default for CompassLayout {
    fn default() -> Self {
        let b = CompassLayoutBuilder::default();
        Self {
            center: b.center,
            outer_radius: b.outer_radius,
            center_disc_radius: b.center_disc_radius,
            ring_gap: b.ring_gap,
            border_width: b.border_width,
            tick_band_height: b.tick_band_height,
            default_font_size: b.default_font_size,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CompassLayoutBuilder {
    center: Point,
    outer_radius: f64,
    center_disc_radius: f64,
    ring_gap: f64,
    border_width: f64,
    tick_band_height: f64,
    default_font_size: f64,
}

impl Default for CompassLayoutBuilder {
    fn default() -> Self {
        Self {
            center: Point::new(210.0, 210.0),
            outer_radius: 200.0,
            center_disc_radius: 30.0,
            ring_gap: 2.0,
            border_width: 2.0,
            tick_band_height: 28.0,
            default_font_size: DEFAULT_FONT_SIZE,
        }
    }
}

impl CompassLayoutBuilder {
    pub fn center(mut self, center: Point) -> Self {
        self.center = center;
        self
    }

    pub fn outer_radius(mut self, r: f64) -> Self {
        self.outer_radius = r;
        self
    }

    pub fn center_disc_radius(mut self, r: f64) -> Self {
        self.center_disc_radius = r;
        self
    }

    pub fn ring_gap(mut self, gap: f64) -> Self {
        self.ring_gap = gap;
        self
    }

    pub fn border_width(mut self, width: f64) -> Self {
        self.border_width = width;
        self
    }

    pub fn tick_band_height(mut self, height: f64) -> Self {
        self.tick_band_height = height;
        self
    }

    pub fn default_font_size(mut self, size: f64) -> Self {
        self.default_font_size = size;
        self
    }

    pub fn build(self) -> Result<CompassLayout, LayoutError> {
        let check = |value: f64, name: &'static str| {
            if value.is_finite() && value >= 0.0 {
                Ok(value)
            } else {
                Err(LayoutError::InvalidValue(name))
            }
        };

        if !(self.center.x.is_finite() && self.center.y.is_finite()) {
            return Err(LayoutError::InvalidValue("center"));
        }
        let layout = CompassLayout {
            center: self.center,
            outer_radius: check(self.outer_radius, "outer_radius")?,
            center_disc_radius: check(self.center_disc_radius, "center_disc_radius")?,
            ring_gap: check(self.ring_gap, "ring_gap")?,
            border_width: check(self.border_width, "border_width")?,
            tick_band_height: check(self.tick_band_height, "tick_band_height")?,
            default_font_size: check(self.default_font_size, "default_font_size")?,
        };
        if layout.default_font_size == 0.0 {
            return Err(LayoutError::InvalidValue("default_font_size"));
        }

        let required = layout.rings_start() + layout.tick_band_height;
        if layout.outer_radius <= required {
            return Err(LayoutError::TooSmall {
                outer: layout.outer_radius,
                required,
            });
        }
        Ok(layout)
    }
}
