//! Compass renderer.
//!
//! Paints the engine's rings and the theme onto any [`DrawSurface`] in fixed
//! phases, back to front. Each phase runs inside its own surface group; a
//! phase that fails is logged and skipped and the rest of the frame still
//! draws.

mod cairo_surface;
pub mod label;
mod surface;

pub use cairo_surface::CairoSurface;
pub use label::{LabelPlacement, MAX_FONT, MIN_FONT, fit_font_size, place_ring};
pub use surface::{
    DrawSurface, Fill, Primitive, RecordedGroup, RecordingSurface, SurfaceError, TextStyle,
};

use crate::engine::{CompassEngine, LookupError};
use crate::theme::Theme;
use bearing::Point;
use derive_more::Display;
use palette::Srgba;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Phase {
    #[display("background")]
    Background,
    #[display("border")]
    Border,
    #[display("ring {_0}")]
    Ring(usize),
    #[display("scale")]
    Scale,
    #[display("center disc")]
    CenterDisc,
    #[display("pointer")]
    Pointer,
}

impl Phase {
    /// Phases drawn in the rotating dial frame. The rest stay fixed to the
    /// screen, so the pointer and crosshair always mark true up.
    pub fn rotates(&self) -> bool {
        matches!(self, Self::Ring(_) | Self::Scale)
    }
}

#[derive(Debug, Error)]
pub enum PhaseError {
    #[error(transparent)]
    Surface(#[from] SurfaceError),
    #[error(transparent)]
    Lookup(#[from] LookupError),
}

#[derive(Debug, Default)]
pub struct RenderReport {
    pub drawn: Vec<Phase>,
    pub failed: Vec<(Phase, PhaseError)>,
}

impl RenderReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn failed_phases(&self) -> impl Iterator<Item = Phase> + '_ {
        self.failed.iter().map(|(p, _)| *p)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickClass {
    Main,
    Mid,
    Minor,
}

impl TickClass {
    pub fn of(degree: u32) -> Self {
        if degree % 30 == 0 {
            Self::Main
        } else if degree % 10 == 0 {
            Self::Mid
        } else {
            Self::Minor
        }
    }
}

/// Tick band styling. Lengths are fractions of the tick band height.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleStyle {
    pub main_length: f64,
    pub mid_length: f64,
    pub minor_length: f64,
    pub tick_width: f64,
    pub label_size: f64,
}

impl ScaleStyle {
    pub fn length(&self, class: TickClass) -> f64 {
        match class {
            TickClass::Main => self.main_length,
            TickClass::Mid => self.mid_length,
            TickClass::Minor => self.minor_length,
        }
    }
}

impl Default for ScaleStyle {
    fn default() -> Self {
        Self {
            main_length: 0.45,
            mid_length: 0.3,
            minor_length: 0.15,
            tick_width: 1.0,
            label_size: 10.0,
        }
    }
}

fn with_alpha(c: Srgba<f64>, alpha: f64) -> Srgba<f64> {
    Srgba::new(c.red, c.green, c.blue, alpha)
}

fn mix(a: Srgba<f64>, b: Srgba<f64>, t: f64) -> Srgba<f64> {
    let lerp = |x: f64, y: f64| x + (y - x) * t;
    Srgba::new(
        lerp(a.red, b.red),
        lerp(a.green, b.green),
        lerp(a.blue, b.blue),
        lerp(a.alpha, b.alpha),
    )
}

const SHADOW_STEPS: usize = 4;

pub struct CompassRenderer {
    theme: Theme,
    scale: ScaleStyle,
}

impl CompassRenderer {
    pub fn new(theme: Theme) -> Self {
        Self {
            theme,
            scale: ScaleStyle::default(),
        }
    }

    pub fn with_scale_style(mut self, scale: ScaleStyle) -> Self {
        self.scale = scale;
        self
    }

    pub fn set_theme(&mut self, theme: Theme) {
        self.theme = theme;
    }

    pub fn theme(&self) -> &Theme {
        &self.theme
    }

    pub fn phases(engine: &CompassEngine) -> Vec<Phase> {
        let mut phases = vec![Phase::Background, Phase::Border];
        phases.extend((0..engine.ring_count()).map(Phase::Ring));
        phases.extend([Phase::Scale, Phase::CenterDisc, Phase::Pointer]);
        phases
    }

    /// Draws the whole compass with the dial turned by `angle` degrees.
    pub fn render<S: DrawSurface + ?Sized>(
        &self,
        engine: &CompassEngine,
        surface: &mut S,
        angle: f64,
    ) -> RenderReport {
        let mut report = RenderReport::default();
        let pivot = engine.config().center;

        for phase in Self::phases(engine) {
            let rotation = if phase.rotates() { angle } else { 0.0 };
            match self.run_phase(phase, engine, surface, pivot, rotation) {
                Ok(()) => report.drawn.push(phase),
                Err(e) => {
                    log::error!("Render phase '{}' failed: {}", phase, e);
                    report.failed.push((phase, e));
                }
            }
        }
        report
    }

    fn run_phase<S: DrawSurface + ?Sized>(
        &self,
        phase: Phase,
        engine: &CompassEngine,
        surface: &mut S,
        pivot: Point,
        rotation: f64,
    ) -> Result<(), PhaseError> {
        surface.begin_group(pivot, rotation)?;
        let drawn = match phase {
            Phase::Background => self.draw_background(engine, surface),
            Phase::Border => self.draw_border(engine, surface),
            Phase::Ring(i) => self.draw_ring(engine, surface, i),
            Phase::Scale => self.draw_scale(engine, surface),
            Phase::CenterDisc => self.draw_center_disc(engine, surface),
            Phase::Pointer => self.draw_pointer(engine, surface),
        };
        // close the group even when the phase failed so later phases start clean
        let closed = surface.end_group();
        drawn?;
        closed?;
        Ok(())
    }

    fn draw_background<S: DrawSurface + ?Sized>(
        &self,
        engine: &CompassEngine,
        surface: &mut S,
    ) -> Result<(), PhaseError> {
        let layout = engine.config();
        let colors = &self.theme.colors;

        if let Some(shadow) = &self.theme.shadow {
            let c = Point::new(
                layout.center.x + shadow.offset.0,
                layout.center.y + shadow.offset.1,
            );
            // stacked translucent discs stand in for a blur
            for step in (1..=SHADOW_STEPS).rev() {
                let spread = shadow.blur_radius * step as f64 / SHADOW_STEPS as f64;
                let alpha = shadow.color.alpha / SHADOW_STEPS as f64;
                surface.circle(
                    c,
                    layout.outer_radius + spread,
                    &Fill::Solid(with_alpha(shadow.color, alpha)),
                )?;
            }
        }

        surface.circle(
            layout.center,
            layout.outer_radius,
            &Fill::Radial {
                inner: colors.background,
                outer: mix(colors.background, colors.border, 0.35),
            },
        )?;
        Ok(())
    }

    fn draw_border<S: DrawSurface + ?Sized>(
        &self,
        engine: &CompassEngine,
        surface: &mut S,
    ) -> Result<(), PhaseError> {
        let layout = engine.config();
        let border = self.theme.colors.border;
        let width = layout.border_width.max(1.0);

        surface.stroke_circle(
            layout.center,
            layout.outer_radius - width / 2.0,
            border,
            width,
        )?;
        surface.stroke_circle(
            layout.center,
            engine.scale_band_radius(),
            with_alpha(border, 0.6),
            1.0,
        )?;
        Ok(())
    }

    fn draw_ring<S: DrawSurface + ?Sized>(
        &self,
        engine: &CompassEngine,
        surface: &mut S,
        index: usize,
    ) -> Result<(), PhaseError> {
        let center = engine.config().center;
        let ring = engine.ring(index)?;
        let inner = engine.ring_radius(index)?;
        let outer = inner + engine.ring_height(index)?;
        let (from, to) = self.theme.ring_gradient(index);

        surface.annulus(center, inner, outer, &Fill::Radial { inner: from, outer: to })?;
        surface.stroke_circle(center, outer, with_alpha(self.theme.colors.border, 0.3), 1.0)?;

        for label in place_ring(engine, index, self.theme.colors.text)? {
            let style = TextStyle {
                family: self.theme.label_font.clone(),
                size: label.font_size,
                color: label.color,
            };
            surface.text(&label.text, label.position, label.rotation, &style)?;
        }

        let divider = with_alpha(self.theme.colors.border, 0.5);
        let slice = ring.slice_width();
        for i in 0..ring.cell_count() {
            let a = i as f64 * slice - ring.start_angle;
            surface.line(center.polar(inner, a), center.polar(outer, a), divider, 1.0)?;
        }
        Ok(())
    }

    fn draw_scale<S: DrawSurface + ?Sized>(
        &self,
        engine: &CompassEngine,
        surface: &mut S,
    ) -> Result<(), PhaseError> {
        let layout = engine.config();
        let center = layout.center;
        let band = layout.tick_band_height;
        let outer = layout.outer_radius - layout.border_width;
        let tick = self.theme.colors.tick;

        for degree in 0..360 {
            let class = TickClass::of(degree);
            let length = band * self.scale.length(class);
            let a = degree as f64;
            let width = match class {
                TickClass::Main => self.scale.tick_width * 1.5,
                _ => self.scale.tick_width,
            };
            surface.line(
                center.polar(outer, a),
                center.polar(outer - length, a),
                tick,
                width,
            )?;
        }

        let style = TextStyle {
            family: self.theme.label_font.clone(),
            size: self.scale.label_size.min(band * 0.45),
            color: self.theme.colors.text,
        };
        let label_radius =
            engine.scale_band_radius() + (band * (1.0 - self.scale.main_length)) / 2.0;
        for degree in (0..360).step_by(30) {
            let a = degree as f64;
            surface.text(
                &degree.to_string(),
                center.polar(label_radius, a),
                a,
                &style,
            )?;
        }
        Ok(())
    }

    fn draw_center_disc<S: DrawSurface + ?Sized>(
        &self,
        engine: &CompassEngine,
        surface: &mut S,
    ) -> Result<(), PhaseError> {
        let layout = engine.config();
        let c = layout.center;
        let r = layout.center_disc_radius;
        let colors = &self.theme.colors;

        surface.circle(
            c,
            r,
            &Fill::Radial {
                inner: mix(colors.background, colors.border, 0.15),
                outer: colors.background,
            },
        )?;
        surface.stroke_circle(c, r, colors.border, layout.border_width.max(1.0))?;

        let arm = r * 0.8;
        surface.line(
            Point::new(c.x - arm, c.y),
            Point::new(c.x + arm, c.y),
            colors.crosshair,
            1.0,
        )?;
        surface.line(
            Point::new(c.x, c.y - arm),
            Point::new(c.x, c.y + arm),
            colors.crosshair,
            1.0,
        )?;
        Ok(())
    }

    fn draw_pointer<S: DrawSurface + ?Sized>(
        &self,
        engine: &CompassEngine,
        surface: &mut S,
    ) -> Result<(), PhaseError> {
        let layout = engine.config();
        let c = layout.center;
        let half = layout.center_disc_radius * 0.35;
        let base_y = c.y - layout.center_disc_radius;

        let points = [
            c.polar(engine.scale_band_radius(), 0.0),
            Point::new(c.x - half, base_y),
            Point::new(c.x + half, base_y),
        ];
        surface.polygon(&points, &Fill::Solid(self.theme.colors.pointer))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::theme::{self, ThemeName};

    fn renderer() -> CompassRenderer {
        CompassRenderer::new(theme::ThemeRegistry::builtin().get(ThemeName::Compass).clone())
    }

    #[test]
    fn test_phase_order() {
        let engine = CompassEngine::default();
        let mut surface = RecordingSurface::new();
        let report = renderer().render(&engine, &mut surface, 0.0);

        assert!(report.is_complete());
        assert_eq!(
            report.drawn,
            vec![
                Phase::Background,
                Phase::Border,
                Phase::Ring(0),
                Phase::Ring(1),
                Phase::Ring(2),
                Phase::Ring(3),
                Phase::Scale,
                Phase::CenterDisc,
                Phase::Pointer,
            ]
        );
        assert!(surface.is_balanced());
        assert_eq!(surface.groups().len(), report.drawn.len());
    }

    #[test]
    fn test_failed_phase_is_isolated() {
        let engine = CompassEngine::default();
        // group 3 is the second ring
        let mut surface = RecordingSurface::failing_on_group(3);
        let report = renderer().render(&engine, &mut surface, 10.0);

        assert_eq!(report.failed_phases().collect::<Vec<_>>(), vec![Phase::Ring(1)]);
        assert_eq!(report.drawn.len(), CompassRenderer::phases(&engine).len() - 1);
        assert!(report.drawn.contains(&Phase::Pointer));
        assert!(surface.is_balanced());
        assert!(surface.groups()[3].primitives.is_empty());
        assert!(!surface.groups()[4].primitives.is_empty());
    }

    #[test]
    fn test_scale_has_360_ticks_and_12_labels() {
        let engine = CompassEngine::default();
        let mut surface = RecordingSurface::new();
        renderer().render(&engine, &mut surface, 0.0);

        let scale_index = CompassRenderer::phases(&engine)
            .iter()
            .position(|p| *p == Phase::Scale)
            .unwrap();
        let scale = &surface.groups()[scale_index];
        let lines = scale
            .primitives
            .iter()
            .filter(|p| matches!(p, Primitive::Line { .. }))
            .count();
        let labels: Vec<_> = scale
            .primitives
            .iter()
            .filter_map(|p| match p {
                Primitive::Text { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(lines, 360);
        assert_eq!(labels.len(), 12);
        assert_eq!(labels[0], "0");
        assert_eq!(labels[11], "330");
    }

    #[test]
    fn test_tick_classes() {
        assert_eq!(TickClass::of(0), TickClass::Main);
        assert_eq!(TickClass::of(90), TickClass::Main);
        assert_eq!(TickClass::of(40), TickClass::Mid);
        assert_eq!(TickClass::of(41), TickClass::Minor);
        let style = ScaleStyle::default();
        assert!(style.length(TickClass::Main) > style.length(TickClass::Mid));
        assert!(style.length(TickClass::Mid) > style.length(TickClass::Minor));
    }

    #[test]
    fn test_only_dial_rotates() {
        let engine = CompassEngine::default();
        let mut surface = RecordingSurface::new();
        renderer().render(&engine, &mut surface, 42.0);

        for (phase, group) in CompassRenderer::phases(&engine).iter().zip(surface.groups()) {
            let expected = if phase.rotates() { 42.0 } else { 0.0 };
            assert_eq!(group.rotation, expected, "{phase}");
        }
        let pointer = surface.groups().last().unwrap();
        assert!(matches!(pointer.primitives[0], Primitive::Polygon { ref points } if points.len() == 3));
    }

    #[test]
    fn test_ring_labels_are_drawn() {
        let engine = CompassEngine::default();
        let mut surface = RecordingSurface::new();
        renderer().render(&engine, &mut surface, 0.0);
        let texts: Vec<_> = surface.texts().collect();
        for glyph in ["坎", "水", "东北", "子", "亥"] {
            assert!(texts.contains(&glyph), "missing {glyph}");
        }
    }

    #[test]
    fn test_set_theme_changes_palette() {
        let mut r = renderer();
        let dark = theme::ThemeRegistry::builtin().get(ThemeName::Dark).clone();
        r.set_theme(dark.clone());
        assert_eq!(r.theme().name, ThemeName::Dark);
        assert_eq!(r.theme().colors, dark.colors);
    }
}
