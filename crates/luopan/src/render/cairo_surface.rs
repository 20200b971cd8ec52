use super::surface::{DrawSurface, Fill, SurfaceError, TextStyle};
use bearing::Point;
use cairo::{Context, FontSlant, FontWeight, RadialGradient};
use palette::Srgba;
use std::f64::consts::PI;

/// [`DrawSurface`] over a cairo context (a GTK draw callback or an image).
pub struct CairoSurface<'a> {
    cr: &'a Context,
    depth: usize,
}

impl<'a> CairoSurface<'a> {
    pub fn new(cr: &'a Context) -> Self {
        Self { cr, depth: 0 }
    }

    fn set_color(&self, color: Srgba<f64>) {
        let (r, g, b, a) = color.into_components();
        self.cr.set_source_rgba(r, g, b, a);
    }

    fn set_fill(
        &self,
        fill: &Fill,
        center: Point,
        inner: f64,
        outer: f64,
    ) -> Result<(), SurfaceError> {
        match fill {
            Fill::Solid(color) => self.set_color(*color),
            Fill::Radial {
                inner: from,
                outer: to,
            } => {
                let gradient = RadialGradient::new(center.x, center.y, inner, center.x, center.y, outer);
                for (offset, color) in [(0.0, from), (1.0, to)] {
                    let (r, g, b, a) = color.into_components();
                    gradient.add_color_stop_rgba(offset, r, g, b, a);
                }
                self.cr.set_source(&gradient)?;
            }
        }
        Ok(())
    }
}

impl DrawSurface for CairoSurface<'_> {
    fn begin_group(&mut self, pivot: Point, rotation: f64) -> Result<(), SurfaceError> {
        self.cr.save()?;
        self.depth += 1;
        self.cr.translate(pivot.x, pivot.y);
        self.cr.rotate(rotation.to_radians());
        self.cr.translate(-pivot.x, -pivot.y);
        Ok(())
    }

    fn end_group(&mut self) -> Result<(), SurfaceError> {
        if self.depth == 0 {
            return Err(SurfaceError::Unbalanced);
        }
        self.depth -= 1;
        self.cr.restore()?;
        Ok(())
    }

    fn circle(&mut self, center: Point, radius: f64, fill: &Fill) -> Result<(), SurfaceError> {
        self.cr.new_path();
        self.cr.arc(center.x, center.y, radius, 0.0, 2.0 * PI);
        self.set_fill(fill, center, 0.0, radius)?;
        self.cr.fill()?;
        Ok(())
    }

    fn stroke_circle(
        &mut self,
        center: Point,
        radius: f64,
        color: Srgba<f64>,
        width: f64,
    ) -> Result<(), SurfaceError> {
        self.cr.new_path();
        self.cr.arc(center.x, center.y, radius, 0.0, 2.0 * PI);
        self.set_color(color);
        self.cr.set_line_width(width);
        self.cr.stroke()?;
        Ok(())
    }

    fn annulus(
        &mut self,
        center: Point,
        inner: f64,
        outer: f64,
        fill: &Fill,
    ) -> Result<(), SurfaceError> {
        self.cr.new_path();
        self.cr.arc(center.x, center.y, outer, 0.0, 2.0 * PI);
        self.cr.new_sub_path();
        // opposite winding cuts the hole
        self.cr.arc_negative(center.x, center.y, inner, 2.0 * PI, 0.0);
        self.set_fill(fill, center, inner, outer)?;
        self.cr.fill()?;
        Ok(())
    }

    fn line(
        &mut self,
        from: Point,
        to: Point,
        color: Srgba<f64>,
        width: f64,
    ) -> Result<(), SurfaceError> {
        self.cr.new_path();
        self.cr.move_to(from.x, from.y);
        self.cr.line_to(to.x, to.y);
        self.set_color(color);
        self.cr.set_line_width(width);
        self.cr.stroke()?;
        Ok(())
    }

    fn polygon(&mut self, points: &[Point], fill: &Fill) -> Result<(), SurfaceError> {
        let Some((first, rest)) = points.split_first() else {
            return Ok(());
        };
        self.cr.new_path();
        self.cr.move_to(first.x, first.y);
        for p in rest {
            self.cr.line_to(p.x, p.y);
        }
        self.cr.close_path();

        let n = points.len() as f64;
        let centroid = Point::new(
            points.iter().map(|p| p.x).sum::<f64>() / n,
            points.iter().map(|p| p.y).sum::<f64>() / n,
        );
        let reach = points
            .iter()
            .map(|p| centroid.distance(*p))
            .fold(0.0, f64::max);
        self.set_fill(fill, centroid, 0.0, reach)?;
        self.cr.fill()?;
        Ok(())
    }

    fn text(
        &mut self,
        text: &str,
        at: Point,
        rotation: f64,
        style: &TextStyle,
    ) -> Result<(), SurfaceError> {
        self.cr.save()?;
        self.cr.translate(at.x, at.y);
        self.cr.rotate(rotation.to_radians());
        self.cr
            .select_font_face(&style.family, FontSlant::Normal, FontWeight::Normal);
        self.cr.set_font_size(style.size);
        self.set_color(style.color);

        let drawn = self.cr.text_extents(text).and_then(|ext| {
            self.cr.move_to(
                -(ext.x_bearing() + ext.width() / 2.0),
                -(ext.y_bearing() + ext.height() / 2.0),
            );
            self.cr.show_text(text)
        });
        self.cr.restore()?;
        drawn?;
        Ok(())
    }
}
