use bearing::Point;
use palette::Srgba;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SurfaceError {
    #[error("cairo: {0}")]
    Cairo(#[from] cairo::Error),
    #[error("injected failure in group {0}")]
    Injected(usize),
    #[error("end_group called without an open group")]
    Unbalanced,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Fill {
    Solid(Srgba<f64>),
    /// Radial gradient running from the shape's inner edge to its outer edge.
    Radial {
        inner: Srgba<f64>,
        outer: Srgba<f64>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextStyle {
    pub family: String,
    pub size: f64,
    pub color: Srgba<f64>,
}

/// Drawing capability the renderer paints onto.
///
/// Angles are compass degrees (0 = up, clockwise). Groups nest; every
/// primitive drawn inside a group is rotated by the group's rotation about
/// its pivot, on top of any enclosing group.
pub trait DrawSurface {
    fn begin_group(&mut self, pivot: Point, rotation: f64) -> Result<(), SurfaceError>;
    fn end_group(&mut self) -> Result<(), SurfaceError>;

    fn circle(&mut self, center: Point, radius: f64, fill: &Fill) -> Result<(), SurfaceError>;
    fn stroke_circle(
        &mut self,
        center: Point,
        radius: f64,
        color: Srgba<f64>,
        width: f64,
    ) -> Result<(), SurfaceError>;
    fn annulus(
        &mut self,
        center: Point,
        inner: f64,
        outer: f64,
        fill: &Fill,
    ) -> Result<(), SurfaceError>;
    fn line(
        &mut self,
        from: Point,
        to: Point,
        color: Srgba<f64>,
        width: f64,
    ) -> Result<(), SurfaceError>;
    fn polygon(&mut self, points: &[Point], fill: &Fill) -> Result<(), SurfaceError>;
    /// Draws `text` centered on `at`, turned by `rotation` degrees about it.
    fn text(
        &mut self,
        text: &str,
        at: Point,
        rotation: f64,
        style: &TextStyle,
    ) -> Result<(), SurfaceError>;
}

#[derive(Debug, Clone, PartialEq)]
pub enum Primitive {
    Circle { center: Point, radius: f64 },
    StrokeCircle { center: Point, radius: f64 },
    Annulus { inner: f64, outer: f64, fill: Fill },
    Line { from: Point, to: Point },
    Polygon { points: Vec<Point> },
    Text { text: String, at: Point, rotation: f64, size: f64 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedGroup {
    pub rotation: f64,
    /// Nesting level, 0 for top-level groups.
    pub depth: usize,
    pub primitives: Vec<Primitive>,
}

/// Surface that records what would be drawn. Used for headless checks.
#[derive(Debug, Default)]
pub struct RecordingSurface {
    groups: Vec<RecordedGroup>,
    open: Vec<usize>,
    loose: Vec<Primitive>,
    fail_group: Option<usize>,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every primitive drawn in the `group`-th group (0-based, in
    /// begin order) fail.
    pub fn failing_on_group(group: usize) -> Self {
        Self {
            fail_group: Some(group),
            ..Self::default()
        }
    }

    pub fn groups(&self) -> &[RecordedGroup] {
        &self.groups
    }

    /// Primitives drawn outside any group.
    pub fn loose(&self) -> &[Primitive] {
        &self.loose
    }

    pub fn all_primitives(&self) -> impl Iterator<Item = &Primitive> {
        self.loose
            .iter()
            .chain(self.groups.iter().flat_map(|g| g.primitives.iter()))
    }

    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.all_primitives().filter_map(|p| match p {
            Primitive::Text { text, .. } => Some(text.as_str()),
            _ => None,
        })
    }

    pub fn is_balanced(&self) -> bool {
        self.open.is_empty()
    }

    fn record(&mut self, primitive: Primitive) -> Result<(), SurfaceError> {
        match self.open.last().copied() {
            Some(g) if self.fail_group == Some(g) => Err(SurfaceError::Injected(g)),
            Some(g) => {
                self.groups[g].primitives.push(primitive);
                Ok(())
            }
            None => {
                self.loose.push(primitive);
                Ok(())
            }
        }
    }
}

impl DrawSurface for RecordingSurface {
    fn begin_group(&mut self, _pivot: Point, rotation: f64) -> Result<(), SurfaceError> {
        self.groups.push(RecordedGroup {
            rotation,
            depth: self.open.len(),
            primitives: Vec::new(),
        });
        self.open.push(self.groups.len() - 1);
        Ok(())
    }

    fn end_group(&mut self) -> Result<(), SurfaceError> {
        self.open.pop().map(|_| ()).ok_or(SurfaceError::Unbalanced)
    }

    fn circle(&mut self, center: Point, radius: f64, _fill: &Fill) -> Result<(), SurfaceError> {
        self.record(Primitive::Circle { center, radius })
    }

    fn stroke_circle(
        &mut self,
        center: Point,
        radius: f64,
        _color: Srgba<f64>,
        _width: f64,
    ) -> Result<(), SurfaceError> {
        self.record(Primitive::StrokeCircle { center, radius })
    }

    fn annulus(
        &mut self,
        _center: Point,
        inner: f64,
        outer: f64,
        fill: &Fill,
    ) -> Result<(), SurfaceError> {
        self.record(Primitive::Annulus {
            inner,
            outer,
            fill: *fill,
        })
    }

    fn line(
        &mut self,
        from: Point,
        to: Point,
        _color: Srgba<f64>,
        _width: f64,
    ) -> Result<(), SurfaceError> {
        self.record(Primitive::Line { from, to })
    }

    fn polygon(&mut self, points: &[Point], _fill: &Fill) -> Result<(), SurfaceError> {
        self.record(Primitive::Polygon {
            points: points.to_vec(),
        })
    }

    fn text(
        &mut self,
        text: &str,
        at: Point,
        rotation: f64,
        style: &TextStyle,
    ) -> Result<(), SurfaceError> {
        self.record(Primitive::Text {
            text: text.to_string(),
            at,
            rotation,
            size: style.size,
        })
    }
}
