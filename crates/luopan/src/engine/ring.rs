use crate::theme::HexColor;
use derive_more::{AsRef, Deref, Display, From, Into};
use palette::Srgba;
use serde::de::IgnoredAny;
use serde::{Deserialize, Serialize};
use strum::{Display as StrumDisplay, EnumString};
use thiserror::Error;

pub const DEFAULT_FONT_SIZE: f64 = 16.0;

/// Text shown in one ring cell.
#[derive(
    Debug,
    Clone,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    Deref,
    From,
    Into,
    AsRef,
)]
#[serde(transparent)]
pub struct Glyph(String);

bearing::impl_string_newtype!(Glyph);

impl From<&str> for Glyph {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    Single(Glyph),
    Group(Vec<Glyph>),
}

impl Cell {
    pub fn group<I, S>(glyphs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Glyph>,
    {
        Self::Group(glyphs.into_iter().map(Into::into).collect())
    }

    /// The cell's lead glyph; for groups, the first member.
    pub fn primary(&self) -> Option<&Glyph> {
        self.glyphs().first()
    }

    pub fn glyphs(&self) -> &[Glyph] {
        match self {
            Self::Single(g) => std::slice::from_ref(g),
            Self::Group(gs) => gs,
        }
    }

    pub fn is_group(&self) -> bool {
        matches!(self, Self::Group(_))
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        Self::Single(Glyph::from(s))
    }
}

impl From<String> for Cell {
    fn from(s: String) -> Self {
        Self::Single(Glyph::new(s))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RingLabel {
    Single(String),
    Multi(Vec<String>),
}

impl RingLabel {
    pub fn is_multi(&self) -> bool {
        matches!(self, Self::Multi(_))
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum TextColor {
    One(HexColor),
    Many(Vec<HexColor>),
}

impl TextColor {
    /// Color for group member `member`, cycling through a color list.
    pub fn for_member(&self, member: usize) -> Option<Srgba<f64>> {
        match self {
            Self::One(c) => Some(c.0),
            Self::Many(cs) if cs.is_empty() => None,
            Self::Many(cs) => Some(cs[member % cs.len()].0),
        }
    }
}

#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    EnumString,
    StrumDisplay,
)]
#[strum(ascii_case_insensitive, serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum GroupLayout {
    #[default]
    None,
    /// Members share the slice angularly.
    EqualSplit,
    /// Members stack radially inside the slice.
    Nested,
}

impl GroupLayout {
    pub fn is_grouped(&self) -> bool {
        !matches!(self, Self::None)
    }
}

/// A field that may hold the wrong type in host data. Wrong values are kept
/// as `Invalid` and replaced with a default at ingestion.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Lenient<T> {
    Valid(T),
    Invalid(IgnoredAny),
}

impl<T> From<T> for Lenient<T> {
    fn from(value: T) -> Self {
        Self::Valid(value)
    }
}

/// Ring data as supplied by the host, before validation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RingSpec {
    pub label: Option<Lenient<RingLabel>>,
    pub start_angle: Option<Lenient<f64>>,
    pub font_size: Option<Lenient<f64>>,
    pub text_color: Option<TextColor>,
    pub vertical: Option<Lenient<bool>>,
    pub group_layout: Option<GroupLayout>,
    #[serde(default)]
    pub cells: Vec<Cell>,
}

impl RingSpec {
    pub fn new<I, C>(cells: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<Cell>,
    {
        Self {
            cells: cells.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    pub fn label(mut self, label: RingLabel) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn start_angle(mut self, degrees: f64) -> Self {
        self.start_angle = Some(degrees.into());
        self
    }

    pub fn font_size(mut self, size: f64) -> Self {
        self.font_size = Some(size.into());
        self
    }

    pub fn text_color(mut self, color: TextColor) -> Self {
        self.text_color = Some(color);
        self
    }

    pub fn vertical(mut self, vertical: bool) -> Self {
        self.vertical = Some(vertical.into());
        self
    }

    pub fn group_layout(mut self, layout: GroupLayout) -> Self {
        self.group_layout = Some(layout);
        self
    }
}

/// Non-fatal problem corrected while ingesting ring data.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigWarning {
    #[error("ring {ring}: missing label, using '{placeholder}'")]
    MissingLabel { ring: usize, placeholder: String },
    #[error("ring {ring}: label is neither text nor a list of text, using '{placeholder}'")]
    InvalidLabel { ring: usize, placeholder: String },
    #[error("ring {ring}: start angle {value} outside [0, 360), reset to 0")]
    StartAngleOutOfRange { ring: usize, value: f64 },
    #[error("ring {ring}: start angle is not a number, reset to 0")]
    InvalidStartAngle { ring: usize },
    #[error("ring {ring}: font size is not a positive number, using {default}")]
    InvalidFontSize { ring: usize, default: f64 },
    #[error("ring {ring}: 'vertical' is not a boolean, using false")]
    InvalidVertical { ring: usize },
    #[error("ring {ring}: grouped cells need a grouped layout, using equal-split")]
    GroupLayoutRequired { ring: usize },
    #[error("ring {ring}: cell {cell} is an empty group, left blank")]
    EmptyGroup { ring: usize, cell: usize },
    #[error("ring {ring}: has no cells, lookups on it will fail")]
    NoCells { ring: usize },
}

/// Validated ring. Every optional field of [`RingSpec`] has been resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct RingDefinition {
    pub label: RingLabel,
    /// Degrees in `[0, 360)`.
    pub start_angle: f64,
    pub font_size: f64,
    /// `None` draws with the theme's text color.
    pub text_color: Option<TextColor>,
    pub vertical: bool,
    pub group_layout: GroupLayout,
    pub cells: Vec<Cell>,
}

impl RingDefinition {
    pub fn placeholder_label(index: usize) -> String {
        format!("ring-{}", index + 1)
    }

    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    pub fn slice_width(&self) -> f64 {
        360.0 / self.cells.len().max(1) as f64
    }

    /// Widest group in the ring (1 for plain rings).
    pub fn group_size(&self) -> usize {
        self.cells
            .iter()
            .map(|c| c.glyphs().len())
            .max()
            .unwrap_or(1)
            .max(1)
    }

    /// Text rows the ring needs radially at its font size.
    pub fn rows(&self) -> usize {
        let rows_for = |g: &Glyph| {
            if self.vertical {
                g.chars().count().max(1)
            } else {
                1
            }
        };

        self.cells
            .iter()
            .map(|cell| {
                let glyphs = cell.glyphs().iter().map(rows_for);
                match self.group_layout {
                    GroupLayout::Nested => glyphs.sum::<usize>(),
                    _ => glyphs.max().unwrap_or(1),
                }
            })
            .max()
            .unwrap_or(1)
            .max(1)
    }

    /// Validates a host ring, collecting a warning for every corrected field.
    pub fn from_spec(
        index: usize,
        spec: RingSpec,
        default_font_size: f64,
    ) -> (Self, Vec<ConfigWarning>) {
        let mut warnings = Vec::new();

        let label = match spec.label {
            Some(Lenient::Valid(label)) => label,
            Some(Lenient::Invalid(_)) => {
                let placeholder = Self::placeholder_label(index);
                warnings.push(ConfigWarning::InvalidLabel {
                    ring: index,
                    placeholder: placeholder.clone(),
                });
                RingLabel::Single(placeholder)
            }
            None => {
                let placeholder = Self::placeholder_label(index);
                warnings.push(ConfigWarning::MissingLabel {
                    ring: index,
                    placeholder: placeholder.clone(),
                });
                RingLabel::Single(placeholder)
            }
        };

        let start_angle = match spec.start_angle {
            Some(Lenient::Valid(a)) if (0.0..360.0).contains(&a) => a,
            Some(Lenient::Valid(value)) => {
                warnings.push(ConfigWarning::StartAngleOutOfRange { ring: index, value });
                0.0
            }
            Some(Lenient::Invalid(_)) => {
                warnings.push(ConfigWarning::InvalidStartAngle { ring: index });
                0.0
            }
            None => 0.0,
        };

        let font_size = match spec.font_size {
            Some(Lenient::Valid(size)) if size.is_finite() && size > 0.0 => size,
            Some(_) => {
                warnings.push(ConfigWarning::InvalidFontSize {
                    ring: index,
                    default: default_font_size,
                });
                default_font_size
            }
            None => default_font_size,
        };

        let vertical = match spec.vertical {
            Some(Lenient::Valid(v)) => v,
            Some(Lenient::Invalid(_)) => {
                warnings.push(ConfigWarning::InvalidVertical { ring: index });
                false
            }
            None => false,
        };

        let cells: Vec<Cell> = spec
            .cells
            .into_iter()
            .enumerate()
            .map(|(i, cell)| match cell {
                Cell::Group(gs) if gs.is_empty() => {
                    warnings.push(ConfigWarning::EmptyGroup {
                        ring: index,
                        cell: i,
                    });
                    Cell::Single(Glyph::default())
                }
                other => other,
            })
            .collect();
        if cells.is_empty() {
            warnings.push(ConfigWarning::NoCells { ring: index });
        }

        let mut group_layout = spec.group_layout.unwrap_or_default();
        if !group_layout.is_grouped() && cells.iter().any(Cell::is_group) {
            warnings.push(ConfigWarning::GroupLayoutRequired { ring: index });
            group_layout = GroupLayout::EqualSplit;
        }

        for w in &warnings {
            log::warn!("{}", w);
        }

        let ring = Self {
            label,
            start_angle,
            font_size,
            text_color: spec.text_color,
            vertical,
            group_layout,
            cells,
        };
        (ring, warnings)
    }
}
