use palette::{Srgb, Srgba, WithAlpha};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_with::{DeserializeFromStr, SerializeDisplay};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;
use strum::{Display as StrumDisplay, EnumIter, EnumString, IntoEnumIterator};
use thiserror::Error;

#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    DeserializeFromStr,
    EnumString,
    EnumIter,
    StrumDisplay,
)]
#[strum(ascii_case_insensitive, serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ThemeName {
    #[default]
    #[strum(to_string = "compass", serialize = "classic")]
    Compass,
    #[strum(to_string = "dark", serialize = "night")]
    Dark,
    Simple,
    Polygon,
    Crice,
}

impl ThemeName {
    /// The theme after this one, wrapping around.
    pub fn next(self) -> Self {
        let all: Vec<_> = Self::iter().collect();
        let idx = all.iter().position(|&t| t == self).unwrap_or(0);
        all[(idx + 1) % all.len()]
    }
}

#[derive(Debug, Error, PartialEq)]
#[error("invalid color '{0}', expected #rrggbb or #rrggbbaa")]
pub struct ColorParseError(String);

/// Color written as a hex string in configuration files.
#[derive(Debug, Clone, Copy, PartialEq, DeserializeFromStr, SerializeDisplay)]
pub struct HexColor(pub Srgba<f64>);

impl FromStr for HexColor {
    type Err = ColorParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ColorParseError(s.to_string());
        let digits = s.trim().trim_start_matches('#');
        if !digits.is_ascii() {
            return Err(err());
        }

        let (rgb, alpha) = match digits.len() {
            8 => (&digits[..6], Some(&digits[6..])),
            3 | 6 => (digits, None),
            _ => return Err(err()),
        };
        let rgb = Srgb::<u8>::from_str(rgb).map_err(|_| err())?;
        let alpha = match alpha {
            Some(a) => u8::from_str_radix(a, 16).map_err(|_| err())?,
            None => u8::MAX,
        };

        Ok(Self(
            rgb.into_format::<f64>()
                .with_alpha(f64::from(alpha) / 255.0),
        ))
    }
}

impl fmt::Display for HexColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c: Srgba<u8> = self.0.into_format();
        write!(
            f,
            "#{:02x}{:02x}{:02x}{:02x}",
            c.red, c.green, c.blue, c.alpha
        )
    }
}

impl From<HexColor> for Srgba<f64> {
    fn from(c: HexColor) -> Self {
        c.0
    }
}

fn rgb(r: u8, g: u8, b: u8) -> Srgba<f64> {
    rgba(r, g, b, 1.0)
}

fn rgba(r: u8, g: u8, b: u8, alpha: f64) -> Srgba<f64> {
    Srgb::new(r, g, b).into_format::<f64>().with_alpha(alpha)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThemeColors {
    pub background: Srgba<f64>,
    pub border: Srgba<f64>,
    pub text: Srgba<f64>,
    pub tick: Srgba<f64>,
    pub crosshair: Srgba<f64>,
    pub pointer: Srgba<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Shadow {
    pub color: Srgba<f64>,
    pub blur_radius: f64,
    pub offset: (f64, f64),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Animation {
    /// Nominal settle time. An override that sets only this derives a
    /// damping that closes all but 1% of a gap in that time.
    pub duration_ms: u32,
    /// Fraction of the remaining angular gap closed per frame.
    pub damping_factor: f64,
}

/// Frame rate the per-frame damping is tuned for.
pub const FRAME_RATE: f64 = 60.0;
const SETTLE_REMAINDER: f64 = 0.01;

impl Animation {
    /// Damping factor that leaves 1% of a gap after `duration_ms` at
    /// [`FRAME_RATE`]. A zero duration jumps straight to the target.
    pub fn damping_for_duration(duration_ms: u32) -> f64 {
        if duration_ms == 0 {
            return 1.0;
        }
        let frames = (duration_ms as f64 * FRAME_RATE / 1000.0).max(1.0);
        1.0 - SETTLE_REMAINDER.powf(1.0 / frames)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Theme {
    pub name: ThemeName,
    pub colors: ThemeColors,
    /// Annulus fills, picked by ring index modulo length.
    pub ring_gradients: Vec<(Srgba<f64>, Srgba<f64>)>,
    pub shadow: Option<Shadow>,
    pub animation: Animation,
    /// Calibration added to every device heading while this theme is active.
    pub heading_offset: f64,
    pub label_font: String,
}

impl Theme {
    pub fn ring_gradient(&self, ring: usize) -> (Srgba<f64>, Srgba<f64>) {
        if self.ring_gradients.is_empty() {
            return (self.colors.background, self.colors.background);
        }
        self.ring_gradients[ring % self.ring_gradients.len()]
    }

    fn builtin(name: ThemeName) -> Self {
        let serif = "Noto Serif CJK SC".to_string();
        let sans = "Noto Sans CJK SC".to_string();

        match name {
            ThemeName::Compass => Self {
                name,
                colors: ThemeColors {
                    background: rgb(245, 230, 200),
                    border: rgb(120, 72, 32),
                    text: rgb(60, 30, 10),
                    tick: rgb(140, 40, 20),
                    crosshair: rgb(200, 30, 30),
                    pointer: rgb(200, 30, 30),
                },
                ring_gradients: vec![
                    (rgb(250, 240, 215), rgb(232, 210, 170)),
                    (rgb(240, 220, 180), rgb(220, 190, 140)),
                    (rgb(250, 235, 200), rgb(230, 205, 160)),
                ],
                shadow: Some(Shadow {
                    color: rgba(0, 0, 0, 0.35),
                    blur_radius: 12.0,
                    offset: (0.0, 4.0),
                }),
                animation: Animation {
                    duration_ms: 250,
                    damping_factor: 0.12,
                },
                heading_offset: 0.0,
                label_font: serif,
            },
            ThemeName::Dark => Self {
                name,
                colors: ThemeColors {
                    background: rgb(18, 18, 24),
                    border: rgb(90, 90, 110),
                    text: rgb(230, 230, 240),
                    tick: rgb(200, 200, 220),
                    crosshair: rgb(236, 72, 153),
                    pointer: rgb(248, 113, 113),
                },
                ring_gradients: vec![
                    (rgb(30, 30, 40), rgb(45, 45, 60)),
                    (rgb(24, 24, 34), rgb(38, 38, 52)),
                ],
                shadow: Some(Shadow {
                    color: rgba(236, 72, 153, 0.25),
                    blur_radius: 18.0,
                    offset: (0.0, 0.0),
                }),
                animation: Animation {
                    duration_ms: 250,
                    damping_factor: 0.12,
                },
                heading_offset: 0.0,
                label_font: sans,
            },
            ThemeName::Simple => Self {
                name,
                colors: ThemeColors {
                    background: rgb(250, 250, 250),
                    border: rgb(160, 160, 160),
                    text: rgb(40, 40, 40),
                    tick: rgb(90, 90, 90),
                    crosshair: rgb(59, 130, 246),
                    pointer: rgb(59, 130, 246),
                },
                ring_gradients: vec![(rgb(255, 255, 255), rgb(243, 244, 246))],
                shadow: None,
                animation: Animation {
                    duration_ms: 200,
                    damping_factor: 0.18,
                },
                heading_offset: 0.0,
                label_font: sans,
            },
            ThemeName::Polygon => Self {
                name,
                colors: ThemeColors {
                    background: rgb(15, 40, 48),
                    border: rgb(45, 212, 191),
                    text: rgb(204, 251, 241),
                    tick: rgb(94, 234, 212),
                    crosshair: rgb(250, 204, 21),
                    pointer: rgb(250, 204, 21),
                },
                ring_gradients: vec![
                    (rgb(17, 94, 89), rgb(19, 78, 74)),
                    (rgb(15, 118, 110), rgb(17, 94, 89)),
                    (rgb(13, 148, 136), rgb(15, 118, 110)),
                ],
                shadow: Some(Shadow {
                    color: rgba(0, 0, 0, 0.4),
                    blur_radius: 10.0,
                    offset: (2.0, 2.0),
                }),
                animation: Animation {
                    duration_ms: 300,
                    damping_factor: 0.1,
                },
                heading_offset: 0.0,
                label_font: sans,
            },
            ThemeName::Crice => Self {
                name,
                colors: ThemeColors {
                    background: rgb(232, 236, 240),
                    border: rgb(51, 65, 85),
                    text: rgb(15, 23, 42),
                    tick: rgb(30, 41, 59),
                    crosshair: rgb(220, 38, 38),
                    pointer: rgb(220, 38, 38),
                },
                ring_gradients: vec![
                    (rgb(241, 245, 249), rgb(226, 232, 240)),
                    (rgb(226, 232, 240), rgb(203, 213, 225)),
                ],
                shadow: Some(Shadow {
                    color: rgba(15, 23, 42, 0.3),
                    blur_radius: 6.0,
                    offset: (1.0, 3.0),
                }),
                animation: Animation {
                    duration_ms: 150,
                    damping_factor: 0.2,
                },
                heading_offset: 0.0,
                label_font: serif,
            },
        }
    }
}

/// Per-theme tweaks read from the config file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ThemeOverride {
    pub name: ThemeName,
    pub background: Option<HexColor>,
    pub border: Option<HexColor>,
    pub text: Option<HexColor>,
    pub tick: Option<HexColor>,
    pub crosshair: Option<HexColor>,
    pub pointer: Option<HexColor>,
    pub duration_ms: Option<u32>,
    pub damping_factor: Option<f64>,
    pub heading_offset: Option<f64>,
    pub label_font: Option<String>,
}

impl ThemeOverride {
    fn apply(&self, theme: &mut Theme) {
        let colors = &mut theme.colors;
        for (slot, value) in [
            (&mut colors.background, self.background),
            (&mut colors.border, self.border),
            (&mut colors.text, self.text),
            (&mut colors.tick, self.tick),
            (&mut colors.crosshair, self.crosshair),
            (&mut colors.pointer, self.pointer),
        ] {
            if let Some(c) = value {
                *slot = c.into();
            }
        }

        if let Some(ms) = self.duration_ms {
            theme.animation.duration_ms = ms;
            if self.damping_factor.is_none() {
                theme.animation.damping_factor = Animation::damping_for_duration(ms);
            }
        }
        match self.damping_factor {
            Some(d) if d > 0.0 && d <= 1.0 => theme.animation.damping_factor = d,
            Some(d) => log::warn!(
                "Theme '{}': damping factor {} outside (0, 1], keeping {}",
                self.name,
                d,
                theme.animation.damping_factor
            ),
            None => {}
        }
        if let Some(offset) = self.heading_offset.filter(|o| o.is_finite()) {
            theme.heading_offset = offset;
        }
        if let Some(font) = &self.label_font {
            theme.label_font = font.clone();
        }
    }
}

#[derive(Debug, Clone)]
pub struct ThemeRegistry {
    themes: HashMap<ThemeName, Theme>,
}

impl ThemeRegistry {
    pub fn builtin() -> Self {
        Self {
            themes: ThemeName::iter().map(|n| (n, Theme::builtin(n))).collect(),
        }
    }

    pub fn with_overrides(overrides: &[ThemeOverride]) -> Self {
        let mut registry = Self::builtin();
        for o in overrides {
            if let Some(theme) = registry.themes.get_mut(&o.name) {
                o.apply(theme);
            }
        }
        registry
    }

    pub fn get(&self, name: ThemeName) -> &Theme {
        // every ThemeName is inserted by builtin()
        &self.themes[&name]
    }

    pub fn names(&self) -> impl Iterator<Item = ThemeName> {
        ThemeName::iter()
    }
}

impl Default for ThemeRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

static REGISTRY: OnceLock<RwLock<ThemeRegistry>> = OnceLock::new();

/// Replaces the process-wide registry (config reload).
pub fn install(registry: ThemeRegistry) {
    let lock = REGISTRY.get_or_init(|| RwLock::new(ThemeRegistry::builtin()));
    *lock.write() = registry;
}

pub fn lookup(name: ThemeName) -> Theme {
    let lock = REGISTRY.get_or_init(|| RwLock::new(ThemeRegistry::builtin()));
    lock.read().get(name).clone()
}
