//! Direction assessment from the 24-mountain and 8-trigram tables.
//!
//! `analyze` is a pure lookup: no randomness, no I/O. The scoring is a fixed
//! heuristic and is reproduced as is.

use crate::engine::tables::{MOUNTAINS, Mountain, TRIGRAMS, Trigram};
use bearing::normalize;
use strum::{Display, EnumString};

pub const FAVORABLE_TOLERANCE: f64 = 15.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum Classification {
    Favorable,
    Unfavorable,
    Neutral,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sector24 {
    pub index: usize,
    pub mountain: Mountain,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sector8 {
    pub index: usize,
    pub trigram: Trigram,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Analysis {
    pub angle: f64,
    pub sector24: Sector24,
    pub sector8: Sector8,
    pub classification: Classification,
    pub confidence: f64,
    pub narrative: String,
    pub suggestions: Vec<String>,
    /// The mountain behind the reading (same as `sector24`).
    pub sitting: Mountain,
    /// The mountain directly opposite `sitting`.
    pub facing: Mountain,
}

pub fn sector24_index(angle: f64) -> usize {
    (normalize(angle) / 15.0).round() as usize % MOUNTAINS.len()
}

pub fn sector8_index(angle: f64) -> usize {
    (normalize(angle + 22.5) / 45.0).floor() as usize % TRIGRAMS.len()
}

/// Distance from `angle` to the nearest point of the grid `offset + 45k`.
fn grid_distance(angle: f64, offset: f64) -> f64 {
    let r = (angle - offset).rem_euclid(45.0);
    r.min(45.0 - r)
}

/// Favorable near a multiple of 45°, unfavorable near the 22.5° offset grid.
///
/// The two bands overlap between 7.5° and 15° from a multiple of 45°; the
/// favorable check wins there.
pub fn classify(angle: f64) -> Classification {
    let a = normalize(angle);
    if grid_distance(a, 0.0) <= FAVORABLE_TOLERANCE {
        Classification::Favorable
    } else if grid_distance(a, 22.5) <= FAVORABLE_TOLERANCE {
        Classification::Unfavorable
    } else {
        Classification::Neutral
    }
}

pub fn confidence(angle: f64) -> f64 {
    let within = normalize(angle).rem_euclid(45.0);
    (0.8 + 0.2 * within.to_radians().cos()).min(0.99)
}

pub fn analyze(angle: f64) -> Analysis {
    let angle = normalize(angle);
    let s24 = sector24_index(angle);
    let s8 = sector8_index(angle);
    let sitting = MOUNTAINS[s24];
    let facing = MOUNTAINS[(s24 + 12) % MOUNTAINS.len()];
    let trigram = TRIGRAMS[s8];
    let classification = classify(angle);

    let narrative = format!(
        "Sitting {} ({} palace, {}) facing {}. The {} trigram governs the {} and stands for {}.",
        sitting.name,
        sitting.trigram.hanzi(),
        sitting.element.hanzi(),
        facing.name,
        trigram.hanzi(),
        trigram.direction(),
        trigram.meaning(),
    );

    Analysis {
        angle,
        sector24: Sector24 {
            index: s24,
            mountain: sitting,
        },
        sector8: Sector8 { index: s8, trigram },
        classification,
        confidence: confidence(angle),
        narrative,
        suggestions: suggestions(classification, sitting, trigram),
        sitting,
        facing,
    }
}

fn suggestions(class: Classification, sitting: Mountain, trigram: Trigram) -> Vec<String> {
    let element = sitting.element;
    match class {
        Classification::Favorable => vec![
            format!(
                "Keep the {} side open and well lit to draw on {}.",
                trigram.direction(),
                trigram.meaning()
            ),
            format!(
                "Support the {} line with {} ({}) accents.",
                sitting.name,
                element.produced_by(),
                element.produced_by().hanzi()
            ),
        ],
        Classification::Unfavorable => vec![
            format!(
                "Soften the {} line with {} ({}) elements to drain its {}.",
                sitting.name,
                element.produces(),
                element.produces().hanzi(),
                element
            ),
            format!(
                "Avoid placing the main door or desk toward {}.",
                trigram.direction()
            ),
        ],
        Classification::Neutral => vec![format!(
            "Balance the {} side with a mix of {} and {}.",
            trigram.direction(),
            element,
            element.produces()
        )],
    }
}
