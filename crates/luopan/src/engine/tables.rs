//! Fixed luopan lookup tables and the default ring set built from them.

use super::ring::{Cell, GroupLayout, RingLabel, RingSpec};
use strum::{Display, EnumCount, EnumIter, EnumString, IntoStaticStr};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, EnumCount, IntoStaticStr,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Element {
    Wood,
    Fire,
    Earth,
    Metal,
    Water,
}

impl Element {
    pub fn hanzi(self) -> &'static str {
        match self {
            Self::Wood => "木",
            Self::Fire => "火",
            Self::Earth => "土",
            Self::Metal => "金",
            Self::Water => "水",
        }
    }

    /// The element this one feeds in the generating cycle.
    pub fn produces(self) -> Self {
        match self {
            Self::Wood => Self::Fire,
            Self::Fire => Self::Earth,
            Self::Earth => Self::Metal,
            Self::Metal => Self::Water,
            Self::Water => Self::Wood,
        }
    }

    /// The element that feeds this one.
    pub fn produced_by(self) -> Self {
        match self {
            Self::Wood => Self::Water,
            Self::Fire => Self::Wood,
            Self::Earth => Self::Fire,
            Self::Metal => Self::Earth,
            Self::Water => Self::Metal,
        }
    }
}

/// The eight trigrams in later-heaven order, starting north and turning
/// clockwise.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, EnumCount, IntoStaticStr,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Trigram {
    Kan,
    Gen,
    Zhen,
    Xun,
    Li,
    Kun,
    Dui,
    Qian,
}

impl Trigram {
    pub fn hanzi(self) -> &'static str {
        match self {
            Self::Kan => "坎",
            Self::Gen => "艮",
            Self::Zhen => "震",
            Self::Xun => "巽",
            Self::Li => "离",
            Self::Kun => "坤",
            Self::Dui => "兑",
            Self::Qian => "乾",
        }
    }

    pub fn element(self) -> Element {
        match self {
            Self::Kan => Element::Water,
            Self::Gen | Self::Kun => Element::Earth,
            Self::Zhen | Self::Xun => Element::Wood,
            Self::Li => Element::Fire,
            Self::Dui | Self::Qian => Element::Metal,
        }
    }

    pub fn meaning(self) -> &'static str {
        match self {
            Self::Kan => "water, depth and career",
            Self::Gen => "mountain, stillness and knowledge",
            Self::Zhen => "thunder, growth and family",
            Self::Xun => "wind, gentle penetration and wealth",
            Self::Li => "fire, clarity and reputation",
            Self::Kun => "earth, receptivity and partnership",
            Self::Dui => "lake, joy and creativity",
            Self::Qian => "heaven, strength and mentors",
        }
    }

    /// Compass direction the trigram governs.
    pub fn direction(self) -> &'static str {
        DIRECTIONS[self as usize]
    }
}

pub const TRIGRAMS: [Trigram; 8] = [
    Trigram::Kan,
    Trigram::Gen,
    Trigram::Zhen,
    Trigram::Xun,
    Trigram::Li,
    Trigram::Kun,
    Trigram::Dui,
    Trigram::Qian,
];

pub const DIRECTIONS: [&str; 8] = ["北", "东北", "东", "东南", "南", "西南", "西", "西北"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mountain {
    pub name: &'static str,
    pub trigram: Trigram,
    pub element: Element,
}

const fn mountain(name: &'static str, trigram: Trigram, element: Element) -> Mountain {
    Mountain {
        name,
        trigram,
        element,
    }
}

/// The 24 mountains, 15° each, with 子 centered on north.
pub const MOUNTAINS: [Mountain; 24] = [
    mountain("子", Trigram::Kan, Element::Water),
    mountain("癸", Trigram::Kan, Element::Water),
    mountain("丑", Trigram::Gen, Element::Earth),
    mountain("艮", Trigram::Gen, Element::Earth),
    mountain("寅", Trigram::Gen, Element::Wood),
    mountain("甲", Trigram::Zhen, Element::Wood),
    mountain("卯", Trigram::Zhen, Element::Wood),
    mountain("乙", Trigram::Zhen, Element::Wood),
    mountain("辰", Trigram::Xun, Element::Earth),
    mountain("巽", Trigram::Xun, Element::Wood),
    mountain("巳", Trigram::Xun, Element::Fire),
    mountain("丙", Trigram::Li, Element::Fire),
    mountain("午", Trigram::Li, Element::Fire),
    mountain("丁", Trigram::Li, Element::Fire),
    mountain("未", Trigram::Kun, Element::Earth),
    mountain("坤", Trigram::Kun, Element::Earth),
    mountain("申", Trigram::Kun, Element::Metal),
    mountain("庚", Trigram::Dui, Element::Metal),
    mountain("酉", Trigram::Dui, Element::Metal),
    mountain("辛", Trigram::Dui, Element::Metal),
    mountain("戌", Trigram::Qian, Element::Earth),
    mountain("乾", Trigram::Qian, Element::Metal),
    mountain("亥", Trigram::Qian, Element::Water),
    mountain("壬", Trigram::Kan, Element::Water),
];

pub const BRANCHES: [&str; 12] = [
    "子", "丑", "寅", "卯", "辰", "巳", "午", "未", "申", "酉", "戌", "亥",
];

/// Start angle that centers cell 0 of an `n`-cell ring on north.
fn centered(n: usize) -> f64 {
    180.0 / n as f64
}

/// The classic four rings: trigrams with their elements, the eight
/// directions, the 24 mountains and the 12 earthly branches.
pub fn default_rings() -> Vec<RingSpec> {
    vec![
        RingSpec::new(
            TRIGRAMS
                .iter()
                .map(|t| Cell::group([t.hanzi(), t.element().hanzi()])),
        )
        .label(RingLabel::Multi(vec!["八卦".into(), "五行".into()]))
        .start_angle(centered(TRIGRAMS.len()))
        .group_layout(GroupLayout::Nested),
        RingSpec::new(DIRECTIONS)
            .label(RingLabel::Single("八方".into()))
            .start_angle(centered(DIRECTIONS.len())),
        RingSpec::new(MOUNTAINS.iter().map(|m| m.name))
            .label(RingLabel::Single("二十四山".into()))
            .start_angle(centered(MOUNTAINS.len())),
        RingSpec::new(BRANCHES)
            .label(RingLabel::Single("地支".into()))
            .start_angle(centered(BRANCHES.len())),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_table_sizes() {
        assert_eq!(MOUNTAINS.len(), 24);
        assert_eq!(TRIGRAMS.len(), Trigram::COUNT);
        assert_eq!(Element::iter().count(), 5);
    }

    #[test]
    fn test_generating_cycle_closes() {
        for e in Element::iter() {
            assert_eq!(e.produces().produced_by(), e);
        }
        let mut e = Element::Wood;
        for _ in 0..5 {
            e = e.produces();
        }
        assert_eq!(e, Element::Wood);
    }

    #[test]
    fn test_trigram_order_matches_enum() {
        for (i, t) in Trigram::iter().enumerate() {
            assert_eq!(TRIGRAMS[i], t);
        }
        assert_eq!(Trigram::Li.direction(), "南");
        assert_eq!("QIAN".parse::<Trigram>().unwrap(), Trigram::Qian);
    }

    #[test]
    fn test_mountain_palaces_are_contiguous() {
        // each trigram palace owns three consecutive mountains, 壬 wraps to 坎
        for (i, t) in TRIGRAMS.iter().enumerate() {
            let owned: Vec<_> = (0..3)
                .map(|k| MOUNTAINS[(i * 3 + 23 + k) % 24].trigram)
                .collect();
            assert_eq!(owned, vec![*t; 3], "palace {t}");
        }
    }

    #[test]
    fn test_default_rings_shape() {
        let rings = default_rings();
        assert_eq!(rings.len(), 4);
        assert_eq!(rings[0].cells[0], Cell::group(["坎", "水"]));
        assert_eq!(rings[2].cells.len(), 24);
        assert_eq!(rings[3].cells[6], Cell::from("午"));
    }
}
