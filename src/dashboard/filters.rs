//! Filter parameters accepted by every dashboard query.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Default upper bound of the rank slider.
pub const DEFAULT_MAX_RANK: i32 = 500;
/// Used when the rankings table is empty.
pub const DEFAULT_MAX_POINTS: i32 = 10_000;
pub const DEFAULT_MAX_COMPETITIONS_PLAYED: i32 = 50;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NameMatch {
    /// Whole name, case-insensitive.
    Exact(String),
    /// Substring, case-insensitive.
    Partial(String),
}

impl NameMatch {
    /// `ILIKE` pattern with the user's `%`, `_` and `\` taken literally.
    pub fn ilike_pattern(&self) -> String {
        match self {
            NameMatch::Exact(name) => escape_like(name),
            NameMatch::Partial(fragment) => format!("%{}%", escape_like(fragment)),
        }
    }
}

fn escape_like(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

/// Placeholder: the stored rankings carry no gender, so this filter is accepted
/// and ignored.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Men,
    Women,
}

impl FromStr for Gender {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "men" => Ok(Gender::Men),
            "women" => Ok(Gender::Women),
            other => Err(format!("unknown gender '{}' (expected men or women)", other)),
        }
    }
}

/// Inclusive numeric range.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Range {
    pub min: i32,
    pub max: i32,
}

impl Range {
    pub const UNBOUNDED: Range = Range {
        min: i32::MIN,
        max: i32::MAX,
    };

    pub fn new(min: i32, max: i32) -> Self {
        if min <= max { Range { min, max } } else { Range { min: max, max: min } }
    }

    pub fn contains(&self, value: i32) -> bool {
        self.min <= value && value <= self.max
    }
}

impl Display for Range {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match (self.min == i32::MIN, self.max == i32::MAX) {
            (true, true) => write!(f, "any"),
            (false, true) => write!(f, ">= {}", self.min),
            (true, false) => write!(f, "<= {}", self.max),
            (false, false) => write!(f, "{}..={}", self.min, self.max),
        }
    }
}

/// User-supplied `MIN:MAX`; an empty side keeps the bound it replaces.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Bounds {
    pub min: Option<i32>,
    pub max: Option<i32>,
}

impl Bounds {
    pub fn over(self, base: Range) -> Range {
        Range::new(self.min.unwrap_or(base.min), self.max.unwrap_or(base.max))
    }
}

impl FromStr for Bounds {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (lo, hi) = s
            .split_once(':')
            .ok_or_else(|| format!("range '{}' must look like MIN:MAX", s))?;
        let bound = |v: &str| -> Result<Option<i32>, String> {
            let v = v.trim();
            if v.is_empty() {
                return Ok(None);
            }
            v.parse::<i32>()
                .map(Some)
                .map_err(|_| format!("range '{}': '{}' is not a whole number", s, v))
        };
        Ok(Bounds {
            min: bound(lo)?,
            max: bound(hi)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Filters {
    pub competitor: Option<NameMatch>,
    pub country: Option<String>,
    pub category: Option<String>,
    pub gender: Option<Gender>,
    pub rank: Range,
    pub points: Range,
    pub competitions_played: Range,
}

impl Default for Filters {
    fn default() -> Self {
        Filters {
            competitor: None,
            country: None,
            category: None,
            gender: None,
            rank: Range::UNBOUNDED,
            points: Range::UNBOUNDED,
            competitions_played: Range::UNBOUNDED,
        }
    }
}

impl Filters {
    /// Slider defaults: rank 1..=500, points and competitions from 0 to the
    /// largest stored value.
    pub fn seeded(max_points: i32, max_competitions_played: i32) -> Self {
        Filters {
            rank: Range::new(1, DEFAULT_MAX_RANK),
            points: Range::new(0, max_points),
            competitions_played: Range::new(0, max_competitions_played),
            ..Filters::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_metacharacters_are_literal() {
        assert_eq!(NameMatch::Exact("100%_ace\\".into()).ilike_pattern(), r"100\%\_ace\\");
        assert_eq!(NameMatch::Partial("Pavic".into()).ilike_pattern(), "%Pavic%");
    }

    #[test]
    fn ranges_are_inclusive_and_normalized() {
        let r = Range::new(20, 10);
        assert_eq!(r, Range { min: 10, max: 20 });
        assert!(r.contains(10) && r.contains(20));
        assert!(!r.contains(21));
    }

    #[test]
    fn bounds_replace_only_the_given_side() {
        let seeded = Range::new(1, DEFAULT_MAX_RANK);
        assert_eq!("10:20".parse::<Bounds>().unwrap().over(seeded), Range { min: 10, max: 20 });
        assert_eq!(":50".parse::<Bounds>().unwrap().over(seeded), Range { min: 1, max: 50 });
        assert_eq!("100:".parse::<Bounds>().unwrap().over(seeded), Range { min: 100, max: 500 });
        assert!("10-20".parse::<Bounds>().is_err());
        assert!("ten:20".parse::<Bounds>().unwrap_err().contains("'ten'"));
    }

    #[test]
    fn ranges_display_their_open_ends() {
        assert_eq!(Range::UNBOUNDED.to_string(), "any");
        assert_eq!(Range::new(1, 500).to_string(), "1..=500");
        assert_eq!(Range { min: 0, max: i32::MAX }.to_string(), ">= 0");
    }

    #[test]
    fn gender_names_parse() {
        assert_eq!("Women".parse::<Gender>(), Ok(Gender::Women));
        assert!("mixed".parse::<Gender>().is_err());
    }

    #[test]
    fn seeded_filters_match_slider_defaults() {
        let f = Filters::seeded(8720, 23);
        assert_eq!(f.rank, Range { min: 1, max: 500 });
        assert_eq!(f.points, Range { min: 0, max: 8720 });
        assert_eq!(f.competitions_played, Range { min: 0, max: 23 });
        assert!(f.competitor.is_none() && f.gender.is_none());
    }
}
