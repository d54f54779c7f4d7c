//! Release version parsing and ordering.
//!
//! Table releases are named inconsistently (`25.2`, `25.2F`, `25.2.F`,
//! `25..2.f`). Every token is reduced to a canonical `major.minor[.more].L`
//! form whose last segment is a single uppercase letter (`E` when the
//! source carries none), and canonical versions are totally ordered so the
//! newest remote release can be picked and output paths are deterministic.
//!
//! Digits are kept as written (`25.02` stays `25.02.E`) but compare by
//! value. A lone core segment always gets a `0` minor, so `25.F` becomes
//! `25.0.F`; trees written by older tooling used `25.F.E` for that input.

use std::cmp::Ordering;
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Suffix applied when a version carries no explicit letter.
pub const DEFAULT_SUFFIX: char = 'E';

/// One dot-separated piece of a canonical version.
#[derive(Debug, Clone)]
pub enum Segment {
    /// All-digit segment, compared numerically and rendered as written.
    Number { value: u64, text: String },
    /// Single uppercase letter, compared by ordinal.
    Letter(char),
    /// Anything else (e.g. `RC1`), compared as text.
    Token(String),
}

impl Segment {
    fn parse(part: &str) -> Self {
        if !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(value) = part.parse::<u64>() {
                return Self::Number {
                    value,
                    text: part.to_string(),
                };
            }
        }
        let mut chars = part.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) if c.is_ascii_uppercase() => Self::Letter(c),
            _ => Self::Token(part.to_string()),
        }
    }

    fn zero() -> Self {
        Self::Number {
            value: 0,
            text: "0".to_string(),
        }
    }

    fn is_letter(part: &str) -> bool {
        part.len() == 1 && part.bytes().all(|b| b.is_ascii_uppercase())
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number { text, .. } => f.write_str(text),
            Self::Letter(c) => write!(f, "{c}"),
            Self::Token(t) => f.write_str(t),
        }
    }
}

fn compare_segments(a: &Segment, b: &Segment) -> Ordering {
    match (a, b) {
        (Segment::Number { value: x, .. }, Segment::Number { value: y, .. }) => x.cmp(y),
        (Segment::Letter(x), Segment::Letter(y)) => x.cmp(y),
        _ => a.to_string().cmp(&b.to_string()),
    }
}

/// A canonical release version.
///
/// Always at least two leading segments followed by one letter segment.
/// Equality and ordering follow [`compare`], so `1.0.E` and `1.0.E.E`
/// are equal even though they print differently.
#[derive(Debug, Clone)]
pub struct Version {
    segments: Vec<Segment>,
}

impl Version {
    /// The neutral version `0.0.E`.
    #[must_use]
    pub fn zero() -> Self {
        Self {
            segments: vec![
                Segment::zero(),
                Segment::zero(),
                Segment::Letter(DEFAULT_SUFFIX),
            ],
        }
    }

    /// Segments in order, suffix last.
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// The trailing letter.
    pub fn suffix(&self) -> char {
        match self.segments.last() {
            Some(Segment::Letter(c)) => *c,
            _ => DEFAULT_SUFFIX,
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            write!(f, "{segment}")?;
        }
        Ok(())
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.segments.len().max(other.segments.len());
        let pad = |i: usize| {
            if i == len - 1 {
                Segment::Letter(DEFAULT_SUFFIX)
            } else {
                Segment::zero()
            }
        };

        for i in 0..len {
            let a = self.segments.get(i).cloned().unwrap_or_else(|| pad(i));
            let b = other.segments.get(i).cloned().unwrap_or_else(|| pad(i));
            let ord = compare_segments(&a, &b);
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl FromStr for Version {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(normalize(s))
    }
}

impl Serialize for Version {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Version {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(normalize(&raw))
    }
}

/// Normalize a freeform version token.
///
/// # Examples
/// ```
/// use ibptax_harvester::version::normalize;
///
/// assert_eq!(normalize("25.2F").to_string(), "25.2.F");
/// assert_eq!(normalize("").to_string(), "0.0.E");
/// assert_eq!(normalize("25").to_string(), "25.0.E");
/// ```
pub fn normalize(raw: &str) -> Version {
    if raw.trim().is_empty() {
        return Version::zero();
    }

    let cleaned: String = raw
        .chars()
        .map(|c| c.to_ascii_uppercase())
        .filter(|c| c.is_ascii_digit() || c.is_ascii_uppercase() || *c == '.')
        .collect();

    // Splitting and dropping empties collapses repeated dots and trims both ends.
    let mut parts: Vec<String> = cleaned
        .split('.')
        .filter(|p| !p.is_empty())
        .map(String::from)
        .collect();

    // "25.2F" -> "25.2.F"
    if let Some(last) = parts.last_mut() {
        let bytes = last.as_bytes();
        let n = bytes.len();
        if n >= 2 && bytes[n - 1].is_ascii_uppercase() && bytes[n - 2].is_ascii_digit() {
            let letter = last.split_off(n - 1);
            parts.push(letter);
        }
    }

    if parts.is_empty() {
        return Version::zero();
    }

    let has_suffix = parts.len() > 1 && parts.last().is_some_and(|p| Segment::is_letter(p));
    let suffix = if has_suffix { parts.pop() } else { None };

    if parts.len() == 1 {
        parts.push("0".to_string());
    }

    let mut segments: Vec<Segment> = parts.iter().map(|p| Segment::parse(p)).collect();
    segments.push(match suffix.as_deref().map(Segment::parse) {
        Some(letter @ Segment::Letter(_)) => letter,
        _ => Segment::Letter(DEFAULT_SUFFIX),
    });

    Version { segments }
}

/// Normalize and render in canonical text form.
pub fn normalize_str(raw: &str) -> String {
    normalize(raw).to_string()
}

/// Compare two freeform version tokens after normalizing both.
///
/// # Examples
/// ```
/// use std::cmp::Ordering;
/// use ibptax_harvester::version::compare;
///
/// assert_eq!(compare("25.2.F", "25.10.E"), Ordering::Less);
/// assert_eq!(compare("25.2", "25.2.E"), Ordering::Equal);
/// ```
pub fn compare(v1: &str, v2: &str) -> Ordering {
    normalize(v1).cmp(&normalize(v2))
}
