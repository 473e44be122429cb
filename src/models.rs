use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::errors::{EngineError, Result};
use crate::geometry::{BoundingBox, EPSILON, Point, bounding_box, path_length};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Language {
    #[serde(rename = "zh")]
    Chinese,
    #[serde(rename = "ja")]
    Japanese,
}

impl Language {
    pub fn code(&self) -> &'static str {
        match self {
            Language::Chinese => "zh",
            Language::Japanese => "ja",
        }
    }

    /// Whether items of this language come in script variants the style filter applies to.
    pub fn has_styles(&self) -> bool {
        match self {
            Language::Chinese => true,
            Language::Japanese => false,
        }
    }
}

impl FromStr for Language {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "zh" => Ok(Language::Chinese),
            "ja" => Ok(Language::Japanese),
            other => Err(EngineError::Validation(format!("unknown language '{}'", other))),
        }
    }
}

/// Kind of knowledge a schedule item tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Part {
    #[serde(rename = "rune")]
    Writing,
    #[serde(rename = "rdng")]
    Reading,
    #[serde(rename = "tone")]
    Tone,
    #[serde(rename = "defn")]
    Definition,
}

impl Part {
    pub const ALL: [Part; 4] = [Part::Writing, Part::Reading, Part::Tone, Part::Definition];

    pub fn code(&self) -> &'static str {
        match self {
            Part::Writing => "rune",
            Part::Reading => "rdng",
            Part::Tone => "tone",
            Part::Definition => "defn",
        }
    }
}

impl FromStr for Part {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "rune" => Ok(Part::Writing),
            "rdng" => Ok(Part::Reading),
            "tone" => Ok(Part::Tone),
            "defn" => Ok(Part::Definition),
            other => Err(EngineError::Validation(format!("unknown part '{}'", other))),
        }
    }
}

/// Script variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Style {
    #[serde(rename = "simp")]
    Simplified,
    #[serde(rename = "trad")]
    Traditional,
    #[serde(rename = "none")]
    Unstyled,
}

impl Style {
    pub fn code(&self) -> &'static str {
        match self {
            Style::Simplified => "simp",
            Style::Traditional => "trad",
            Style::Unstyled => "none",
        }
    }
}

impl FromStr for Style {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "simp" => Ok(Style::Simplified),
            "trad" => Ok(Style::Traditional),
            "none" => Ok(Style::Unstyled),
            other => Err(EngineError::Validation(format!("unknown style '{}'", other))),
        }
    }
}

/// Composite identity of a schedule item, rendered as
/// `user-lang-base-position-part-style`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ItemKey {
    pub user: String,
    pub language: Language,
    pub base: String,
    pub position: u32,
    pub part: Part,
    pub style: Style,
}

impl fmt::Display for ItemKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}-{}-{}-{}-{}",
            self.user,
            self.language.code(),
            self.base,
            self.position,
            self.part.code(),
            self.style.code()
        )
    }
}

impl FromStr for ItemKey {
    type Err = EngineError;

    /// The style segment is optional and defaults to `none`.
    fn from_str(s: &str) -> Result<Self> {
        let segments: Vec<&str> = s.split('-').collect();
        if segments.len() != 5 && segments.len() != 6 {
            return Err(EngineError::Validation(format!("malformed item id '{}'", s)));
        }
        if segments[0].is_empty() || segments[2].is_empty() {
            return Err(EngineError::Validation(format!("malformed item id '{}'", s)));
        }
        let position = segments[3]
            .parse::<u32>()
            .map_err(|_| EngineError::Validation(format!("invalid position in item id '{}'", s)))?;

        Ok(ItemKey {
            user: segments[0].to_string(),
            language: segments[1].parse()?,
            base: segments[2].to_string(),
            position,
            part: segments[4].parse()?,
            style: match segments.get(5) {
                Some(style) => style.parse()?,
                None => Style::Unstyled,
            },
        })
    }
}

impl Serialize for ItemKey {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ItemKey {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Whether the first character of `text` is kana (or the full-width tilde,
/// which is filtered alongside kana).
pub fn is_kana(text: &str) -> bool {
    match text.chars().next() {
        Some(c) => matches!(c as u32, 0x3041..=0x3094 | 0x30A1..=0x30FB | 0xFF5E),
        None => false,
    }
}

/// Schedule item as exchanged with the content store. Timestamps are unix
/// seconds; zero means never reviewed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleRecord {
    pub id: ItemKey,
    #[serde(default)]
    pub interval: f64,
    #[serde(default)]
    pub last: i64,
    #[serde(default)]
    pub next: i64,
    #[serde(default)]
    pub reviews: u32,
    #[serde(default)]
    pub successes: u32,
    #[serde(default)]
    pub vocab_ids: Vec<String>,
    #[serde(default)]
    pub section_ids: Vec<String>,
    #[serde(default)]
    pub vocab_list_ids: Vec<String>,
}

/// Reference stroke as exchanged with the content store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrokeRecord {
    pub id: String,
    pub base: String,
    pub order: u32,
    pub points: Vec<Point>,
}

/// One reference pen stroke: start, corners, end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalStroke {
    pub id: String,
    pub position: usize,
    pub points: Vec<Point>,
}

impl CanonicalStroke {
    pub fn corner_count(&self) -> usize {
        self.points.len().saturating_sub(2)
    }

    pub fn start(&self) -> Point {
        self.points[0]
    }

    pub fn end(&self) -> Point {
        self.points[self.points.len() - 1]
    }
}

/// Ordered reference strokes of one character.
#[derive(Debug, Clone, PartialEq)]
pub struct Glyph {
    base: String,
    strokes: Vec<CanonicalStroke>,
    frame: BoundingBox,
}

impl Glyph {
    /// Builds a glyph from `(id, points)` pairs in stroke order.
    pub fn new(base: &str, strokes: Vec<(String, Vec<Point>)>) -> Result<Self> {
        if strokes.is_empty() {
            return Err(EngineError::Validation(format!("glyph '{}' has no strokes", base)));
        }

        let strokes: Vec<CanonicalStroke> = strokes
            .into_iter()
            .enumerate()
            .map(|(position, (id, points))| CanonicalStroke { id, position, points })
            .collect();

        for stroke in &strokes {
            if stroke.points.len() < 2 || path_length(&stroke.points) < EPSILON {
                return Err(EngineError::Validation(format!(
                    "stroke '{}' of glyph '{}' needs two distinct points",
                    stroke.id, base
                )));
            }
        }

        let all_points: Vec<Point> = strokes.iter().flat_map(|s| s.points.iter().copied()).collect();
        let frame = bounding_box(&all_points, 0.0)
            .ok_or_else(|| EngineError::Validation(format!("glyph '{}' has no points", base)))?;

        Ok(Self {
            base: base.to_string(),
            strokes,
            frame,
        })
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn strokes(&self) -> &[CanonicalStroke] {
        &self.strokes
    }

    pub fn stroke_count(&self) -> usize {
        self.strokes.len()
    }

    /// Bounding box of every reference point; the frame user input is normalized against.
    pub fn frame(&self) -> BoundingBox {
        self.frame
    }
}

/// Reference glyphs keyed by base character.
#[derive(Debug, Clone, Default)]
pub struct GlyphLibrary {
    glyphs: HashMap<String, Glyph>,
}

impl GlyphLibrary {
    pub fn from_records(records: Vec<StrokeRecord>) -> Result<Self> {
        let mut grouped: HashMap<String, Vec<StrokeRecord>> = HashMap::new();
        for record in records {
            grouped.entry(record.base.clone()).or_default().push(record);
        }

        let mut glyphs = HashMap::with_capacity(grouped.len());
        for (base, mut strokes) in grouped {
            strokes.sort_by_key(|s| s.order);
            let glyph = Glyph::new(
                &base,
                strokes.into_iter().map(|s| (s.id, s.points)).collect(),
            )?;
            glyphs.insert(base, glyph);
        }
        Ok(Self { glyphs })
    }

    pub fn get(&self, base: &str) -> Option<&Glyph> {
        self.glyphs.get(base)
    }

    pub fn len(&self) -> usize {
        self.glyphs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.glyphs.is_empty()
    }
}
