//! Suggestions: proposed card ideas open for voting
//!
use std::{borrow::Borrow, fmt};

use serde::{Deserialize, Deserializer, Serialize};

use crate::catalog::CatalogIndex;

/// Suggestion identifier. Catalogs may use integer or string ids; both normalize to a string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct SuggestionId(String);

impl SuggestionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl<'de> Deserialize<'de> for SuggestionId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Text(String),
            Int(i64),
        }
        Ok(match RawId::deserialize(deserializer)? {
            RawId::Text(s) => Self(s),
            RawId::Int(n) => Self(n.to_string()),
        })
    }
}

impl fmt::Display for SuggestionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SuggestionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for SuggestionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<u64> for SuggestionId {
    fn from(n: u64) -> Self {
        Self(n.to_string())
    }
}

impl AsRef<str> for SuggestionId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for SuggestionId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// How far a suggestion pushes its subject
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Deserialize,
    Serialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Distance {
    Safe,
    Spicy,
    #[default]
    #[serde(other)]
    Unknown,
}

/// A proposed card
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Suggestion {
    pub id: SuggestionId,
    pub series: String,
    pub title: String,
    #[serde(default)]
    pub pitch: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name_a: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name_b: Option<String>,
    #[serde(default)]
    pub distance: Distance,
    #[serde(default)]
    pub tone_tags: Vec<String>,
}

impl Suggestion {
    /// A/B names for display and export; each falls back to the title.
    pub fn pick_names(&self) -> (&str, &str) {
        (
            self.name_a.as_deref().unwrap_or(&self.title),
            self.name_b.as_deref().unwrap_or(&self.title),
        )
    }
}

/// Suggestion catalog document
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SuggestionManifest {
    #[serde(default)]
    pub suggestions: Vec<Suggestion>,
}

/// Display metadata for a suggestion series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SeriesMeta {
    pub emoji: &'static str,
    pub color: &'static str,
    pub description: &'static str,
}

/// Metadata used for series not in the table
pub const FALLBACK_SERIES_META: SeriesMeta = SeriesMeta {
    emoji: "🃏",
    color: "#e85d3a",
    description: "",
};

const SERIES_META: &[(&str, SeriesMeta)] = &[
    (
        "Suburban Apocalypse",
        SeriesMeta {
            emoji: "🏚️",
            color: "#2dce89",
            description: "The end of the world, HOA-approved. Everyday suburbia becomes slow, disgusting collapse: paperwork, lawns, basements, and polite panic.",
        },
    ),
    (
        "Influencer Wasteland",
        SeriesMeta {
            emoji: "📱",
            color: "#f5365c",
            description: "Fame as toxic waste. Bodies mutate around metrics, sponsorships attach to organs, and personalities hollow into UI components.",
        },
    ),
    (
        "TikTok Terrors",
        SeriesMeta {
            emoji: "🎵",
            color: "#fb6340",
            description: "Trends as traps. Filters erase faces, loops lock bodies, and viral sounds restructure skeletons.",
        },
    ),
    (
        "Reality Ruination",
        SeriesMeta {
            emoji: "📺",
            color: "#ffd832",
            description: "Nothing is scripted; everything is cruel. Eliminations, confessionals, edits and scoreboards become literal mechanisms of harm.",
        },
    ),
    (
        "Hollywood Has-Beens",
        SeriesMeta {
            emoji: "🎬",
            color: "#11cdef",
            description: "The reboot never stops. Green screens, makeup rot, and nostalgia parasites recycle identity until it fails.",
        },
    ),
    (
        "Horror Classics Parodies",
        SeriesMeta {
            emoji: "🔪",
            color: "#8b5cf6",
            description: "Classic horror meets modern inconvenience: compliance monsters, subscription jump scares, haunted paperwork.",
        },
    ),
    (
        "Sci-Fi Future Misfits",
        SeriesMeta {
            emoji: "🚀",
            color: "#06b6d4",
            description: "The future optimizes humans incorrectly. Patches, protocols, and \"helpful\" systems turn bodies into error states.",
        },
    ),
    (
        "Election Trash Talk",
        SeriesMeta {
            emoji: "🗳️",
            color: "#ef4444",
            description: "Power as performance. Polls, debates, and media cycles become physical burdens and grotesque theater.",
        },
    ),
    (
        "Mythical Mayhem",
        SeriesMeta {
            emoji: "⚡",
            color: "#eab308",
            description: "Ancient gods meet modern systems. Oracles become apps, hydras become interest, and curses arrive by certified mail.",
        },
    ),
    (
        "Cabbage Patch Rejects",
        SeriesMeta {
            emoji: "🧸",
            color: "#ec4899",
            description: "Mass-produced innocence breaks. Dolls malfunction, recalls become spells, and soft materials develop teeth.",
        },
    ),
    (
        "Monster Mash-Up",
        SeriesMeta {
            emoji: "👹",
            color: "#a855f7",
            description: "Hybrid monsters fail loudly. Transformations stall, parts reject each other, and curses overlap into sludge.",
        },
    ),
];

impl SeriesMeta {
    /// Metadata for a series name, or the fallback
    pub fn for_series(name: &str) -> SeriesMeta {
        SERIES_META
            .iter()
            .find(|(series, _)| *series == name)
            .map_or(FALLBACK_SERIES_META, |(_, meta)| *meta)
    }
}

impl CatalogIndex {
    /// Suggestion series names in order of first appearance
    pub fn suggestion_series(&self) -> &[String] {
        &self.suggestion_series
    }

    /// Position of a series in first-appearance order
    pub fn suggestion_series_position(&self, series: &str) -> Option<usize> {
        self.suggestion_series_order.get(series).copied()
    }

    /// Number of suggestions in a series
    pub fn suggestion_series_count(&self, series: &str) -> usize {
        self.suggestions()
            .iter()
            .filter(|s| s.series == series)
            .count()
    }

    pub fn suggestion(&self, id: &SuggestionId) -> Option<&Suggestion> {
        self.suggestions().iter().find(|s| &s.id == id)
    }
}
