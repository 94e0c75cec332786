//! Sample catalog data and record builders, for tests and doc examples.
use crate::{
    catalog::{Card, CardManifest, CatalogIndex},
    suggestions::{Distance, Suggestion, SuggestionId, SuggestionManifest},
};

/// Card without images
pub fn card(series: &str, number: u32, variant: Option<&str>, name: &str) -> Card {
    Card {
        series_id: series.to_string(),
        number,
        variant: variant.map(str::to_string),
        name: name.to_string(),
        other_name: None,
        description: None,
        raw_image: None,
        framed_image: None,
    }
}

/// Card with a framed image at `framed/{series}-{number}.webp`
pub fn framed_card(series: &str, number: u32, variant: Option<&str>, name: &str) -> Card {
    Card {
        framed_image: Some(format!("framed/{series}-{number}.webp")),
        ..card(series, number, variant, name)
    }
}

/// Card with only a raw image
pub fn raw_card(series: &str, number: u32, variant: Option<&str>, name: &str) -> Card {
    Card {
        raw_image: Some(format!("raw/{series}-{number}.png")),
        ..card(series, number, variant, name)
    }
}

pub fn suggestion(id: &str, series: &str, title: &str, tags: &[&str]) -> Suggestion {
    Suggestion {
        id: SuggestionId::from(id),
        series: series.to_string(),
        title: title.to_string(),
        pitch: String::new(),
        name_a: None,
        name_b: None,
        distance: Distance::Unknown,
        tone_tags: tags.iter().map(|t| t.to_string()).collect(),
    }
}

/// Card manifest: three collections (one without cards), seven cards, one pending.
pub fn sample_manifest() -> String {
    r#"{
  "generated": "2026-09-30T12:00:00Z",
  "collections": [
    {"id": "sa", "name": "Suburban Apocalypse", "prefix": "SA", "count": 5},
    {"id": "punk", "name": "Punk Legends", "prefix": "PK", "count": 2},
    {"id": "comedy", "name": "Comedy Icons", "prefix": "CI"}
  ],
  "cards": [
    {"seriesId": "sa", "number": 1, "variant": "a", "name": "Leaky Lenny",
     "description": "Drips on everything.", "raw": "raw/sa-1a.png", "framed": "framed/sa-1a.webp"},
    {"seriesId": "sa", "number": 1, "variant": "b", "name": "Soggy Sam", "raw": "raw/sa-1b.png"},
    {"seriesId": "sa", "number": 2, "variant": "a", "name": "Crusty Carl",
     "other_name": "Carl the Crust", "framed": "framed/sa-2a.webp"},
    {"seriesId": "sa", "number": 2, "variant": "b", "name": "Moldy Mike", "raw": "", "framed": ""},
    {"seriesId": "punk", "number": 1, "name": "Safety Pin Sid", "framed": "framed/pk-1.webp"},
    {"seriesId": "punk", "number": 2, "name": "Mohawk Molly", "raw": "raw/pk-2.png"},
    {"seriesId": "sa", "number": 3, "variant": "a", "name": "Basement Bob", "raw": "raw/sa-3a.png"}
  ]
}"#
    .to_string()
}

/// Suggestion catalog: five suggestions across three series, ids mixing numbers and strings.
pub fn sample_suggestions() -> String {
    r#"{
  "suggestions": [
    {"id": 1, "series": "Suburban Apocalypse", "title": "HOA Enforcer",
     "pitch": "Fines you for existing.", "name_a": "Fining Fran", "name_b": "Citation Cindy",
     "distance": "safe", "tone_tags": ["satire"]},
    {"id": 2, "series": "Influencer Wasteland", "title": "Sponsored Spleen",
     "distance": "spicy", "tone_tags": ["gross", "body horror"]},
    {"id": "3", "series": "Suburban Apocalypse", "title": "Lawn Zombie",
     "distance": "spicy", "tone_tags": ["gross"]},
    {"id": 4, "series": "TikTok Terrors", "title": "Filter Face", "distance": "safe"},
    {"id": 5, "series": "Influencer Wasteland", "title": "Ring Light Ghoul", "distance": "safe"}
  ]
}"#
    .to_string()
}

/// Index over [`sample_manifest`] and [`sample_suggestions`]
pub fn sample_catalog() -> CatalogIndex {
    let manifest: CardManifest = match serde_json::from_str(&sample_manifest()) {
        Ok(manifest) => manifest,
        Err(e) => panic!("sample manifest: {e}"),
    };
    let suggestions: SuggestionManifest = match serde_json::from_str(&sample_suggestions()) {
        Ok(suggestions) => suggestions,
        Err(e) => panic!("sample suggestions: {e}"),
    };
    CatalogIndex::new(manifest, suggestions)
}
