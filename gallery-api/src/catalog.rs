//! Catalog index
//!
//! Holds the card manifest (cards and collections) and the suggestion catalog,
//! loaded once at startup and read-only afterwards. Derived lookups (series prefix,
//! series name, series display order, variant pairs) are built at load time.
//!
//! Loading never fails: an unreachable or malformed source yields an empty list,
//! a [`LoadState::Failed`] state, and a `LoadFailure` diagnostic.
//!
use std::{collections::HashMap, sync::Arc};

use rand::{Rng, seq::IndexedRandom};
use serde::{Deserialize, Deserializer, Serialize, de::DeserializeOwned};
use snafu::prelude::*;
use tracing::{info, warn};

use crate::{
    Result,
    client::Source,
    error::{DiagnosticKind, Diagnostics, IoSnafu},
    http_client::{HttpClient, deserialize_json},
    suggestions::{Suggestion, SuggestionManifest},
};

/// Series id assigned to cards without one
pub const DEFAULT_SERIES_ID: &str = "sa";

/// Number of featured cards
pub const FEATURED_COUNT: usize = 4;

/// Number of showcase cards
pub const SHOWCASE_COUNT: usize = 3;

fn default_series_id() -> String {
    DEFAULT_SERIES_ID.to_string()
}

/// Empty strings are treated as absent
fn non_empty<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<String> = Option::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.trim().is_empty()))
}

/// A named series of cards
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Collection {
    pub id: String,
    pub name: String,
    pub prefix: String,
    /// Card count recorded by the manifest builder. Informational only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
}

/// A collectible card
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Card {
    #[serde(rename = "seriesId", default = "default_series_id")]
    pub series_id: String,
    pub number: u32,
    #[serde(default, deserialize_with = "non_empty", skip_serializing_if = "Option::is_none")]
    pub variant: Option<String>,
    pub name: String,
    #[serde(default, deserialize_with = "non_empty", skip_serializing_if = "Option::is_none")]
    pub other_name: Option<String>,
    #[serde(default, deserialize_with = "non_empty", skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(
        rename = "raw",
        default,
        deserialize_with = "non_empty",
        skip_serializing_if = "Option::is_none"
    )]
    pub raw_image: Option<String>,
    #[serde(
        rename = "framed",
        default,
        deserialize_with = "non_empty",
        skip_serializing_if = "Option::is_none"
    )]
    pub framed_image: Option<String>,
}

/// Which image a card displays
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ImageState {
    Framed,
    Raw,
    Pending,
}

impl Card {
    /// Framed image if present, else raw image
    pub fn display_image(&self) -> Option<&str> {
        self.framed_image
            .as_deref()
            .or(self.raw_image.as_deref())
    }

    pub fn has_display_image(&self) -> bool {
        self.display_image().is_some()
    }

    pub fn image_state(&self) -> ImageState {
        if self.framed_image.is_some() {
            ImageState::Framed
        } else if self.raw_image.is_some() {
            ImageState::Raw
        } else {
            ImageState::Pending
        }
    }

    /// Variant tag, lowercased
    pub fn variant_tag(&self) -> Option<String> {
        self.variant.as_deref().map(str::to_lowercase)
    }

    /// The variant that would complete this card's pair
    fn complementary_variant(&self) -> Option<&'static str> {
        match self.variant_tag()?.as_str() {
            "a" => Some("b"),
            "b" => Some("a"),
            _ => None,
        }
    }

    /// True if both cards refer to the same catalog entry
    pub fn same_entry(&self, other: &Card) -> bool {
        self.series_id == other.series_id
            && self.number == other.number
            && self.variant_tag() == other.variant_tag()
    }
}

/// Card manifest document
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CardManifest {
    #[serde(default)]
    pub collections: Vec<Collection>,
    #[serde(default)]
    pub cards: Vec<Card>,
    /// Build timestamp written by the manifest builder
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated: Option<String>,
}

/// Outcome of loading one catalog source
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum LoadState {
    #[default]
    NotLoaded,
    Loaded,
    Failed { message: String },
}

impl LoadState {
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

/// Card counts by image state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CatalogStats {
    pub total: usize,
    /// cards with a raw image
    pub generated: usize,
    /// cards with a framed image
    pub framed: usize,
    /// cards with neither image
    pub pending: usize,
    /// number of collections in the manifest
    pub series: usize,
}

/// Read-only index over the loaded catalog.
#[derive(Debug, Clone, Default)]
pub struct CatalogIndex {
    cards: Vec<Card>,
    collections: Vec<Collection>,
    suggestions: Vec<Suggestion>,
    generated: Option<String>,

    prefixes: HashMap<String, String>,
    series_names: HashMap<String, String>,
    series_order: HashMap<String, usize>,
    // (series id, number, lowercase variant) -> index into cards
    variants: HashMap<(String, u32, String), usize>,
    pub(crate) suggestion_series: Vec<String>,
    pub(crate) suggestion_series_order: HashMap<String, usize>,

    card_state: LoadState,
    suggestion_state: LoadState,
}

impl CatalogIndex {
    /// Builds an index from loaded documents. Both sources are marked loaded.
    pub fn new(manifest: CardManifest, suggestions: SuggestionManifest) -> Self {
        Self::with_states(manifest, suggestions, LoadState::Loaded, LoadState::Loaded)
    }

    pub(crate) fn with_states(
        manifest: CardManifest,
        suggestions: SuggestionManifest,
        card_state: LoadState,
        suggestion_state: LoadState,
    ) -> Self {
        let CardManifest {
            collections,
            cards,
            generated,
        } = manifest;

        let mut prefixes = HashMap::new();
        let mut series_names = HashMap::new();
        let mut series_order = HashMap::new();
        for (position, collection) in collections.iter().enumerate() {
            prefixes.insert(collection.id.clone(), collection.prefix.clone());
            series_names.insert(collection.id.clone(), collection.name.clone());
            series_order.entry(collection.id.clone()).or_insert(position);
        }

        let mut variants = HashMap::new();
        for (position, card) in cards.iter().enumerate() {
            if let Some(tag) = card.variant_tag() {
                variants
                    .entry((card.series_id.clone(), card.number, tag))
                    .or_insert(position);
            }
        }

        let suggestions = suggestions.suggestions;
        let mut suggestion_series = Vec::new();
        let mut suggestion_series_order = HashMap::new();
        for suggestion in &suggestions {
            if !suggestion_series_order.contains_key(&suggestion.series) {
                suggestion_series_order.insert(suggestion.series.clone(), suggestion_series.len());
                suggestion_series.push(suggestion.series.clone());
            }
        }

        Self {
            cards,
            collections,
            suggestions,
            generated,
            prefixes,
            series_names,
            series_order,
            variants,
            suggestion_series,
            suggestion_series_order,
            card_state,
            suggestion_state,
        }
    }

    /// Loads card manifest and suggestion catalog concurrently.
    /// A source that fails to load contributes an empty list.
    pub(crate) async fn load(
        http: &HttpClient,
        card_source: &Source,
        suggestion_source: &Source,
        diagnostics: &Arc<Diagnostics>,
    ) -> Self {
        let (manifest, suggestions) = futures::join!(
            load_source::<CardManifest>(http, card_source),
            load_source::<SuggestionManifest>(http, suggestion_source),
        );
        let (manifest, card_state) = settle(manifest, "card manifest", card_source, diagnostics);
        let (suggestions, suggestion_state) =
            settle(suggestions, "suggestions", suggestion_source, diagnostics);
        let index = Self::with_states(manifest, suggestions, card_state, suggestion_state);
        info!(
            cards = index.cards.len(),
            collections = index.collections.len(),
            suggestions = index.suggestions.len(),
            "catalog loaded"
        );
        index
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    pub fn collections(&self) -> &[Collection] {
        &self.collections
    }

    pub fn suggestions(&self) -> &[Suggestion] {
        &self.suggestions
    }

    /// Manifest build timestamp, if recorded
    pub fn generated(&self) -> Option<&str> {
        self.generated.as_deref()
    }

    pub fn card_state(&self) -> &LoadState {
        &self.card_state
    }

    pub fn suggestion_state(&self) -> &LoadState {
        &self.suggestion_state
    }

    /// Label prefix for a series; falls back to the uppercased series id.
    pub fn prefix_of(&self, series_id: &str) -> String {
        self.prefixes
            .get(series_id)
            .cloned()
            .unwrap_or_else(|| series_id.to_uppercase())
    }

    /// Collection name for a series; falls back to the series id.
    pub fn series_name<'a>(&'a self, series_id: &'a str) -> &'a str {
        self.series_names
            .get(series_id)
            .map_or(series_id, String::as_str)
    }

    /// Position of the series in the manifest's collection list
    pub fn series_position(&self, series_id: &str) -> Option<usize> {
        self.series_order.get(series_id).copied()
    }

    /// Display label, e.g. `SA-01A`
    pub fn label_of(&self, card: &Card) -> String {
        format!(
            "{}-{:02}{}",
            self.prefix_of(&card.series_id),
            card.number,
            card.variant
                .as_deref()
                .map(str::to_uppercase)
                .unwrap_or_default()
        )
    }

    /// Download file name: `{label}_{name}`, with the name's non-alphanumerics
    /// replaced by '-' and lowercased.
    pub fn download_name(&self, card: &Card) -> String {
        let name: String = card
            .name
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '-' })
            .collect();
        format!("{}_{name}", self.label_of(card))
    }

    /// The other half of an a/b variant pair, if present.
    pub fn pair_of(&self, card: &Card) -> Option<&Card> {
        let other = card.complementary_variant()?;
        self.variants
            .get(&(card.series_id.clone(), card.number, other.to_string()))
            .and_then(|position| self.cards.get(*position))
    }

    /// The pair counterpart, only if it has a display image
    pub fn pair_displayable(&self, card: &Card) -> Option<&Card> {
        self.pair_of(card).filter(|pair| pair.has_display_image())
    }

    /// Image-state counts across all cards
    pub fn stats(&self) -> CatalogStats {
        CatalogStats {
            total: self.cards.len(),
            generated: self.cards.iter().filter(|c| c.raw_image.is_some()).count(),
            framed: self.cards.iter().filter(|c| c.framed_image.is_some()).count(),
            pending: self
                .cards
                .iter()
                .filter(|c| c.image_state() == ImageState::Pending)
                .count(),
            series: self.collections.len(),
        }
    }

    /// Collections that contain at least one card, with their card counts,
    /// in manifest order.
    pub fn series_counts(&self) -> Vec<(&Collection, usize)> {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for card in &self.cards {
            *counts.entry(card.series_id.as_str()).or_default() += 1;
        }
        self.collections
            .iter()
            .filter_map(|collection| {
                counts
                    .get(collection.id.as_str())
                    .map(|count| (collection, *count))
            })
            .collect()
    }

    /// Up to four cards with images, one per series first, then filled in source order.
    pub fn featured(&self) -> Vec<&Card> {
        let mut seen = Vec::new();
        let mut featured: Vec<&Card> = Vec::new();
        for card in self.cards.iter().filter(|c| c.has_display_image()) {
            if featured.len() >= FEATURED_COUNT {
                break;
            }
            if !seen.contains(&card.series_id.as_str()) {
                seen.push(card.series_id.as_str());
                featured.push(card);
            }
        }
        for card in self.cards.iter().filter(|c| c.has_display_image()) {
            if featured.len() >= FEATURED_COUNT {
                break;
            }
            if !featured.iter().any(|f| std::ptr::eq(*f, card)) {
                featured.push(card);
            }
        }
        featured
    }

    /// First three cards with images
    pub fn showcase(&self) -> Vec<&Card> {
        self.cards
            .iter()
            .filter(|c| c.has_display_image())
            .take(SHOWCASE_COUNT)
            .collect()
    }

    /// Uniformly random card among those with images
    pub fn random_displayable<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<&Card> {
        let displayable: Vec<&Card> = self.cards.iter().filter(|c| c.has_display_image()).collect();
        displayable.choose(rng).copied()
    }

    /// Position of a card in the source list
    pub fn position_of(&self, card: &Card) -> Option<usize> {
        self.cards.iter().position(|c| c.same_entry(card))
    }
}

async fn load_source<T: DeserializeOwned>(http: &HttpClient, source: &Source) -> Result<T> {
    match source {
        Source::Url(url) => http.fetch_json(url).await,
        Source::Path(path) => {
            let data = tokio::fs::read(path).await.context(IoSnafu { path })?;
            deserialize_json(&data)
        }
    }
}

fn settle<T: Default>(
    loaded: Result<T>,
    name: &str,
    source: &Source,
    diagnostics: &Diagnostics,
) -> (T, LoadState) {
    match loaded {
        Ok(value) => (value, LoadState::Loaded),
        Err(e) => {
            warn!(%source, error = %e, "failed to load {name}");
            let message = format!("{name} from {source}: {e}");
            diagnostics.record(DiagnosticKind::LoadFailure, message.clone());
            (T::default(), LoadState::Failed { message })
        }
    }
}
