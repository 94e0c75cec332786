//! Query engine
//!
//! One pipeline serves both galleries:
//!
//! 1. series filter (exact series key, or all)
//! 2. text search (trimmed, case-insensitive substring over record fields)
//! 3. category filter
//! 4. stable sort
//! 5. pagination with page clamping
//!
//! Each record type implements [`Record`] to supply its fields, filters, and
//! orderings. Queries borrow the catalog and never reorder it.
//!
//! ```rust
//! use gallery::{prelude::*, query::query, test_util::sample_catalog};
//!
//! let catalog = sample_catalog();
//! let view = CardView::default().with_search("  LENNY ");
//! let page = query(catalog.cards(), &view, &CardContext::new(&catalog));
//! assert_eq!(page.total, 1);
//! ```
//!
use std::{cmp::Ordering, fmt, str::FromStr};

use serde::Serialize;

use crate::{
    CARDS_PER_PAGE, SUGGESTIONS_PER_PAGE,
    catalog::{Card, CatalogIndex, LoadState},
    favorites::FavoriteSet,
    paged::PagedView,
    suggestions::{Distance, Suggestion},
    votes::Tallies,
};

/// A record type the query pipeline can filter, search and sort.
pub trait Record {
    /// Category filter
    type Filter: Copy + Default + fmt::Debug + PartialEq;
    /// Sort mode
    type Sort: Copy + Default + fmt::Debug + PartialEq;
    /// Lookups needed by filters and orderings
    type Context<'a>;

    const PAGE_SIZE: usize;

    /// Key compared by the series filter
    fn series_key(&self) -> &str;

    /// True if any searchable field contains `needle`. `needle` is lowercase.
    fn matches_text(&self, needle: &str) -> bool;

    fn keep(&self, filter: Self::Filter, ctx: &Self::Context<'_>) -> bool;

    fn compare(&self, other: &Self, sort: Self::Sort, ctx: &Self::Context<'_>) -> Ordering;
}

/// Case-insensitive comparison, with the exact text breaking ties.
pub fn locale_cmp(a: &str, b: &str) -> Ordering {
    a.chars()
        .flat_map(char::to_lowercase)
        .cmp(b.chars().flat_map(char::to_lowercase))
        .then_with(|| a.cmp(b))
}

fn contains_folded(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(needle)
}

// ============================================================================
// VIEW STATE
// ============================================================================

/// Series filter: everything, or one series key
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SeriesFilter {
    #[default]
    All,
    Only(String),
}

impl SeriesFilter {
    pub fn admits(&self, key: &str) -> bool {
        match self {
            Self::All => true,
            Self::Only(series) => series == key,
        }
    }
}

impl FromStr for SeriesFilter {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(if s.is_empty() || s.eq_ignore_ascii_case("all") {
            Self::All
        } else {
            Self::Only(s.to_string())
        })
    }
}

impl fmt::Display for SeriesFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str("all"),
            Self::Only(series) => f.write_str(series),
        }
    }
}

/// Immutable query inputs. Setters return a new state; changing anything
/// but the page resets the page to 1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ViewState<F, S> {
    series: SeriesFilter,
    filter: F,
    search: String,
    sort: S,
    page: usize,
}

pub type CardView = ViewState<CardFilter, CardSort>;
pub type SuggestionView = ViewState<SuggestionFilter, SuggestionSort>;

impl<F: Default, S: Default> Default for ViewState<F, S> {
    fn default() -> Self {
        Self {
            series: SeriesFilter::All,
            filter: F::default(),
            search: String::new(),
            sort: S::default(),
            page: 1,
        }
    }
}

impl<F: Copy, S: Copy> ViewState<F, S> {
    pub fn series(&self) -> &SeriesFilter {
        &self.series
    }

    pub fn filter(&self) -> F {
        self.filter
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    pub fn sort(&self) -> S {
        self.sort
    }

    pub fn page(&self) -> usize {
        self.page
    }

    #[must_use]
    pub fn with_series(self, series: SeriesFilter) -> Self {
        Self {
            series,
            page: 1,
            ..self
        }
    }

    #[must_use]
    pub fn with_filter(self, filter: F) -> Self {
        Self {
            filter,
            page: 1,
            ..self
        }
    }

    #[must_use]
    pub fn with_search(self, search: impl Into<String>) -> Self {
        Self {
            search: search.into(),
            page: 1,
            ..self
        }
    }

    #[must_use]
    pub fn with_sort(self, sort: S) -> Self {
        Self {
            sort,
            page: 1,
            ..self
        }
    }

    /// Sets the page; pages below 1 become 1. Upper clamping happens at query time.
    #[must_use]
    pub fn with_page(self, page: usize) -> Self {
        Self {
            page: page.max(1),
            ..self
        }
    }

    /// Adopts the page a query clamped to.
    #[must_use]
    pub fn settle<R>(self, result: &PagedView<'_, R>) -> Self {
        self.with_page(result.page)
    }
}

/// Runs the query pipeline over `records`.
pub fn query<'a, R: Record>(
    records: &'a [R],
    view: &ViewState<R::Filter, R::Sort>,
    ctx: &R::Context<'_>,
) -> PagedView<'a, R> {
    let needle = view.search.trim().to_lowercase();
    let mut matches: Vec<&'a R> = records
        .iter()
        .filter(|r| view.series.admits(r.series_key()))
        .filter(|r| needle.is_empty() || r.matches_text(&needle))
        .filter(|r| r.keep(view.filter, ctx))
        .collect();
    // stable: ties keep source order
    matches.sort_by(|a, b| a.compare(b, view.sort, ctx));
    PagedView::new(matches, view.page, R::PAGE_SIZE)
}

/// What a gallery should show for a query result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ResultState {
    NotLoaded,
    LoadFailed,
    NoMatches,
    Matches,
}

impl ResultState {
    pub fn of<R>(load: &LoadState, result: &PagedView<'_, R>) -> Self {
        match load {
            LoadState::NotLoaded => Self::NotLoaded,
            LoadState::Failed { .. } => Self::LoadFailed,
            LoadState::Loaded if result.is_empty() => Self::NoMatches,
            LoadState::Loaded => Self::Matches,
        }
    }
}

// ============================================================================
// CARDS
// ============================================================================

/// Card category filter
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, strum::Display, strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum CardFilter {
    #[default]
    All,
    /// has a framed image
    Framed,
    /// has a raw image but no framed image
    Raw,
}

/// Card ordering
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, strum::Display, strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum CardSort {
    /// series display order, then number, then variant
    #[default]
    Number,
    /// case-insensitive name
    Name,
}

/// Lookups for card queries
#[derive(Debug, Clone, Copy)]
pub struct CardContext<'a> {
    pub catalog: &'a CatalogIndex,
}

impl<'a> CardContext<'a> {
    pub fn new(catalog: &'a CatalogIndex) -> Self {
        Self { catalog }
    }

    // unknown series sort after every known one
    fn series_rank(&self, series_id: &str) -> usize {
        self.catalog.series_position(series_id).unwrap_or(usize::MAX)
    }
}

impl Record for Card {
    type Filter = CardFilter;
    type Sort = CardSort;
    type Context<'a> = CardContext<'a>;

    const PAGE_SIZE: usize = CARDS_PER_PAGE;

    fn series_key(&self) -> &str {
        &self.series_id
    }

    fn matches_text(&self, needle: &str) -> bool {
        contains_folded(&self.name, needle)
            || self
                .other_name
                .as_deref()
                .is_some_and(|s| contains_folded(s, needle))
            || self
                .description
                .as_deref()
                .is_some_and(|s| contains_folded(s, needle))
    }

    fn keep(&self, filter: CardFilter, _ctx: &CardContext<'_>) -> bool {
        match filter {
            CardFilter::All => true,
            CardFilter::Framed => self.framed_image.is_some(),
            CardFilter::Raw => self.raw_image.is_some() && self.framed_image.is_none(),
        }
    }

    fn compare(&self, other: &Self, sort: CardSort, ctx: &CardContext<'_>) -> Ordering {
        match sort {
            CardSort::Name => locale_cmp(&self.name, &other.name),
            CardSort::Number => ctx
                .series_rank(&self.series_id)
                .cmp(&ctx.series_rank(&other.series_id))
                .then(self.number.cmp(&other.number))
                // absent variant sorts first
                .then_with(|| {
                    locale_cmp(
                        self.variant.as_deref().unwrap_or_default(),
                        other.variant.as_deref().unwrap_or_default(),
                    )
                }),
        }
    }
}

// ============================================================================
// SUGGESTIONS
// ============================================================================

/// Suggestion category filter
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, strum::Display, strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum SuggestionFilter {
    #[default]
    All,
    Favorites,
    Safe,
    Spicy,
}

/// Suggestion ordering
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, strum::Display, strum::EnumString,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
pub enum SuggestionSort {
    /// series first-appearance order, then title
    #[default]
    Series,
    /// case-insensitive title
    Title,
    /// favorites, then series name, then title
    FavoritesFirst,
    /// score descending, then title
    Votes,
}

/// Lookups for suggestion queries
#[derive(Debug, Clone, Copy)]
pub struct SuggestionContext<'a> {
    pub catalog: &'a CatalogIndex,
    pub favorites: &'a FavoriteSet,
    pub tallies: &'a Tallies,
}

impl<'a> SuggestionContext<'a> {
    pub fn new(catalog: &'a CatalogIndex, favorites: &'a FavoriteSet, tallies: &'a Tallies) -> Self {
        Self {
            catalog,
            favorites,
            tallies,
        }
    }

    fn score(&self, suggestion: &Suggestion) -> i64 {
        self.tallies.get(&suggestion.id).map_or(0, |t| t.score)
    }

    fn series_rank(&self, series: &str) -> usize {
        self.catalog
            .suggestion_series_position(series)
            .unwrap_or(usize::MAX)
    }
}

impl Record for Suggestion {
    type Filter = SuggestionFilter;
    type Sort = SuggestionSort;
    type Context<'a> = SuggestionContext<'a>;

    const PAGE_SIZE: usize = SUGGESTIONS_PER_PAGE;

    fn series_key(&self) -> &str {
        &self.series
    }

    fn matches_text(&self, needle: &str) -> bool {
        contains_folded(&self.title, needle)
            || contains_folded(&self.pitch, needle)
            || contains_folded(&self.series, needle)
            || self
                .name_a
                .as_deref()
                .is_some_and(|s| contains_folded(s, needle))
            || self
                .name_b
                .as_deref()
                .is_some_and(|s| contains_folded(s, needle))
            || self.tone_tags.iter().any(|tag| contains_folded(tag, needle))
    }

    fn keep(&self, filter: SuggestionFilter, ctx: &SuggestionContext<'_>) -> bool {
        match filter {
            SuggestionFilter::All => true,
            SuggestionFilter::Favorites => ctx.favorites.contains(&self.id),
            SuggestionFilter::Safe => self.distance == Distance::Safe,
            SuggestionFilter::Spicy => self.distance == Distance::Spicy,
        }
    }

    fn compare(&self, other: &Self, sort: SuggestionSort, ctx: &SuggestionContext<'_>) -> Ordering {
        let by_title = || locale_cmp(&self.title, &other.title);
        match sort {
            SuggestionSort::Title => by_title(),
            SuggestionSort::FavoritesFirst => {
                let favored = |s: &Suggestion| !ctx.favorites.contains(&s.id);
                favored(self)
                    .cmp(&favored(other))
                    .then_with(|| locale_cmp(&self.series, &other.series))
                    .then_with(by_title)
            }
            SuggestionSort::Votes => ctx
                .score(other)
                .cmp(&ctx.score(self))
                .then_with(by_title),
            SuggestionSort::Series => ctx
                .series_rank(&self.series)
                .cmp(&ctx.series_rank(&other.series))
                .then_with(by_title),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        test_util::{sample_catalog, suggestion},
        votes::VoteTally,
    };

    #[test]
    fn test_locale_cmp() {
        assert_eq!(locale_cmp("apple", "Banana"), Ordering::Less);
        assert_eq!(locale_cmp("Zed", "alpha"), Ordering::Greater);
        assert_eq!(locale_cmp("same", "same"), Ordering::Equal);
        assert_ne!(locale_cmp("Same", "same"), Ordering::Equal);
    }

    #[test]
    fn test_view_state_resets_page() {
        let view = CardView::default().with_page(4);
        assert_eq!(view.page(), 4);
        assert_eq!(view.clone().with_search("x").page(), 1);
        assert_eq!(view.clone().with_filter(CardFilter::Raw).page(), 1);
        assert_eq!(view.clone().with_sort(CardSort::Name).page(), 1);
        assert_eq!(
            view.clone()
                .with_series(SeriesFilter::Only("sa".into()))
                .page(),
            1
        );
        assert_eq!(view.with_page(0).page(), 1);
    }

    #[test]
    fn test_series_filter_parse() {
        assert_eq!("all".parse::<SeriesFilter>().unwrap(), SeriesFilter::All);
        assert_eq!(
            "punk".parse::<SeriesFilter>().unwrap(),
            SeriesFilter::Only("punk".into())
        );
        assert_eq!(
            "favorites-first".parse::<SuggestionSort>().unwrap(),
            SuggestionSort::FavoritesFirst
        );
        assert_eq!("FRAMED".parse::<CardFilter>().unwrap(), CardFilter::Framed);
    }

    #[test]
    fn test_card_filters_partition() {
        let catalog = sample_catalog();
        let ctx = CardContext::new(&catalog);
        let framed = query(
            catalog.cards(),
            &CardView::default().with_filter(CardFilter::Framed),
            &ctx,
        );
        let raw = query(
            catalog.cards(),
            &CardView::default().with_filter(CardFilter::Raw),
            &ctx,
        );
        assert!(framed.visible().iter().all(|c| c.framed_image.is_some()));
        assert!(
            raw.visible()
                .iter()
                .all(|c| c.raw_image.is_some() && c.framed_image.is_none())
        );
        let stats = catalog.stats();
        assert_eq!(framed.total + raw.total + stats.pending, stats.total);
    }

    #[test]
    fn test_card_number_sort() {
        let catalog = sample_catalog();
        let ctx = CardContext::new(&catalog);
        let result = query(catalog.cards(), &CardView::default(), &ctx);
        let labels: Vec<String> = result
            .visible()
            .iter()
            .map(|c| catalog.label_of(c))
            .collect();
        assert_eq!(
            labels,
            vec!["SA-01A", "SA-01B", "SA-02A", "SA-02B", "SA-03A", "PK-01", "PK-02"]
        );
    }

    #[test]
    fn test_card_search_and_series() {
        let catalog = sample_catalog();
        let ctx = CardContext::new(&catalog);
        // matches other_name
        let result = query(
            catalog.cards(),
            &CardView::default().with_search("crust"),
            &ctx,
        );
        assert_eq!(result.total, 1);
        let result = query(
            catalog.cards(),
            &CardView::default().with_series(SeriesFilter::Only("punk".into())),
            &ctx,
        );
        assert!(result.visible().iter().all(|c| c.series_id == "punk"));
        // whitespace-only search is a no-op
        let all = query(catalog.cards(), &CardView::default().with_search("   "), &ctx);
        assert_eq!(all.total, catalog.cards().len());
    }

    #[test]
    fn test_suggestion_votes_sort() {
        let catalog = sample_catalog();
        let favorites = FavoriteSet::new();
        let mut tallies = Tallies::new();
        let ids: Vec<_> = catalog.suggestions().iter().map(|s| s.id.clone()).collect();
        tallies.insert(ids[2].clone(), VoteTally::new(5, 1));
        tallies.insert(ids[1].clone(), VoteTally::new(0, 3));
        let ctx = SuggestionContext::new(&catalog, &favorites, &tallies);
        let result = query(
            catalog.suggestions(),
            &SuggestionView::default().with_sort(SuggestionSort::Votes),
            &ctx,
        );
        assert_eq!(result.visible()[0].id, ids[2]);
        assert_eq!(result.visible().last().map(|s| &s.id), Some(&ids[1]));
    }

    #[test]
    fn test_suggestion_favorites_filter_and_sort() {
        let catalog = sample_catalog();
        let last = catalog.suggestions().last().unwrap().id.clone();
        let favorites: FavoriteSet = [last.clone()].into_iter().collect();
        let tallies = Tallies::new();
        let ctx = SuggestionContext::new(&catalog, &favorites, &tallies);

        let only = query(
            catalog.suggestions(),
            &SuggestionView::default().with_filter(SuggestionFilter::Favorites),
            &ctx,
        );
        assert_eq!(only.total, 1);

        let first = query(
            catalog.suggestions(),
            &SuggestionView::default().with_sort(SuggestionSort::FavoritesFirst),
            &ctx,
        );
        assert_eq!(first.visible()[0].id, last);
    }

    #[test]
    fn test_suggestion_tag_search() {
        let records = vec![
            suggestion("1", "Mythical Mayhem", "Oracle App", &["Satire"]),
            suggestion("2", "Mythical Mayhem", "Hydra Loan", &["gross"]),
        ];
        let catalog = sample_catalog();
        let favorites = FavoriteSet::new();
        let tallies = Tallies::new();
        let ctx = SuggestionContext::new(&catalog, &favorites, &tallies);
        let result = query(&records, &SuggestionView::default().with_search("SATIR"), &ctx);
        assert_eq!(result.total, 1);
        assert_eq!(result.visible()[0].title, "Oracle App");
    }

    #[test]
    fn test_result_state() {
        let catalog = sample_catalog();
        let ctx = CardContext::new(&catalog);
        let none = query(
            catalog.cards(),
            &CardView::default().with_search("no such card"),
            &ctx,
        );
        assert_eq!(ResultState::of(&LoadState::Loaded, &none), ResultState::NoMatches);
        assert_eq!(
            ResultState::of(
                &LoadState::Failed {
                    message: "x".into()
                },
                &none
            ),
            ResultState::LoadFailed
        );
        assert_eq!(ResultState::of(&LoadState::NotLoaded, &none), ResultState::NotLoaded);
        let some = query(catalog.cards(), &CardView::default(), &ctx);
        assert_eq!(ResultState::of(&LoadState::Loaded, &some), ResultState::Matches);
    }
}
