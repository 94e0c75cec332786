/*
 * Card gallery catalog engine
 *
 * SPDX-FileCopyrightText: 2025-2026 Steve Schoettler
 * SPDX-License-Identifier: Apache-2.0
 */
//! # Gallery
//!
//! Catalog query engine and vote/favorite reconciliation for a collectible-card gallery
//! and its companion catalog of card suggestions.
//!
//! ## Features
//!
//! - catalog index over cards, collections (series), and suggestions
//! - one generic query pipeline: series filter, text search, category filter, sort, paginate
//! - optimistic vote casting with a remote tally service (insert / update / delete)
//! - persisted personal favorites
//! - deep-link resolution and "next displayable card" navigation
//! - anonymous identity fingerprint
//! - http pipeline with retries, backoff, and metrics
//! - companion cli tool (`galr`)
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use gallery::prelude::*;
//! # async fn example() -> Result<(), GalleryError> {
//!
//! let gallery = Gallery::open(GalleryConfig::default()).await?;
//!
//! // Second page of framed cards, default number ordering
//! let view = CardView::default()
//!     .with_filter(CardFilter::Framed)
//!     .with_page(2);
//! let page = gallery.cards(&view);
//! for card in page.page_items() {
//!     println!("{} {}", gallery.catalog().label_of(card), card.name);
//! }
//!
//! // Top voted suggestions
//! let view = SuggestionView::default().with_sort(SuggestionSort::Votes);
//! let page = gallery.suggestions(&view);
//! if let Some(top) = page.page_items().first() {
//!     gallery.cast_vote(&top.id, Vote::Up).await;
//!     gallery.toggle_favorite(&top.id);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Notes on Design
//!
//! - The catalog is read-only after load. Queries never reorder the source lists;
//!   they return new ordered views of borrowed records.
//! - View state is an immutable value. Every `with_*` setter returns a new state,
//!   and changing anything except the page resets the page to 1.
//! - Votes are applied to the local cache before the remote write resolves and are
//!   not rolled back when the write fails. Failures are recorded as diagnostics.
//! - Load failures degrade to an empty catalog instead of failing the whole gallery.
//!
//#![warn(clippy::pedantic)] // experimental
//#![warn(clippy::nursery)] // experimental
#![allow(clippy::missing_errors_doc)] // pedantic
#![allow(clippy::missing_const_for_fn)] //  nursery function
#![allow(clippy::must_use_candidate)] // pedantic
#![warn(clippy::default_trait_access)]
#![warn(clippy::doc_markdown)]
#![warn(clippy::explicit_iter_loop)]
#![warn(clippy::future_not_send)]
#![warn(clippy::implicit_clone)]
#![warn(clippy::match_same_arms)]
#![warn(clippy::needless_raw_strings)]
#![warn(clippy::option_if_let_else)]
#![warn(clippy::redundant_clone)]
#![warn(clippy::ref_option)]
#![warn(clippy::redundant_closure)]
#![warn(clippy::uninlined_format_args)]
#![warn(clippy::unused_async)]

pub mod catalog;
pub mod client;
pub mod error;
pub mod favorites;
mod http_client;
pub mod identity;
#[doc(hidden)]
pub mod mock;
pub mod navigation;
pub mod paged;
pub mod query;
pub mod suggestions;
pub mod tally;
pub mod votes;

pub mod test_util;

/// Result type alias using `GalleryError` as the default error.
pub type Result<T, E = crate::error::GalleryError> = std::result::Result<T, E>;

/// Prelude module - import the common types with `use gallery::prelude::*;`
pub mod prelude {
    pub use crate::error::*;
    pub use crate::{
        // Catalog index
        catalog::{Card, CardManifest, CatalogIndex, CatalogStats, Collection, ImageState, LoadState},
        // Gallery facade and configuration
        client::{Gallery, GalleryConfig, SecretKey, Source, TallyConfig},
        // Favorites
        favorites::{FavoriteSet, FavoriteStore, Favorites, FileFavoriteStore, MemoryFavoriteStore},
        // HTTP metrics
        http_client::HttpMetricsSnapshot,
        // Identity
        identity::{Identity, IdentityAttributes},
        // Navigation
        navigation::{DeepLink, Direction},
        // Pagination
        paged::{PageMarker, PagedView, PaginationMeta},
        // Query engine
        query::{
            CardContext, CardFilter, CardSort, CardView, Record, ResultState, SeriesFilter,
            SuggestionContext, SuggestionFilter, SuggestionSort, SuggestionView, ViewState,
        },
        // Suggestions
        suggestions::{Distance, SeriesMeta, Suggestion, SuggestionId, SuggestionManifest},
        // Remote tally service
        tally::{HttpTallyService, TallyRow, TallyService, VoteRow},
        // Votes
        votes::{
            RemoteOp, Reconciler, SyncStatus, Tallies, Vote, VoteOutcome, VoteTally,
            VoteTransition,
        },
    };
}

// ============================================================================
// CONSTANTS
// ============================================================================

/// Cards shown per page in the card gallery.
pub const CARDS_PER_PAGE: usize = 12;

/// Suggestions shown per page in the suggestion gallery.
pub const SUGGESTIONS_PER_PAGE: usize = 24;

pub(crate) mod config {
    /// Environment variable for the card catalog source (path or url)
    pub const CATALOG_SOURCE_ENV: &str = "GALLERY_CATALOG";

    /// Environment variable for the suggestion catalog source (path or url)
    pub const SUGGESTION_SOURCE_ENV: &str = "GALLERY_SUGGESTIONS";

    /// Environment variable for the tally service base url
    pub const TALLY_URL_ENV: &str = "GALLERY_TALLY_URL";

    /// Environment variable for the tally service api key
    pub const TALLY_KEY_ENV: &str = "GALLERY_TALLY_KEY";

    /// Environment variable for the favorites file
    pub const FAVORITES_PATH_ENV: &str = "GALLERY_FAVORITES";

    /// Environment variable overriding the derived identity
    pub const IDENTITY_ENV: &str = "GALLERY_IDENTITY";

    /// Environment variable overriding the retry count for idempotent requests
    pub const MAX_RETRIES_ENV: &str = "GALLERY_MAX_RETRIES";

    pub const DEFAULT_CATALOG_SOURCE: &str = "manifest.json";
    pub const DEFAULT_SUGGESTION_SOURCE: &str = "suggestions.json";
    pub const DEFAULT_TALLIES_TABLE: &str = "vote_tallies";
    pub const DEFAULT_VOTES_TABLE: &str = "votes";

    /// Subdirectory of the user config dir holding the favorites file
    pub const APP_DIR: &str = "gallery";
    pub const FAVORITES_FILE: &str = "favorites.json";

    /// Max retries for idempotent http requests
    pub const MAX_RETRIES: u32 = 3;

    /// Longest server-requested 429 wait we are willing to honour (seconds).
    pub const RETRY_AFTER_MAX_SECS: u64 = 30;

    /// Number of diagnostics kept in memory
    pub const DIAGNOSTICS_CAPACITY: usize = 64;

    /// PostgREST path prefix
    pub const REST_PREFIX: &str = "/rest/v1";
}
