//! Gallery facade and configuration
//!
//! # Opening a gallery
//!
//! - [open](Gallery::open) - load with configuration from the environment or builder
//! - [open_with_client](Gallery::open_with_client) - load with a custom reqwest client
//! - [with_service](Gallery::with_service) - load with any [`TallyService`] (e.g. the mock)
//!
//! # Configuration
//!
//! [`GalleryConfig::default()`] reads the `GALLERY_*` environment variables; the
//! consuming setters override individual fields.
//!
use std::{
    fmt,
    path::{Path, PathBuf},
    str::FromStr,
    sync::Arc,
};

use snafu::prelude::*;
use tracing::debug;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::{
    Result,
    catalog::{Card, CatalogIndex},
    config::{
        CATALOG_SOURCE_ENV, DEFAULT_CATALOG_SOURCE, DEFAULT_SUGGESTION_SOURCE,
        DEFAULT_TALLIES_TABLE, DEFAULT_VOTES_TABLE, FAVORITES_PATH_ENV, IDENTITY_ENV, MAX_RETRIES,
        MAX_RETRIES_ENV, SUGGESTION_SOURCE_ENV, TALLY_KEY_ENV, TALLY_URL_ENV,
    },
    error::{Diagnostics, HttpSnafu},
    favorites::{FavoriteStore, Favorites, FileFavoriteStore, MemoryFavoriteStore, default_favorites_path},
    http_client::{HttpClient, HttpMetricsSnapshot},
    identity::{Identity, IdentityAttributes},
    navigation::DeepLink,
    paged::PagedView,
    query::{CardContext, CardView, SuggestionContext, SuggestionView, query},
    suggestions::{Suggestion, SuggestionId},
    tally::{HttpTallyService, TallyService},
    votes::{Reconciler, Vote, VoteOutcome},
};

/// Where a catalog document comes from: a local file or an http(s) url
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    Path(PathBuf),
    Url(String),
}

impl Source {
    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Url(_))
    }
}

impl FromStr for Source {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim();
        Ok(if s.starts_with("http://") || s.starts_with("https://") {
            Self::Url(s.to_string())
        } else {
            Self::Path(PathBuf::from(s))
        })
    }
}

impl From<&str> for Source {
    fn from(s: &str) -> Self {
        match s.parse() {
            Ok(source) => source,
            Err(never) => match never {},
        }
    }
}

impl From<&Path> for Source {
    fn from(path: &Path) -> Self {
        Self::Path(path.to_path_buf())
    }
}

impl From<PathBuf> for Source {
    fn from(path: PathBuf) -> Self {
        Self::Path(path)
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Path(path) => write!(f, "{}", path.display()),
            Self::Url(url) => f.write_str(url),
        }
    }
}

/// Api key for the tally service. Masked in debug output, zeroed on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SecretKey(String);

impl SecretKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub(crate) fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretKey(MASKED)")
    }
}

/// Remote tally service settings
#[derive(Debug, Clone)]
pub struct TallyConfig {
    /// Service base url, e.g. `https://xyz.supabase.co`
    pub url: String,
    pub api_key: SecretKey,
    pub tallies_table: String,
    pub votes_table: String,
}

impl TallyConfig {
    /// Returns None if url or key is blank.
    pub fn new(url: impl Into<String>, api_key: impl Into<String>) -> Option<Self> {
        let url = url.into();
        let api_key = SecretKey::new(api_key);
        if url.trim().is_empty() || api_key.is_empty() {
            return None;
        }
        Some(Self {
            url: url.trim().to_string(),
            api_key,
            tallies_table: DEFAULT_TALLIES_TABLE.to_string(),
            votes_table: DEFAULT_VOTES_TABLE.to_string(),
        })
    }

    /// Reads `GALLERY_TALLY_URL` and `GALLERY_TALLY_KEY`
    pub fn from_env() -> Option<Self> {
        Self::new(
            std::env::var(TALLY_URL_ENV).ok()?,
            std::env::var(TALLY_KEY_ENV).ok()?,
        )
    }

    pub fn tables(self, tallies_table: &str, votes_table: &str) -> Self {
        TallyConfig {
            tallies_table: tallies_table.to_string(),
            votes_table: votes_table.to_string(),
            ..self
        }
    }
}

/// Configuration for a [`Gallery`].
///
/// ```rust,no_run
/// use gallery::prelude::*;
/// # async fn open() -> Result<Gallery, GalleryError> {
/// let config = GalleryConfig::default()
///     .catalog_source("https://example.com/manifest.json".into())
///     .favorites_path(None)
///     .max_retries(1);
/// let gallery = Gallery::open(config).await?;
/// # Ok(gallery)
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct GalleryConfig {
    /// Card manifest. Env `GALLERY_CATALOG`, default `manifest.json`
    pub catalog_source: Source,

    /// Suggestion catalog. Env `GALLERY_SUGGESTIONS`, default `suggestions.json`
    pub suggestion_source: Source,

    /// Tally service. None disables voting.
    pub tally: Option<TallyConfig>,

    /// Favorites file. Env `GALLERY_FAVORITES`, default `<config dir>/gallery/favorites.json`.
    /// None keeps favorites in memory only.
    pub favorites_path: Option<PathBuf>,

    /// Overrides the derived identity. Env `GALLERY_IDENTITY`
    pub identity: Option<String>,

    /// Retries for idempotent http requests. Env `GALLERY_MAX_RETRIES`, default 3
    pub max_retries: u32,

    /// User agent attribute used for the identity fingerprint
    pub user_agent: String,
}

fn env_source(name: &str, default: &str) -> Source {
    std::env::var(name)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .map_or_else(|| Source::from(default), |value| Source::from(value.as_str()))
}

impl Default for GalleryConfig {
    fn default() -> Self {
        GalleryConfig {
            catalog_source: env_source(CATALOG_SOURCE_ENV, DEFAULT_CATALOG_SOURCE),
            suggestion_source: env_source(SUGGESTION_SOURCE_ENV, DEFAULT_SUGGESTION_SOURCE),
            tally: TallyConfig::from_env(),
            favorites_path: std::env::var(FAVORITES_PATH_ENV)
                .ok()
                .filter(|value| !value.trim().is_empty())
                .map(PathBuf::from)
                .or_else(default_favorites_path),
            identity: std::env::var(IDENTITY_ENV)
                .ok()
                .filter(|value| !value.trim().is_empty()),
            max_retries: std::env::var(MAX_RETRIES_ENV)
                .ok()
                .and_then(|value| value.parse::<u32>().ok())
                .unwrap_or(MAX_RETRIES),
            user_agent: format!("gallery/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl GalleryConfig {
    pub fn catalog_source(self, catalog_source: Source) -> Self {
        GalleryConfig {
            catalog_source,
            ..self
        }
    }

    pub fn suggestion_source(self, suggestion_source: Source) -> Self {
        GalleryConfig {
            suggestion_source,
            ..self
        }
    }

    pub fn tally(self, tally: Option<TallyConfig>) -> Self {
        GalleryConfig { tally, ..self }
    }

    pub fn favorites_path(self, favorites_path: Option<PathBuf>) -> Self {
        GalleryConfig {
            favorites_path,
            ..self
        }
    }

    pub fn identity(self, identity: Option<String>) -> Self {
        GalleryConfig { identity, ..self }
    }

    pub fn max_retries(self, max_retries: u32) -> Self {
        GalleryConfig {
            max_retries,
            ..self
        }
    }

    pub fn user_agent(self, user_agent: &str) -> Self {
        GalleryConfig {
            user_agent: user_agent.to_string(),
            ..self
        }
    }

    /// Configured identity, or the fingerprint of this environment
    pub fn resolve_identity(&self) -> Identity {
        match self.identity.as_deref().map(str::trim) {
            Some(identity) if !identity.is_empty() => Identity::from(identity),
            _ => IdentityAttributes::from_env(&self.user_agent).fingerprint(),
        }
    }

    fn favorite_store(&self) -> Box<dyn FavoriteStore> {
        match &self.favorites_path {
            Some(path) => Box::new(FileFavoriteStore::new(path)),
            None => Box::new(MemoryFavoriteStore::new()),
        }
    }
}

/// A loaded gallery: catalog, votes, and favorites.
pub struct Gallery<S: TallyService = HttpTallyService> {
    config: GalleryConfig,
    http: Arc<HttpClient>,
    catalog: CatalogIndex,
    reconciler: Reconciler<S>,
    favorites: Favorites,
    diagnostics: Arc<Diagnostics>,
}

impl<S: TallyService> fmt::Debug for Gallery<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Gallery")
            .field("config", &self.config)
            .field("cards", &self.catalog.cards().len())
            .field("suggestions", &self.catalog.suggestions().len())
            .field("voting", &self.reconciler.is_enabled())
            .field("favorites", &self.favorites.len())
            .finish()
    }
}

impl Gallery<HttpTallyService> {
    /// Loads a gallery using the http tally service, if configured.
    pub async fn open(config: GalleryConfig) -> Result<Self> {
        Self::open_with_client(reqwest::Client::builder(), config).await
    }

    /// Loads a gallery with a custom `reqwest::ClientBuilder` (timeouts, proxies, ...).
    pub async fn open_with_client(
        builder: reqwest::ClientBuilder,
        config: GalleryConfig,
    ) -> Result<Self> {
        let client = builder.build().context(HttpSnafu {
            method: "client-init",
            url: "",
        })?;
        let service = config
            .tally
            .as_ref()
            .map(|tally| HttpTallyService::with_client(client.clone(), tally, config.max_retries));
        Ok(Self::assemble(config, client, service).await)
    }

    /// Cumulative http metrics for catalog fetches and the tally service
    pub fn http_metrics(&self) -> HttpMetricsSnapshot {
        let catalog = self.http.metrics_snapshot();
        match self.reconciler.service() {
            Some(service) => catalog.combine(service.metrics()),
            None => catalog,
        }
    }
}

impl<S: TallyService> Gallery<S> {
    /// Loads a gallery with the given tally service. None disables voting.
    pub async fn with_service(config: GalleryConfig, service: Option<S>) -> Result<Self> {
        let client = reqwest::Client::builder().build().context(HttpSnafu {
            method: "client-init",
            url: "",
        })?;
        Ok(Self::assemble(config, client, service).await)
    }

    async fn assemble(config: GalleryConfig, client: reqwest::Client, service: Option<S>) -> Self {
        debug!(catalog = %config.catalog_source, suggestions = %config.suggestion_source, "open gallery");
        let diagnostics = Arc::new(Diagnostics::new());
        let http = Arc::new(HttpClient::from_client(
            client,
            "",
            None,
            config.max_retries,
        ));
        let favorites = Favorites::open(config.favorite_store(), diagnostics.clone());
        let reconciler = Reconciler::new(service, config.resolve_identity(), diagnostics.clone());

        let (catalog, ()) = futures::join!(
            CatalogIndex::load(
                &http,
                &config.catalog_source,
                &config.suggestion_source,
                &diagnostics
            ),
            reconciler.startup(),
        );

        Self {
            config,
            http,
            catalog,
            reconciler,
            favorites,
            diagnostics,
        }
    }

    pub fn config(&self) -> &GalleryConfig {
        &self.config
    }

    pub fn catalog(&self) -> &CatalogIndex {
        &self.catalog
    }

    pub fn reconciler(&self) -> &Reconciler<S> {
        &self.reconciler
    }

    pub fn favorites(&self) -> &Favorites {
        &self.favorites
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn identity(&self) -> &Identity {
        self.reconciler.identity()
    }

    pub fn voting_enabled(&self) -> bool {
        self.reconciler.is_enabled()
    }

    /// Card gallery query
    pub fn cards(&self, view: &CardView) -> PagedView<'_, Card> {
        query(self.catalog.cards(), view, &CardContext::new(&self.catalog))
    }

    /// Suggestion gallery query, using current favorites and tallies
    pub fn suggestions(&self, view: &SuggestionView) -> PagedView<'_, Suggestion> {
        let favorites = self.favorites.snapshot();
        let tallies = self.reconciler.tallies();
        query(
            self.catalog.suggestions(),
            view,
            &SuggestionContext::new(&self.catalog, &favorites, &tallies),
        )
    }

    /// Casts a vote. Same vote twice removes it; the opposite vote flips it.
    pub async fn cast_vote(&self, id: &SuggestionId, vote: Vote) -> VoteOutcome {
        self.reconciler.cast_vote(id, vote).await
    }

    /// Re-reads tallies and this identity's votes
    pub async fn refresh_votes(&self) -> bool {
        let (tallies, mine) = futures::join!(
            self.reconciler.refresh_tallies(),
            self.reconciler.refresh_my_votes()
        );
        tallies && mine
    }

    /// Returns true if the suggestion is now a favorite
    pub fn toggle_favorite(&self, id: &SuggestionId) -> bool {
        self.favorites.toggle(id)
    }

    pub fn export_summary(&self) -> String {
        self.favorites.export_summary(self.catalog.suggestions())
    }

    pub fn export_list(&self) -> String {
        self.favorites.export_list(self.catalog.suggestions())
    }

    /// Card for a deep link, if it has an image
    pub fn open_link(&self, link: &DeepLink) -> Option<&Card> {
        self.catalog.open(link)
    }

    /// http metrics for catalog fetches
    pub fn catalog_http_metrics(&self) -> HttpMetricsSnapshot {
        self.http.metrics_snapshot()
    }
}
