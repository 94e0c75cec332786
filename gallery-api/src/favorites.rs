//! Personal favorites ("picks")
//!
//! The favorite set is kept in memory and written through to a [`FavoriteStore`]
//! after every change, as a JSON array of ids in sorted order. Storage backends:
//!
//! - **File**: json file, by default `<config dir>/gallery/favorites.json`
//! - **Memory**: nothing persisted; used when no file location is available, and in tests
//!
//! A store that cannot be read starts the session with an empty set. A failed
//! write keeps the in-memory change and records a `FavoritesPersistFailure`
//! diagnostic.
//!
use std::{
    collections::BTreeSet,
    fmt,
    path::{Path, PathBuf},
    sync::Arc,
};

use parking_lot::Mutex;
use snafu::prelude::*;
use tracing::{debug, warn};

use crate::{
    config::{APP_DIR, FAVORITES_FILE},
    error::{DiagnosticKind, Diagnostics, EncodingSnafu, FavoritesError, FileSnafu},
    suggestions::{Suggestion, SuggestionId},
};

/// Favorite suggestion ids
pub type FavoriteSet = BTreeSet<SuggestionId>;

/// Durable storage for the serialized favorite set.
pub trait FavoriteStore: Send + Sync + fmt::Debug {
    /// Returns the stored value, or None if nothing has been saved.
    fn load(&self) -> Result<Option<String>, FavoritesError>;

    /// Replaces the stored value.
    fn save(&self, serialized: &str) -> Result<(), FavoritesError>;
}

/// Default favorites file location, if the platform has a config dir
pub fn default_favorites_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR).join(FAVORITES_FILE))
}

/// Favorites stored in a json file
#[derive(Debug, Clone)]
pub struct FileFavoriteStore {
    path: PathBuf,
}

impl FileFavoriteStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl FavoriteStore for FileFavoriteStore {
    fn load(&self) -> Result<Option<String>, FavoritesError> {
        match std::fs::read_to_string(&self.path) {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(FavoritesError::File {
                path: self.path.clone(),
                source,
            }),
        }
    }

    fn save(&self, serialized: &str) -> Result<(), FavoritesError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).context(FileSnafu { path: parent })?;
        }
        std::fs::write(&self.path, serialized).context(FileSnafu { path: &self.path })?;
        debug!(path = ?self.path, "favorites saved");
        Ok(())
    }
}

/// Favorites held in memory only
#[derive(Debug, Default)]
pub struct MemoryFavoriteStore {
    value: Mutex<Option<String>>,
}

impl MemoryFavoriteStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-loaded with a serialized value
    pub fn with_value(serialized: impl Into<String>) -> Self {
        Self {
            value: Mutex::new(Some(serialized.into())),
        }
    }
}

impl FavoriteStore for MemoryFavoriteStore {
    fn load(&self) -> Result<Option<String>, FavoritesError> {
        Ok(self.value.lock().clone())
    }

    fn save(&self, serialized: &str) -> Result<(), FavoritesError> {
        *self.value.lock() = Some(serialized.to_string());
        Ok(())
    }
}

/// The favorite set with write-through persistence.
#[derive(Debug)]
pub struct Favorites {
    store: Box<dyn FavoriteStore>,
    set: Mutex<FavoriteSet>,
    diagnostics: Arc<Diagnostics>,
}

impl Favorites {
    /// Reads the stored set once. Unreadable or malformed data yields an empty set.
    pub fn open(store: Box<dyn FavoriteStore>, diagnostics: Arc<Diagnostics>) -> Self {
        let set = match store.load().and_then(|value| decode(value.as_deref())) {
            Ok(set) => set,
            Err(e) => {
                warn!(error = %e, "favorites could not be read; starting empty");
                diagnostics.record(DiagnosticKind::FavoritesPersistFailure, e.to_string());
                FavoriteSet::new()
            }
        };
        debug!(count = set.len(), "favorites loaded");
        Self {
            store,
            set: Mutex::new(set),
            diagnostics,
        }
    }

    /// Adds or removes `id`. Returns true if it is now a favorite.
    pub fn toggle(&self, id: &SuggestionId) -> bool {
        let mut set = self.set.lock();
        let now_favorite = if set.remove(id) {
            false
        } else {
            set.insert(id.clone());
            true
        };
        self.persist(&set);
        now_favorite
    }

    pub fn contains(&self, id: &SuggestionId) -> bool {
        self.set.lock().contains(id)
    }

    pub fn len(&self) -> usize {
        self.set.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.set.lock().is_empty()
    }

    /// Copy of the current set
    pub fn snapshot(&self) -> FavoriteSet {
        self.set.lock().clone()
    }

    /// Removes every favorite
    pub fn clear(&self) {
        let mut set = self.set.lock();
        set.clear();
        self.persist(&set);
    }

    /// Stored form: json array of ids, sorted
    pub fn serialized(&self) -> Result<String, FavoritesError> {
        encode(&self.set.lock())
    }

    // Called with the set locked, so saves reach the store in mutation order.
    fn persist(&self, set: &FavoriteSet) {
        if let Err(e) = encode(set).and_then(|value| self.store.save(&value)) {
            warn!(error = %e, "favorites not saved");
            self.diagnostics
                .record(DiagnosticKind::FavoritesPersistFailure, e.to_string());
        }
    }

    /// Favorited suggestions grouped by series, series in first-appearance order
    fn picks_by_series<'a>(&self, suggestions: &'a [Suggestion]) -> Vec<(&'a str, Vec<&'a Suggestion>)> {
        let set = self.set.lock();
        let mut groups: Vec<(&'a str, Vec<&'a Suggestion>)> = Vec::new();
        for suggestion in suggestions.iter().filter(|s| set.contains(&s.id)) {
            match groups
                .iter_mut()
                .find(|(series, _)| *series == suggestion.series)
            {
                Some((_, picks)) => picks.push(suggestion),
                None => groups.push((suggestion.series.as_str(), vec![suggestion])),
            }
        }
        groups
    }

    /// e.g. "3 picks across 2 series"
    pub fn export_summary(&self, suggestions: &[Suggestion]) -> String {
        let count = self.len();
        let series = self.picks_by_series(suggestions).len();
        format!(
            "{count} pick{} across {series} series",
            if count == 1 { "" } else { "s" }
        )
    }

    /// Shareable list of picks grouped by series
    pub fn export_list(&self, suggestions: &[Suggestion]) -> String {
        let mut text = format!("My Picks ({}):\n", self.len());
        for (series, picks) in self.picks_by_series(suggestions) {
            text.push_str(&format!("\n{series}:\n"));
            let lines: Vec<String> = picks
                .iter()
                .map(|pick| {
                    let (a, b) = pick.pick_names();
                    format!("  • {a} / {b}")
                })
                .collect();
            text.push_str(&lines.join("\n"));
        }
        text
    }
}

fn encode(set: &FavoriteSet) -> Result<String, FavoritesError> {
    serde_json::to_string(set).context(EncodingSnafu)
}

fn decode(value: Option<&str>) -> Result<FavoriteSet, FavoritesError> {
    match value {
        None => Ok(FavoriteSet::new()),
        Some(text) if text.trim().is_empty() => Ok(FavoriteSet::new()),
        Some(text) => serde_json::from_str(text).context(EncodingSnafu),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::suggestion;

    fn id(s: &str) -> SuggestionId {
        SuggestionId::from(s)
    }

    fn memory_favorites(initial: Option<&str>) -> (Favorites, Arc<Diagnostics>) {
        let diagnostics = Arc::new(Diagnostics::new());
        let store = match initial {
            Some(value) => MemoryFavoriteStore::with_value(value),
            None => MemoryFavoriteStore::new(),
        };
        (Favorites::open(Box::new(store), diagnostics.clone()), diagnostics)
    }

    #[test]
    fn test_toggle_twice_restores() {
        let (favorites, _) = memory_favorites(Some(r#"["2"]"#));
        let before = favorites.snapshot();
        let before_serialized = favorites.serialized().unwrap();
        assert!(favorites.toggle(&id("5")));
        assert!(favorites.contains(&id("5")));
        assert_eq!(favorites.serialized().unwrap(), r#"["2","5"]"#);
        assert!(!favorites.toggle(&id("5")));
        assert_eq!(favorites.snapshot(), before);
        assert_eq!(favorites.serialized().unwrap(), before_serialized);
    }

    /// Store whose first save is slow, recording every saved value
    #[derive(Debug, Default)]
    struct SlowStore {
        saves: Arc<Mutex<Vec<String>>>,
    }

    impl FavoriteStore for SlowStore {
        fn load(&self) -> Result<Option<String>, FavoritesError> {
            Ok(None)
        }

        fn save(&self, serialized: &str) -> Result<(), FavoritesError> {
            if self.saves.lock().is_empty() {
                std::thread::sleep(std::time::Duration::from_millis(300));
            }
            self.saves.lock().push(serialized.to_string());
            Ok(())
        }
    }

    #[test]
    fn test_concurrent_toggles_persist_in_order() {
        let saves = Arc::new(Mutex::new(Vec::new()));
        let store = SlowStore { saves: saves.clone() };
        let favorites = Favorites::open(Box::new(store), Arc::new(Diagnostics::new()));

        std::thread::scope(|scope| {
            scope.spawn(|| favorites.toggle(&id("a")));
            std::thread::sleep(std::time::Duration::from_millis(50));
            scope.spawn(|| favorites.toggle(&id("b")));
        });

        let saves = saves.lock();
        assert_eq!(*saves, vec![r#"["a"]"#.to_string(), r#"["a","b"]"#.to_string()]);
        assert_eq!(saves.last().cloned(), Some(favorites.serialized().unwrap()));
    }

    #[test]
    fn test_serialized_is_sorted() {
        let (favorites, _) = memory_favorites(None);
        for key in ["c", "a", "b"] {
            favorites.toggle(&id(key));
        }
        assert_eq!(favorites.serialized().unwrap(), r#"["a","b","c"]"#);
    }

    #[test]
    fn test_open_reads_numbers_and_strings() {
        let (favorites, diagnostics) = memory_favorites(Some("[3, \"7\"]"));
        assert_eq!(favorites.len(), 2);
        assert!(favorites.contains(&id("3")));
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_malformed_store_starts_empty() {
        let (favorites, diagnostics) = memory_favorites(Some("{not json"));
        assert!(favorites.is_empty());
        assert!(diagnostics.has(DiagnosticKind::FavoritesPersistFailure));
    }

    #[test]
    fn test_clear() {
        let (favorites, _) = memory_favorites(Some(r#"["1","2"]"#));
        favorites.clear();
        assert!(favorites.is_empty());
        assert_eq!(favorites.serialized().unwrap(), "[]");
    }

    #[test]
    fn test_export() {
        let suggestions = vec![
            suggestion("1", "Mythical Mayhem", "Oracle App", &[]),
            suggestion("2", "Monster Mash-Up", "Slime Merge", &[]),
            suggestion("3", "Mythical Mayhem", "Hydra Loan", &[]),
        ];
        let (favorites, _) = memory_favorites(None);
        assert_eq!(favorites.export_summary(&suggestions), "0 picks across 0 series");
        favorites.toggle(&id("3"));
        assert_eq!(favorites.export_summary(&suggestions), "1 pick across 1 series");
        favorites.toggle(&id("1"));
        favorites.toggle(&id("2"));
        assert_eq!(favorites.export_summary(&suggestions), "3 picks across 2 series");
        assert_eq!(
            favorites.export_list(&suggestions),
            "My Picks (3):\n\nMythical Mayhem:\n  • Oracle App / Oracle App\n  • Hydra Loan / Hydra Loan\nMonster Mash-Up:\n  • Slime Merge / Slime Merge"
        );
    }
}
