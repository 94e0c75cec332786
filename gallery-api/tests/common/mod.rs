//! Shared helpers for gallery integration tests
//!
//! - sample catalog files written to a temp dir
//! - an offline configuration (local sources, no tally service, fixed identity)
//! - generated manifests for pagination tests
#![cfg(test)]
#![allow(dead_code)]

use std::path::{Path, PathBuf};

use gallery::{
    prelude::*,
    test_util::{sample_manifest, sample_suggestions},
};
use serde_json::json;

pub const TEST_IDENTITY: &str = "test-identity";

/// Writes the sample manifest and suggestions into `dir`
pub fn write_sample_sources(dir: &Path) -> (PathBuf, PathBuf) {
    let manifest = dir.join("manifest.json");
    let suggestions = dir.join("suggestions.json");
    std::fs::write(&manifest, sample_manifest()).expect("write manifest");
    std::fs::write(&suggestions, sample_suggestions()).expect("write suggestions");
    (manifest, suggestions)
}

/// Local sources in `dir`, favorites file in `dir`, no tally service, no retries
pub fn offline_config(dir: &Path) -> GalleryConfig {
    let (manifest, suggestions) = write_sample_sources(dir);
    GalleryConfig::default()
        .catalog_source(Source::Path(manifest))
        .suggestion_source(Source::Path(suggestions))
        .tally(None)
        .favorites_path(Some(dir.join("favorites.json")))
        .identity(Some(TEST_IDENTITY.to_string()))
        .max_retries(0)
}

/// Manifest with `total` cards in one series; every `framed_every`-th card is framed,
/// the rest raw.
pub fn generated_manifest(total: u32, framed_every: u32) -> String {
    let cards: Vec<serde_json::Value> = (1..=total)
        .map(|number| {
            if number % framed_every == 0 {
                json!({"seriesId": "sa", "number": number, "name": format!("Card {number}"),
                       "framed": format!("framed/{number}.webp")})
            } else {
                json!({"seriesId": "sa", "number": number, "name": format!("Card {number}"),
                       "raw": format!("raw/{number}.png")})
            }
        })
        .collect();
    json!({
        "collections": [{"id": "sa", "name": "Suburban Apocalypse", "prefix": "SA"}],
        "cards": cards,
    })
    .to_string()
}

pub fn catalog_from(manifest: &str) -> CatalogIndex {
    let manifest: CardManifest = serde_json::from_str(manifest).expect("manifest json");
    CatalogIndex::new(manifest, SuggestionManifest::default())
}
