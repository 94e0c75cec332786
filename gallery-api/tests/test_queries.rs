//! Query pipeline properties over generated and sample catalogs.

mod common;

use common::{catalog_from, generated_manifest};
use gallery::{CARDS_PER_PAGE, SUGGESTIONS_PER_PAGE, prelude::*, query::query, test_util::sample_catalog};

#[test]
fn test_pages_cover_visible_set() {
    let catalog = catalog_from(&generated_manifest(30, 4));
    let ctx = CardContext::new(&catalog);
    let views = [
        CardView::default(),
        CardView::default().with_filter(CardFilter::Framed),
        CardView::default().with_filter(CardFilter::Raw),
        CardView::default().with_sort(CardSort::Name),
        CardView::default().with_search("1"),
        CardView::default()
            .with_series(SeriesFilter::Only("sa".into()))
            .with_filter(CardFilter::Raw)
            .with_sort(CardSort::Name),
        CardView::default().with_search("nothing matches this"),
    ];

    for view in views {
        let first = query(catalog.cards(), &view, &ctx);
        let mut seen = Vec::new();
        for page in 1..=first.total_pages {
            let result = query(catalog.cards(), &view.clone().with_page(page), &ctx);
            assert!(result.page_items().len() <= CARDS_PER_PAGE);
            seen.extend(result.page_items().iter().map(|c| c.number));
        }
        let visible: Vec<u32> = first.visible().iter().map(|c| c.number).collect();
        assert_eq!(seen, visible, "{view:?}");
        assert_eq!(visible.len(), first.total);
    }
}

#[test]
fn test_number_sort_unknown_series_last_and_idempotent() {
    let manifest = serde_json::json!({
        "collections": [
            {"id": "sa", "name": "Suburban Apocalypse", "prefix": "SA"},
            {"id": "punk", "name": "Punk Legends", "prefix": "PK"}
        ],
        "cards": [
            {"seriesId": "zz", "number": 1, "name": "Stray", "raw": "r.png"},
            {"seriesId": "punk", "number": 2, "name": "Mohawk Molly", "raw": "r.png"},
            {"seriesId": "sa", "number": 5, "variant": "b", "name": "Second", "raw": "r.png"},
            {"seriesId": "sa", "number": 5, "variant": "a", "name": "First", "raw": "r.png"},
            {"seriesId": "sa", "number": 5, "name": "Plain", "raw": "r.png"}
        ]
    })
    .to_string();
    let catalog = catalog_from(&manifest);
    let ctx = CardContext::new(&catalog);
    let result = query(catalog.cards(), &CardView::default(), &ctx);
    let labels: Vec<String> = result.visible().iter().map(|c| catalog.label_of(c)).collect();
    assert_eq!(labels, vec!["SA-05", "SA-05A", "SA-05B", "PK-02", "ZZ-01"]);

    // sorting the sorted output again changes nothing
    let sorted: Vec<Card> = result.visible().iter().map(|c| (*c).clone()).collect();
    let again = query(&sorted, &CardView::default(), &ctx);
    let labels_again: Vec<String> = again.visible().iter().map(|c| catalog.label_of(c)).collect();
    assert_eq!(labels_again, labels);
}

#[test]
fn test_filter_change_resets_page() {
    // 30 cards, 7 framed: viewing page 3, then choosing the framed filter
    let catalog = catalog_from(&generated_manifest(30, 4));
    let ctx = CardContext::new(&catalog);
    let view = CardView::default().with_page(3);
    let result = query(catalog.cards(), &view, &ctx);
    assert_eq!(result.page, 3);
    assert_eq!(result.page_items().len(), 6);

    let view = view.with_filter(CardFilter::Framed);
    assert_eq!(view.page(), 1);
    let result = query(catalog.cards(), &view, &ctx);
    assert_eq!(result.total, 7);
    assert_eq!(result.total_pages, 1);
    assert_eq!(result.page_items().len(), 7);
}

#[test]
fn test_out_of_range_page_clamps() {
    let catalog = catalog_from(&generated_manifest(30, 4));
    let ctx = CardContext::new(&catalog);
    let view = CardView::default()
        .with_filter(CardFilter::Framed)
        .with_page(3);
    let result = query(catalog.cards(), &view, &ctx);
    assert_eq!(result.page, 1);
    assert_eq!(view.settle(&result).page(), 1);

    let none = query(
        catalog.cards(),
        &CardView::default().with_search("nothing matches this").with_page(9),
        &ctx,
    );
    assert_eq!(none.page, 1);
    assert_eq!(none.total_pages, 1);
    assert!(none.page_items().is_empty());
}

#[test]
fn test_equal_keys_keep_source_order() {
    let manifest = serde_json::json!({
        "collections": [{"id": "sa", "name": "Suburban Apocalypse", "prefix": "SA"}],
        "cards": [
            {"seriesId": "sa", "number": 3, "name": "Twin", "raw": "r3.png"},
            {"seriesId": "sa", "number": 1, "name": "Twin", "raw": "r1.png"},
            {"seriesId": "sa", "number": 2, "name": "Twin", "raw": "r2.png"}
        ]
    })
    .to_string();
    let catalog = catalog_from(&manifest);
    let ctx = CardContext::new(&catalog);
    let result = query(catalog.cards(), &CardView::default().with_sort(CardSort::Name), &ctx);
    let numbers: Vec<u32> = result.visible().iter().map(|c| c.number).collect();
    assert_eq!(numbers, vec![3, 1, 2]);
}

#[test]
fn test_query_leaves_source_order() {
    let catalog = sample_catalog();
    let before: Vec<String> = catalog.cards().iter().map(|c| c.name.clone()).collect();
    let ctx = CardContext::new(&catalog);
    let _ = query(catalog.cards(), &CardView::default().with_sort(CardSort::Name), &ctx);
    let after: Vec<String> = catalog.cards().iter().map(|c| c.name.clone()).collect();
    assert_eq!(before, after);
}

#[test]
fn test_name_sort_is_case_insensitive() {
    let catalog = sample_catalog();
    let ctx = CardContext::new(&catalog);
    let result = query(catalog.cards(), &CardView::default().with_sort(CardSort::Name), &ctx);
    let names: Vec<String> = result.visible().iter().map(|c| c.name.to_lowercase()).collect();
    let mut sorted = names.clone();
    sorted.sort();
    assert_eq!(names, sorted);
}

#[test]
fn test_suggestion_series_order_and_paging() {
    let catalog = sample_catalog();
    let favorites = FavoriteSet::new();
    let tallies = Tallies::new();
    let ctx = SuggestionContext::new(&catalog, &favorites, &tallies);
    let result = query(catalog.suggestions(), &SuggestionView::default(), &ctx);
    assert_eq!(result.page_size, SUGGESTIONS_PER_PAGE);

    // grouped by series in first-appearance order
    let positions: Vec<usize> = result
        .visible()
        .iter()
        .filter_map(|s| catalog.suggestion_series_position(&s.series))
        .collect();
    assert!(positions.windows(2).all(|w| w[0] <= w[1]));

    let spicy = query(
        catalog.suggestions(),
        &SuggestionView::default().with_filter(SuggestionFilter::Spicy),
        &ctx,
    );
    assert!(spicy.visible().iter().all(|s| s.distance == Distance::Spicy));
    assert_eq!(spicy.total, 2);
}
