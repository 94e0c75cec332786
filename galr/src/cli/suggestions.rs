use anyhow::Result;
use gallery::prelude::*;
use serde::Serialize;

use crate::{
    cli::{AppContext, SuggestionsArgs, cards::pager_footer, known_suggestion},
    output::{OutputFormat, SuggestionRow},
};

#[derive(Serialize)]
struct SuggestionPage {
    state: ResultState,
    voting: bool,
    items: Vec<SuggestionRow>,
    pagination: PaginationMeta,
    pages: Vec<PageMarker>,
}

pub(crate) fn suggestion_row(ctx: &AppContext, suggestion: &Suggestion) -> SuggestionRow {
    let reconciler = ctx.gallery.reconciler();
    SuggestionRow {
        id: suggestion.id.clone(),
        series: suggestion.series.clone(),
        title: suggestion.title.clone(),
        distance: suggestion.distance,
        score: reconciler.score(&suggestion.id),
        my_vote: reconciler.vote_of(&suggestion.id),
        favorite: ctx.gallery.favorites().contains(&suggestion.id),
    }
}

pub fn list(ctx: &AppContext, args: &SuggestionsArgs) -> Result<()> {
    let view = SuggestionView::default()
        .with_series(args.series.clone())
        .with_filter(args.filter)
        .with_search(args.search.as_str())
        .with_sort(args.sort)
        .with_page(args.page.page);
    let result = ctx.gallery.suggestions(&view);

    let page = SuggestionPage {
        state: ResultState::of(ctx.gallery.catalog().suggestion_state(), &result),
        voting: ctx.gallery.voting_enabled(),
        items: result
            .page_items()
            .iter()
            .map(|suggestion| suggestion_row(ctx, suggestion))
            .collect(),
        pagination: result.pagination(),
        pages: result.page_numbers(),
    };
    let footer = pager_footer(&page.pagination, &page.pages, page.state);
    ctx.output.emit_rows(&page.items, Some(footer.as_str()), &page)
}

pub async fn vote(ctx: &AppContext, id: &str, vote: Vote) -> Result<()> {
    if !ctx.gallery.voting_enabled() {
        return Err(GalleryError::VotingUnavailable.into());
    }
    let id = known_suggestion(ctx, id)?;
    let outcome = ctx.gallery.cast_vote(&id, vote).await;
    if ctx.output.format() == OutputFormat::Table {
        let mine = outcome.personal.map_or_else(|| "none".to_string(), |v| v.to_string());
        let sync = match &outcome.sync {
            SyncStatus::Synced => "synced".to_string(),
            SyncStatus::Failed { message } => format!("not synced: {message}"),
            SyncStatus::Disabled => "voting disabled".to_string(),
        };
        return ctx.output.emit_text(&format!(
            "{id}: score {} (your vote: {mine}, {sync})",
            outcome.score
        ));
    }
    ctx.output.emit_json(&outcome)
}
