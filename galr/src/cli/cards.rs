use anyhow::Result;
use gallery::{navigation::step_visible, prelude::*};
use serde::Serialize;

use crate::{
    cli::{AppContext, CardsArgs},
    output::{CardRow, OutputFormat, SeriesRow, render_table_dynamic},
};

#[derive(Serialize)]
struct CardPage {
    state: ResultState,
    items: Vec<CardRow>,
    pagination: PaginationMeta,
    pages: Vec<PageMarker>,
}

pub fn list(ctx: &AppContext, args: &CardsArgs) -> Result<()> {
    let view = args.view.to_view().with_page(args.page.page);
    let catalog = ctx.gallery.catalog();
    let result = ctx.gallery.cards(&view);

    let page = CardPage {
        state: ResultState::of(catalog.card_state(), &result),
        items: result
            .page_items()
            .iter()
            .map(|card| CardRow::new(catalog, card))
            .collect(),
        pagination: result.pagination(),
        pages: result.page_numbers(),
    };
    let footer = pager_footer(&page.pagination, &page.pages, page.state);
    ctx.output.emit_rows(&page.items, Some(footer.as_str()), &page)
}

pub(crate) fn pager_footer(meta: &PaginationMeta, pages: &[PageMarker], state: ResultState) -> String {
    match state {
        ResultState::NotLoaded => "not loaded".to_string(),
        ResultState::LoadFailed => "catalog failed to load".to_string(),
        ResultState::NoMatches => "no matches".to_string(),
        ResultState::Matches => {
            let pager: Vec<String> = pages
                .iter()
                .map(|marker| match marker {
                    PageMarker::Page(n) if *n == meta.page => format!("[{n}]"),
                    other => other.to_string(),
                })
                .collect();
            format!("{} matches, page {}/{}   {}", meta.total, meta.page, meta.total_pages, pager.join(" "))
        }
    }
}

#[derive(Serialize)]
struct CardDetail<'a> {
    label: String,
    download_name: String,
    link: String,
    #[serde(flatten)]
    card: &'a Card,
    image: Option<&'a str>,
    pair: Option<String>,
    previous: Option<String>,
    next: Option<String>,
}

pub fn open(ctx: &AppContext, link: &DeepLink, view: &CardView) -> Result<()> {
    let catalog = ctx.gallery.catalog();
    let card = ctx.gallery.open_link(link).ok_or_else(|| GalleryError::NotFound {
        obj_type: "card".to_string(),
        key: link.label().to_string(),
    })?;

    // prev/next within the given listing
    let result = ctx.gallery.cards(view);
    let current = result.visible().iter().position(|c| c.same_entry(card));
    let neighbor = |direction| {
        step_visible(current, direction, result.visible())
            .map(|index| catalog.label_of(result.visible()[index]))
    };

    let detail = CardDetail {
        label: catalog.label_of(card),
        download_name: catalog.download_name(card),
        link: DeepLink::for_card(catalog, card).to_string(),
        card,
        image: card.display_image(),
        pair: catalog.pair_displayable(card).map(|pair| catalog.label_of(pair)),
        previous: neighbor(Direction::Previous),
        next: neighbor(Direction::Next),
    };

    if ctx.output.format() == OutputFormat::Table {
        let rows: Vec<Vec<String>> = [
            ("label", Some(detail.label.clone())),
            ("name", Some(card.name.clone())),
            ("other name", card.other_name.clone()),
            ("series", Some(catalog.series_name(&card.series_id).to_string())),
            ("description", card.description.clone()),
            ("image", detail.image.map(str::to_string)),
            ("download", Some(detail.download_name.clone())),
            ("flip", detail.pair.clone()),
            ("previous", detail.previous.clone()),
            ("next", detail.next.clone()),
        ]
        .into_iter()
        .filter_map(|(field, value)| value.map(|v| vec![field.to_string(), v]))
        .collect();
        return ctx
            .output
            .emit_text(&render_table_dynamic(&["field".into(), "value".into()], &rows));
    }
    ctx.output.emit_json(&detail)
}

pub fn random(ctx: &AppContext) -> Result<()> {
    let catalog = ctx.gallery.catalog();
    let mut rng = rand::rng();
    let card = catalog
        .random_displayable(&mut rng)
        .ok_or_else(|| GalleryError::NotFound {
            obj_type: "card".to_string(),
            key: "any card with an image".to_string(),
        })?;
    let row = CardRow::new(catalog, card);
    ctx.output.emit_rows(std::slice::from_ref(&row), None, &row)
}

pub fn stats(ctx: &AppContext) -> Result<()> {
    let stats = ctx.gallery.catalog().stats();
    if ctx.output.format() == OutputFormat::Table {
        let rows = vec![
            vec!["total".to_string(), stats.total.to_string()],
            vec!["generated".to_string(), stats.generated.to_string()],
            vec!["framed".to_string(), stats.framed.to_string()],
            vec!["pending".to_string(), stats.pending.to_string()],
            vec!["series".to_string(), stats.series.to_string()],
        ];
        return ctx
            .output
            .emit_text(&render_table_dynamic(&["stat".into(), "count".into()], &rows));
    }
    ctx.output.emit_json(&stats)
}

pub fn series(ctx: &AppContext) -> Result<()> {
    let rows: Vec<SeriesRow> = ctx
        .gallery
        .catalog()
        .series_counts()
        .into_iter()
        .map(|(collection, cards)| SeriesRow {
            id: collection.id.clone(),
            name: collection.name.clone(),
            prefix: collection.prefix.clone(),
            cards,
        })
        .collect();
    ctx.output.emit_rows(&rows, None, &rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use gallery::paged::page_numbers;

    #[test]
    fn test_pager_footer() {
        let meta = PaginationMeta::new(2, 12, 30);
        let footer = pager_footer(&meta, &page_numbers(2, 3), ResultState::Matches);
        assert_eq!(footer, "30 matches, page 2/3   1 [2] 3");
        let footer = pager_footer(&meta, &[], ResultState::NoMatches);
        assert_eq!(footer, "no matches");
    }
}
