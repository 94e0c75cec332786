use gallery::prelude::*;
use serde::Serialize;

pub trait TableRow {
    fn headers() -> &'static [&'static str];
    fn row(&self) -> Vec<String>;
}

pub fn render_table<T: TableRow>(items: &[T]) -> String {
    let headers: Vec<String> = T::headers().iter().map(ToString::to_string).collect();
    let rows: Vec<Vec<String>> = items.iter().map(TableRow::row).collect();
    render_table_dynamic(&headers, &rows)
}

pub fn render_table_dynamic(headers: &[String], rows: &[Vec<String>]) -> String {
    let header_refs: Vec<&str> = headers.iter().map(String::as_str).collect();
    let widths = column_widths(&header_refs, rows);

    let mut out = format_row(headers, &widths);
    out.push('\n');
    out.push_str(&format_separator(&widths));

    for row in rows {
        out.push('\n');
        out.push_str(&format_row(row, &widths));
    }

    out
}

fn column_widths(headers: &[&str], rows: &[Vec<String>]) -> Vec<usize> {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (idx, cell) in row.iter().enumerate() {
            let len = cell.chars().count();
            match widths.get_mut(idx) {
                Some(width) => *width = (*width).max(len),
                None => widths.push(len),
            }
        }
    }
    widths
}

fn format_row(row: &[String], widths: &[usize]) -> String {
    let cells: Vec<String> = row
        .iter()
        .enumerate()
        .map(|(idx, cell)| {
            let width = widths.get(idx).copied().unwrap_or(0);
            format!("{cell:<width$}")
        })
        .collect();
    cells.join("  ").trim_end().to_string()
}

fn format_separator(widths: &[usize]) -> String {
    widths
        .iter()
        .map(|width| "-".repeat(*width))
        .collect::<Vec<_>>()
        .join("  ")
}

/// One card as listed by `galr cards`
#[derive(Debug, Clone, Serialize)]
pub struct CardRow {
    pub label: String,
    pub name: String,
    pub series: String,
    pub image: ImageState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pair: Option<String>,
}

impl CardRow {
    pub fn new(catalog: &CatalogIndex, card: &Card) -> Self {
        Self {
            label: catalog.label_of(card),
            name: card.name.clone(),
            series: catalog.series_name(&card.series_id).to_string(),
            image: card.image_state(),
            pair: catalog.pair_of(card).map(|pair| catalog.label_of(pair)),
        }
    }
}

impl TableRow for CardRow {
    fn headers() -> &'static [&'static str] {
        &["label", "name", "series", "image", "pair"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.label.clone(),
            self.name.clone(),
            self.series.clone(),
            self.image.to_string(),
            self.pair.clone().unwrap_or_default(),
        ]
    }
}

/// One suggestion as listed by `galr suggestions`
#[derive(Debug, Clone, Serialize)]
pub struct SuggestionRow {
    pub id: SuggestionId,
    pub series: String,
    pub title: String,
    pub distance: Distance,
    pub score: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub my_vote: Option<Vote>,
    pub favorite: bool,
}

impl TableRow for SuggestionRow {
    fn headers() -> &'static [&'static str] {
        &["id", "series", "title", "distance", "score", "vote", "fav"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.id.to_string(),
            format!("{} {}", SeriesMeta::for_series(&self.series).emoji, self.series),
            self.title.clone(),
            self.distance.to_string(),
            self.score.to_string(),
            self.my_vote.map(|v| v.to_string()).unwrap_or_default(),
            if self.favorite { "*" } else { "" }.to_string(),
        ]
    }
}

/// One collection with its card count
#[derive(Debug, Clone, Serialize)]
pub struct SeriesRow {
    pub id: String,
    pub name: String,
    pub prefix: String,
    pub cards: usize,
}

impl TableRow for SeriesRow {
    fn headers() -> &'static [&'static str] {
        &["id", "name", "prefix", "cards"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.id.clone(),
            self.name.clone(),
            self.prefix.clone(),
            self.cards.to_string(),
        ]
    }
}
