use anyhow::Result;
use serde_json::json;

use crate::{
    cli::{AppContext, FavArgs, FavCommands, known_suggestion, suggestions::suggestion_row},
    output::{OutputFormat, SuggestionRow},
};

pub fn handle(ctx: &AppContext, args: FavArgs) -> Result<()> {
    let favorites = ctx.gallery.favorites();
    match args.command {
        FavCommands::Toggle { id } => {
            let id = known_suggestion(ctx, &id)?;
            let favorite = ctx.gallery.toggle_favorite(&id);
            if ctx.output.format() == OutputFormat::Table {
                let verb = if favorite { "added" } else { "removed" };
                return ctx.output.emit_text(&format!("{id} {verb}"));
            }
            ctx.output
                .emit_json(&json!({ "id": id, "favorite": favorite, "count": favorites.len() }))
        }
        FavCommands::List => {
            let rows: Vec<SuggestionRow> = ctx
                .gallery
                .catalog()
                .suggestions()
                .iter()
                .filter(|s| favorites.contains(&s.id))
                .map(|s| suggestion_row(ctx, s))
                .collect();
            let footer = ctx.gallery.export_summary();
            ctx.output.emit_rows(&rows, Some(footer.as_str()), &rows)
        }
        FavCommands::Clear => {
            favorites.clear();
            if ctx.output.format() == OutputFormat::Table {
                return ctx.output.emit_text("favorites cleared");
            }
            ctx.output.emit_json(&json!({ "count": favorites.len() }))
        }
        FavCommands::Export => {
            let summary = ctx.gallery.export_summary();
            let list = ctx.gallery.export_list();
            match ctx.output.format() {
                OutputFormat::Table => ctx.output.emit_text(&list),
                _ => ctx
                    .output
                    .emit_json(&json!({ "summary": summary, "text": list })),
            }
        }
    }
}
