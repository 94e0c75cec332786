/*
 * galr - browse a card gallery, query suggestions, vote, and keep favorites
 *
 * SPDX-FileCopyrightText: 2025-2026 Steve Schoettler
 * SPDX-License-Identifier: Apache-2.0
 */
use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use gallery::prelude::*;
use tracing::{debug, warn};

use crate::output::{Output, OutputFormat};

pub mod cards;
pub mod fav;
pub mod identity;
pub mod suggestions;

#[derive(Parser, Debug)]
#[command(name = "galr")]
#[command(author, version, about = "galr: browse a card gallery, query suggestions, vote, and keep favorites", long_about = None)]
#[allow(clippy::struct_excessive_bools)]
pub struct Cli {
    /// Card manifest: path or http(s) url. Default: `manifest.json`
    #[arg(long, env = "GALLERY_CATALOG", global = true)]
    pub catalog: Option<String>,

    /// Suggestion catalog: path or http(s) url. Default: `suggestions.json`
    #[arg(long, env = "GALLERY_SUGGESTIONS", global = true)]
    pub suggestions: Option<String>,

    /// Tally service base url. Voting is disabled without url and key.
    #[arg(long, env = "GALLERY_TALLY_URL", global = true)]
    pub tally_url: Option<String>,

    /// Tally service api key
    #[arg(long, env = "GALLERY_TALLY_KEY", hide_env_values = true, global = true)]
    pub tally_key: Option<String>,

    /// Favorites file. Default: `<config dir>/gallery/favorites.json`
    #[arg(long, env = "GALLERY_FAVORITES", global = true)]
    pub favorites: Option<PathBuf>,

    /// Keep favorites in memory only
    #[arg(long, global = true, conflicts_with = "favorites")]
    pub no_save: bool,

    /// Use this identity instead of the derived fingerprint
    #[arg(long, env = "GALLERY_IDENTITY", global = true)]
    pub identity: Option<String>,

    /// Retries for idempotent http requests
    #[arg(long, env = "GALLERY_MAX_RETRIES", global = true)]
    pub max_retries: Option<u32>,

    /// Write output to file (default: stdout)
    #[arg(short = 'o', long, value_name = "FILE", global = true)]
    pub output: Option<PathBuf>,

    /// JSON output (default)
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pub pretty: bool,

    /// Table output format
    #[arg(short, long, global = true)]
    pub table: bool,

    /// Quiet mode - suppress output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose mode (repeat for more: -v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global=true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List cards: filter, search, sort, and page
    Cards(CardsArgs),

    /// Open one card by label or deep link (`SA-01A`, `card/SA-01A`)
    Card {
        link: DeepLink,

        /// Listing that previous/next step through
        #[command(flatten)]
        view: CardViewArgs,
    },

    /// Pick a random card with an image
    Random,

    /// Card counts by image state
    Stats,

    /// Collections and their card counts
    Series,

    /// List suggestions: filter, search, sort, and page
    #[command(alias = "suggest")]
    Suggestions(SuggestionsArgs),

    /// Vote on a suggestion. Repeating a vote removes it; the opposite vote flips it.
    Vote {
        id: String,

        /// up or down
        vote: Vote,
    },

    /// Favorite suggestions
    #[command(alias = "favs")]
    Fav(FavArgs),

    /// Show the voter identity
    Identity,
}

#[derive(Args, Debug)]
pub struct CardsArgs {
    #[command(flatten)]
    pub view: CardViewArgs,

    #[command(flatten)]
    pub page: PageArgs,
}

#[derive(Args, Debug)]
pub struct CardViewArgs {
    /// Series id, or "all"
    #[arg(long, default_value = "all")]
    pub series: SeriesFilter,

    /// all, framed, or raw
    #[arg(long, default_value = "all")]
    pub filter: CardFilter,

    /// Case-insensitive text search
    #[arg(long, short = 's', default_value = "")]
    pub search: String,

    /// number or name
    #[arg(long, default_value = "number")]
    pub sort: CardSort,
}

impl CardViewArgs {
    pub fn to_view(&self) -> CardView {
        CardView::default()
            .with_series(self.series.clone())
            .with_filter(self.filter)
            .with_search(self.search.as_str())
            .with_sort(self.sort)
    }
}

#[derive(Args, Debug)]
pub struct SuggestionsArgs {
    /// Series name, or "all"
    #[arg(long, default_value = "all")]
    pub series: SeriesFilter,

    /// all, favorites, safe, or spicy
    #[arg(long, default_value = "all")]
    pub filter: SuggestionFilter,

    /// Case-insensitive search of title, pitch, names, and tone tags
    #[arg(long, short = 's', default_value = "")]
    pub search: String,

    /// series, title, favorites-first, or votes
    #[arg(long, default_value = "series")]
    pub sort: SuggestionSort,

    #[command(flatten)]
    pub page: PageArgs,
}

#[derive(Args, Debug)]
pub struct PageArgs {
    /// Page number, clamped to the available pages
    #[arg(long, default_value = "1")]
    pub page: usize,
}

#[derive(Args, Debug)]
pub struct FavArgs {
    #[command(subcommand)]
    pub command: FavCommands,
}

#[derive(Subcommand, Debug)]
pub enum FavCommands {
    /// Add or remove a favorite
    Toggle { id: String },

    /// List favorite suggestions
    List,

    /// Remove every favorite
    Clear,

    /// Shareable pick list, grouped by series
    Export,
}

pub struct AppContext {
    pub gallery: Gallery,
    pub output: Output,
}

pub async fn run(cli: Cli) -> Result<()> {
    let output = Output::new(resolve_output_format(&cli), cli.output.clone());
    let config = build_config(&cli);
    debug!(?config, "gallery config");

    let gallery = Gallery::open(config).await?;
    let ctx = AppContext { gallery, output };

    let result = match cli.command {
        Commands::Cards(args) => cards::list(&ctx, &args),
        Commands::Card { link, view } => cards::open(&ctx, &link, &view.to_view()),
        Commands::Random => cards::random(&ctx),
        Commands::Stats => cards::stats(&ctx),
        Commands::Series => cards::series(&ctx),
        Commands::Suggestions(args) => suggestions::list(&ctx, &args),
        Commands::Vote { id, vote } => suggestions::vote(&ctx, &id, vote).await,
        Commands::Fav(args) => fav::handle(&ctx, args),
        Commands::Identity => identity::show(&ctx),
    };
    debug!(metrics = %ctx.gallery.http_metrics(), "http");
    result
}

fn resolve_output_format(cli: &Cli) -> OutputFormat {
    if cli.quiet {
        OutputFormat::Quiet
    } else if cli.pretty {
        if cli.table {
            warn!("--pretty conflicts with --table. Using json pretty format");
        }
        OutputFormat::Pretty
    } else if cli.json {
        if cli.table {
            warn!("--json conflicts with --table. Using json format");
        }
        OutputFormat::Json
    } else if cli.table {
        OutputFormat::Table
    } else {
        OutputFormat::Json
    }
}

fn build_config(cli: &Cli) -> GalleryConfig {
    let mut config = GalleryConfig::default().user_agent(concat!("galr/", env!("CARGO_PKG_VERSION")));
    if let Some(catalog) = &cli.catalog {
        config = config.catalog_source(Source::from(catalog.as_str()));
    }
    if let Some(suggestions) = &cli.suggestions {
        config = config.suggestion_source(Source::from(suggestions.as_str()));
    }
    if cli.tally_url.is_some() || cli.tally_key.is_some() {
        let tally = TallyConfig::new(
            cli.tally_url.clone().unwrap_or_default(),
            cli.tally_key.clone().unwrap_or_default(),
        );
        if tally.is_none() {
            warn!("tally service needs both --tally-url and --tally-key; voting disabled");
        }
        config = config.tally(tally);
    }
    if cli.no_save {
        config = config.favorites_path(None);
    } else if let Some(path) = &cli.favorites {
        config = config.favorites_path(Some(path.clone()));
    }
    if cli.identity.is_some() {
        config = config.identity(cli.identity.clone());
    }
    if let Some(max_retries) = cli.max_retries {
        config = config.max_retries(max_retries);
    }
    config
}

/// Suggestion id that exists in the loaded catalog
pub(crate) fn known_suggestion(ctx: &AppContext, id: &str) -> Result<SuggestionId> {
    let id = SuggestionId::from(id.trim());
    if ctx.gallery.catalog().suggestion(&id).is_none() {
        return Err(GalleryError::NotFound {
            obj_type: "suggestion".to_string(),
            key: id.to_string(),
        }
        .into());
    }
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cards_flags() {
        let cli = Cli::parse_from([
            "galr", "--table", "cards", "--filter", "framed", "--series", "punk", "--page", "2",
        ]);
        assert_eq!(resolve_output_format(&cli), OutputFormat::Table);
        let Commands::Cards(args) = cli.command else {
            panic!("expected cards");
        };
        assert_eq!(args.view.filter, CardFilter::Framed);
        assert_eq!(args.view.series, SeriesFilter::Only("punk".into()));
        assert_eq!(args.page.page, 2);
    }

    #[test]
    fn test_parse_vote_and_link() {
        let cli = Cli::parse_from(["galr", "vote", "12", "down"]);
        assert!(matches!(cli.command, Commands::Vote { vote: Vote::Down, .. }));

        let cli = Cli::parse_from(["galr", "card", "#card/SA-01A", "--filter", "framed"]);
        let Commands::Card { link, view } = cli.command else {
            panic!("expected card");
        };
        assert_eq!(link.label(), "SA-01A");
        assert_eq!(view.to_view(), CardView::default().with_filter(CardFilter::Framed));
    }

    #[test]
    fn test_config_from_flags() {
        let cli = Cli::parse_from([
            "galr",
            "--catalog",
            "https://example.com/manifest.json",
            "--tally-url",
            "https://tally.example.com",
            "--tally-key",
            "k",
            "--no-save",
            "--identity",
            "me",
            "stats",
        ]);
        let config = build_config(&cli);
        assert!(config.catalog_source.is_remote());
        assert!(config.tally.is_some());
        assert!(config.favorites_path.is_none());
        assert_eq!(config.resolve_identity().as_str(), "me");
    }
}
