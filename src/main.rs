//! gospelway - the daily Gospel in the terminal
//!
//! Fetches the day summary, the daily reading and its commentary from the
//! content service, caching everything locally so the last readings stay
//! available offline.

use std::process::ExitCode;
use std::sync::Arc;

use chrono::{Local, NaiveDate};
use clap::Parser;
use serde::Serialize;
use serde_json::Value;
use tracing_subscriber::EnvFilter;

use gospelway::app::{GospelApp, View};
use gospelway::cache::{KeyValueStore, TtlCache};
use gospelway::cli::{check_invalidate_key, Cli, Command, HighlightsCommand};
use gospelway::config::Config;
use gospelway::data::{parse_allowed_dates, GospelDay, HomeInfo};
use gospelway::highlights::HighlightStore;
use gospelway::render;

/// Sets up logging to stderr, keeping stdout for content
///
/// `RUST_LOG` wins over `-v` when set.
fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("gospelway={}", level)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

fn print_json<T: Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Prints a loaded view, returning whether there was anything to show
fn print_view(
    view: &View<Value>,
    json: bool,
    render_text: impl FnOnce(&Value) -> String,
) -> Result<bool, Box<dyn std::error::Error>> {
    if let Some(banner) = view.banner {
        eprintln!("{}", banner.message());
    }
    let Some(content) = &view.content else {
        return Ok(false);
    };
    if json {
        print_json(content)?;
    } else {
        print!("{}", render_text(content));
    }
    Ok(true)
}

async fn run_highlights(
    command: HighlightsCommand,
    store: Arc<dyn KeyValueStore>,
    json: bool,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let highlights = HighlightStore::new(store);

    match command {
        HighlightsCommand::List { date } => {
            let list = match date {
                Some(date) => highlights.by_date(date).await,
                None => highlights.list().await,
            };
            if json {
                print_json(&list)?;
            } else {
                print!("{}", render::render_highlights(&list));
            }
        }
        HighlightsCommand::Add { date, section, text } => {
            let list = highlights.add(text, date.unwrap_or_else(today), section).await?;
            if let Some(added) = list.first() {
                println!("{}", added.id);
            }
        }
        HighlightsCommand::Remove { id } => {
            let before = highlights.count().await;
            let after = highlights.remove(&id).await?.len();
            if before == after {
                eprintln!("No highlight with id {}", id);
                return Ok(ExitCode::FAILURE);
            }
        }
        HighlightsCommand::Count => println!("{}", highlights.count().await),
    }

    Ok(ExitCode::SUCCESS)
}

async fn run(cli: Cli) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let config = Config::from_cli(&cli);
    let store = config.open_store();
    let cache = TtlCache::new(store.clone());
    let json = cli.json;

    let shown = match cli.command {
        Command::Highlights(command) => return run_highlights(command, store, json).await,
        Command::Invalidate { key } => {
            check_invalidate_key(&key)?;
            cache.invalidate_key(&key).await?;
            return Ok(ExitCode::SUCCESS);
        }
        Command::Dates => {
            let client = config.content_client()?;
            let dates = cache.get_cached_dates(|| client.fetch_allowed_dates()).await?;
            if json {
                print_json(&dates)?;
            } else {
                print!("{}", render::render_dates(&parse_allowed_dates(&dates)));
            }
            true
        }
        Command::Info { date, refresh } => {
            let date = date.unwrap_or_else(today);
            let mut app = GospelApp::new(config.content_client()?, cache);
            app.load_home(date, refresh).await;
            print_view(&app.home, json, |value| render_home_value(date, value))?
        }
        Command::Gospel { date, refresh } => {
            let date = date.unwrap_or_else(today);
            let mut app = GospelApp::new(config.content_client()?, cache);
            app.load_gospel(date, refresh).await;
            print_view(&app.gospel, json, |value| render_gospel_value(date, value))?
        }
        Command::Today { date, refresh } => {
            let date = date.unwrap_or_else(today);
            let mut app = GospelApp::new(config.content_client()?, cache);
            app.load_all(date, refresh).await;
            let home = print_view(&app.home, json, |value| render_home_value(date, value))?;
            if !json {
                println!();
            }
            let gospel = print_view(&app.gospel, json, |value| render_gospel_value(date, value))?;
            home || gospel
        }
    };

    Ok(if shown { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

fn render_home_value(date: NaiveDate, value: &Value) -> String {
    render::render_home(date, &HomeInfo::from_value(value).unwrap_or_default())
}

fn render_gospel_value(date: NaiveDate, value: &Value) -> String {
    render::render_gospel(date, &GospelDay::from_value(value).unwrap_or_default())
}

#[tokio::main]
async fn main() -> ExitCode {
    // A missing .env file is fine; flags and the real environment still apply
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
