//! Mailfind CLI - Command-line interface for history, analytics and search

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Result};
use mailfind_client::RpcSearchClient;
use mailfind_core::{EntryId, Filter, FilterCommand, FilterPatch};
use mailfind_store::{AnalyticsEvent, AnalyticsStore, FileStorage, HistoryStore, StoragePort};
use mailfind_ui::{SearchCommand, SearchConfig, SearchEvent, SearchInterface};
use serde::Serialize;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("mailfind=info".parse()?))
        .init();

    // Parse command line arguments
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_help();
        return Ok(());
    }

    let command = &args[1];

    match command.as_str() {
        "help" | "--help" | "-h" => print_help(),
        "search" => {
            if args.len() < 3 {
                eprintln!("Usage: mailfind-cli search <query> [--filter <field:OPERATOR:value>]...");
                return Ok(());
            }
            let filters = parse_filter_flags(&args[3..])?;
            search(&args[2], filters).await?;
        }
        "history" => list_history()?,
        "remove-history" => {
            if args.len() < 3 {
                eprintln!("Usage: mailfind-cli remove-history <id>");
                return Ok(());
            }
            remove_history(&args[2])?;
        }
        "clear-history" => clear_history()?,
        "stats" => show_stats()?,
        "export" => {
            let csv = args[2..].iter().any(|a| a == "--csv");
            export(csv)?;
        }
        _ => {
            eprintln!("Unknown command: {}", command);
            print_help();
        }
    }

    Ok(())
}

fn print_help() {
    println!(
        r#"Mailfind CLI - Mail search history and analytics

USAGE:
    mailfind-cli <COMMAND> [OPTIONS]

COMMANDS:
    help              Show this help message
    search            Run one search against the server
    history           List recent searches
    remove-history    Remove one history entry
    clear-history     Remove every history entry
    stats             Show search analytics for the current window
    export            Print the analytics log (JSON, or CSV with --csv)

ENVIRONMENT:
    MAILFIND_SERVER     Search endpoint (default http://127.0.0.1:9876)
    MAILFIND_DATA_DIR   Where history and analytics are kept
    MAILFIND_CONFIG     Path to a JSON config file

EXAMPLES:
    mailfind-cli search "quarterly report" --filter from:EQUALS:alice
    mailfind-cli search invoices --filter date:BETWEEN:2024-01-01..2024-03-31
    mailfind-cli history
    mailfind-cli export --csv > searches.csv
"#
    );
}

fn parse_filter_flags(args: &[String]) -> Result<Vec<Filter>> {
    let mut filters = Vec::new();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--filter" | "-f" => match iter.next() {
                Some(expr) => filters.push(Filter::parse(expr)?),
                None => bail!("--filter needs a field:OPERATOR:value expression"),
            },
            other => bail!("Unexpected argument: {}", other),
        }
    }
    Ok(filters)
}

async fn search(query: &str, filters: Vec<Filter>) -> Result<()> {
    let config = load_config()?;
    let client = RpcSearchClient::connect(server_url())?;
    let mut ui = SearchInterface::mount(&config, Arc::new(client), open_storage()?, None)?;

    ui.handle.send(SearchCommand::SetQuery(query.to_string()))?;
    for (index, filter) in filters.into_iter().enumerate() {
        ui.handle.send(SearchCommand::Filter(FilterCommand::Add))?;
        ui.handle.send(SearchCommand::Filter(FilterCommand::Update {
            index,
            patch: FilterPatch {
                field: Some(filter.field),
                operator: Some(filter.operator),
                value: Some(filter.value),
            },
        }))?;
    }
    ui.handle.send(SearchCommand::Submit)?;

    loop {
        match ui.events.recv().await {
            Some(SearchEvent::ResultsReady { total, .. }) => {
                let view = ui.handle.view().await?;
                println!("{} results", total);
                for result in &view.state.results {
                    println!("  {:.3}  {}  {}", result.score, result.id, result.title);
                    if !result.snippet.is_empty() {
                        println!("         {}", result.snippet);
                    }
                }
                break;
            }
            Some(SearchEvent::SearchFailed { message, .. }) => {
                eprintln!("Search failed: {}", message);
                break;
            }
            Some(SearchEvent::ResultsCleared) => {
                println!("Nothing to search for");
                break;
            }
            Some(other) => debug!("{:?}", other),
            None => bail!("Search interface stopped unexpectedly"),
        }
    }

    ui.handle.shutdown();
    ui.task.await?;
    Ok(())
}

fn list_history() -> Result<()> {
    let config = load_config()?;
    let history = HistoryStore::load(open_storage()?, config.history_max_items);

    if history.is_empty() {
        println!("No recent searches");
        return Ok(());
    }

    println!("Recent searches:");
    for entry in history.entries() {
        println!(
            "  {}  {}  {:?}",
            entry.id,
            entry.timestamp.format("%Y-%m-%d %H:%M"),
            entry.params.query
        );
        for description in entry.params.filter_descriptions() {
            println!("      {}", description);
        }
    }
    Ok(())
}

fn remove_history(id: &str) -> Result<()> {
    let config = load_config()?;
    let id = EntryId::parse(id)?;
    let mut history = HistoryStore::load(open_storage()?, config.history_max_items);

    if history.remove_entry(id)? {
        println!("Removed {}", id);
    } else {
        println!("No history entry {}", id);
    }
    Ok(())
}

fn clear_history() -> Result<()> {
    let config = load_config()?;
    let mut history = HistoryStore::load(open_storage()?, config.history_max_items);
    history.clear_all(|| println!("History cleared"))?;
    Ok(())
}

fn show_stats() -> Result<()> {
    let config = load_config()?;
    let analytics = AnalyticsStore::load(open_storage()?, config.analytics_settings());
    let stats = analytics.stats();

    println!("Last {} days:", config.analytics_window_days);
    println!("  Searches:      {}", stats.total_searches);
    println!("  Average time:  {}s", stats.average_seconds_display());
    println!("  Success rate:  {}", stats.success_rate_display());

    if !stats.popular_queries.is_empty() {
        println!("Popular queries:");
        for item in &stats.popular_queries {
            println!("  {} ({})", item.value, item.count);
        }
    }
    if !stats.popular_filters.is_empty() {
        println!("Popular filters:");
        for item in &stats.popular_filters {
            println!("  {} ({})", item.value, item.count);
        }
    }
    Ok(())
}

fn export(csv: bool) -> Result<()> {
    let config = load_config()?;
    let analytics = AnalyticsStore::load(open_storage()?, config.analytics_settings());

    let mut events = Vec::new();
    analytics.export_data(|exported| events = exported);

    if csv {
        write_csv(&events, io::stdout())?;
    } else {
        println!("{}", serde_json::to_string_pretty(&events)?);
    }
    Ok(())
}

#[derive(Serialize)]
struct ExportRow<'a> {
    id: String,
    timestamp: String,
    query: &'a str,
    filters: String,
    result_count: usize,
    time_spent_ms: u64,
    success: bool,
}

fn write_csv(events: &[AnalyticsEvent], out: impl io::Write) -> Result<()> {
    let mut writer = csv::Writer::from_writer(out);
    for event in events {
        writer.serialize(ExportRow {
            id: event.id.to_string(),
            timestamp: event.timestamp.to_rfc3339(),
            query: &event.query,
            filters: event.filters.join("; "),
            result_count: event.result_count,
            time_spent_ms: event.time_spent,
            success: event.success,
        })?;
    }
    writer.flush()?;
    Ok(())
}

fn data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("MAILFIND_DATA_DIR") {
        return PathBuf::from(dir);
    }
    dirs::data_dir()
        .map(|d| d.join("mailfind"))
        .unwrap_or_else(|| PathBuf::from(".mailfind"))
}

fn open_storage() -> Result<Arc<dyn StoragePort>> {
    let storage = FileStorage::open(data_dir())?;
    Ok(Arc::new(storage))
}

fn load_config() -> Result<SearchConfig> {
    let path = std::env::var("MAILFIND_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| data_dir().join("config.json"));
    Ok(SearchConfig::load(path)?)
}

fn server_url() -> String {
    std::env::var("MAILFIND_SERVER").unwrap_or_else(|_| "http://127.0.0.1:9876".to_string())
}
