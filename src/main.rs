mod args;

use anyhow::Context;
use listing_sync::catalog;
use listing_sync::channel::{ChannelStatus, ChatChannel, HttpChannel, OutboundMessage};
use listing_sync::config::Config;
use listing_sync::metadata;
use listing_sync::reconcile::ViewState;
use listing_sync::search::{self, SearchRequest};
use listing_sync::session::{Event, Session, Snapshot};
use serde_json::Value;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = args::Args::parse()?;
    let config = Config::new(&args.config).context("Failed to load configuration")?;

    // Initialize logging
    let level = tracing::Level::from(config.log.level);
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::default().add_directive(LevelFilter::from_level(level).into()));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("🏠 Listing Sync - chat filter reconciliation");
    info!("============================================");

    let seed_path = args.seed.unwrap_or(config.catalog.seed_path);
    let catalog = catalog::load_seed(&seed_path).await?;
    let (session, _task) = Session::spawn(ViewState::new(catalog));

    let channel = connect_channel(config.channel, &session).await?;
    let limit = config.search.default_limit;

    info!("Type chat messages, or paste a JSON tool result starting with '{{'. Ctrl-D quits.");
    print_snapshot(&session.snapshot());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let snapshot = if line.starts_with('{') {
            session.dispatch(Event::ToolResult(Value::String(line.to_string()))).await?
        } else {
            handle_chat(line, &session, channel.as_deref(), limit).await?
        };
        print_snapshot(&snapshot);
    }

    info!("👋 Bye");
    Ok(())
}

async fn connect_channel(
    config: listing_sync::config::Channel,
    session: &Session,
) -> anyhow::Result<Option<Box<dyn ChatChannel>>> {
    let status = match HttpChannel::new(config) {
        Ok(channel) => match channel.connect().await {
            Ok(()) => {
                session.send(Event::ChannelStatus(ChannelStatus::Connected)).await?;
                return Ok(Some(Box::new(channel)));
            }
            Err(e) => ChannelStatus::Error(e.to_string()),
        },
        Err(e) => ChannelStatus::Error(e.to_string()),
    };
    session.send(Event::ChannelStatus(status)).await?;
    Ok(None)
}

/// Send the message, reconcile it, and let the local search answer filter requests
async fn handle_chat(
    text: &str,
    session: &Session,
    channel: Option<&dyn ChatChannel>,
    limit: usize,
) -> anyhow::Result<Arc<Snapshot>> {
    let before = session.snapshot();
    let message = OutboundMessage {
        text: text.to_string(),
        metadata: metadata::build(&before.view, text),
    };

    if let Some(channel) = channel {
        if let Err(e) = channel.send(&message).await {
            warn!("Failed to deliver message via {}: {}", channel.name(), e);
            session
                .send(Event::ChannelStatus(ChannelStatus::Error(e.to_string())))
                .await?;
        }
    }

    let after = session.dispatch(Event::ChatText(text.to_string())).await?;
    if !message.metadata.contains_key("filterOverrides") {
        return Ok(after);
    }

    let request = SearchRequest::from_filters(&after.view.filters, after.view.sort, Some(limit));
    let result = search::run(&after.view.catalog, &request);
    info!(
        "🤖 Agent search returned {} of {} listings",
        result.returned_count, result.total_available
    );
    session.dispatch(Event::ToolResult(result.to_payload())).await
}

fn print_snapshot(snapshot: &Snapshot) {
    let view = &snapshot.view;
    let visible = view.visible();

    println!();
    println!("{}", snapshot.status_message());
    println!("Filters: {} | Sort: {}", view.filters, view.sort);
    println!("Showing {} of {} listings", visible.len(), view.catalog.len());

    for (i, listing) in visible.iter().enumerate() {
        let marker = if view.listing_context.as_deref() == Some(listing.zpid.as_str()) {
            "▶"
        } else {
            " "
        };
        println!(
            "{}{}. {} ({})",
            marker,
            i + 1,
            listing.address_line().unwrap_or_else(|| "Unknown address".to_string()),
            listing.price.as_deref().unwrap_or("price on request")
        );
        println!(
            "   {} bd, {} ba, {} sqft",
            count(listing.beds),
            count(listing.baths),
            count(listing.living_area)
        );
        println!("   ID: {}", listing.zpid);
    }

    if let Some(focused) = view.focused() {
        println!("In focus: {}", focused.address_line().unwrap_or_else(|| focused.zpid.clone()));
        if let Some(url) = &focused.detail_url {
            println!("   URL: {}", url);
        }
    }
}

fn count(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}
