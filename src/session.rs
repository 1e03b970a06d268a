//! Serialized event loop owning the view-state.
//!
//! Every event is applied against the state produced by the previous one, so a
//! late tool result can never be overtaken by an older one.

use anyhow::{anyhow, Result};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::channel::ChannelStatus;
use crate::filters::FilterRecord;
use crate::reconcile::{self, Input, ViewState};
use crate::sort::SortOrder;

const QUEUE_DEPTH: usize = 64;

/// Something that happened in the UI or on the chat channel
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    ToolResult(Value),
    ChatText(String),
    SetFilters(FilterRecord),
    SetSort(SortOrder),
    OpenListing(String),
    CloseListing,
    ChannelStatus(ChannelStatus),
}

/// State published after every event
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub view: ViewState,
    pub status: ChannelStatus,
}

impl Snapshot {
    /// Single status line for the chat panel
    pub fn status_message(&self) -> String {
        self.status.to_string()
    }
}

struct Command {
    event: Event,
    ack: Option<oneshot::Sender<Arc<Snapshot>>>,
}

/// Cloneable handle to a running session
#[derive(Clone)]
pub struct Session {
    commands: mpsc::Sender<Command>,
    snapshots: watch::Receiver<Arc<Snapshot>>,
}

impl Session {
    /// Start the event loop on the current tokio runtime
    pub fn spawn(initial: ViewState) -> (Self, JoinHandle<()>) {
        let (commands, receiver) = mpsc::channel(QUEUE_DEPTH);
        let snapshot = Arc::new(Snapshot {
            view: initial,
            status: ChannelStatus::default(),
        });
        let (publisher, snapshots) = watch::channel(snapshot.clone());
        let task = tokio::spawn(run(receiver, publisher, snapshot));
        (Self { commands, snapshots }, task)
    }

    /// Queue an event without waiting for it to be applied
    pub async fn send(&self, event: Event) -> Result<()> {
        self.commands
            .send(Command { event, ack: None })
            .await
            .map_err(|_| anyhow!("Session has shut down"))
    }

    /// Queue an event and wait for the snapshot it produced
    pub async fn dispatch(&self, event: Event) -> Result<Arc<Snapshot>> {
        let (ack, done) = oneshot::channel();
        self.commands
            .send(Command { event, ack: Some(ack) })
            .await
            .map_err(|_| anyhow!("Session has shut down"))?;
        done.await.map_err(|_| anyhow!("Session dropped the event"))
    }

    /// Latest published snapshot
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.snapshots.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<Snapshot>> {
        self.snapshots.clone()
    }
}

async fn run(
    mut commands: mpsc::Receiver<Command>,
    publisher: watch::Sender<Arc<Snapshot>>,
    initial: Arc<Snapshot>,
) {
    let mut view = initial.view.clone();
    let mut status = initial.status.clone();

    while let Some(Command { event, ack }) = commands.recv().await {
        debug!("Applying session event {}", event_name(&event));
        match event {
            Event::ToolResult(payload) => view = reconcile::apply(&Input::Payload(payload), &view),
            Event::ChatText(text) => view = reconcile::apply(&Input::Text(text), &view),
            Event::SetFilters(filters) => view = reconcile::set_filters(&view, &filters),
            Event::SetSort(sort) => view = reconcile::set_sort(&view, sort),
            Event::OpenListing(zpid) => view = reconcile::open_listing(&view, &zpid),
            Event::CloseListing => view = reconcile::close_listing(&view),
            Event::ChannelStatus(next) => {
                info!("💬 {}", next);
                status = next;
            }
        }

        let snapshot = Arc::new(Snapshot {
            view: view.clone(),
            status: status.clone(),
        });
        publisher.send_replace(snapshot.clone());
        if let Some(ack) = ack {
            let _ = ack.send(snapshot);
        }
    }

    info!("Session event loop stopped");
}

fn event_name(event: &Event) -> &'static str {
    match event {
        Event::ToolResult(_) => "ToolResult",
        Event::ChatText(_) => "ChatText",
        Event::SetFilters(_) => "SetFilters",
        Event::SetSort(_) => "SetSort",
        Event::OpenListing(_) => "OpenListing",
        Event::CloseListing => "CloseListing",
        Event::ChannelStatus(_) => "ChannelStatus",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::models::Listing;
    use serde_json::json;

    fn initial() -> ViewState {
        let listings: Vec<Listing> = serde_json::from_value(json!([
            {"zpid": "2077651", "displayAddress": "Lot 14 Saddle Ridge Rd, Bend, OR", "priceRaw": 189000},
            {"zpid": "81236640", "displayAddress": "4410 Wallingford Ave N, Seattle, WA", "priceRaw": 1325000, "beds": 4}
        ]))
        .unwrap();
        ViewState::new(Catalog::from_listings(listings))
    }

    #[tokio::test]
    async fn events_apply_in_order() {
        let (session, _task) = Session::spawn(initial());

        session.send(Event::ToolResult(json!({"maxPrice": 200000}))).await.unwrap();
        session.send(Event::ToolResult(json!({"minPrice": 1000000}))).await.unwrap();
        let snapshot = session.dispatch(Event::SetSort(SortOrder::PriceHighLow)).await.unwrap();

        let filters = &snapshot.view.filters;
        assert_eq!((filters.price_min, filters.price_max), (Some(1_000_000), Some(1_000_000)));
        assert_eq!(snapshot.view.sort, SortOrder::PriceHighLow);
        assert_eq!(session.snapshot(), snapshot);
    }

    #[tokio::test]
    async fn listing_focus_follows_ui_and_chat() {
        let (session, _task) = Session::spawn(initial());

        let opened = session.dispatch(Event::OpenListing("2077651".to_string())).await.unwrap();
        assert_eq!(opened.view.listing_context.as_deref(), Some("2077651"));

        let chat = session
            .dispatch(Event::ChatText("what about 4410 Wallingford Ave N?".to_string()))
            .await
            .unwrap();
        assert_eq!(chat.view.listing_context.as_deref(), Some("81236640"));

        let closed = session.dispatch(Event::CloseListing).await.unwrap();
        assert_eq!(closed.view.listing_context, None);
    }

    #[tokio::test]
    async fn channel_status_is_published() {
        let (session, _task) = Session::spawn(initial());
        let mut updates = session.subscribe();

        session
            .send(Event::ChannelStatus(ChannelStatus::Error("missing API key".to_string())))
            .await
            .unwrap();
        updates.changed().await.unwrap();

        let snapshot = updates.borrow().clone();
        assert_eq!(snapshot.status_message(), "Chat unavailable: missing API key");
        assert_eq!(snapshot.view, initial());
    }

    #[tokio::test]
    async fn handle_errors_once_loop_is_gone() {
        let (session, task) = Session::spawn(initial());
        task.abort();
        let _ = task.await;
        assert!(session.send(Event::CloseListing).await.is_err());
    }
}
