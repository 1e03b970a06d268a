//! Keeps a chat-driven real-estate listing view consistent.
//!
//! Manual filter changes, filter directives in chat text and asynchronous tool
//! results are reconciled into one [`reconcile::ViewState`]. Listing references
//! in chat ("that house on Maple St") are resolved to catalog records.

pub mod catalog;
pub mod channel;
pub mod config;
pub mod directives;
pub mod filters;
pub mod metadata;
pub mod models;
pub mod payload;
pub mod reconcile;
pub mod search;
pub mod session;
pub mod sort;

pub use catalog::Catalog;
pub use filters::{FilterDelta, FilterRecord};
pub use models::{HomeType, Listing};
pub use reconcile::{apply, Input, SearchSummary, ViewState};
pub use sort::SortOrder;
