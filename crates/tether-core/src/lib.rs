#![forbid(unsafe_code)]

//! Service connection graph engine (headless core).
//!
//! Design goals:
//! - edges follow whatever layout the host produces (measured, never computed)
//! - optimistic mutations with whole-list rollback and a final resync
//! - runtime-agnostic async APIs (no specific executor required)

pub mod api;
pub mod config;
pub mod error;
pub mod geom;
pub mod model;
pub mod mutation;
pub mod rect_store;
pub mod store;
pub mod tracker;

pub use api::{GraphApi, MemoryGraphApi, SuggestionApi};
pub use config::{EngineConfig, GraphRules, RenderConfig, StoreConfig};
pub use error::{Error, Result};
pub use geom::NodeRect;
pub use model::{
    AutoConnectSuggestion, Connection, ConnectionEnvironment, ConnectionId, ConnectionPatch,
    ConnectionStatus, ConnectionType, FieldUpdate, NewConnection, NodeId, ProjectId,
};
pub use mutation::MutationCoordinator;
pub use rect_store::{RectSnapshot, RectStore};
pub use store::{GraphStore, ListSnapshot};
pub use tracker::{
    FrameHandle, FrameScheduler, LayoutSource, LayoutTrigger, PositionTracker, TaggedElement,
};

#[cfg(feature = "http")]
pub use api::HttpGraphApi;
