use crate::model::{ConnectionId, NodeId};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The remote answered, but rejected the call.
    #[error("{message}")]
    Api {
        status: Option<u16>,
        message: String,
    },

    /// The request never produced a response (connection refused, timeout, ...).
    #[error("transport error: {message}")]
    Transport { message: String },

    #[error("JSON error: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("a connection cannot start and end at the same node ({node})")]
    SelfLoop { node: NodeId },

    #[error("a connection {to} -> {from} already exists and reverse edges are disabled")]
    ReverseEdgeExists { from: NodeId, to: NodeId },

    #[error("{field} is too long ({len} > {max} characters)")]
    FieldTooLong {
        field: &'static str,
        max: usize,
        len: usize,
    },

    #[error("connection not found: {id}")]
    NotFound { id: ConnectionId },

    #[error("invalid engine config: {message}")]
    InvalidConfig { message: String },
}

impl Error {
    pub fn api(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// Whether the failure came from the remote side (as opposed to local validation).
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            Self::Api { .. } | Self::Transport { .. } | Self::Decode(_)
        )
    }
}
