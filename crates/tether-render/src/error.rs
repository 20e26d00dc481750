use tether_core::ConnectionId;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Core(#[from] tether_core::Error),

    #[error("no connection is selected")]
    NoSelection,

    #[error("a change to connection {id} is still being saved")]
    MutationPending { id: ConnectionId },

    #[error("delete was not confirmed")]
    DeleteNotConfirmed,
}
