use thiserror::Error;

/// Per-packet failures of the UDP request pipeline. The `Display` text of a
/// variant is what ends up in the error frame sent back to the client, so it
/// is worded for BitTorrent clients, not for operators.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServerError {
    #[error("Tracker couldn't understand Client's request.")]
    BadRequest,

    #[error("connection id could not be verified")]
    InvalidConnectionId,

    #[error("Tracker doesn't allow remote IP's; Request ignored.")]
    RemoteAddressNotAllowed,

    #[error("info_hash not registered.")]
    TorrentNotRegistered,

    #[error("internal server error")]
    InternalServerError,
}

impl From<crate::tracker::error::Error> for ServerError {
    fn from(e: crate::tracker::error::Error) -> Self {
        match e {
            crate::tracker::error::Error::TorrentNotWhitelisted => ServerError::TorrentNotRegistered,
        }
    }
}
