use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("info hash is not allowed on this tracker")]
    TorrentNotWhitelisted,
}
