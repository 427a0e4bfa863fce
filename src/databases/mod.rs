pub mod error;
pub mod sqlite;

use async_trait::async_trait;

use self::error::Error;
use self::sqlite::Sqlite;
use crate::protocol::info_hash::InfoHash;

/// Opens the persistence backend for the given `db.param` value (a file
/// path, or `:memory:` for a volatile store) and makes sure the schema
/// exists.
///
/// # Errors
///
/// Will return an `Error` if the database cannot be opened or the tables
/// cannot be created.
pub fn connect(db_path: &str) -> Result<Box<dyn Database>, Error> {
    let database = Sqlite::new(db_path)?;

    database.create_database_tables()?;

    Ok(Box::new(database))
}

/// The persistence contract of the tracker: the allow-list and the
/// per-torrent completion counters. Live peers are deliberately not
/// persisted, they re-announce within one interval anyway.
#[async_trait]
pub trait Database: Sync + Send {
    /// # Errors
    ///
    /// Will return an `Error` if unable to create the tables.
    fn create_database_tables(&self) -> Result<(), Error>;

    /// # Errors
    ///
    /// Will return an `Error` if unable to drop the tables.
    fn drop_database_tables(&self) -> Result<(), Error>;

    async fn load_persistent_torrents(&self) -> Result<Vec<(InfoHash, u32)>, Error>;

    async fn load_whitelist(&self) -> Result<Vec<InfoHash>, Error>;

    async fn save_persistent_torrent(&self, info_hash: &InfoHash, completed: u32) -> Result<(), Error>;

    async fn get_info_hash_from_whitelist(&self, info_hash: &str) -> Result<InfoHash, Error>;

    async fn add_info_hash_to_whitelist(&self, info_hash: InfoHash) -> Result<usize, Error>;

    async fn remove_info_hash_from_whitelist(&self, info_hash: InfoHash) -> Result<usize, Error>;

    async fn is_info_hash_whitelisted(&self, info_hash: &InfoHash) -> Result<bool, Error> {
        match self.get_info_hash_from_whitelist(&info_hash.to_string()).await {
            Ok(_) => Ok(true),
            Err(Error::QueryReturnedNoRows) => Ok(false),
            Err(e) => Err(e),
        }
    }
}
