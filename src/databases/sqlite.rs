use std::str::FromStr;

use async_trait::async_trait;
use log::debug;
use r2d2::Pool;
use r2d2_sqlite::rusqlite::params;
use r2d2_sqlite::SqliteConnectionManager;

use crate::databases::error::Error;
use crate::databases::Database;
use crate::protocol::clock::current_timestamp;
use crate::protocol::info_hash::InfoHash;

pub struct Sqlite {
    pool: Pool<SqliteConnectionManager>,
}

impl Sqlite {
    /// # Errors
    ///
    /// Will return an `Error` if the connection pool cannot be created.
    pub fn new(db_path: &str) -> Result<Sqlite, Error> {
        let pool = if db_path == ":memory:" {
            // a pooled in-memory database would be one private database per
            // connection, so the pool is pinned to a single connection
            Pool::builder()
                .max_size(1)
                .build(SqliteConnectionManager::memory())?
        } else {
            Pool::new(SqliteConnectionManager::file(db_path))?
        };

        Ok(Sqlite { pool })
    }
}

#[async_trait]
impl Database for Sqlite {
    fn create_database_tables(&self) -> Result<(), Error> {
        let create_whitelist_table = "
        CREATE TABLE IF NOT EXISTS whitelist (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            info_hash TEXT NOT NULL UNIQUE
        );";

        let create_torrents_table = "
        CREATE TABLE IF NOT EXISTS torrents (
            info_hash TEXT PRIMARY KEY,
            completed INTEGER DEFAULT 0 NOT NULL,
            created_at INTEGER NOT NULL
        );";

        let conn = self.pool.get()?;

        conn.execute(create_whitelist_table, [])?;
        conn.execute(create_torrents_table, [])?;

        Ok(())
    }

    fn drop_database_tables(&self) -> Result<(), Error> {
        let conn = self.pool.get()?;

        conn.execute("DROP TABLE IF EXISTS whitelist", [])?;
        conn.execute("DROP TABLE IF EXISTS torrents", [])?;

        Ok(())
    }

    async fn load_persistent_torrents(&self) -> Result<Vec<(InfoHash, u32)>, Error> {
        let conn = self.pool.get()?;

        let mut stmt = conn.prepare("SELECT info_hash, completed FROM torrents")?;

        let torrent_iter = stmt.query_map([], |row| {
            let info_hash_string: String = row.get(0)?;
            let completed: u32 = row.get(1)?;
            Ok((info_hash_string, completed))
        })?;

        let torrents = torrent_iter
            .filter_map(std::result::Result::ok)
            .filter_map(|(info_hash, completed)| InfoHash::from_str(&info_hash).ok().map(|h| (h, completed)))
            .collect();

        Ok(torrents)
    }

    async fn load_whitelist(&self) -> Result<Vec<InfoHash>, Error> {
        let conn = self.pool.get()?;

        let mut stmt = conn.prepare("SELECT info_hash FROM whitelist")?;

        let info_hash_iter = stmt.query_map([], |row| {
            let info_hash: String = row.get(0)?;
            Ok(info_hash)
        })?;

        let info_hashes = info_hash_iter
            .filter_map(std::result::Result::ok)
            .filter_map(|info_hash| InfoHash::from_str(&info_hash).ok())
            .collect();

        Ok(info_hashes)
    }

    async fn save_persistent_torrent(&self, info_hash: &InfoHash, completed: u32) -> Result<(), Error> {
        let conn = self.pool.get()?;

        conn.execute(
            "INSERT INTO torrents (info_hash, completed, created_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(info_hash) DO UPDATE SET completed = ?2",
            params![info_hash.to_string(), completed, current_timestamp() as i64],
        )?;

        Ok(())
    }

    async fn get_info_hash_from_whitelist(&self, info_hash: &str) -> Result<InfoHash, Error> {
        let conn = self.pool.get()?;

        let mut stmt = conn.prepare("SELECT info_hash FROM whitelist WHERE info_hash = ?1")?;
        let mut rows = stmt.query(params![info_hash])?;

        match rows.next()? {
            Some(row) => {
                let info_hash: String = row.get(0)?;
                // the database only ever stores values written from an InfoHash
                Ok(InfoHash::from_str(&info_hash).unwrap())
            }
            None => Err(Error::QueryReturnedNoRows),
        }
    }

    async fn add_info_hash_to_whitelist(&self, info_hash: InfoHash) -> Result<usize, Error> {
        let conn = self.pool.get()?;

        match conn.execute(
            "INSERT INTO whitelist (info_hash) VALUES (?1)",
            params![info_hash.to_string()],
        ) {
            Ok(updated) => Ok(updated),
            Err(e) => {
                debug!("failed to insert whitelist row: {:?}", e);
                Err(e.into())
            }
        }
    }

    async fn remove_info_hash_from_whitelist(&self, info_hash: InfoHash) -> Result<usize, Error> {
        let conn = self.pool.get()?;

        match conn.execute("DELETE FROM whitelist WHERE info_hash = ?1", params![info_hash.to_string()]) {
            Ok(updated) => Ok(updated),
            Err(e) => {
                debug!("failed to delete whitelist row: {:?}", e);
                Err(e.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::Sqlite;
    use crate::databases::Database;
    use crate::protocol::info_hash::InfoHash;

    fn ephemeral_database() -> Sqlite {
        let database = Sqlite::new(":memory:").unwrap();
        database.create_database_tables().unwrap();
        database
    }

    fn sample_info_hash() -> InfoHash {
        InfoHash::from_str("3b245504cf5f11bbdbe1201cea6a6bf45aee1bc0").unwrap()
    }

    #[tokio::test]
    async fn it_should_add_and_find_a_whitelisted_info_hash() {
        let database = ephemeral_database();

        database.add_info_hash_to_whitelist(sample_info_hash()).await.unwrap();

        assert!(database.is_info_hash_whitelisted(&sample_info_hash()).await.unwrap());
    }

    #[tokio::test]
    async fn it_should_not_find_an_info_hash_that_was_never_added() {
        let database = ephemeral_database();

        assert!(!database.is_info_hash_whitelisted(&sample_info_hash()).await.unwrap());
    }

    #[tokio::test]
    async fn it_should_remove_a_whitelisted_info_hash() {
        let database = ephemeral_database();

        database.add_info_hash_to_whitelist(sample_info_hash()).await.unwrap();
        database.remove_info_hash_from_whitelist(sample_info_hash()).await.unwrap();

        assert!(!database.is_info_hash_whitelisted(&sample_info_hash()).await.unwrap());
    }

    #[tokio::test]
    async fn it_should_persist_and_reload_the_completed_counter() {
        let database = ephemeral_database();

        database.save_persistent_torrent(&sample_info_hash(), 1).await.unwrap();
        database.save_persistent_torrent(&sample_info_hash(), 4).await.unwrap();

        let torrents = database.load_persistent_torrents().await.unwrap();

        assert_eq!(torrents, vec![(sample_info_hash(), 4)]);
    }
}
