//! Entry CRUD operations.
//!
//! Entries are full response snapshots keyed by (generation, store key).
//! Writes are upserts: storing the same key again replaces the snapshot.

use super::connection::CacheDb;
use crate::Error;
use crate::http::{ResponseKind, ResponseSnapshot};
use bytes::Bytes;
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

const UPSERT_ENTRY: &str = "INSERT INTO entries (
        generation, cache_key, url, status, status_text, kind, headers_json, body, stored_at
    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
    ON CONFLICT(generation, cache_key) DO UPDATE SET
        url = excluded.url,
        status = excluded.status,
        status_text = excluded.status_text,
        kind = excluded.kind,
        headers_json = excluded.headers_json,
        body = excluded.body,
        stored_at = excluded.stored_at";

/// Row form of a snapshot, ready to cross onto the connection thread.
struct EntryRow {
    cache_key: String,
    url: String,
    status: i64,
    status_text: String,
    kind: &'static str,
    headers_json: String,
    body: Vec<u8>,
}

impl EntryRow {
    fn encode(cache_key: &str, response: &ResponseSnapshot) -> Result<Self, Error> {
        let headers_json =
            serde_json::to_string(&response.headers).map_err(|e| Error::CorruptEntry(format!("headers: {e}")))?;
        Ok(Self {
            cache_key: cache_key.to_string(),
            url: response.url.clone(),
            status: i64::from(response.status),
            status_text: response.status_text.clone(),
            kind: response.kind.as_str(),
            headers_json,
            body: response.body.to_vec(),
        })
    }

    fn upsert(&self, conn: &rusqlite::Connection, generation: &str, stored_at: &str) -> Result<(), Error> {
        conn.execute(
            UPSERT_ENTRY,
            params![
                generation,
                &self.cache_key,
                &self.url,
                self.status,
                &self.status_text,
                self.kind,
                &self.headers_json,
                &self.body,
                stored_at,
            ],
        )?;
        Ok(())
    }
}

fn ensure_generation(conn: &rusqlite::Connection, generation: &str, now: &str) -> Result<(), Error> {
    conn.execute(
        "INSERT OR IGNORE INTO generations (name, created_at) VALUES (?1, ?2)",
        params![generation, now],
    )?;
    Ok(())
}

impl CacheDb {
    /// Insert or replace one entry, creating the generation if needed.
    pub async fn put_entry(&self, generation: &str, cache_key: &str, response: &ResponseSnapshot) -> Result<(), Error> {
        let row = EntryRow::encode(cache_key, response)?;
        let generation = generation.to_string();
        let now = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                ensure_generation(&tx, &generation, &now)?;
                row.upsert(&tx, &generation, &now)?;
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Insert or replace many entries in a single transaction.
    ///
    /// Either every entry is written or none is.
    pub async fn put_entries(&self, generation: &str, entries: &[(String, ResponseSnapshot)]) -> Result<(), Error> {
        let rows = entries
            .iter()
            .map(|(key, response)| EntryRow::encode(key, response))
            .collect::<Result<Vec<_>, _>>()?;
        let generation = generation.to_string();
        let now = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                ensure_generation(&tx, &generation, &now)?;
                for row in &rows {
                    row.upsert(&tx, &generation, &now)?;
                }
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Get an entry by store key.
    ///
    /// Returns None if the generation or the key doesn't exist.
    pub async fn get_entry(&self, generation: &str, cache_key: &str) -> Result<Option<ResponseSnapshot>, Error> {
        let generation = generation.to_string();
        let cache_key = cache_key.to_string();
        self.conn
            .call(move |conn| -> Result<Option<ResponseSnapshot>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT url, status, status_text, kind, headers_json, body
                     FROM entries WHERE generation = ?1 AND cache_key = ?2",
                )?;

                let result = stmt.query_row(params![generation, cache_key], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                        row.get::<_, Vec<u8>>(5)?,
                    ))
                });

                let (url, status, status_text, kind, headers_json, body) = match result {
                    Ok(row) => row,
                    Err(rusqlite::Error::QueryReturnedNoRows) => return Ok(None),
                    Err(e) => return Err(e.into()),
                };

                let status = u16::try_from(status).map_err(|_| Error::CorruptEntry(format!("status {status}")))?;
                let headers: Vec<(String, String)> =
                    serde_json::from_str(&headers_json).map_err(|e| Error::CorruptEntry(format!("headers: {e}")))?;

                Ok(Some(ResponseSnapshot {
                    url,
                    status,
                    status_text,
                    kind: kind.parse::<ResponseKind>()?,
                    headers,
                    body: Bytes::from(body),
                }))
            })
            .await
            .map_err(Error::from)
    }

    /// Number of entries stored in a generation.
    pub async fn count_entries(&self, generation: &str) -> Result<u64, Error> {
        let generation = generation.to_string();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 =
                    conn.query_row("SELECT COUNT(*) FROM entries WHERE generation = ?1", params![generation], |row| {
                        row.get(0)
                    })?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::hash::compute_cache_key;

    fn make_test_response(url: &str, body: &'static str) -> ResponseSnapshot {
        ResponseSnapshot {
            url: url.to_string(),
            status: 200,
            status_text: "OK".to_string(),
            kind: ResponseKind::Basic,
            headers: vec![("content-type".to_string(), "text/html".to_string())],
            body: Bytes::from_static(body.as_bytes()),
        }
    }

    #[tokio::test]
    async fn test_put_and_get() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let url = "https://app.example.com/index.html";
        let key = compute_cache_key("GET", url);
        let response = make_test_response(url, "<h1>app</h1>");

        db.put_entry("v1", &key, &response).await.unwrap();

        let retrieved = db.get_entry("v1", &key).await.unwrap().unwrap();
        assert_eq!(retrieved, response);
    }

    #[tokio::test]
    async fn test_get_missing() {
        let db = CacheDb::open_in_memory().await.unwrap();
        assert!(db.get_entry("v1", "nonexistent").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_entries_scoped_by_generation() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let key = compute_cache_key("GET", "https://app.example.com/");
        db.put_entry("v1", &key, &make_test_response("https://app.example.com/", "old"))
            .await
            .unwrap();

        assert!(db.get_entry("v2", &key).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_put_same_entry_twice_is_idempotent() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let key = compute_cache_key("GET", "https://app.example.com/");
        let response = make_test_response("https://app.example.com/", "same");

        db.put_entry("v1", &key, &response).await.unwrap();
        let once = (db.count_entries("v1").await.unwrap(), db.get_entry("v1", &key).await.unwrap());
        db.put_entry("v1", &key, &response).await.unwrap();
        let twice = (db.count_entries("v1").await.unwrap(), db.get_entry("v1", &key).await.unwrap());

        assert_eq!(once, twice);
        assert_eq!(twice.0, 1);
    }

    #[tokio::test]
    async fn test_put_overwrites() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let key = compute_cache_key("GET", "https://app.example.com/app.js");
        db.put_entry("v1", &key, &make_test_response("https://app.example.com/app.js", "old"))
            .await
            .unwrap();
        db.put_entry("v1", &key, &make_test_response("https://app.example.com/app.js", "new"))
            .await
            .unwrap();

        let stored = db.get_entry("v1", &key).await.unwrap().unwrap();
        assert_eq!(stored.body.as_ref(), b"new");
    }

    #[tokio::test]
    async fn test_put_entries_bulk() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let urls = ["https://app.example.com/", "https://app.example.com/index.html"];
        let entries: Vec<_> = urls
            .iter()
            .map(|u| (compute_cache_key("GET", u), make_test_response(u, "page")))
            .collect();

        db.put_entries("v1", &entries).await.unwrap();
        assert_eq!(db.count_entries("v1").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_delete_generation_cascades() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let key = compute_cache_key("GET", "https://app.example.com/");
        db.put_entry("v1", &key, &make_test_response("https://app.example.com/", "x"))
            .await
            .unwrap();

        db.delete_generation("v1").await.unwrap();
        assert_eq!(db.count_entries("v1").await.unwrap(), 0);
        assert!(db.get_entry("v1", &key).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_opaque_entry_round_trip() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let url = "https://cdn.example.com/font.woff2";
        let key = compute_cache_key("GET", url);
        let opaque = ResponseSnapshot {
            url: url.to_string(),
            status: 0,
            status_text: String::new(),
            kind: ResponseKind::Opaque,
            headers: Vec::new(),
            body: Bytes::from_static(&[0, 159, 146, 150]),
        };

        db.put_entry("v1", &key, &opaque).await.unwrap();
        assert_eq!(db.get_entry("v1", &key).await.unwrap(), Some(opaque));
    }
}
