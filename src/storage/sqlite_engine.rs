// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! The one storage engine named by `repo.storage.method`: a bundled sqlite
//! table `(id, full_name, key_locator_hash, wire)`. `size()` tracks a cached
//! counter maintained alongside inserts/erases rather than a `COUNT(*)`
//! scan, keeping the capacity check in the name index cheap.

use std::path::Path;

use bytes::{Bytes, BytesMut};
use rusqlite::{Connection, OptionalExtension, params};

use crate::{
    error::EngineError,
    storage::engine::{ItemMeta, StorageEngine},
    wire::{Data, Name, tlv::Element},
};

pub struct SqliteEngine {
    conn: Connection,
    cached_size: u64,
}

impl SqliteEngine {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, EngineError> {
        let conn = Connection::open(path).map_err(|e| EngineError::Io(e.to_string()))?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS packets (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                full_name BLOB NOT NULL,
                key_locator_hash BLOB,
                wire BLOB NOT NULL
            )",
            [],
        )
        .map_err(|e| EngineError::Io(e.to_string()))?;
        let cached_size: i64 = conn
            .query_row("SELECT COUNT(*) FROM packets", [], |row| row.get(0))
            .map_err(|e| EngineError::Io(e.to_string()))?;
        Ok(Self { conn, cached_size: cached_size as u64 })
    }

    pub fn open_in_memory() -> Result<Self, EngineError> {
        Self::open(":memory:")
    }
}

impl StorageEngine for SqliteEngine {
    fn insert(&mut self, data: &Data) -> Result<u64, EngineError> {
        let full_name = data.full_name();
        let mut name_buf = BytesMut::new();
        full_name.encode().encode(&mut name_buf);

        let mut wire_buf = BytesMut::new();
        data.encode().encode(&mut wire_buf);

        self.conn
            .execute(
                "INSERT INTO packets (full_name, key_locator_hash, wire) VALUES (?1, \
                 ?2, ?3)",
                params![
                    name_buf.as_ref(),
                    data.key_locator_hash().map(|h| h.to_vec()),
                    wire_buf.as_ref()
                ],
            )
            .map_err(|e| EngineError::Io(e.to_string()))?;
        self.cached_size += 1;
        Ok(self.conn.last_insert_rowid() as u64)
    }

    fn erase(&mut self, row_id: u64) -> Result<bool, EngineError> {
        let affected = self
            .conn
            .execute("DELETE FROM packets WHERE id = ?1", params![row_id as i64])
            .map_err(|e| EngineError::Io(e.to_string()))?;
        if affected > 0 {
            self.cached_size = self.cached_size.saturating_sub(1);
        }
        Ok(affected > 0)
    }

    fn read(&self, row_id: u64) -> Result<Option<Data>, EngineError> {
        let wire: Option<Vec<u8>> = self
            .conn
            .query_row(
                "SELECT wire FROM packets WHERE id = ?1",
                params![row_id as i64],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| EngineError::Io(e.to_string()))?;
        let Some(wire) = wire else { return Ok(None) };
        let bytes = Bytes::from(wire);
        let mut cursor = bytes.clone();
        let el = Element::decode(&mut cursor).map_err(|e| EngineError::Io(e.to_string()))?;
        let data = Data::decode(&el).map_err(|e| EngineError::Io(e.to_string()))?;
        Ok(Some(data))
    }

    fn enumerate(&self, f: &mut dyn FnMut(ItemMeta)) -> Result<(), EngineError> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, full_name, key_locator_hash FROM packets ORDER BY id")
            .map_err(|e| EngineError::Io(e.to_string()))?;
        let mut rows = stmt
            .query([])
            .map_err(|e| EngineError::Io(e.to_string()))?;
        while let Some(row) =
            rows.next().map_err(|e| EngineError::Io(e.to_string()))?
        {
            let row_id: i64 = row.get(0).map_err(|e| EngineError::Io(e.to_string()))?;
            let name_bytes: Vec<u8> =
                row.get(1).map_err(|e| EngineError::Io(e.to_string()))?;
            let hash: Option<Vec<u8>> =
                row.get(2).map_err(|e| EngineError::Io(e.to_string()))?;
            let bytes = Bytes::from(name_bytes);
            let mut cursor = bytes.clone();
            let el =
                Element::decode(&mut cursor).map_err(|e| EngineError::Io(e.to_string()))?;
            let full_name =
                Name::decode(&el).map_err(|e| EngineError::Io(e.to_string()))?;
            let key_locator_hash = hash.and_then(|h| h.as_slice().try_into().ok());
            f(ItemMeta { row_id: row_id as u64, full_name, key_locator_hash });
        }
        Ok(())
    }

    fn size(&self) -> u64 {
        self.cached_size
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;
    use crate::wire::data::{MetaInfo, Signature};

    fn sample(n: &str) -> Data {
        Data {
            name: Name::from_uri(n),
            content: Bytes::from_static(b"payload"),
            meta: MetaInfo::default(),
            signature: Signature { key_locator_hash: None, bits: Bytes::from_static(b"s") },
        }
    }

    #[test]
    fn insert_read_erase_round_trip() {
        let mut engine = SqliteEngine::open_in_memory().expect("open");
        let d = sample("/a/b");
        let id = engine.insert(&d).expect("insert");
        assert_eq!(engine.size(), 1);
        let read_back = engine.read(id).expect("read").expect("present");
        assert_eq!(read_back, d);
        assert!(engine.erase(id).expect("erase"));
        assert_eq!(engine.size(), 0);
        assert!(engine.read(id).expect("read").is_none());
    }

    #[test]
    fn enumerate_yields_full_names() {
        let mut engine = SqliteEngine::open_in_memory().expect("open");
        let d = sample("/x");
        let expected_full_name = d.full_name();
        engine.insert(&d).expect("insert");
        let mut seen = Vec::new();
        engine.enumerate(&mut |meta| seen.push(meta.full_name)).expect("enumerate");
        assert_eq!(seen, vec![expected_full_name]);
    }
}
