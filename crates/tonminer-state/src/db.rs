use std::path::Path;

use tonminer_core::constants::STORAGE_KEY;
use tonminer_core::error::MinerError;
use tonminer_core::state::AppState;
use tracing::{debug, warn};

/// Where the engine sends a snapshot after every mutation.
///
/// Writes are fire-and-forget: the engine never waits on them and never reads
/// back through the sink, so failures are logged rather than returned.
pub trait StateSink: Send + Sync {
    fn persist(&self, snapshot: Vec<u8>);
    fn clear(&self);
}

/// Device-local document store backed by sled (pure-Rust, no C dependencies).
///
/// Named trees:
///   app — utf8 key bytes → JSON(AppState)
pub struct StateDb {
    _db: sled::Db,
    app: sled::Tree,
}

impl StateDb {
    /// Open or create the store at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, MinerError> {
        let db = sled::open(path).map_err(|e| MinerError::Storage(e.to_string()))?;
        let app = db.open_tree("app").map_err(|e| MinerError::Storage(e.to_string()))?;
        Ok(Self { _db: db, app })
    }

    /// Raw bytes stored under `STORAGE_KEY`.
    pub fn get_raw(&self) -> Result<Option<Vec<u8>>, MinerError> {
        self.app
            .get(STORAGE_KEY.as_bytes())
            .map(|v| v.map(|iv| iv.to_vec()))
            .map_err(|e| MinerError::Storage(e.to_string()))
    }

    pub fn put_raw(&self, bytes: &[u8]) -> Result<(), MinerError> {
        self.app
            .insert(STORAGE_KEY.as_bytes(), bytes)
            .map_err(|e| MinerError::Storage(e.to_string()))?;
        Ok(())
    }

    /// Load the persisted state. `Ok(None)` when nothing has been written yet;
    /// `Err(MalformedState)` when the document cannot be trusted.
    pub fn load_app_state(&self) -> Result<Option<AppState>, MinerError> {
        match self.get_raw()? {
            Some(bytes) => AppState::from_json(&bytes).map(Some),
            None => Ok(None),
        }
    }

    pub fn put_app_state(&self, state: &AppState) -> Result<(), MinerError> {
        self.put_raw(&state.to_json()?)
    }

    pub fn clear_app_state(&self) -> Result<(), MinerError> {
        self.app
            .remove(STORAGE_KEY.as_bytes())
            .map_err(|e| MinerError::Storage(e.to_string()))?;
        Ok(())
    }

    /// Flush all pending writes to disk.
    pub fn flush(&self) -> Result<(), MinerError> {
        self._db.flush().map_err(|e| MinerError::Storage(e.to_string()))?;
        Ok(())
    }
}

/// Synchronous sink: sled buffers the insert and flushes in the background.
impl StateSink for StateDb {
    fn persist(&self, snapshot: Vec<u8>) {
        match self.put_raw(&snapshot) {
            Ok(()) => debug!(bytes = snapshot.len(), "state persisted"),
            Err(e) => warn!(error = %e, "failed to persist state"),
        }
    }

    fn clear(&self) {
        if let Err(e) = self.clear_app_state() {
            warn!(error = %e, "failed to clear persisted state");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_db(name: &str) -> StateDb {
        let dir = std::env::temp_dir().join(format!("tonminer_db_test_{}", name));
        let _ = std::fs::remove_dir_all(&dir);
        StateDb::open(&dir).expect("open temp db")
    }

    #[test]
    fn empty_store_loads_nothing() {
        let db = temp_db("empty");
        assert!(db.load_app_state().unwrap().is_none());
    }

    #[test]
    fn put_then_load_round_trips() {
        let db = temp_db("round_trip");
        let mut s = AppState::with_referral_code("TON-XYZ789");
        s.stats.balance = "0.0123".parse().unwrap();
        s.stats.last_daily_gift_claimed = Some(1_700_000_000_000);
        db.put_app_state(&s).unwrap();
        assert_eq!(db.load_app_state().unwrap(), Some(s));
    }

    #[test]
    fn malformed_document_is_reported() {
        let db = temp_db("malformed");
        db.put_raw(b"[1,2,3]").unwrap();
        assert!(matches!(db.load_app_state().unwrap_err(), MinerError::MalformedState(_)));
    }

    #[test]
    fn clear_removes_document() {
        let db = temp_db("clear");
        db.put_app_state(&AppState::with_referral_code("TON-000000")).unwrap();
        StateSink::clear(&db);
        assert!(db.get_raw().unwrap().is_none());
    }

    #[test]
    fn reopen_sees_flushed_state() {
        let dir = std::env::temp_dir().join("tonminer_db_test_reopen");
        let _ = std::fs::remove_dir_all(&dir);
        let s = AppState::with_referral_code("TON-REOPEN");
        {
            let db = StateDb::open(&dir).unwrap();
            db.put_app_state(&s).unwrap();
            db.flush().unwrap();
        }
        let db = StateDb::open(&dir).unwrap();
        assert_eq!(db.load_app_state().unwrap(), Some(s));
    }
}
